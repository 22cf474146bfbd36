mod etl;
mod data;
mod errors;

use std::env;
use std::fs::{create_dir_all, metadata, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Deserialize;
use structured_logger::json::new_writer;
use structured_logger::Builder;

use crate::errors::{Error, ErrorKind, Result};
use crate::etl::osm_to_csv::OsmToCsvEtl;
use crate::etl::tables::output_paths;
use crate::etl::Etl;

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct UserConfig {
    pub data_path: String,
    pub dest_path: String,
    pub log_level: String,
    pub show_progress: bool,
    pub reuse_cached_output: bool,
}

impl Default for UserConfig {
    fn default() -> Self {
        UserConfig {
            data_path: "ams_s.osm".to_string(),
            dest_path: ".".to_string(),
            log_level: "info".to_string(),
            show_progress: false,
            reuse_cached_output: false,
        }
    }
}

fn load_user_config(path: &str) -> Result<UserConfig> {
    let file = File::open(path).map_err(|err| {
        Error::new(ErrorKind::Config, format!("Could not open config file {}: {}", path, err))
    })?;
    Ok(serde_json::from_reader(file)?)
}

fn create_output_dir(config: &UserConfig) -> Result<PathBuf> {
    let output_dir = PathBuf::from(&config.dest_path);
    create_dir_all(&output_dir)?;
    Ok(output_dir)
}

fn setup_logging(level: &str) {
    Builder::with_level(level)
        .with_target_writer("*", new_writer(io::stderr()))
        .init();
}

fn size_in_mb(path: &Path) -> Result<u64> {
    Ok(metadata(path)?.len() / 1024 / 1024)
}

fn main() -> Result<()> {
    let user_config = match env::args().nth(1) {
        Some(path) => load_user_config(&path)?,
        None => UserConfig::default(),
    };
    setup_logging(&user_config.log_level);

    let started = Instant::now();
    let mut etl = OsmToCsvEtl::new(&user_config);
    let output_dir = create_output_dir(&user_config)?;
    etl.process(&output_dir)?;

    println!("Data processed...\n time spent: {}s", started.elapsed().as_secs());
    let input_path = PathBuf::from(&user_config.data_path);
    for path in std::iter::once(input_path).chain(output_paths(&output_dir)) {
        println!("{} ... {} MB", path.display(), size_in_mb(&path)?);
    }

    Ok(())
}
