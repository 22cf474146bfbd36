pub mod osm_to_csv;
pub mod parse_osm;
pub mod shape_osm;
pub mod tables;

use std::path::Path;
use std::time::Instant;

use log::{error, info};

use crate::errors::Result;

/// A job reading from and writing into `dir`. `Input` and `Output` may be lazy: a streaming
/// job hands iterators from one stage to the next and does the actual work in `load`.
pub trait Etl {
    type Input;
    type Output;

    fn etl_name(&self) -> &str;

    fn is_cached(&self, dir: &Path) -> Result<bool>;

    fn extract(&mut self, dir: &Path) -> Result<Self::Input>;
    fn transform(&mut self, input: Self::Input) -> Result<Self::Output>;
    fn load(&mut self, dir: &Path, output: Self::Output) -> Result<()>;

    fn process(&mut self, dir: &Path) -> Result<()> {
        info!(etl_name = self.etl_name(); "Starting ETL process");
        if self.is_cached(dir)? {
            info!(etl_name = self.etl_name(); "Using cached value");
            return Ok(());
        }

        let started = Instant::now();
        info!(etl_name = self.etl_name(); "Extracting");
        let input = self.extract(dir);
        let input = log_failure(self.etl_name(), "Extraction", input)?;

        info!(etl_name = self.etl_name(); "Transforming");
        let output = self.transform(input);
        let output = log_failure(self.etl_name(), "Transformation", output)?;

        info!(etl_name = self.etl_name(); "Loading");
        let loaded = self.load(dir, output);
        log_failure(self.etl_name(), "Loading", loaded)?;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(etl_name = self.etl_name(), elapsed_ms = elapsed_ms; "Process finished");
        Ok(())
    }
}

fn log_failure<T>(etl_name: &str, stage: &str, result: Result<T>) -> Result<T> {
    if let Err(err) = &result {
        error!(etl_name = etl_name, stage = stage, err = err.message.as_str(); "Stage failed with error");
    }
    result
}
