use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::data::element::Element;
use crate::data::ShapedElement;
use crate::errors::Result;
use crate::etl::parse_osm::{open_source, ElementReader, Source};
use crate::etl::shape_osm::shape_element;
use crate::etl::tables::{output_paths, TableSet};
use crate::etl::Etl;
use crate::UserConfig;

pub const ETL_NAME: &str = "osm_to_csv";
pub const ELEMENT_TAGS: &[&str] = &["node", "way"];

/// Lazily shapes every element coming out of the reader, skipping elements that have no
/// table of their own.
pub struct ShapedElements<I> {
    elements: I,
}

impl<I: Iterator<Item = Result<Element>>> Iterator for ShapedElements<I> {
    type Item = Result<ShapedElement>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let element = match self.elements.next()? {
                Ok(element) => element,
                Err(err) => return Some(Err(err)),
            };
            match shape_element(&element) {
                Ok(Some(shaped)) => return Some(Ok(shaped)),
                Ok(None) => debug!(element = element.name(); "Skipping element"),
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

/// Streams the .osm file at `data_path` into the five CSV tables in the destination directory.
pub struct OsmToCsvEtl<'a> {
    config: &'a UserConfig,
}

impl OsmToCsvEtl<'_> {
    pub fn new(config: &UserConfig) -> OsmToCsvEtl<'_> {
        OsmToCsvEtl { config }
    }

    fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.config.data_path)
    }
}

impl Etl for OsmToCsvEtl<'_> {
    type Input = ElementReader<Source>;
    type Output = ShapedElements<ElementReader<Source>>;

    fn etl_name(&self) -> &str {
        ETL_NAME
    }

    fn is_cached(&self, dir: &Path) -> Result<bool> {
        if !self.config.reuse_cached_output {
            return Ok(false);
        }
        for path in output_paths(dir) {
            if !path.try_exists()? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn extract(&mut self, _dir: &Path) -> Result<Self::Input> {
        let source = open_source(&self.data_path())?;
        Ok(ElementReader::new(source, ELEMENT_TAGS))
    }

    fn transform(&mut self, input: Self::Input) -> Result<Self::Output> {
        Ok(ShapedElements { elements: input })
    }

    fn load(&mut self, dir: &Path, output: Self::Output) -> Result<()> {
        let mut tables = TableSet::create(dir)?;

        let stream: Box<dyn Iterator<Item = Result<ShapedElement>>> = if self.config.show_progress {
            Box::new(tqdm::tqdm(output))
        } else {
            Box::new(output)
        };
        for shaped in stream {
            tables.write(&shaped?)?;
        }

        let counts = tables.counts();
        tables.finish()?;
        info!(
            etl_name = ETL_NAME,
            nodes = counts.nodes,
            node_tags = counts.node_tags,
            ways = counts.ways,
            way_nodes = counts.way_nodes,
            way_tags = counts.way_tags;
            "Tables written"
        );
        Ok(())
    }
}
