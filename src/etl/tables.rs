use std::fs::File;
use std::io::{BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use csv::{Terminator, WriterBuilder};

use crate::data::osm::{NodeRecord, Row, TagRecord, WayNodeRecord, WayRecord};
use crate::data::ShapedElement;
use crate::errors::{Error, ErrorKind, Result};

pub const NODES_FILE_NAME: &str = "nodes.csv";
pub const NODE_TAGS_FILE_NAME: &str = "nodes_tags.csv";
pub const WAYS_FILE_NAME: &str = "ways.csv";
pub const WAY_NODES_FILE_NAME: &str = "ways_nodes.csv";
pub const WAY_TAGS_FILE_NAME: &str = "ways_tags.csv";

pub const OUTPUT_FILE_NAMES: [&str; 5] = [
    NODES_FILE_NAME,
    NODE_TAGS_FILE_NAME,
    WAYS_FILE_NAME,
    WAY_NODES_FILE_NAME,
    WAY_TAGS_FILE_NAME,
];

/// Append-only CSV table holding rows of type `T`. The header is written on creation, so a
/// table without rows still names its columns.
pub struct TableWriter<W: Write, T: Row> {
    writer: csv::Writer<W>,
    rows: u64,
    _row: PhantomData<T>,
}

impl<W: Write, T: Row> TableWriter<W, T> {
    pub fn new(inner: W) -> Result<Self> {
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(inner);
        writer.write_record(T::FIELDS)?;
        Ok(TableWriter {
            writer,
            rows: 0,
            _row: PhantomData,
        })
    }

    pub fn write(&mut self, row: &T) -> Result<()> {
        self.writer.serialize(row)?;
        self.rows += 1;
        Ok(())
    }

    pub fn write_all<'a>(&mut self, rows: impl IntoIterator<Item = &'a T>) -> Result<()>
    where
        T: 'a,
    {
        for row in rows {
            self.write(row)?;
        }
        Ok(())
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|err| Error::from(err.into_error()))
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TableCounts {
    pub nodes: u64,
    pub node_tags: u64,
    pub ways: u64,
    pub way_nodes: u64,
    pub way_tags: u64,
}

/// The five output tables. Rows of one element are appended in the order node/way,
/// members, tags, so every table keeps document order.
pub struct TableSet<W: Write> {
    nodes: TableWriter<W, NodeRecord>,
    node_tags: TableWriter<W, TagRecord>,
    ways: TableWriter<W, WayRecord>,
    way_nodes: TableWriter<W, WayNodeRecord>,
    way_tags: TableWriter<W, TagRecord>,
}

pub fn output_paths(dir: &Path) -> [PathBuf; 5] {
    OUTPUT_FILE_NAMES.map(|name| dir.join(name))
}

impl TableSet<BufWriter<File>> {
    /// Creates (or truncates) all five files in `dir`. If any of them cannot be opened nothing
    /// is written.
    pub fn create(dir: &Path) -> Result<Self> {
        let mut files = Vec::with_capacity(OUTPUT_FILE_NAMES.len());
        for path in output_paths(dir) {
            let file = File::create(&path).map_err(|err| {
                Error::new(ErrorKind::Io, format!("{}: {}", path.display(), err))
            })?;
            files.push(BufWriter::new(file));
        }
        let files: [BufWriter<File>; 5] = files
            .try_into()
            .map_err(|_| Error::from("expected one file per table"))?;
        TableSet::new(files)
    }
}

impl<W: Write> TableSet<W> {
    /// Writers in `OUTPUT_FILE_NAMES` order.
    pub fn new(writers: [W; 5]) -> Result<Self> {
        let [nodes, node_tags, ways, way_nodes, way_tags] = writers;
        Ok(TableSet {
            nodes: TableWriter::new(nodes)?,
            node_tags: TableWriter::new(node_tags)?,
            ways: TableWriter::new(ways)?,
            way_nodes: TableWriter::new(way_nodes)?,
            way_tags: TableWriter::new(way_tags)?,
        })
    }

    pub fn write(&mut self, shaped: &ShapedElement) -> Result<()> {
        match shaped {
            ShapedElement::Node { node, tags } => {
                self.nodes.write(node)?;
                self.node_tags.write_all(tags)?;
            }
            ShapedElement::Way { way, nodes, tags } => {
                self.ways.write(way)?;
                self.way_nodes.write_all(nodes)?;
                self.way_tags.write_all(tags)?;
            }
        }
        Ok(())
    }

    pub fn counts(&self) -> TableCounts {
        TableCounts {
            nodes: self.nodes.rows(),
            node_tags: self.node_tags.rows(),
            ways: self.ways.rows(),
            way_nodes: self.way_nodes.rows(),
            way_tags: self.way_tags.rows(),
        }
    }

    /// Flushes every table and hands back the underlying writers.
    pub fn finish(self) -> Result<[W; 5]> {
        Ok([
            self.nodes.into_inner()?,
            self.node_tags.into_inner()?,
            self.ways.into_inner()?,
            self.way_nodes.into_inner()?,
            self.way_tags.into_inner()?,
        ])
    }
}
