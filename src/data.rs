use self::osm::{NodeRecord, TagRecord, WayNodeRecord, WayRecord};

pub mod element;
pub mod osm;

/// Rows produced from a single top-level element of the .osm file, ready to be routed to
/// their tables.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapedElement {
    Node {
        node: NodeRecord,
        tags: Vec<TagRecord>,
    },
    Way {
        way: WayRecord,
        nodes: Vec<WayNodeRecord>,
        tags: Vec<TagRecord>,
    },
}
