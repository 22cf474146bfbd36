use serde::Serialize;

/// A record that is written as one row of a table. `FIELDS` is the header and must list the
/// struct fields in declaration order, which is the order serde serializes them in.
pub trait Row: Serialize {
    const FIELDS: &'static [&'static str];
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub id: String,
    pub lat: String,
    pub lon: String,
    pub user: String,
    pub uid: String,
    pub version: String,
    pub changeset: String,
    pub timestamp: String,
}

impl Row for NodeRecord {
    const FIELDS: &'static [&'static str] = &[
        "id", "lat", "lon", "user", "uid", "version", "changeset", "timestamp",
    ];
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct WayRecord {
    pub id: String,
    pub user: String,
    pub uid: String,
    pub version: String,
    pub changeset: String,
    pub timestamp: String,
}

impl Row for WayRecord {
    const FIELDS: &'static [&'static str] = &[
        "id", "user", "uid", "version", "changeset", "timestamp",
    ];
}

/// Key/value annotation of a node or way. `id` is the owning element.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TagRecord {
    pub id: String,
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub tag_type: String,
}

impl Row for TagRecord {
    const FIELDS: &'static [&'static str] = &["id", "key", "value", "type"];
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct WayNodeRecord {
    pub id: String,
    pub node_id: String,
    pub position: usize,
}

impl Row for WayNodeRecord {
    const FIELDS: &'static [&'static str] = &["id", "node_id", "position"];
}
