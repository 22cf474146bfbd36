use once_cell::sync::Lazy;
use regex::Regex;

use crate::data::element::Element;
use crate::data::osm::{NodeRecord, TagRecord, WayNodeRecord, WayRecord};
use crate::data::ShapedElement;
use crate::errors::Result;

pub const DEFAULT_TAG_TYPE: &str = "regular";

/// `type:key` keys, e.g. `addr:street`. Anything after the first colon stays in the key.
static LOWER_COLON: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z_]+:[a-z_]+").unwrap());
/// Keys containing any of these are not usable as column values and are dropped.
static PROBLEM_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[=+/&<>;'"?%#$@,. \t\r\n]"#).unwrap());
static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").unwrap());

/// Turns a `<node>` or `<way>` into its table rows. Other elements shape to `None`.
pub fn shape_element(element: &Element) -> Result<Option<ShapedElement>> {
    match element.name() {
        "node" => shape_node(element).map(Some),
        "way" => shape_way(element).map(Some),
        _ => Ok(None),
    }
}

fn shape_node(element: &Element) -> Result<ShapedElement> {
    let node = NodeRecord {
        id: element.required_attribute("id")?.to_string(),
        lat: element.required_attribute("lat")?.to_string(),
        lon: element.required_attribute("lon")?.to_string(),
        user: element.required_attribute("user")?.to_string(),
        uid: element.required_attribute("uid")?.to_string(),
        version: element.required_attribute("version")?.to_string(),
        changeset: element.required_attribute("changeset")?.to_string(),
        timestamp: element.required_attribute("timestamp")?.to_string(),
    };

    let mut tags = Vec::new();
    for tag in element.descendants("tag") {
        if let Some(mut record) = shape_tag(&node.id, tag)? {
            record.value = normalize_node_value(tag.required_attribute("k")?, &record);
            tags.push(record);
        }
    }

    Ok(ShapedElement::Node { node, tags })
}

fn shape_way(element: &Element) -> Result<ShapedElement> {
    let way = WayRecord {
        id: element.required_attribute("id")?.to_string(),
        user: element.required_attribute("user")?.to_string(),
        uid: element.required_attribute("uid")?.to_string(),
        version: element.required_attribute("version")?.to_string(),
        changeset: element.required_attribute("changeset")?.to_string(),
        timestamp: element.required_attribute("timestamp")?.to_string(),
    };

    let nodes = element
        .descendants("nd")
        .enumerate()
        .map(|(position, nd)| {
            Ok(WayNodeRecord {
                id: way.id.clone(),
                node_id: nd.required_attribute("ref")?.to_string(),
                position,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut tags = Vec::new();
    for tag in element.descendants("tag") {
        if let Some(record) = shape_tag(&way.id, tag)? {
            tags.push(record);
        }
    }

    Ok(ShapedElement::Way { way, nodes, tags })
}

/// Builds the row for one `<tag k=".." v=".."/>`, or `None` when the key is unusable.
fn shape_tag(owner_id: &str, tag: &Element) -> Result<Option<TagRecord>> {
    let raw_key = tag.required_attribute("k")?;
    let value = tag.required_attribute("v")?;

    if has_problem_chars(raw_key) {
        return Ok(None);
    }
    let (tag_type, key) = split_key(raw_key);

    Ok(Some(TagRecord {
        id: owner_id.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        tag_type: tag_type.to_string(),
    }))
}

pub fn has_problem_chars(key: &str) -> bool {
    PROBLEM_CHARS.is_match(key)
}

/// Splits a raw key into `(type, key)`.
pub fn split_key(raw_key: &str) -> (&str, &str) {
    if LOWER_COLON.is_match(raw_key) {
        if let Some((tag_type, key)) = raw_key.split_once(':') {
            return (tag_type, key);
        }
    }
    (DEFAULT_TAG_TYPE, raw_key)
}

fn normalize_node_value(raw_key: &str, tag: &TagRecord) -> String {
    if tag.key == "postcode" {
        normalize_postcode(&tag.value)
    } else if raw_key == "phone" {
        normalize_phone(&tag.value)
    } else {
        tag.value.clone()
    }
}

/// Dutch postcodes, "NNNN XX".
pub fn normalize_postcode(value: &str) -> String {
    let head: String = value.trim_start().chars().take(4).collect();
    let tail = value.trim_end();
    let tail_len = tail.chars().count();
    let tail: String = tail.chars().skip(tail_len.saturating_sub(2)).collect();
    format!("{} {}", head, tail)
}

/// Rewrites Dutch phone numbers to international notation based on how many digits they have.
pub fn normalize_phone(value: &str) -> String {
    let digits: String = DIGITS.find_iter(value).map(|m| m.as_str()).collect();
    match digits.len() {
        11 | 9 => format!("+{}", digits),
        12 => format!("+{}{}", &digits[..2], &digits[3..]),
        10 | 8 => format!("+31{}", &digits[1..]),
        13 => format!("+{}", &digits[2..]),
        7 => format!("+31{}", digits),
        _ => digits,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::etl::parse_osm::ElementReader;

    fn parse(xml: &str) -> Element {
        ElementReader::new(xml.as_bytes(), &["node", "way", "relation"])
            .next()
            .unwrap()
            .unwrap()
    }

    fn node_with_tags(tags: &str) -> String {
        format!(
            r#"<node id="46" lat="52.37" lon="4.89" user="anne" uid="7" version="3" changeset="900" timestamp="2016-01-01T00:00:00Z">{}</node>"#,
            tags
        )
    }

    fn node_tags(xml: &str) -> Vec<TagRecord> {
        match shape_element(&parse(xml)).unwrap() {
            Some(ShapedElement::Node { tags, .. }) => tags,
            other => panic!("expected a node, got {:?}", other),
        }
    }

    #[test]
    fn node_record_takes_every_column_from_attributes() {
        let shaped = shape_element(&parse(&node_with_tags(""))).unwrap().unwrap();
        let ShapedElement::Node { node, tags } = shaped else {
            panic!("expected a node");
        };
        assert_eq!(
            node,
            NodeRecord {
                id: "46".into(),
                lat: "52.37".into(),
                lon: "4.89".into(),
                user: "anne".into(),
                uid: "7".into(),
                version: "3".into(),
                changeset: "900".into(),
                timestamp: "2016-01-01T00:00:00Z".into(),
            }
        );
        assert!(tags.is_empty());
    }

    #[test]
    fn node_tags_belong_to_the_node() {
        let tags = node_tags(&node_with_tags(
            r#"<tag k="name" v="Dam"/><tag k="amenity" v="cafe"/><tag k="addr:street" v="Damrak"/>"#,
        ));
        assert_eq!(tags.len(), 3);
        assert!(tags.iter().all(|tag| tag.id == "46"));
    }

    #[test]
    fn keys_are_split_on_the_first_colon() {
        assert_eq!(split_key("addr:street"), ("addr", "street"));
        assert_eq!(split_key("addr:post:code"), ("addr", "post:code"));
        assert_eq!(split_key("is_in:country"), ("is_in", "country"));
        assert_eq!(split_key("name"), ("regular", "name"));
        assert_eq!(split_key("Addr:street"), ("regular", "Addr:street"));
        assert_eq!(split_key("name:NL"), ("regular", "name:NL"));
        assert_eq!(split_key(":street"), ("regular", ":street"));
    }

    #[test]
    fn keys_with_problem_chars_are_dropped() {
        let tags = node_tags(&node_with_tags(
            r#"<tag k="addr,street" v="x"/><tag k="addr:street" v="Damrak"/><tag k="fixme please" v="y"/><tag k="a.b" v="z"/>"#,
        ));
        assert_eq!(
            tags,
            vec![TagRecord {
                id: "46".into(),
                key: "street".into(),
                value: "Damrak".into(),
                tag_type: "addr".into(),
            }]
        );
        assert!(has_problem_chars("k=v"));
        assert!(has_problem_chars("a\tb"));
        assert!(!has_problem_chars("addr:housenumber"));
    }

    #[test]
    fn postcodes_are_reformatted() {
        assert_eq!(normalize_postcode(" 1234 AB "), "1234 AB");
        assert_eq!(normalize_postcode("1234AB"), "1234 AB");
        assert_eq!(normalize_postcode("1234   ab"), "1234 ab");

        let tags = node_tags(&node_with_tags(r#"<tag k="addr:postcode" v=" 1011AB"/>"#));
        assert_eq!(tags[0].key, "postcode");
        assert_eq!(tags[0].tag_type, "addr");
        assert_eq!(tags[0].value, "1011 AB");
    }

    #[test]
    fn phone_numbers_follow_the_length_table() {
        assert_eq!(normalize_phone("020-1234567"), "+31201234567");
        assert_eq!(normalize_phone("+31 20 1234567"), "+31201234567");
        assert_eq!(normalize_phone("0031 20 1234567"), "+31201234567");
        assert_eq!(normalize_phone("+31 (0)20 1234567"), "+31201234567");
        assert_eq!(normalize_phone("0800-1234"), "+318001234");
        assert_eq!(normalize_phone("612 345 678"), "+612345678");
        assert_eq!(normalize_phone("1234567"), "+311234567");
        assert_eq!(normalize_phone("12345"), "12345");
        assert_eq!(normalize_phone("tel: none"), "");
    }

    #[test]
    fn phone_normalization_applies_to_the_raw_phone_key_only() {
        let tags = node_tags(&node_with_tags(
            r#"<tag k="phone" v="020-1234567"/><tag k="contact:phone" v="020-1234567"/>"#,
        ));
        assert_eq!(tags[0].value, "+31201234567");
        assert_eq!(tags[1].key, "phone");
        assert_eq!(tags[1].value, "020-1234567");
    }

    #[test]
    fn way_members_are_numbered_in_document_order() {
        let xml = r#"<way id="10" user="bob" uid="8" version="2" changeset="901" timestamp="2017-02-02T00:00:00Z">
            <nd ref="3"/><nd ref="1"/><tag k="highway" v="residential"/><nd ref="2"/>
        </way>"#;
        let Some(ShapedElement::Way { way, nodes, tags }) = shape_element(&parse(xml)).unwrap() else {
            panic!("expected a way");
        };
        assert_eq!(way.id, "10");
        assert_eq!(way.changeset, "901");
        let members: Vec<(&str, &str, usize)> = nodes
            .iter()
            .map(|nd| (nd.id.as_str(), nd.node_id.as_str(), nd.position))
            .collect();
        assert_eq!(members, vec![("10", "3", 0), ("10", "1", 1), ("10", "2", 2)]);
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].tag_type, "regular");
    }

    #[test]
    fn way_tags_are_filtered_but_not_normalized() {
        let xml = r#"<way id="11" user="bob" uid="8" version="2" changeset="901" timestamp="t">
            <tag k="addr:postcode" v=" 1011AB"/><tag k="phone" v="020-1234567"/><tag k="bad key" v="x"/>
        </way>"#;
        let Some(ShapedElement::Way { tags, .. }) = shape_element(&parse(xml)).unwrap() else {
            panic!("expected a way");
        };
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].value, " 1011AB");
        assert_eq!(tags[1].value, "020-1234567");
    }

    #[test]
    fn missing_attributes_are_errors() {
        let err = shape_element(&parse(r#"<node id="1" lat="0" lon="0"/>"#)).unwrap_err();
        assert_eq!(err.kind, crate::errors::ErrorKind::MissingAttribute);

        let xml = r#"<way id="12" user="u" uid="1" version="1" changeset="1" timestamp="t"><nd/></way>"#;
        assert!(shape_element(&parse(xml)).is_err());
    }

    #[test]
    fn relations_shape_to_nothing() {
        let xml = r#"<relation id="5"><tag k="type" v="route"/></relation>"#;
        assert_eq!(shape_element(&parse(xml)).unwrap(), None);
    }
}
