use std::slice;

use crate::errors::{Error, ErrorKind, Result};

/// A fully parsed XML element with its attributes and subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Element {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn push_attribute(&mut self, key: String, value: String) {
        self.attributes.push((key, value));
    }

    pub fn push_child(&mut self, child: Element) {
        self.children.push(child);
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn required_attribute(&self, key: &str) -> Result<&str> {
        self.attribute(key).ok_or_else(|| {
            let owner = match self.attribute("id") {
                Some(id) => format!("<{} id=\"{}\">", self.name, id),
                None => format!("<{}>", self.name),
            };
            Error::new(
                ErrorKind::MissingAttribute,
                format!("{} has no attribute '{}'", owner, key),
            )
        })
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// All elements below this one called `name`, in document order.
    pub fn descendants<'a>(&'a self, name: &'a str) -> Descendants<'a> {
        Descendants {
            name,
            stack: vec![self.children().iter()],
        }
    }
}

pub struct Descendants<'a> {
    name: &'a str,
    stack: Vec<slice::Iter<'a, Element>>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let level = self.stack.last_mut()?;
            match level.next() {
                Some(element) => {
                    self.stack.push(element.children.iter());
                    if element.name == self.name {
                        return Some(element);
                    }
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str, id: &str) -> Element {
        let mut element = Element::new(name);
        element.push_attribute("id".to_string(), id.to_string());
        element
    }

    #[test]
    fn descendants_walk_in_document_order() {
        let mut inner = leaf("group", "g");
        inner.push_child(leaf("nd", "2"));
        inner.push_child(leaf("tag", "x"));
        inner.push_child(leaf("nd", "3"));

        let mut root = leaf("way", "w");
        root.push_child(leaf("nd", "1"));
        root.push_child(inner);
        root.push_child(leaf("nd", "4"));

        let ids: Vec<&str> = root
            .descendants("nd")
            .map(|nd| nd.attribute("id").unwrap())
            .collect();
        assert_eq!(ids, vec!["1", "2", "3", "4"]);
        assert_eq!(root.descendants("relation").count(), 0);
    }

    #[test]
    fn missing_attribute_names_the_element() {
        let element = leaf("node", "42");
        let err = element.required_attribute("lat").unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingAttribute);
        assert!(err.message.contains("id=\"42\""));
        assert!(err.message.contains("'lat'"));
    }
}
