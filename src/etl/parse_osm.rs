use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use xz::bufread::XzDecoder;

use crate::data::element::Element;
use crate::errors::{Error, ErrorKind, Result};

pub type Source = Box<dyn BufRead + Send>;

/// Opens an .osm file, decompressing it on the fly when it ends in `.xz`.
pub fn open_source(path: &Path) -> Result<Source> {
    let file = fs::File::open(path)
        .map_err(|err| Error::new(ErrorKind::Io, format!("{}: {}", path.display(), err)))?;
    let file_reader = BufReader::new(file);
    if path.extension().is_some_and(|ext| ext == "xz") {
        let xz_reader = XzDecoder::new(file_reader);
        Ok(Box::new(BufReader::new(xz_reader)))
    } else {
        Ok(Box::new(file_reader))
    }
}

/// Pull-based reader yielding every element whose name is in `tags`, complete with its
/// subtree, in document order. Nothing outside the element currently being assembled is
/// kept in memory.
pub struct ElementReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    tags: Vec<String>,
    // Open elements of the subtree being assembled, outermost first.
    stack: Vec<Element>,
    depth: usize,
    seen_root: bool,
    finished: bool,
}

impl<R: BufRead> ElementReader<R> {
    pub fn new(source: R, tags: &[&str]) -> Self {
        let mut reader = Reader::from_reader(source);
        reader.trim_text(true);

        ElementReader {
            reader,
            buf: Vec::new(),
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
            stack: Vec::new(),
            depth: 0,
            seen_root: false,
            finished: false,
        }
    }

    fn open(stack: &mut Vec<Element>, tags: &[String], el: &BytesStart) -> Result<bool> {
        let qname = el.name();
        let name = str::from_utf8(qname.as_ref())?;
        if stack.is_empty() && !tags.iter().any(|tag| tag == name) {
            return Ok(false);
        }

        let mut element = Element::new(name);
        for attribute_res in el.attributes() {
            let attribute = attribute_res?;
            let key = str::from_utf8(attribute.key.as_ref())?.to_string();
            let value = attribute.unescape_value()?.into_owned();
            element.push_attribute(key, value);
        }
        stack.push(element);
        Ok(true)
    }

    fn close(stack: &mut Vec<Element>) -> Option<Element> {
        let element = stack.pop()?;
        match stack.last_mut() {
            Some(parent) => {
                parent.push_child(element);
                None
            }
            None => Some(element),
        }
    }

    fn next_element(&mut self) -> Result<Option<Element>> {
        loop {
            let completed = match self.reader.read_event_into(&mut self.buf)? {
                Event::Eof => {
                    if !self.seen_root {
                        return Err(Error::new(ErrorKind::Xml, "document has no root element"));
                    }
                    if self.depth > 0 {
                        return Err(Error::new(
                            ErrorKind::Xml,
                            format!("document ended with {} unclosed element(s)", self.depth),
                        ));
                    }
                    return Ok(None);
                }
                Event::Start(e) => {
                    self.seen_root = true;
                    self.depth += 1;
                    Self::open(&mut self.stack, &self.tags, &e)?;
                    None
                }
                Event::Empty(e) => {
                    self.seen_root = true;
                    if Self::open(&mut self.stack, &self.tags, &e)? {
                        Self::close(&mut self.stack)
                    } else {
                        None
                    }
                }
                Event::End(_e) => {
                    self.depth = self.depth.checked_sub(1).ok_or_else(|| {
                        Error::new(ErrorKind::Xml, "closing tag without an open element")
                    })?;
                    Self::close(&mut self.stack)
                }
                // Text, comments, declarations and the like carry nothing we keep.
                _ => None,
            };
            // the finished subtree is owned by `completed`, so the buffer can be reused
            self.buf.clear();

            if completed.is_some() {
                return Ok(completed);
            }
        }
    }
}

impl<R: BufRead> Iterator for ElementReader<R> {
    type Item = Result<Element>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_element() {
            Ok(Some(element)) => Some(Ok(element)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                let position = self.reader.buffer_position();
                Some(Err(Error::new(
                    err.kind,
                    format!("{} (at byte {})", err.message, position),
                )))
            }
        }
    }
}
