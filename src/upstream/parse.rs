//! Parse functions - turn raw upstream bodies into document trees and
//! read fields out of them through ordered fallback chains

use crate::upstream::types::UpstreamError;
use crate::upstream::utils::{parse_float, parse_int, snippet};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::Value;
use tracing::warn;

/// Read access to the flat fields of one upstream record.
///
/// Upstream families spell the same logical field differently (Korean tag
/// names on older service versions, English ones on newer), so every lookup
/// takes an ordered list of candidate keys and the first non-empty value wins.
pub trait FieldSource {
    /// Trimmed value stored under exactly `key`, if any
    fn field(&self, key: &str) -> Option<String>;

    fn text(&self, keys: &[&str]) -> String {
        keys.iter()
            .filter_map(|key| self.field(key))
            .find(|value| !value.is_empty())
            .unwrap_or_default()
    }

    fn int(&self, keys: &[&str]) -> i64 {
        parse_int(&self.text(keys))
    }

    fn float(&self, keys: &[&str]) -> f64 {
        parse_float(&self.text(keys))
    }
}

impl FieldSource for Value {
    fn field(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

// =============================================================================
// JSON
// =============================================================================

pub fn parse_json(body: &str) -> Result<Value, UpstreamError> {
    serde_json::from_str(body).map_err(|_| UpstreamError::InvalidJson {
        snippet: snippet(body, 200),
    })
}

/// Resolve the record array of a JSON payload.
///
/// `pointers` are JSON pointers tried in order; the first one that resolves to
/// an array or object wins. A lone object where an array was expected is
/// treated as a one-element array.
pub fn json_records<'a>(root: &'a Value, pointers: &[&str]) -> Vec<&'a Value> {
    for pointer in pointers {
        match root.pointer(pointer) {
            Some(Value::Array(items)) => return items.iter().collect(),
            Some(item @ Value::Object(_)) => return vec![item],
            _ => continue,
        }
    }
    Vec::new()
}

/// First value reachable through `pointers`, for single scalar/header lookups
pub fn json_first<'a>(root: &'a Value, pointers: &[&str]) -> Option<&'a Value> {
    pointers
        .iter()
        .filter_map(|pointer| root.pointer(pointer))
        .find(|value| !value.is_null())
}

// =============================================================================
// XML
// =============================================================================

/// One element of a parsed XML document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    fn named(name: impl Into<String>) -> Self {
        XmlElement {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Depth-first search for the first descendant called `name`
    pub fn find(&self, name: &str) -> Option<&XmlElement> {
        for child in &self.children {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.find(name) {
                return Some(found);
            }
        }
        None
    }

    /// Every descendant called `name`, in document order
    pub fn find_all<'a>(&'a self, name: &str) -> Vec<&'a XmlElement> {
        let mut found = Vec::new();
        self.collect_named(name, &mut found);
        found
    }

    fn collect_named<'a>(&'a self, name: &str, out: &mut Vec<&'a XmlElement>) {
        for child in &self.children {
            if child.name == name {
                out.push(child);
            } else {
                child.collect_named(name, out);
            }
        }
    }

    /// The `<item>` records of a data.go.kr style response
    pub fn items(&self) -> Vec<&XmlElement> {
        self.find_all("item")
    }
}

impl FieldSource for XmlElement {
    fn field(&self, key: &str) -> Option<String> {
        self.find(key).map(|el| el.text.trim().to_string())
    }
}

/// Parse XML text into an element tree rooted at a synthetic `#document` node.
///
/// Malformed documents are not an error: parsing stops at the first broken
/// construct and everything read up to that point is kept.
pub fn parse_xml(body: &str) -> XmlElement {
    let mut reader = Reader::from_str(body);
    let mut stack = vec![XmlElement::named("#document")];

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                stack.push(XmlElement::named(name));
            }
            Ok(Event::Empty(empty)) => {
                let name = String::from_utf8_lossy(empty.name().as_ref()).into_owned();
                attach(&mut stack, XmlElement::named(name));
            }
            Ok(Event::Text(text)) => {
                let value = match text.unescape() {
                    Ok(value) => value.into_owned(),
                    Err(_) => String::from_utf8_lossy(&text).into_owned(),
                };
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&value);
                }
            }
            Ok(Event::CData(data)) => {
                let value = String::from_utf8_lossy(&data.into_inner()).into_owned();
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&value);
                }
            }
            Ok(Event::End(_)) => {
                if stack.len() > 1 {
                    if let Some(done) = stack.pop() {
                        attach(&mut stack, done);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(
                    "Malformed XML at byte {}: {} (keeping partial document)",
                    reader.buffer_position(),
                    e
                );
                break;
            }
        }
    }

    // Close anything left open by a truncated document
    while stack.len() > 1 {
        if let Some(open) = stack.pop() {
            attach(&mut stack, open);
        }
    }

    stack.pop().unwrap_or_else(|| XmlElement::named("#document"))
}

fn attach(stack: &mut [XmlElement], element: XmlElement) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    }
}
