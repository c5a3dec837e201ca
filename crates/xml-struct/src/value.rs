//! The structured value produced by reading a document.

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// A node of the structured result.
///
/// Maps keep insertion order, which matters while an element is being reduced
/// (later pairs replace or merge into earlier ones). Equality between two maps
/// ignores order.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ParsedValue {
    /// No content.
    #[default]
    Null,

    /// Text content.
    String(String),

    /// Ordered list of values.
    List(Vec<ParsedValue>),

    /// Keyed values.
    Map(IndexMap<String, ParsedValue>),
}

impl ParsedValue {
    /// Build a single-entry map.
    pub fn entry(key: impl Into<String>, value: ParsedValue) -> Self {
        let mut map = IndexMap::new();
        map.insert(key.into(), value);
        ParsedValue::Map(map)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ParsedValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParsedValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ParsedValue]> {
        match self {
            ParsedValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, ParsedValue>> {
        match self {
            ParsedValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a key in a map value.
    ///
    /// List values answer to their decimal indices, so `"0"` finds the first
    /// item the same way it would in a mixed map.
    pub fn get(&self, key: &str) -> Option<&ParsedValue> {
        match self {
            ParsedValue::Map(map) => map.get(key),
            ParsedValue::List(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    /// Follow a path of keys through nested maps and lists.
    pub fn get_path(&self, path: &[&str]) -> Option<&ParsedValue> {
        match path.split_first() {
            None => Some(self),
            Some((first, rest)) => self.get(first).and_then(|v| v.get_path(rest)),
        }
    }

    /// Split a single-entry map into its key and value.
    ///
    /// Readers hand back the document root this way; includes splice it into
    /// the including element.
    pub fn into_single_entry(self) -> Option<(String, ParsedValue)> {
        match self {
            ParsedValue::Map(map) if map.len() == 1 => map.into_iter().next(),
            _ => None,
        }
    }
}

impl From<&str> for ParsedValue {
    fn from(s: &str) -> Self {
        ParsedValue::String(s.to_string())
    }
}

impl From<String> for ParsedValue {
    fn from(s: String) -> Self {
        ParsedValue::String(s)
    }
}

impl From<Vec<ParsedValue>> for ParsedValue {
    fn from(items: Vec<ParsedValue>) -> Self {
        ParsedValue::List(items)
    }
}

impl Serialize for ParsedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ParsedValue::Null => serializer.serialize_unit(),
            ParsedValue::String(s) => serializer.serialize_str(s),
            ParsedValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            ParsedValue::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
        }
    }
}
