//! The sentinel below the document root.

use super::{DataKey, ElementData};
use crate::ParsedValue;

/// Receives the reduced value of the top-level element.
///
/// A well-formed document hands it exactly one pair. If it is handed more
/// (which the reader prevents), the last one wins.
#[derive(Debug, Clone, Default)]
pub struct RootContainer {
    data: Option<ElementData>,
}

impl RootContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_element_data(&mut self, data: ElementData) {
        self.data = Some(data);
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// The final result: a single-entry map keyed by the root element, or
    /// null when the root contributed nothing.
    pub fn into_value(self) -> ParsedValue {
        match self.data {
            Some(ElementData {
                key: DataKey::Named(key),
                value,
            }) => ParsedValue::entry(key, value),
            Some(ElementData {
                key: DataKey::Item,
                value,
            }) => ParsedValue::List(vec![value]),
            None => ParsedValue::Null,
        }
    }
}
