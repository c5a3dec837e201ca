//! The default element reducer.
//!
//! While an element is open it collects `(key, value)` pairs from attributes
//! and closed children, in arrival order, plus its text runs. When it closes
//! the pairs are reduced with the element's own context:
//!
//! - element children whose key matches the list-grouping directive (or all
//!   of them, for `*`) become list items at positions 0, 1, 2, ...
//! - other pairs become map entries, with duplicate keys resolved by the
//!   [`KeyConflict`] policy
//! - with a text-merge directive the element's text is added as one more
//!   pair, last
//! - an element without pairs reduces to its text; with no text either it
//!   hands nothing to its parent
//!
//! A container holding only list items comes out as a list; as soon as a
//! named entry is present it is a map, and list items sit under their
//! decimal positions.

use super::{DataKey, ElementData, ElementInterpreter, ReadScope};
use crate::context::Context;
use crate::options::{KeyConflict, Options};
use crate::{ParsedValue, Result};
use indexmap::IndexMap;

/// Where a collected pair came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Attribute,
    Element,
    Text,
}

#[derive(Debug, Clone)]
struct Pair {
    key: DataKey,
    value: ParsedValue,
    origin: Origin,
}

/// Character data of one element, split at child elements.
#[derive(Debug, Clone, Default)]
pub(crate) struct TextRuns {
    current: String,
    runs: Vec<String>,
}

impl TextRuns {
    pub(crate) fn push(&mut self, text: &str, options: &Options) {
        if options.text_skip_empty() && text.trim().is_empty() {
            return;
        }
        self.current.push_str(text);
    }

    /// End the current run; called when a child element closes.
    pub(crate) fn interrupt(&mut self) {
        if !self.current.is_empty() {
            self.runs.push(std::mem::take(&mut self.current));
        }
    }

    fn trimmed<'a>(&'a self, options: &Options) -> impl Iterator<Item = &'a str> {
        let trim = options.text_trim();
        self.runs
            .iter()
            .chain(std::iter::once(&self.current))
            .filter(|run| !run.is_empty())
            .map(move |run| if trim { run.trim() } else { run.as_str() })
    }

    /// Every run trimmed on its own, then concatenated.
    fn joined(&self, options: &Options) -> Option<ParsedValue> {
        let text: String = self.trimmed(options).collect();
        if text.is_empty() && options.text_skip_empty() {
            None
        } else {
            Some(ParsedValue::String(text))
        }
    }

    /// Every run as its own list item, trimmed individually.
    fn separate(&self, options: &Options) -> Option<ParsedValue> {
        let runs: Vec<ParsedValue> = self
            .trimmed(options)
            .filter(|run| !(run.is_empty() && options.text_skip_empty()))
            .map(ParsedValue::from)
            .collect();
        if runs.is_empty() && options.text_skip_empty() {
            None
        } else {
            Some(ParsedValue::List(runs))
        }
    }
}

/// The general-purpose element interpreter.
#[derive(Debug, Clone)]
pub struct DefaultElement {
    name: String,
    pairs: Vec<Pair>,
    text: TextRuns,
}

impl DefaultElement {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            pairs: Vec::new(),
            text: TextRuns::default(),
        }
    }

    fn push(&mut self, key: DataKey, value: ParsedValue, origin: Origin) {
        self.pairs.push(Pair { key, value, origin });
    }

    /// Reduce the collected data into this element's value.
    fn reduce(mut self, context: &Context, options: &Options) -> ParsedValue {
        self.text.interrupt();

        if let Some(text_key) = context.text_key() {
            let text = if options.text_join() {
                self.text.joined(options)
            } else {
                self.text.separate(options)
            };
            if let Some(text) = text {
                self.push(DataKey::Named(text_key.to_string()), text, Origin::Text);
            }
        }

        if self.pairs.is_empty() {
            return if context.text_key().is_some() {
                ParsedValue::Null
            } else {
                self.text.joined(options).unwrap_or_default()
            };
        }

        reduce_pairs(self.pairs, context, options.key_conflict())
    }
}

fn reduce_pairs(pairs: Vec<Pair>, context: &Context, policy: KeyConflict) -> ParsedValue {
    let mut entries: IndexMap<String, ParsedValue> = IndexMap::new();
    let mut duplicates: IndexMap<String, Vec<ParsedValue>> = IndexMap::new();
    let mut items = 0usize;
    let mut named = false;

    for Pair { key, value, origin } in pairs {
        let key = match key {
            DataKey::Item => None,
            DataKey::Named(key) if origin == Origin::Element && context.groups_as_list(&key) => {
                None
            }
            DataKey::Named(key) => Some(key),
        };

        let Some(key) = key else {
            entries.insert(items.to_string(), value);
            items += 1;
            continue;
        };

        named = true;
        match policy {
            KeyConflict::Replace => {
                entries.insert(key, value);
            }
            KeyConflict::Merge => {
                if entries.contains_key(&key) {
                    duplicates.entry(key).or_default().push(value);
                } else {
                    entries.insert(key, value);
                }
            }
        }
    }

    for (key, rest) in duplicates {
        if let Some(slot) = entries.get_mut(&key) {
            let mut all = Vec::with_capacity(rest.len() + 1);
            all.push(std::mem::take(slot));
            all.extend(rest);
            *slot = ParsedValue::List(all);
        }
    }

    if named {
        ParsedValue::Map(entries)
    } else {
        ParsedValue::List(entries.into_values().collect())
    }
}

impl ElementInterpreter for DefaultElement {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_element_data(&mut self, key: DataKey, value: ParsedValue) {
        self.text.interrupt();
        self.push(key, value, Origin::Element);
    }

    fn add_attribute_data(&mut self, key: String, value: ParsedValue) {
        self.push(DataKey::Named(key), value, Origin::Attribute);
    }

    fn add_character_data(&mut self, text: &str, options: &Options) {
        self.text.push(text, options);
    }

    fn finish(self: Box<Self>, scope: &ReadScope<'_>) -> Result<Option<ElementData>> {
        let key = match scope.context.key_override() {
            Some(key) => key.to_string(),
            None => self.name.clone(),
        };
        let value = self.reduce(scope.context, scope.options);
        if value.is_null() {
            tracing::trace!(element = %key, "Element reduced to nothing");
            return Ok(None);
        }
        tracing::trace!(element = %key, "Reduced element");
        Ok(Some(ElementData::new(key, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{KEY_OVERRIDE, LIST_ELEMENT, TEXT_KEY};
    use crate::interpreter::IncludeSession;
    use crate::registry::Registry;
    use pretty_assertions::assert_eq;
    use std::rc::Rc;

    fn context_with(pairs: &[(&str, &str)]) -> Context {
        let mut context = Context::new();
        for (key, value) in pairs {
            context.set(*key, (*value).into());
        }
        context
    }

    fn contribution(
        element: DefaultElement,
        context: &Context,
        options: &Options,
    ) -> Option<ElementData> {
        let scope = ReadScope {
            context,
            options,
            registry: &Rc::new(Registry::with_defaults()),
            includes: &IncludeSession::default(),
        };
        Box::new(element).finish(&scope).unwrap()
    }

    fn finish_with(element: DefaultElement, context: &Context, options: &Options) -> ElementData {
        contribution(element, context, options).unwrap()
    }

    fn value_of(element: DefaultElement, context: &Context) -> ParsedValue {
        finish_with(element, context, &Options::default()).value
    }

    fn json(value: &ParsedValue) -> serde_json::Value {
        serde_json::to_value(value).unwrap()
    }

    #[test]
    fn test_text_only_element() {
        let mut element = DefaultElement::new("element");
        element.add_character_data("  value \n", &Options::default());
        let data = finish_with(element, &Context::new(), &Options::default());
        assert_eq!(data.key, DataKey::from("element"));
        assert_eq!(data.value, ParsedValue::from("value"));
    }

    #[test]
    fn test_empty_element_contributes_nothing() {
        let element = DefaultElement::new("element");
        assert_eq!(contribution(element, &Context::new(), &Options::default()), None);

        let context = context_with(&[(TEXT_KEY, "text")]);
        let mut element = DefaultElement::new("element");
        element.add_character_data("  ", &Options::default());
        assert_eq!(contribution(element, &context, &Options::default()), None);
    }

    #[test]
    fn test_empty_element_without_skip_is_empty_string() {
        let options = Options::default().with_text_skip_empty(false);
        let mut element = DefaultElement::new("element");
        element.add_character_data("   ", &options);
        let data = finish_with(element, &Context::new(), &options);
        assert_eq!(data.value, ParsedValue::from(""));
    }

    #[test]
    fn test_replace_policy_last_wins() {
        let mut element = DefaultElement::new("root");
        element.add_attribute_data("test".into(), "overwritten".into());
        element.add_element_data("test".into(), "value".into());
        assert_eq!(
            json(&value_of(element, &Context::new())),
            serde_json::json!({"test": "value"})
        );
    }

    #[test]
    fn test_merge_policy_collects_duplicates() {
        let options = Options::default().with_key_conflict(KeyConflict::Merge);
        let mut element = DefaultElement::new("root");
        element.add_element_data("a".into(), "1".into());
        element.add_element_data("b".into(), "x".into());
        element.add_element_data("a".into(), "2".into());
        element.add_element_data("a".into(), "3".into());
        let data = finish_with(element, &Context::new(), &options);
        assert_eq!(
            json(&data.value),
            serde_json::json!({"a": ["1", "2", "3"], "b": "x"})
        );
    }

    #[test]
    fn test_list_grouping_only_items() {
        let context = context_with(&[(LIST_ELEMENT, "item")]);
        let mut element = DefaultElement::new("root");
        element.add_element_data("item".into(), "0".into());
        element.add_element_data("item".into(), "1".into());
        assert_eq!(
            value_of(element, &context),
            ParsedValue::List(vec!["0".into(), "1".into()])
        );
    }

    #[test]
    fn test_list_grouping_with_named_sibling() {
        let context = context_with(&[(LIST_ELEMENT, "item")]);
        let mut element = DefaultElement::new("root");
        element.add_element_data("item".into(), "0".into());
        element.add_element_data("extra".into(), "extra".into());
        element.add_element_data("item".into(), "1".into());
        assert_eq!(
            json(&value_of(element, &context)),
            serde_json::json!({"0": "0", "extra": "extra", "1": "1"})
        );
    }

    #[test]
    fn test_attributes_never_become_list_items() {
        let context = context_with(&[(LIST_ELEMENT, "item")]);
        let mut element = DefaultElement::new("root");
        element.add_attribute_data("item".into(), "attr".into());
        element.add_element_data("item".into(), "child".into());
        assert_eq!(
            json(&value_of(element, &context)),
            serde_json::json!({"item": "attr", "0": "child"})
        );
    }

    #[test]
    fn test_merge_policy_ignores_list_items() {
        let options = Options::default().with_key_conflict(KeyConflict::Merge);
        let context = context_with(&[(LIST_ELEMENT, "*")]);
        let mut element = DefaultElement::new("root");
        element.add_element_data("a".into(), "1".into());
        element.add_element_data("a".into(), "2".into());
        let data = finish_with(element, &context, &options);
        assert_eq!(data.value, ParsedValue::List(vec!["1".into(), "2".into()]));
    }

    #[test]
    fn test_item_key_is_always_a_list_item() {
        let mut element = DefaultElement::new("root");
        element.add_element_data(DataKey::Item, "spliced".into());
        element.add_element_data("name".into(), "n".into());
        assert_eq!(
            json(&value_of(element, &Context::new())),
            serde_json::json!({"0": "spliced", "name": "n"})
        );
    }

    #[test]
    fn test_text_key_appends_text_last() {
        let context = context_with(&[(TEXT_KEY, "value")]);
        let mut element = DefaultElement::new("root");
        element.add_attribute_data("value".into(), "attribute".into());
        element.add_character_data("text", &Options::default());
        assert_eq!(
            json(&value_of(element, &context)),
            serde_json::json!({"value": "text"})
        );
    }

    #[test]
    fn test_text_key_with_merge_policy() {
        let options = Options::default().with_key_conflict(KeyConflict::Merge);
        let context = context_with(&[(TEXT_KEY, "value")]);
        let mut element = DefaultElement::new("root");
        element.add_attribute_data("value".into(), "attribute".into());
        element.add_character_data("text", &options);
        let data = finish_with(element, &context, &options);
        assert_eq!(
            json(&data.value),
            serde_json::json!({"value": ["attribute", "text"]})
        );
    }

    #[test]
    fn test_separate_text_runs() {
        let options = Options::default().with_text_join(false);
        let context = context_with(&[(TEXT_KEY, "text")]);
        let mut element = DefaultElement::new("root");
        element.add_character_data(" a ", &options);
        element.add_element_data("b".into(), "c".into());
        element.add_character_data(" d ", &options);
        let data = finish_with(element, &context, &options);
        assert_eq!(
            json(&data.value),
            serde_json::json!({"b": "c", "text": ["a", "d"]})
        );
    }

    #[test]
    fn test_joined_text_runs_are_trimmed_each() {
        let context = context_with(&[(TEXT_KEY, "text")]);
        let mut element = DefaultElement::new("root");
        element.add_character_data(" a ", &Options::default());
        element.add_element_data("b".into(), "c".into());
        element.add_character_data(" d ", &Options::default());
        assert_eq!(
            json(&value_of(element, &context)),
            serde_json::json!({"b": "c", "text": "ad"})
        );
    }

    #[test]
    fn test_text_without_key_is_dropped_next_to_children() {
        let mut element = DefaultElement::new("root");
        element.add_character_data("lost", &Options::default());
        element.add_element_data("b".into(), "c".into());
        assert_eq!(
            json(&value_of(element, &Context::new())),
            serde_json::json!({"b": "c"})
        );
    }

    #[test]
    fn test_key_override() {
        let context = context_with(&[(KEY_OVERRIDE, "renamed")]);
        let mut element = DefaultElement::new("original");
        element.add_character_data("v", &Options::default());
        let data = finish_with(element, &context, &Options::default());
        assert_eq!(data.key, DataKey::from("renamed"));
        assert_eq!(data.value, ParsedValue::from("v"));
    }
}
