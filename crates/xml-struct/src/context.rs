//! Parse-time context carried down the element tree.
//!
//! Every element starts with a copy of its parent's context. Directive
//! attributes write into the copy of the element that carries them, so a
//! directive affects that element's own reduction. The single-use directives
//! (list grouping, text merging, key override) are dropped from the copy a
//! child receives; any other value stays visible to all descendants.
//!
//! Snapshots share their storage until one of them is written to, so
//! entering an element is a reference-count bump rather than a map copy.

use indexmap::IndexMap;
use std::rc::Rc;

/// Context key naming the child key whose elements become list items.
pub const LIST_ELEMENT: &str = "listElement";

/// Context key naming the map key that receives the element's own text.
pub const TEXT_KEY: &str = "textKey";

/// Context key replacing the key an element is stored under in its parent.
pub const KEY_OVERRIDE: &str = "key";

/// The wildcard list-grouping key: every element child becomes a list item.
pub const LIST_WILDCARD: &str = "*";

const SINGLE_USE: [&str; 3] = [LIST_ELEMENT, TEXT_KEY, KEY_OVERRIDE];

/// A value stored in a context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextValue {
    Null,
    Bool(bool),
    String(String),
}

impl ContextValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ContextValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for ContextValue {
    fn from(s: &str) -> Self {
        ContextValue::String(s.to_string())
    }
}

/// One context snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    values: Rc<IndexMap<String, ContextValue>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: ContextValue) {
        Rc::make_mut(&mut self.values).insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<ContextValue> {
        if !self.values.contains_key(key) {
            return None;
        }
        Rc::make_mut(&mut self.values).shift_remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The snapshot a child element starts from.
    pub fn descend(&self) -> Context {
        let mut child = self.clone();
        for key in SINGLE_USE {
            child.remove(key);
        }
        child
    }

    /// Active list-grouping key, if any.
    pub fn list_element(&self) -> Option<&str> {
        self.get(LIST_ELEMENT).and_then(ContextValue::as_str)
    }

    /// Active text-merge key, if any.
    pub fn text_key(&self) -> Option<&str> {
        self.get(TEXT_KEY).and_then(ContextValue::as_str)
    }

    /// Key override for storing this element in its parent, if any.
    pub fn key_override(&self) -> Option<&str> {
        self.get(KEY_OVERRIDE).and_then(ContextValue::as_str)
    }

    /// Whether a pair with `key` becomes a list item under this context.
    pub fn groups_as_list(&self, key: &str) -> bool {
        self.list_element()
            .is_some_and(|list| list == LIST_WILDCARD || list == key)
    }
}

/// The stack of context snapshots, one per open element plus the root.
#[derive(Debug, Clone)]
pub struct ContextStack {
    frames: Vec<Context>,
}

impl ContextStack {
    /// Create a stack holding the root context.
    pub fn new(root: Context) -> Self {
        Self { frames: vec![root] }
    }

    /// Enter an element: push the snapshot its interpreter will use.
    pub fn push_child(&mut self) -> &mut Context {
        let child = self.top().descend();
        self.frames.push(child);
        self.top_mut()
    }

    /// Leave an element. The root frame is never popped.
    pub fn pop(&mut self) -> Option<Context> {
        if self.frames.len() > 1 {
            self.frames.pop()
        } else {
            None
        }
    }

    pub fn top(&self) -> &Context {
        &self.frames[self.frames.len() - 1]
    }

    pub fn top_mut(&mut self) -> &mut Context {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    pub fn root(&self) -> &Context {
        &self.frames[0]
    }

    /// Number of open elements.
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }
}
