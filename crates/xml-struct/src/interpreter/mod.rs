//! Element and attribute interpreters.
//!
//! An element interpreter is created when its start tag is seen, collects
//! attribute data, child data and text while the element is open, and reduces
//! everything to one value when the element closes. Attribute interpreters
//! process one attribute value each, writing either into the element or into
//! the element's context.
//!
//! Interpreters never point at their parent. The reader keeps open
//! interpreters on a stack and hands a closed element's data to whatever is
//! below it.

pub mod attribute;
pub mod element;
pub mod include;
pub mod root;

use crate::context::Context;
use crate::options::Options;
use crate::registry::Registry;
use crate::{ParsedValue, QualifiedName, Result};
use std::rc::Rc;

pub use attribute::{DefaultAttribute, EmptyAttribute, StructAttribute};
pub use element::DefaultElement;
pub use include::{IncludeElement, IncludeSession};
pub use root::RootContainer;

/// Namespace URI of the in-document directives.
pub const STRUCT_NAMESPACE: &str = "urn:xml-struct:directives";

/// Local name of the include element in [`STRUCT_NAMESPACE`].
pub const INCLUDE_ELEMENT: &str = "include";

/// Key an element's data is stored under in its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataKey {
    /// A mapping key.
    Named(String),
    /// The next list position of the parent.
    Item,
}

impl From<String> for DataKey {
    fn from(key: String) -> Self {
        DataKey::Named(key)
    }
}

impl From<&str> for DataKey {
    fn from(key: &str) -> Self {
        DataKey::Named(key.to_string())
    }
}

/// What a closed element hands to its parent.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    pub key: DataKey,
    pub value: ParsedValue,
}

impl ElementData {
    pub fn new(key: impl Into<DataKey>, value: ParsedValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Everything an interpreter may consult when its element closes.
#[derive(Debug, Clone, Copy)]
pub struct ReadScope<'a> {
    /// The closing element's own context snapshot.
    pub context: &'a Context,
    pub options: &'a Options,
    /// Interpreters of the reader doing the parse.
    pub registry: &'a Rc<Registry>,
    pub includes: &'a IncludeSession,
}

pub trait ElementInterpreter {
    /// Local name of the element this interpreter was created for.
    fn name(&self) -> &str;

    /// Accept the reduced value of a closed child.
    fn add_element_data(&mut self, key: DataKey, value: ParsedValue);

    /// Accept a value produced by an attribute interpreter.
    fn add_attribute_data(&mut self, key: String, value: ParsedValue);

    /// Accept a run of character data.
    fn add_character_data(&mut self, text: &str, options: &Options);

    /// Reduce the element. `None` means the parent receives nothing.
    fn finish(self: Box<Self>, scope: &ReadScope<'_>) -> Result<Option<ElementData>>;
}

/// Where an attribute interpreter may write.
pub struct AttributeTarget<'a> {
    pub element: &'a mut dyn ElementInterpreter,
    pub context: &'a mut Context,
}

pub trait AttributeInterpreter {
    fn process(&self, name: &QualifiedName, value: &str, target: AttributeTarget<'_>) -> Result<()>;
}
