//! Read XML documents into nested key/value structures.
//!
//! This crate streams an XML document through [`quick_xml`] and reduces it,
//! element by element, into a [`ParsedValue`]: text-only elements become
//! strings, elements with attributes or children become maps, and repeated
//! children can be grouped into lists. Annotations in a reserved namespace
//! ([`STRUCT_NAMESPACE`]) steer the reduction from inside the document.
//!
//! # Overview
//!
//! The main types are:
//! - [`Reader`]: reads one document from a [`LineSource`]
//! - [`ParsedValue`]: the structured result
//! - [`Options`]: text handling, key conflicts and include settings
//! - [`Registry`]: maps element and attribute names to interpreters
//!
//! # Example
//!
//! ```rust
//! use xml_struct::{Options, Reader};
//!
//! let xml = r#"<root xmlns:x="urn:xml-struct:directives" version="1.0">
//!   <item x:key="first">a</item>
//!   <item>b</item>
//! </root>"#;
//!
//! let data = Reader::from_string(xml, Options::default()).read().unwrap();
//! assert_eq!(data.get_path(&["root", "version"]).and_then(|v| v.as_str()), Some("1.0"));
//! assert_eq!(data.get_path(&["root", "first"]).and_then(|v| v.as_str()), Some("a"));
//! assert_eq!(data.get_path(&["root", "item"]).and_then(|v| v.as_str()), Some("b"));
//! ```
//!
//! # Directives
//!
//! Attributes in [`STRUCT_NAMESPACE`] configure the element carrying them:
//!
//! - `listElement="name"` stores children called `name` (or all children,
//!   for `*`) as list items
//! - `textKey="name"` keeps the element's text under `name` next to its
//!   attributes and children
//! - `key="name"` stores the element in its parent under `name`
//!
//! and `<include file="..."/>` splices the root of another document in
//! place. Other attributes in the namespace are ignored.

pub mod context;
pub mod error;
pub mod factory;
pub mod interpreter;
pub mod name;
pub mod options;
pub mod reader;
pub mod registry;
pub mod source;
pub mod value;

// Re-export main types
pub use context::{Context, ContextValue};
pub use error::{Error, InterpreterKind, Result};
pub use factory::{DefaultReaderFactory, ReaderFactory};
pub use interpreter::{
    AttributeInterpreter, DataKey, ElementData, ElementInterpreter, STRUCT_NAMESPACE,
};
pub use name::QualifiedName;
pub use options::{KeyConflict, OptionKey, OptionValue, Options};
pub use reader::Reader;
pub use registry::Registry;
pub use source::{FileDelegate, LineSource, StreamDelegate};
pub use value::ParsedValue;
