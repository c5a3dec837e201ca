//! Interpreter registry keyed by namespace and local name.
//!
//! Lookups fall back from the most specific registration to the least:
//!
//! 1. exact namespace, exact name
//! 2. any namespace, exact name
//! 3. exact namespace, any name
//! 4. any namespace, any name
//!
//! The first registered candidate wins. Without a registration for the full
//! wildcard an unmatched name has no interpreter.

use crate::context::{Context, KEY_OVERRIDE, LIST_ELEMENT, TEXT_KEY};
use crate::error::InterpreterKind;
use crate::interpreter::{
    AttributeInterpreter, DefaultAttribute, DefaultElement, ElementInterpreter, EmptyAttribute,
    INCLUDE_ELEMENT, IncludeElement, STRUCT_NAMESPACE, StructAttribute,
};
use crate::{Error, QualifiedName, Result};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Token matching any namespace or any local name.
pub const WILDCARD: &str = "*";

/// Builds an element interpreter for a start tag.
pub type ElementFactory = Rc<dyn Fn(&QualifiedName, &Context) -> Box<dyn ElementInterpreter>>;

/// Builds an attribute interpreter for one attribute.
pub type AttributeFactory = Rc<dyn Fn(&QualifiedName) -> Box<dyn AttributeInterpreter>>;

#[derive(Clone)]
enum Factory {
    Element(ElementFactory),
    Attribute(AttributeFactory),
}

/// Registry key. `namespace` is `None` for names without a namespace and
/// `Some("*")` for the namespace wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RegistryKey {
    kind: InterpreterKind,
    namespace: Option<String>,
    name: String,
}

#[derive(Clone, Default)]
pub struct Registry {
    entries: HashMap<RegistryKey, Factory>,
}

impl Registry {
    /// An empty registry. Every name is unmatched until something is registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry used by default readers.
    ///
    /// - any element: [`DefaultElement`]
    /// - `include` in [`STRUCT_NAMESPACE`]: [`IncludeElement`]
    /// - any attribute: [`DefaultAttribute`]
    /// - any other attribute in [`STRUCT_NAMESPACE`]: [`EmptyAttribute`]
    /// - `listElement`, `textKey` and `key` in [`STRUCT_NAMESPACE`]:
    ///   [`StructAttribute`]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_element(
            Some(WILDCARD),
            WILDCARD,
            Rc::new(|name: &QualifiedName, _: &Context| {
                Box::new(DefaultElement::new(&name.local)) as Box<dyn ElementInterpreter>
            }),
        );
        registry.register_element(
            Some(STRUCT_NAMESPACE),
            INCLUDE_ELEMENT,
            Rc::new(|name: &QualifiedName, _: &Context| {
                Box::new(IncludeElement::new(&name.local)) as Box<dyn ElementInterpreter>
            }),
        );
        registry.register_attribute(
            Some(WILDCARD),
            WILDCARD,
            Rc::new(|_: &QualifiedName| Box::new(DefaultAttribute) as Box<dyn AttributeInterpreter>),
        );
        registry.register_attribute(
            Some(STRUCT_NAMESPACE),
            WILDCARD,
            Rc::new(|_: &QualifiedName| Box::new(EmptyAttribute) as Box<dyn AttributeInterpreter>),
        );
        for directive in [LIST_ELEMENT, TEXT_KEY, KEY_OVERRIDE] {
            registry.register_attribute(
                Some(STRUCT_NAMESPACE),
                directive,
                Rc::new(|_: &QualifiedName| {
                    Box::new(StructAttribute) as Box<dyn AttributeInterpreter>
                }),
            );
        }
        registry
    }

    pub fn register_element(&mut self, namespace: Option<&str>, name: &str, factory: ElementFactory) {
        self.insert(InterpreterKind::Element, namespace, name, Factory::Element(factory));
    }

    pub fn register_attribute(
        &mut self,
        namespace: Option<&str>,
        name: &str,
        factory: AttributeFactory,
    ) {
        self.insert(InterpreterKind::Attribute, namespace, name, Factory::Attribute(factory));
    }

    fn insert(&mut self, kind: InterpreterKind, namespace: Option<&str>, name: &str, factory: Factory) {
        let key = RegistryKey {
            kind,
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
        };
        self.entries.insert(key, factory);
    }

    fn lookup(&self, kind: InterpreterKind, name: &QualifiedName) -> Option<&Factory> {
        let namespace = name.namespace.as_deref();
        let candidates = [
            (namespace, name.local.as_str()),
            (Some(WILDCARD), name.local.as_str()),
            (namespace, WILDCARD),
            (Some(WILDCARD), WILDCARD),
        ];
        candidates.into_iter().find_map(|(namespace, local)| {
            self.entries.get(&RegistryKey {
                kind,
                namespace: namespace.map(str::to_string),
                name: local.to_string(),
            })
        })
    }

    /// Find the element factory for a tag name.
    pub fn element(&self, name: &QualifiedName) -> Result<ElementFactory> {
        match self.lookup(InterpreterKind::Element, name) {
            Some(Factory::Element(factory)) => Ok(Rc::clone(factory)),
            _ => Err(Error::NoInterpreterFound {
                kind: InterpreterKind::Element,
                name: name.to_string(),
            }),
        }
    }

    /// Find the attribute factory for an attribute name.
    pub fn attribute(&self, name: &QualifiedName) -> Result<AttributeFactory> {
        match self.lookup(InterpreterKind::Attribute, name) {
            Some(Factory::Attribute(factory)) => Ok(Rc::clone(factory)),
            _ => Err(Error::NoInterpreterFound {
                kind: InterpreterKind::Attribute,
                name: name.to_string(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self
            .entries
            .keys()
            .map(|k| {
                format!(
                    "{}:{}:{}",
                    k.kind,
                    k.namespace.as_deref().unwrap_or(""),
                    k.name
                )
            })
            .collect();
        keys.sort();
        f.debug_struct("Registry").field("entries", &keys).finish()
    }
}
