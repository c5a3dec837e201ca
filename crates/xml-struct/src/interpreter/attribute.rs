//! Built-in attribute interpreters.

use super::{AttributeInterpreter, AttributeTarget};
use crate::context::ContextValue;
use crate::{ParsedValue, QualifiedName, Result};

/// Directive value read as null.
pub const NULL_TOKEN: &str = "php:null";
/// Directive value read as `true`.
pub const TRUE_TOKEN: &str = "php:true";
/// Directive value read as `false`.
pub const FALSE_TOKEN: &str = "php:false";

/// Stores the attribute as keyed data on its element.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAttribute;

impl AttributeInterpreter for DefaultAttribute {
    fn process(&self, name: &QualifiedName, value: &str, target: AttributeTarget<'_>) -> Result<()> {
        target
            .element
            .add_attribute_data(name.local.clone(), ParsedValue::from(value));
        Ok(())
    }
}

/// Writes the attribute into the element's context under its local name.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructAttribute;

impl StructAttribute {
    /// Decode a directive value, honouring the null/true/false tokens.
    pub fn decode(value: &str) -> ContextValue {
        match value {
            NULL_TOKEN => ContextValue::Null,
            TRUE_TOKEN => ContextValue::Bool(true),
            FALSE_TOKEN => ContextValue::Bool(false),
            other => ContextValue::String(other.to_string()),
        }
    }
}

impl AttributeInterpreter for StructAttribute {
    fn process(&self, name: &QualifiedName, value: &str, target: AttributeTarget<'_>) -> Result<()> {
        target.context.set(name.local.clone(), Self::decode(value));
        Ok(())
    }
}

/// Discards the attribute.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyAttribute;

impl AttributeInterpreter for EmptyAttribute {
    fn process(&self, _name: &QualifiedName, _value: &str, _target: AttributeTarget<'_>) -> Result<()> {
        Ok(())
    }
}
