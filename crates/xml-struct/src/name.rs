//! Namespace-qualified names.

use std::fmt;

/// Separator between namespace URI and local name in raw names handed out by
/// the event source. URIs and XML names never contain a space.
pub const NAMESPACE_SEPARATOR: char = ' ';

/// A tag or attribute name split into namespace and local part.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    pub namespace: Option<String>,
    pub local: String,
}

impl QualifiedName {
    pub fn new(namespace: Option<&str>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            local: local.into(),
        }
    }

    /// Split a raw name on the last namespace separator.
    ///
    /// `"urn:x element"` gives namespace `urn:x` and local name `element`;
    /// a name without separator has no namespace.
    pub fn parse(raw: &str) -> Self {
        match raw.rsplit_once(NAMESPACE_SEPARATOR) {
            Some((namespace, local)) => Self::new(Some(namespace), local),
            None => Self::new(None, raw),
        }
    }

    /// Join namespace and local name back into the raw form.
    pub fn to_raw(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}{}{}", ns, NAMESPACE_SEPARATOR, self.local),
            None => self.local.clone(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local),
            None => write!(f, "{}", self.local),
        }
    }
}
