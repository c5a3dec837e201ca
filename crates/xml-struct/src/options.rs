//! Reader options.
//!
//! Options are fixed once a reader is built. They can be assembled with the
//! `with_*` builders or read from string pairs, in which case keys are checked
//! against the closed [`OptionKey`] set and unknown keys are ignored.

use crate::factory::{DefaultReaderFactory, ReaderFactory};
use crate::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::str::FromStr;

/// Default bound on nested include parsing.
pub const DEFAULT_INCLUDE_MAX_DEPTH: usize = 32;

/// What happens when an element collects the same key twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyConflict {
    /// The last pair with a key wins.
    #[default]
    Replace,
    /// A key seen more than once becomes a list of all its values.
    Merge,
}

impl FromStr for KeyConflict {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "replace" => Ok(KeyConflict::Replace),
            "merge" => Ok(KeyConflict::Merge),
            other => Err(Error::invalid_argument(format!(
                "unknown key-conflict policy '{}'",
                other
            ))),
        }
    }
}

/// Recognised option keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKey {
    KeyConflict,
    TextTrim,
    TextJoin,
    TextSkipEmpty,
    IncludePath,
    IncludeReaderFactory,
    IncludeMaxDepth,
}

impl OptionKey {
    pub const ALL: [OptionKey; 7] = [
        OptionKey::KeyConflict,
        OptionKey::TextTrim,
        OptionKey::TextJoin,
        OptionKey::TextSkipEmpty,
        OptionKey::IncludePath,
        OptionKey::IncludeReaderFactory,
        OptionKey::IncludeMaxDepth,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OptionKey::KeyConflict => "key-conflict",
            OptionKey::TextTrim => "text-trim",
            OptionKey::TextJoin => "text-join",
            OptionKey::TextSkipEmpty => "text-skip-empty",
            OptionKey::IncludePath => "include-path",
            OptionKey::IncludeReaderFactory => "include-reader-factory",
            OptionKey::IncludeMaxDepth => "include-max-depth",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == name)
    }
}

/// A value stored under an [`OptionKey`].
#[derive(Debug, Clone)]
pub enum OptionValue {
    Bool(bool),
    Path(Option<PathBuf>),
    KeyConflict(KeyConflict),
    Number(usize),
    Factory(Rc<dyn ReaderFactory>),
}

#[derive(Debug, Clone)]
pub struct Options {
    key_conflict: KeyConflict,
    text_trim: bool,
    text_join: bool,
    text_skip_empty: bool,
    include_path: Option<PathBuf>,
    include_reader_factory: Option<Rc<dyn ReaderFactory>>,
    include_max_depth: usize,
    constants: HashMap<String, String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            key_conflict: KeyConflict::Replace,
            text_trim: true,
            text_join: true,
            text_skip_empty: true,
            include_path: None,
            include_reader_factory: None,
            include_max_depth: DEFAULT_INCLUDE_MAX_DEPTH,
            constants: HashMap::new(),
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build options from string pairs such as `("text-trim", "false")`.
    ///
    /// Unknown keys are ignored. A known key with a value that does not parse
    /// is an [`Error::InvalidArgument`]. The reader factory cannot be named
    /// by string and is set with [`Options::with_reader_factory`].
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self> {
        let mut options = Self::default();
        for (name, raw) in pairs {
            let Some(key) = OptionKey::parse(name) else {
                tracing::debug!(option = name, "Ignoring unknown option");
                continue;
            };
            let value = match key {
                OptionKey::KeyConflict => OptionValue::KeyConflict(raw.parse()?),
                OptionKey::TextTrim | OptionKey::TextJoin | OptionKey::TextSkipEmpty => {
                    OptionValue::Bool(parse_bool(name, raw)?)
                }
                OptionKey::IncludePath => {
                    OptionValue::Path((!raw.is_empty()).then(|| PathBuf::from(raw)))
                }
                OptionKey::IncludeMaxDepth => {
                    OptionValue::Number(raw.parse().map_err(|_| {
                        Error::invalid_argument(format!(
                            "option '{}' expects a number, got '{}'",
                            name, raw
                        ))
                    })?)
                }
                OptionKey::IncludeReaderFactory => {
                    return Err(Error::invalid_argument(format!(
                        "option '{}' cannot be given as text",
                        name
                    )));
                }
            };
            options = options.with(key, value);
        }
        Ok(options)
    }

    /// Set an option. A value of the wrong type for `key` is ignored.
    pub fn with(mut self, key: OptionKey, value: OptionValue) -> Self {
        match (key, value) {
            (OptionKey::KeyConflict, OptionValue::KeyConflict(policy)) => {
                self.key_conflict = policy;
            }
            (OptionKey::TextTrim, OptionValue::Bool(b)) => self.text_trim = b,
            (OptionKey::TextJoin, OptionValue::Bool(b)) => self.text_join = b,
            (OptionKey::TextSkipEmpty, OptionValue::Bool(b)) => self.text_skip_empty = b,
            (OptionKey::IncludePath, OptionValue::Path(path)) => self.include_path = path,
            (OptionKey::IncludeReaderFactory, OptionValue::Factory(factory)) => {
                self.include_reader_factory = Some(factory);
            }
            (OptionKey::IncludeMaxDepth, OptionValue::Number(n)) => self.include_max_depth = n,
            (key, value) => {
                tracing::warn!(option = key.as_str(), ?value, "Ignoring option value of the wrong type");
            }
        }
        self
    }

    /// Read an option, falling back to its default.
    pub fn get(&self, key: OptionKey) -> OptionValue {
        match key {
            OptionKey::KeyConflict => OptionValue::KeyConflict(self.key_conflict),
            OptionKey::TextTrim => OptionValue::Bool(self.text_trim),
            OptionKey::TextJoin => OptionValue::Bool(self.text_join),
            OptionKey::TextSkipEmpty => OptionValue::Bool(self.text_skip_empty),
            OptionKey::IncludePath => OptionValue::Path(self.include_path.clone()),
            OptionKey::IncludeReaderFactory => OptionValue::Factory(self.reader_factory()),
            OptionKey::IncludeMaxDepth => OptionValue::Number(self.include_max_depth),
        }
    }

    pub fn with_key_conflict(self, policy: KeyConflict) -> Self {
        self.with(OptionKey::KeyConflict, OptionValue::KeyConflict(policy))
    }

    pub fn with_text_trim(self, trim: bool) -> Self {
        self.with(OptionKey::TextTrim, OptionValue::Bool(trim))
    }

    pub fn with_text_join(self, join: bool) -> Self {
        self.with(OptionKey::TextJoin, OptionValue::Bool(join))
    }

    pub fn with_text_skip_empty(self, skip: bool) -> Self {
        self.with(OptionKey::TextSkipEmpty, OptionValue::Bool(skip))
    }

    pub fn with_include_path(self, path: impl Into<PathBuf>) -> Self {
        self.with(OptionKey::IncludePath, OptionValue::Path(Some(path.into())))
    }

    pub fn with_reader_factory(self, factory: Rc<dyn ReaderFactory>) -> Self {
        self.with(OptionKey::IncludeReaderFactory, OptionValue::Factory(factory))
    }

    pub fn with_include_max_depth(self, depth: usize) -> Self {
        self.with(OptionKey::IncludeMaxDepth, OptionValue::Number(depth))
    }

    /// Define a constant for `${NAME}` substitution in include paths.
    pub fn with_constant(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.constants.insert(name.into(), value.into());
        self
    }

    pub fn key_conflict(&self) -> KeyConflict {
        self.key_conflict
    }

    pub fn text_trim(&self) -> bool {
        self.text_trim
    }

    pub fn text_join(&self) -> bool {
        self.text_join
    }

    pub fn text_skip_empty(&self) -> bool {
        self.text_skip_empty
    }

    pub fn include_path(&self) -> Option<&Path> {
        self.include_path.as_deref()
    }

    pub fn include_max_depth(&self) -> usize {
        self.include_max_depth
    }

    /// The factory set with [`Options::with_reader_factory`], if any.
    pub fn configured_reader_factory(&self) -> Option<&Rc<dyn ReaderFactory>> {
        self.include_reader_factory.as_ref()
    }

    /// The factory used to build readers for included documents.
    ///
    /// Without a configured factory, includes read by a reader reuse that
    /// reader's registry; this fallback builds readers with the default one.
    pub fn reader_factory(&self) -> Rc<dyn ReaderFactory> {
        match &self.include_reader_factory {
            Some(factory) => Rc::clone(factory),
            None => Rc::new(DefaultReaderFactory::new()),
        }
    }

    /// Value of a named constant: the configured table first, then the
    /// process environment, else empty.
    pub fn constant(&self, name: &str) -> String {
        self.constants
            .get(name)
            .cloned()
            .or_else(|| std::env::var(name).ok())
            .unwrap_or_default()
    }
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(Error::invalid_argument(format!(
            "option '{}' expects a boolean, got '{}'",
            name, raw
        ))),
    }
}
