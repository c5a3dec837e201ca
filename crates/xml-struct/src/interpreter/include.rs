//! Splicing other documents into the current one.
//!
//! `<x:include file="..."/>` (or with a `<file>` child) reads another
//! document when it closes and hands the included root's key and value to
//! its parent, as if the included root element had been written in place.
//! A file that cannot be found contributes nothing.

use super::{DataKey, ElementData, ElementInterpreter, ReadScope};
use crate::factory::{DefaultReaderFactory, ReaderFactory};
use crate::options::Options;
use crate::source::FileDelegate;
use crate::{Error, ParsedValue, Result};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Metadata key naming the file to include.
pub const FILE_KEY: &str = "file";

/// Include bookkeeping shared by a reader and every reader it spawns for
/// included documents.
#[derive(Debug, Clone, Default)]
pub struct IncludeSession {
    depth: usize,
    cache: Rc<RefCell<HashMap<PathBuf, ParsedValue>>>,
}

impl IncludeSession {
    /// Number of includes between this reader and the outermost one.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The session for a reader one include deeper, sharing the cache.
    pub fn nested(&self) -> Self {
        Self {
            depth: self.depth + 1,
            cache: Rc::clone(&self.cache),
        }
    }

    fn cached(&self, path: &Path) -> Option<ParsedValue> {
        self.cache.borrow().get(path).cloned()
    }

    fn store(&self, path: PathBuf, value: ParsedValue) {
        self.cache.borrow_mut().insert(path, value);
    }
}

/// Element interpreter for the include directive.
#[derive(Debug, Clone)]
pub struct IncludeElement {
    name: String,
    metadata: IndexMap<String, ParsedValue>,
}

impl IncludeElement {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            metadata: IndexMap::new(),
        }
    }

    fn file(&self) -> Option<&str> {
        self.metadata.get(FILE_KEY).and_then(ParsedValue::as_str)
    }
}

impl ElementInterpreter for IncludeElement {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_element_data(&mut self, key: DataKey, value: ParsedValue) {
        if let DataKey::Named(key) = key {
            self.metadata.insert(key, value);
        }
    }

    fn add_attribute_data(&mut self, key: String, value: ParsedValue) {
        self.metadata.insert(key, value);
    }

    fn add_character_data(&mut self, _text: &str, _options: &Options) {}

    fn finish(self: Box<Self>, scope: &ReadScope<'_>) -> Result<Option<ElementData>> {
        let Some(file) = self.file() else {
            tracing::debug!("Include without a file; skipping");
            return Ok(None);
        };
        let requested = substitute_constants(file, scope.options);
        let Some((path, handle)) = open_include(&requested, scope.options) else {
            tracing::debug!(file = %requested, "Include not found; skipping");
            return Ok(None);
        };

        let value = match scope.includes.cached(&path) {
            Some(value) => {
                tracing::debug!(path = %path.display(), "Include served from cache");
                value
            }
            None => {
                let max_depth = scope.options.include_max_depth();
                if scope.includes.depth() >= max_depth {
                    return Err(Error::IncludeDepthExceeded {
                        path: path.display().to_string(),
                        max_depth,
                    });
                }
                tracing::debug!(path = %path.display(), depth = scope.includes.depth(), "Reading include");
                let source = FileDelegate::from_file(path.clone(), handle);
                let mut reader = include_reader_factory(scope).create_reader(
                    Box::new(source),
                    scope.options.clone(),
                    scope.context.descend(),
                )?;
                reader.set_include_session(scope.includes.nested());
                let value = reader.read()?;
                scope.includes.store(path, value.clone());
                value
            }
        };

        let Some((key, value)) = value.into_single_entry() else {
            return Ok(None);
        };
        let key = match scope.context.key_override() {
            Some(key) => DataKey::Named(key.to_string()),
            None if scope.context.groups_as_list(&key) => DataKey::Item,
            None => DataKey::Named(key),
        };
        Ok(Some(ElementData { key, value }))
    }
}

/// The configured reader factory, or one that shares the including
/// reader's registry.
fn include_reader_factory(scope: &ReadScope<'_>) -> Rc<dyn ReaderFactory> {
    match scope.options.configured_reader_factory() {
        Some(factory) => Rc::clone(factory),
        None => Rc::new(DefaultReaderFactory::new().with_registry(Rc::clone(scope.registry))),
    }
}

/// Replace every `${NAME}` with the value of the named constant.
///
/// An unterminated `${` is kept as written.
pub fn substitute_constants(raw: &str, options: &Options) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        out.push_str(&options.constant(&rest[start + 2..start + 2 + len]));
        rest = &rest[start + 2 + len + 1..];
    }
    out.push_str(rest);
    out
}

/// Open an include, trying the include path first and then the path as
/// given. Returns the canonical path of the opened file.
fn open_include(requested: &str, options: &Options) -> Option<(PathBuf, File)> {
    let requested = Path::new(requested);
    let candidates = options
        .include_path()
        .map(|base| base.join(requested))
        .into_iter()
        .chain(std::iter::once(requested.to_path_buf()));

    for candidate in candidates {
        if let Ok(file) = File::open(&candidate) {
            if file.metadata().is_ok_and(|m| m.is_dir()) {
                continue;
            }
            let path = std::fs::canonicalize(&candidate).unwrap_or(candidate);
            return Some((path, file));
        }
    }
    None
}
