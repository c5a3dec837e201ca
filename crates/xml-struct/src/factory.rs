//! Building readers for included documents.

use crate::context::Context;
use crate::options::Options;
use crate::reader::Reader;
use crate::registry::Registry;
use crate::source::{FileDelegate, LineSource, StreamDelegate};
use crate::Result;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

/// Creates readers.
///
/// The include directive asks the configured factory for a reader of each
/// included document, passing on the including reader's options and the
/// include element's context.
pub trait ReaderFactory: fmt::Debug {
    fn create_reader(
        &self,
        source: Box<dyn LineSource>,
        options: Options,
        context: Context,
    ) -> Result<Reader>;
}

/// Builds readers that use the default interpreters, or a fixed registry.
#[derive(Debug, Clone, Default)]
pub struct DefaultReaderFactory {
    registry: Option<Rc<Registry>>,
    owner: Option<(Options, Context)>,
}

impl DefaultReaderFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory whose readers inherit `owner`'s options and initial context
    /// when built through [`create_reader_from_path`] or
    /// [`create_reader_from_str`].
    ///
    /// [`create_reader_from_path`]: DefaultReaderFactory::create_reader_from_path
    /// [`create_reader_from_str`]: DefaultReaderFactory::create_reader_from_str
    pub fn with_owner(owner: &Reader) -> Self {
        Self {
            registry: Some(owner.registry()),
            owner: Some((owner.options().clone(), owner.context().clone())),
        }
    }

    /// Give every created reader `registry` instead of the default one.
    pub fn with_registry(mut self, registry: Rc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    fn inherited(&self) -> (Options, Context) {
        self.owner.clone().unwrap_or_default()
    }

    /// Open `path` and build a reader for it.
    pub fn create_reader_from_path(&self, path: impl AsRef<Path>) -> Result<Reader> {
        let source = FileDelegate::open(path)?;
        let (options, context) = self.inherited();
        self.create_reader(Box::new(source), options, context)
    }

    /// Build a reader over an in-memory document.
    pub fn create_reader_from_str(&self, xml: &str) -> Result<Reader> {
        let source = StreamDelegate::from_string(xml);
        let (options, context) = self.inherited();
        self.create_reader(Box::new(source), options, context)
    }
}

impl ReaderFactory for DefaultReaderFactory {
    fn create_reader(
        &self,
        source: Box<dyn LineSource>,
        options: Options,
        context: Context,
    ) -> Result<Reader> {
        let registry = match &self.registry {
            Some(registry) => Rc::clone(registry),
            None => Rc::new(Registry::with_defaults()),
        };
        Ok(Reader::with_registry(source, options, context, registry))
    }
}
