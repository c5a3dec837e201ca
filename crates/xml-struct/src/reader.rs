//! The reader: drives the tokenizer and the interpreters.
//!
//! Input lines are fed to a namespace-aware [`quick_xml`] reader. Every start
//! tag resolves to an element interpreter through the registry and opens a
//! context snapshot; every attribute is handed to its attribute interpreter;
//! every end tag reduces the innermost interpreter and passes the result to
//! the interpreter below it, or to the [`RootContainer`] for the top-level
//! element.

use crate::context::{Context, ContextStack};
use crate::interpreter::{
    AttributeTarget, ElementInterpreter, IncludeSession, ReadScope, RootContainer,
};
use crate::options::Options;
use crate::registry::Registry;
use crate::source::{LineFeed, LineSource, StreamDelegate};
use crate::{Error, ParsedValue, QualifiedName, Result};
use quick_xml::NsReader;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::name::{LocalName, ResolveResult};
use std::fmt;
use std::io::BufReader;
use std::rc::Rc;

type Tokenizer = NsReader<BufReader<LineFeed>>;

const NOT_READABLE: &str = "data could not be read";

/// A reader owns its tokenizer until the first `read()` takes it, so there
/// is no state in which a read could start without one.
enum ReadState {
    Idle(Box<Tokenizer>),
    Done(ParsedValue),
    Failed,
}

impl fmt::Debug for ReadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadState::Idle(_) => f.write_str("Idle"),
            ReadState::Done(value) => f.debug_tuple("Done").field(value).finish(),
            ReadState::Failed => f.write_str("Failed"),
        }
    }
}

/// Reads one document into a [`ParsedValue`].
///
/// # Example
///
/// ```rust
/// use xml_struct::{Options, ParsedValue, Reader};
///
/// let mut reader = Reader::from_string("<root><element>value</element></root>", Options::default());
/// let data = reader.read().unwrap();
/// assert_eq!(
///     data.get_path(&["root", "element"]),
///     Some(&ParsedValue::from("value"))
/// );
/// ```
pub struct Reader {
    registry: Rc<Registry>,
    options: Options,
    context: Context,
    includes: IncludeSession,
    state: ReadState,
}

impl Reader {
    /// A reader with the default interpreters and an empty initial context.
    pub fn new(source: Box<dyn LineSource>, options: Options) -> Self {
        Self::with_context(source, options, Context::new())
    }

    pub fn with_context(source: Box<dyn LineSource>, options: Options, context: Context) -> Self {
        Self::with_registry(source, options, context, Rc::new(Registry::with_defaults()))
    }

    pub fn with_registry(
        source: Box<dyn LineSource>,
        options: Options,
        context: Context,
        registry: Rc<Registry>,
    ) -> Self {
        let mut tokenizer = NsReader::from_reader(BufReader::new(LineFeed::new(source)));
        tokenizer.config_mut().trim_text_start = false;
        tokenizer.config_mut().trim_text_end = false;

        Self {
            registry,
            options,
            context,
            includes: IncludeSession::default(),
            state: ReadState::Idle(Box::new(tokenizer)),
        }
    }

    /// A reader over an in-memory document.
    pub fn from_string(xml: impl Into<String>, options: Options) -> Self {
        Self::new(Box::new(StreamDelegate::from_string(xml)), options)
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The initial context the document root is read with.
    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn registry(&self) -> Rc<Registry> {
        Rc::clone(&self.registry)
    }

    pub(crate) fn set_include_session(&mut self, includes: IncludeSession) {
        self.includes = includes;
    }

    /// Read the whole document.
    ///
    /// The tokenizer is released when the read finishes, successfully or
    /// not. Reading again after success returns the same data. After a
    /// failure the reader has no input left and every later call is an
    /// [`Error::ReaderState`].
    pub fn read(&mut self) -> Result<ParsedValue> {
        let tokenizer = match std::mem::replace(&mut self.state, ReadState::Failed) {
            ReadState::Idle(tokenizer) => tokenizer,
            ReadState::Done(value) => {
                self.state = ReadState::Done(value.clone());
                return Ok(value);
            }
            ReadState::Failed => return Err(Error::reader_state(NOT_READABLE)),
        };

        let parse = Parse::new(
            *tokenizer,
            &self.registry,
            &self.options,
            &self.includes,
            self.context.clone(),
        );
        // The state stays Failed when the parse errors.
        let value = parse.run()?;
        self.state = ReadState::Done(value.clone());
        Ok(value)
    }

    /// The data of a completed read.
    pub fn data(&self) -> Result<&ParsedValue> {
        match &self.state {
            ReadState::Done(value) => Ok(value),
            _ => Err(Error::DataNotReady),
        }
    }
}

impl fmt::Debug for Reader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reader")
            .field("options", &self.options)
            .field("context", &self.context)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// State of one pass over the input.
struct Parse<'a> {
    tokenizer: Tokenizer,
    registry: &'a Rc<Registry>,
    options: &'a Options,
    includes: &'a IncludeSession,
    contexts: ContextStack,
    trail: Vec<Box<dyn ElementInterpreter>>,
    root: RootContainer,
    root_closed: bool,
}

impl<'a> Parse<'a> {
    fn new(
        tokenizer: Tokenizer,
        registry: &'a Rc<Registry>,
        options: &'a Options,
        includes: &'a IncludeSession,
        context: Context,
    ) -> Self {
        Self {
            tokenizer,
            registry,
            options,
            includes,
            contexts: ContextStack::new(context),
            trail: Vec::new(),
            root: RootContainer::new(),
            root_closed: false,
        }
    }

    fn run(mut self) -> Result<ParsedValue> {
        let mut buf = Vec::new();
        loop {
            match self.tokenizer.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    self.handle_start(&e)?;
                }
                Ok(Event::End(_)) => {
                    self.handle_end()?;
                }
                Ok(Event::Empty(e)) => {
                    self.handle_start(&e)?;
                    self.handle_end()?;
                }
                Ok(Event::Text(e)) => {
                    self.handle_text(&e)?;
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    self.handle_character_data(&text)?;
                }
                Ok(Event::Comment(_) | Event::PI(_) | Event::Decl(_) | Event::DocType(_)) => {}
                Ok(Event::Eof) => break,
                Err(e) => {
                    let position = self.tokenizer.error_position();
                    return Err(self.malformed_at(position, e.to_string()));
                }
            }
            buf.clear();
        }

        if let Some(open) = self.trail.last() {
            return Err(self.malformed(format!("unclosed element <{}>", open.name())));
        }
        if !self.root_closed {
            return Err(self.malformed("document has no root element"));
        }
        Ok(self.root.into_value())
    }

    fn handle_start(&mut self, e: &BytesStart<'_>) -> Result<()> {
        if self.root_closed {
            return Err(self.malformed("element after the document root"));
        }

        let (resolved, local) = self.tokenizer.resolve_element(e.name());
        let name = self.qualify(resolved, local)?;
        let attributes = self.attributes(e)?;

        let factory = self.registry.element(&name)?;
        let context = self.contexts.push_child();
        let mut element = factory(&name, &*context);
        tracing::trace!(element = %name, depth = self.contexts.depth(), "Open element");

        for (attribute, value) in attributes {
            let factory = self.registry.attribute(&attribute)?;
            factory(&attribute).process(
                &attribute,
                &value,
                AttributeTarget {
                    element: &mut *element,
                    context: self.contexts.top_mut(),
                },
            )?;
        }

        self.trail.push(element);
        Ok(())
    }

    /// Resolve and unescape the attributes of a start tag, skipping
    /// namespace declarations.
    fn attributes(&self, e: &BytesStart<'_>) -> Result<Vec<(QualifiedName, String)>> {
        let mut attributes = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|err| self.malformed(err.to_string()))?;
            if attr.key.as_namespace_binding().is_some() {
                continue;
            }
            let (resolved, local) = self.tokenizer.resolve_attribute(attr.key);
            let name = self.qualify(resolved, local)?;
            let value = attr
                .unescape_value()
                .map_err(|err| self.malformed(format!("invalid attribute value: {}", err)))?;
            attributes.push((name, value.into_owned()));
        }
        Ok(attributes)
    }

    fn handle_end(&mut self) -> Result<()> {
        let Some(element) = self.trail.pop() else {
            return Err(self.malformed("closing tag without an open element"));
        };
        let name = element.name().to_string();

        let scope = ReadScope {
            context: self.contexts.top(),
            options: self.options,
            registry: self.registry,
            includes: self.includes,
        };
        let data = element.finish(&scope)?;
        self.contexts.pop();
        tracing::trace!(element = %name, depth = self.contexts.depth(), "Close element");

        if let Some(data) = data {
            match self.trail.last_mut() {
                Some(parent) => parent.add_element_data(data.key, data.value),
                None => self.root.add_element_data(data),
            }
        }
        if self.trail.is_empty() {
            self.root_closed = true;
        }
        Ok(())
    }

    fn handle_text(&mut self, e: &BytesText<'_>) -> Result<()> {
        let text = e
            .unescape()
            .map_err(|err| self.malformed(format!("invalid text content: {}", err)))?;
        self.handle_character_data(&text)
    }

    fn handle_character_data(&mut self, text: &str) -> Result<()> {
        match self.trail.last_mut() {
            Some(element) => {
                element.add_character_data(text, self.options);
                Ok(())
            }
            None if text.trim().is_empty() => Ok(()),
            None => Err(self.malformed("text outside the document root")),
        }
    }

    fn qualify(&self, resolved: ResolveResult<'_>, local: LocalName<'_>) -> Result<QualifiedName> {
        let local = String::from_utf8_lossy(local.as_ref()).into_owned();
        match resolved {
            ResolveResult::Bound(namespace) => {
                let namespace = String::from_utf8_lossy(namespace.as_ref());
                Ok(QualifiedName::new(Some(&namespace), local))
            }
            ResolveResult::Unbound => Ok(QualifiedName::new(None, local)),
            ResolveResult::Unknown(prefix) => Err(self.malformed(format!(
                "undeclared namespace prefix '{}'",
                String::from_utf8_lossy(&prefix)
            ))),
        }
    }

    fn malformed(&self, message: impl Into<String>) -> Error {
        self.malformed_at(self.tokenizer.buffer_position(), message)
    }

    fn malformed_at(&self, position: u64, message: impl Into<String>) -> Error {
        let (line, column) = self.tokenizer.get_ref().get_ref().position(position);
        Error::MalformedInput {
            line,
            column,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::STRUCT_NAMESPACE;
    use pretty_assertions::assert_eq;

    fn read(xml: &str) -> Result<ParsedValue> {
        Reader::from_string(xml, Options::default()).read()
    }

    fn json(xml: &str) -> serde_json::Value {
        serde_json::to_value(read(xml).unwrap()).unwrap()
    }

    #[test]
    fn test_read_simple_element() {
        assert_eq!(json("<element>value</element>"), serde_json::json!({"element": "value"}));
    }

    #[test]
    fn test_read_nested_element() {
        assert_eq!(
            json("<root>\n  <element>value</element>\n</root>\n"),
            serde_json::json!({"root": {"element": "value"}})
        );
    }

    #[test]
    fn test_read_empty_root() {
        assert_eq!(json("<root/>"), serde_json::Value::Null);
        assert_eq!(json("<root>\n  <empty/>\n</root>"), serde_json::Value::Null);
    }

    #[test]
    fn test_declaration_and_comments_are_ignored() {
        assert_eq!(
            json("<?xml version=\"1.0\"?>\n<!-- c -->\n<root><![CDATA[a<b]]></root>"),
            serde_json::json!({"root": "a<b"})
        );
    }

    #[test]
    fn test_directive_namespace_is_resolved() {
        let xml = format!(
            r#"<root xmlns:x="{}" x:listElement="item"><item>0</item><item>1</item></root>"#,
            STRUCT_NAMESPACE
        );
        assert_eq!(json(&xml), serde_json::json!({"root": ["0", "1"]}));
    }

    #[test]
    fn test_data_before_read() {
        let reader = Reader::from_string("<root/>", Options::default());
        assert!(matches!(reader.data(), Err(Error::DataNotReady)));
    }

    #[test]
    fn test_read_twice_returns_same_data() {
        let mut reader = Reader::from_string("<a>b</a>", Options::default());
        let first = reader.read().unwrap();
        let second = reader.read().unwrap();
        assert_eq!(first, second);
        assert_eq!(reader.data().unwrap(), &first);
    }

    #[test]
    fn test_new_reader_is_idle() {
        let reader = Reader::from_string("<root/>", Options::default());
        assert_eq!(format!("{:?}", reader.state), "Idle");
    }

    #[test]
    fn test_read_after_failure() {
        let mut reader = Reader::from_string("<root></wrong>", Options::default());
        assert!(reader.read().unwrap_err().is_malformed_input());
        assert!(matches!(reader.read(), Err(Error::ReaderState { .. })));
        assert!(matches!(reader.data(), Err(Error::DataNotReady)));
        assert_eq!(format!("{:?}", reader.state), "Failed");
    }

    #[test]
    fn test_malformed_position() {
        let err = read("<root>\n  <a>\n</root>").unwrap_err();
        match err {
            Error::MalformedInput { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_structural_errors() {
        for xml in [
            "",
            "   \n",
            "<root>",
            "<root/><another/>",
            "<root/>trailing",
            "text<root/>",
            "<p:root/>",
            "<root>&unknown;</root>",
        ] {
            let err = read(xml).unwrap_err();
            assert!(err.is_malformed_input(), "{:?} gave {:?}", xml, err);
        }
    }
}
