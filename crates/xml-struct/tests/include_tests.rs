/*
 * include_tests.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Include directive tests using the fixtures directory and temporary
 * include trees.
 */

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use xml_struct::interpreter::ReadScope;
use xml_struct::{
    Context, DataKey, DefaultReaderFactory, ElementData, ElementInterpreter, Error, KeyConflict,
    LineSource, Options, ParsedValue, QualifiedName, Reader, ReaderFactory, Registry,
    STRUCT_NAMESPACE, StreamDelegate,
};

/// Helper to get the path to the test fixtures
fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("test-fixtures")
}

fn fixture_options() -> Options {
    Options::default().with_constant("TEST_ROOT", fixtures_dir().display().to_string())
}

fn read_json(xml: &str, options: Options) -> Value {
    let xml = xml.replace("%ns%", STRUCT_NAMESPACE);
    let value = Reader::from_string(xml, options).read().unwrap();
    serde_json::to_value(value).unwrap()
}

#[test]
fn test_include_file_attribute() {
    assert_eq!(
        read_json(
            r#"<root xmlns:x="%ns%">
                 <x:include file="${TEST_ROOT}/include.xml"/>
               </root>"#,
            fixture_options()
        ),
        json!({"root": {"included": "value"}})
    );
}

#[test]
fn test_include_file_element() {
    assert_eq!(
        read_json(
            r#"<root xmlns:x="%ns%">
                 <x:include>
                   <file>${TEST_ROOT}/include.xml</file>
                 </x:include>
               </root>"#,
            fixture_options()
        ),
        json!({"root": {"included": "value"}})
    );
}

#[test]
fn test_unresolved_includes_contribute_nothing() {
    for xml in [
        r#"<root xmlns:x="%ns%"><x:include><file>${INVALID}/include.xml</file></x:include></root>"#,
        r#"<root xmlns:x="%ns%"><x:include file="notfound"/></root>"#,
        r#"<root xmlns:x="%ns%"><x:include file="notfound">ignored</x:include></root>"#,
    ] {
        assert_eq!(read_json(xml, fixture_options()), Value::Null, "{}", xml);
    }
}

#[test]
fn test_include_as_list_item() {
    assert_eq!(
        read_json(
            r#"<root xmlns:x="%ns%">
                 <x:include file="${TEST_ROOT}/include.xml" x:listElement="included"/>
               </root>"#,
            fixture_options()
        ),
        json!({"root": ["value"]})
    );
}

#[test]
fn test_include_path_option() {
    assert_eq!(
        read_json(
            r#"<root xmlns:x="%ns%"><x:include file="include.xml"/></root>"#,
            Options::default().with_include_path(fixtures_dir())
        ),
        json!({"root": {"included": "value"}})
    );
}

#[test]
fn test_basic_fixture() {
    let mut reader = DefaultReaderFactory::new()
        .create_reader_from_path(fixtures_dir().join("basic.xml"))
        .unwrap();
    // Without an include path the relative include is not found.
    assert_eq!(
        serde_json::to_value(reader.read().unwrap()).unwrap(),
        json!({"config": {
            "version": "2",
            "name": "example",
            "servers": [
                {"host": "alpha", "port": "80"},
                {"host": "beta", "port": "8080"}
            ]
        }})
    );

    let options = Options::default().with_include_path(fixtures_dir());
    let owner = Reader::from_string("<owner/>", options);
    let mut reader = DefaultReaderFactory::with_owner(&owner)
        .create_reader_from_path(fixtures_dir().join("basic.xml"))
        .unwrap();
    let value = reader.read().unwrap();
    assert_eq!(
        value.get_path(&["config", "included"]).and_then(|v| v.as_str()),
        Some("value")
    );
}

#[test]
fn test_nested_includes() {
    let dir = tempfile::tempdir().unwrap();
    let ns = STRUCT_NAMESPACE;
    fs::write(
        dir.path().join("outer.xml"),
        format!(r#"<outer xmlns:x="{ns}"><x:include file="inner.xml"/><own>1</own></outer>"#),
    )
    .unwrap();
    fs::write(dir.path().join("inner.xml"), "<inner>2</inner>").unwrap();

    assert_eq!(
        read_json(
            r#"<root xmlns:x="%ns%"><x:include file="outer.xml"/></root>"#,
            Options::default().with_include_path(dir.path())
        ),
        json!({"root": {"outer": {"inner": "2", "own": "1"}}})
    );
}

#[test]
fn test_include_cycle_is_bounded() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("loop.xml"),
        format!(
            r#"<loop xmlns:x="{}"><x:include file="loop.xml"/></loop>"#,
            STRUCT_NAMESPACE
        ),
    )
    .unwrap();

    let options = Options::default()
        .with_include_path(dir.path())
        .with_include_max_depth(4);
    let xml = format!(
        r#"<root xmlns:x="{}"><x:include file="loop.xml"/></root>"#,
        STRUCT_NAMESPACE
    );
    let err = Reader::from_string(xml, options).read().unwrap_err();
    assert!(
        matches!(err, Error::IncludeDepthExceeded { max_depth: 4, .. }),
        "unexpected error: {:?}",
        err
    );
}

#[test]
fn test_malformed_include_fails_the_read() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("bad.xml"), "<bad><unclosed></bad>").unwrap();
    let xml = format!(
        r#"<root xmlns:x="{}"><x:include file="bad.xml"/></root>"#,
        STRUCT_NAMESPACE
    );
    let err = Reader::from_string(xml, Options::default().with_include_path(dir.path()))
        .read()
        .unwrap_err();
    assert!(err.is_malformed_input());
}

/// Counts the readers it builds.
#[derive(Debug, Default)]
struct CountingFactory {
    created: Cell<usize>,
    inner: DefaultReaderFactory,
}

impl ReaderFactory for CountingFactory {
    fn create_reader(
        &self,
        source: Box<dyn LineSource>,
        options: Options,
        context: Context,
    ) -> xml_struct::Result<Reader> {
        self.created.set(self.created.get() + 1);
        self.inner.create_reader(source, options, context)
    }
}

#[test]
fn test_reader_factory_option_and_cache() {
    let factory = Rc::new(CountingFactory::default());
    let options = Options::default()
        .with_include_path(fixtures_dir())
        .with_key_conflict(KeyConflict::Merge)
        .with_reader_factory(factory.clone());

    assert_eq!(
        read_json(
            r#"<root xmlns:x="%ns%">
                 <x:include file="include.xml"/>
                 <x:include file="include.xml"/>
               </root>"#,
            options
        ),
        json!({"root": {"included": ["value", "value"]}})
    );
    assert_eq!(factory.created.get(), 1);
}

/// Always reduces to the same string.
struct Fixed {
    name: String,
}

impl ElementInterpreter for Fixed {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_element_data(&mut self, _key: DataKey, _value: ParsedValue) {}

    fn add_attribute_data(&mut self, _key: String, _value: ParsedValue) {}

    fn add_character_data(&mut self, _text: &str, _options: &Options) {}

    fn finish(self: Box<Self>, _scope: &ReadScope<'_>) -> xml_struct::Result<Option<ElementData>> {
        Ok(Some(ElementData::new(self.name, "fixed".into())))
    }
}

#[test]
fn test_included_documents_use_the_reader_registry() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("wrap.xml"),
        "<wrap><included>value</included></wrap>",
    )
    .unwrap();

    let mut registry = Registry::with_defaults();
    registry.register_element(
        None,
        "included",
        Rc::new(|name: &QualifiedName, _: &Context| {
            Box::new(Fixed {
                name: name.local.clone(),
            }) as Box<dyn ElementInterpreter>
        }),
    );
    let xml = format!(
        r#"<root xmlns:x="{}"><included>value</included><x:include file="wrap.xml"/></root>"#,
        STRUCT_NAMESPACE
    );
    let value = Reader::with_registry(
        Box::new(StreamDelegate::from_string(xml)),
        Options::default().with_include_path(dir.path()),
        Context::new(),
        Rc::new(registry),
    )
    .read()
    .unwrap();

    assert_eq!(
        serde_json::to_value(value).unwrap(),
        json!({"root": {"included": "fixed", "wrap": {"included": "fixed"}}})
    );
}
