//! Error types for structured XML reading.

use std::fmt;
use thiserror::Error;

/// Result type alias for xml-struct operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The two interpreter families kept in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterpreterKind {
    Element,
    Attribute,
}

impl fmt::Display for InterpreterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterpreterKind::Element => write!(f, "element"),
            InterpreterKind::Attribute => write!(f, "attribute"),
        }
    }
}

/// Errors that can occur while reading a document.
#[derive(Debug, Error)]
pub enum Error {
    /// The reader has no tokenizer session to read from.
    ///
    /// Raised when `read()` is called on a reader whose session was never set
    /// up or was torn down by an earlier failure.
    #[error("Reader error: {message}")]
    ReaderState { message: String },

    /// The tokenizer rejected the input.
    #[error("Malformed XML at line {line}, column {column}: {message}")]
    MalformedInput {
        line: u64,
        column: u64,
        message: String,
    },

    /// No registry entry matched, not even the full wildcard.
    #[error("No {kind} interpreter found for {name}")]
    NoInterpreterFound { kind: InterpreterKind, name: String },

    /// The result was requested before a successful read.
    #[error("Data is not ready; the document has not been read")]
    DataNotReady,

    /// A collaborator was configured with an unusable value.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Nested includes went deeper than the configured bound.
    #[error("Include nesting deeper than {max_depth} while including {path}")]
    IncludeDepthExceeded { path: String, max_depth: usize },

    /// I/O error from the underlying line source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn reader_state(message: impl Into<String>) -> Self {
        Error::ReaderState {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            message: message.into(),
        }
    }

    /// Whether this error came from the tokenizer rejecting the input.
    pub fn is_malformed_input(&self) -> bool {
        matches!(self, Error::MalformedInput { .. })
    }
}
