//! Line-oriented input sources.
//!
//! The reader pulls its input one line at a time from a [`LineSource`]. Two
//! sources are provided: [`StreamDelegate`] over any buffered byte stream and
//! [`FileDelegate`] over an opened file.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Read, Seek};
use std::path::{Path, PathBuf};

/// A source of input lines.
pub trait LineSource {
    /// Whether every line has been read.
    fn is_eof(&mut self) -> bool;

    /// Read the next line, including its terminator if it has one.
    ///
    /// Returns an empty string at end of input.
    fn read_line(&mut self) -> io::Result<String>;
}

/// Reads lines from a buffered byte stream.
#[derive(Debug)]
pub struct StreamDelegate<R> {
    inner: R,
}

impl<R: BufRead> StreamDelegate<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl StreamDelegate<Cursor<String>> {
    /// Read from an in-memory document.
    pub fn from_string(content: impl Into<String>) -> Self {
        Self::new(Cursor::new(content.into()))
    }
}

impl<R: BufRead> LineSource for StreamDelegate<R> {
    fn is_eof(&mut self) -> bool {
        // A stream that fails to fill its buffer has nothing more to give.
        match self.inner.fill_buf() {
            Ok(buf) => buf.is_empty(),
            Err(_) => true,
        }
    }

    fn read_line(&mut self) -> io::Result<String> {
        let mut line = String::new();
        self.inner.read_line(&mut line)?;
        Ok(line)
    }
}

/// Reads lines from a file and remembers where it came from.
#[derive(Debug)]
pub struct FileDelegate {
    path: PathBuf,
    inner: StreamDelegate<BufReader<File>>,
}

impl FileDelegate {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Ok(Self::from_file(path, file))
    }

    /// Wrap a file that is already open.
    pub fn from_file(path: impl Into<PathBuf>, file: File) -> Self {
        Self {
            path: path.into(),
            inner: StreamDelegate::new(BufReader::new(file)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Go back to the first line.
    pub fn rewind(&mut self) -> io::Result<()> {
        self.inner.inner.rewind()
    }
}

impl LineSource for FileDelegate {
    fn is_eof(&mut self) -> bool {
        self.inner.is_eof()
    }

    fn read_line(&mut self) -> io::Result<String> {
        self.inner.read_line()
    }
}

/// Adapts a [`LineSource`] to [`Read`] for the tokenizer, recording where
/// every line starts so byte offsets can be reported as line and column.
pub(crate) struct LineFeed {
    source: Box<dyn LineSource>,
    pending: Vec<u8>,
    offset: usize,
    fed: u64,
    line_starts: Vec<u64>,
}

impl LineFeed {
    pub(crate) fn new(source: Box<dyn LineSource>) -> Self {
        Self {
            source,
            pending: Vec::new(),
            offset: 0,
            fed: 0,
            line_starts: vec![0],
        }
    }

    /// Pull the next line into the pending buffer. `false` at end of input.
    fn refill(&mut self) -> io::Result<bool> {
        if self.source.is_eof() {
            return Ok(false);
        }
        let line = self.source.read_line()?;
        if line.is_empty() {
            return Ok(false);
        }
        let base = self.fed;
        self.line_starts.extend(
            line.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| base + i as u64 + 1),
        );
        self.fed += line.len() as u64;
        self.pending = line.into_bytes();
        self.offset = 0;
        Ok(true)
    }

    /// 1-based line and column of a byte offset in the input read so far.
    pub(crate) fn position(&self, byte: u64) -> (u64, u64) {
        let line = self.line_starts.partition_point(|start| *start <= byte);
        let start = self.line_starts[line.saturating_sub(1)];
        (line as u64, byte - start + 1)
    }
}

impl Read for LineFeed {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        while self.offset >= self.pending.len() {
            if !self.refill()? {
                return Ok(0);
            }
        }
        let available = &self.pending[self.offset..];
        let n = available.len().min(out.len());
        out[..n].copy_from_slice(&available[..n]);
        self.offset += n;
        Ok(n)
    }
}
