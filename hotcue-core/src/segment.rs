//! Streaming segment reader
//!
//! Splits a byte stream into delimiter-terminated text segments while only
//! holding the not-yet-returned tail of the stream in memory. With the
//! default `>` delimiter every segment of a rekordbox XML export ends at the
//! close of one tag, so a marker tag is always whole inside one segment no
//! matter where the underlying reads split it.
//!
//! Segment layout for `<A x="1"/>\n<B>tail`:
//! - `<A x="1"/>`
//! - `\n<B>`
//! - `tail` (final segment, no delimiter)

use std::fmt;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use crate::error::{Error, Result};

/// Bytes requested from the source per read
pub const CHUNK_SIZE: usize = 4096;

/// Default segment delimiter (end of an XML tag)
pub const DEFAULT_DELIMITER: &str = ">";

/// Text encoding used to decode segments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    /// ISO-8859-1, every byte maps to one char
    Latin1,
}

impl Encoding {
    /// Decode bytes, returning the offset of the first invalid byte on failure
    pub fn decode(self, bytes: &[u8]) -> std::result::Result<String, usize> {
        match self {
            Encoding::Utf8 => std::str::from_utf8(bytes)
                .map(str::to_owned)
                .map_err(|e| e.valid_up_to()),
            Encoding::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
        }
    }

    /// Encode text, `None` if a char has no representation
    pub fn encode(self, text: &str) -> Option<Vec<u8>> {
        self.encode_checked(text).ok()
    }

    /// Encode text, returning the first char without a representation on failure
    pub fn encode_checked(self, text: &str) -> std::result::Result<Vec<u8>, char> {
        match self {
            Encoding::Utf8 => Ok(text.as_bytes().to_vec()),
            Encoding::Latin1 => text.chars().map(|c| u8::try_from(c).map_err(|_| c)).collect(),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Utf8 => f.write_str("UTF-8"),
            Encoding::Latin1 => f.write_str("ISO-8859-1"),
        }
    }
}

/// Construction-time reader parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderOptions {
    pub delimiter: String,
    pub encoding: Encoding,
    pub chunk_size: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            encoding: Encoding::Utf8,
            chunk_size: CHUNK_SIZE,
        }
    }
}

/// Lazy delimiter-terminated segment reader over a byte source
///
/// Owns the source exclusively. The source is released on `close()` or when
/// the reader is dropped, whichever comes first. Any error ends the stream:
/// later calls to [`SegmentReader::next_segment`] return `Ok(None)`.
pub struct SegmentReader<R> {
    source: Option<R>,
    /// Bytes read but not yet returned in a segment
    buffer: Vec<u8>,
    chunk: Vec<u8>,
    delimiter: Vec<u8>,
    delimiter_text: String,
    encoding: Encoding,
    /// Prefix of `buffer` already searched without finding the delimiter
    searched: usize,
    /// Stream offset of `buffer[0]`
    consumed: u64,
    at_eof: bool,
}

impl SegmentReader<File> {
    /// Open a file with the default delimiter and UTF-8
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, &ReaderOptions::default())
    }

    pub fn open_with<P: AsRef<Path>>(path: P, options: &ReaderOptions) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::open(path, e))?;
        Self::new(file, options)
    }
}

impl<R: Read> SegmentReader<R> {
    /// Wrap a source positioned at the start of the stream
    pub fn new(source: R, options: &ReaderOptions) -> Result<Self> {
        if options.delimiter.is_empty() {
            return Err(Error::InvalidDelimiter("delimiter must not be empty".into()));
        }
        let delimiter = options.encoding.encode(&options.delimiter).ok_or_else(|| {
            Error::InvalidDelimiter(format!(
                "{:?} is not representable in {}",
                options.delimiter, options.encoding
            ))
        })?;

        Ok(Self {
            source: Some(source),
            buffer: Vec::new(),
            chunk: vec![0u8; options.chunk_size.max(1)],
            delimiter,
            delimiter_text: options.delimiter.clone(),
            encoding: options.encoding,
            searched: 0,
            consumed: 0,
            at_eof: false,
        })
    }

    /// Next segment, or `Ok(None)` at end of stream
    ///
    /// Complete segments always end with the delimiter. The last segment of
    /// a stream that does not end with the delimiter is returned as-is.
    pub fn next_segment(&mut self) -> Result<Option<String>> {
        if self.at_eof {
            return Ok(None);
        }

        let result = self.advance();
        if result.is_err() {
            self.at_eof = true;
        }
        result
    }

    fn advance(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(pos) = self.find_delimiter() {
                let end = pos + self.delimiter.len();
                let mut segment = self.decode(pos)?;
                segment.push_str(&self.delimiter_text);

                self.buffer.drain(..end);
                self.consumed += end as u64;
                self.searched = 0;
                return Ok(Some(segment));
            }
            self.searched = self.buffer.len();

            if self.fill()? == 0 {
                self.at_eof = true;
                if self.buffer.is_empty() {
                    return Ok(None);
                }

                let len = self.buffer.len();
                let segment = self.decode(len)?;
                self.buffer.clear();
                self.consumed += len as u64;
                return Ok(Some(segment));
            }
        }
    }

    /// Release the source. Calling this more than once is a no-op.
    pub fn close(&mut self) {
        self.source = None;
        self.buffer.clear();
        self.at_eof = true;
    }

    pub fn is_closed(&self) -> bool {
        self.source.is_none()
    }

    fn find_delimiter(&self) -> Option<usize> {
        let len = self.delimiter.len();
        // A delimiter may straddle the old end of the buffer
        let start = self.searched.saturating_sub(len - 1);
        self.buffer
            .get(start..)?
            .windows(len)
            .position(|w| w == self.delimiter.as_slice())
            .map(|p| p + start)
    }

    /// Append one chunk from the source, returning the bytes read
    fn fill(&mut self) -> Result<usize> {
        let Some(source) = self.source.as_mut() else {
            return Ok(0);
        };

        loop {
            match source.read(&mut self.chunk) {
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                result => {
                    let n = result?;
                    self.buffer.extend_from_slice(&self.chunk[..n]);
                    return Ok(n);
                }
            }
        }
    }

    fn decode(&self, end: usize) -> Result<String> {
        self.encoding
            .decode(&self.buffer[..end])
            .map_err(|valid_up_to| Error::Decode {
                offset: self.consumed + valid_up_to as u64,
                encoding: self.encoding,
            })
    }
}

impl<R: Read> Iterator for SegmentReader<R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_segment().transpose()
    }
}
