//! Inline XML: the `<exml-doc>` writer and the streaming reader.

mod header;
mod reader;
mod writer;

pub use reader::XmlCorpusReader;
pub(crate) use writer::{write_epilogue, write_prologue};

use crate::encoding::Charset;

/// Options for reading inline XML.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Repertoire string values are transformed into.
    pub charset: Charset,
    /// Tolerate end tags that do not match the open element.
    pub recover: bool,
}

impl ReadOptions {
    /// Keep strings as they are and recover from mismatched end tags.
    pub fn lenient() -> Self {
        Self {
            charset: Charset::Unicode,
            recover: true,
        }
    }

    /// Fail on any well-formedness problem.
    pub fn strict() -> Self {
        Self {
            charset: Charset::Unicode,
            recover: false,
        }
    }

    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self::lenient()
    }
}

/// Options for writing inline XML.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Repertoire written literally; everything else becomes a character
    /// reference.
    pub charset: Charset,
    /// Give every written object an `xml:id`.
    pub force_ids: bool,
}

impl WriteOptions {
    pub fn utf8() -> Self {
        Self {
            charset: Charset::Utf8,
            force_ids: true,
        }
    }

    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    /// Only write IDs that are needed to resolve references.
    pub fn without_forced_ids(mut self) -> Self {
        self.force_ids = false;
        self
    }
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self::utf8()
    }
}
