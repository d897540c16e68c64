//! Chunk-by-chunk tree reading.

use std::io::BufRead;
use std::ops::Range;

use exmldoc::{Charset, Chunk, Document, ReadOptions, XmlCorpusReader};

use crate::errors::SyntaxResult;
use crate::tree::SyntaxTree;
use crate::{make_syntax_doc, SyntaxConfig};

/// Reads a corpus one chunk at a time and builds the trees of each chunk.
///
/// Only the current chunk is kept in the document; it is cleared when the
/// next one is read.
pub struct TreeReader<R: BufRead> {
    reader: XmlCorpusReader<R>,
    doc: Document,
    current: Option<Range<usize>>,
}

impl<R: BufRead> TreeReader<R> {
    /// Reader into the full preset (with dependencies).
    pub fn new(input: R, charset: Charset) -> Self {
        Self::with_document(
            input,
            make_syntax_doc(&SyntaxConfig::default().with_deps(true)),
            ReadOptions::default().with_charset(charset),
        )
    }

    pub fn with_document(input: R, doc: Document, options: ReadOptions) -> Self {
        Self {
            reader: XmlCorpusReader::new(input, options),
            doc,
            current: None,
        }
    }

    /// The document holding the current chunk.
    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// Trees of the next chunk, or `None` at the end of the input.
    pub fn next_trees(&mut self) -> SyntaxResult<Option<Vec<SyntaxTree>>> {
        if let Some(range) = self.current.take() {
            self.doc.clear_range(range);
        }
        match self.reader.next_chunk(&mut self.doc)? {
            Chunk::Range { start, end } => {
                let trees = SyntaxTree::all(&self.doc, start..end)?;
                log::debug!("{} sentences in tokens {}..{}", trees.len(), start, end);
                self.current = Some(start..end);
                Ok(Some(trees))
            }
            Chunk::EndOfInput => Ok(None),
        }
    }
}
