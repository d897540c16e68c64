//! Chunked corpus processing.
//!
//! A corpus is read one chunk (usually one text) at a time into a single
//! [`Document`]. Drain helpers write each chunk out and clear it again, so
//! memory stays bounded by the largest chunk.

use std::io::{BufRead, Write};

use crate::document::Document;
use crate::error::ExmlResult;
use crate::xml::{WriteOptions, XmlCorpusReader};

/// Result of advancing a corpus reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chunk {
    /// Tokens `start..end` were added to the document.
    Range { start: usize, end: usize },
    /// The input is exhausted.
    EndOfInput,
}

impl Chunk {
    pub fn range(&self) -> Option<std::ops::Range<usize>> {
        match self {
            Chunk::Range { start, end } => Some(*start..*end),
            Chunk::EndOfInput => None,
        }
    }
}

/// Anything that can add the next chunk of a corpus to a document.
pub trait ChunkSource {
    /// Read whatever precedes the first chunk (e.g. a schema header).
    fn prepare(&mut self, _doc: &mut Document) -> ExmlResult<()> {
        Ok(())
    }

    fn next_chunk(&mut self, doc: &mut Document) -> ExmlResult<Chunk>;
}

/// Reader for JSON corpora: one chunk object per line.
pub struct JsonCorpusReader<R: BufRead> {
    input: R,
    line: String,
}

impl<R: BufRead> JsonCorpusReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            line: String::new(),
        }
    }

    /// Insert the next non-empty line's chunk into `doc`.
    pub fn next_chunk(&mut self, doc: &mut Document) -> ExmlResult<Chunk> {
        loop {
            self.line.clear();
            if self.input.read_line(&mut self.line)? == 0 {
                return Ok(Chunk::EndOfInput);
            }
            if self.line.trim().is_empty() {
                continue;
            }
            let chunk: serde_json::Value = serde_json::from_str(&self.line)?;
            let range = doc.json_insert(&chunk)?;
            log::debug!("json chunk {}..{} read", range.start, range.end);
            return Ok(Chunk::Range {
                start: range.start,
                end: range.end,
            });
        }
    }
}

impl<R: BufRead> ChunkSource for JsonCorpusReader<R> {
    fn next_chunk(&mut self, doc: &mut Document) -> ExmlResult<Chunk> {
        JsonCorpusReader::next_chunk(self, doc)
    }
}

impl<R: BufRead> ChunkSource for XmlCorpusReader<R> {
    fn prepare(&mut self, doc: &mut Document) -> ExmlResult<()> {
        self.read_header(doc)
    }

    fn next_chunk(&mut self, doc: &mut Document) -> ExmlResult<Chunk> {
        XmlCorpusReader::next_chunk(self, doc)
    }
}

/// Copy a whole corpus into one inline XML document, clearing each chunk
/// once it is written. Returns the number of tokens written.
pub fn write_corpus_xml<S, W>(
    doc: &mut Document,
    source: &mut S,
    out: &mut W,
    options: &WriteOptions,
) -> ExmlResult<usize>
where
    S: ChunkSource + ?Sized,
    W: Write,
{
    source.prepare(doc)?;
    crate::xml::write_prologue(doc, out, options.charset)?;
    let mut written = 0;
    while let Chunk::Range { start, end } = source.next_chunk(doc)? {
        doc.write_inline_xml(out, start..end, options)?;
        doc.clear_range(start..end);
        written += end - start;
    }
    crate::xml::write_epilogue(out)?;
    Ok(written)
}

/// Copy a whole corpus as JSON lines, one chunk per line, clearing each
/// chunk once it is written. Returns the number of chunks written.
pub fn write_corpus_json<S, W>(doc: &mut Document, source: &mut S, out: &mut W) -> ExmlResult<usize>
where
    S: ChunkSource + ?Sized,
    W: Write,
{
    source.prepare(doc)?;
    let mut chunks = 0;
    while let Chunk::Range { start, end } = source.next_chunk(doc)? {
        let chunk = doc.json_chunk(start..end)?;
        serde_json::to_writer(&mut *out, &chunk)?;
        out.write_all(b"\n")?;
        doc.clear_range(start..end);
        chunks += 1;
    }
    Ok(chunks)
}
