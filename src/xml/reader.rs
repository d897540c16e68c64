//! Streaming inline XML reader.
//!
//! The reader pulls events from a [`quick_xml::Reader`] and builds the
//! document incrementally. Objects are created and their spans registered as
//! their tags open and close; all other attributes and edges are filled only
//! when the enclosing `text` (or `doc`) element closes, so references may
//! point forward to objects later in the same text.

use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::header::{process_schema, Element};
use super::ReadOptions;
use crate::corpus::Chunk;
use crate::document::{Document, InlineEvent, LayerId};
use crate::error::ExmlResult;
use crate::object::ObjectKey;
use crate::schema::{LayerSchema, WireAttrs, SPAN_ATTR, XML_ID};
use crate::span::Span;

/// Elements whose end completes a chunk.
const BOUNDARY_TAGS: [&str; 2] = ["text", "doc"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    BeforeHeader,
    BeforeBody,
    InBody,
    AtEnd,
}

/// An element of the body that is currently open.
#[derive(Debug)]
enum Frame {
    Word {
        pending: usize,
    },
    Markable {
        name: String,
        layer: LayerId,
        key: ObjectKey,
        start: usize,
        pending: usize,
    },
    Edge {
        name: String,
    },
    Other {
        name: String,
        mark: usize,
    },
}

impl Frame {
    fn name<'a>(&'a self, terminal: &'a str) -> &'a str {
        match self {
            Frame::Word { .. } => terminal,
            Frame::Markable { name, .. } | Frame::Edge { name } | Frame::Other { name, .. } => name,
        }
    }

    /// First pending fill belonging to this element's subtree.
    fn mark(&self) -> usize {
        match self {
            Frame::Word { pending } | Frame::Markable { pending, .. } => *pending,
            Frame::Other { mark, .. } => *mark,
            Frame::Edge { .. } => usize::MAX,
        }
    }
}

/// Attributes and edges of an object, waiting for the end of its text.
#[derive(Debug)]
struct PendingFill {
    key: ObjectKey,
    layer: LayerId,
    attrs: WireAttrs,
    edges: Vec<(String, WireAttrs)>,
}

enum Tag {
    Open(String, WireAttrs),
    Close(String),
    Eof,
    Skip,
}

fn attributes(start: &BytesStart, checked: bool) -> ExmlResult<WireAttrs> {
    let mut attrs = WireAttrs::new();
    for attr in start.attributes().with_checks(checked) {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrs.push((key, value));
    }
    Ok(attrs)
}

fn close_frame(doc: &mut Document, frame: Frame) -> ExmlResult<()> {
    if let Frame::Markable {
        layer, key, start, ..
    } = frame
    {
        doc.set_span(key, Span::range(start, doc.len())?)?;
        doc.register(key, Some(layer))?;
    }
    Ok(())
}

/// Pull reader for an inline EXML corpus.
///
/// ```no_run
/// # use exmldoc::{Chunk, Document, LayerSchema, ReadOptions, XmlCorpusReader};
/// # fn main() -> exmldoc::ExmlResult<()> {
/// let mut doc = Document::new(LayerSchema::terminal("word"), Vec::new());
/// let file = std::io::BufReader::new(std::fs::File::open("corpus.exml.xml")?);
/// let mut reader = XmlCorpusReader::new(file, ReadOptions::default());
/// while let Chunk::Range { start, end } = reader.next_chunk(&mut doc)? {
///     println!("{} tokens", end - start);
///     doc.clear_range(start..end);
/// }
/// # Ok(())
/// # }
/// ```
pub struct XmlCorpusReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    options: ReadOptions,
    state: ReadState,
    frames: Vec<Frame>,
    pending: Vec<PendingFill>,
    last_stop: usize,
}

impl<R: BufRead> XmlCorpusReader<R> {
    pub fn new(input: R, options: ReadOptions) -> Self {
        let mut reader = Reader::from_reader(input);
        let config = reader.config_mut();
        config.trim_text(true);
        config.expand_empty_elements = true;
        config.check_end_names = !options.recover;
        Self {
            reader,
            buf: Vec::new(),
            options,
            state: ReadState::BeforeHeader,
            frames: Vec::new(),
            pending: Vec::new(),
            last_stop: 0,
        }
    }

    /// Whether the body has been read completely.
    pub fn at_end(&self) -> bool {
        self.state == ReadState::AtEnd
    }

    fn next_tag(&mut self) -> ExmlResult<Tag> {
        let checked = !self.options.recover;
        self.buf.clear();
        let event = self.reader.read_event_into(&mut self.buf)?;
        let tag = match event {
            Event::Start(start) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                Tag::Open(name, attributes(&start, checked)?)
            }
            Event::End(end) => Tag::Close(String::from_utf8_lossy(end.name().as_ref()).into_owned()),
            Event::Eof => Tag::Eof,
            _ => Tag::Skip,
        };
        Ok(tag)
    }

    /// Collect the element opened by `name` with all its descendants.
    fn read_element(&mut self, name: String, attrs: WireAttrs) -> ExmlResult<Element> {
        let mut stack = vec![Element::new(name, attrs)];
        loop {
            match self.next_tag()? {
                Tag::Open(name, attrs) => stack.push(Element::new(name, attrs)),
                Tag::Close(_) | Tag::Eof => {
                    let done = stack.pop().unwrap_or_default();
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(done),
                        None => return Ok(done),
                    }
                }
                Tag::Skip => {}
            }
        }
    }

    /// Read up to the end of the schema header and merge it into `doc`.
    ///
    /// Does nothing once the header has been read.
    pub fn read_header(&mut self, doc: &mut Document) -> ExmlResult<()> {
        while self.state == ReadState::BeforeHeader {
            match self.next_tag()? {
                Tag::Open(name, attrs) if name == "schema" => {
                    let schema = self.read_element(name, attrs)?;
                    process_schema(doc, &schema);
                    self.state = ReadState::BeforeBody;
                }
                Tag::Open(name, _) if name == "body" => {
                    doc.warn("document without schema header");
                    self.enter_body(doc);
                }
                Tag::Eof => self.state = ReadState::AtEnd,
                _ => {}
            }
        }
        Ok(())
    }

    fn enter_body(&mut self, doc: &Document) {
        self.state = ReadState::InBody;
        self.last_stop = doc.len();
    }

    /// Read the next chunk: up to the end of the next `text`/`doc` element
    /// or of the body.
    ///
    /// Returns the token range the chunk added, or [`Chunk::EndOfInput`]
    /// once the body is exhausted.
    pub fn next_chunk(&mut self, doc: &mut Document) -> ExmlResult<Chunk> {
        self.read_header(doc)?;
        while self.state == ReadState::BeforeBody {
            match self.next_tag()? {
                Tag::Open(name, _) if name == "body" => self.enter_body(doc),
                Tag::Eof => self.state = ReadState::AtEnd,
                _ => {}
            }
        }
        while self.state == ReadState::InBody {
            match self.next_tag()? {
                Tag::Open(name, attrs) => self.open(doc, name, attrs)?,
                Tag::Close(name) => {
                    if let Some(chunk) = self.close(doc, &name)? {
                        return Ok(chunk);
                    }
                }
                Tag::Eof => {
                    if !self.frames.is_empty() {
                        doc.warn(format!(
                            "input ends with {} unclosed elements",
                            self.frames.len()
                        ));
                    }
                    while let Some(frame) = self.frames.pop() {
                        close_frame(doc, frame)?;
                    }
                    return self.finish(doc);
                }
                Tag::Skip => {}
            }
        }
        Ok(Chunk::EndOfInput)
    }

    /// The innermost open word or markable, for edge elements.
    fn owner(&self) -> Option<(usize, LayerId)> {
        self.frames.iter().rev().find_map(|f| match f {
            Frame::Word { pending } => Some((*pending, LayerId::TERMINAL)),
            Frame::Markable { pending, layer, .. } => Some((*pending, *layer)),
            _ => None,
        })
    }

    fn unknown_attrs<'a>(schema: &LayerSchema, attrs: &'a WireAttrs) -> Vec<&'a str> {
        attrs
            .iter()
            .map(|(k, _)| k.as_str())
            .filter(|k| *k != XML_ID && *k != SPAN_ATTR && !k.starts_with("xmlns"))
            .filter(|k| schema.attribute_by_name(k).is_none())
            .collect()
    }

    fn open(&mut self, doc: &mut Document, name: String, attrs: WireAttrs) -> ExmlResult<()> {
        let charset = self.options.charset;
        if name == doc.terminal_schema().name {
            let unknown = Self::unknown_attrs(doc.terminal_schema(), &attrs);
            doc.ensure_attributes(LayerId::TERMINAL, unknown);
            let obj = doc
                .terminal_schema()
                .construct_from_element(&attrs, doc.len(), charset)?;
            let key = doc.append_terminal(obj)?;
            self.frames.push(Frame::Word {
                pending: self.pending.len(),
            });
            self.pending.push(PendingFill {
                key,
                layer: LayerId::TERMINAL,
                attrs,
                edges: Vec::new(),
            });
            return Ok(());
        }

        if let Some(layer) = doc.layer_by_name(&name) {
            let unknown = Self::unknown_attrs(doc.schema(layer), &attrs);
            doc.ensure_attributes(layer, unknown);
            let start = doc.len();
            let obj = doc.schema(layer).construct_from_element(&attrs, start, charset)?;
            let key = doc.add_object(obj)?;
            if doc.id_of(key).is_none() {
                let id = doc.assign_temp_id(key)?;
                log::debug!("<{}> at {} has no ID, using {}", name, start, id);
            }
            self.frames.push(Frame::Markable {
                name,
                layer,
                key,
                start,
                pending: self.pending.len(),
            });
            self.pending.push(PendingFill {
                key,
                layer,
                attrs,
                edges: Vec::new(),
            });
            return Ok(());
        }

        if let Some((owner, layer)) = self.owner() {
            if doc.schema(layer).edge_by_name(&name).is_some() {
                self.pending[owner].edges.push((name.clone(), attrs));
                self.frames.push(Frame::Edge { name });
                return Ok(());
            }
        }
        if !BOUNDARY_TAGS.contains(&name.as_str()) {
            doc.warn(format!("no schema for element <{}>", name));
        }
        self.frames.push(Frame::Other {
            name,
            mark: self.pending.len(),
        });
        Ok(())
    }

    fn close(&mut self, doc: &mut Document, name: &str) -> ExmlResult<Option<Chunk>> {
        if name == "body" {
            if !self.frames.is_empty() {
                doc.warn(format!("body ends with {} unclosed elements", self.frames.len()));
                while let Some(frame) = self.frames.pop() {
                    close_frame(doc, frame)?;
                }
            }
            return self.finish(doc).map(Some);
        }

        let terminal = doc.terminal_schema().name.clone();
        let Some(idx) = self.frames.iter().rposition(|f| f.name(&terminal) == name) else {
            doc.warn(format!("unmatched end tag </{}>", name));
            return Ok(None);
        };
        while self.frames.len() > idx + 1 {
            if let Some(frame) = self.frames.pop() {
                doc.warn(format!("element <{}> not closed", frame.name(&terminal)));
                close_frame(doc, frame)?;
            }
        }
        let Some(frame) = self.frames.pop() else {
            return Ok(None);
        };
        let mark = frame.mark();
        close_frame(doc, frame)?;

        if BOUNDARY_TAGS.contains(&name) {
            self.flush(doc, mark)?;
            let end = doc.len();
            if end > self.last_stop {
                let start = std::mem::replace(&mut self.last_stop, end);
                log::debug!("chunk {}..{} read", start, end);
                return Ok(Some(Chunk::Range { start, end }));
            }
        }
        Ok(None)
    }

    /// Fill every pending object from index `mark` on.
    fn flush(&mut self, doc: &mut Document, mark: usize) -> ExmlResult<()> {
        let mark = mark.min(self.pending.len());
        let charset = self.options.charset;
        let pending: Vec<PendingFill> = self.pending.drain(mark..).collect();
        for fill in &pending {
            doc.clear_temp_id(fill.key);
        }
        for fill in pending {
            if doc.object(fill.key).is_none() {
                log::debug!("object {} was cleared before its attributes were read", fill.key);
                continue;
            }
            let plan = doc
                .schema(fill.layer)
                .plan_xml_fill(&fill.attrs, &fill.edges, doc, charset)?;
            doc.apply_fill(fill.key, fill.layer, plan)?;
        }
        Ok(())
    }

    fn finish(&mut self, doc: &mut Document) -> ExmlResult<Chunk> {
        self.flush(doc, 0)?;
        self.state = ReadState::AtEnd;
        let end = doc.len();
        if end > self.last_stop {
            let start = std::mem::replace(&mut self.last_stop, end);
            return Ok(Chunk::Range { start, end });
        }
        Ok(Chunk::EndOfInput)
    }

    /// Read the whole corpus, handing the event stream of each chunk to
    /// `sink`. With `clean`, every chunk is cleared after `sink` returns.
    pub fn inline_events<F>(
        &mut self,
        doc: &mut Document,
        levels: Option<&[&str]>,
        clean: bool,
        mut sink: F,
    ) -> ExmlResult<()>
    where
        F: FnMut(&Document, Vec<InlineEvent>) -> ExmlResult<()>,
    {
        while let Chunk::Range { start, end } = self.next_chunk(doc)? {
            let events = doc.inline_events(start..end, levels, false)?;
            sink(doc, events)?;
            if clean {
                doc.clear_range(start..end);
            }
        }
        Ok(())
    }
}
