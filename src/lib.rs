//! Schema-driven document model for ExportXMLv2 (EXML) annotated corpora.
//!
//! A [`Document`] holds a token sequence, one terminal object per token and
//! any number of markables (sentences, syntax nodes, named entities, ...)
//! on named layers. Each layer is described by a [`LayerSchema`] listing its
//! attributes and edge types, and the schemas drive both wire formats:
//!
//! - inline XML, where markables nest around `<word/>` elements and spans
//!   that cannot be expressed by nesting carry an explicit `span` attribute;
//! - flat JSON chunks, one record list per layer.
//!
//! Corpora are read chunk by chunk with [`XmlCorpusReader`] or
//! [`JsonCorpusReader`]; clearing each chunk after use keeps memory bounded.
//!
//! ## Example
//!
//! ```
//! use exmldoc::{Attribute, Document, LayerSchema, Object, ObjectKind, Span, WriteOptions};
//!
//! let terminal = LayerSchema::terminal("word").with_attribute(Attribute::enumeration("pos"));
//! let sentence = LayerSchema::markable("sentence", ObjectKind::Sentence);
//! let mut doc = Document::new(terminal, vec![sentence]);
//! doc.append_terminal(Object::terminal("Hallo").with_id("s1_1")).unwrap();
//! doc.append_terminal(Object::terminal("Welt").with_id("s1_2")).unwrap();
//! doc.insert_markable(Object::markable(ObjectKind::Sentence, Span::range(0, 2).unwrap()).with_id("s1"))
//!     .unwrap();
//!
//! let mut out = Vec::new();
//! doc.write_inline_xml(&mut out, 0..2, &WriteOptions::default()).unwrap();
//! assert!(String::from_utf8(out).unwrap().starts_with("<sentence xml:id=\"s1\">"));
//! ```

mod alphabet;
mod attribute;
mod corpus;
mod document;
mod edge;
mod encoding;
mod error;
mod object;
mod order;
mod schema;
mod span;
mod xml;


pub use alphabet::Alphabet;
pub use attribute::{Attribute, AttributeKind, Restriction};
pub use corpus::{write_corpus_json, write_corpus_xml, Chunk, ChunkSource, JsonCorpusReader};
pub use document::{Document, InlineEvent, LayerId, TEMP_ID_PREFIX};
pub use edge::{EdgeKind, EdgeSchema, SECEDGE_PROP};
pub use encoding::{default_transliteration, normalize_punctuation, Charset, Transliterator};
pub use error::{ExmlError, ExmlResult};
pub use object::{Anaphora, EdgeValues, Object, ObjectKey, ObjectKind, Value, FORM_PROP};
pub use order::topsort;
pub use schema::{InterfacePart, LayerSchema, Serialized, WireAttrs, JSON_ID, SPAN_ATTR, XML_ID};
pub use span::{decode_span, encode_span, Span};
pub use xml::{ReadOptions, WriteOptions, XmlCorpusReader};
