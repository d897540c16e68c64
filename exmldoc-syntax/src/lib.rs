//! TüBa-D/Z compatible syntax layers for [`exmldoc`].
//!
//! [`make_syntax_doc`] builds an empty [`Document`] with `word`, `text`,
//! `sentence`, `node` and (optionally) `ne` layers. [`load`] reads a whole
//! corpus into such a document and rebuilds a [`SyntaxTree`] per sentence;
//! [`TreeReader`] does the same one chunk at a time. [`add_tree_to_doc`] goes
//! the other way and adds a parsed [`SentenceTree`] to a document.

mod config;
mod errors;
mod reader;
mod sentence;
mod tree;

use std::io::BufRead;

use exmldoc::{
    Attribute, Charset, Chunk, Document, EdgeSchema, LayerSchema, ObjectKind, ReadOptions,
    Restriction, XmlCorpusReader,
};

pub use config::{DocExtensions, SyntaxConfig};
pub use errors::{SyntaxError, SyntaxResult};
pub use reader::TreeReader;
pub use sentence::{add_tree_to_doc, SentenceTree, TreePhrase, TreeWord, FIRST_PHRASE_NUMBER};
pub use tree::{SyntaxTree, TreeNode};

fn parent_ref() -> Attribute {
    Attribute::object_ref("parent")
        .restricted(Restriction::Up)
        .targeting(&["node"])
}

fn with_edges(schema: LayerSchema) -> LayerSchema {
    schema
        .with_edge(EdgeSchema::secondary("secEdge"))
        .with_edge(EdgeSchema::reference("relation"))
        .with_edge(EdgeSchema::split_reference("splitRelation"))
}

/// An empty document with the syntax layers selected by `config`.
pub fn make_syntax_doc(config: &SyntaxConfig) -> Document {
    let text = LayerSchema::markable("text", ObjectKind::Text)
        .with_attribute(Attribute::text("origin"))
        .with_init("origin");
    let sentence = LayerSchema::markable("sentence", ObjectKind::Sentence).with_locality("text");
    let node = with_edges(
        LayerSchema::markable("node", ObjectKind::Node)
            .with_locality("sentence")
            .with_attribute(Attribute::enumeration("cat"))
            .with_attribute(Attribute::enumeration("func").with_prop("edge_label"))
            .with_attribute(parent_ref())
            .with_attribute(Attribute::text("comment"))
            .with_init("cat"),
    );
    let ne = LayerSchema::markable("ne", ObjectKind::NamedEntity)
        .with_locality("sentence")
        .with_attribute(Attribute::enumeration("type").with_prop("kind"))
        .with_init("type");

    let mut word = with_edges(
        LayerSchema::terminal("word")
            .with_attribute(Attribute::enumeration("pos").with_prop("cat"))
            .with_attribute(Attribute::enumeration("morph").with_default("--"))
            .with_attribute(Attribute::text("lemma").with_default("--"))
            .with_attribute(Attribute::enumeration("func").with_prop("edge_label"))
            .with_attribute(parent_ref())
            .with_attribute(Attribute::text("comment")),
    );
    // optional word attributes go before `comment`
    if config.want_wsd {
        word.insert_attribute_before_last(
            Attribute::text("wsd-lexunits").with_prop("wsd_lexunits"),
        );
        word.insert_attribute_before_last(Attribute::text("wsd-comment").with_prop("wsd_comment"));
    }
    if config.want_deps {
        word.insert_attribute_before_last(
            Attribute::object_ref("dephead")
                .with_prop("syn_parent")
                .targeting(&["word"]),
        );
        word.insert_attribute_before_last(Attribute::enumeration("deprel").with_prop("syn_label"));
    }

    let mut layers = vec![sentence, node, text];
    if config.want_ne {
        layers.push(ne);
    }
    Document::new(word, layers)
}

/// The syntax preset with `extensions` applied.
pub fn create_doc(config: &SyntaxConfig, extensions: DocExtensions) -> Document {
    let mut doc = make_syntax_doc(config);
    let DocExtensions {
        word_attrs,
        layers,
        layer_attrs,
    } = extensions;
    for att in word_attrs {
        doc.terminal_schema_mut().add_attribute(att);
    }
    for layer in layers {
        doc.add_schema(layer);
    }
    for (layer, att) in layer_attrs {
        match doc.schema_by_name_mut(&layer) {
            Some(schema) => schema.add_attribute(att),
            None => log::warn!("extra attribute {} for unknown layer {}", att.name, layer),
        }
    }
    doc
}

/// Read a whole corpus into the full preset (with dependencies) and build
/// the syntax trees of all its sentences.
pub fn load<R: BufRead>(input: R, charset: Charset) -> SyntaxResult<(Document, Vec<SyntaxTree>)> {
    load_with(
        input,
        charset,
        &SyntaxConfig::default().with_deps(true),
        DocExtensions::default(),
    )
}

pub fn load_with<R: BufRead>(
    input: R,
    charset: Charset,
    config: &SyntaxConfig,
    extensions: DocExtensions,
) -> SyntaxResult<(Document, Vec<SyntaxTree>)> {
    let mut doc = create_doc(config, extensions);
    let mut reader = XmlCorpusReader::new(input, ReadOptions::default().with_charset(charset));
    while let Chunk::Range { start, end } = reader.next_chunk(&mut doc)? {
        log::debug!("loaded tokens {}..{}", start, end);
    }
    let trees = SyntaxTree::all(&doc, 0..doc.len())?;
    Ok((doc, trees))
}

/// Node ID for a `sentence:node` reference.
///
/// Numeric node numbers below 500 count terminals from zero and are shifted
/// by one; `3:0` is `s3_1`, `3:502` is `s3_502`.
pub fn noderef(reference: &str) -> SyntaxResult<String> {
    let mut parts = reference.split(':');
    let (Some(sent), Some(node), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(SyntaxError::NodeRef(reference.to_string()));
    };
    match node.parse::<u32>() {
        Ok(n) if n < 500 => Ok(format!("s{}_{}", sent, n + 1)),
        Ok(n) => Ok(format!("s{}_{}", sent, n)),
        Err(_) => Ok(format!("s{}_{}", sent, node)),
    }
}
