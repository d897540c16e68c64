//! Terminals and markables as stored in the document arena.
//!
//! Objects never hold each other directly. A reference attribute stores an
//! [`ObjectKey`], which is resolved through the owning
//! [`Document`](crate::Document). This keeps parent/child and coreference
//! cycles out of the ownership graph.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::span::Span;

/// Handle of an object in a document's arena.
///
/// Keys are never reused within a document; a key whose object was cleared
/// simply stops resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey(pub(crate) usize);

impl ObjectKey {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What kind of object this is; determines which layer schema handles it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectKind {
    /// A token on the terminal layer.
    Word,
    /// A whole text (document boundary).
    Text,
    /// A sentence, carrying a syntax tree.
    Sentence,
    /// A nonterminal syntax node.
    Node,
    /// A named entity.
    NamedEntity,
    /// Any other layer, identified by its name.
    Generic(String),
}

impl ObjectKind {
    /// Default layer name for this kind.
    pub fn default_layer(&self) -> &str {
        match self {
            ObjectKind::Word => "word",
            ObjectKind::Text => "text",
            ObjectKind::Sentence => "sentence",
            ObjectKind::Node => "node",
            ObjectKind::NamedEntity => "ne",
            ObjectKind::Generic(name) => name,
        }
    }
}

/// An attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Ref(ObjectKey),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Ref(_) => None,
        }
    }

    pub fn as_ref_key(&self) -> Option<ObjectKey> {
        match self {
            Value::Ref(key) => Some(*key),
            Value::Text(_) => None,
        }
    }
}

/// One edge instance: a value per attribute of the edge type, in declaration order.
pub type EdgeValues = Vec<Option<Value>>;

/// Coreference / anaphora information of a word or node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anaphora {
    /// Relation type, e.g. `anaphoric`, `coreferential`, `split_antecedent`.
    pub kind: String,
    /// Antecedent IDs; absent for targetless relations such as `expletive`.
    pub targets: Option<Vec<String>>,
}

/// A terminal or markable.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    kind: ObjectKind,
    pub span: Span,
    pub(crate) xml_id: Option<String>,
    attrs: BTreeMap<String, Value>,
    edges: BTreeMap<String, Vec<EdgeValues>>,
    pub anaphora: Option<Anaphora>,
}

/// Property holding a terminal's surface form.
pub const FORM_PROP: &str = "word";

impl Object {
    /// A markable of `kind` covering `span`.
    pub fn markable(kind: ObjectKind, span: Span) -> Self {
        Self {
            kind,
            span,
            xml_id: None,
            attrs: BTreeMap::new(),
            edges: BTreeMap::new(),
            anaphora: None,
        }
    }

    /// A terminal with surface form `form`. The span is set when the
    /// terminal is added to a document.
    pub fn terminal(form: impl Into<String>) -> Self {
        let mut obj = Self::markable(ObjectKind::Word, Span::token(0));
        obj.attrs.insert(FORM_PROP.to_string(), Value::Text(form.into()));
        obj
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.xml_id = Some(id.into());
        self
    }

    pub fn with_attr(mut self, prop: &str, value: Value) -> Self {
        self.set_attr(prop, value);
        self
    }

    pub fn with_text(self, prop: &str, value: &str) -> Self {
        self.with_attr(prop, Value::text(value))
    }

    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    pub fn is_terminal(&self) -> bool {
        self.kind == ObjectKind::Word
    }

    /// The explicit or already-assigned ID, if any.
    pub fn xml_id(&self) -> Option<&str> {
        self.xml_id.as_deref()
    }

    /// Surface form; empty for markables.
    pub fn form(&self) -> &str {
        self.text(FORM_PROP).unwrap_or("")
    }

    pub fn attr(&self, prop: &str) -> Option<&Value> {
        self.attrs.get(prop)
    }

    pub fn text(&self, prop: &str) -> Option<&str> {
        self.attrs.get(prop).and_then(Value::as_text)
    }

    pub fn reference(&self, prop: &str) -> Option<ObjectKey> {
        self.attrs.get(prop).and_then(Value::as_ref_key)
    }

    pub fn set_attr(&mut self, prop: &str, value: Value) {
        self.attrs.insert(prop.to_string(), value);
    }

    pub fn remove_attr(&mut self, prop: &str) -> Option<Value> {
        self.attrs.remove(prop)
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Edge instances stored under `prop`.
    pub fn edges(&self, prop: &str) -> &[EdgeValues] {
        self.edges.get(prop).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Every object key held by an attribute or edge value.
    pub fn referenced_keys(&self) -> impl Iterator<Item = ObjectKey> + '_ {
        let from_attrs = self.attrs.values().filter_map(Value::as_ref_key);
        let from_edges = self
            .edges
            .values()
            .flatten()
            .flatten()
            .filter_map(|v| v.as_ref().and_then(Value::as_ref_key));
        from_attrs.chain(from_edges)
    }

    /// Point references at replaced objects to their replacements.
    pub(crate) fn redirect_refs(&mut self, moved: &HashMap<ObjectKey, ObjectKey>) {
        let redirect = |value: &mut Value| {
            if let Value::Ref(key) = value {
                if let Some(new) = moved.get(key) {
                    *key = *new;
                }
            }
        };
        self.attrs.values_mut().for_each(redirect);
        self.edges
            .values_mut()
            .flatten()
            .flatten()
            .flatten()
            .for_each(redirect);
    }

    pub fn set_edges(&mut self, prop: &str, values: Vec<EdgeValues>) {
        if values.is_empty() {
            self.edges.remove(prop);
        } else {
            self.edges.insert(prop.to_string(), values);
        }
    }
}
