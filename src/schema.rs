//! Layer schemas.
//!
//! A [`LayerSchema`] lists the attributes and edge types of one layer and
//! maps objects of that layer to and from both wire formats. The terminal
//! (`word`) layer uses the same type; it differs only in that its objects
//! have no explicit span on the wire.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use serde_json::{Map, Value as JsonValue};

use crate::attribute::{Attribute, AttributeKind};
use crate::document::Document;
use crate::edge::EdgeSchema;
use crate::encoding::Charset;
use crate::error::{ExmlError, ExmlResult};
use crate::object::{EdgeValues, Object, ObjectKey, ObjectKind, Value, FORM_PROP};
use crate::span::{decode_span, Span};

/// Wire attribute carrying an object's ID.
pub const XML_ID: &str = "xml:id";
/// Wire attribute carrying an explicit span.
pub const SPAN_ATTR: &str = "span";
/// JSON key carrying an object's ID.
pub const JSON_ID: &str = "_id";

/// A named attribute list for one element, in output order.
pub type WireAttrs = Vec<(String, String)>;

/// One object in wire form, ready to be written as a tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Serialized {
    pub span: Span,
    pub layer: String,
    pub attrs: WireAttrs,
    /// Attribute-only child elements, one per edge instance.
    pub edges: Vec<(String, WireAttrs)>,
}

/// One part of a named interface: an attribute or an edge type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfacePart {
    Attr(String),
    Edge(String),
}

impl InterfacePart {
    pub fn name(&self) -> &str {
        match self {
            InterfacePart::Attr(name) | InterfacePart::Edge(name) => name,
        }
    }
}

/// Where an enum value seen while filling should be recorded.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum EnumNote {
    Attr { attr: usize, value: String },
    EdgeAttr { edge: usize, attr: usize, value: String },
}

/// Values computed against an immutable document, applied afterwards.
#[derive(Debug, Default)]
pub(crate) struct FillPlan {
    pub(crate) attrs: Vec<(String, Value)>,
    pub(crate) edges: Vec<(usize, Vec<EdgeValues>)>,
    pub(crate) span: Option<Span>,
    pub(crate) enum_notes: Vec<EnumNote>,
}

impl FillPlan {
    fn push_edge(&mut self, edge: usize, values: EdgeValues) {
        match self.edges.iter_mut().find(|(idx, _)| *idx == edge) {
            Some((_, all)) => all.push(values),
            None => self.edges.push((edge, vec![values])),
        }
    }
}

/// Schema of one annotation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSchema {
    pub name: String,
    pub kind: ObjectKind,
    /// Layer whose object must open first when both start at the same token.
    pub locality: Option<String>,
    attributes: Vec<Attribute>,
    edges: Vec<EdgeSchema>,
    /// Wire attributes set when the object is constructed.
    init_attrs: Vec<String>,
    /// Constructor attributes that must be present.
    required: Vec<String>,
    interfaces: BTreeSet<String>,
}

impl LayerSchema {
    /// Terminal schema with a required `form` attribute.
    pub fn terminal(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ObjectKind::Word,
            locality: None,
            attributes: vec![Attribute::text("form").with_prop(FORM_PROP)],
            edges: Vec::new(),
            init_attrs: vec!["form".to_string()],
            required: vec!["form".to_string()],
            interfaces: BTreeSet::new(),
        }
    }

    pub fn markable(name: &str, kind: ObjectKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            locality: None,
            attributes: Vec::new(),
            edges: Vec::new(),
            init_attrs: Vec::new(),
            required: Vec::new(),
            interfaces: BTreeSet::new(),
        }
    }

    /// Layer for objects without a dedicated kind.
    pub fn generic(name: &str) -> Self {
        Self::markable(name, ObjectKind::Generic(name.to_string()))
    }

    pub fn with_locality(mut self, layer: &str) -> Self {
        self.locality = Some(layer.to_string());
        self
    }

    pub fn with_attribute(mut self, att: Attribute) -> Self {
        self.attributes.push(att);
        self
    }

    pub fn with_edge(mut self, edge: EdgeSchema) -> Self {
        self.edges.push(edge);
        self
    }

    /// Set the named wire attribute already at construction time.
    pub fn with_init(mut self, name: &str) -> Self {
        if !self.init_attrs.iter().any(|n| n == name) {
            self.init_attrs.push(name.to_string());
        }
        self
    }

    /// Like [`with_init`](Self::with_init), and fail construction without it.
    pub fn with_required(mut self, name: &str) -> Self {
        self = self.with_init(name);
        if !self.required.iter().any(|n| n == name) {
            self.required.push(name.to_string());
        }
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.kind == ObjectKind::Word
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute_by_name(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn attribute_by_name_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        self.attributes.iter_mut().find(|a| a.name == name)
    }

    pub fn add_attribute(&mut self, att: Attribute) {
        self.attributes.push(att);
    }

    /// Insert before the last attribute (the trailing `comment` of the
    /// syntax layers stays last).
    pub fn insert_attribute_before_last(&mut self, att: Attribute) {
        let at = self.attributes.len().saturating_sub(1);
        self.attributes.insert(at, att);
    }

    pub fn edges(&self) -> &[EdgeSchema] {
        &self.edges
    }

    pub fn edge_by_name(&self, name: &str) -> Option<&EdgeSchema> {
        self.edges.iter().find(|e| e.name == name)
    }

    pub fn edge_by_name_mut(&mut self, name: &str) -> Option<&mut EdgeSchema> {
        self.edges.iter_mut().find(|e| e.name == name)
    }

    fn edge_index(&self, name: &str) -> Option<usize> {
        self.edges.iter().position(|e| e.name == name)
    }

    pub fn add_edge(&mut self, edge: EdgeSchema) {
        self.edges.push(edge);
    }

    pub fn interfaces(&self) -> &BTreeSet<String> {
        &self.interfaces
    }

    // ========================================================================
    // Construction
    // ========================================================================

    fn construct_with(
        &self,
        span: Span,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ExmlResult<Object> {
        let mut obj = Object::markable(self.kind.clone(), span);
        for name in &self.init_attrs {
            let prop = self
                .attribute_by_name(name)
                .map(|a| a.prop.as_str())
                .unwrap_or(name.as_str());
            match lookup(name) {
                Some(value) => obj.set_attr(prop, Value::Text(value)),
                None if self.required.contains(name) => {
                    return Err(ExmlError::construction(
                        &self.name,
                        format!("missing required attribute '{}'", name),
                    ))
                }
                None => {}
            }
        }
        Ok(obj)
    }

    /// Build an object from an opening tag's attributes.
    ///
    /// Only constructor attributes are set here; the rest is filled once
    /// the enclosing boundary has been read.
    pub fn construct_from_element(
        &self,
        attrs: &[(String, String)],
        start: usize,
        charset: Charset,
    ) -> ExmlResult<Object> {
        let mut obj = self.construct_with(Span::token(start), |name| {
            lookup(attrs, name).map(|raw| charset.decode(raw).into_owned())
        })?;
        if let Some(id) = lookup(attrs, XML_ID) {
            obj = obj.with_id(id);
        }
        Ok(obj)
    }

    /// Build an object from a JSON record. Markables must carry a `span`.
    pub fn construct_from_json(&self, record: &Map<String, JsonValue>) -> ExmlResult<Object> {
        let span = if self.is_terminal() {
            Span::token(0)
        } else {
            match record.get(SPAN_ATTR) {
                Some(raw) => serde_json::from_value::<Span>(raw.clone())?,
                None => {
                    return Err(ExmlError::construction(&self.name, "record without span"))
                }
            }
        };
        let mut obj = self.construct_with(span, |name| match record.get(name) {
            Some(JsonValue::String(s)) => Some(s.clone()),
            Some(JsonValue::Null) | None => None,
            Some(other) => Some(other.to_string()),
        })?;
        if let Some(JsonValue::String(id)) = record.get(JSON_ID) {
            obj = obj.with_id(id.clone());
        }
        Ok(obj)
    }

    // ========================================================================
    // Filling
    // ========================================================================

    /// Compute attribute, edge and span values from an element and its edge
    /// children. Absent attributes that declare a default get the default.
    pub(crate) fn plan_xml_fill(
        &self,
        attrs: &[(String, String)],
        edges: &[(String, WireAttrs)],
        doc: &Document,
        charset: Charset,
    ) -> ExmlResult<FillPlan> {
        let mut plan = FillPlan::default();
        for (i, att) in self.attributes.iter().enumerate() {
            match lookup(attrs, &att.name) {
                Some(raw) => {
                    let value = att.unmap_value(raw, doc, charset)?;
                    if let (AttributeKind::Enum { .. }, Value::Text(text)) = (&att.kind, &value) {
                        plan.enum_notes.push(EnumNote::Attr {
                            attr: i,
                            value: text.clone(),
                        });
                    }
                    plan.attrs.push((att.prop.clone(), value));
                }
                None => {
                    if let Some(default) = att.default_value() {
                        plan.attrs.push((att.prop.clone(), Value::text(default)));
                    }
                }
            }
        }
        if let Some(raw) = lookup(attrs, SPAN_ATTR) {
            plan.span = Some(decode_span(raw, doc.word_ids())?);
        }
        for (name, edge_attrs) in edges {
            let Some(idx) = self.edge_index(name) else {
                continue;
            };
            let edge = &self.edges[idx];
            let mut values = EdgeValues::new();
            for (j, att) in edge.attributes().iter().enumerate() {
                match lookup(edge_attrs, &att.name) {
                    Some(raw) => {
                        let value = att.unmap_value(raw, doc, charset)?;
                        if let (AttributeKind::Enum { .. }, Value::Text(text)) =
                            (&att.kind, &value)
                        {
                            plan.enum_notes.push(EnumNote::EdgeAttr {
                                edge: idx,
                                attr: j,
                                value: text.clone(),
                            });
                        }
                        values.push(Some(value));
                    }
                    None => values.push(None),
                }
            }
            plan.push_edge(idx, values);
        }
        Ok(plan)
    }

    /// Compute attribute and edge values from a JSON record. Values are
    /// transferred as stored; defaults are not filled in.
    pub(crate) fn plan_json_fill(
        &self,
        record: &Map<String, JsonValue>,
        resolve: impl Fn(&str) -> Option<ObjectKey>,
    ) -> ExmlResult<FillPlan> {
        let mut plan = FillPlan::default();
        for att in &self.attributes {
            if let Some(raw) = record.get(&att.name) {
                if let Some(value) = json_to_value(raw, &resolve, &self.name)? {
                    plan.attrs.push((att.prop.clone(), value));
                }
            }
        }
        for (idx, edge) in self.edges.iter().enumerate() {
            let Some(raw) = record.get(&edge.name) else {
                continue;
            };
            let tuples = raw.as_array().ok_or_else(|| {
                ExmlError::construction(&self.name, format!("edge '{}' is not a list", edge.name))
            })?;
            let mut all = Vec::with_capacity(tuples.len());
            for tuple in tuples {
                let items = tuple.as_array().ok_or_else(|| {
                    ExmlError::construction(
                        &self.name,
                        format!("edge '{}' holds a non-list value", edge.name),
                    )
                })?;
                let values = items
                    .iter()
                    .map(|item| json_to_value(item, &resolve, &self.name))
                    .collect::<ExmlResult<EdgeValues>>()?;
                all.push(values);
            }
            if !all.is_empty() {
                plan.edges.push((idx, all));
            }
        }
        Ok(plan)
    }

    /// Record an enum value seen on input.
    pub(crate) fn note_enum(&mut self, note: EnumNote) {
        match note {
            EnumNote::Attr { attr, value } => {
                if let Some(att) = self.attributes.get_mut(attr) {
                    att.add_item(&value, None);
                }
            }
            EnumNote::EdgeAttr { edge, attr, value } => {
                if let Some(att) = self
                    .edges
                    .get_mut(edge)
                    .and_then(|e| e.attribute_at_mut(attr))
                {
                    att.add_item(&value, None);
                }
            }
        }
    }

    /// Apply edge instances computed by a fill plan.
    pub(crate) fn set_edges(
        &self,
        edge: usize,
        obj: &mut Object,
        values: Vec<EdgeValues>,
    ) -> ExmlResult<()> {
        match self.edges.get(edge) {
            Some(schema) => schema.set_edges(obj, values),
            None => Err(ExmlError::integrity(format!(
                "layer '{}' has no edge type #{}",
                self.name, edge
            ))),
        }
    }

    // ========================================================================
    // Serialization
    // ========================================================================

    /// Wire form of `key` for inline XML.
    ///
    /// With `force_ids`, the object's ID must already be assigned.
    pub fn serialize(
        &self,
        key: ObjectKey,
        doc: &Document,
        force_ids: bool,
    ) -> ExmlResult<Serialized> {
        let obj = doc
            .object(key)
            .ok_or_else(|| ExmlError::unresolved(&key.to_string(), "serialization"))?;
        let mut attrs = WireAttrs::new();
        match obj.xml_id() {
            Some(id) => attrs.push((XML_ID.to_string(), id.to_string())),
            None if force_ids => {
                return Err(ExmlError::unresolved(
                    &key.to_string(),
                    format!("'{}' object without ID", self.name),
                ))
            }
            None => {}
        }
        for att in &self.attributes {
            if let Some(value) = obj.attr(&att.prop) {
                if let Some(text) = att.map_value(value, doc)? {
                    attrs.push((att.name.clone(), text));
                }
            }
        }
        let mut edges = Vec::new();
        for edge in &self.edges {
            for tuple in edge.get_edges(obj) {
                let mut edge_attrs = WireAttrs::new();
                for (att, value) in edge.attributes().iter().zip(tuple.iter()) {
                    if let Some(value) = value {
                        if let Some(text) = att.map_value(value, doc)? {
                            edge_attrs.push((att.name.clone(), text));
                        }
                    }
                }
                edges.push((edge.name.clone(), edge_attrs));
            }
        }
        Ok(Serialized {
            span: obj.span.clone(),
            layer: self.name.clone(),
            attrs,
            edges,
        })
    }

    /// Flat JSON record for `key`.
    pub fn to_json(&self, key: ObjectKey, doc: &Document) -> ExmlResult<Map<String, JsonValue>> {
        let obj = doc
            .object(key)
            .ok_or_else(|| ExmlError::unresolved(&key.to_string(), "json export"))?;
        let id = doc
            .id_of(key)
            .ok_or_else(|| ExmlError::unresolved(&key.to_string(), "json export"))?;
        let mut record = Map::new();
        record.insert(JSON_ID.to_string(), JsonValue::String(id.to_string()));
        if !self.is_terminal() {
            record.insert(SPAN_ATTR.to_string(), serde_json::to_value(&obj.span)?);
        }
        for att in &self.attributes {
            if let Some(value) = obj.attr(&att.prop) {
                record.insert(att.name.clone(), value_to_json(value, doc)?);
            }
        }
        for edge in &self.edges {
            let tuples = edge.get_edges(obj);
            if tuples.is_empty() {
                continue;
            }
            let mut list = Vec::with_capacity(tuples.len());
            for tuple in &tuples {
                let items = tuple
                    .iter()
                    .map(|v| match v {
                        Some(v) => value_to_json(v, doc),
                        None => Ok(JsonValue::Null),
                    })
                    .collect::<ExmlResult<Vec<_>>>()?;
                list.push(JsonValue::Array(items));
            }
            record.insert(edge.name.clone(), JsonValue::Array(list));
        }
        Ok(record)
    }

    /// Up/down ordering edges contributed by all attributes and edges of `key`.
    pub fn graph_contributions(
        &self,
        key: ObjectKey,
        doc: &Document,
        out: &mut Vec<(String, String)>,
    ) -> ExmlResult<()> {
        let obj = doc
            .object(key)
            .ok_or_else(|| ExmlError::unresolved(&key.to_string(), "ordering"))?;
        let id = doc
            .id_of(key)
            .ok_or_else(|| ExmlError::unresolved(&key.to_string(), "ordering"))?;
        for att in &self.attributes {
            att.updown(id, obj.attr(&att.prop), doc, out)?;
        }
        for edge in &self.edges {
            edge.updown(id, obj, doc, out)?;
        }
        Ok(())
    }

    /// Write the `<tnode>` or `<node>` header entry.
    pub fn describe(&self, out: &mut String, charset: Charset) {
        let tag = if self.is_terminal() { "tnode" } else { "node" };
        let _ = write!(out, " <{} name=\"{}\"", tag, charset.escape_attr(&self.name));
        if let Some(locality) = &self.locality {
            let _ = write!(out, " locality=\"{}\"", charset.escape_attr(locality));
        }
        out.push_str(">\n");
        for att in &self.attributes {
            att.describe(out, charset);
        }
        let _ = writeln!(out, " </{}>", tag);
    }

    /// Check that every part exists and record the interface on success.
    ///
    /// Returns the first missing part otherwise.
    pub fn check_interface(&mut self, name: &str, parts: &[InterfacePart]) -> Result<(), String> {
        for part in parts {
            let found = match part {
                InterfacePart::Attr(att) => self.attribute_by_name(att).is_some(),
                InterfacePart::Edge(edge) => self.edge_by_name(edge).is_some(),
            };
            if !found {
                return Err(part.name().to_string());
            }
        }
        self.interfaces.insert(name.to_string());
        Ok(())
    }
}

/// Value of attribute `name` in a wire attribute list.
pub(crate) fn lookup<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

fn value_to_json(value: &Value, doc: &Document) -> ExmlResult<JsonValue> {
    match value {
        Value::Text(s) => Ok(JsonValue::String(s.clone())),
        Value::Ref(key) => {
            let id = doc
                .id_of(*key)
                .ok_or_else(|| ExmlError::unresolved(&key.to_string(), "json reference"))?;
            let mut m = Map::new();
            m.insert(JSON_ID.to_string(), JsonValue::String(id.to_string()));
            Ok(JsonValue::Object(m))
        }
    }
}

fn json_to_value(
    raw: &JsonValue,
    resolve: &impl Fn(&str) -> Option<ObjectKey>,
    layer: &str,
) -> ExmlResult<Option<Value>> {
    match raw {
        JsonValue::Null => Ok(None),
        JsonValue::String(s) => Ok(Some(Value::Text(s.clone()))),
        JsonValue::Number(_) | JsonValue::Bool(_) => Ok(Some(Value::Text(raw.to_string()))),
        JsonValue::Object(m) => match m.get(JSON_ID) {
            Some(JsonValue::String(id)) => resolve(id)
                .map(|key| Some(Value::Ref(key)))
                .ok_or_else(|| ExmlError::unresolved(id, format!("json record of '{}'", layer))),
            _ => Err(ExmlError::construction(layer, "object value without '_id'")),
        },
        JsonValue::Array(_) => Err(ExmlError::construction(layer, "unexpected list value")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::Restriction;

    fn attrs(pairs: &[(&str, &str)]) -> WireAttrs {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn node_schema() -> LayerSchema {
        LayerSchema::markable("node", ObjectKind::Node)
            .with_locality("sentence")
            .with_attribute(Attribute::enumeration("cat"))
            .with_attribute(
                Attribute::object_ref("parent")
                    .restricted(Restriction::Up)
                    .targeting(&["node"]),
            )
            .with_init("cat")
    }

    #[test]
    fn test_construct_sets_init_attrs_and_id() {
        let schema = node_schema();
        let obj = schema
            .construct_from_element(&attrs(&[("xml:id", "s1_500"), ("cat", "NX")]), 4, Charset::Utf8)
            .unwrap();
        assert_eq!(obj.xml_id(), Some("s1_500"));
        assert_eq!(obj.text("cat"), Some("NX"));
        assert_eq!(obj.span.start(), 4);
    }

    #[test]
    fn test_terminal_requires_form() {
        let schema = LayerSchema::terminal("word");
        let err = schema
            .construct_from_element(&attrs(&[("pos", "NN")]), 0, Charset::Utf8)
            .unwrap_err();
        assert!(matches!(err, ExmlError::Construction { .. }));

        let obj = schema
            .construct_from_element(&attrs(&[("form", "“Haus”")]), 0, Charset::Latin1)
            .unwrap();
        assert_eq!(obj.form(), "\"Haus\"");
    }

    #[test]
    fn test_markable_json_requires_span() {
        let schema = node_schema();
        let record: Map<String, JsonValue> =
            serde_json::from_str(r#"{"_id": "n1", "cat": "NX"}"#).unwrap();
        assert!(matches!(
            schema.construct_from_json(&record),
            Err(ExmlError::Construction { .. })
        ));

        let record: Map<String, JsonValue> =
            serde_json::from_str(r#"{"_id": "n1", "cat": "NX", "span": [2, 4]}"#).unwrap();
        let obj = schema.construct_from_json(&record).unwrap();
        assert_eq!(obj.span.bounds(), &[2, 4]);
        assert_eq!(obj.xml_id(), Some("n1"));
    }

    #[test]
    fn test_describe_with_locality() {
        let mut schema = node_schema();
        schema.attribute_by_name_mut("cat").unwrap().add_item("NX", None);
        let mut out = String::new();
        schema.describe(&mut out, Charset::Utf8);
        assert_eq!(
            out,
            " <node name=\"node\" locality=\"sentence\">\n  <enum-attr name=\"cat\">\n   <val name=\"NX\"/>\n  </enum-attr>\n  <node-ref name=\"parent\"/>\n </node>\n"
        );
    }

    #[test]
    fn test_check_interface() {
        let mut schema = node_schema();
        assert_eq!(
            schema.check_interface("labelled", &[InterfacePart::Attr("func".into())]),
            Err("func".to_string())
        );
        assert!(schema
            .check_interface("categorized", &[InterfacePart::Attr("cat".into())])
            .is_ok());
        assert!(schema.interfaces().contains("categorized"));
    }

    #[test]
    fn test_insert_before_last() {
        let mut schema = LayerSchema::terminal("word").with_attribute(Attribute::text("comment"));
        schema.insert_attribute_before_last(Attribute::text("lemma"));
        let names: Vec<&str> = schema.attributes().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["form", "lemma", "comment"]);
    }
}
