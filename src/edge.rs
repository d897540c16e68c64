//! Edge types: named relations with their own attribute lists.
//!
//! On the wire, an edge is an attribute-only child element of the word or
//! markable it belongs to, e.g. `<secEdge cat="refint" parent="s3_502"/>`.

use std::fmt::Write as _;

use crate::attribute::Attribute;
use crate::document::Document;
use crate::encoding::Charset;
use crate::error::{ExmlError, ExmlResult};
use crate::object::{Anaphora, EdgeValues, Object, Value};

/// Property under which secondary edges are stored.
pub const SECEDGE_PROP: &str = "secedge";

const SPLIT_ANTECEDENT: &str = "split_antecedent";
const TARGETLESS: [&str; 2] = ["expletive", "inherent_reflexive"];

#[derive(Debug, Clone, PartialEq)]
pub enum EdgeKind {
    /// Secondary syntactic edges: `(cat, parent)` tuples.
    Secondary,
    /// Anaphora/coreference relation to one or more antecedent IDs.
    Reference,
    /// The `split_antecedent` case of an anaphora relation.
    SplitReference,
    /// Tuples stored verbatim under an object property.
    Generic { prop: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeSchema {
    pub name: String,
    pub kind: EdgeKind,
    attributes: Vec<Attribute>,
}

impl EdgeSchema {
    pub fn secondary(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: EdgeKind::Secondary,
            attributes: vec![
                Attribute::enumeration("cat"),
                Attribute::object_ref("parent").targeting(&["word", "node"]),
            ],
        }
    }

    pub fn reference(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: EdgeKind::Reference,
            attributes: vec![
                Attribute::enumeration("type"),
                Attribute::id_ref("target").targeting(&["word", "node"]),
            ],
        }
    }

    pub fn split_reference(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: EdgeKind::SplitReference,
            attributes: vec![Attribute::enumeration("type"), Attribute::text("target")],
        }
    }

    pub fn generic(name: &str, prop: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: EdgeKind::Generic {
                prop: prop.to_string(),
            },
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, att: Attribute) -> Self {
        self.attributes.push(att);
        self
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

    pub(crate) fn attribute_at_mut(&mut self, idx: usize) -> Option<&mut Attribute> {
        self.attributes.get_mut(idx)
    }

    pub fn add_attribute(&mut self, att: Attribute) {
        self.attributes.push(att);
    }

    /// Edge instances of this type on `obj`.
    pub fn get_edges(&self, obj: &Object) -> Vec<EdgeValues> {
        match &self.kind {
            EdgeKind::Secondary => obj.edges(SECEDGE_PROP).to_vec(),
            EdgeKind::Generic { prop } => obj.edges(prop).to_vec(),
            EdgeKind::Reference => match &obj.anaphora {
                Some(info) if info.kind == SPLIT_ANTECEDENT => Vec::new(),
                Some(info) => {
                    let target = if TARGETLESS.contains(&info.kind.as_str()) {
                        None
                    } else {
                        info.targets.as_ref().map(|t| Value::Text(t.join(" ")))
                    };
                    vec![vec![Some(Value::Text(info.kind.clone())), target]]
                }
                None => Vec::new(),
            },
            EdgeKind::SplitReference => match &obj.anaphora {
                Some(info) if info.kind == SPLIT_ANTECEDENT => {
                    let target = info.targets.as_ref().map(|t| Value::Text(t.join(" ")));
                    vec![vec![Some(Value::Text(info.kind.clone())), target]]
                }
                _ => Vec::new(),
            },
        }
    }

    /// Replace the edge instances of this type on `obj`.
    pub fn set_edges(&self, obj: &mut Object, values: Vec<EdgeValues>) -> ExmlResult<()> {
        match &self.kind {
            EdgeKind::Secondary => obj.set_edges(SECEDGE_PROP, values),
            EdgeKind::Generic { prop } => obj.set_edges(prop, values),
            EdgeKind::Reference | EdgeKind::SplitReference => {
                if values.len() != 1 {
                    return Err(ExmlError::construction(
                        &self.name,
                        format!("expected exactly one relation, found {}", values.len()),
                    ));
                }
                let tuple = &values[0];
                let kind = match tuple.first() {
                    Some(Some(Value::Text(kind))) => kind.clone(),
                    _ => {
                        return Err(ExmlError::construction(&self.name, "relation without type"))
                    }
                };
                let targets = match tuple.get(1) {
                    Some(Some(Value::Text(t))) => {
                        Some(t.split(' ').map(str::to_string).collect())
                    }
                    _ => None,
                };
                obj.anaphora = Some(Anaphora { kind, targets });
            }
        }
        Ok(())
    }

    /// Append one instance to the existing ones.
    pub fn push_edge(&self, obj: &mut Object, values: EdgeValues) -> ExmlResult<()> {
        let mut all = self.get_edges(obj);
        all.push(values);
        self.set_edges(obj, all)
    }

    /// Ordering edges contributed by restricted references inside the edge tuples.
    pub fn updown(
        &self,
        obj_id: &str,
        obj: &Object,
        doc: &Document,
        out: &mut Vec<(String, String)>,
    ) -> ExmlResult<()> {
        for tuple in self.get_edges(obj) {
            for (att, value) in self.attributes.iter().zip(tuple.iter()) {
                att.updown(obj_id, value.as_ref(), doc, out)?;
            }
        }
        Ok(())
    }

    /// Write the `<edge>` header entry, declared for `parents`.
    pub fn describe(&self, out: &mut String, parents: &[String], charset: Charset) {
        let _ = writeln!(
            out,
            "<edge name=\"{}\" parent=\"{}\">",
            charset.escape_attr(&self.name),
            charset.escape_attr(&parents.join("|"))
        );
        for att in &self.attributes {
            att.describe(out, charset);
        }
        out.push_str("</edge>\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectKind;
    use crate::span::Span;

    fn node() -> Object {
        Object::markable(ObjectKind::Node, Span::range(0, 2).unwrap())
    }

    fn relation(kind: &str, target: Option<&str>) -> EdgeValues {
        vec![Some(Value::text(kind)), target.map(Value::text)]
    }

    #[test]
    fn test_reference_round_trip() {
        let edge = EdgeSchema::reference("relation");
        let mut obj = node();
        edge.set_edges(&mut obj, vec![relation("anaphoric", Some("s1_3 s1_4"))])
            .unwrap();
        assert_eq!(
            obj.anaphora.as_ref().unwrap().targets,
            Some(vec!["s1_3".to_string(), "s1_4".to_string()])
        );
        assert_eq!(edge.get_edges(&obj), vec![relation("anaphoric", Some("s1_3 s1_4"))]);
    }

    #[test]
    fn test_targetless_relations() {
        let edge = EdgeSchema::reference("relation");
        let mut obj = node();
        obj.anaphora = Some(Anaphora {
            kind: "expletive".into(),
            targets: Some(vec!["ignored".into()]),
        });
        assert_eq!(edge.get_edges(&obj), vec![relation("expletive", None)]);
    }

    #[test]
    fn test_split_antecedent_only_on_split_edge() {
        let reference = EdgeSchema::reference("relation");
        let split = EdgeSchema::split_reference("splitRelation");
        let mut obj = node();
        split
            .set_edges(&mut obj, vec![relation("split_antecedent", Some("a b"))])
            .unwrap();
        assert!(reference.get_edges(&obj).is_empty());
        assert_eq!(split.get_edges(&obj), vec![relation("split_antecedent", Some("a b"))]);
    }

    #[test]
    fn test_reference_rejects_two_relations() {
        let edge = EdgeSchema::reference("relation");
        let mut obj = node();
        edge.push_edge(&mut obj, relation("anaphoric", Some("x"))).unwrap();
        let err = edge
            .push_edge(&mut obj, relation("cataphoric", Some("y")))
            .unwrap_err();
        assert!(matches!(err, ExmlError::Construction { .. }));
    }

    #[test]
    fn test_secondary_edges_accumulate() {
        let edge = EdgeSchema::secondary("secEdge");
        let mut obj = node();
        edge.push_edge(&mut obj, vec![Some(Value::text("refint")), None]).unwrap();
        edge.push_edge(&mut obj, vec![Some(Value::text("refmod")), None]).unwrap();
        assert_eq!(edge.get_edges(&obj).len(), 2);
        assert_eq!(obj.edges(SECEDGE_PROP).len(), 2);
    }

    #[test]
    fn test_describe() {
        let edge = EdgeSchema::generic("link", "links").with_attribute(Attribute::text("label"));
        let mut out = String::new();
        edge.describe(&mut out, &["word".to_string(), "node".to_string()], Charset::Utf8);
        insta::assert_snapshot!(out, @r###"
        <edge name="link" parent="word|node">
          <text-attr name="label"/>
        </edge>
        "###);
    }
}
