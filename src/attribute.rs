//! Attribute kinds: how one object property maps to a wire attribute.
//!
//! Every kind supports the same capability set: map a stored value to its
//! wire text, unmap wire text back into a value, contribute up/down ordering
//! edges, and describe itself in the schema header.

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::alphabet::Alphabet;
use crate::document::Document;
use crate::encoding::Charset;
use crate::error::{ExmlError, ExmlResult};
use crate::object::Value;

/// Direction of the ordering constraint contributed by a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restriction {
    None,
    /// The referenced object opens before the referring one (e.g. `parent`).
    Up,
    /// The referring object opens before the referenced one.
    Down,
}

impl Restriction {
    pub fn from_name(name: Option<&str>) -> Self {
        match name {
            Some("up") => Restriction::Up,
            Some("down") => Restriction::Down,
            _ => Restriction::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeKind {
    /// Free text. A value equal to `default` is not written.
    Text { default: Option<String> },
    /// Text from an enumeration; every value seen is listed in the header.
    Enum {
        default: Option<String>,
        values: Alphabet<String>,
        descriptions: HashMap<String, String>,
    },
    /// Reference to another object in the same document.
    ObjectRef {
        restriction: Restriction,
        targets: Vec<String>,
    },
    /// Opaque ID string; resolving it is left to the application.
    IdRef {
        restriction: Restriction,
        targets: Vec<String>,
    },
}

/// One attribute of a layer or edge type.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Name on the wire.
    pub name: String,
    /// Name of the property on the object.
    pub prop: String,
    pub kind: AttributeKind,
}

impl Attribute {
    fn with_kind(name: &str, kind: AttributeKind) -> Self {
        Self {
            name: name.to_string(),
            prop: name.to_string(),
            kind,
        }
    }

    pub fn text(name: &str) -> Self {
        Self::with_kind(name, AttributeKind::Text { default: None })
    }

    pub fn enumeration(name: &str) -> Self {
        Self::with_kind(
            name,
            AttributeKind::Enum {
                default: None,
                values: Alphabet::new(),
                descriptions: HashMap::new(),
            },
        )
    }

    pub fn object_ref(name: &str) -> Self {
        Self::with_kind(
            name,
            AttributeKind::ObjectRef {
                restriction: Restriction::None,
                targets: Vec::new(),
            },
        )
    }

    pub fn id_ref(name: &str) -> Self {
        Self::with_kind(
            name,
            AttributeKind::IdRef {
                restriction: Restriction::None,
                targets: Vec::new(),
            },
        )
    }

    /// Store the value under a property name different from the wire name.
    pub fn with_prop(mut self, prop: &str) -> Self {
        self.prop = prop.to_string();
        self
    }

    /// Set the default value of a text or enum attribute.
    pub fn with_default(mut self, value: &str) -> Self {
        match &mut self.kind {
            AttributeKind::Text { default } | AttributeKind::Enum { default, .. } => {
                *default = Some(value.to_string())
            }
            AttributeKind::ObjectRef { .. } | AttributeKind::IdRef { .. } => {}
        }
        self
    }

    /// Set the up/down restriction of a reference attribute.
    pub fn restricted(mut self, to: Restriction) -> Self {
        match &mut self.kind {
            AttributeKind::ObjectRef { restriction, .. }
            | AttributeKind::IdRef { restriction, .. } => *restriction = to,
            AttributeKind::Text { .. } | AttributeKind::Enum { .. } => {}
        }
        self
    }

    /// Layers a reference attribute may point to (documentation only).
    pub fn targeting(mut self, layers: &[&str]) -> Self {
        match &mut self.kind {
            AttributeKind::ObjectRef { targets, .. } | AttributeKind::IdRef { targets, .. } => {
                *targets = layers.iter().map(|s| s.to_string()).collect()
            }
            AttributeKind::Text { .. } | AttributeKind::Enum { .. } => {}
        }
        self
    }

    pub fn default_value(&self) -> Option<&str> {
        match &self.kind {
            AttributeKind::Text { default } | AttributeKind::Enum { default, .. } => {
                default.as_deref()
            }
            AttributeKind::ObjectRef { .. } | AttributeKind::IdRef { .. } => None,
        }
    }

    /// Short kind tag: `STRING`, `ENUM` or `REF`.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            AttributeKind::Text { .. } => "STRING",
            AttributeKind::Enum { .. } => "ENUM",
            AttributeKind::ObjectRef { .. } | AttributeKind::IdRef { .. } => "REF",
        }
    }

    pub fn is_object_ref(&self) -> bool {
        matches!(self.kind, AttributeKind::ObjectRef { .. })
    }

    /// Record an enum value (and optionally its description).
    ///
    /// Returns false for non-enum attributes.
    pub fn add_item(&mut self, value: &str, description: Option<&str>) -> bool {
        match &mut self.kind {
            AttributeKind::Enum {
                values,
                descriptions,
                ..
            } => {
                values.index_of_str(value);
                if let Some(descr) = description {
                    descriptions.insert(value.to_string(), descr.to_string());
                }
                true
            }
            _ => false,
        }
    }

    /// Enum values seen so far, in first-seen order.
    pub fn enum_values(&self) -> Vec<&str> {
        match &self.kind {
            AttributeKind::Enum { values, .. } => values.iter().map(|s| s.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    /// Wire text for `value`, or `None` if it should not be written.
    pub fn map_value(&self, value: &Value, doc: &Document) -> ExmlResult<Option<String>> {
        match (&self.kind, value) {
            (AttributeKind::Text { default }, Value::Text(s))
            | (AttributeKind::Enum { default, .. }, Value::Text(s)) => {
                if default.as_deref() == Some(s.as_str()) {
                    Ok(None)
                } else {
                    Ok(Some(s.clone()))
                }
            }
            (AttributeKind::IdRef { .. }, Value::Text(s)) => Ok(Some(s.clone())),
            (_, Value::Ref(key)) => match doc.id_of(*key) {
                Some(id) => Ok(Some(id.to_string())),
                None => Err(ExmlError::unresolved(
                    &key.to_string(),
                    format!("attribute '{}'", self.name),
                )),
            },
            (AttributeKind::ObjectRef { .. }, Value::Text(s)) => Err(ExmlError::integrity(
                format!("attribute '{}' holds text '{}' instead of a reference", self.name, s),
            )),
        }
    }

    /// Value for wire text `raw`.
    ///
    /// Object references are resolved through the document's ID table, so the
    /// referenced object must already exist.
    pub fn unmap_value(&self, raw: &str, doc: &Document, charset: Charset) -> ExmlResult<Value> {
        match &self.kind {
            AttributeKind::Text { .. } | AttributeKind::Enum { .. } => {
                Ok(Value::Text(charset.decode(raw).into_owned()))
            }
            AttributeKind::ObjectRef { .. } => doc
                .key_for_id(raw)
                .map(Value::Ref)
                .ok_or_else(|| ExmlError::unresolved(raw, format!("attribute '{}'", self.name))),
            AttributeKind::IdRef { .. } => Ok(Value::Text(raw.to_string())),
        }
    }

    /// Ordering edges contributed by this attribute's value on `obj`.
    pub fn updown(
        &self,
        obj_id: &str,
        value: Option<&Value>,
        doc: &Document,
        out: &mut Vec<(String, String)>,
    ) -> ExmlResult<()> {
        let restriction = match &self.kind {
            AttributeKind::ObjectRef { restriction, .. }
            | AttributeKind::IdRef { restriction, .. } => *restriction,
            _ => return Ok(()),
        };
        if restriction == Restriction::None {
            return Ok(());
        }
        let other = match value {
            Some(Value::Ref(key)) => match doc.id_of(*key) {
                Some(id) => id.to_string(),
                None => {
                    return Err(ExmlError::unresolved(
                        &key.to_string(),
                        format!("ordering via '{}'", self.name),
                    ))
                }
            },
            Some(Value::Text(id)) => id.clone(),
            None => return Ok(()),
        };
        match restriction {
            Restriction::Down => out.push((obj_id.to_string(), other)),
            Restriction::Up => out.push((other, obj_id.to_string())),
            Restriction::None => {}
        }
        Ok(())
    }

    /// Write this attribute's schema header entry.
    pub fn describe(&self, out: &mut String, charset: Charset) {
        let name = charset.escape_attr(&self.name);
        match &self.kind {
            AttributeKind::Text { .. } => {
                let _ = writeln!(out, "  <text-attr name=\"{}\"/>", name);
            }
            AttributeKind::Enum {
                values,
                descriptions,
                ..
            } => {
                let _ = writeln!(out, "  <enum-attr name=\"{}\">", name);
                for val in values.iter() {
                    let _ = write!(out, "   <val name=\"{}\"", charset.escape_attr(val));
                    if let Some(descr) = descriptions.get(val) {
                        let _ = write!(out, " description=\"{}\"", charset.escape_attr(descr));
                    }
                    out.push_str("/>\n");
                }
                out.push_str("  </enum-attr>\n");
            }
            AttributeKind::ObjectRef { .. } | AttributeKind::IdRef { .. } => {
                let _ = writeln!(out, "  <node-ref name=\"{}\"/>", name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_items_keep_first_seen_order() {
        let mut att = Attribute::enumeration("cat");
        att.add_item("NX", None);
        att.add_item("VXFIN", Some("finite verb chunk"));
        att.add_item("NX", None);
        assert_eq!(att.enum_values(), vec!["NX", "VXFIN"]);
        assert_eq!(att.kind_name(), "ENUM");
    }

    #[test]
    fn test_add_item_on_text_is_rejected() {
        let mut att = Attribute::text("lemma");
        assert!(!att.add_item("x", None));
    }

    #[test]
    fn test_describe_enum() {
        let mut att = Attribute::enumeration("type");
        att.add_item("PER", Some("person"));
        att.add_item("LOC", None);
        let mut out = String::new();
        att.describe(&mut out, Charset::Utf8);
        assert_eq!(
            out,
            "  <enum-attr name=\"type\">\n   <val name=\"PER\" description=\"person\"/>\n   <val name=\"LOC\"/>\n  </enum-attr>\n"
        );
    }

    #[test]
    fn test_builder_settings() {
        let att = Attribute::object_ref("parent")
            .restricted(Restriction::Up)
            .targeting(&["node"]);
        assert!(att.is_object_ref());
        assert_eq!(att.default_value(), None);

        let morph = Attribute::enumeration("morph").with_default("--");
        assert_eq!(morph.default_value(), Some("--"));

        let func = Attribute::enumeration("func").with_prop("edge_label");
        assert_eq!(func.name, "func");
        assert_eq!(func.prop, "edge_label");
    }

    #[test]
    fn test_restriction_names() {
        assert_eq!(Restriction::from_name(Some("up")), Restriction::Up);
        assert_eq!(Restriction::from_name(Some("down")), Restriction::Down);
        assert_eq!(Restriction::from_name(Some("none")), Restriction::None);
        assert_eq!(Restriction::from_name(None), Restriction::None);
    }
}
