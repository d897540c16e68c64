//! The `<schema>` header.
//!
//! The header is small, so it is collected into an [`Element`] tree first and
//! then merged into the document's schemas. Declarations the document does
//! not know are added as generic layers, text/enum/reference attributes with
//! an `_auto_` property, or generic edges, each with a diagnostic.

use crate::attribute::Attribute;
use crate::document::{Document, LayerId};
use crate::edge::EdgeSchema;
use crate::schema::{lookup, LayerSchema, WireAttrs};

/// An element of the schema header with its attributes and children.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Element {
    pub(crate) name: String,
    pub(crate) attrs: WireAttrs,
    pub(crate) children: Vec<Element>,
}

impl Element {
    pub(crate) fn new(name: String, attrs: WireAttrs) -> Self {
        Self {
            name,
            attrs,
            children: Vec::new(),
        }
    }

    fn attr(&self, name: &str) -> Option<&str> {
        lookup(&self.attrs, name)
    }
}

/// Owner of a declared attribute list: a layer or one of its edge types.
enum Host {
    Layer(LayerId),
    Edge(LayerId, String),
}

impl Host {
    fn label(&self, doc: &Document) -> String {
        match self {
            Host::Layer(layer) => doc.schema(*layer).name.clone(),
            Host::Edge(layer, edge) => format!("{}.{}", doc.schema(*layer).name, edge),
        }
    }

    fn attribute_mut<'d>(&self, doc: &'d mut Document, name: &str) -> Option<&'d mut Attribute> {
        match self {
            Host::Layer(layer) => doc.schema_mut(*layer).attribute_by_name_mut(name),
            Host::Edge(layer, edge) => doc
                .schema_mut(*layer)
                .edge_by_name_mut(edge)?
                .attribute_by_name_mut(name),
        }
    }

    fn add(&self, doc: &mut Document, att: Attribute) {
        match self {
            Host::Layer(layer) => doc.schema_mut(*layer).add_attribute(att),
            Host::Edge(layer, edge) => {
                if let Some(edge) = doc.schema_mut(*layer).edge_by_name_mut(edge) {
                    edge.add_attribute(att);
                }
            }
        }
    }
}

/// Merge a parsed `<schema>` element into `doc`.
pub(crate) fn process_schema(doc: &mut Document, schema: &Element) {
    for child in &schema.children {
        match child.name.as_str() {
            "tnode" => {
                if let Some(name) = child.attr("name") {
                    if name != doc.terminal_schema().name {
                        doc.warn(format!(
                            "terminal layer '{}' declared as '{}'",
                            doc.terminal_schema().name,
                            name
                        ));
                    }
                }
                process_attributes(doc, &Host::Layer(LayerId::TERMINAL), child);
            }
            "node" => {
                let Some(name) = child.attr("name") else {
                    doc.warn("node declaration without name");
                    continue;
                };
                let layer = match doc.layer_by_name(name) {
                    Some(layer) => layer,
                    None => {
                        doc.warn(format!("undeclared markable layer: {}", name));
                        let mut schema = LayerSchema::generic(name);
                        if let Some(locality) = child.attr("locality") {
                            schema = schema.with_locality(locality);
                        }
                        doc.add_schema(schema)
                    }
                };
                process_attributes(doc, &Host::Layer(layer), child);
            }
            "edge" => {
                let (Some(name), Some(parents)) = (child.attr("name"), child.attr("parent")) else {
                    doc.warn("edge declaration without name or parent");
                    continue;
                };
                for parent in parents.split('|') {
                    let Some(layer) = doc.layer_by_name(parent) else {
                        doc.warn(format!("edge {} declared for unknown layer {}", name, parent));
                        continue;
                    };
                    if doc.schema(layer).edge_by_name(name).is_none() {
                        doc.warn(format!("undeclared edge schema: {}.{}", parent, name));
                        doc.schema_mut(layer)
                            .add_edge(EdgeSchema::generic(name, &format!("auto_{}", name)));
                    }
                    process_attributes(doc, &Host::Edge(layer, name.to_string()), child);
                }
            }
            other => doc.warn(format!("unknown element in schema: <{}>", other)),
        }
    }
}

fn process_attributes(doc: &mut Document, host: &Host, elem: &Element) {
    for decl in &elem.children {
        let make: fn(&str) -> Attribute = match decl.name.as_str() {
            "text-attr" => Attribute::text,
            "enum-attr" => Attribute::enumeration,
            "node-ref" => Attribute::object_ref,
            other => {
                let label = host.label(doc);
                doc.warn(format!("unknown element in schema of {}: <{}>", label, other));
                continue;
            }
        };
        let Some(name) = decl.attr("name") else {
            let label = host.label(doc);
            doc.warn(format!("<{}> without name in schema of {}", decl.name, label));
            continue;
        };
        if host.attribute_mut(doc, name).is_none() {
            let label = host.label(doc);
            let kind = match decl.name.as_str() {
                "enum-attr" => "enum attribute",
                "node-ref" => "node reference",
                _ => "text attribute",
            };
            doc.warn(format!("undeclared {}: {}.{}", kind, label, name));
            host.add(doc, make(name).with_prop(&format!("_auto_{}", name)));
        }
        if let Some(att) = host.attribute_mut(doc, name) {
            for val in decl.children.iter().filter(|c| c.name == "val") {
                if let Some(value) = val.attr("name") {
                    att.add_item(value, val.attr("description"));
                }
            }
        }
    }
}
