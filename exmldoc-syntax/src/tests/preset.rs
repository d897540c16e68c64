use exmldoc::{Attribute, Charset, LayerSchema, ObjectKind};

use crate::{create_doc, make_syntax_doc, DocExtensions, SyntaxConfig};

fn attribute_names(schema: &LayerSchema) -> Vec<&str> {
    schema.attributes().iter().map(|a| a.name.as_str()).collect()
}

#[test]
fn test_default_layers() {
    let doc = make_syntax_doc(&SyntaxConfig::default());
    let names: Vec<&str> = doc.layers().map(|(_, s)| s.name.as_str()).collect();
    assert_eq!(names, vec!["sentence", "node", "text", "ne"]);
    assert_eq!(
        attribute_names(doc.terminal_schema()),
        vec!["form", "pos", "morph", "lemma", "func", "parent", "comment"]
    );
    let node = doc.schema_by_name("node").unwrap();
    assert_eq!(node.locality.as_deref(), Some("sentence"));
    let edges: Vec<&str> = node.edges().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(edges, vec!["secEdge", "relation", "splitRelation"]);
    assert_eq!(
        doc.terminal_schema()
            .attribute_by_name("morph")
            .unwrap()
            .default_value(),
        Some("--")
    );
}

#[test]
fn test_optional_word_attributes() {
    let doc = make_syntax_doc(&SyntaxConfig::minimal().with_wsd(true).with_deps(true));
    assert!(doc.schema_by_name("ne").is_none());
    assert_eq!(
        attribute_names(doc.terminal_schema()),
        vec![
            "form",
            "pos",
            "morph",
            "lemma",
            "func",
            "parent",
            "wsd-lexunits",
            "wsd-comment",
            "dephead",
            "deprel",
            "comment",
        ]
    );
    let dephead = doc.terminal_schema().attribute_by_name("dephead").unwrap();
    assert_eq!(dephead.prop, "syn_parent");
    assert!(dephead.is_object_ref());
}

#[test]
fn test_extensions() {
    let extensions = DocExtensions::default()
        .with_word_attr(Attribute::text("gloss"))
        .with_layer(LayerSchema::generic("topic").with_locality("text"))
        .with_layer_attr("topic", Attribute::text("label"))
        .with_layer_attr("sentence", Attribute::text("speaker"));
    assert!(!extensions.is_empty());
    let doc = create_doc(&SyntaxConfig::default(), extensions);
    assert_eq!(
        attribute_names(doc.terminal_schema()).last(),
        Some(&"gloss")
    );
    let topic = doc.schema_by_name("topic").unwrap();
    assert_eq!(topic.kind, ObjectKind::Generic("topic".to_string()));
    assert_eq!(attribute_names(topic), vec!["label"]);
    assert_eq!(
        attribute_names(doc.schema_by_name("sentence").unwrap()),
        vec!["speaker"]
    );
}

#[test]
fn test_schema_header() {
    let doc = make_syntax_doc(&SyntaxConfig::minimal());
    let mut out = Vec::new();
    doc.describe_schema(&mut out, Charset::Utf8).unwrap();
    insta::assert_snapshot!(String::from_utf8(out).unwrap(), @r###"
    <schema>
     <tnode name="word">
      <text-attr name="form"/>
      <enum-attr name="pos">
      </enum-attr>
      <enum-attr name="morph">
      </enum-attr>
      <text-attr name="lemma"/>
      <enum-attr name="func">
      </enum-attr>
      <node-ref name="parent"/>
      <text-attr name="comment"/>
     </tnode>
     <node name="sentence" locality="text">
     </node>
     <node name="node" locality="sentence">
      <enum-attr name="cat">
      </enum-attr>
      <enum-attr name="func">
      </enum-attr>
      <node-ref name="parent"/>
      <text-attr name="comment"/>
     </node>
     <node name="text">
      <text-attr name="origin"/>
     </node>
    <edge name="secEdge" parent="word|node">
      <enum-attr name="cat">
      </enum-attr>
      <node-ref name="parent"/>
    </edge>
    <edge name="relation" parent="word|node">
      <enum-attr name="type">
      </enum-attr>
      <node-ref name="target"/>
    </edge>
    <edge name="splitRelation" parent="word|node">
      <enum-attr name="type">
      </enum-attr>
      <text-attr name="target"/>
    </edge>
    </schema>
    "###);
}
