use super::fixtures::{fingerprint, layer_counts, read_all, syntax_schema, SAMPLE};
use crate::{Chunk, ReadOptions, Span, Value, WriteOptions, XmlCorpusReader};

#[test]
fn test_sample_layers_and_counts() {
    let mut doc = syntax_schema();
    let mut reader = XmlCorpusReader::new(SAMPLE.as_bytes(), ReadOptions::default());
    assert_eq!(
        reader.next_chunk(&mut doc).unwrap(),
        Chunk::Range { start: 0, end: 17 }
    );
    assert_eq!(reader.next_chunk(&mut doc).unwrap(), Chunk::EndOfInput);

    assert_eq!(doc.len(), 17);
    let counts = layer_counts(&doc);
    assert_eq!(counts["text"], 1);
    assert_eq!(counts["topic"], 2);
    assert_eq!(counts["sentence"], 3);
    assert_eq!(counts["node"], 9);

    let sentences: Vec<(usize, usize)> = doc
        .objects_by_layer("sentence", 0..17)
        .into_iter()
        .map(|k| {
            let span = &doc.object(k).unwrap().span;
            (span.start(), span.end())
        })
        .collect();
    assert_eq!(sentences, vec![(0, 5), (5, 11), (11, 17)]);
    assert_eq!(doc.words()[15], "darüber");
}

#[test]
fn test_header_only_layer_is_generic() {
    let mut doc = syntax_schema();
    read_all(&mut doc, SAMPLE, ReadOptions::default());
    let warnings = doc.take_warnings();
    assert_eq!(
        warnings,
        vec![
            "undeclared markable layer: topic".to_string(),
            "undeclared text attribute: topic.label".to_string(),
        ]
    );
    let topic = doc.schema_by_name("topic").unwrap();
    assert_eq!(topic.locality.as_deref(), Some("text"));
    let first = doc.key_for_id("topic_1").unwrap();
    assert_eq!(doc.object(first).unwrap().text("_auto_label"), Some("arrival"));
    assert_eq!(doc.object(first).unwrap().span, Span::range(0, 11).unwrap());
}

#[test]
fn test_references_and_edges() {
    let mut doc = syntax_schema();
    read_all(&mut doc, SAMPLE, ReadOptions::default());

    let peter = doc.object_by_id("s1_1").unwrap();
    assert_eq!(peter.reference("parent"), doc.key_for_id("s1_500"));
    assert_eq!(peter.text("edge_label"), Some("HD"));
    assert_eq!(peter.text("cat"), Some("NE"));

    let punct = doc.object_by_id("s2_6").unwrap();
    assert_eq!(punct.reference("parent"), None);

    let er = doc.object_by_id("s2_500").unwrap();
    let anaphora = er.anaphora.as_ref().unwrap();
    assert_eq!(anaphora.kind, "anaphoric");
    assert_eq!(anaphora.targets, Some(vec!["s1_500".to_string()]));

    // forward reference to a node opened later in the same sentence
    let sich = doc.object_by_id("s3_3").unwrap();
    let sehr = doc.key_for_id("s3_501").unwrap();
    assert_eq!(
        sich.edges(crate::SECEDGE_PROP),
        &[vec![Some(Value::text("refvc")), Some(Value::Ref(sehr))]]
    );

    let root = doc.object_by_id("s3_502").unwrap();
    assert_eq!(root.span, Span::range(11, 16).unwrap());
    assert_eq!(root.reference("parent"), None);
}

#[test]
fn test_enum_values_are_collected() {
    let mut doc = syntax_schema();
    read_all(&mut doc, SAMPLE, ReadOptions::default());
    let cat = doc.schema_by_name("node").unwrap().attribute_by_name("cat").unwrap();
    assert_eq!(cat.enum_values(), vec!["SIMPX", "NX", "PX", "ADVX"]);
    let sec = doc
        .terminal_schema()
        .edge_by_name("secEdge")
        .unwrap()
        .attribute_by_name("cat")
        .unwrap();
    assert_eq!(sec.enum_values(), vec!["refvc"]);
}

#[test]
fn test_save_and_reread_preserves_objects() {
    let mut doc = syntax_schema();
    read_all(&mut doc, SAMPLE, ReadOptions::default());
    doc.take_warnings();
    let before = fingerprint(&doc);
    assert_eq!(before.len(), 17 + 1 + 2 + 3 + 9);

    let mut out = Vec::new();
    doc.save(&mut out, &WriteOptions::default()).unwrap();
    let saved = String::from_utf8(out).unwrap();
    assert!(saved.contains("<node name=\"topic\" locality=\"text\">"));

    let mut copy = syntax_schema();
    read_all(&mut copy, &saved, ReadOptions::strict());
    assert_eq!(copy.words(), doc.words());
    assert_eq!(layer_counts(&copy), layer_counts(&doc));
    assert_eq!(fingerprint(&copy), before);
}
