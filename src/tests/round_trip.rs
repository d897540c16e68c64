use std::fs::File;
use std::io::{BufReader, Write};

use super::fixtures::{fingerprint, layer_counts, read_all, syntax_schema, SAMPLE};
use crate::{
    write_corpus_json, write_corpus_xml, Attribute, Chunk, Document, InlineEvent,
    JsonCorpusReader, LayerSchema, ReadOptions, Value, WriteOptions, XmlCorpusReader,
};

fn sample_doc() -> crate::Document {
    let mut doc = syntax_schema();
    read_all(&mut doc, SAMPLE, ReadOptions::default());
    doc.take_warnings();
    doc
}

#[test]
fn test_save_and_load_file() {
    let mut doc = sample_doc();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    doc.save(&mut file, &WriteOptions::default()).unwrap();
    file.flush().unwrap();

    let input = BufReader::new(File::open(file.path()).unwrap());
    let mut copy = syntax_schema();
    let mut reader = XmlCorpusReader::new(input, ReadOptions::strict());
    assert_eq!(
        reader.next_chunk(&mut copy).unwrap(),
        Chunk::Range { start: 0, end: 17 }
    );
    assert_eq!(reader.next_chunk(&mut copy).unwrap(), Chunk::EndOfInput);
    assert_eq!(fingerprint(&copy), fingerprint(&doc));
}

#[test]
fn test_json_lines_round_trip() {
    let expected = fingerprint(&sample_doc());

    let mut source = XmlCorpusReader::new(SAMPLE.as_bytes(), ReadOptions::default());
    let mut drained = syntax_schema();
    let mut lines = Vec::new();
    assert_eq!(
        write_corpus_json(&mut drained, &mut source, &mut lines).unwrap(),
        1
    );
    assert!(drained.objects_in(0..drained.len()).is_empty());
    assert!(drained.word_object(0).is_none());

    let mut copy = syntax_schema();
    let mut reader = JsonCorpusReader::new(lines.as_slice());
    assert_eq!(
        reader.next_chunk(&mut copy).unwrap(),
        Chunk::Range { start: 0, end: 17 }
    );
    assert_eq!(reader.next_chunk(&mut copy).unwrap(), Chunk::EndOfInput);
    assert_eq!(copy.words(), sample_doc().words());
    assert_eq!(layer_counts(&copy)["topic"], 2);
    assert_eq!(fingerprint(&copy), expected);
}

#[test]
fn test_corpus_copy_through_xml() {
    let expected = fingerprint(&sample_doc());

    let mut source = XmlCorpusReader::new(SAMPLE.as_bytes(), ReadOptions::default());
    let mut drained = syntax_schema();
    let mut out = Vec::new();
    let tokens = write_corpus_xml(&mut drained, &mut source, &mut out, &WriteOptions::default())
        .unwrap();
    assert_eq!(tokens, 17);
    let copied = String::from_utf8(out).unwrap();
    assert!(copied.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<exml-doc>\n<schema>\n"));
    assert!(copied.ends_with("</body>\n</exml-doc>\n"));

    let mut copy = syntax_schema();
    read_all(&mut copy, &copied, ReadOptions::strict());
    assert_eq!(fingerprint(&copy), expected);
}

#[test]
fn test_inline_events_per_chunk() {
    let mut doc = syntax_schema();
    let mut reader = XmlCorpusReader::new(SAMPLE.as_bytes(), ReadOptions::default());
    let mut seen = Vec::new();
    reader
        .inline_events(&mut doc, Some(&["sentence"][..]), true, |doc, events| {
            let mut sentence = Vec::new();
            for event in events {
                match event {
                    InlineEvent::Start { .. } => sentence.clear(),
                    InlineEvent::Terminal(key) => {
                        if let Some(obj) = doc.object(key) {
                            sentence.push(obj.form().to_string());
                        }
                    }
                    InlineEvent::End { .. } => seen.push(sentence.join(" ")),
                }
            }
            Ok(())
        })
        .unwrap();
    assert_eq!(
        seen,
        vec![
            "Peter kommt heute nach Hause",
            "Er hat das Haus gekauft .",
            "Maria freut sich sehr darüber .",
        ]
    );
    assert!(doc.word_object(0).is_none());
}

fn linked_schema() -> Document {
    let mention = LayerSchema::generic("mention")
        .with_attribute(Attribute::id_ref("entity"))
        .with_attribute(Attribute::id_ref("antecedent").targeting(&["mention"]));
    Document::new(LayerSchema::terminal("word"), vec![mention])
}

const LINKED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<exml-doc>
<schema>
 <tnode name="word">
  <text-attr name="form"/>
 </tnode>
 <node name="mention">
  <node-ref name="entity"/>
  <node-ref name="antecedent"/>
 </node>
</schema>
<body serialization="inline">
<mention xml:id="m1" entity="wikidata:Q64">
 <word xml:id="w1" form="Berlin"/>
</mention>
<word xml:id="w2" form="ist"/>
<mention xml:id="m2" entity="wikidata:Q64" antecedent="m1">
 <word xml:id="w3" form="es"/>
</mention>
</body>
</exml-doc>
"#;

#[test]
fn test_id_ref_attributes_round_trip() {
    let mut doc = linked_schema();
    read_all(&mut doc, LINKED, ReadOptions::strict());
    assert!(doc.warnings().is_empty());
    let m2 = doc.object_by_id("m2").unwrap();
    assert_eq!(m2.attr("entity"), Some(&Value::text("wikidata:Q64")));
    assert_eq!(m2.attr("antecedent"), Some(&Value::text("m1")));

    let mut out = Vec::new();
    doc.save(&mut out, &WriteOptions::default()).unwrap();
    let saved = String::from_utf8(out).unwrap();
    assert!(saved.contains(r#"<mention xml:id="m2" entity="wikidata:Q64" antecedent="m1">"#));
    let mut copy = linked_schema();
    read_all(&mut copy, &saved, ReadOptions::strict());
    assert_eq!(fingerprint(&copy), fingerprint(&doc));

    let chunk = doc.json_chunk(0..3).unwrap();
    assert_eq!(chunk["mention"][1]["antecedent"], "m1");
    let mut from_json = linked_schema();
    assert_eq!(from_json.json_insert(&chunk).unwrap(), 0..3);
    assert_eq!(
        from_json.object_by_id("m2").unwrap().attr("antecedent"),
        Some(&Value::text("m1"))
    );
    assert_eq!(fingerprint(&from_json), fingerprint(&doc));
}
