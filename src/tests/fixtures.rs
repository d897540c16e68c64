//! Shared schemas, sample input and comparison helpers.

use std::collections::BTreeMap;

use crate::{
    Attribute, Document, EdgeSchema, LayerSchema, ObjectKind, ReadOptions, Restriction,
    XmlCorpusReader, Chunk,
};

/// Word, text, sentence and node layers with defaults on `morph` and `lemma`.
pub(super) fn syntax_schema() -> Document {
    let terminal = LayerSchema::terminal("word")
        .with_attribute(Attribute::enumeration("pos").with_prop("cat"))
        .with_attribute(Attribute::enumeration("morph").with_default("--"))
        .with_attribute(Attribute::text("lemma").with_default("--"))
        .with_attribute(Attribute::enumeration("func").with_prop("edge_label"))
        .with_attribute(
            Attribute::object_ref("parent")
                .restricted(Restriction::Up)
                .targeting(&["node"]),
        )
        .with_edge(EdgeSchema::secondary("secEdge"));
    let text = LayerSchema::markable("text", ObjectKind::Text)
        .with_attribute(Attribute::text("origin"));
    let sentence = LayerSchema::markable("sentence", ObjectKind::Sentence).with_locality("text");
    let node = LayerSchema::markable("node", ObjectKind::Node)
        .with_locality("sentence")
        .with_attribute(Attribute::enumeration("cat"))
        .with_attribute(Attribute::enumeration("func").with_prop("edge_label"))
        .with_attribute(
            Attribute::object_ref("parent")
                .restricted(Restriction::Up)
                .targeting(&["node"]),
        )
        .with_edge(EdgeSchema::secondary("secEdge"))
        .with_edge(EdgeSchema::reference("relation"))
        .with_init("cat");
    Document::new(terminal, vec![text, sentence, node])
}

/// One text of three sentences (5, 6 and 6 tokens) grouped into two topics.
/// The `topic` layer is only declared in the header.
pub(super) const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<exml-doc>
<schema>
 <tnode name="word">
  <text-attr name="form"/>
  <enum-attr name="pos"/>
  <enum-attr name="morph"/>
  <text-attr name="lemma"/>
  <enum-attr name="func"/>
  <node-ref name="parent"/>
 </tnode>
 <node name="text">
  <text-attr name="origin"/>
 </node>
 <node name="topic" locality="text">
  <text-attr name="label"/>
 </node>
 <node name="sentence" locality="text">
 </node>
 <node name="node" locality="sentence">
  <enum-attr name="cat"/>
  <enum-attr name="func"/>
  <node-ref name="parent"/>
 </node>
<edge name="secEdge" parent="word|node">
  <enum-attr name="cat"/>
  <node-ref name="parent"/>
</edge>
<edge name="relation" parent="node">
  <enum-attr name="type"/>
  <node-ref name="target"/>
</edge>
</schema>
<body serialization="inline">
<text xml:id="t1" origin="sample">
 <topic xml:id="topic_1" label="arrival">
  <sentence xml:id="s1">
   <node xml:id="s1_503" cat="SIMPX">
    <node xml:id="s1_500" cat="NX" func="ON" parent="s1_503">
     <word xml:id="s1_1" form="Peter" pos="NE" morph="nsm" lemma="Peter" func="HD" parent="s1_500"/>
    </node>
    <word xml:id="s1_2" form="kommt" pos="VVFIN" morph="3sis" lemma="kommen" func="HD" parent="s1_503"/>
    <word xml:id="s1_3" form="heute" pos="ADV" func="V-MOD" parent="s1_503"/>
    <node xml:id="s1_501" cat="PX" func="V-MOD" parent="s1_503">
     <word xml:id="s1_4" form="nach" pos="APPR" lemma="nach" func="HD" parent="s1_501"/>
     <word xml:id="s1_5" form="Hause" pos="NN" morph="dsn" lemma="Haus" func="HD" parent="s1_501"/>
    </node>
   </node>
  </sentence>
  <sentence xml:id="s2">
   <node xml:id="s2_502" cat="SIMPX">
    <node xml:id="s2_500" cat="NX" func="ON" parent="s2_502">
     <relation type="anaphoric" target="s1_500"/>
     <word xml:id="s2_1" form="Er" pos="PPER" morph="nsm3" lemma="er" func="HD" parent="s2_500"/>
    </node>
    <word xml:id="s2_2" form="hat" pos="VAFIN" morph="3sis" lemma="haben" func="HD" parent="s2_502"/>
    <node xml:id="s2_501" cat="NX" func="OA" parent="s2_502">
     <word xml:id="s2_3" form="das" pos="ART" morph="asn" lemma="der" func="-" parent="s2_501"/>
     <word xml:id="s2_4" form="Haus" pos="NN" morph="asn" lemma="Haus" func="HD" parent="s2_501"/>
    </node>
    <word xml:id="s2_5" form="gekauft" pos="VVPP" lemma="kaufen" func="OV" parent="s2_502"/>
   </node>
   <word xml:id="s2_6" form="." pos="$."/>
  </sentence>
 </topic>
 <topic xml:id="topic_2" label="joy">
  <sentence xml:id="s3">
   <node xml:id="s3_502" cat="SIMPX">
    <node xml:id="s3_500" cat="NX" func="ON" parent="s3_502">
     <word xml:id="s3_1" form="Maria" pos="NE" morph="nsf" lemma="Maria" func="HD" parent="s3_500"/>
    </node>
    <word xml:id="s3_2" form="freut" pos="VVFIN" morph="3sis" lemma="freuen" func="HD" parent="s3_502"/>
    <word xml:id="s3_3" form="sich" pos="PRF" morph="a*3" lemma="sich" func="OA" parent="s3_502">
     <secEdge cat="refvc" parent="s3_501"/>
    </word>
    <node xml:id="s3_501" cat="ADVX" func="MOD" parent="s3_502">
     <word xml:id="s3_4" form="sehr" pos="ADV" lemma="sehr" func="HD" parent="s3_501"/>
    </node>
    <word xml:id="s3_5" form="darüber" pos="PROAV" lemma="darüber" func="OP" parent="s3_502"/>
   </node>
   <word xml:id="s3_6" form="." pos="$."/>
  </sentence>
 </topic>
</text>
</body>
</exml-doc>
"#;

/// Read every chunk of `input` into `doc`.
pub(super) fn read_all(doc: &mut Document, input: &str, options: ReadOptions) {
    let mut reader = XmlCorpusReader::new(input.as_bytes(), options);
    while let Chunk::Range { .. } = reader.next_chunk(doc).unwrap() {}
}

/// Layer, span and wire attributes of every object, keyed by ID.
pub(super) fn fingerprint(doc: &Document) -> BTreeMap<String, String> {
    let mut result = BTreeMap::new();
    let mut objects: Vec<_> = (0..doc.len())
        .filter_map(|pos| doc.word_object(pos))
        .map(|key| (crate::LayerId::TERMINAL, key))
        .collect();
    objects.extend(doc.objects_in(0..doc.len()));
    for (layer, key) in objects {
        let ser = doc.schema(layer).serialize(key, doc, true).unwrap();
        let id = doc.id_of(key).unwrap().to_string();
        result.insert(
            id,
            format!("{} {:?} {:?} {:?}", ser.layer, ser.span.bounds(), ser.attrs, ser.edges),
        );
    }
    result
}

/// Number of markables per layer.
pub(super) fn layer_counts(doc: &Document) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for (layer, _) in doc.objects_in(0..doc.len()) {
        *counts.entry(doc.schema(layer).name.clone()).or_insert(0) += 1;
    }
    counts
}
