use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use exmldoc::{Charset, Value};

use crate::{load, load_with, noderef, DocExtensions, SyntaxConfig, SyntaxError};

fn fixture(name: &str) -> BufReader<File> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(name);
    BufReader::new(File::open(path).unwrap())
}

#[test]
fn test_load_sample() {
    let (mut doc, trees) = load(fixture("sample.exml.xml"), Charset::Unicode).unwrap();
    assert_eq!(doc.len(), 17);
    assert_eq!(trees.len(), 3);
    assert_eq!(doc.objects_by_layer("node", 0..17).len(), 9);
    let warnings = doc.take_warnings();
    assert!(warnings.contains(&"undeclared markable layer: topic".to_string()));
}

#[test]
fn test_load_with_dependencies() {
    let (doc, trees) = load(fixture("entities.exml.xml"), Charset::Unicode).unwrap();
    let anna = doc.object_by_id("s1_1").unwrap();
    assert_eq!(anna.reference("syn_parent"), doc.key_for_id("s1_2"));
    assert_eq!(anna.text("syn_label"), Some("SUBJ"));
    assert!(doc.warnings().is_empty());

    let entities: Vec<_> = doc
        .objects_by_layer("ne", 0..doc.len())
        .into_iter()
        .filter_map(|k| doc.object(k))
        .map(|o| o.text("kind").unwrap_or_default().to_string())
        .collect();
    assert_eq!(entities, vec!["PER", "GPE"]);

    // no nodes: every word is a root
    assert_eq!(trees[0].roots().count(), 5);
}

#[test]
fn test_load_without_dependencies() {
    let (mut doc, _) = load_with(
        fixture("entities.exml.xml"),
        Charset::Ascii,
        &SyntaxConfig::default(),
        DocExtensions::default(),
    )
    .unwrap();
    assert_eq!(doc.words()[3], "Tubingen");
    let anna = doc.object_by_id("s1_1").unwrap();
    let head = doc.key_for_id("s1_2").unwrap();
    assert_eq!(anna.attr("_auto_dephead"), Some(&Value::Ref(head)));
    let warnings = doc.take_warnings();
    assert!(warnings.contains(&"undeclared node reference: word.dephead".to_string()));
    assert!(warnings.contains(&"undeclared enum attribute: word.deprel".to_string()));
}

#[test]
fn test_noderef() {
    assert_eq!(noderef("3:0").unwrap(), "s3_1");
    assert_eq!(noderef("3:499").unwrap(), "s3_500");
    assert_eq!(noderef("3:502").unwrap(), "s3_502");
    assert_eq!(noderef("12:root").unwrap(), "s12_root");
    assert!(matches!(noderef("3"), Err(SyntaxError::NodeRef(_))));
    assert!(matches!(noderef("3:1:2"), Err(SyntaxError::NodeRef(_))));
}
