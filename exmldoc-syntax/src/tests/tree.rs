use std::path::Path;

use exmldoc::{Charset, Document, ExmlError, Object, ObjectKind, Span, Value};

use crate::{load, make_syntax_doc, SyntaxConfig, SyntaxError, SyntaxTree};

fn sample() -> (Document, Vec<SyntaxTree>) {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/sample.exml.xml");
    let input = std::io::BufReader::new(std::fs::File::open(path).unwrap());
    load(input, Charset::Unicode).unwrap()
}

#[test]
fn test_penn_brackets() {
    let (doc, trees) = sample();
    let penn: Vec<String> = trees.iter().map(|t| t.to_penn(&doc)).collect();
    assert_eq!(
        penn,
        vec![
            "(VROOT (SIMPX (NX (NE Peter)) (VVFIN kommt) (ADV heute) (PX (APPR nach) (NN Hause))))",
            "(VROOT (SIMPX (NX (PPER Er)) (VAFIN hat) (NX (ART das) (NN Haus)) (VVPP gekauft)) ($. .))",
            "(VROOT (SIMPX (NX (NE Maria)) (VVFIN freut) (PRF sich) (ADVX (ADV sehr)) (PROAV darüber)) ($. .))",
        ]
    );
}

#[test]
fn test_relative_positions() {
    let (doc, trees) = sample();
    let second = &trees[1];
    assert_eq!(second.offset, 5);
    assert_eq!(second.terminals().len(), 6);
    assert_eq!(second.nonterminals().len(), 3);

    let object_np = doc.key_for_id("s2_501").unwrap();
    let np = second.nodes().iter().find(|n| n.key == object_np).unwrap();
    assert_eq!((np.start, np.end), (2, 4));
    let children: Vec<usize> = second.children(np).map(|c| c.start).collect();
    assert_eq!(children, vec![2, 3]);

    let roots: Vec<(usize, bool)> = second.roots().map(|n| (n.start, n.terminal)).collect();
    assert_eq!(roots, vec![(0, false), (5, true)]);
    let punct = &second.terminals()[5];
    assert_eq!(punct.parent, None);
    assert_eq!(second.terminals()[1].parent.map(|p| second.nodes()[p].key), doc.key_for_id("s2_502"));
}

#[test]
fn test_childless_node_is_an_error() {
    let mut doc = make_syntax_doc(&SyntaxConfig::minimal());
    for (i, form) in ["Ja", "."].iter().enumerate() {
        doc.append_terminal(Object::terminal(*form).with_id(format!("s1_{}", i + 1)))
            .unwrap();
    }
    let sentence = doc
        .insert_markable(
            Object::markable(ObjectKind::Sentence, Span::range(0, 2).unwrap()).with_id("s1"),
        )
        .unwrap();
    doc.insert_markable(
        Object::markable(ObjectKind::Node, Span::token(0))
            .with_id("s1_500")
            .with_attr("cat", Value::text("NX")),
    )
    .unwrap();

    let err = SyntaxTree::build(&doc, sentence).unwrap_err();
    match err {
        SyntaxError::Document(ExmlError::Integrity { message }) => {
            assert_eq!(message, "node s1_500 (NX) in sentence s1 has no children")
        }
        other => panic!("unexpected error: {}", other),
    }
}
