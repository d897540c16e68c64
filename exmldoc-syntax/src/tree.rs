//! Syntax trees rebuilt from a flat document.
//!
//! A document stores words and `node` markables with `parent` references.
//! [`SyntaxTree`] turns the objects of one sentence back into a tree with
//! child lists and sentence-relative positions.

use std::collections::HashMap;
use std::ops::Range;

use exmldoc::{Document, ExmlError, ObjectKey, ObjectKind};

use crate::errors::SyntaxResult;

/// A terminal or nonterminal of a [`SyntaxTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub key: ObjectKey,
    pub terminal: bool,
    /// First token, relative to the sentence start.
    pub start: usize,
    /// Token after the last one, relative to the sentence start.
    pub end: usize,
    /// Indices into [`SyntaxTree::nodes`], ordered by start.
    pub children: Vec<usize>,
    pub parent: Option<usize>,
}

/// The syntax tree of one sentence.
///
/// Terminals come first in [`nodes`](Self::nodes), one per token, so the
/// terminal at relative position `i` has index `i`.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    pub sentence: ObjectKey,
    /// Absolute position of the first token.
    pub offset: usize,
    nodes: Vec<TreeNode>,
    terminals: usize,
    roots: Vec<usize>,
}

fn penn_escape(value: &str) -> String {
    value.replace('(', "-LRB-").replace(')', "-RRB-")
}

impl SyntaxTree {
    /// Build the tree of the sentence markable `sentence`.
    pub fn build(doc: &Document, sentence: ObjectKey) -> SyntaxResult<Self> {
        let obj = doc.object(sentence).ok_or_else(|| ExmlError::UnresolvedReference {
            id: sentence.to_string(),
            context: "syntax tree".to_string(),
        })?;
        let offset = obj.span.start();
        let stop = obj.span.end();

        let mut nodes = Vec::new();
        for pos in offset..stop {
            let key = doc.word_object(pos).ok_or_else(|| ExmlError::Integrity {
                message: format!("no word object at position {}", pos),
            })?;
            nodes.push(TreeNode {
                key,
                terminal: true,
                start: pos - offset,
                end: pos - offset + 1,
                children: Vec::new(),
                parent: None,
            });
        }
        let terminals = nodes.len();
        for key in doc.objects_by_kind(&ObjectKind::Node, offset..stop) {
            let Some(node) = doc.object(key) else {
                continue;
            };
            nodes.push(TreeNode {
                key,
                terminal: false,
                start: node.span.start() - offset,
                end: node.span.end() - offset,
                children: Vec::new(),
                parent: None,
            });
        }

        let index: HashMap<ObjectKey, usize> =
            nodes.iter().enumerate().map(|(i, n)| (n.key, i)).collect();
        let mut roots = Vec::new();
        for i in 0..nodes.len() {
            let parent = doc
                .object(nodes[i].key)
                .and_then(|o| o.reference("parent"));
            match parent.and_then(|p| index.get(&p)) {
                Some(&p) => {
                    nodes[p].children.push(i);
                    nodes[i].parent = Some(p);
                }
                None => {
                    if parent.is_some() {
                        log::warn!(
                            "parent of {} lies outside sentence {}",
                            doc.id_of(nodes[i].key).unwrap_or("?"),
                            doc.id_of(sentence).unwrap_or("?")
                        );
                    }
                    roots.push(i);
                }
            }
        }
        roots.sort_by_key(|&i| nodes[i].start);

        for i in terminals..nodes.len() {
            if nodes[i].children.is_empty() {
                let node = doc.object(nodes[i].key);
                return Err(ExmlError::Integrity {
                    message: format!(
                        "node {} ({}) in sentence {} has no children",
                        doc.id_of(nodes[i].key).unwrap_or("?"),
                        node.and_then(|n| n.text("cat")).unwrap_or("?"),
                        doc.id_of(sentence).unwrap_or("?")
                    ),
                }
                .into());
            }
            let mut children = std::mem::take(&mut nodes[i].children);
            children.sort_by_key(|&c| nodes[c].start);
            nodes[i].children = children;
        }

        Ok(Self {
            sentence,
            offset,
            nodes,
            terminals,
            roots,
        })
    }

    /// Trees of all sentences starting in `range`.
    pub fn all(doc: &Document, range: Range<usize>) -> SyntaxResult<Vec<Self>> {
        doc.objects_by_kind(&ObjectKind::Sentence, range)
            .into_iter()
            .map(|key| Self::build(doc, key))
            .collect()
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn terminals(&self) -> &[TreeNode] {
        &self.nodes[..self.terminals]
    }

    pub fn nonterminals(&self) -> &[TreeNode] {
        &self.nodes[self.terminals..]
    }

    /// Nodes without a parent in this sentence, ordered by start.
    pub fn roots(&self) -> impl Iterator<Item = &TreeNode> + '_ {
        self.roots.iter().map(|&i| &self.nodes[i])
    }

    pub fn children<'a>(&'a self, node: &'a TreeNode) -> impl Iterator<Item = &'a TreeNode> + 'a {
        node.children.iter().map(|&i| &self.nodes[i])
    }

    /// Bracketed form, e.g. `(VROOT (NX (NE Peter)) ($. .))`.
    pub fn to_penn(&self, doc: &Document) -> String {
        let parts: Vec<String> = self.roots().map(|n| self.penn_node(doc, n)).collect();
        format!("(VROOT {})", parts.join(" "))
    }

    fn penn_node(&self, doc: &Document, node: &TreeNode) -> String {
        let obj = doc.object(node.key);
        let cat = obj.and_then(|o| o.text("cat")).unwrap_or("--");
        if node.terminal {
            let form = obj.map(|o| o.form()).unwrap_or("");
            return format!("({} {})", penn_escape(cat), penn_escape(form));
        }
        let children: Vec<String> = self
            .children(node)
            .map(|c| self.penn_node(doc, c))
            .collect();
        format!("({} {})", penn_escape(cat), children.join(" "))
    }
}
