//! Parsed sentences going into a document.
//!
//! A [`SentenceTree`] is what a parser or treebank reader produces: words,
//! phrases linked by parent indices, and named entities over token
//! positions. [`add_tree_to_doc`] turns it into `word`, `sentence`, `node`
//! and `ne` objects with treebank-style IDs (`s3`, `s3_1`, `s3_500`, `ne_17`).

use std::collections::{HashMap, HashSet};

use exmldoc::{Document, ExmlError, LayerSchema, Object, ObjectKey, ObjectKind, Span, Value};

use crate::errors::{SyntaxError, SyntaxResult};

/// Number of the first phrase that has none of its own.
pub const FIRST_PHRASE_NUMBER: usize = 500;

/// A terminal of a [`SentenceTree`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TreeWord {
    pub form: String,
    pub pos: String,
    pub morph: Option<String>,
    pub lemma: Option<String>,
    pub func: Option<String>,
    /// Index into [`SentenceTree::phrases`].
    pub parent: Option<usize>,
}

impl TreeWord {
    pub fn new(form: &str, pos: &str) -> Self {
        Self {
            form: form.to_string(),
            pos: pos.to_string(),
            ..Self::default()
        }
    }

    pub fn with_morph(mut self, morph: &str) -> Self {
        self.morph = Some(morph.to_string());
        self
    }

    pub fn with_lemma(mut self, lemma: &str) -> Self {
        self.lemma = Some(lemma.to_string());
        self
    }

    pub fn with_func(mut self, func: &str) -> Self {
        self.func = Some(func.to_string());
        self
    }

    pub fn with_parent(mut self, phrase: usize) -> Self {
        self.parent = Some(phrase);
        self
    }
}

/// A nonterminal of a [`SentenceTree`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TreePhrase {
    pub cat: String,
    pub func: Option<String>,
    pub parent: Option<usize>,
    /// Node number within the sentence; the ID becomes `<sentence>_<number>`.
    pub number: Option<usize>,
    /// Explicit ID, used as is.
    pub xml_id: Option<String>,
}

impl TreePhrase {
    pub fn new(cat: &str) -> Self {
        Self {
            cat: cat.to_string(),
            ..Self::default()
        }
    }

    pub fn with_func(mut self, func: &str) -> Self {
        self.func = Some(func.to_string());
        self
    }

    pub fn with_parent(mut self, phrase: usize) -> Self {
        self.parent = Some(phrase);
        self
    }

    pub fn with_number(mut self, number: usize) -> Self {
        self.number = Some(number);
        self
    }
}

/// One parsed sentence, not yet part of a document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SentenceTree {
    pub sent_no: Option<usize>,
    pub xml_id: Option<String>,
    pub words: Vec<TreeWord>,
    pub phrases: Vec<TreePhrase>,
    /// Entity type and sentence-relative token positions.
    pub entities: Vec<(String, Vec<usize>)>,
}

impl SentenceTree {
    /// An empty sentence with ID `s<sent_no>`.
    pub fn new(sent_no: usize) -> Self {
        Self {
            sent_no: Some(sent_no),
            ..Self::default()
        }
    }

    pub fn with_id(id: &str) -> Self {
        Self {
            xml_id: Some(id.to_string()),
            ..Self::default()
        }
    }

    /// Add a word; returns its position in the sentence.
    pub fn push_word(&mut self, word: TreeWord) -> usize {
        self.words.push(word);
        self.words.len() - 1
    }

    /// Add a phrase; returns the index words and phrases use as `parent`.
    pub fn push_phrase(&mut self, phrase: TreePhrase) -> usize {
        self.phrases.push(phrase);
        self.phrases.len() - 1
    }

    pub fn push_entity(&mut self, kind: &str, positions: &[usize]) {
        self.entities.push((kind.to_string(), positions.to_vec()));
    }

    fn prefix(&self) -> SyntaxResult<String> {
        match (&self.xml_id, self.sent_no) {
            (Some(id), _) => Ok(id.clone()),
            (None, Some(n)) => Ok(format!("s{}", n)),
            (None, None) => Err(SyntaxError::Tree {
                sentence: "?".to_string(),
                message: "neither a sentence number nor an ID".to_string(),
            }),
        }
    }

    fn phrase_id(&self, prefix: &str, idx: usize) -> String {
        let phrase = &self.phrases[idx];
        match &phrase.xml_id {
            Some(id) => id.clone(),
            None => format!(
                "{}_{}",
                prefix,
                phrase.number.unwrap_or(FIRST_PHRASE_NUMBER + idx)
            ),
        }
    }

    /// Sentence positions dominated by each phrase, in order.
    fn dominated_positions(&self, prefix: &str) -> SyntaxResult<Vec<Vec<usize>>> {
        let broken = |message: String| SyntaxError::Tree {
            sentence: prefix.to_string(),
            message,
        };
        for (i, phrase) in self.phrases.iter().enumerate() {
            if phrase.parent.is_some_and(|p| p >= self.phrases.len()) {
                return Err(broken(format!("phrase {} has an unknown parent", i)));
            }
        }
        let mut dominated = vec![Vec::new(); self.phrases.len()];
        for (pos, word) in self.words.iter().enumerate() {
            let mut current = word.parent;
            let mut steps = 0;
            while let Some(p) = current {
                if p >= self.phrases.len() {
                    return Err(broken(format!("word {} has an unknown parent", pos + 1)));
                }
                steps += 1;
                if steps > self.phrases.len() {
                    return Err(broken(format!("parent links above word {} form a cycle", pos + 1)));
                }
                dominated[p].push(pos);
                current = self.phrases[p].parent;
            }
        }
        for (i, positions) in dominated.iter().enumerate() {
            if positions.is_empty() {
                return Err(broken(format!(
                    "phrase {} ({}) dominates no words",
                    self.phrase_id(prefix, i),
                    self.phrases[i].cat
                )));
            }
        }
        Ok(dominated)
    }
}

fn prop_of(schema: &LayerSchema, name: &str) -> SyntaxResult<String> {
    schema
        .attribute_by_name(name)
        .map(|att| att.prop.clone())
        .ok_or_else(|| {
            ExmlError::NoSchema {
                layer: format!("{}.{}", schema.name, name),
            }
            .into()
        })
}

fn schema_of<'a>(doc: &'a Document, layer: &str) -> SyntaxResult<&'a LayerSchema> {
    doc.schema_by_name(layer).ok_or_else(|| {
        ExmlError::NoSchema {
            layer: layer.to_string(),
        }
        .into()
    })
}

fn note_value(schema: &mut LayerSchema, name: &str, value: &str) {
    if let Some(att) = schema.attribute_by_name_mut(name) {
        att.add_item(value, None);
    }
}

/// `ne_<start>` with a letter suffix for the second and later entity
/// starting at the same token.
fn entity_id(start: usize, seen_before: usize) -> Option<String> {
    match seen_before {
        0 => Some(format!("ne_{}", start)),
        n if n <= 26 => Some(format!("ne_{}{}", start, (b'a' + (n - 1) as u8) as char)),
        _ => None,
    }
}

/// Add a parsed sentence to a syntax document.
///
/// Without `start` the words are appended. With `start` they replace the
/// terminals at that position, whose forms must match, and every markable
/// starting inside the sentence is cleared first. All IDs and spans are
/// checked before the document changes. Returns the sentence markable.
pub fn add_tree_to_doc(
    doc: &mut Document,
    tree: &SentenceTree,
    start: Option<usize>,
) -> SyntaxResult<ObjectKey> {
    let prefix = tree.prefix()?;
    let broken = |message: String| SyntaxError::Tree {
        sentence: prefix.clone(),
        message,
    };
    let len = tree.words.len();
    if len == 0 {
        return Err(broken("sentence without words".to_string()));
    }
    let offset = start.unwrap_or(doc.len());
    let range = offset..offset + len;

    let mut released: HashSet<String> = HashSet::new();
    if start.is_some() {
        if range.end > doc.len() {
            return Err(broken(format!(
                "tokens {}..{} reach past the document end {}",
                range.start,
                range.end,
                doc.len()
            )));
        }
        for (i, word) in tree.words.iter().enumerate() {
            let stored = &doc.words()[offset + i];
            if *stored != word.form {
                return Err(broken(format!(
                    "form mismatch at position {}: document has '{}', tree has '{}'",
                    offset + i,
                    stored,
                    word.form
                )));
            }
        }
        let markables = doc.objects_in(range.clone()).into_iter().map(|(_, k)| k);
        let words = range.clone().filter_map(|pos| doc.word_object(pos));
        released = markables
            .chain(words)
            .filter_map(|k| doc.id_of(k).map(str::to_string))
            .collect();
    }

    // IDs the sentence will hold
    let mut claimed: HashSet<String> = HashSet::new();
    let mut claim = |id: &str| -> SyntaxResult<()> {
        let taken = doc.key_for_id(id).is_some() && !released.contains(id);
        if taken || !claimed.insert(id.to_string()) {
            return Err(ExmlError::Integrity {
                message: format!("duplicate ID '{}' in sentence {}", id, prefix),
            }
            .into());
        }
        Ok(())
    };
    claim(&prefix)?;
    let word_ids: Vec<String> = (1..=len).map(|i| format!("{}_{}", prefix, i)).collect();
    if start.is_none() {
        for id in &word_ids {
            if doc.word_ids().get_str(id).is_some() {
                return Err(ExmlError::Integrity {
                    message: format!("word ID '{}' is already used", id),
                }
                .into());
            }
            claim(id)?;
        }
    }

    let dominated = tree.dominated_positions(&prefix)?;
    let mut phrases = Vec::with_capacity(tree.phrases.len());
    for (i, positions) in dominated.iter().enumerate() {
        let id = tree.phrase_id(&prefix, i);
        claim(&id)?;
        phrases.push((id, Span::from_positions(positions, offset)?));
    }

    let mut per_start: HashMap<usize, usize> = HashMap::new();
    let mut entities = Vec::with_capacity(tree.entities.len());
    for (kind, positions) in &tree.entities {
        if positions.is_empty() {
            return Err(broken(format!("empty {} entity", kind)));
        }
        if let Some(pos) = positions.iter().find(|&&p| p >= len) {
            return Err(broken(format!("{} entity reaches position {}", kind, pos)));
        }
        let span = Span::from_positions(positions, offset)?;
        let seen = per_start.entry(span.start()).or_default();
        let id = entity_id(span.start(), *seen)
            .ok_or_else(|| broken(format!("too many entities at position {}", span.start())))?;
        *seen += 1;
        claim(&id)?;
        entities.push((kind.as_str(), id, span));
    }

    let word_schema = doc.terminal_schema();
    let pos_prop = prop_of(word_schema, "pos")?;
    let morph_prop = prop_of(word_schema, "morph")?;
    let lemma_prop = prop_of(word_schema, "lemma")?;
    let func_prop = prop_of(word_schema, "func")?;
    let parent_prop = prop_of(word_schema, "parent")?;
    let (cat_prop, node_func_prop, node_parent_prop) = if phrases.is_empty() {
        Default::default()
    } else {
        let node = schema_of(doc, "node")?;
        (
            prop_of(node, "cat")?,
            prop_of(node, "func")?,
            prop_of(node, "parent")?,
        )
    };
    let kind_prop = if entities.is_empty() {
        String::new()
    } else {
        prop_of(schema_of(doc, "ne")?, "type")?
    };
    schema_of(doc, "sentence")?;

    // the document changes from here on
    if start.is_some() {
        doc.clear_range(range.clone());
    }
    let mut word_keys = Vec::with_capacity(len);
    for (i, word) in tree.words.iter().enumerate() {
        let mut obj = Object::terminal(word.form.as_str()).with_text(&pos_prop, &word.pos);
        let optional = [
            (&morph_prop, &word.morph),
            (&lemma_prop, &word.lemma),
            (&func_prop, &word.func),
        ];
        for (prop, value) in optional {
            if let Some(value) = value {
                obj.set_attr(prop, Value::text(value.as_str()));
            }
        }
        let key = match start {
            None => doc.append_terminal(obj.with_id(word_ids[i].as_str()))?,
            Some(_) => doc.replace_terminal(offset + i, obj)?,
        };
        word_keys.push(key);
        let schema = doc.terminal_schema_mut();
        note_value(schema, "pos", &word.pos);
        for (name, value) in [("morph", &word.morph), ("func", &word.func)] {
            if let Some(value) = value {
                note_value(schema, name, value);
            }
        }
    }

    let sentence = doc.insert_markable(
        Object::markable(ObjectKind::Sentence, Span::range(range.start, range.end)?)
            .with_id(prefix.as_str()),
    )?;

    let mut phrase_keys = Vec::with_capacity(phrases.len());
    for (phrase, (id, span)) in tree.phrases.iter().zip(phrases) {
        let mut obj = Object::markable(ObjectKind::Node, span)
            .with_id(id)
            .with_text(&cat_prop, &phrase.cat);
        if let Some(func) = &phrase.func {
            obj.set_attr(&node_func_prop, Value::text(func.as_str()));
        }
        phrase_keys.push(doc.insert_markable(obj)?);
        if let Some(schema) = doc.schema_by_name_mut("node") {
            note_value(schema, "cat", &phrase.cat);
            if let Some(func) = &phrase.func {
                note_value(schema, "func", func);
            }
        }
    }
    for (key, parent) in word_keys.iter().zip(tree.words.iter().map(|w| w.parent)) {
        if let (Some(p), Some(obj)) = (parent, doc.object_mut(*key)) {
            obj.set_attr(&parent_prop, Value::Ref(phrase_keys[p]));
        }
    }
    for (i, phrase) in tree.phrases.iter().enumerate() {
        if let (Some(p), Some(obj)) = (phrase.parent, doc.object_mut(phrase_keys[i])) {
            obj.set_attr(&node_parent_prop, Value::Ref(phrase_keys[p]));
        }
    }

    for (kind, id, span) in entities {
        doc.insert_markable(
            Object::markable(ObjectKind::NamedEntity, span)
                .with_id(id)
                .with_text(&kind_prop, kind),
        )?;
        if let Some(schema) = doc.schema_by_name_mut("ne") {
            note_value(schema, "type", kind);
        }
    }
    log::debug!("sentence {} added at {}..{}", prefix, range.start, range.end);
    Ok(sentence)
}
