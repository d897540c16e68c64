//! The document aggregate.
//!
//! A [`Document`] owns the schemas, the token sequence, every terminal and
//! markable (in an arena keyed by [`ObjectKey`]), the start-position index and
//! the ID table. All other components either build a document or drain it.
//!
//! ## Invariants
//!
//! - `words.len() == word_objs.len()`; position *i* of both belongs to the
//!   same token.
//! - Every markable registered under start position *p* has `span.start() == p`.
//! - The ID table only maps IDs of live objects; removing an object removes
//!   its ID.
//! - IDs are unique; temporary IDs are dropped once a permanent one is set.

mod json;
mod traversal;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::ops::Range;

use crate::alphabet::Alphabet;
use crate::attribute::Attribute;
use crate::error::{ExmlError, ExmlResult};
use crate::object::{Object, ObjectKey, ObjectKind};
use crate::schema::{FillPlan, InterfacePart, LayerSchema};
use crate::span::Span;

pub use traversal::InlineEvent;

/// Index of a layer schema within its document. The terminal layer is always
/// [`LayerId::TERMINAL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub(crate) usize);

impl LayerId {
    pub const TERMINAL: LayerId = LayerId(0);

    pub fn index(&self) -> usize {
        self.0
    }
}

/// Prefix of temporary IDs.
pub const TEMP_ID_PREFIX: &str = "__tmp_";

#[derive(Debug, Clone)]
pub struct Document {
    schemas: Vec<LayerSchema>,
    objects: HashMap<ObjectKey, Object>,
    next_key: usize,
    words: Vec<String>,
    word_objs: Vec<Option<ObjectKey>>,
    by_start: BTreeMap<usize, Vec<(LayerId, ObjectKey)>>,
    ids: HashMap<String, ObjectKey>,
    temp_ids: HashSet<String>,
    temp_counter: usize,
    word_ids: Alphabet<String>,
    interfaces: BTreeMap<String, Vec<String>>,
    warnings: Vec<String>,
}

/// Text attribute declared for an unknown wire attribute.
pub(crate) fn auto_attribute(name: &str) -> Attribute {
    Attribute::text(name).with_prop(&format!("_auto_{}", name))
}

impl Document {
    /// An empty document with a terminal schema and markable layer schemas.
    pub fn new(terminal: LayerSchema, layers: Vec<LayerSchema>) -> Self {
        let mut schemas = Vec::with_capacity(layers.len() + 1);
        schemas.push(terminal);
        schemas.extend(layers);
        Self {
            schemas,
            objects: HashMap::new(),
            next_key: 0,
            words: Vec::new(),
            word_objs: Vec::new(),
            by_start: BTreeMap::new(),
            ids: HashMap::new(),
            temp_ids: HashSet::new(),
            temp_counter: 0,
            word_ids: Alphabet::new(),
            interfaces: BTreeMap::new(),
            warnings: Vec::new(),
        }
    }

    /// Number of tokens.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Token forms, in order.
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// The terminal at `pos`, unless it was cleared.
    pub fn word_object(&self, pos: usize) -> Option<ObjectKey> {
        self.word_objs.get(pos).copied().flatten()
    }

    /// Symbolic word IDs by position.
    pub fn word_ids(&self) -> &Alphabet<String> {
        &self.word_ids
    }

    // ========================================================================
    // Schemas
    // ========================================================================

    pub fn schema(&self, layer: LayerId) -> &LayerSchema {
        &self.schemas[layer.0]
    }

    pub fn schema_mut(&mut self, layer: LayerId) -> &mut LayerSchema {
        &mut self.schemas[layer.0]
    }

    pub fn terminal_schema(&self) -> &LayerSchema {
        &self.schemas[0]
    }

    pub fn terminal_schema_mut(&mut self) -> &mut LayerSchema {
        &mut self.schemas[0]
    }

    /// Markable layers, in declaration order.
    pub fn layers(&self) -> impl Iterator<Item = (LayerId, &LayerSchema)> {
        self.schemas
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, s)| (LayerId(i), s))
    }

    /// Layer by name; `word` (or whatever the terminal layer is called)
    /// resolves to [`LayerId::TERMINAL`].
    pub fn layer_by_name(&self, name: &str) -> Option<LayerId> {
        self.schemas.iter().position(|s| s.name == name).map(LayerId)
    }

    pub fn schema_by_name(&self, name: &str) -> Option<&LayerSchema> {
        self.layer_by_name(name).map(|l| self.schema(l))
    }

    pub fn schema_by_name_mut(&mut self, name: &str) -> Option<&mut LayerSchema> {
        self.layer_by_name(name).map(move |l| self.schema_mut(l))
    }

    /// The layer handling objects of `kind`.
    pub fn layer_for_kind(&self, kind: &ObjectKind) -> Option<LayerId> {
        self.schemas.iter().position(|s| &s.kind == kind).map(LayerId)
    }

    pub fn schema_for_kind(&self, kind: &ObjectKind) -> Option<&LayerSchema> {
        self.layer_for_kind(kind).map(|l| self.schema(l))
    }

    /// Append a markable layer.
    pub fn add_schema(&mut self, schema: LayerSchema) -> LayerId {
        self.schemas.push(schema);
        LayerId(self.schemas.len() - 1)
    }

    /// The layer called `name`, creating a generic one with a diagnostic if
    /// it is not declared.
    pub(crate) fn ensure_layer(&mut self, name: &str) -> LayerId {
        match self.layer_by_name(name) {
            Some(layer) => layer,
            None => {
                self.warn(format!("undeclared markable layer: {}", name));
                self.add_schema(LayerSchema::generic(name))
            }
        }
    }

    /// Declare text attributes for wire names the layer does not know yet.
    pub(crate) fn ensure_attributes<'a>(
        &mut self,
        layer: LayerId,
        names: impl IntoIterator<Item = &'a str>,
    ) {
        for name in names {
            if self.schema(layer).attribute_by_name(name).is_some() {
                continue;
            }
            let layer_name = self.schema(layer).name.clone();
            self.warn(format!("undeclared text attribute: {}.{}", layer_name, name));
            self.schema_mut(layer).add_attribute(auto_attribute(name));
        }
    }

    // ========================================================================
    // Interfaces
    // ========================================================================

    /// Record interface `name` on every layer that has all of `parts`.
    pub fn add_interface(&mut self, name: &str, parts: &[InterfacePart]) {
        let mut fulfilled = Vec::new();
        let mut missing = Vec::new();
        for schema in self.schemas.iter_mut() {
            match schema.check_interface(name, parts) {
                Ok(()) => fulfilled.push(schema.name.clone()),
                Err(part) => missing.push(format!("{}: no {}", schema.name, part)),
            }
        }
        for message in missing {
            log::debug!("interface {} not fulfilled by {}", name, message);
        }
        self.interfaces
            .entry(name.to_string())
            .or_default()
            .extend(fulfilled);
    }

    /// Interfaces fulfilled by the layer called `layer`.
    pub fn interfaces_of(&self, layer: &str) -> Vec<String> {
        self.interfaces
            .iter()
            .filter(|(_, layers)| layers.iter().any(|l| l == layer))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// First (in sort order) interface shared by all `layers`.
    pub fn common_interface(&self, layers: &[&str]) -> Option<String> {
        let mut candidates: Option<BTreeSet<String>> = None;
        for name in layers {
            let own = self.schema_by_name(name)?.interfaces().clone();
            candidates = Some(match candidates {
                None => own,
                Some(c) => c.intersection(&own).cloned().collect(),
            });
        }
        candidates.and_then(|c| c.into_iter().next())
    }

    // ========================================================================
    // Objects and IDs
    // ========================================================================

    pub fn object(&self, key: ObjectKey) -> Option<&Object> {
        self.objects.get(&key)
    }

    pub fn object_mut(&mut self, key: ObjectKey) -> Option<&mut Object> {
        self.objects.get_mut(&key)
    }

    pub fn key_for_id(&self, id: &str) -> Option<ObjectKey> {
        self.ids.get(id).copied()
    }

    pub fn object_by_id(&self, id: &str) -> Option<&Object> {
        self.key_for_id(id).and_then(|k| self.object(k))
    }

    /// The ID currently assigned to `key`, if any.
    pub fn id_of(&self, key: ObjectKey) -> Option<&str> {
        self.objects.get(&key).and_then(|o| o.xml_id())
    }

    /// Put an object into the arena without registering it in a layer.
    ///
    /// An explicit ID is entered into the ID table; a duplicate is an
    /// integrity error.
    pub fn add_object(&mut self, obj: Object) -> ExmlResult<ObjectKey> {
        let key = ObjectKey(self.next_key);
        if let Some(id) = obj.xml_id() {
            if let Some(other) = self.ids.get(id) {
                return Err(ExmlError::integrity(format!(
                    "duplicate ID '{}' (already used by object {})",
                    id, other
                )));
            }
            self.ids.insert(id.to_string(), key);
        }
        self.next_key += 1;
        self.objects.insert(key, obj);
        Ok(key)
    }

    /// Add a markable to the arena and register it under its layer.
    pub fn insert_markable(&mut self, obj: Object) -> ExmlResult<ObjectKey> {
        let key = self.add_object(obj)?;
        self.register(key, None)?;
        Ok(key)
    }

    /// Return the object's ID, synthesizing `{layer}_{key}` if it has none.
    pub fn object_id_for(&mut self, key: ObjectKey) -> ExmlResult<String> {
        let obj = self
            .objects
            .get(&key)
            .ok_or_else(|| ExmlError::unresolved(&key.to_string(), "ID assignment"))?;
        if let Some(id) = obj.xml_id() {
            return Ok(id.to_string());
        }
        let prefix = self
            .schema_for_kind(obj.kind())
            .map(|s| s.name.as_str())
            .unwrap_or("x");
        let mut id = format!("{}_{}", prefix, key);
        let mut n = 0;
        while self.ids.contains_key(&id) {
            n += 1;
            id = format!("{}_{}_{}", prefix, key, n);
        }
        self.ids.insert(id.clone(), key);
        if let Some(obj) = self.objects.get_mut(&key) {
            obj.xml_id = Some(id.clone());
        }
        Ok(id)
    }

    /// Give `key` a permanent ID, dropping any previous one.
    pub fn set_object_id(&mut self, key: ObjectKey, id: &str) -> ExmlResult<()> {
        if let Some(other) = self.ids.get(id) {
            if *other != key {
                return Err(ExmlError::integrity(format!(
                    "duplicate ID '{}' (already used by object {})",
                    id, other
                )));
            }
        }
        let obj = self
            .objects
            .get_mut(&key)
            .ok_or_else(|| ExmlError::unresolved(&key.to_string(), "ID assignment"))?;
        if let Some(old) = obj.xml_id.replace(id.to_string()) {
            self.ids.remove(&old);
            self.temp_ids.remove(&old);
        }
        self.ids.insert(id.to_string(), key);
        Ok(())
    }

    /// Give `key` a temporary ID `__tmp_N`. Returns the existing ID instead
    /// if it already has one.
    pub fn assign_temp_id(&mut self, key: ObjectKey) -> ExmlResult<String> {
        if let Some(id) = self.id_of(key) {
            return Ok(id.to_string());
        }
        let mut id;
        loop {
            self.temp_counter += 1;
            id = format!("{}{}", TEMP_ID_PREFIX, self.temp_counter);
            if !self.ids.contains_key(&id) {
                break;
            }
        }
        let obj = self
            .objects
            .get_mut(&key)
            .ok_or_else(|| ExmlError::unresolved(&key.to_string(), "ID assignment"))?;
        obj.xml_id = Some(id.clone());
        self.ids.insert(id.clone(), key);
        self.temp_ids.insert(id.clone());
        Ok(id)
    }

    /// Drop `key`'s ID if it is temporary.
    pub fn clear_temp_id(&mut self, key: ObjectKey) {
        let Some(obj) = self.objects.get_mut(&key) else {
            return;
        };
        let is_temp = obj
            .xml_id
            .as_ref()
            .is_some_and(|id| self.temp_ids.contains(id));
        if is_temp {
            if let Some(id) = obj.xml_id.take() {
                self.ids.remove(&id);
                self.temp_ids.remove(&id);
            }
        }
    }

    /// Drop every temporary ID.
    pub fn clear_temp_ids(&mut self) {
        for id in std::mem::take(&mut self.temp_ids) {
            if let Some(key) = self.ids.remove(&id) {
                if let Some(obj) = self.objects.get_mut(&key) {
                    obj.xml_id = None;
                }
            }
        }
    }

    pub fn has_temp_id(&self, key: ObjectKey) -> bool {
        self.id_of(key).is_some_and(|id| self.temp_ids.contains(id))
    }

    fn remove_object(&mut self, key: ObjectKey) {
        if let Some(obj) = self.objects.remove(&key) {
            if let Some(id) = obj.xml_id() {
                if self.ids.get(id) == Some(&key) {
                    self.ids.remove(id);
                }
                self.temp_ids.remove(id);
            }
        }
    }

    // ========================================================================
    // Terminals
    // ========================================================================

    /// Append a terminal at the next position.
    ///
    /// A terminal without an ID gets a synthesized one. Its ID must map to
    /// exactly the new position in the word-ID table.
    pub fn append_terminal(&mut self, mut obj: Object) -> ExmlResult<ObjectKey> {
        if !obj.is_terminal() {
            return Err(ExmlError::construction(
                obj.kind().default_layer(),
                "not a terminal",
            ));
        }
        let pos = self.words.len();
        obj.span = Span::token(pos);
        let form = obj.form().to_string();
        let key = self.add_object(obj)?;
        let id = self.object_id_for(key)?;
        let idx = self.word_ids.index_of_str(&id);
        if idx != pos {
            self.remove_object(key);
            return Err(ExmlError::integrity(format!(
                "word ID '{}' maps to position {}, expected {}",
                id, idx, pos
            )));
        }
        self.words.push(form);
        self.word_objs.push(Some(key));
        Ok(key)
    }

    /// Put a new terminal object at an existing position.
    ///
    /// The form must match the stored token, and the object takes over the
    /// position's word ID.
    pub fn replace_terminal(&mut self, pos: usize, mut obj: Object) -> ExmlResult<ObjectKey> {
        let stored = self.words.get(pos).ok_or_else(|| {
            ExmlError::integrity(format!("no token at position {} (length {})", pos, self.len()))
        })?;
        if stored != obj.form() {
            return Err(ExmlError::integrity(format!(
                "form mismatch at position {}: document has '{}', replacement has '{}'",
                pos,
                stored,
                obj.form()
            )));
        }
        let symbol = self
            .word_ids
            .symbol_at(pos)
            .cloned()
            .ok_or_else(|| ExmlError::unresolved(&pos.to_string(), "word ID table"))?;
        if let Some(id) = obj.xml_id() {
            if id != symbol {
                return Err(ExmlError::integrity(format!(
                    "replacement at position {} has ID '{}', expected '{}'",
                    pos, id, symbol
                )));
            }
        }
        if let Some(old) = self.word_objs[pos].take() {
            self.remove_object(old);
        } else if let Some(old) = self.ids.get(&symbol).copied() {
            self.remove_object(old);
        }
        obj.span = Span::token(pos);
        obj.xml_id = Some(symbol);
        let key = self.add_object(obj)?;
        self.word_objs[pos] = Some(key);
        Ok(key)
    }

    // ========================================================================
    // Markable registry
    // ========================================================================

    /// Index `key` under the start of its span.
    ///
    /// Without an explicit layer, the layer is looked up by the object's kind.
    pub fn register(&mut self, key: ObjectKey, layer: Option<LayerId>) -> ExmlResult<()> {
        let obj = self
            .objects
            .get(&key)
            .ok_or_else(|| ExmlError::unresolved(&key.to_string(), "registration"))?;
        let layer = match layer {
            Some(layer) => layer,
            None => self
                .layer_for_kind(obj.kind())
                .ok_or_else(|| ExmlError::NoSchema {
                    layer: obj.kind().default_layer().to_string(),
                })?,
        };
        let entries = self.by_start.entry(obj.span.start()).or_default();
        if !entries.iter().any(|(_, k)| *k == key) {
            entries.push((layer, key));
        }
        Ok(())
    }

    fn unregister(&mut self, key: ObjectKey, start: usize) -> Option<LayerId> {
        let entries = self.by_start.get_mut(&start)?;
        let idx = entries.iter().position(|(_, k)| *k == key)?;
        let (layer, _) = entries.remove(idx);
        if entries.is_empty() {
            self.by_start.remove(&start);
        }
        Some(layer)
    }

    /// Change an object's span, moving it in the start index if needed.
    pub fn set_span(&mut self, key: ObjectKey, span: Span) -> ExmlResult<()> {
        let obj = self
            .objects
            .get_mut(&key)
            .ok_or_else(|| ExmlError::unresolved(&key.to_string(), "span update"))?;
        let old_start = obj.span.start();
        let new_start = span.start();
        obj.span = span;
        if old_start != new_start {
            if let Some(layer) = self.unregister(key, old_start) {
                self.by_start.entry(new_start).or_default().push((layer, key));
            }
        }
        Ok(())
    }

    /// Registered `(layer, object)` pairs whose start lies in `range`.
    pub fn objects_in(&self, range: Range<usize>) -> Vec<(LayerId, ObjectKey)> {
        if range.start >= range.end {
            return Vec::new();
        }
        self.by_start
            .range(range)
            .flat_map(|(_, entries)| entries.iter().copied())
            .collect()
    }

    /// Registered objects pairs starting at `pos`.
    pub fn objects_starting_at(&self, pos: usize) -> &[(LayerId, ObjectKey)] {
        self.by_start.get(&pos).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Markables of the layer called `name` starting in `range`.
    pub fn objects_by_layer(&self, name: &str, range: Range<usize>) -> Vec<ObjectKey> {
        let Some(layer) = self.layer_by_name(name) else {
            return Vec::new();
        };
        self.objects_in(range)
            .into_iter()
            .filter(|(l, _)| *l == layer)
            .map(|(_, k)| k)
            .collect()
    }

    /// Markables of `kind` starting in `range`.
    pub fn objects_by_kind(&self, kind: &ObjectKind, range: Range<usize>) -> Vec<ObjectKey> {
        self.objects_in(range)
            .into_iter()
            .filter(|(_, k)| self.objects.get(k).is_some_and(|o| o.kind() == kind))
            .map(|(_, k)| k)
            .collect()
    }

    /// Remove all markables starting in `range` and all terminal objects in
    /// it, together with their IDs. Token forms and word IDs stay.
    pub fn clear_range(&mut self, range: Range<usize>) {
        let starts: Vec<usize> = if range.start < range.end {
            self.by_start.range(range.clone()).map(|(s, _)| *s).collect()
        } else {
            Vec::new()
        };
        for start in starts {
            if let Some(entries) = self.by_start.remove(&start) {
                for (_, key) in entries {
                    self.remove_object(key);
                }
            }
        }
        let end = range.end.min(self.word_objs.len());
        for pos in range.start.min(end)..end {
            if let Some(key) = self.word_objs[pos].take() {
                self.remove_object(key);
            }
        }
    }

    /// Rewrite references to replaced objects in every live object.
    pub(crate) fn redirect_refs(&mut self, moved: &HashMap<ObjectKey, ObjectKey>) {
        if moved.is_empty() {
            return;
        }
        for obj in self.objects.values_mut() {
            obj.redirect_refs(moved);
        }
    }

    /// Remove the markables of one layer starting in `range`.
    pub fn clear_layer(&mut self, name: &str, range: Range<usize>) {
        let Some(layer) = self.layer_by_name(name) else {
            return;
        };
        for (l, key) in self.objects_in(range) {
            if l != layer {
                continue;
            }
            if let Some(start) = self.objects.get(&key).map(|o| o.span.start()) {
                self.unregister(key, start);
            }
            self.remove_object(key);
        }
    }

    // ========================================================================
    // Filling
    // ========================================================================

    /// Apply values computed by a schema against this document.
    pub(crate) fn apply_fill(
        &mut self,
        key: ObjectKey,
        layer: LayerId,
        plan: FillPlan,
    ) -> ExmlResult<()> {
        let FillPlan {
            attrs,
            edges,
            span,
            enum_notes,
        } = plan;
        for note in enum_notes {
            self.schemas[layer.0].note_enum(note);
        }
        let schema = &self.schemas[layer.0];
        let obj = self
            .objects
            .get_mut(&key)
            .ok_or_else(|| ExmlError::unresolved(&key.to_string(), "attribute fill"))?;
        for (prop, value) in attrs {
            obj.set_attr(&prop, value);
        }
        for (edge, values) in edges {
            schema.set_edges(edge, obj, values)?;
        }
        if let Some(span) = span {
            self.set_span(key, span)?;
        }
        Ok(())
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Record a non-fatal anomaly.
    pub(crate) fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.warnings.push(message);
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Drain the collected diagnostics.
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }
}
