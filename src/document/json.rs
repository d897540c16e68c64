//! Flat JSON chunks.
//!
//! A chunk is one JSON object: `_start` (first token position), the terminal
//! records under the terminal layer's name, and one list of records per
//! markable layer. References are written as `{"_id": "..."}`.

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use serde_json::{Map, Value as JsonValue};

use super::{auto_attribute, Document, LayerId};
use crate::error::{ExmlError, ExmlResult};
use crate::object::{Object, ObjectKey};
use crate::schema::{LayerSchema, JSON_ID, SPAN_ATTR};

/// JSON key holding a chunk's first position.
pub const START_KEY: &str = "_start";

fn unknown_keys(schema: &LayerSchema, record: &Map<String, JsonValue>) -> Vec<String> {
    record
        .keys()
        .filter(|k| k.as_str() != JSON_ID && k.as_str() != SPAN_ATTR)
        .filter(|k| schema.attribute_by_name(k).is_none() && schema.edge_by_name(k).is_none())
        .cloned()
        .collect()
}

fn as_record<'a>(value: &'a JsonValue, layer: &str) -> ExmlResult<&'a Map<String, JsonValue>> {
    value
        .as_object()
        .ok_or_else(|| ExmlError::construction(layer, "record is not a JSON object"))
}

impl Document {
    /// JSON chunk for the tokens in `range` and the markables starting there.
    ///
    /// Every object written gets an ID.
    pub fn json_chunk(&mut self, range: Range<usize>) -> ExmlResult<JsonValue> {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        self.ensure_ids(start..end, true)?;

        let mut chunk = Map::new();
        chunk.insert(START_KEY.to_string(), JsonValue::from(start));
        let mut terminals = Vec::with_capacity(end - start);
        for pos in start..end {
            let key = self.word_object(pos).ok_or_else(|| {
                ExmlError::integrity(format!("no word object at position {}", pos))
            })?;
            terminals.push(JsonValue::Object(self.terminal_schema().to_json(key, self)?));
        }
        chunk.insert(self.terminal_schema().name.clone(), JsonValue::Array(terminals));

        for (layer, key) in self.objects_in(start..end) {
            let schema = self.schema(layer);
            let record = schema.to_json(key, self)?;
            if let JsonValue::Array(list) = chunk
                .entry(schema.name.clone())
                .or_insert_with(|| JsonValue::Array(Vec::new()))
            {
                list.push(JsonValue::Object(record));
            }
        }
        Ok(JsonValue::Object(chunk))
    }

    /// Insert a chunk produced by [`json_chunk`](Self::json_chunk).
    ///
    /// If `_start` equals the current length, the terminals are appended.
    /// Otherwise the chunk replaces the range it covers: terminal forms must
    /// match, markables starting in the range are dropped, and references
    /// from outside the range follow the new objects with the same IDs.
    ///
    /// The whole chunk is checked before anything changes, so a failing
    /// insert leaves the document as it was. All objects are created before
    /// any attribute is filled, so references may point forward within the
    /// chunk. Returns the chunk's token range.
    pub fn json_insert(&mut self, chunk: &JsonValue) -> ExmlResult<Range<usize>> {
        let chunk = as_record(chunk, "chunk")?;
        let StagedChunk {
            start,
            end,
            append,
            terminals,
            layers,
        } = self.stage_chunk(chunk)?;
        let (terminal_records, terminal_objs): (Vec<_>, Vec<_>) = terminals.into_iter().unzip();

        for record in &terminal_records {
            let unknown = unknown_keys(self.terminal_schema(), record);
            self.ensure_attributes(LayerId::TERMINAL, unknown.iter().map(String::as_str));
        }
        let mut replaced: Vec<(String, ObjectKey)> = Vec::new();
        if append {
            for obj in terminal_objs {
                self.append_terminal(obj)?;
            }
        } else {
            let markables = self.objects_in(start..end).into_iter().map(|(_, k)| k);
            let words = (start..end).filter_map(|pos| self.word_object(pos));
            replaced = markables
                .chain(words)
                .filter_map(|k| self.id_of(k).map(|id| (id.to_string(), k)))
                .collect();
            self.clear_range(start..end);
            for (i, obj) in terminal_objs.into_iter().enumerate() {
                self.replace_terminal(start + i, obj)?;
            }
        }

        let mut created: Vec<(LayerId, ObjectKey, &Map<String, JsonValue>)> = Vec::new();
        for (name, records) in layers {
            let layer = self.ensure_layer(name);
            for (record, obj) in records {
                let unknown = unknown_keys(self.schema(layer), record);
                self.ensure_attributes(layer, unknown.iter().map(String::as_str));
                let key = self.add_object(obj)?;
                self.register(key, Some(layer))?;
                created.push((layer, key, record));
            }
        }

        for (i, record) in terminal_records.into_iter().enumerate() {
            let key = self.word_object(start + i).ok_or_else(|| {
                ExmlError::integrity(format!("no word object at position {}", start + i))
            })?;
            let plan = self
                .terminal_schema()
                .plan_json_fill(record, |id| self.key_for_id(id))?;
            self.apply_fill(key, LayerId::TERMINAL, plan)?;
        }
        for (layer, key, record) in created {
            let plan = self
                .schema(layer)
                .plan_json_fill(record, |id| self.key_for_id(id))?;
            self.apply_fill(key, layer, plan)?;
        }

        let moved: HashMap<ObjectKey, ObjectKey> = replaced
            .into_iter()
            .filter_map(|(id, old)| self.key_for_id(&id).map(|new| (old, new)))
            .collect();
        self.redirect_refs(&moved);
        Ok(start..end)
    }

    /// Check a chunk against the document without changing it.
    fn stage_chunk<'c>(&self, chunk: &'c Map<String, JsonValue>) -> ExmlResult<StagedChunk<'c>> {
        let terminal_name = self.terminal_schema().name.as_str();
        let start = match chunk.get(START_KEY) {
            Some(v) => v.as_u64().ok_or_else(|| {
                ExmlError::construction("chunk", format!("'{}' is not a position", START_KEY))
            })? as usize,
            None => 0,
        };
        let terminal_records = chunk
            .get(terminal_name)
            .and_then(JsonValue::as_array)
            .ok_or_else(|| ExmlError::construction(terminal_name, "chunk without terminals"))?
            .iter()
            .map(|v| as_record(v, terminal_name))
            .collect::<ExmlResult<Vec<_>>>()?;
        let end = start + terminal_records.len();
        let append = start == self.len();
        if !append && end > self.len() {
            return Err(ExmlError::integrity(format!(
                "chunk {}..{} reaches past the document end {}",
                start,
                end,
                self.len()
            )));
        }

        // IDs that the insert frees, and IDs the chunk will hold
        let mut released: HashSet<&str> = HashSet::new();
        let mut claimed: HashSet<String> = HashSet::new();
        if !append {
            for (_, key) in self.objects_in(start..end) {
                released.extend(self.id_of(key));
            }
            for pos in start..end {
                if let Some(symbol) = self.word_ids().symbol_at(pos) {
                    released.insert(symbol.as_str());
                    claimed.insert(symbol.clone());
                }
            }
        }
        let mut claim = |id: &str| -> ExmlResult<()> {
            if let Some(other) = self.key_for_id(id) {
                if !released.contains(id) {
                    return Err(ExmlError::integrity(format!(
                        "duplicate ID '{}' (already used by object {})",
                        id, other
                    )));
                }
            }
            if !claimed.insert(id.to_string()) {
                return Err(ExmlError::integrity(format!("duplicate ID '{}' in chunk", id)));
            }
            Ok(())
        };

        let terminal_schema = with_auto_attributes(self.terminal_schema(), &terminal_records);
        let mut terminals = Vec::with_capacity(terminal_records.len());
        for (i, record) in terminal_records.into_iter().enumerate() {
            let pos = start + i;
            let obj = terminal_schema.construct_from_json(record)?;
            if append {
                if let Some(id) = obj.xml_id() {
                    if self.word_ids().get_str(id).is_some() {
                        return Err(ExmlError::integrity(format!(
                            "word ID '{}' is already used",
                            id
                        )));
                    }
                    claim(id)?;
                }
            } else {
                let stored = &self.words[pos];
                if obj.form() != stored {
                    return Err(ExmlError::integrity(format!(
                        "form mismatch at position {}: document has '{}', chunk has '{}'",
                        pos,
                        stored,
                        obj.form()
                    )));
                }
                let symbol = self.word_ids().symbol_at(pos).map(String::as_str);
                if obj.xml_id().is_some() && obj.xml_id() != symbol {
                    return Err(ExmlError::integrity(format!(
                        "terminal at position {} has ID {:?}, expected {:?}",
                        pos,
                        obj.xml_id(),
                        symbol
                    )));
                }
            }
            terminals.push((record, obj));
        }

        let new_len = self.len().max(end);
        let mut layers = Vec::new();
        let mut schemas = Vec::new();
        for (name, records) in chunk {
            if name == START_KEY || name == terminal_name {
                continue;
            }
            let records = records
                .as_array()
                .ok_or_else(|| ExmlError::construction(name, "layer entry is not a list"))?
                .iter()
                .map(|v| as_record(v, name))
                .collect::<ExmlResult<Vec<_>>>()?;
            let schema = match self.schema_by_name(name) {
                Some(schema) => with_auto_attributes(schema, &records),
                None => with_auto_attributes(&LayerSchema::generic(name), &records),
            };
            let mut objects = Vec::with_capacity(records.len());
            for record in records {
                let obj = schema.construct_from_json(record)?;
                if obj.span.end() > new_len {
                    return Err(ExmlError::InvalidSpan {
                        bounds: obj.span.bounds().to_vec(),
                        reason: format!("reaches past the document end {}", new_len),
                    });
                }
                if let Some(id) = obj.xml_id() {
                    claim(id)?;
                }
                objects.push((record, obj));
            }
            layers.push((name.as_str(), objects));
            schemas.push(schema);
        }

        let resolve = |id: &str| {
            let known = claimed.contains(id) || (self.ids.contains_key(id) && !released.contains(id));
            known.then_some(ObjectKey(usize::MAX))
        };
        for (record, obj) in &terminals {
            check_fill(&terminal_schema, record, obj, &resolve)?;
        }
        for ((_, objects), schema) in layers.iter().zip(&schemas) {
            for (record, obj) in objects {
                check_fill(schema, record, obj, &resolve)?;
            }
        }

        Ok(StagedChunk {
            start,
            end,
            append,
            terminals,
            layers,
        })
    }
}

type StagedRecord<'c> = (&'c Map<String, JsonValue>, Object);

/// A chunk that passed [`Document::stage_chunk`].
struct StagedChunk<'c> {
    start: usize,
    end: usize,
    append: bool,
    terminals: Vec<StagedRecord<'c>>,
    layers: Vec<(&'c str, Vec<StagedRecord<'c>>)>,
}

/// `schema` with the text attributes an insert of `records` would declare.
fn with_auto_attributes(schema: &LayerSchema, records: &[&Map<String, JsonValue>]) -> LayerSchema {
    let mut staged = schema.clone();
    for record in records {
        for name in unknown_keys(&staged, record) {
            staged.add_attribute(auto_attribute(&name));
        }
    }
    staged
}

/// Plan and apply a record's values on a copy of `obj`.
fn check_fill(
    schema: &LayerSchema,
    record: &Map<String, JsonValue>,
    obj: &Object,
    resolve: impl Fn(&str) -> Option<ObjectKey>,
) -> ExmlResult<()> {
    let plan = schema.plan_json_fill(record, resolve)?;
    let mut scratch = obj.clone();
    for (edge, values) in plan.edges {
        schema.set_edges(edge, &mut scratch, values)?;
    }
    Ok(())
}
