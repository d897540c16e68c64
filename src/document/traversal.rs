//! Left-to-right nesting traversal.
//!
//! Markables form an interval graph, not a tree. The traversal walks token
//! positions in order, keeps a stack of open markables, and opens the
//! markables starting at each position longest-first. Coextensive markables
//! are ordered by their locality and up/down constraints. A markable that
//! cannot be expressed by nesting alone (discontinuous, or reaching past the
//! enclosing markable) carries an explicit `span` attribute.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::ops::Range;

use super::{Document, LayerId};
use crate::error::{ExmlError, ExmlResult};
use crate::object::ObjectKey;
use crate::order::topsort;
use crate::schema::{WireAttrs, SPAN_ATTR};
use crate::span::encode_span;

/// One event of the inline event stream.
#[derive(Debug, Clone, PartialEq)]
pub enum InlineEvent {
    /// A markable opens.
    Start {
        layer: String,
        attrs: WireAttrs,
        edges: Vec<(String, WireAttrs)>,
    },
    /// The terminal at the current position.
    Terminal(ObjectKey),
    /// The innermost open markable closes.
    End { layer: String },
}

impl Document {
    /// Assign IDs needed to serialize `range`: every object in it when
    /// `force_ids` is set, and every object referenced from it.
    pub(crate) fn ensure_ids(&mut self, range: Range<usize>, force_ids: bool) -> ExmlResult<()> {
        let mut keys: Vec<ObjectKey> = range.clone().filter_map(|p| self.word_object(p)).collect();
        keys.extend(self.objects_in(range).into_iter().map(|(_, k)| k));
        let referenced: Vec<ObjectKey> = keys
            .iter()
            .filter_map(|k| self.object(*k))
            .flat_map(|o| o.referenced_keys())
            .collect();
        if force_ids {
            for key in keys {
                self.object_id_for(key)?;
            }
        }
        for key in referenced {
            if self.object(key).is_some() {
                self.object_id_for(key)?;
            }
        }
        Ok(())
    }

    fn end_of(&self, key: ObjectKey) -> usize {
        self.object(key).map(|o| o.span.end()).unwrap_or(0)
    }

    fn ordering_edges(
        &self,
        batch: &[(LayerId, ObjectKey)],
        ids: &[String],
    ) -> ExmlResult<Vec<(String, String)>> {
        let by_layer: HashMap<&str, &str> = batch
            .iter()
            .zip(ids)
            .map(|((layer, _), id)| (self.schema(*layer).name.as_str(), id.as_str()))
            .collect();
        let mut edges = Vec::new();
        for ((layer, key), id) in batch.iter().zip(ids) {
            let schema = self.schema(*layer);
            schema.graph_contributions(*key, self, &mut edges)?;
            if let Some(parent) = schema.locality.as_deref().and_then(|l| by_layer.get(l)) {
                edges.push((parent.to_string(), id.clone()));
            }
        }
        Ok(edges)
    }

    /// Order a batch of markables that start and end at the same positions.
    ///
    /// Objects mentioned in the constraint graph come first in topological
    /// order; the rest keep their stored order. On a cycle the stored order
    /// is kept and a diagnostic is recorded.
    pub fn reorder_same_start(
        &mut self,
        batch: &[(LayerId, ObjectKey)],
    ) -> ExmlResult<Vec<(LayerId, ObjectKey)>> {
        let mut temp = Vec::new();
        let mut ids = Vec::with_capacity(batch.len());
        for (_, key) in batch {
            if self.id_of(*key).is_none() {
                temp.push(*key);
                ids.push(self.assign_temp_id(*key)?);
            } else {
                ids.push(self.object_id_for(*key)?);
            }
        }
        let edges = self.ordering_edges(batch, &ids);
        for key in temp {
            self.clear_temp_id(key);
        }
        let edges = edges?;

        match topsort(&edges) {
            Ok(order) => {
                let mut remaining: Vec<Option<(LayerId, ObjectKey)>> =
                    batch.iter().copied().map(Some).collect();
                let mut result = Vec::with_capacity(batch.len());
                for id in order {
                    if let Some(i) = ids.iter().position(|x| *x == id) {
                        if let Some(entry) = remaining[i].take() {
                            result.push(entry);
                        }
                    }
                }
                result.extend(remaining.into_iter().flatten());
                Ok(result)
            }
            Err(node) => {
                self.warn(format!(
                    "cyclic ordering constraints around '{}'; keeping stored order",
                    node
                ));
                Ok(batch.to_vec())
            }
        }
    }

    /// Markables starting at one position, sorted longest first, with runs
    /// of equal end resolved by [`reorder_same_start`](Self::reorder_same_start).
    fn opening_order(
        &mut self,
        pos: usize,
        levels: Option<&[&str]>,
    ) -> ExmlResult<Vec<(LayerId, ObjectKey)>> {
        let mut here: Vec<(LayerId, ObjectKey)> = self
            .objects_starting_at(pos)
            .iter()
            .copied()
            .filter(|(layer, _)| {
                levels.map_or(true, |ls| ls.contains(&self.schema(*layer).name.as_str()))
            })
            .collect();
        here.sort_by_key(|(_, key)| Reverse(self.end_of(*key)));

        let mut ordered = Vec::with_capacity(here.len());
        let mut i = 0;
        while i < here.len() {
            let end = self.end_of(here[i].1);
            let mut j = i + 1;
            while j < here.len() && self.end_of(here[j].1) == end {
                j += 1;
            }
            if j - i > 1 {
                ordered.extend(self.reorder_same_start(&here[i..j])?);
            } else {
                ordered.push(here[i]);
            }
            i = j;
        }
        Ok(ordered)
    }

    /// Event stream for the tokens in `range`.
    ///
    /// With `levels`, only markables of those layers produce events. Every
    /// markable still open at the end of the range is closed there.
    pub fn inline_events(
        &mut self,
        range: Range<usize>,
        levels: Option<&[&str]>,
        force_ids: bool,
    ) -> ExmlResult<Vec<InlineEvent>> {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        self.ensure_ids(start..end, force_ids)?;

        let mut events = Vec::new();
        let mut stack: Vec<(String, usize)> = Vec::new();
        for pos in start..end {
            let word = self.word_object(pos).ok_or_else(|| {
                ExmlError::integrity(format!("no word object at position {}", pos))
            })?;
            while let Some((layer, close)) = stack.last() {
                if pos < *close {
                    break;
                }
                events.push(InlineEvent::End {
                    layer: layer.clone(),
                });
                stack.pop();
            }

            for (layer, key) in self.opening_order(pos, levels)? {
                let ser = self.schema(layer).serialize(key, self, force_ids)?;
                let mut attrs = ser.attrs;
                let span_end = ser.span.end();
                let mut endpoint = span_end;
                let mut need_span = !ser.span.is_contiguous();
                if let Some((_, top_end)) = stack.last() {
                    if span_end > *top_end {
                        need_span = true;
                        endpoint = *top_end;
                    }
                }
                if need_span {
                    attrs.push((SPAN_ATTR.to_string(), encode_span(&ser.span, self.word_ids())?));
                }
                events.push(InlineEvent::Start {
                    layer: ser.layer.clone(),
                    attrs,
                    edges: ser.edges,
                });
                stack.push((ser.layer, endpoint));
            }
            events.push(InlineEvent::Terminal(word));
        }
        while let Some((layer, _)) = stack.pop() {
            events.push(InlineEvent::End { layer });
        }
        Ok(events)
    }
}
