//! Token spans and their symbolic text encoding.
//!
//! A span is a union of half-open token intervals stored as a flat list of
//! bounds `[s0, e0, s1, e1, ...]`. On the wire, spans are written with the
//! symbolic word IDs of the first and last token of each interval, so that
//! they survive re-numbering of positions: `w1..w3,w7`.

use serde::{Deserialize, Serialize};

use crate::alphabet::Alphabet;
use crate::error::{ExmlError, ExmlResult};

/// An ordered union of half-open token intervals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct Span {
    bounds: Vec<usize>,
}

impl Span {
    /// Build a span from flat bounds.
    ///
    /// Every interval must be non-empty and start at or after the end of the
    /// previous one.
    pub fn new(bounds: Vec<usize>) -> ExmlResult<Self> {
        if bounds.is_empty() || bounds.len() % 2 != 0 {
            return Err(ExmlError::InvalidSpan {
                bounds,
                reason: "expected a non-empty list of (start, end) pairs".into(),
            });
        }
        for pair in bounds.chunks(2) {
            if pair[1] <= pair[0] {
                return Err(ExmlError::InvalidSpan {
                    reason: format!("interval {}..{} is empty", pair[0], pair[1]),
                    bounds,
                });
            }
        }
        for i in (2..bounds.len()).step_by(2) {
            if bounds[i] < bounds[i - 1] {
                return Err(ExmlError::InvalidSpan {
                    reason: format!(
                        "interval {}..{} starts before the end of {}..{}",
                        bounds[i],
                        bounds[i + 1],
                        bounds[i - 2],
                        bounds[i - 1]
                    ),
                    bounds,
                });
            }
        }
        Ok(Self { bounds })
    }

    /// Contiguous span `start..end`. `end` must be greater than `start`.
    pub fn range(start: usize, end: usize) -> ExmlResult<Self> {
        Self::new(vec![start, end])
    }

    /// The span of the single token at `pos`.
    pub fn token(pos: usize) -> Self {
        Self {
            bounds: vec![pos, pos + 1],
        }
    }

    /// Group token positions into maximal contiguous intervals.
    ///
    /// Positions are sorted first and duplicates are ignored.
    pub fn from_positions(positions: &[usize], offset: usize) -> ExmlResult<Self> {
        let mut sorted = positions.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        let mut bounds: Vec<usize> = Vec::new();
        for pos in sorted {
            let pos = pos + offset;
            if bounds.last() == Some(&pos) {
                let n = bounds.len();
                bounds[n - 1] = pos + 1;
            } else {
                bounds.push(pos);
                bounds.push(pos + 1);
            }
        }
        Self::new(bounds)
    }

    pub fn start(&self) -> usize {
        self.bounds[0]
    }

    /// Exclusive end of the last interval.
    pub fn end(&self) -> usize {
        self.bounds[self.bounds.len() - 1]
    }

    pub fn bounds(&self) -> &[usize] {
        &self.bounds
    }

    pub fn intervals(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.bounds.chunks(2).map(|pair| (pair[0], pair[1]))
    }

    pub fn is_contiguous(&self) -> bool {
        self.bounds.len() == 2
    }

    /// All covered token positions, in order.
    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.intervals().flat_map(|(s, e)| s..e)
    }

    pub fn shifted(&self, offset: usize) -> Self {
        Self {
            bounds: self.bounds.iter().map(|b| b + offset).collect(),
        }
    }
}

impl TryFrom<Vec<usize>> for Span {
    type Error = ExmlError;

    fn try_from(bounds: Vec<usize>) -> Result<Self, Self::Error> {
        Span::new(bounds)
    }
}

impl From<Span> for Vec<usize> {
    fn from(span: Span) -> Self {
        span.bounds
    }
}

/// Encode a span with the symbolic word IDs of `word_ids`.
///
/// Intervals of one token are written as a single ID, wider ones as
/// `first..last` (both inclusive), and intervals are joined by commas.
pub fn encode_span(span: &Span, word_ids: &Alphabet<String>) -> ExmlResult<String> {
    let symbol = |pos: usize| {
        word_ids
            .symbol_at(pos)
            .map(|s| s.as_str())
            .ok_or_else(|| ExmlError::unresolved(&pos.to_string(), "span encoding"))
    };
    let mut parts = Vec::new();
    for (start, end) in span.intervals() {
        if end == start + 1 {
            parts.push(symbol(start)?.to_string());
        } else {
            parts.push(format!("{}..{}", symbol(start)?, symbol(end - 1)?));
        }
    }
    Ok(parts.join(","))
}

/// Decode the textual form produced by [`encode_span`].
///
/// Every symbol must already be known; decoding never assigns new positions.
pub fn decode_span(text: &str, word_ids: &Alphabet<String>) -> ExmlResult<Span> {
    let lookup = |symbol: &str| {
        word_ids
            .get_str(symbol.trim())
            .ok_or_else(|| ExmlError::unresolved(symbol, format!("span '{}'", text)))
    };
    let mut bounds = Vec::new();
    for part in text.split(',') {
        match part.split_once("..") {
            Some((first, last)) => {
                bounds.push(lookup(first)?);
                bounds.push(lookup(last)? + 1);
            }
            None => {
                let pos = lookup(part)?;
                bounds.push(pos);
                bounds.push(pos + 1);
            }
        }
    }
    Span::new(bounds)
}
