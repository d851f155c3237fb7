//! Targeting decomposition for the `targets` column.
//!
//! The export stores targeting as JSON in one of two shapes:
//!
//! - a list of `{"target": "Age", "segment": "18 and older"}` objects, where
//!   a dimension may repeat and `segment` may be missing or null;
//! - an object mapping dimension to value, e.g.
//!   `{"Age": "34 and older", "MinAge": 34}`, where an array value stands for
//!   a repeated dimension.
//!
//! Both are parsed once into a [`TargetingSpec`] of ordered
//! (dimension, segment) pairs. An ad without usable targeting yields exactly
//! one sentinel row so every id still appears in the targets table.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::record::{Decomposed, TargetRecord};

/// One targeting dimension with its (possibly empty) segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPair {
    pub target: String,
    pub segment: String,
}

/// Flattened targeting criteria of one ad, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetingSpec {
    pub pairs: Vec<TargetPair>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTargeting {
    List(Vec<RawTarget>),
    Map(serde_json::Map<String, Value>),
}

#[derive(Deserialize)]
struct RawTarget {
    target: String,
    #[serde(default)]
    segment: Option<Value>,
}

impl TargetingSpec {
    /// Parse the raw column. Blank input and JSON `null` are empty specs.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        let parsed: Option<RawTargeting> = serde_json::from_str(trimmed)?;
        let pairs = match parsed {
            None => Vec::new(),
            Some(RawTargeting::List(items)) => items
                .into_iter()
                .map(|t| TargetPair {
                    target: t.target,
                    segment: segment_text(t.segment.as_ref()),
                })
                .collect(),
            Some(RawTargeting::Map(map)) => {
                let mut pairs = Vec::with_capacity(map.len());
                for (target, value) in map {
                    match value {
                        Value::Array(values) if !values.is_empty() => {
                            for v in values {
                                pairs.push(TargetPair {
                                    target: target.clone(),
                                    segment: segment_text(Some(&v)),
                                });
                            }
                        }
                        Value::Array(_) => pairs.push(TargetPair {
                            target,
                            segment: String::new(),
                        }),
                        other => pairs.push(TargetPair {
                            target,
                            segment: segment_text(Some(&other)),
                        }),
                    }
                }
                pairs
            }
        };
        Ok(Self { pairs })
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Tag every pair with the row id, or emit the sentinel when empty.
    pub fn into_records(self, id: &str) -> Vec<TargetRecord> {
        if self.is_empty() {
            return vec![TargetRecord::sentinel(id)];
        }
        self.pairs
            .into_iter()
            .map(|p| TargetRecord {
                id: id.to_string(),
                target: p.target,
                segment: p.segment,
            })
            .collect()
    }
}

/// Render a segment value as text. Strings pass through unquoted; null is
/// the empty segment.
fn segment_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Produce the target rows for one ad. Always returns at least one row.
pub fn decompose_targets(id: &str, raw: &str) -> Decomposed<TargetRecord> {
    match TargetingSpec::parse(raw) {
        Ok(spec) => {
            let records = spec.into_records(id);
            debug!("Row {}: {} target rows", id, records.len());
            Decomposed {
                records,
                parse_failed: false,
            }
        }
        Err(e) => {
            warn!("Row {}: unparseable targets column, writing sentinel: {}", id, e);
            Decomposed {
                records: vec![TargetRecord::sentinel(id)],
                parse_failed: true,
            }
        }
    }
}
