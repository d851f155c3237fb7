//! Entity decomposition for the `entities` column.
//!
//! Pure functions, no I/O. The column holds a JSON list of
//! `{"entity": ..., "entity_type": ...}` objects; it is parsed once into
//! [`EntityMentions`] and then flattened into one [`EntityRecord`] per
//! mention, in source order.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::record::{Decomposed, EntityRecord};

/// A single entity mention as it appears in the export.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EntityMention {
    pub entity: String,
    /// Missing and `null` both read as no type.
    #[serde(default)]
    pub entity_type: Option<String>,
}

/// Parsed entity list of one ad.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityMentions {
    pub mentions: Vec<EntityMention>,
}

impl EntityMentions {
    /// Parse the raw column. Blank input is an empty list, not an error;
    /// so is a JSON `null`.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        let mentions: Option<Vec<EntityMention>> = serde_json::from_str(trimmed)?;
        Ok(Self {
            mentions: mentions.unwrap_or_default(),
        })
    }

    /// Tag every mention with the row id. Text and type pass through verbatim.
    pub fn into_records(self, id: &str) -> Vec<EntityRecord> {
        self.mentions
            .into_iter()
            .map(|m| EntityRecord {
                id: id.to_string(),
                entity: m.entity,
                entity_type: m.entity_type.unwrap_or_default(),
            })
            .collect()
    }
}

/// Produce the entity rows for one ad.
///
/// An unparseable column degrades to no rows; the caller still writes the
/// ad's other outputs.
pub fn decompose_entities(id: &str, raw: &str) -> Decomposed<EntityRecord> {
    match EntityMentions::parse(raw) {
        Ok(mentions) => {
            let records = mentions.into_records(id);
            debug!("Row {}: {} entities", id, records.len());
            Decomposed {
                records,
                parse_failed: false,
            }
        }
        Err(e) => {
            warn!("Row {}: unparseable entities column, writing none: {}", id, e);
            Decomposed {
                records: Vec::new(),
                parse_failed: true,
            }
        }
    }
}
