//! Record types for the ad export and the four normalized outputs.
//!
//! The input side is a fixed-field view of one export row; every optional
//! column defaults to an empty string so that absent columns never shrink
//! the output shape. The output side mirrors the table columns the database
//! loader binds to, in order.

use serde::Serialize;

/// Column holding the shared row identifier.
pub const ID_COLUMN: &str = "id";
/// Column holding the markup-bearing ad text.
pub const MESSAGE_COLUMN: &str = "message";
/// Column holding the JSON list of entity mentions.
pub const ENTITIES_COLUMN: &str = "entities";
/// Column holding the JSON targeting structure.
pub const TARGETS_COLUMN: &str = "targets";

pub const MESSAGE_HEADERS: [&str; 2] = ["id", "message"];
pub const ENTITY_HEADERS: [&str; 3] = ["id", "entity", "entity_type"];
pub const TARGET_HEADERS: [&str; 3] = ["id", "target", "segment"];
pub const METADATA_HEADERS: [&str; 20] = [
    "id",
    "political",
    "not_political",
    "title",
    "thumbnail",
    "created_at",
    "updated_at",
    "lang",
    "images",
    "impressions",
    "political_probability",
    "targeting",
    "suppressed",
    "advertiser",
    "page",
    "lower_page",
    "targetings",
    "paid_for_by",
    "targetedness",
    "listbuilding_fundraising_proba",
];

/// One denormalized row of the export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdRecord {
    pub id: String,
    pub message: String,
    pub entities: String,
    pub targets: String,
    pub metadata: RawMetadata,
}

/// Scalar metadata columns exactly as they appear in the export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMetadata {
    pub political: String,
    pub not_political: String,
    pub title: String,
    pub thumbnail: String,
    pub created_at: String,
    pub updated_at: String,
    pub lang: String,
    pub images: String,
    pub impressions: String,
    pub political_probability: String,
    pub targeting: String,
    pub suppressed: String,
    pub advertiser: String,
    pub page: String,
    pub lower_page: String,
    pub targetings: String,
    pub paid_for_by: String,
    pub targetedness: String,
    pub listbuilding_fundraising_proba: String,
}

impl RawMetadata {
    /// Build from a column lookup; columns the lookup can't find stay empty.
    pub fn from_lookup<F>(mut column: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut get = |name: &str| column(name).unwrap_or_default();
        Self {
            political: get("political"),
            not_political: get("not_political"),
            title: get("title"),
            thumbnail: get("thumbnail"),
            created_at: get("created_at"),
            updated_at: get("updated_at"),
            lang: get("lang"),
            images: get("images"),
            impressions: get("impressions"),
            political_probability: get("political_probability"),
            targeting: get("targeting"),
            suppressed: get("suppressed"),
            advertiser: get("advertiser"),
            page: get("page"),
            lower_page: get("lower_page"),
            targetings: get("targetings"),
            paid_for_by: get("paid_for_by"),
            targetedness: get("targetedness"),
            listbuilding_fundraising_proba: get("listbuilding_fundraising_proba"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageRecord {
    pub id: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityRecord {
    pub id: String,
    pub entity: String,
    pub entity_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetRecord {
    pub id: String,
    pub target: String,
    pub segment: String,
}

/// Placeholder dimension/segment written when an ad carries no targeting.
pub const SENTINEL: &str = "none";

impl TargetRecord {
    pub fn sentinel(id: &str) -> Self {
        Self {
            id: id.to_string(),
            target: SENTINEL.to_string(),
            segment: SENTINEL.to_string(),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.target == SENTINEL && self.segment == SENTINEL
    }
}

/// Rows produced from one nested column, plus whether its JSON was unusable.
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposed<T> {
    pub records: Vec<T>,
    pub parse_failed: bool,
}

/// Field order must match [`METADATA_HEADERS`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetadataRecord {
    pub id: String,
    pub political: i64,
    pub not_political: i64,
    pub title: String,
    pub thumbnail: String,
    pub created_at: String,
    pub updated_at: String,
    pub lang: String,
    pub images: String,
    pub impressions: i64,
    pub political_probability: f64,
    pub targeting: String,
    pub suppressed: String,
    pub advertiser: String,
    pub page: String,
    pub lower_page: String,
    pub targetings: String,
    pub paid_for_by: String,
    pub targetedness: i64,
    pub listbuilding_fundraising_proba: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_field_order_matches_headers() {
        let value = serde_json::to_value(MetadataRecord::default()).unwrap();
        let keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(|k| k.as_str())
            .collect();
        assert_eq!(keys, METADATA_HEADERS.to_vec());
    }

    #[test]
    fn test_raw_metadata_missing_columns_default_empty() {
        let raw = RawMetadata::from_lookup(|name| match name {
            "title" => Some("Ad title".to_string()),
            _ => None,
        });
        assert_eq!(raw.title, "Ad title");
        assert_eq!(raw.impressions, "");
        assert_eq!(raw.paid_for_by, "");
    }

    #[test]
    fn test_sentinel_record() {
        let record = TargetRecord::sentinel("A1");
        assert_eq!(record.target, "none");
        assert_eq!(record.segment, "none");
        assert!(record.is_sentinel());
    }
}
