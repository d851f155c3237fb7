//! Projection of the scalar export columns into a [`MetadataRecord`].

use tracing::warn;

use crate::record::{MetadataRecord, RawMetadata};

/// Copy the scalar columns, coercing the count and probability columns.
///
/// Blank numerics become zero silently; unparseable ones become zero with a
/// warning. Text columns are passed through untouched.
pub fn project_metadata(id: &str, raw: RawMetadata) -> MetadataRecord {
    MetadataRecord {
        id: id.to_string(),
        political: coerce_int(id, "political", &raw.political),
        not_political: coerce_int(id, "not_political", &raw.not_political),
        impressions: coerce_int(id, "impressions", &raw.impressions),
        political_probability: coerce_float(
            id,
            "political_probability",
            &raw.political_probability,
        ),
        targetedness: coerce_int(id, "targetedness", &raw.targetedness),
        listbuilding_fundraising_proba: coerce_float(
            id,
            "listbuilding_fundraising_proba",
            &raw.listbuilding_fundraising_proba,
        ),
        title: raw.title,
        thumbnail: raw.thumbnail,
        created_at: raw.created_at,
        updated_at: raw.updated_at,
        lang: raw.lang,
        images: raw.images,
        targeting: raw.targeting,
        suppressed: raw.suppressed,
        advertiser: raw.advertiser,
        page: raw.page,
        lower_page: raw.lower_page,
        targetings: raw.targetings,
        paid_for_by: raw.paid_for_by,
    }
}

/// Parse an integer column. Whole-valued decimals (`"12.0"`) are accepted.
fn coerce_int(id: &str, column: &str, value: &str) -> i64 {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return 0;
    }
    if let Ok(n) = trimmed.parse::<i64>() {
        return n;
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => f as i64,
        _ => {
            warn!("Row {}: non-integer {} '{}', using 0", id, column, trimmed);
            0
        }
    }
}

fn coerce_float(id: &str, column: &str, value: &str) -> f64 {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() => f,
        _ => {
            warn!("Row {}: non-numeric {} '{}', using 0", id, column, trimmed);
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawMetadata {
        RawMetadata {
            political: "3".to_string(),
            not_political: "0".to_string(),
            title: "Friends of the Earth".to_string(),
            impressions: "1".to_string(),
            political_probability: "0.9987".to_string(),
            targeting: "<div><p>You're seeing this ad</p></div>".to_string(),
            suppressed: "f".to_string(),
            advertiser: "Friends of the Earth".to_string(),
            targetedness: "2.0".to_string(),
            listbuilding_fundraising_proba: "".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_projection_coerces_numbers() {
        let record = project_metadata("A1", raw());
        assert_eq!(record.id, "A1");
        assert_eq!(record.political, 3);
        assert_eq!(record.impressions, 1);
        assert_eq!(record.targetedness, 2);
        assert!((record.political_probability - 0.9987).abs() < 1e-12);
        assert_eq!(record.listbuilding_fundraising_proba, 0.0);
    }

    #[test]
    fn test_projection_passes_text_verbatim() {
        let record = project_metadata("A1", raw());
        assert_eq!(record.title, "Friends of the Earth");
        assert_eq!(record.targeting, "<div><p>You're seeing this ad</p></div>");
        assert_eq!(record.suppressed, "f");
        assert_eq!(record.paid_for_by, "");
    }

    #[test]
    fn test_unparseable_numbers_default_zero() {
        assert_eq!(coerce_int("A1", "political", "many"), 0);
        assert_eq!(coerce_int("A1", "political", "1.5"), 0);
        assert_eq!(coerce_int("A1", "political", " 7 "), 7);
        assert_eq!(coerce_float("A1", "political_probability", "NaN"), 0.0);
        assert_eq!(coerce_float("A1", "political_probability", "abc"), 0.0);
    }

    #[test]
    fn test_missing_everything_still_full_width() {
        let record = project_metadata("A9", RawMetadata::default());
        assert_eq!(record.id, "A9");
        assert_eq!(record.political, 0);
        assert_eq!(record.title, "");
    }
}
