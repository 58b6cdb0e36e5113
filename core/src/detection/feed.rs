use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::detection::RawDetection;
use crate::prelude::FeedError;

/// One element of a feed array.
///
/// Elements are decoded one at a time, so a single entry with a field of the
/// wrong JSON type is kept as `Malformed` and rejected on its own at load.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEntry {
    Decoded(RawDetection),
    Malformed { value: Value, reason: String },
}

impl FeedEntry {
    pub fn decode(value: Value) -> Self {
        match RawDetection::deserialize(&value) {
            Ok(raw) => FeedEntry::Decoded(raw),
            Err(err) => FeedEntry::Malformed {
                reason: err.to_string(),
                value,
            },
        }
    }

    /// Best-effort id, for rejection reports.
    pub fn id(&self) -> Option<String> {
        match self {
            FeedEntry::Decoded(raw) => raw.id.clone(),
            FeedEntry::Malformed { value, .. } => {
                value.get("id").and_then(Value::as_str).map(str::to_owned)
            }
        }
    }
}

impl From<RawDetection> for FeedEntry {
    fn from(raw: RawDetection) -> Self {
        FeedEntry::Decoded(raw)
    }
}

impl Serialize for FeedEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FeedEntry::Decoded(raw) => raw.serialize(serializer),
            FeedEntry::Malformed { value, .. } => value.serialize(serializer),
        }
    }
}

/// Wrapped feed document, `{ "detections": [...] }`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeedDocument {
    pub detections: Vec<FeedEntry>,
}

/// Parses a feed that is either a bare JSON array or a wrapped document.
/// Only a document that is not JSON, or has the wrong outer shape, fails as a
/// whole.
pub fn parse_feed(contents: &str) -> Result<Vec<FeedEntry>, FeedError> {
    let value: Value = serde_json::from_str(contents)?;
    let elements = match value {
        Value::Array(elements) => elements,
        Value::Object(mut map) => match map.remove("detections") {
            Some(Value::Array(elements)) => elements,
            Some(other) => {
                return Err(FeedError::Shape(format!(
                    "`detections` must be an array, found {}",
                    json_kind(&other)
                )))
            }
            None => {
                return Err(FeedError::Shape(
                    "object without a `detections` array".into(),
                ))
            }
        },
        other => {
            return Err(FeedError::Shape(format!(
                "expected array or object, found {}",
                json_kind(&other)
            )))
        }
    };
    Ok(elements.into_iter().map(FeedEntry::decode).collect())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoded(entry: &FeedEntry) -> &RawDetection {
        match entry {
            FeedEntry::Decoded(raw) => raw,
            FeedEntry::Malformed { reason, .. } => panic!("unexpected malformed entry: {reason}"),
        }
    }

    #[test]
    fn bare_array_parses() {
        let feed = r#"[{"id": "P-1", "lat": 51.5, "lng": -0.1, "severity": "severe"}]"#;
        let entries = parse_feed(feed).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(decoded(&entries[0]).severity.as_deref(), Some("severe"));
    }

    #[test]
    fn wrapped_document_parses_camel_case_fields() {
        let feed = r#"{"detections": [
            {"id": "P-2", "detectedAt": "2023-10-25T09:15:00Z", "vehicleCount": 2}
        ]}"#;
        let entries = parse_feed(feed).unwrap();
        let raw = decoded(&entries[0]);
        assert_eq!(raw.detected_at.as_deref(), Some("2023-10-25T09:15:00Z"));
        assert_eq!(raw.vehicle_count, Some(2));
    }

    #[test]
    fn wrong_shapes_are_reported() {
        assert!(matches!(parse_feed("42"), Err(FeedError::Shape(_))));
        assert!(matches!(parse_feed(r#"{"items": []}"#), Err(FeedError::Shape(_))));
        assert!(matches!(parse_feed(r#"{"detections": 3}"#), Err(FeedError::Shape(_))));
        assert!(matches!(parse_feed("[oops"), Err(FeedError::Syntax(_))));
    }

    #[test]
    fn missing_fields_still_deserialize() {
        let entries = parse_feed(r#"[{}]"#).unwrap();
        assert_eq!(entries[0], FeedEntry::Decoded(RawDetection::default()));
    }

    #[test]
    fn mistyped_entry_is_isolated() {
        let feed = r#"[
            {"id": "P-1", "confidence": 87},
            {"id": "P-2", "confidence": 87.5},
            {"id": "P-3", "lat": "51.5"},
            null
        ]"#;
        let entries = parse_feed(feed).unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(decoded(&entries[0]).confidence, Some(87));
        for entry in &entries[1..] {
            assert!(matches!(entry, FeedEntry::Malformed { .. }));
        }
        assert_eq!(entries[1].id().as_deref(), Some("P-2"));
        assert_eq!(entries[3].id(), None);
    }

    #[test]
    fn malformed_entries_serialize_unchanged() {
        let entries = parse_feed(r#"[{"id": "P-2", "confidence": 87.5}]"#).unwrap();
        let json = serde_json::to_value(&entries).unwrap();
        assert_eq!(json[0]["confidence"], 87.5);
    }
}
