use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::detection::Severity;
use crate::prelude::RecordError;

/// WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Descriptive fields shown in the detail panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionMetadata {
    pub location: String,
    pub depth_category: String,
    pub vehicle_speed: Option<u32>,
    pub vehicle_count: u32,
    pub model: String,
    pub explanation: String,
    pub snapshot: String,
}

/// A validated road-defect detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub id: String,
    pub position: GeoPoint,
    pub severity: Severity,
    pub confidence: u8,
    pub detected_at: DateTime<Utc>,
    pub metadata: DetectionMetadata,
}

/// Detection as it arrives on the feed. Every field is optional so a broken
/// entry still deserializes and can be rejected on its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDetection {
    pub id: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub severity: Option<String>,
    pub confidence: Option<i64>,
    pub detected_at: Option<String>,
    pub location: Option<String>,
    pub depth_category: Option<String>,
    pub vehicle_speed: Option<u32>,
    pub vehicle_count: Option<u32>,
    pub model: Option<String>,
    pub snapshot: Option<String>,
    pub explanation: Option<String>,
}

impl From<&DetectionRecord> for RawDetection {
    fn from(record: &DetectionRecord) -> Self {
        Self {
            id: Some(record.id.clone()),
            lat: Some(record.position.lat),
            lng: Some(record.position.lng),
            severity: Some(record.severity.label().to_string()),
            confidence: Some(i64::from(record.confidence)),
            detected_at: Some(record.detected_at.to_rfc3339()),
            location: Some(record.metadata.location.clone()),
            depth_category: Some(record.metadata.depth_category.clone()),
            vehicle_speed: record.metadata.vehicle_speed,
            vehicle_count: Some(record.metadata.vehicle_count),
            model: Some(record.metadata.model.clone()),
            snapshot: Some(record.metadata.snapshot.clone()),
            explanation: Some(record.metadata.explanation.clone()),
        }
    }
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, RecordError> {
    value.ok_or(RecordError::MissingField(field))
}

fn required_text(value: Option<String>, field: &'static str) -> Result<String, RecordError> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(RecordError::MissingField(field)),
    }
}

impl TryFrom<RawDetection> for DetectionRecord {
    type Error = RecordError;

    fn try_from(raw: RawDetection) -> Result<Self, Self::Error> {
        let id = required_text(raw.id, "id")?;
        let position = GeoPoint::new(required(raw.lat, "lat")?, required(raw.lng, "lng")?);
        if !position.is_valid() {
            return Err(RecordError::CoordinateOutOfRange {
                lat: position.lat,
                lng: position.lng,
            });
        }

        let severity = required(raw.severity, "severity")?.parse()?;

        let confidence = required(raw.confidence, "confidence")?;
        let confidence = u8::try_from(confidence)
            .ok()
            .filter(|value| *value <= 100)
            .ok_or(RecordError::ConfidenceOutOfRange(confidence))?;

        let stamp = required(raw.detected_at, "detectedAt")?;
        let detected_at = DateTime::parse_from_rfc3339(&stamp)
            .map_err(|_| RecordError::InvalidTimestamp(stamp.clone()))?
            .with_timezone(&Utc);

        Ok(Self {
            id,
            position,
            severity,
            confidence,
            detected_at,
            metadata: DetectionMetadata {
                location: required_text(raw.location, "location")?,
                depth_category: raw.depth_category.unwrap_or_default(),
                vehicle_speed: raw.vehicle_speed,
                vehicle_count: raw.vehicle_count.unwrap_or(1),
                model: raw.model.unwrap_or_default(),
                explanation: raw.explanation.unwrap_or_default(),
                snapshot: raw.snapshot.unwrap_or_default(),
            },
        })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn raw(id: &str, severity: &str, lat: f64, lng: f64) -> RawDetection {
        RawDetection {
            id: Some(id.to_string()),
            lat: Some(lat),
            lng: Some(lng),
            severity: Some(severity.to_string()),
            confidence: Some(90),
            detected_at: Some("2023-10-25T08:30:00Z".to_string()),
            location: Some(format!("{id} street")),
            depth_category: Some("Deep (>5cm)".to_string()),
            vehicle_speed: Some(25),
            vehicle_count: Some(3),
            model: Some("Vision-Detect-v2.1".to_string()),
            snapshot: Some(format!("/potholes/{id}.png")),
            explanation: Some("Surface depression pattern.".to_string()),
        }
    }

    pub fn record(id: &str, severity: &str, lat: f64, lng: f64) -> DetectionRecord {
        DetectionRecord::try_from(raw(id, severity, lat, lng)).unwrap()
    }
}
