use serde::{Deserialize, Serialize};

use crate::detection::{DetectionRecord, GeoPoint};
use crate::layers::cluster::ClusterOptions;
use crate::layers::heatmap::HeatmapOptions;
use crate::viewport::Viewport;

/// Shared configuration for an engine instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub initial_view: Viewport,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub cluster: ClusterOptions,
    pub heatmap: HeatmapOptions,
    pub notification_duration_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_view: Viewport::new(GeoPoint::new(51.505, -0.09), 13),
            min_zoom: 0,
            max_zoom: 18,
            cluster: ClusterOptions::default(),
            heatmap: HeatmapOptions::default(),
            notification_duration_ms: 3000,
        }
    }
}

/// Validation failure for a single inbound detection.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("coordinate out of range: lat {lat}, lng {lng}")]
    CoordinateOutOfRange { lat: f64, lng: f64 },
    #[error("confidence {0} outside 0..=100")]
    ConfidenceOutOfRange(i64),
    #[error("unknown severity `{0}`")]
    UnknownSeverity(String),
    #[error("invalid detection timestamp `{0}`")]
    InvalidTimestamp(String),
    #[error("malformed entry: {0}")]
    Malformed(String),
    #[error("duplicate detection id `{0}`")]
    DuplicateId(String),
}

/// Failure to read a feed document as a whole.
#[derive(thiserror::Error, Debug)]
pub enum FeedError {
    #[error("feed is not valid JSON: {0}")]
    Syntax(#[from] serde_json::Error),
    #[error("feed has unexpected shape: {0}")]
    Shape(String),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PanelError {
    #[error("no detection is selected")]
    NothingSelected,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ViewportError {
    #[error("invalid map centre: lat {lat}, lng {lng}")]
    InvalidCenter { lat: f64, lng: f64 },
}

pub type PanelResult<T> = Result<T, PanelError>;

/// Presentation layer fed from the visible set.
///
/// Marker clustering and heatmap weighting both implement this so the engine
/// can pick one per render mode without knowing how either draws.
pub trait MapLayer {
    type Output;

    fn render(&self, records: &[&DetectionRecord], viewport: &Viewport) -> Self::Output;
}
