//! Geospatial detection display engine for road-defect triage maps.
//!
//! Holds a validated batch of detections and turns filter, render-mode,
//! viewport and selection state into plain data for whatever draws the map.
//! Data flows store -> filter -> clusters or heatmap -> frame, and user input
//! flows back through [`MapEngine`].

pub mod detection;
pub mod engine;
pub mod filter;
pub mod layers;
pub mod math;
pub mod mode;
pub mod notify;
pub mod prelude;
pub mod selection;
pub mod store;
pub mod telemetry;
pub mod viewport;

pub use engine::{Activation, MapEngine, MapFrame};
pub use prelude::{EngineConfig, MapLayer};
