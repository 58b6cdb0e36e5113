use serde::{Deserialize, Serialize};

use crate::detection::GeoPoint;
use crate::prelude::ViewportError;

/// Camera position requested by the user or by navigation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: GeoPoint,
    pub zoom: u8,
}

impl Viewport {
    pub fn new(center: GeoPoint, zoom: u8) -> Self {
        Self { center, zoom }
    }
}

/// Applies camera moves. `revision` only advances when the view actually
/// changes, so a presentation layer can skip redundant redraws.
#[derive(Debug, Clone)]
pub struct ViewportController {
    current: Viewport,
    initial: Viewport,
    min_zoom: u8,
    max_zoom: u8,
    revision: u64,
}

impl ViewportController {
    pub fn new(initial: Viewport, min_zoom: u8, max_zoom: u8) -> Self {
        let max_zoom = max_zoom.max(min_zoom);
        let initial = Viewport::new(initial.center, initial.zoom.clamp(min_zoom, max_zoom));
        Self {
            current: initial,
            initial,
            min_zoom,
            max_zoom,
            revision: 0,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.current
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn max_zoom(&self) -> u8 {
        self.max_zoom
    }

    /// Overwrites the view. Zoom is clamped to the configured range; returns
    /// whether anything changed.
    pub fn set_view(&mut self, center: GeoPoint, zoom: u8) -> Result<bool, ViewportError> {
        if !center.is_valid() {
            return Err(ViewportError::InvalidCenter {
                lat: center.lat,
                lng: center.lng,
            });
        }
        let next = Viewport::new(center, zoom.clamp(self.min_zoom, self.max_zoom));
        if next == self.current {
            return Ok(false);
        }
        self.current = next;
        self.revision += 1;
        Ok(true)
    }

    pub fn zoom_in(&mut self) -> bool {
        self.apply_zoom(self.current.zoom.saturating_add(1))
    }

    pub fn zoom_out(&mut self) -> bool {
        self.apply_zoom(self.current.zoom.saturating_sub(1))
    }

    pub fn reset(&mut self) -> bool {
        let initial = self.initial;
        self.set_view(initial.center, initial.zoom).unwrap_or(false)
    }

    fn apply_zoom(&mut self, zoom: u8) -> bool {
        let center = self.current.center;
        self.set_view(center, zoom).unwrap_or(false)
    }
}
