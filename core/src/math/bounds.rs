use serde::{Deserialize, Serialize};

use crate::detection::GeoPoint;

/// Axis-aligned latitude/longitude box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl GeoBounds {
    pub fn around(point: GeoPoint) -> Self {
        Self {
            south: point.lat,
            west: point.lng,
            north: point.lat,
            east: point.lng,
        }
    }

    /// Smallest box holding every point, or `None` for an empty input.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = GeoPoint>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self::around(first), |bounds, point| bounds.extended(point)))
    }

    pub fn extended(self, point: GeoPoint) -> Self {
        Self {
            south: self.south.min(point.lat),
            west: self.west.min(point.lng),
            north: self.north.max(point.lat),
            east: self.east.max(point.lng),
        }
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        (self.south..=self.north).contains(&point.lat)
            && (self.west..=self.east).contains(&point.lng)
    }
}
