use std::f64::consts::PI;

use crate::detection::GeoPoint;

/// Side length of a map tile in pixels.
pub const TILE_SIZE: f64 = 256.0;
/// Latitude limit of the square Web-Mercator world.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_6;

/// Position in world pixel space at a given zoom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_sq(&self, other: &PixelPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Spherical Web-Mercator projection as used by slippy-map tiles.
pub struct WebMercator;

impl WebMercator {
    pub fn world_size(zoom: u8) -> f64 {
        TILE_SIZE * 2f64.powi(i32::from(zoom))
    }

    pub fn project(point: GeoPoint, zoom: u8) -> PixelPoint {
        let size = Self::world_size(zoom);
        let lat = point.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        let sin = lat.sin();
        let x = (point.lng + 180.0) / 360.0 * size;
        let y = (0.5 - ((1.0 + sin) / (1.0 - sin)).ln() / (4.0 * PI)) * size;
        PixelPoint::new(x, y)
    }

    pub fn unproject(pixel: PixelPoint, zoom: u8) -> GeoPoint {
        let size = Self::world_size(zoom);
        let lng = pixel.x / size * 360.0 - 180.0;
        let n = PI - 2.0 * PI * pixel.y / size;
        let lat = n.sinh().atan().to_degrees();
        GeoPoint::new(lat, lng)
    }
}
