use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::detection::{DetectionRecord, GeoPoint};
use crate::math::{GridHelper, PixelPoint, WebMercator};
use crate::prelude::MapLayer;
use crate::viewport::Viewport;

/// Weighted point handed to the density renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatPoint {
    pub lat: f64,
    pub lng: f64,
    pub weight: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub at: f32,
    pub color: [u8; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapOptions {
    pub radius_px: f32,
    pub blur_px: f32,
    /// Zoom at which points reach full intensity.
    pub max_zoom: u8,
    pub max: f32,
    pub gradient: Vec<GradientStop>,
}

impl Default for HeatmapOptions {
    fn default() -> Self {
        Self {
            radius_px: 25.0,
            blur_px: 15.0,
            max_zoom: 17,
            max: 1.0,
            gradient: vec![
                GradientStop {
                    at: 0.4,
                    color: [0, 0, 255],
                },
                GradientStop {
                    at: 0.65,
                    color: [0, 255, 0],
                },
                GradientStop {
                    at: 1.0,
                    color: [255, 0, 0],
                },
            ],
        }
    }
}

/// Density weight of a detection, taken from the severity table.
pub fn weight(record: &DetectionRecord) -> f32 {
    record.severity.heat_weight()
}

/// One weighted point per record, whatever the filter state.
pub fn heatmap_points(records: &[DetectionRecord]) -> Vec<HeatPoint> {
    records.iter().map(heat_point).collect()
}

fn heat_point(record: &DetectionRecord) -> HeatPoint {
    HeatPoint {
        lat: record.position.lat,
        lng: record.position.lng,
        weight: weight(record),
    }
}

#[derive(Debug, Clone, Default)]
pub struct HeatmapLayer {
    options: HeatmapOptions,
}

impl HeatmapLayer {
    pub fn new(options: HeatmapOptions) -> Self {
        Self { options }
    }

    pub fn rasterize(
        &self,
        points: &[HeatPoint],
        viewport: &Viewport,
        width: f32,
        height: f32,
    ) -> HeatGrid {
        HeatGrid::rasterize(points, viewport, width, height, &self.options)
    }
}

impl MapLayer for HeatmapLayer {
    type Output = Vec<HeatPoint>;

    fn render(&self, records: &[&DetectionRecord], _viewport: &Viewport) -> Self::Output {
        records.iter().map(|record| heat_point(record)).collect()
    }
}

/// Screen-aligned intensity raster, row-major, values in `0.0..=1.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatGrid {
    pub cell_px: f32,
    pub intensity: Array2<f32>,
}

impl HeatGrid {
    pub fn rasterize(
        points: &[HeatPoint],
        viewport: &Viewport,
        width: f32,
        height: f32,
        options: &HeatmapOptions,
    ) -> Self {
        let cell_px = (options.radius_px / 2.0).max(1.0);
        let cols = (width.max(0.0) / cell_px).ceil() as usize;
        let rows = (height.max(0.0) / cell_px).ceil() as usize;
        let mut grid = Array2::<f32>::zeros((rows, cols));
        if rows == 0 || cols == 0 {
            return Self {
                cell_px,
                intensity: grid,
            };
        }

        let zoom = viewport.zoom;
        let origin = WebMercator::project(viewport.center, zoom);
        let zoom_gap = i32::from(options.max_zoom) - i32::from(zoom);
        let zoom_scale = 1.0 / 2f32.powi(zoom_gap.clamp(0, 12));
        let splat = (options.radius_px / cell_px).ceil() as i64;

        for point in points {
            let pixel = WebMercator::project(GeoPoint::new(point.lat, point.lng), zoom);
            let screen = PixelPoint::new(
                pixel.x - origin.x + f64::from(width) / 2.0,
                pixel.y - origin.y + f64::from(height) / 2.0,
            );
            let col = (screen.x / f64::from(cell_px)).floor() as i64;
            let row = (screen.y / f64::from(cell_px)).floor() as i64;
            let value = point.weight * zoom_scale;

            for dr in -splat..=splat {
                for dc in -splat..=splat {
                    let (r, c) = (row + dr, col + dc);
                    if r < 0 || c < 0 || r >= rows as i64 || c >= cols as i64 {
                        continue;
                    }
                    let distance = ((dr * dr + dc * dc) as f32).sqrt();
                    let falloff = 1.0 - distance / (splat as f32 + 1.0);
                    if falloff > 0.0 {
                        grid[[r as usize, c as usize]] += value * falloff;
                    }
                }
            }
        }

        let blur_cells = (options.blur_px / cell_px).round() as usize;
        let max = if options.max > 0.0 { options.max } else { 1.0 };
        let intensity =
            GridHelper::box_blur(&grid, blur_cells).mapv(|v| (v / max).clamp(0.0, 1.0));
        Self { cell_px, intensity }
    }

    pub fn peak(&self) -> f32 {
        self.intensity.iter().copied().fold(0.0, f32::max)
    }
}

/// RGBA colour for a normalized intensity. Below the first stop the first
/// colour fades out; above it colours are interpolated between stops.
pub fn gradient_color(gradient: &[GradientStop], value: f32) -> [u8; 4] {
    let value = value.clamp(0.0, 1.0);
    let Some(first) = gradient.first() else {
        return [0, 0, 0, 0];
    };
    if value <= 0.0 {
        return [0, 0, 0, 0];
    }
    if value < first.at {
        let alpha = (value / first.at * 255.0).round() as u8;
        return [first.color[0], first.color[1], first.color[2], alpha];
    }
    for pair in gradient.windows(2) {
        let (low, high) = (pair[0], pair[1]);
        if value <= high.at {
            let span = (high.at - low.at).max(f32::EPSILON);
            let t = (value - low.at) / span;
            let mix =
                |a: u8, b: u8| (f32::from(a) + (f32::from(b) - f32::from(a)) * t).round() as u8;
            return [
                mix(low.color[0], high.color[0]),
                mix(low.color[1], high.color[1]),
                mix(low.color[2], high.color[2]),
                255,
            ];
        }
    }
    let last = gradient[gradient.len() - 1];
    [last.color[0], last.color[1], last.color[2], 255]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::record::fixtures::record;

    #[test]
    fn weights_follow_severity() {
        assert_eq!(weight(&record("A", "severe", 51.5, -0.1)), 1.0);
        assert_eq!(weight(&record("B", "moderate", 51.5, -0.1)), 0.6);
        assert_eq!(weight(&record("C", "minor", 51.5, -0.1)), 0.3);
    }

    #[test]
    fn every_record_becomes_a_point() {
        let records = vec![
            record("A", "severe", 51.50, -0.10),
            record("B", "minor", 51.51, -0.11),
        ];
        let points = heatmap_points(&records);
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].lat, 51.51);
        assert_eq!(points[1].weight, 0.3);
        assert!(heatmap_points(&[]).is_empty());
    }

    #[test]
    fn raster_peaks_at_the_viewport_centre() {
        let options = HeatmapOptions::default();
        let view = Viewport::new(GeoPoint::new(51.5, -0.1), 17);
        let points = [HeatPoint {
            lat: 51.5,
            lng: -0.1,
            weight: 1.0,
        }];
        let grid = HeatGrid::rasterize(&points, &view, 250.0, 250.0, &options);
        assert_eq!(grid.intensity.dim(), (20, 20));
        let peak = grid.peak();
        assert!(peak > 0.4);
        assert_eq!(grid.intensity[[10, 10]], peak);
        assert_eq!(grid.intensity[[0, 0]], 0.0);
    }

    #[test]
    fn lower_zoom_dims_points() {
        let options = HeatmapOptions::default();
        let points = [HeatPoint {
            lat: 51.5,
            lng: -0.1,
            weight: 1.0,
        }];
        let centre = GeoPoint::new(51.5, -0.1);
        let near = HeatGrid::rasterize(&points, &Viewport::new(centre, 17), 250.0, 250.0, &options);
        let far = HeatGrid::rasterize(&points, &Viewport::new(centre, 15), 250.0, 250.0, &options);
        assert!((far.peak() - near.peak() / 4.0).abs() < 1e-4);
    }

    #[test]
    fn empty_surface_is_empty_grid() {
        let view = Viewport::new(GeoPoint::new(0.0, 0.0), 3);
        let grid = HeatGrid::rasterize(&[], &view, 0.0, 100.0, &HeatmapOptions::default());
        assert!(grid.intensity.is_empty());
    }

    #[test]
    fn gradient_interpolates_between_stops() {
        let gradient = HeatmapOptions::default().gradient;
        assert_eq!(gradient_color(&gradient, 0.0), [0, 0, 0, 0]);
        assert_eq!(gradient_color(&gradient, 0.2), [0, 0, 255, 128]);
        assert_eq!(gradient_color(&gradient, 0.4), [0, 0, 255, 255]);
        assert_eq!(gradient_color(&gradient, 0.65), [0, 255, 0, 255]);
        assert_eq!(gradient_color(&gradient, 1.0), [255, 0, 0, 255]);
        assert_eq!(gradient_color(&[], 0.5), [0, 0, 0, 0]);
    }
}
