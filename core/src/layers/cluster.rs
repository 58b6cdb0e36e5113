use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::detection::{DetectionRecord, GeoPoint, Severity};
use crate::math::{GeoBounds, PixelPoint, WebMercator};
use crate::prelude::MapLayer;
use crate::viewport::Viewport;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterOptions {
    /// Markers closer than this on screen share a cluster.
    pub max_cluster_radius_px: f64,
    /// At or above this zoom every marker is drawn on its own.
    pub disable_clustering_at_zoom: u8,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            max_cluster_radius_px: 80.0,
            disable_clustering_at_zoom: 18,
        }
    }
}

/// One drawable item in marker mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ClusterNode {
    Leaf {
        record: DetectionRecord,
    },
    Group {
        center: GeoPoint,
        count: usize,
        child_record_ids: Vec<String>,
        dominant_severity: Severity,
        bounds: GeoBounds,
    },
}

impl ClusterNode {
    pub fn position(&self) -> GeoPoint {
        match self {
            ClusterNode::Leaf { record } => record.position,
            ClusterNode::Group { center, .. } => *center,
        }
    }

    pub fn count(&self) -> usize {
        match self {
            ClusterNode::Leaf { .. } => 1,
            ClusterNode::Group { count, .. } => *count,
        }
    }

    /// Severity used for colouring: the record's own, or the most urgent member.
    pub fn severity(&self) -> Severity {
        match self {
            ClusterNode::Leaf { record } => record.severity,
            ClusterNode::Group {
                dominant_severity, ..
            } => *dominant_severity,
        }
    }

    pub fn color(&self) -> [u8; 3] {
        self.severity().color()
    }

    pub fn record_ids(&self) -> Vec<&str> {
        match self {
            ClusterNode::Leaf { record } => vec![record.id.as_str()],
            ClusterNode::Group {
                child_record_ids, ..
            } => child_record_ids.iter().map(String::as_str).collect(),
        }
    }
}

struct Bucket<'a> {
    members: Vec<&'a DetectionRecord>,
    sum_x: f64,
    sum_y: f64,
}

impl<'a> Bucket<'a> {
    fn seed(record: &'a DetectionRecord, pixel: PixelPoint) -> Self {
        Self {
            members: vec![record],
            sum_x: pixel.x,
            sum_y: pixel.y,
        }
    }

    fn push(&mut self, record: &'a DetectionRecord, pixel: PixelPoint) {
        self.members.push(record);
        self.sum_x += pixel.x;
        self.sum_y += pixel.y;
    }

    fn center(&self) -> PixelPoint {
        let n = self.members.len() as f64;
        PixelPoint::new(self.sum_x / n, self.sum_y / n)
    }

    fn into_node(self, zoom: u8) -> ClusterNode {
        if let [single] = self.members.as_slice() {
            return ClusterNode::Leaf {
                record: (*single).clone(),
            };
        }
        let center = WebMercator::unproject(self.center(), zoom);
        let dominant_severity = self
            .members
            .iter()
            .map(|record| record.severity)
            .max_by_key(|severity| severity.rank())
            .unwrap_or(Severity::Minor);
        let bounds = GeoBounds::from_points(self.members.iter().map(|record| record.position))
            .unwrap_or_else(|| GeoBounds::around(center));
        ClusterNode::Group {
            center,
            count: self.members.len(),
            child_record_ids: self.members.iter().map(|record| record.id.clone()).collect(),
            dominant_severity,
            bounds,
        }
    }
}

fn grid_cell(pixel: PixelPoint, radius: f64) -> (i64, i64) {
    (
        (pixel.x / radius).floor() as i64,
        (pixel.y / radius).floor() as i64,
    )
}

/// Greedy screen-space marker clustering.
///
/// Records are visited in id order and each joins the nearest existing cluster
/// whose running centre lies within the radius, otherwise it seeds a new one.
/// Output depends only on the record set and the zoom.
#[derive(Debug, Clone, Default)]
pub struct ClusterLayer {
    options: ClusterOptions,
}

impl ClusterLayer {
    pub fn new(options: ClusterOptions) -> Self {
        Self { options }
    }

    pub fn cluster(&self, records: &[&DetectionRecord], viewport: &Viewport) -> Vec<ClusterNode> {
        let mut ordered = records.to_vec();
        ordered.sort_by(|a, b| a.id.cmp(&b.id));

        let zoom = viewport.zoom;
        if zoom >= self.options.disable_clustering_at_zoom {
            return ordered
                .into_iter()
                .map(|record| ClusterNode::Leaf {
                    record: record.clone(),
                })
                .collect();
        }

        let radius = self.options.max_cluster_radius_px.max(1.0);
        let radius_sq = radius * radius;
        let mut buckets: Vec<Bucket> = Vec::new();
        // Buckets are indexed under the cell holding their current centre, so
        // any centre within one radius of a pixel sits in its 3x3 neighbourhood.
        let mut cells: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        let mut bucket_cells: Vec<(i64, i64)> = Vec::new();

        for record in ordered {
            let pixel = WebMercator::project(record.position, zoom);
            let cell = grid_cell(pixel, radius);

            let mut best: Option<(usize, f64)> = None;
            for dx in -1..=1 {
                for dy in -1..=1 {
                    let Some(candidates) = cells.get(&(cell.0 + dx, cell.1 + dy)) else {
                        continue;
                    };
                    for &index in candidates {
                        let distance = buckets[index].center().distance_sq(&pixel);
                        if distance > radius_sq {
                            continue;
                        }
                        let closer = match best {
                            None => true,
                            Some((best_index, best_distance)) => {
                                distance < best_distance
                                    || (distance == best_distance && index < best_index)
                            }
                        };
                        if closer {
                            best = Some((index, distance));
                        }
                    }
                }
            }

            match best {
                Some((index, _)) => {
                    buckets[index].push(record, pixel);
                    let moved = grid_cell(buckets[index].center(), radius);
                    let previous = bucket_cells[index];
                    if moved != previous {
                        if let Some(members) = cells.get_mut(&previous) {
                            members.retain(|&other| other != index);
                        }
                        cells.entry(moved).or_default().push(index);
                        bucket_cells[index] = moved;
                    }
                }
                None => {
                    buckets.push(Bucket::seed(record, pixel));
                    bucket_cells.push(cell);
                    cells.entry(cell).or_default().push(buckets.len() - 1);
                }
            }
        }

        buckets
            .into_iter()
            .map(|bucket| bucket.into_node(zoom))
            .collect()
    }

    /// Lowest zoom above `from_zoom` at which the given records stop collapsing
    /// into a single node. Falls back to `max_zoom`.
    pub fn expansion_zoom(
        &self,
        records: &[&DetectionRecord],
        member_ids: &[String],
        from_zoom: u8,
        max_zoom: u8,
    ) -> u8 {
        let wanted: HashSet<&str> = member_ids.iter().map(String::as_str).collect();
        let members: Vec<&DetectionRecord> = records
            .iter()
            .copied()
            .filter(|record| wanted.contains(record.id.as_str()))
            .collect();
        let Some(first) = members.first() else {
            return from_zoom;
        };

        let anchor = first.position;
        for zoom in from_zoom.saturating_add(1)..=max_zoom {
            if self.cluster(&members, &Viewport::new(anchor, zoom)).len() > 1 {
                return zoom;
            }
        }
        max_zoom.max(from_zoom)
    }
}

impl MapLayer for ClusterLayer {
    type Output = Vec<ClusterNode>;

    fn render(&self, records: &[&DetectionRecord], viewport: &Viewport) -> Self::Output {
        self.cluster(records, viewport)
    }
}
