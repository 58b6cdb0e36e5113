pub mod cluster;
pub mod heatmap;

pub use cluster::{ClusterLayer, ClusterNode, ClusterOptions};
pub use heatmap::{
    gradient_color, heatmap_points, weight, GradientStop, HeatGrid, HeatPoint, HeatmapLayer,
    HeatmapOptions,
};
