pub mod bounds;
pub mod grid;
pub mod projection;

pub use bounds::GeoBounds;
pub use grid::GridHelper;
pub use projection::{PixelPoint, WebMercator};
