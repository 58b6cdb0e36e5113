use ndarray::Array2;

pub struct GridHelper;

impl GridHelper {
    /// Separable box blur with the given radius in cells. Edges are clamped.
    pub fn box_blur(grid: &Array2<f32>, radius: usize) -> Array2<f32> {
        if radius == 0 || grid.is_empty() {
            return grid.clone();
        }
        let horizontal = Self::blur_axis(grid, radius, true);
        Self::blur_axis(&horizontal, radius, false)
    }

    fn blur_axis(grid: &Array2<f32>, radius: usize, along_columns: bool) -> Array2<f32> {
        let (rows, cols) = grid.dim();
        let span = (2 * radius + 1) as f32;
        Array2::from_shape_fn((rows, cols), |(row, col)| {
            let (line_len, position) = if along_columns { (cols, col) } else { (rows, row) };
            let mut total = 0.0;
            for offset in 0..=2 * radius {
                let index = (position + offset).saturating_sub(radius).min(line_len - 1);
                total += if along_columns {
                    grid[[row, index]]
                } else {
                    grid[[index, col]]
                };
            }
            total / span
        })
    }
}
