use burn::tensor::{Tensor, TensorData};
use burn::tensor::backend::Backend;

/// Continuous indices of every voxel of a `[Z, Y, X]` grid.
///
/// Returns a `[Z * Y * X, 3]` tensor whose rows are `(x, y, z)`, enumerated
/// in the same order as the flattened voxel data (x fastest).
pub fn generate_grid_3d<B: Backend>(shape: [usize; 3], device: &B::Device) -> Tensor<B, 2> {
    let [d, h, w] = shape;
    let total = d * h * w;

    let mut grid = Vec::with_capacity(total * 3);
    for z in 0..d {
        for y in 0..h {
            for x in 0..w {
                grid.push(x as f32);
                grid.push(y as f32);
                grid.push(z as f32);
            }
        }
    }

    Tensor::<B, 2>::from_data(TensorData::new(grid, [total, 3]), device)
}
