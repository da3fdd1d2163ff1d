//! Interpolator trait for sampling values at continuous coordinates.

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;

/// Samples a volume at non-integer voxel coordinates.
///
/// # Type Parameters
/// * `B` - The Burn backend
pub trait Interpolator<B: Backend> {
    /// Interpolate values from a volume at given continuous indices.
    ///
    /// # Arguments
    /// * `data` - The source volume, shape `[Z, Y, X]`
    /// * `indices` - Continuous indices `[Batch, 3]`, each row `(x, y, z)`
    ///
    /// # Returns
    /// Tensor of sampled values `[Batch]`. Indices outside the volume are
    /// clamped to the nearest edge voxel.
    fn interpolate(&self, data: &Tensor<B, 3>, indices: Tensor<B, 2>) -> Tensor<B, 1>;
}
