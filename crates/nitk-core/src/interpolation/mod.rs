//! Interpolation of voxel values at continuous coordinates.

pub mod trait_;
pub mod linear;
pub mod nearest;

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use serde::{Serialize, Deserialize};

pub use trait_::Interpolator;
pub use linear::LinearInterpolator;
pub use nearest::NearestNeighborInterpolator;

/// Interpolation scheme selectable at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    /// Trilinear.
    #[default]
    Linear,
    /// Nearest voxel; keeps label values intact.
    Nearest,
}

impl Interpolation {
    pub fn name(&self) -> &'static str {
        match self {
            Interpolation::Linear => "linear",
            Interpolation::Nearest => "nearest",
        }
    }
}

impl<B: Backend> Interpolator<B> for Interpolation {
    fn interpolate(&self, data: &Tensor<B, 3>, indices: Tensor<B, 2>) -> Tensor<B, 1> {
        match self {
            Interpolation::Linear => LinearInterpolator::new().interpolate(data, indices),
            Interpolation::Nearest => NearestNeighborInterpolator::new().interpolate(data, indices),
        }
    }
}
