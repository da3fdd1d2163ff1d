//! Trilinear interpolation.

use burn::tensor::{Tensor, Int};
use burn::tensor::backend::Backend;
use super::trait_::Interpolator;

/// Trilinear interpolator over `[Z, Y, X]` volumes.
///
/// Indices outside the volume are clamped to the border voxels.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearInterpolator;

impl LinearInterpolator {
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend> Interpolator<B> for LinearInterpolator {
    fn interpolate(&self, data: &Tensor<B, 3>, indices: Tensor<B, 2>) -> Tensor<B, 1> {
        let [nz, ny, nx] = data.dims();
        let count = indices.dims()[0];
        let device = indices.device();
        let flat = data.clone().reshape([nz * ny * nx]);

        // (extent, stride) per index column, x first
        let axes = [(nx, 1), (ny, nx), (nz, nx * ny)];

        let mut lower: Vec<Tensor<B, 1, Int>> = Vec::with_capacity(3);
        let mut upper: Vec<Tensor<B, 1, Int>> = Vec::with_capacity(3);
        let mut frac: Vec<Tensor<B, 1>> = Vec::with_capacity(3);
        for (column, &(extent, stride)) in axes.iter().enumerate() {
            let coord = indices.clone().narrow(1, column, 1).squeeze::<1>(1);
            let floor = coord.clone().floor();
            let last = (extent - 1) as f64;

            frac.push(coord - floor.clone());
            lower.push(floor.clone().clamp(0.0, last).int() * stride as i32);
            upper.push((floor + 1.0).clamp(0.0, last).int() * stride as i32);
        }

        let mut total = Tensor::<B, 1>::zeros([count], &device);
        for corner in 0..8 {
            let pick = |axis: usize| {
                if corner & (1 << axis) != 0 {
                    (upper[axis].clone(), frac[axis].clone())
                } else {
                    (lower[axis].clone(), frac[axis].clone().neg() + 1.0)
                }
            };
            let (ix, wx) = pick(0);
            let (iy, wy) = pick(1);
            let (iz, wz) = pick(2);

            total = total + flat.clone().gather(0, ix + iy + iz) * wx * wy * wz;
        }
        total
    }
}
