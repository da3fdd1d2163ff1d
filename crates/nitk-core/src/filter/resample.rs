//! Resample image filter.
//!
//! [`ResampleImageFilter`] samples an input image on a new voxel grid that
//! lives in the same physical space. Each output voxel is mapped to world
//! coordinates, then to a continuous index of the input, and interpolated.

use burn::tensor::{Tensor, TensorData};
use burn::tensor::backend::Backend;
use nalgebra::{Matrix4, Vector4};
use crate::geometry;
use crate::image::{Image, generate_grid_3d};
use crate::interpolation::Interpolator;
use crate::spatial::{Point, Spacing, Direction};

/// Indices this far outside `[0, n - 1]` still count as inside the field of
/// view, absorbing float error on the boundary voxels.
const FOV_TOLERANCE: f64 = 1e-3;

/// Resample filter for 3D images.
///
/// # Type Parameters
/// * `I` - The interpolator used to sample the input
pub struct ResampleImageFilter<I> {
    /// Output tensor shape `[Z, Y, X]`.
    size: [usize; 3],
    origin: Point<3>,
    spacing: Spacing<3>,
    direction: Direction<3>,
    interpolator: I,
    default_pixel_value: f64,
}

impl<I> ResampleImageFilter<I> {
    /// Create a filter for an explicit output grid.
    ///
    /// # Arguments
    /// * `size` - Output tensor shape `[Z, Y, X]`
    /// * `origin` - Output origin (physical)
    /// * `spacing` - Output spacing (physical)
    /// * `direction` - Output direction matrix
    /// * `interpolator` - Interpolator for input sampling
    pub fn new(
        size: [usize; 3],
        origin: Point<3>,
        spacing: Spacing<3>,
        direction: Direction<3>,
        interpolator: I,
    ) -> Self {
        Self {
            size,
            origin,
            spacing,
            direction,
            interpolator,
            default_pixel_value: 0.0,
        }
    }

    /// Build the output grid for `target_affine`, covering the whole field of
    /// view of an input with spatial shape `input_shape` (`[x, y, z]`) and
    /// voxel-to-world affine `input_affine`.
    ///
    /// Only the linear part of `target_affine` is used; its translation is
    /// replaced so that the output grid starts at the minimum corner of the
    /// input's bounding box in target voxel coordinates. Each axis gets
    /// `ceil(max - min) + 1` voxels.
    ///
    /// Returns `None` when either affine is singular.
    pub fn for_target_affine(
        input_shape: [usize; 3],
        input_affine: &Matrix4<f64>,
        target_affine: &Matrix4<f64>,
        interpolator: I,
    ) -> Option<Self> {
        input_affine.try_inverse()?;
        let inv_target = target_affine.try_inverse()?;
        let bounds = geometry::grid_bounds(input_shape, &(inv_target * input_affine));

        let mut min_corner = Vector4::new(0.0, 0.0, 0.0, 0.0);
        let mut size_xyz = [0usize; 3];
        for axis in 0..3 {
            let (lo, hi) = bounds[axis];
            min_corner[axis] = lo;
            size_xyz[axis] = ((hi - lo) - FOV_TOLERANCE).ceil().max(0.0) as usize + 1;
        }

        let mut affine = *target_affine;
        let offset = target_affine * min_corner;
        for r in 0..3 {
            affine[(r, 3)] = offset[r];
        }
        let (origin, spacing, direction) = geometry::decompose_affine(&affine);

        Some(Self::new(
            [size_xyz[2], size_xyz[1], size_xyz[0]],
            origin,
            spacing,
            direction,
            interpolator,
        ))
    }

    /// Value written where the output grid falls outside the input.
    pub fn with_default_pixel_value(mut self, value: f64) -> Self {
        self.default_pixel_value = value;
        self
    }

    /// Output tensor shape `[Z, Y, X]`.
    pub fn size(&self) -> [usize; 3] {
        self.size
    }

    /// Voxel-to-world affine of the output grid.
    pub fn output_affine(&self) -> Matrix4<f64> {
        geometry::compose_affine(&self.origin, &self.spacing, &self.direction)
    }

    /// Apply filter to an input image.
    pub fn apply<B: Backend>(&self, input: &Image<B, 3>) -> Image<B, 3>
    where
        I: Interpolator<B>,
    {
        let device = input.data().device();

        // Output grid -> world -> input continuous index
        let output_grid = Image::new(
            Tensor::<B, 3>::zeros([1, 1, 1], &device),
            self.origin,
            self.spacing,
            self.direction,
        );
        let output_indices = generate_grid_3d::<B>(self.size, &device);
        let world = output_grid.index_to_world_tensor(output_indices);
        let input_indices = input.world_to_index_tensor(world);

        let inside = Self::inside_mask(&input_indices, input.spatial_shape(), &device);
        let sampled = self.interpolator.interpolate(input.data(), input_indices);

        let outside = inside.clone().neg() + 1.0;
        let values = sampled * inside + outside * self.default_pixel_value;

        Image::new(
            values.reshape(self.size),
            self.origin,
            self.spacing,
            self.direction,
        )
    }

    /// 1.0 where a continuous index lies within the input volume, else 0.0.
    fn inside_mask<B: Backend>(
        indices: &Tensor<B, 2>,
        shape_xyz: [usize; 3],
        device: &B::Device,
    ) -> Tensor<B, 1> {
        let upper: Vec<f32> = shape_xyz.iter().map(|&n| (n as f64 - 1.0) as f32).collect();
        let upper = Tensor::<B, 2>::from_data(TensorData::new(upper, [1, 3]), device);

        let above_lower = indices.clone().greater_equal_elem(-FOV_TOLERANCE).float();
        let below_upper = (upper - indices.clone()).greater_equal_elem(-FOV_TOLERANCE).float();

        // all three axes inside <=> per-row sum of 3
        (above_lower * below_upper)
            .sum_dim(1)
            .greater_equal_elem(2.5)
            .float()
            .squeeze::<1>(1)
    }
}
