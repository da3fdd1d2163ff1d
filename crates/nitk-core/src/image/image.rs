//! Image type with physical metadata and coordinate transformations.
//!
//! An [`Image`] pairs a voxel tensor with the origin, spacing and direction
//! that place it in scanner space.

use burn::tensor::{Tensor, TensorData};
use burn::tensor::backend::Backend;
use nalgebra::Matrix4;
use crate::geometry;
use crate::spatial::{Point, Spacing, Direction, Vector};

/// Volume with physical metadata.
///
/// Tensor axes are stored slowest-first, so a 3D volume has shape
/// `[Z, Y, X]`. Metadata (origin, spacing, direction) and continuous indices
/// are always in `(x, y, z)` order.
///
/// # Examples
/// ```rust
/// use nitk_core::Image;
/// use nitk_core::spatial::{Point3, Spacing3, Direction3};
/// use burn::tensor::Tensor;
/// use burn_ndarray::NdArray;
///
/// type Backend = NdArray<f32>;
///
/// let device = Default::default();
/// let data = Tensor::<Backend, 3>::zeros([4, 5, 6], &device);
/// let image = Image::new(
///     data,
///     Point3::new([0.0, 0.0, 0.0]),
///     Spacing3::new([2.0, 2.0, 3.5]),
///     Direction3::identity(),
/// );
/// assert_eq!(image.shape(), [4, 5, 6]);
/// assert_eq!(image.spatial_shape(), [6, 5, 4]);
/// ```
#[derive(Debug, Clone)]
pub struct Image<B: Backend, const D: usize> {
    /// Voxel data.
    data: Tensor<B, D>,
    /// Physical coordinate of the first voxel.
    origin: Point<D>,
    /// Physical distance between voxels along each axis.
    spacing: Spacing<D>,
    /// Orientation of the voxel axes.
    direction: Direction<D>,
}

impl<B: Backend, const D: usize> Image<B, D> {
    pub fn new(
        data: Tensor<B, D>,
        origin: Point<D>,
        spacing: Spacing<D>,
        direction: Direction<D>,
    ) -> Self {
        Self {
            data,
            origin,
            spacing,
            direction,
        }
    }

    pub fn data(&self) -> &Tensor<B, D> {
        &self.data
    }

    /// Consume the image and return its voxel tensor.
    pub fn into_data(self) -> Tensor<B, D> {
        self.data
    }

    pub fn origin(&self) -> &Point<D> {
        &self.origin
    }

    pub fn spacing(&self) -> &Spacing<D> {
        &self.spacing
    }

    pub fn direction(&self) -> &Direction<D> {
        &self.direction
    }

    /// Tensor shape, slowest axis first.
    pub fn shape(&self) -> [usize; D] {
        self.data.dims()
    }

    /// Shape in metadata order `(x, y, z, ...)`.
    pub fn spatial_shape(&self) -> [usize; D] {
        let mut shape = self.shape();
        shape.reverse();
        shape
    }

    /// Map a physical point to a continuous index.
    ///
    /// `index = (Direction^-1 * (point - origin)) / spacing`
    pub fn transform_physical_point_to_continuous_index(&self, point: &Point<D>) -> Point<D> {
        let diff = *point - self.origin;
        let inv_dir = self.direction.try_inverse().expect("Direction matrix must be invertible");
        let rotated = inv_dir * diff;

        let mut index = Point::<D>::origin();
        for i in 0..D {
            index[i] = rotated[i] / self.spacing[i];
        }
        index
    }

    /// Map a continuous index to a physical point.
    ///
    /// `point = origin + Direction * (index * spacing)`
    pub fn transform_continuous_index_to_physical_point(&self, index: &Point<D>) -> Point<D> {
        let mut scaled_index = Vector::<D>::zeros();
        for i in 0..D {
            scaled_index[i] = index[i] * self.spacing[i];
        }
        self.origin + self.direction * scaled_index
    }

    /// Batch version of [`Self::transform_physical_point_to_continuous_index`].
    ///
    /// `points` is `[Batch, D]`; the result is `[Batch, D]` continuous indices.
    pub fn world_to_index_tensor(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        let device = points.device();
        let origin_tensor = self.origin_tensor(&device);

        // I = (P - O) @ T with T_rc = (D^-1)_cr / S_c
        let inv_dir = self.direction.try_inverse().expect("Direction matrix must be invertible");
        let mut t_data = Vec::with_capacity(D * D);
        for r in 0..D {
            for c in 0..D {
                t_data.push((inv_dir[(c, r)] / self.spacing[c]) as f32);
            }
        }
        let t_tensor = Tensor::<B, 2>::from_data(TensorData::new(t_data, [D, D]), &device);

        (points - origin_tensor).matmul(t_tensor)
    }

    /// Batch version of [`Self::transform_continuous_index_to_physical_point`].
    pub fn index_to_world_tensor(&self, indices: Tensor<B, 2>) -> Tensor<B, 2> {
        let device = indices.device();
        let origin_tensor = self.origin_tensor(&device);

        // P = O + I @ M with M_rc = S_r * D_cr
        let mut m_data = Vec::with_capacity(D * D);
        for r in 0..D {
            for c in 0..D {
                m_data.push((self.spacing[r] * self.direction[(c, r)]) as f32);
            }
        }
        let m_tensor = Tensor::<B, 2>::from_data(TensorData::new(m_data, [D, D]), &device);

        indices.matmul(m_tensor) + origin_tensor
    }

    fn origin_tensor(&self, device: &B::Device) -> Tensor<B, 2> {
        let origin_vec: Vec<f32> = (0..D).map(|i| self.origin[i] as f32).collect();
        Tensor::<B, 1>::from_data(TensorData::new(origin_vec, [D]), device).reshape([1, D])
    }
}

impl<B: Backend> Image<B, 3> {
    /// Voxel-to-world affine of this image.
    pub fn affine(&self) -> Matrix4<f64> {
        geometry::compose_affine(&self.origin, &self.spacing, &self.direction)
    }

    /// Build an image from a voxel tensor and a voxel-to-world affine.
    pub fn from_affine(data: Tensor<B, 3>, affine: &Matrix4<f64>) -> Self {
        let (origin, spacing, direction) = geometry::decompose_affine(affine);
        Self::new(data, origin, spacing, direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type Backend = NdArray<f32>;
    type Point3 = Point<3>;
    type Spacing3 = Spacing<3>;
    type Direction3 = Direction<3>;

    fn blank(origin: Point3, spacing: Spacing3) -> Image<Backend, 3> {
        let device = Default::default();
        let data = Tensor::<Backend, 3>::zeros([10, 10, 10], &device);
        Image::new(data, origin, spacing, Direction3::identity())
    }

    #[test]
    fn test_non_unit_spacing() {
        let image = blank(Point3::origin(), Spacing3::new([2.0, 2.0, 2.0]));
        let index = image.transform_physical_point_to_continuous_index(&Point3::new([10.0, 10.0, 10.0]));
        for i in 0..3 {
            assert!((index[i] - 5.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_non_zero_origin_roundtrip() {
        let image = blank(Point3::new([10.0, 20.0, 30.0]), Spacing3::new([1.0, 2.0, 3.5]));
        let point = Point3::new([15.0, 25.0, 35.0]);
        let index = image.transform_physical_point_to_continuous_index(&point);
        let back = image.transform_continuous_index_to_physical_point(&index);
        for i in 0..3 {
            assert!((point[i] - back[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_tensor_mapping_matches_scalar() {
        let device = Default::default();
        let image = blank(Point3::new([-5.0, 0.0, 2.0]), Spacing3::new([2.0, 1.0, 0.5]));
        let indices = Tensor::<Backend, 2>::from_floats([[1.0, 2.0, 3.0]], &device);

        let points = image.index_to_world_tensor(indices);
        let points_data = points.clone().into_data();
        let p = points_data.as_slice::<f32>().unwrap();
        assert_eq!(p, &[-3.0, 2.0, 3.5]);

        let back = image.world_to_index_tensor(points).into_data();
        let i = back.as_slice::<f32>().unwrap();
        assert!((i[0] - 1.0).abs() < 1e-5);
        assert!((i[1] - 2.0).abs() < 1e-5);
        assert!((i[2] - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_affine_roundtrip() {
        let image = blank(Point3::new([1.0, 2.0, 3.0]), Spacing3::new([2.0, 2.0, 3.5]));
        let affine = image.affine();
        assert_eq!(affine[(2, 2)], 3.5);
        assert_eq!(affine[(0, 3)], 1.0);

        let rebuilt = Image::<Backend, 3>::from_affine(image.data().clone(), &affine);
        assert_eq!(rebuilt.spacing(), image.spacing());
        assert_eq!(rebuilt.origin(), image.origin());
    }
}
