//! Direction cosines of the voxel axes.

use nalgebra::SMatrix;
use super::Vector;
use serde::{Serialize, Deserialize};

/// Direction matrix: column `i` is the unit direction of voxel axis `i` in
/// physical space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Direction<const D: usize>(pub SMatrix<f64, D, D>);

impl<const D: usize> Direction<D> {
    /// Axis-aligned orientation.
    pub fn identity() -> Self {
        Self(SMatrix::identity())
    }

    /// Check if the matrix is orthogonal within `1e-6`.
    pub fn is_orthogonal(&self) -> bool {
        let product = self.0 * self.0.transpose();
        (0..D).all(|i| {
            (0..D).all(|j| {
                let expected = if i == j { 1.0 } else { 0.0 };
                (product[(i, j)] - expected).abs() < 1e-6
            })
        })
    }

    pub fn try_inverse(&self) -> Option<Self> {
        self.0.try_inverse().map(Self)
    }
}

impl<const D: usize> std::ops::Index<(usize, usize)> for Direction<D> {
    type Output = f64;

    fn index(&self, index: (usize, usize)) -> &Self::Output {
        &self.0[index]
    }
}

impl<const D: usize> std::ops::Mul<Vector<D>> for Direction<D> {
    type Output = Vector<D>;

    fn mul(self, vector: Vector<D>) -> Self::Output {
        Vector(self.0 * vector.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Direction3 = Direction<3>;

    #[test]
    fn test_direction_identity_is_orthogonal() {
        assert!(Direction3::identity().is_orthogonal());
    }

    #[test]
    fn test_direction_shear_is_not_orthogonal() {
        let mut m = SMatrix::<f64, 3, 3>::identity();
        m[(0, 1)] = 0.5;
        assert!(!Direction(m).is_orthogonal());
    }

    #[test]
    fn test_direction_rotates_vector() {
        // 90 degrees about Z: X -> Y
        let m = SMatrix::<f64, 3, 3>::new(
            0.0, -1.0, 0.0,
            1.0, 0.0, 0.0,
            0.0, 0.0, 1.0,
        );
        let rotated = Direction(m) * Vector::new([1.0, 0.0, 0.0]);
        assert!((rotated[1] - 1.0).abs() < 1e-12);
        assert!(rotated[0].abs() < 1e-12);
    }
}
