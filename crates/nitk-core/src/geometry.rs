//! Voxel-to-world affine helpers.
//!
//! NIfTI stores geometry as a 4x4 affine `A` with `world = A * [i, j, k, 1]`.
//! The image model keeps the same information split into origin, spacing and
//! direction cosines; these functions convert between the two.

use nalgebra::{Matrix3, Matrix4, Vector3 as NaVector3};
use crate::spatial::{Direction, Point, Spacing};

/// Split an affine into origin, spacing (column norms) and direction cosines.
///
/// Degenerate (near-zero) columns fall back to the matching unit axis with
/// zero spacing.
pub fn decompose_affine(affine: &Matrix4<f64>) -> (Point<3>, Spacing<3>, Direction<3>) {
    let origin = Point::new([affine[(0, 3)], affine[(1, 3)], affine[(2, 3)]]);

    let columns = [0, 1, 2].map(|c| NaVector3::new(affine[(0, c)], affine[(1, c)], affine[(2, c)]));
    let norms = columns.map(|c| c.norm());

    let axes = [
        NaVector3::x_axis().into_inner(),
        NaVector3::y_axis().into_inner(),
        NaVector3::z_axis().into_inner(),
    ];
    let mut dirs = axes;
    for i in 0..3 {
        if norms[i] > 1e-9 {
            dirs[i] = columns[i] / norms[i];
        }
    }

    let direction = Direction(Matrix3::from_columns(&dirs));
    (origin, Spacing::new(norms), direction)
}

/// Rebuild the affine `[D * diag(S) | O]`.
pub fn compose_affine(origin: &Point<3>, spacing: &Spacing<3>, direction: &Direction<3>) -> Matrix4<f64> {
    let mut affine = Matrix4::identity();
    for r in 0..3 {
        for c in 0..3 {
            affine[(r, c)] = direction[(r, c)] * spacing[c];
        }
        affine[(r, 3)] = origin[r];
    }
    affine
}

/// Axis-aligned affine with the given voxel sizes and a zero translation.
pub fn diagonal_affine(vox_dims: [f64; 3]) -> Matrix4<f64> {
    Matrix4::new_nonuniform_scaling(&NaVector3::new(vox_dims[0], vox_dims[1], vox_dims[2]))
}

/// Bounding box of a voxel grid after mapping through `transform`.
///
/// `shape` is in `[x, y, z]` order. Returns per-axis `(min, max)` of the
/// transformed corner voxel centers.
pub fn grid_bounds(shape: [usize; 3], transform: &Matrix4<f64>) -> [(f64, f64); 3] {
    let mut bounds = [(f64::INFINITY, f64::NEG_INFINITY); 3];
    let last = shape.map(|n| n.saturating_sub(1) as f64);
    for corner in 0..8 {
        let index = nalgebra::Vector4::new(
            if corner & 1 == 0 { 0.0 } else { last[0] },
            if corner & 2 == 0 { 0.0 } else { last[1] },
            if corner & 4 == 0 { 0.0 } else { last[2] },
            1.0,
        );
        let p = transform * index;
        for axis in 0..3 {
            bounds[axis].0 = bounds[axis].0.min(p[axis]);
            bounds[axis].1 = bounds[axis].1.max(p[axis]);
        }
    }
    bounds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decompose_diagonal() {
        let mut affine = diagonal_affine([2.0, 2.0, 3.5]);
        affine[(0, 3)] = -10.0;
        let (origin, spacing, direction) = decompose_affine(&affine);
        assert_eq!(origin.to_array(), [-10.0, 0.0, 0.0]);
        assert_eq!(spacing.to_array(), [2.0, 2.0, 3.5]);
        assert_eq!(direction, Direction::identity());
    }

    #[test]
    fn test_compose_inverts_decompose() {
        // 90 degree rotation about Z with anisotropic voxels
        let affine = Matrix4::new(
            0.0, -2.0, 0.0, 5.0,
            1.5, 0.0, 0.0, -3.0,
            0.0, 0.0, 4.0, 1.0,
            0.0, 0.0, 0.0, 1.0,
        );
        let (o, s, d) = decompose_affine(&affine);
        assert!(d.is_orthogonal());
        let rebuilt = compose_affine(&o, &s, &d);
        assert!((rebuilt - affine).abs().max() < 1e-12);
    }

    #[test]
    fn test_grid_bounds_identity() {
        let bounds = grid_bounds([4, 5, 6], &Matrix4::identity());
        assert_eq!(bounds, [(0.0, 3.0), (0.0, 4.0), (0.0, 5.0)]);
    }

    #[test]
    fn test_grid_bounds_flipped_axis() {
        let mut flip = Matrix4::identity();
        flip[(0, 0)] = -2.0;
        let bounds = grid_bounds([3, 1, 1], &flip);
        assert_eq!(bounds[0], (-4.0, 0.0));
        assert_eq!(bounds[1], (0.0, 0.0));
    }
}
