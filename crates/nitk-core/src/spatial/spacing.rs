//! Voxel spacing ("zooms").
//!
//! Spacing is the physical distance between adjacent voxel centers along each
//! axis. It is stored as a [`Vector`] so it composes with the rest of the
//! spatial types.

use super::Vector;

/// Distance between adjacent voxel centers along each axis.
pub type Spacing<const D: usize> = Vector<D>;

impl<const D: usize> Spacing<D> {
    /// Same spacing along every axis.
    pub fn uniform(value: f64) -> Self {
        Self::new([value; D])
    }

    /// True when every component is finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        (0..D).all(|i| self[i].is_finite() && self[i] > 0.0)
    }
}
