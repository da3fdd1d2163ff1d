//! In-memory image model for nitk.
//!
//! Voxel data lives in burn tensors; geometry (origin, spacing, direction) in
//! nalgebra types. The [`filter::ResampleImageFilter`] moves an image onto a
//! new voxel grid.

pub mod geometry;
pub mod spatial;
pub mod image;
pub mod interpolation;
pub mod filter;

pub use image::Image;
pub use interpolation::{Interpolation, Interpolator};
pub use filter::ResampleImageFilter;
pub use spatial::{Point, Vector, Spacing, Direction};
