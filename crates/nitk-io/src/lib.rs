//! NIfTI file utilities.
//!
//! Path-in, path-or-value-out helpers over NIfTI-1 files:
//! * [`is_3d`], [`is_4d`], [`image_shape`] and [`get_vox_dims`] inspect headers,
//! * [`delete_orientation`] strips qform/sform from copies of the inputs,
//! * [`do_3d_to_4d_merge`] stacks 3D volumes into `fourD_func.nii`,
//! * [`resample_img`] moves a volume onto an axis-aligned grid.
//!
//! Merge and resample memoize their results on disk through [`cache::Memory`].

pub mod cache;
pub mod dims;
pub mod error;
pub mod merge;
pub mod nifti_io;
pub mod orientation;
pub mod resample;
pub mod volumes;

/// CPU tensor backend used by the file-level operations.
pub type CpuBackend = burn_ndarray::NdArray<f32>;

pub use cache::{CallKey, Memory};
pub use dims::{get_vox_dims, image_shape, is_3d, is_4d};
pub use error::{Error, Result};
pub use merge::{concat_images, do_3d_to_4d_merge};
pub use nifti_io::{read_nifti, read_volume, write_nifti, write_volume, Volume};
pub use orientation::{delete_orientation, FslOrient, HeaderOrientationEditor, OrientationEditor};
pub use resample::{resample_img, resample_img_with, ResampleOptions};
pub use volumes::Volumes;
