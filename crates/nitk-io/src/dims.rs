//! Header-only introspection: axis count and voxel spacing.

use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};
use crate::nifti_io::{header_shape, header_zooms, read_header};

/// Axis extents of the image at `path`, e.g. `[64, 64, 30, 120]`.
pub fn image_shape(path: &Path) -> Result<Vec<usize>> {
    let header = read_header(path)?;
    Ok(header_shape(&header))
}

/// `true` iff the image at `path` has exactly three axes.
pub fn is_3d(path: &Path) -> Result<bool> {
    Ok(image_shape(path)?.len() == 3)
}

/// `true` iff the image at `path` has exactly four axes.
pub fn is_4d(path: &Path) -> Result<bool> {
    Ok(image_shape(path)?.len() == 4)
}

/// Spacing of the first three axes, read from `pixdim[1..=3]`.
///
/// Images with fewer than three axes are rejected.
pub fn get_vox_dims(path: &Path) -> Result<[f64; 3]> {
    let header = read_header(path)?;
    let shape = header_shape(&header);
    if shape.len() < 3 {
        return Err(Error::Shape {
            expected: vec![3],
            actual: vec![shape.len()],
        });
    }

    let zooms = header_zooms(&header);
    let vox = [zooms[0], zooms[1], zooms[2]];
    debug!("Voxel dimensions of {}: {:?}", path.display(), vox);
    Ok(vox)
}
