//! Resampling NIfTI files to a new voxel size.

use std::fs;
use std::path::{Path, PathBuf};

use burn::tensor::backend::Backend;
use burn_ndarray::NdArrayDevice;
use nitk_core::geometry::diagonal_affine;
use nitk_core::{Interpolation, ResampleImageFilter};
use ndarray::{stack, Array3, Axis};
use tracing::{debug, info};

use crate::cache::{CallKey, Memory};
use crate::error::{Error, Result};
use crate::nifti_io::{array_to_image, image_to_array, read_volume, write_volume, Volume};
use crate::CpuBackend;

/// Cache directory created next to the resampled output.
pub const RESAMPLE_CACHE_DIR: &str = "resample_img_cache";

/// Options for [`resample_img_with`].
#[derive(Debug, Clone)]
pub struct ResampleOptions {
    /// Interpolation scheme.
    pub interpolation: Interpolation,
    /// Value for output voxels outside the input field of view.
    pub default_value: f64,
    /// Memoize the resampled volume under `resample_img_cache/`.
    pub use_cache: bool,
}

impl Default for ResampleOptions {
    fn default() -> Self {
        Self {
            interpolation: Interpolation::Linear,
            default_value: 0.0,
            use_cache: true,
        }
    }
}

impl ResampleOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn with_default_value(mut self, value: f64) -> Self {
        self.default_value = value;
        self
    }

    /// Always recompute; nothing is read from or written to the cache.
    pub fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }
}

/// Reject voxel sizes that are not finite and positive.
pub fn validate_vox_dims(new_vox_dims: &[f64; 3]) -> Result<()> {
    if new_vox_dims.iter().all(|v| v.is_finite() && *v > 0.0) {
        Ok(())
    } else {
        Err(Error::invalid_argument(format!(
            "voxel dimensions must be finite and positive, got {:?}",
            new_vox_dims
        )))
    }
}

/// `<input dir>/resample_<basename>`.
pub fn default_output_path(input: &Path) -> Result<PathBuf> {
    let name = input
        .file_name()
        .ok_or_else(|| Error::invalid_argument(format!("{} has no file name", input.display())))?;
    Ok(input.with_file_name(format!("resample_{}", name.to_string_lossy())))
}

/// Resample a 3D or 4D volume onto an axis-aligned grid with voxel size
/// `new_vox_dims`. 4D volumes are resampled one 3D frame at a time.
pub fn resample_volume<B: Backend>(
    volume: &Volume,
    new_vox_dims: [f64; 3],
    options: &ResampleOptions,
    device: &B::Device,
) -> Result<Volume> {
    validate_vox_dims(&new_vox_dims)?;

    let shape = volume.shape();
    let frames = match shape.len() {
        3 => 1,
        4 => shape[3],
        n => {
            return Err(Error::dimension(format!(
                "can only resample 3D or 4D images, found {} axes",
                n
            )))
        }
    };
    if frames == 0 {
        return Err(Error::dimension("4D image has no volumes"));
    }

    let affine = volume.affine();
    let target_affine = diagonal_affine(new_vox_dims);
    let filter = ResampleImageFilter::for_target_affine(
        [shape[0], shape[1], shape[2]],
        &affine,
        &target_affine,
        options.interpolation,
    )
    .ok_or_else(|| Error::invalid_argument("input or target affine is not invertible"))?
    .with_default_pixel_value(options.default_value);

    let [nz, ny, nx] = filter.size();
    debug!("Resampling {:?} -> [{}, {}, {}] x {} frame(s)", shape, nx, ny, nz, frames);

    let mut resampled: Vec<Array3<f32>> = Vec::with_capacity(frames);
    for frame in 0..frames {
        let image = array_to_image::<B>(volume.spatial_view(frame)?, &affine, device);
        resampled.push(image_to_array(&filter.apply(&image))?);
    }

    let data = if shape.len() == 3 {
        resampled.remove(0).into_dyn()
    } else {
        let views: Vec<_> = resampled.iter().map(|a| a.view()).collect();
        stack(Axis(3), &views)?.into_dyn()
    };

    Ok(Volume::with_affine(data, &filter.output_affine(), Some(&volume.header)))
}

/// Resample `input` to `new_vox_dims` with trilinear interpolation.
///
/// The result is written to `output`, or to `<input dir>/resample_<basename>`
/// when `output` is `None`, and that path is returned.
pub fn resample_img(input: &Path, new_vox_dims: [f64; 3], output: Option<&Path>) -> Result<PathBuf> {
    resample_img_with(input, new_vox_dims, output, &ResampleOptions::default())
}

/// [`resample_img`] with explicit options.
pub fn resample_img_with(
    input: &Path,
    new_vox_dims: [f64; 3],
    output: Option<&Path>,
    options: &ResampleOptions,
) -> Result<PathBuf> {
    validate_vox_dims(&new_vox_dims)?;

    let output = match output {
        Some(path) => path.to_path_buf(),
        None => default_output_path(input)?,
    };
    let output_dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&output_dir)?;

    let device = NdArrayDevice::default();
    let compute = || {
        let volume = read_volume(input)?;
        resample_volume::<CpuBackend>(&volume, new_vox_dims, options, &device)
    };

    let volume = if options.use_cache {
        let memory = Memory::new(output_dir.join(RESAMPLE_CACHE_DIR));
        fs::create_dir_all(memory.location())?;
        let [x, y, z] = new_vox_dims;
        let key = CallKey::new("resample_img")
            .file("input", input)?
            .arg("target_affine", format!("diag({}, {}, {}, 1)", x, y, z))
            .arg("interpolation", options.interpolation.name())
            .arg("default_value", options.default_value);
        memory.cache(&key, compute)?.volume
    } else {
        compute()?
    };

    write_volume(&output, &volume)?;
    info!("Resampled {} to {:?} -> {}", input.display(), new_vox_dims, output.display());
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::ArrayD;
    use nifti::NiftiHeader;

    #[test]
    fn test_validate_vox_dims() {
        assert!(validate_vox_dims(&[1.0, 2.0, 3.5]).is_ok());
        assert!(validate_vox_dims(&[0.0, 1.0, 1.0]).is_err());
        assert!(validate_vox_dims(&[1.0, -1.0, 1.0]).is_err());
        assert!(validate_vox_dims(&[1.0, 1.0, f64::NAN]).is_err());
    }

    #[test]
    fn test_default_output_path() {
        let out = default_output_path(Path::new("/data/sub-01/bold.nii.gz")).unwrap();
        assert_eq!(out, PathBuf::from("/data/sub-01/resample_bold.nii.gz"));
    }

    #[test]
    fn test_options_builder() {
        let options = ResampleOptions::new()
            .with_interpolation(Interpolation::Nearest)
            .with_default_value(-1.0)
            .without_cache();
        assert_eq!(options.interpolation, Interpolation::Nearest);
        assert_eq!(options.default_value, -1.0);
        assert!(!options.use_cache);
    }

    #[test]
    fn test_resample_4d_volume_per_frame() {
        // 5x5x2 voxels of 1mm, 3 frames with constant value = frame index
        let data = ArrayD::from_shape_fn(vec![5, 5, 2, 3], |idx| idx[3] as f32);
        let volume = Volume::with_affine(
            data,
            &diagonal_affine([1.0, 1.0, 1.0]),
            Some(&NiftiHeader::default()),
        );

        let device = Default::default();
        let out = resample_volume::<CpuBackend>(&volume, [2.0, 2.0, 1.0], &ResampleOptions::default(), &device)
            .unwrap();
        assert_eq!(out.shape(), &[3, 3, 2, 3]);
        assert_eq!(&out.zooms()[..3], &[2.0, 2.0, 1.0]);
        for frame in 0..3 {
            let view = out.spatial_view(frame).unwrap();
            assert!(view.iter().all(|&v| (v - frame as f32).abs() < 1e-5));
        }
    }

    #[test]
    fn test_resample_rejects_5d() {
        let volume = Volume::new(ArrayD::zeros(vec![2, 2, 2, 2, 2]), NiftiHeader::default());
        let device = Default::default();
        let err = resample_volume::<CpuBackend>(&volume, [1.0, 1.0, 1.0], &ResampleOptions::default(), &device)
            .unwrap_err();
        assert!(matches!(err, Error::Dimension(_)));
    }
}
