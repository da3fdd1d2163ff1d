//! NIfTI-1 reading and writing.
//!
//! Two views of a file are provided:
//! * [`Volume`]: the raw N-dimensional voxel array in file axis order
//!   (`[x, y, z, t, ...]`) together with its header. Used for shape/zoom
//!   introspection, concatenation and anything that must keep extra axes.
//! * [`Image<B, 3>`](nitk_core::Image): a 3D burn tensor with physical
//!   metadata, used for resampling.

use std::path::Path;

use burn::tensor::{Tensor, TensorData};
use burn::tensor::backend::Backend;
use nalgebra::Matrix4;
use ndarray::{Array3, ArrayD, ArrayView3, Ix3};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use nitk_core::Image;
use tracing::debug;

use crate::error::{Error, Result};

/// A decoded NIfTI file.
#[derive(Debug, Clone)]
pub struct Volume {
    /// Voxel values after `scl_slope`/`scl_inter` scaling, file axis order.
    pub data: ArrayD<f32>,
    /// Header the volume was read with, or the template it will be written with.
    pub header: NiftiHeader,
}

impl Volume {
    /// `header.dim` is updated to match `data`.
    pub fn new(data: ArrayD<f32>, mut header: NiftiHeader) -> Self {
        set_header_shape(&mut header, data.shape());
        Self { data, header }
    }

    /// Build a volume whose header carries `affine`, starting from `template`
    /// (or a default header) for everything else.
    pub fn with_affine(data: ArrayD<f32>, affine: &Matrix4<f64>, template: Option<&NiftiHeader>) -> Self {
        let mut header = template.cloned().unwrap_or_default();
        set_header_affine(&mut header, affine);
        Self::new(data, header)
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    /// Voxel-to-world affine from the header.
    pub fn affine(&self) -> Matrix4<f64> {
        header_affine(&self.header)
    }

    /// Per-axis spacing from the header, one entry per data axis.
    pub fn zooms(&self) -> Vec<f64> {
        header_zooms(&self.header)
    }

    /// View of the 3D volume at `index` along the fourth axis, or the whole
    /// array when it is already 3D.
    pub fn spatial_view(&self, index: usize) -> Result<ArrayView3<'_, f32>> {
        match self.ndim() {
            3 => Ok(self.data.view().into_dimensionality::<Ix3>()?),
            4 => Ok(self
                .data
                .index_axis(ndarray::Axis(3), index)
                .into_dimensionality::<Ix3>()?),
            n => Err(Error::dimension(format!("expected a 3D or 4D volume, found {} axes", n))),
        }
    }
}

/// Read only the header of a NIfTI file.
pub fn read_header<P: AsRef<Path>>(path: P) -> Result<NiftiHeader> {
    Ok(NiftiHeader::from_file(path)?)
}

/// Axis extents `dim[1..=dim[0]]`.
pub fn header_shape(header: &NiftiHeader) -> Vec<usize> {
    let ndim = (header.dim[0] as usize).min(7);
    (1..=ndim).map(|i| header.dim[i] as usize).collect()
}

/// Set `dim[0]` to the axis count and `dim[1..]` to the extents.
pub fn set_header_shape(header: &mut NiftiHeader, shape: &[usize]) {
    let ndim = shape.len().min(7);
    header.dim = [1; 8];
    header.dim[0] = ndim as _;
    for (i, &extent) in shape.iter().take(ndim).enumerate() {
        header.dim[i + 1] = extent as _;
    }
}

/// Per-axis spacing `pixdim[1..=dim[0]]` as `f64`.
pub fn header_zooms(header: &NiftiHeader) -> Vec<f64> {
    let ndim = (header.dim[0] as usize).min(7);
    (1..=ndim).map(|i| header.pixdim[i] as f64).collect()
}

/// Voxel-to-world affine of a header.
///
/// Uses the sform when `sform_code > 0`, else the qform when
/// `qform_code > 0`, else plain `pixdim` scaling.
pub fn header_affine(header: &NiftiHeader) -> Matrix4<f64> {
    let f = |v: f32| v as f64;

    if header.sform_code > 0 {
        let (r0, r1, r2) = (header.srow_x, header.srow_y, header.srow_z);
        return Matrix4::new(
            f(r0[0]), f(r0[1]), f(r0[2]), f(r0[3]),
            f(r1[0]), f(r1[1]), f(r1[2]), f(r1[3]),
            f(r2[0]), f(r2[1]), f(r2[2]), f(r2[3]),
            0.0, 0.0, 0.0, 1.0,
        );
    }

    let dx = f(header.pixdim[1]);
    let dy = f(header.pixdim[2]);
    let dz = f(header.pixdim[3]);

    if header.qform_code > 0 {
        let b = f(header.quatern_b);
        let c = f(header.quatern_c);
        let d = f(header.quatern_d);
        let a = (1.0 - (b * b + c * c + d * d).min(1.0)).sqrt();

        let qfac = if header.pixdim[0] < 0.0 { -1.0 } else { 1.0 };
        let dz = dz * qfac;

        return Matrix4::new(
            (a * a + b * b - c * c - d * d) * dx,
            (2.0 * b * c - 2.0 * a * d) * dy,
            (2.0 * b * d + 2.0 * a * c) * dz,
            f(header.quatern_x),
            (2.0 * b * c + 2.0 * a * d) * dx,
            (a * a + c * c - b * b - d * d) * dy,
            (2.0 * c * d - 2.0 * a * b) * dz,
            f(header.quatern_y),
            (2.0 * b * d - 2.0 * a * c) * dx,
            (2.0 * c * d + 2.0 * a * b) * dy,
            (a * a + d * d - c * c - b * b) * dz,
            f(header.quatern_z),
            0.0, 0.0, 0.0, 1.0,
        );
    }

    Matrix4::new(
        dx, 0.0, 0.0, 0.0,
        0.0, dy, 0.0, 0.0,
        0.0, 0.0, dz, 0.0,
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Store `affine` in the sform rows and make `pixdim[1..=3]` agree with it.
///
/// The qform is disabled so readers do not see two conflicting transforms.
pub fn set_header_affine(header: &mut NiftiHeader, affine: &Matrix4<f64>) {
    let row = |r: usize| [0, 1, 2, 3].map(|c| affine[(r, c)] as f32);
    header.srow_x = row(0);
    header.srow_y = row(1);
    header.srow_z = row(2);
    if header.sform_code <= 0 {
        // NIFTI_XFORM_SCANNER_ANAT
        header.sform_code = 1;
    }
    header.qform_code = 0;

    let linear = affine.fixed_view::<3, 3>(0, 0);
    for axis in 0..3 {
        header.pixdim[axis + 1] = linear.column(axis).norm() as f32;
    }
    header.pixdim[0] = if linear.determinant() < 0.0 { -1.0 } else { 1.0 };
}

/// Read and decode a whole NIfTI file.
pub fn read_volume<P: AsRef<Path>>(path: P) -> Result<Volume> {
    let path = path.as_ref();
    let obj = ReaderOptions::new().read_file(path)?;
    let header = obj.header().clone();
    let data = obj.into_volume().into_ndarray::<f32>()?;
    debug!("Read {} with shape {:?}", path.display(), data.shape());
    Ok(Volume { data, header })
}

/// Write a volume as float32 NIfTI. A `.gz` extension selects gzip.
pub fn write_volume<P: AsRef<Path>>(path: P, volume: &Volume) -> Result<()> {
    let path = path.as_ref();
    let mut header = volume.header.clone();
    // data is stored already scaled
    header.scl_slope = 1.0;
    header.scl_inter = 0.0;

    WriterOptions::new(path)
        .reference_header(&header)
        .write_nifti(&volume.data)?;
    debug!("Wrote {} with shape {:?}", path.display(), volume.shape());
    Ok(())
}

/// Read a 3D NIfTI file into an [`Image`].
pub fn read_nifti<B: Backend, P: AsRef<Path>>(path: P, device: &B::Device) -> Result<Image<B, 3>> {
    let volume = read_volume(path)?;
    if volume.ndim() != 3 {
        return Err(Error::dimension(format!(
            "expected a 3D NIfTI file, found {} axes",
            volume.ndim()
        )));
    }
    Ok(array_to_image(volume.spatial_view(0)?, &volume.affine(), device))
}

/// Write a 3D [`Image`] to a NIfTI file, copying non-geometric header fields
/// from `template` when given.
pub fn write_nifti<B: Backend, P: AsRef<Path>>(
    path: P,
    image: &Image<B, 3>,
    template: Option<&NiftiHeader>,
) -> Result<()> {
    let array = image_to_array(image)?;
    let volume = Volume::with_affine(array.into_dyn(), &image.affine(), template);
    write_volume(path, &volume)
}

/// Convert an `[x, y, z]` array into a `[Z, Y, X]` tensor image.
pub fn array_to_image<B: Backend>(
    data: ArrayView3<'_, f32>,
    affine: &Matrix4<f64>,
    device: &B::Device,
) -> Image<B, 3> {
    let (nx, ny, nz) = data.dim();
    let flat: Vec<f32> = data.permuted_axes([2, 1, 0]).iter().copied().collect();
    let tensor = Tensor::<B, 3>::from_data(TensorData::new(flat, [nz, ny, nx]), device);
    Image::from_affine(tensor, affine)
}

/// Convert a `[Z, Y, X]` tensor image back into an `[x, y, z]` array.
pub fn image_to_array<B: Backend>(image: &Image<B, 3>) -> Result<Array3<f32>> {
    let [nz, ny, nx] = image.shape();
    let data = image.data().to_data();
    let slice = data
        .as_slice::<f32>()
        .map_err(|e| Error::dimension(format!("tensor data is not f32: {:?}", e)))?;

    let zyx = Array3::from_shape_vec((nz, ny, nx), slice.to_vec())?;
    Ok(zyx.permuted_axes([2, 1, 0]).as_standard_layout().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CpuBackend;
    use ndarray::Array;
    use tempfile::tempdir;

    #[test]
    fn test_read_nifti_basic() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("test.nii");

        // X=3, Y=4, Z=5, value = linear index in x-fastest order
        let array = Array::from_shape_fn((3, 4, 5), |(x, y, z)| (x + 3 * y + 12 * z) as f32);
        WriterOptions::new(&file_path).write_nifti(&array)?;

        let device = Default::default();
        let image = read_nifti::<CpuBackend, _>(&file_path, &device)?;
        assert_eq!(image.shape(), [5, 4, 3]);

        let data = image.data().to_data();
        let values = data.as_slice::<f32>().unwrap();
        assert_eq!(values.len(), 60);
        assert_eq!(values[0], 0.0);
        assert_eq!(values[1], 1.0);
        assert_eq!(values[59], 59.0);
        Ok(())
    }

    #[test]
    fn test_image_array_roundtrip() -> Result<()> {
        let array = Array::from_shape_fn((2, 3, 4), |(x, y, z)| (100 * x + 10 * y + z) as f32);
        let device = Default::default();
        let image = array_to_image::<CpuBackend>(array.view(), &Matrix4::identity(), &device);
        assert_eq!(image.spatial_shape(), [2, 3, 4]);
        assert_eq!(image_to_array(&image)?, array);
        Ok(())
    }

    #[test]
    fn test_header_affine_prefers_sform() {
        let mut header = NiftiHeader::default();
        header.pixdim = [1.0, 9.0, 9.0, 9.0, 1.0, 1.0, 1.0, 1.0];
        header.sform_code = 1;
        header.srow_x = [2.0, 0.0, 0.0, -10.0];
        header.srow_y = [0.0, 2.0, 0.0, 5.0];
        header.srow_z = [0.0, 0.0, 3.5, 0.0];

        let affine = header_affine(&header);
        assert_eq!(affine[(0, 0)], 2.0);
        assert_eq!(affine[(2, 2)], 3.5);
        assert_eq!(affine[(0, 3)], -10.0);
    }

    #[test]
    fn test_header_affine_identity_quaternion() {
        let mut header = NiftiHeader::default();
        header.pixdim = [1.0, 2.0, 3.0, 4.0, 1.0, 1.0, 1.0, 1.0];
        header.sform_code = 0;
        header.qform_code = 1;
        header.quatern_b = 0.0;
        header.quatern_c = 0.0;
        header.quatern_d = 0.0;
        header.quatern_x = 1.0;

        let affine = header_affine(&header);
        assert_eq!(affine[(0, 0)], 2.0);
        assert_eq!(affine[(1, 1)], 3.0);
        assert_eq!(affine[(2, 2)], 4.0);
        assert_eq!(affine[(0, 3)], 1.0);
    }

    #[test]
    fn test_set_header_affine_updates_zooms() {
        let mut header = NiftiHeader::default();
        let affine = nitk_core::geometry::diagonal_affine([1.5, 2.0, 2.5]);
        set_header_affine(&mut header, &affine);

        assert_eq!(header.sform_code, 1);
        assert_eq!(header.qform_code, 0);
        assert_eq!(&header.pixdim[1..4], &[1.5, 2.0, 2.5]);
        assert_eq!(header_affine(&header), affine);
    }
}
