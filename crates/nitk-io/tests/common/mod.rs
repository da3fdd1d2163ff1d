//! Synthetic NIfTI fixtures shared by the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use ndarray::{ArrayD, Dimension, IxDyn};
use nifti::writer::WriterOptions;
use nifti::NiftiHeader;

/// Header with the given zooms and a matching axis-aligned sform.
pub fn header_with_zooms(zooms: [f32; 3]) -> NiftiHeader {
    let mut header = NiftiHeader::default();
    header.pixdim = [1.0, zooms[0], zooms[1], zooms[2], 1.0, 1.0, 1.0, 1.0];
    header.sform_code = 1;
    header.srow_x = [zooms[0], 0.0, 0.0, 0.0];
    header.srow_y = [0.0, zooms[1], 0.0, 0.0];
    header.srow_z = [0.0, 0.0, zooms[2], 0.0];
    header
}

/// Voxel value = sum of its indices plus `offset`.
pub fn ramp(shape: &[usize], offset: f32) -> ArrayD<f32> {
    ArrayD::from_shape_fn(IxDyn(shape), |idx| {
        idx.slice().iter().sum::<usize>() as f32 + offset
    })
}

pub fn write_array(path: &Path, data: &ArrayD<f32>, zooms: [f32; 3]) -> PathBuf {
    let header = header_with_zooms(zooms);
    WriterOptions::new(path)
        .reference_header(&header)
        .write_nifti(data)
        .unwrap();
    path.to_path_buf()
}

/// Write a ramp image of `shape` with `zooms` to `dir/name`.
pub fn write_fixture(dir: &Path, name: &str, shape: &[usize], zooms: [f32; 3]) -> PathBuf {
    write_array(&dir.join(name), &ramp(shape, 0.0), zooms)
}
