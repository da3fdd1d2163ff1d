mod common;

use common::write_fixture;
use nitk_io::{get_vox_dims, image_shape, is_3d, is_4d, Error};
use tempfile::tempdir;

#[test]
fn test_3d_image_predicates() {
    let dir = tempdir().unwrap();
    let path = write_fixture(dir.path(), "anat.nii", &[4, 5, 6], [1.0, 1.0, 1.0]);

    assert!(is_3d(&path).unwrap());
    assert!(!is_4d(&path).unwrap());
    assert_eq!(image_shape(&path).unwrap(), vec![4, 5, 6]);
}

#[test]
fn test_4d_image_predicates() {
    let dir = tempdir().unwrap();
    let path = write_fixture(dir.path(), "bold.nii.gz", &[4, 5, 6, 3], [3.0, 3.0, 3.0]);

    assert!(!is_3d(&path).unwrap());
    assert!(is_4d(&path).unwrap());
    assert_eq!(image_shape(&path).unwrap(), vec![4, 5, 6, 3]);
}

#[test]
fn test_get_vox_dims() {
    let dir = tempdir().unwrap();
    let path = write_fixture(dir.path(), "bold.nii", &[4, 4, 4, 2], [2.0, 2.0, 3.5]);
    assert_eq!(get_vox_dims(&path).unwrap(), [2.0, 2.0, 3.5]);
}

#[test]
fn test_get_vox_dims_rejects_2d() {
    let dir = tempdir().unwrap();
    let path = write_fixture(dir.path(), "slice.nii", &[4, 4], [1.0, 1.0, 1.0]);
    let err = get_vox_dims(&path).unwrap_err();
    assert!(matches!(err, Error::Shape { .. }), "got {:?}", err);
}

#[test]
fn test_missing_file_is_codec_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope.nii");
    assert!(is_3d(&missing).is_err());
    assert!(get_vox_dims(&missing).is_err());
}
