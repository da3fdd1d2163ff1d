mod common;

use std::fs;

use common::write_fixture;
use nitk_io::nifti_io::{header_affine, read_header};
use nitk_io::{delete_orientation, read_volume, Error, HeaderOrientationEditor, Volumes};
use tempfile::tempdir;

#[test]
fn test_header_editor_on_series() {
    let dir = tempdir().unwrap();
    let a = write_fixture(dir.path(), "a.nii", &[4, 4, 4], [2.0, 2.0, 3.5]);
    let b = write_fixture(dir.path(), "b.nii.gz", &[4, 4, 4, 2], [2.0, 2.0, 3.5]);
    let a_bytes = fs::read(&a).unwrap();
    let out_dir = dir.path().join("noorient");

    let result = delete_orientation(
        &Volumes::Series(vec![a.clone(), b.clone()]),
        &out_dir,
        "run1",
        &HeaderOrientationEditor::new(),
    )
    .unwrap();

    let outputs = match result {
        Volumes::Series(paths) => paths,
        other => panic!("expected a series, got {:?}", other),
    };
    assert_eq!(
        outputs,
        vec![
            out_dir.join("deleteorient_run1_a.nii"),
            out_dir.join("deleteorient_run1_b.nii.gz"),
        ]
    );

    for (input, output) in [&a, &b].into_iter().zip(&outputs) {
        let header = read_header(output).unwrap();
        assert_eq!(header.qform_code, 0);
        assert_eq!(header.sform_code, 0);
        assert_eq!(header.srow_x, [0.0; 4]);
        // without sform/qform the affine falls back to the zooms
        assert_eq!(header_affine(&header)[(2, 2)], 3.5);

        assert_eq!(read_volume(output).unwrap().data, read_volume(input).unwrap().data);
    }

    // source files are untouched
    assert_eq!(fs::read(&a).unwrap(), a_bytes);
    assert_eq!(read_header(&a).unwrap().sform_code, 1);
}

#[test]
fn test_single_input_returns_single() {
    let dir = tempdir().unwrap();
    let a = write_fixture(dir.path(), "anat.nii", &[3, 3, 3], [1.0, 1.0, 1.0]);

    let result = delete_orientation(&Volumes::Single(a), dir.path(), "x", &HeaderOrientationEditor::new()).unwrap();
    assert_eq!(result, Volumes::Single(dir.path().join("deleteorient_x_anat.nii")));
}

#[test]
fn test_header_editor_rejects_non_nifti() {
    let dir = tempdir().unwrap();
    let bogus = dir.path().join("bogus.nii");
    fs::write(&bogus, vec![0u8; 400]).unwrap();

    let err = delete_orientation(&Volumes::Single(bogus), dir.path(), "t", &HeaderOrientationEditor::new())
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)), "got {:?}", err);
}

#[cfg(unix)]
mod external_tool {
    use super::*;
    use nitk_io::FslOrient;

    #[test]
    fn test_successful_tool_keeps_copies() {
        let dir = tempdir().unwrap();
        let a = write_fixture(dir.path(), "a.nii", &[3, 3, 3], [1.0, 1.0, 1.0]);
        let b = write_fixture(dir.path(), "b.nii", &[3, 3, 3], [1.0, 1.0, 1.0]);
        let out_dir = dir.path().join("out");

        // `true` ignores its arguments and exits 0
        let result = delete_orientation(
            &Volumes::Series(vec![a.clone(), b.clone()]),
            &out_dir,
            "tag",
            &FslOrient::new("true"),
        )
        .unwrap();

        assert_eq!(result.len(), 2);
        for (input, output) in [a, b].iter().zip(result.paths()) {
            assert!(output.exists());
            let name = output.file_name().unwrap().to_string_lossy().into_owned();
            assert!(name.starts_with("deleteorient_tag_"), "{}", name);
            assert_eq!(fs::read(output).unwrap(), fs::read(input).unwrap());
        }
    }

    #[test]
    fn test_failing_tool_is_reported() {
        let dir = tempdir().unwrap();
        let a = write_fixture(dir.path(), "a.nii", &[3, 3, 3], [1.0, 1.0, 1.0]);

        let err = delete_orientation(&Volumes::Single(a), dir.path(), "tag", &FslOrient::new("false"))
            .unwrap_err();
        match err {
            Error::ExternalTool { program, status, .. } => {
                assert_eq!(program, "false");
                assert!(!status.success());
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
