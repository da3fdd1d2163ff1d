//! Stacking a series of 3D volumes into one 4D volume.

use std::fs;
use std::path::{Path, PathBuf};

use ndarray::{stack, Axis};
use tracing::{debug, info};

use crate::cache::{CallKey, Memory};
use crate::error::{Error, Result};
use crate::nifti_io::{read_volume, write_volume, Volume};
use crate::volumes::Volumes;

/// Name of the merged file written next to the inputs.
pub const MERGED_FILE_NAME: &str = "fourD_func.nii";
/// Cache directory created next to the inputs.
pub const MERGE_CACHE_DIR: &str = "merge";
/// Key of the cache entry the current merged file was written from.
const OUTPUT_KEY_FILE: &str = "fourD_func.key";

/// Concatenate images along a new trailing axis.
///
/// All inputs must have the same shape. The result keeps the header and
/// affine of the first input.
pub fn concat_images<P: AsRef<Path>>(paths: &[P]) -> Result<Volume> {
    let first = paths
        .first()
        .ok_or_else(|| Error::invalid_argument("cannot concatenate an empty list of images"))?;
    let first = read_volume(first)?;

    let mut rest = Vec::with_capacity(paths.len() - 1);
    for path in &paths[1..] {
        let volume = read_volume(path)?;
        if volume.shape() != first.shape() {
            return Err(Error::Shape {
                expected: first.shape().to_vec(),
                actual: volume.shape().to_vec(),
            });
        }
        rest.push(volume);
    }

    let mut views = vec![first.data.view()];
    views.extend(rest.iter().map(|v| v.data.view()));
    let data = stack(Axis(first.ndim()), &views)?;
    debug!("Concatenated {} images into shape {:?}", paths.len(), data.shape());

    let mut header = first.header;
    if header.pixdim[4] <= 0.0 {
        header.pixdim[4] = 1.0;
    }
    Ok(Volume::new(data, header))
}

/// Drop the fourth axis of a 5D stack when it is a singleton.
///
/// Inputs shaped `(x, y, z, 1)` stack to `(x, y, z, 1, n)`; those become
/// `(x, y, z, n)`. Any other 5D shape is rejected. Results with fewer axes are
/// returned unchanged.
pub fn squeeze_singleton_axis(volume: Volume) -> Result<Volume> {
    if volume.ndim() != 5 {
        return Ok(volume);
    }
    let shape = volume.shape().to_vec();
    if shape[3] != 1 {
        let mut expected = shape.clone();
        expected[3] = 1;
        return Err(Error::Shape {
            expected,
            actual: shape,
        });
    }

    let Volume { data, header } = volume;
    Ok(Volume::new(data.index_axis_move(Axis(3), 0), header))
}

/// Merge 3D volumes into `<dir>/fourD_func.nii`, where `<dir>` is the
/// directory of the first input.
///
/// A single path is returned as is. The concatenation is memoized under
/// `<dir>/merge`; when it is a cache hit and the merged file already holds
/// that entry's result, nothing is written.
pub fn do_3d_to_4d_merge(volumes: &Volumes) -> Result<PathBuf> {
    let paths = match volumes {
        Volumes::Single(path) => return Ok(path.clone()),
        Volumes::Series(paths) => paths,
    };
    let first = paths
        .first()
        .ok_or_else(|| Error::invalid_argument("no volumes to merge"))?;

    let dir = match first.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let memory = Memory::new(dir.join(MERGE_CACHE_DIR));
    fs::create_dir_all(memory.location())?;

    let mut key = CallKey::new("concat_images");
    for (i, path) in paths.iter().enumerate() {
        key = key.file(&format!("image{}", i), path)?;
    }
    let cached = memory.cache(&key, || concat_images(paths))?;

    let output = dir.join(MERGED_FILE_NAME);
    let key_file = memory.location().join(OUTPUT_KEY_FILE);
    let digest = key.digest();
    if cached.hit && output.exists() && written_key(&key_file).as_deref() == Some(digest.as_str()) {
        info!("Merged image already up to date: {}", output.display());
        return Ok(output);
    }

    let merged = squeeze_singleton_axis(cached.volume)?;
    write_volume(&output, &merged)?;
    fs::write(&key_file, &digest)?;
    info!("Merged {} volumes into {}", paths.len(), output.display());
    Ok(output)
}

fn written_key(key_file: &Path) -> Option<String> {
    fs::read_to_string(key_file).ok().map(|s| s.trim().to_string())
}
