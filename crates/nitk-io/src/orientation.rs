//! Removing orientation metadata from NIfTI files.
//!
//! [`delete_orientation`] copies each input next to the requested output
//! directory and hands the copy to an [`OrientationEditor`]. Two editors are
//! provided: [`FslOrient`], which shells out to `fslorient -deleteorient`, and
//! [`HeaderOrientationEditor`], which patches the header bytes directly.

use std::env;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::volumes::Volumes;

/// Something that strips qform/sform orientation from a NIfTI file in place.
pub trait OrientationEditor {
    /// Short name for logging.
    fn name(&self) -> &str;

    /// Remove orientation information from the file at `path`, rewriting it.
    fn delete_orientation(&self, path: &Path) -> Result<()>;
}

/// Runs FSL's `fslorient -deleteorient <file>`.
#[derive(Debug, Clone)]
pub struct FslOrient {
    program: PathBuf,
}

impl FslOrient {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// `$FSLDIR/bin/fslorient` when that file exists, else `fslorient` from `PATH`.
    pub fn from_env() -> Self {
        if let Some(fsl_dir) = env::var_os("FSLDIR") {
            let candidate = PathBuf::from(fsl_dir).join("bin").join("fslorient");
            if candidate.is_file() {
                return Self::new(candidate);
            }
            warn!("FSLDIR is set but {} does not exist", candidate.display());
        }
        Self::new("fslorient")
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Default for FslOrient {
    fn default() -> Self {
        Self::from_env()
    }
}

impl OrientationEditor for FslOrient {
    fn name(&self) -> &str {
        "fslorient"
    }

    fn delete_orientation(&self, path: &Path) -> Result<()> {
        debug!("Running {} -deleteorient {}", self.program.display(), path.display());
        let output = Command::new(&self.program)
            .arg("-deleteorient")
            .arg(path)
            .output()
            .map_err(|source| Error::ToolUnavailable {
                program: self.program.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stdout.trim().is_empty() {
            info!("{}: {}", self.name(), stdout.trim());
        }
        if !stderr.trim().is_empty() {
            warn!("{}: {}", self.name(), stderr.trim());
        }

        if !output.status.success() {
            return Err(Error::ExternalTool {
                program: self.program.display().to_string(),
                status: output.status,
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(())
    }
}

// NIfTI-1 header layout
const HEADER_SIZE: usize = 348;
const QFORM_CODE: usize = 252;
const SFORM_CODE: usize = 254;
const QUATERN_B: usize = 256;
const SROW_X: usize = 280;
const SROW_END: usize = 328;
const MAGIC: usize = 344;

/// Rewrites the header without any external program.
///
/// Zeroes `qform_code`, `sform_code`, the quaternion and offset parameters and
/// the three `srow` rows. Voxel data is left untouched. Works on `.nii` and
/// gzip-compressed files in either byte order.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderOrientationEditor;

impl HeaderOrientationEditor {
    pub fn new() -> Self {
        Self
    }
}

impl OrientationEditor for HeaderOrientationEditor {
    fn name(&self) -> &str {
        "header"
    }

    fn delete_orientation(&self, path: &Path) -> Result<()> {
        let raw = fs::read(path)?;
        let gzipped = raw.starts_with(&[0x1f, 0x8b]);

        let mut bytes = if gzipped {
            let mut decoded = Vec::new();
            GzDecoder::new(raw.as_slice()).read_to_end(&mut decoded)?;
            decoded
        } else {
            raw
        };

        strip_orientation(&mut bytes)?;

        let permissions = fs::metadata(path)?.permissions();
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.as_file().set_permissions(permissions)?;
        if gzipped {
            let mut encoder = GzEncoder::new(tmp.as_file_mut(), Compression::default());
            encoder.write_all(&bytes)?;
            encoder.finish()?;
        } else {
            tmp.write_all(&bytes)?;
        }
        tmp.persist(path)
            .map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

/// Zero the orientation fields of an in-memory NIfTI-1 header.
pub fn strip_orientation(bytes: &mut [u8]) -> Result<()> {
    if bytes.len() < HEADER_SIZE {
        return Err(Error::invalid_argument(format!(
            "NIfTI header needs {} bytes, found {}",
            HEADER_SIZE,
            bytes.len()
        )));
    }
    let magic = &bytes[MAGIC..MAGIC + 4];
    if magic != b"n+1\0" && magic != b"ni1\0" {
        return Err(Error::invalid_argument("not a NIfTI-1 header"));
    }

    if LittleEndian::read_i32(&bytes[0..4]) == HEADER_SIZE as i32 {
        zero_fields::<LittleEndian>(bytes);
    } else if BigEndian::read_i32(&bytes[0..4]) == HEADER_SIZE as i32 {
        zero_fields::<BigEndian>(bytes);
    } else {
        return Err(Error::invalid_argument("sizeof_hdr is not 348"));
    }
    Ok(())
}

fn zero_fields<E: ByteOrder>(bytes: &mut [u8]) {
    debug!(
        "Clearing qform_code={} sform_code={}",
        E::read_i16(&bytes[QFORM_CODE..]),
        E::read_i16(&bytes[SFORM_CODE..])
    );
    E::write_i16(&mut bytes[QFORM_CODE..], 0);
    E::write_i16(&mut bytes[SFORM_CODE..], 0);

    // quatern_b/c/d, qoffset_x/y/z, srow_x/y/z
    let floats = (SROW_END - QUATERN_B) / 4;
    E::write_f32_into(&vec![0.0; floats], &mut bytes[QUATERN_B..SROW_END]);
}

/// Copy every input into `output_dir` as `deleteorient_<tag>_<basename>` and
/// strip the orientation of each copy with `editor`.
///
/// Inputs are never modified. The result mirrors the input: one path for
/// [`Volumes::Single`], the copies in input order for [`Volumes::Series`].
pub fn delete_orientation(
    imgs: &Volumes,
    output_dir: &Path,
    output_tag: &str,
    editor: &dyn OrientationEditor,
) -> Result<Volumes> {
    fs::create_dir_all(output_dir)?;

    let mut outputs = Vec::with_capacity(imgs.len());
    for input in imgs.paths() {
        let basename = input.file_name().ok_or_else(|| {
            Error::invalid_argument(format!("{} has no file name", input.display()))
        })?;
        let target = output_dir.join(format!(
            "deleteorient_{}_{}",
            output_tag,
            basename.to_string_lossy()
        ));

        fs::copy(input, &target)?;
        editor.delete_orientation(&target)?;
        info!("Deleted orientation ({}): {}", editor.name(), target.display());
        outputs.push(target);
    }

    Ok(match imgs {
        Volumes::Single(_) => Volumes::Single(outputs.remove(0)),
        Volumes::Series(_) => Volumes::Series(outputs),
    })
}
