use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nitk_core::Interpolation;
use nitk_io::merge::MERGE_CACHE_DIR;
use nitk_io::resample::RESAMPLE_CACHE_DIR;
use nitk_io::{
    delete_orientation, do_3d_to_4d_merge, get_vox_dims, image_shape, resample_img_with,
    FslOrient, HeaderOrientationEditor, Memory, OrientationEditor, ResampleOptions, Volumes,
};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "nitk")]
#[command(about = "NIfTI volume utilities")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print whether an image has exactly three axes
    #[command(name = "is-3d")]
    Is3d {
        image: PathBuf,
    },

    /// Print whether an image has exactly four axes
    #[command(name = "is-4d")]
    Is4d {
        image: PathBuf,
    },

    /// Print the voxel size of the first three axes
    VoxDims {
        image: PathBuf,
    },

    /// Copy images and strip their qform/sform orientation
    DeleteOrient {
        /// Images to process
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Directory receiving the copies
        #[arg(short, long)]
        output: PathBuf,

        /// Tag inserted into the output names
        #[arg(short, long)]
        tag: String,

        /// Rewrite headers directly instead of running fslorient
        #[arg(long)]
        native: bool,
    },

    /// Stack 3D volumes into <dir>/fourD_func.nii
    Merge {
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },

    /// Resample an image to a new voxel size
    Resample {
        image: PathBuf,

        /// Target voxel size (x y z)
        #[arg(num_args = 3, required = true, value_names = ["X", "Y", "Z"])]
        vox_dims: Vec<f64>,

        /// Output path (default: <dir>/resample_<name>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Use nearest neighbour instead of trilinear interpolation
        #[arg(long)]
        nearest: bool,

        /// Do not read or write the resample cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Remove merge and resample caches below a directory
    ClearCache {
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Is3d { image } => {
            println!("{}", axis_count(&image)? == 3);
        }
        Commands::Is4d { image } => {
            println!("{}", axis_count(&image)? == 4);
        }
        Commands::VoxDims { image } => {
            let [x, y, z] = get_vox_dims(&image)
                .with_context(|| format!("reading voxel size of {}", image.display()))?;
            println!("{} {} {}", x, y, z);
        }
        Commands::DeleteOrient { images, output, tag, native } => {
            let editor: Box<dyn OrientationEditor> = if native {
                Box::new(HeaderOrientationEditor::new())
            } else {
                Box::new(FslOrient::from_env())
            };
            let result = delete_orientation(&Volumes::from_paths(images), &output, &tag, editor.as_ref())
                .context("deleting orientation")?;
            for path in result.paths() {
                println!("{}", path.display());
            }
        }
        Commands::Merge { images } => {
            let merged = do_3d_to_4d_merge(&Volumes::from_paths(images)).context("merging volumes")?;
            println!("{}", merged.display());
        }
        Commands::Resample { image, vox_dims, output, nearest, no_cache } => {
            let new_vox_dims = parse_vox_dims(&vox_dims)?;
            let mut options = ResampleOptions::new();
            if nearest {
                options = options.with_interpolation(Interpolation::Nearest);
            }
            if no_cache {
                options = options.without_cache();
            }
            let resampled = resample_img_with(&image, new_vox_dims, output.as_deref(), &options)
                .with_context(|| format!("resampling {}", image.display()))?;
            println!("{}", resampled.display());
        }
        Commands::ClearCache { dir } => {
            clear_caches(&dir)?;
        }
    }

    Ok(())
}

fn axis_count(image: &Path) -> Result<usize> {
    let shape = image_shape(image).with_context(|| format!("reading header of {}", image.display()))?;
    info!("{}: shape {:?}", image.display(), shape);
    Ok(shape.len())
}

fn parse_vox_dims(values: &[f64]) -> Result<[f64; 3]> {
    match values {
        [x, y, z] => Ok([*x, *y, *z]),
        _ => anyhow::bail!("expected three voxel sizes, got {}", values.len()),
    }
}

fn clear_caches(dir: &Path) -> Result<()> {
    for name in [MERGE_CACHE_DIR, RESAMPLE_CACHE_DIR] {
        Memory::new(dir.join(name))
            .clear()
            .with_context(|| format!("clearing {}", dir.join(name).display()))?;
    }
    info!("Caches cleared in {}", dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resample() {
        let cli = Cli::try_parse_from(["nitk", "resample", "in.nii", "1", "1", "2.5", "--nearest"]).unwrap();
        match cli.command {
            Commands::Resample { image, vox_dims, nearest, no_cache, output } => {
                assert_eq!(image, PathBuf::from("in.nii"));
                assert_eq!(parse_vox_dims(&vox_dims).unwrap(), [1.0, 1.0, 2.5]);
                assert!(nearest);
                assert!(!no_cache);
                assert!(output.is_none());
            }
            _ => panic!("wrong subcommand"),
        }
    }

    #[test]
    fn test_parse_delete_orient() {
        let cli = Cli::try_parse_from([
            "nitk", "delete-orient", "a.nii", "b.nii", "--output", "out", "--tag", "run1", "--native",
        ])
        .unwrap();
        match cli.command {
            Commands::DeleteOrient { images, tag, native, .. } => {
                assert_eq!(images.len(), 2);
                assert_eq!(tag, "run1");
                assert!(native);
            }
            _ => panic!("wrong subcommand"),
        }
    }

    #[test]
    fn test_dimension_subcommand_names() {
        assert!(matches!(
            Cli::try_parse_from(["nitk", "is-3d", "a.nii"]).unwrap().command,
            Commands::Is3d { .. }
        ));
        assert!(matches!(
            Cli::try_parse_from(["nitk", "is-4d", "a.nii"]).unwrap().command,
            Commands::Is4d { .. }
        ));
    }

    #[test]
    fn test_resample_needs_three_sizes() {
        assert!(Cli::try_parse_from(["nitk", "resample", "in.nii", "1", "1"]).is_err());
    }
}
