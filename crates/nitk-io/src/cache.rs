//! Directory-backed memoization of volume-producing computations.
//!
//! Layout of one entry:
//!
//! ```text
//! <location>/<function>/<sha256 key>/output.nii
//! <location>/<function>/<sha256 key>/manifest.json
//! ```
//!
//! The key covers the function name, every argument value and the SHA-256
//! digest of every input file, so rewriting an input in place produces a new
//! entry. Entries are never evicted.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::nifti_io::{read_volume, write_volume, Volume};

const OUTPUT_FILE: &str = "output.nii";
const MANIFEST_FILE: &str = "manifest.json";

/// Identity of one memoized call.
#[derive(Clone)]
pub struct CallKey {
    function: String,
    arguments: Vec<String>,
    hasher: Sha256,
}

impl CallKey {
    pub fn new(function: impl Into<String>) -> Self {
        let function = function.into();
        let mut key = Self {
            function: String::new(),
            arguments: Vec::new(),
            hasher: Sha256::new(),
        };
        key.feed(function.as_bytes());
        key.function = function;
        key
    }

    /// Add a plain argument value.
    pub fn arg(mut self, name: &str, value: impl std::fmt::Display) -> Self {
        let entry = format!("{}={}", name, value);
        self.feed(entry.as_bytes());
        self.arguments.push(entry);
        self
    }

    /// Add an input file: its path and the digest of its current contents.
    pub fn file(mut self, name: &str, path: &Path) -> Result<Self> {
        let digest = file_digest(path)?;
        let entry = format!("{}={} (sha256:{})", name, path.display(), digest);
        self.feed(entry.as_bytes());
        self.arguments.push(entry);
        Ok(self)
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    /// Hex SHA-256 of everything fed so far.
    pub fn digest(&self) -> String {
        hex::encode(self.hasher.clone().finalize())
    }

    // length prefix keeps ("ab", "c") and ("a", "bc") apart
    fn feed(&mut self, bytes: &[u8]) {
        self.hasher.update((bytes.len() as u64).to_le_bytes());
        self.hasher.update(bytes);
    }
}

impl std::fmt::Debug for CallKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallKey")
            .field("function", &self.function)
            .field("arguments", &self.arguments)
            .field("digest", &self.digest())
            .finish()
    }
}

/// SHA-256 of a file's bytes, hex encoded.
pub fn file_digest(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Description stored next to each cached output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub function: String,
    pub arguments: Vec<String>,
    pub key: String,
    /// Seconds since the Unix epoch.
    pub created: u64,
}

/// Result of a memoized call.
#[derive(Debug, Clone)]
pub struct Cached {
    pub volume: Volume,
    /// `true` when the value was loaded from disk instead of computed.
    pub hit: bool,
}

/// On-disk memoization store rooted at one directory.
#[derive(Debug, Clone)]
pub struct Memory {
    location: PathBuf,
}

impl Memory {
    /// The directory is created on first write.
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
        }
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    fn entry_dir(&self, key: &CallKey) -> PathBuf {
        self.location.join(key.function()).join(key.digest())
    }

    /// Whether a complete entry exists for `key`.
    pub fn is_cached(&self, key: &CallKey) -> bool {
        let dir = self.entry_dir(key);
        dir.join(OUTPUT_FILE).is_file() && dir.join(MANIFEST_FILE).is_file()
    }

    /// Manifest of the entry for `key`, if present.
    pub fn manifest(&self, key: &CallKey) -> Result<Option<Manifest>> {
        let path = self.entry_dir(key).join(MANIFEST_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let manifest = serde_json::from_reader(File::open(path)?)?;
        Ok(Some(manifest))
    }

    /// Return the stored volume for `key`, or run `compute`, store its
    /// result and return it.
    pub fn cache<F>(&self, key: &CallKey, compute: F) -> Result<Cached>
    where
        F: FnOnce() -> Result<Volume>,
    {
        let dir = self.entry_dir(key);
        let digest = key.digest();

        if self.is_cached(key) {
            info!("Cache hit for {} [{}]", key.function(), &digest[..12]);
            let volume = read_volume(dir.join(OUTPUT_FILE))?;
            return Ok(Cached { volume, hit: true });
        }

        info!("Cache miss for {} [{}], computing", key.function(), &digest[..12]);
        let volume = compute()?;
        self.store(key, &volume)?;
        Ok(Cached { volume, hit: false })
    }

    fn store(&self, key: &CallKey, volume: &Volume) -> Result<()> {
        let dir = self.entry_dir(key);
        fs::create_dir_all(&dir)?;

        // write to temporaries in the same directory, then rename into place
        let output = tempfile::Builder::new()
            .prefix(".output")
            .suffix(".nii")
            .tempfile_in(&dir)?;
        write_volume(output.path(), volume)?;
        persist(output, &dir.join(OUTPUT_FILE))?;

        let manifest = Manifest {
            function: key.function().to_string(),
            arguments: key.arguments.clone(),
            key: key.digest(),
            created: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
        };
        let mut manifest_file = NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut manifest_file, &manifest)?;
        persist(manifest_file, &dir.join(MANIFEST_FILE))?;

        debug!("Stored cache entry {}", dir.display());
        Ok(())
    }

    /// Remove every entry.
    pub fn clear(&self) -> Result<()> {
        if self.location.exists() {
            info!("Removing cache directory: {}", self.location.display());
            fs::remove_dir_all(&self.location)?;
        }
        Ok(())
    }
}

fn persist(file: NamedTempFile, target: &Path) -> Result<()> {
    file.persist(target)
        .map(|_| ())
        .map_err(|e| Error::cache(format!("could not persist {}: {}", target.display(), e.error)))
}
