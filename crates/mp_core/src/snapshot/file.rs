use std::fs::{rename, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use super::error::SnapshotError;
use super::format::{decode_snapshot, encode_snapshot, StoreSnapshot};

/// A snapshot's home on disk.
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Write via a temp file and rename into place, so a crash mid-write
    /// never leaves a truncated snapshot behind.
    pub fn save(&self, snapshot: &StoreSnapshot) -> Result<(), SnapshotError> {
        let bytes = encode_snapshot(snapshot)?;

        let tmp = self.path.with_extension("tmp");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        rename(&tmp, &self.path)?;

        log::info!("snapshot saved to {} ({} bytes)", self.path.display(), bytes.len());
        Ok(())
    }

    pub fn load(&self) -> Result<StoreSnapshot, SnapshotError> {
        if !self.path.exists() {
            return Err(SnapshotError::FileNotFound {
                path: self.path.display().to_string(),
            });
        }

        let mut bytes = Vec::new();
        File::open(&self.path)?.read_to_end(&mut bytes)?;

        let snapshot = decode_snapshot(&bytes)?;
        log::info!(
            "snapshot loaded from {} ({} matches, {} records, {} posts)",
            self.path.display(),
            snapshot.matches.len(),
            snapshot.records.len(),
            snapshot.posts.len()
        );
        Ok(snapshot)
    }
}
