use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::Result;
use crate::types::ArchiveFile;

/// Writes archive documents under the archive directory, one file per reset
/// event. Existing files are never overwritten; the history is append-only.
pub struct ArchiveWriter {
    dir: PathBuf,
}

impl ArchiveWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist the archive as `{channel}_{stamp}.json`. Two captures inside
    /// the same second get `_2`, `_3`, ... suffixes instead of clobbering.
    pub fn write(&self, archive: &ArchiveFile, stamp: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;

        let base = format!("{}_{stamp}", archive.channel_name);
        let mut path = self.dir.join(format!("{base}.json"));
        let mut attempt = 2;
        while path.exists() {
            path = self.dir.join(format!("{base}_{attempt}.json"));
            attempt += 1;
        }

        let json = serde_json::to_string_pretty(archive)?;
        std::fs::write(&path, json)?;
        info!(
            path = %path.display(),
            pins = archive.pin_count,
            "archive written"
        );
        Ok(path)
    }
}
