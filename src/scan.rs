//! Save directory scanning.
//!
//! Lists the save directory once and turns every entry that looks like a save
//! into a [`SaveRecord`]. The directory is flat, as the dedicated server writes
//! it:
//!
//! ```text
//! SaveGames/server/
//! ├── Factory_autosave_0.sav       # autosave ring, ranked by mtime
//! ├── Factory_autosave_1.sav
//! ├── Factory_autosave_2.sav
//! ├── Factory_20240317-210455.sav  # manual save, ranked by embedded time
//! ├── Outpost.sav
//! ├── ServerSettings.7777.sav      # base name "ServerSettings.7777"
//! └── notes.txt                    # not a save, skipped
//! ```
//!
//! ## Failure handling
//!
//! Failing to list the directory is an error: at startup it is fatal, per
//! request it becomes a server fault. Problems with a single entry are not.
//! The game may be writing a new save while we scan, so an entry can vanish,
//! be unreadable, or still be empty; those are logged and left out of this
//! scan. The next scan picks them up once the write has finished.

use crate::naming::SaveNameParser;
use crate::types::{SaveRecord, VersionPolicy, VersionSource};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("cannot read save directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("scan task failed: {0}")]
    Task(String),
}

/// Scans one save directory with a fixed naming rule and version policy.
#[derive(Clone)]
pub struct Scanner {
    dir: PathBuf,
    parser: Arc<dyn SaveNameParser>,
    policy: VersionPolicy,
}

impl Scanner {
    pub fn new(dir: impl Into<PathBuf>, parser: Arc<dyn SaveNameParser>, policy: VersionPolicy) -> Self {
        Self {
            dir: dir.into(),
            parser,
            policy,
        }
    }

    /// List the directory and build a record for every readable save.
    ///
    /// Records come back sorted by path so callers see a stable order.
    pub fn scan(&self) -> Result<Vec<SaveRecord>, ScanError> {
        let entries = fs::read_dir(&self.dir).map_err(|source| ScanError::ReadDir {
            path: self.dir.clone(),
            source,
        })?;

        let mut records = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    warn!(dir = %self.dir.display(), %err, "skipping unreadable directory entry");
                    continue;
                }
            };
            if let Some(record) = self.read_entry(&entry.path()) {
                records.push(record);
            }
        }

        records.sort_by(|a, b| a.path.cmp(&b.path));
        debug!(dir = %self.dir.display(), count = records.len(), "scan complete");
        Ok(records)
    }

    fn read_entry(&self, path: &Path) -> Option<SaveRecord> {
        let file_name = path.file_name()?.to_string_lossy();
        let Some(parsed) = self.parser.parse(&file_name) else {
            debug!(path = %path.display(), "not a save file");
            return None;
        };

        // Follows symlinks, so a linked save counts as a file.
        let metadata = match fs::metadata(path) {
            Ok(m) => m,
            Err(err) => {
                warn!(path = %path.display(), %err, "skipping save: metadata unavailable");
                return None;
            }
        };
        if !metadata.is_file() {
            debug!(path = %path.display(), "not a regular file");
            return None;
        }
        if metadata.len() == 0 {
            warn!(path = %path.display(), "skipping save: file is empty (still being written?)");
            return None;
        }
        let modified = match metadata.modified() {
            Ok(t) => DateTime::<Utc>::from(t),
            Err(err) => {
                warn!(path = %path.display(), %err, "skipping save: no modification time");
                return None;
            }
        };
        if let Err(err) = fs::File::open(path) {
            warn!(path = %path.display(), %err, "skipping save: cannot open for reading");
            return None;
        }

        let (version_key, version_source) = match (self.policy, parsed.version.timestamp()) {
            (VersionPolicy::EmbeddedThenModified, Some(at)) => (at, VersionSource::Embedded),
            _ => (modified, VersionSource::Modified),
        };

        Some(SaveRecord {
            base_name: parsed.base_name,
            version: parsed.version,
            version_key,
            version_source,
            path: path.to_path_buf(),
            modified_at: modified,
            size: metadata.len(),
        })
    }
}
