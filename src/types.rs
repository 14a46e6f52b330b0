//! Shared types passed between the scanner, the resolver and the HTTP layer.

use crate::naming::VersionToken;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One save file found by a scan.
///
/// Records are immutable; every scan produces fresh ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveRecord {
    /// Logical save identity shared by all versions (`Factory`).
    pub base_name: String,
    /// Version token parsed from the filename.
    pub version: VersionToken,
    /// Ranking key within the group.
    pub version_key: DateTime<Utc>,
    /// Where `version_key` came from.
    pub version_source: VersionSource,
    pub path: PathBuf,
    pub modified_at: DateTime<Utc>,
    pub size: u64,
}

impl SaveRecord {
    /// Filename component of `path`, lossily converted.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Origin of a record's `version_key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionSource {
    /// Timestamp embedded in the filename.
    Embedded,
    /// Filesystem modification time.
    Modified,
}

/// How the scanner derives `version_key`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionPolicy {
    /// Use the filename's embedded timestamp when present, else the mtime.
    #[default]
    EmbeddedThenModified,
    /// Always rank by mtime, ignoring embedded timestamps.
    ModifiedOnly,
}
