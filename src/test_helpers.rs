//! Shared test utilities: save files with controlled mtimes, record fixtures,
//! and lookup helpers.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_save(tmp.path(), "Factory_autosave_0.sav", b"old", at(100));
//! write_save(tmp.path(), "Factory_autosave_1.sav", b"new", at(200));
//! ```

use crate::naming::VersionToken;
use crate::types::{SaveRecord, VersionSource};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

// =========================================================================
// Filesystem fixtures
// =========================================================================

/// A fixed point in time, `offset_secs` after a base instant in late 2023.
pub fn at(offset_secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(1_700_000_000 + offset_secs)
}

/// Write `contents` to `dir/name` and set its modification time.
pub fn write_save(dir: &Path, name: &str, contents: &[u8], modified: SystemTime) {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    let file = std::fs::File::options().write(true).open(&path).unwrap();
    file.set_modified(modified).unwrap();
}

// =========================================================================
// Record fixtures
// =========================================================================

/// A record ranked by mtime, as the scanner would build it.
pub fn record(base_name: &str, path: &str, offset_secs: u64) -> SaveRecord {
    let modified = DateTime::<Utc>::from(at(offset_secs));
    SaveRecord {
        base_name: base_name.to_string(),
        version: VersionToken::None,
        version_key: modified,
        version_source: VersionSource::Modified,
        path: path.into(),
        modified_at: modified,
        size: 1,
    }
}

// =========================================================================
// Lookup helpers
// =========================================================================

/// File names of the given records, in order.
pub fn record_file_names(records: &[SaveRecord]) -> Vec<String> {
    records.iter().map(|r| r.file_name()).collect()
}
