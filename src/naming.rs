//! Save filename parsing.
//!
//! The game names every save after its session plus an optional version
//! suffix. All versions of one session share a *base name*:
//!
//! - `Factory_autosave_0.sav` → base `Factory`, autosave slot 0
//! - `Factory_2024.03.17-21.04.55.sav` → base `Factory`, embedded timestamp
//! - `Factory_20240317-210455.sav` → base `Factory`, embedded timestamp
//! - `Factory.sav` → base `Factory`, no version token
//!
//! The rule lives behind [`SaveNameParser`] so another game (or another
//! rotation scheme) can be plugged in without touching the scanner, the
//! resolver or the HTTP layer.
//!
//! ## Autosave slots are not versions
//!
//! Autosaves rotate through a small ring of slots (`_0`, `_1`, `_2`, then back
//! to `_0`), so the slot number says nothing about which file is newest. The
//! token is kept for display; ranking falls back to the file's mtime.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

/// Version information embedded in a save filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum VersionToken {
    /// Plain `<name>.sav`.
    None,
    /// Autosave ring slot (`<name>_autosave_<n>.sav`).
    Sequence(u32),
    /// Timestamp embedded in the name, read as UTC.
    Timestamp(DateTime<Utc>),
}

impl VersionToken {
    /// The embedded timestamp, if the name carried one.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            VersionToken::Timestamp(t) => Some(*t),
            _ => None,
        }
    }
}

/// Result of parsing a save filename like `Factory_autosave_1.sav`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSaveName {
    pub base_name: String,
    pub version: VersionToken,
}

/// Strategy for recognising save files and extracting their identity.
///
/// Returns `None` for anything that is not a save candidate; the scanner
/// skips those entries without complaint.
pub trait SaveNameParser: Send + Sync {
    fn parse(&self, file_name: &str) -> Option<ParsedSaveName>;
}

const AUTOSAVE_MARKER: &str = "_autosave_";

/// Timestamp layouts seen in save names, tried in order.
const TIMESTAMP_FORMATS: &[&str] = &["%Y.%m.%d-%H.%M.%S", "%Y%m%d-%H%M%S"];

/// Satisfactory naming: `<session>[_autosave_<n> | _<timestamp>].<ext>`.
#[derive(Debug, Clone)]
pub struct SatisfactoryNaming {
    extensions: Vec<String>,
}

impl SatisfactoryNaming {
    /// Accept files whose extension matches one of `extensions`
    /// (case-insensitive, without the leading dot).
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    fn has_save_extension(&self, ext: &str) -> bool {
        let ext = ext.to_ascii_lowercase();
        self.extensions.iter().any(|e| *e == ext)
    }
}

impl Default for SatisfactoryNaming {
    fn default() -> Self {
        Self::new(["sav"])
    }
}

impl SaveNameParser for SatisfactoryNaming {
    fn parse(&self, file_name: &str) -> Option<ParsedSaveName> {
        if file_name.starts_with('.') {
            return None;
        }
        let (stem, ext) = file_name.rsplit_once('.')?;
        if !self.has_save_extension(ext) {
            return None;
        }

        let (base, version) = split_version(stem);
        if base.is_empty() {
            return None;
        }
        Some(ParsedSaveName {
            base_name: base.to_string(),
            version,
        })
    }
}

/// Split a stem into base name and version token.
///
/// - `"Factory_autosave_3"` → ("Factory", Sequence(3))
/// - `"Factory_2024.03.17-21.04.55"` → ("Factory", Timestamp(..))
/// - `"Factory_autosave_x"` → ("Factory_autosave_x", None)
/// - `"My_Factory"` → ("My_Factory", None)
fn split_version(stem: &str) -> (&str, VersionToken) {
    if let Some(pos) = stem.rfind(AUTOSAVE_MARKER) {
        let digits = &stem[pos + AUTOSAVE_MARKER.len()..];
        if !digits.is_empty()
            && digits.bytes().all(|b| b.is_ascii_digit())
            && let Ok(n) = digits.parse::<u32>()
        {
            return (&stem[..pos], VersionToken::Sequence(n));
        }
    }

    if let Some((base, token)) = stem.rsplit_once('_')
        && let Some(at) = parse_timestamp(token)
    {
        return (base, VersionToken::Timestamp(at));
    }

    (stem, VersionToken::None)
}

fn parse_timestamp(token: &str) -> Option<DateTime<Utc>> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(token, fmt).ok())
        .map(|naive| naive.and_utc())
}
