//! CLI output formatting for the `list` command.
//!
//! # Output Format
//!
//! ```text
//! Saves in /srv/saves
//! Factory (3 versions)
//!     Latest: Factory_autosave_1.sav
//!     Modified: 2024-03-17 21:04:55 UTC (mtime)
//!     Size: 12.3 MiB
//!     Link: https://saves.example.com/map/Factory
//! Outpost (1 version)
//!     Latest: Outpost_20240301-120000.sav
//!     Modified: 2024-03-02 08:15:00 UTC (version 2024-03-01 12:00:00 UTC from name)
//!     Size: 2.1 MiB
//!     Link: https://saves.example.com/map/Outpost
//!
//! 2 saves
//! ```
//!
//! `format_*` functions return lines and do no I/O; `print_*` wrappers write
//! them to stdout.

use crate::render::{IndexLinks, format_size};
use crate::resolve::{Catalog, SaveGroup};
use crate::types::VersionSource;
use std::path::Path;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

fn group_lines(group: &SaveGroup, links: Option<&IndexLinks>) -> Vec<String> {
    let latest = &group.latest;
    let mut lines = vec![format!(
        "{} ({})",
        group.base_name,
        plural(group.candidate_count, "version")
    )];
    lines.push(format!("{}Latest: {}", indent(1), latest.file_name()));

    let modified = latest.modified_at.format(TIME_FORMAT);
    let ranking = match latest.version_source {
        VersionSource::Modified => "mtime".to_string(),
        VersionSource::Embedded => {
            format!("version {} from name", latest.version_key.format(TIME_FORMAT))
        }
    };
    lines.push(format!("{}Modified: {modified} ({ranking})", indent(1)));
    lines.push(format!("{}Size: {}", indent(1), format_size(latest.size)));
    if let Some(links) = links {
        lines.push(format!(
            "{}Link: {}",
            indent(1),
            links.save_url(&group.base_name)
        ));
    }
    lines
}

/// Human-readable listing of a catalog.
pub fn format_catalog(catalog: &Catalog, save_dir: &Path, links: Option<&IndexLinks>) -> Vec<String> {
    let mut lines = vec![format!("Saves in {}", save_dir.display())];
    for group in catalog.groups() {
        lines.extend(group_lines(group, links));
    }
    lines.push(String::new());
    lines.push(plural(catalog.len(), "save"));
    lines
}

pub fn print_catalog(catalog: &Catalog, save_dir: &Path, links: Option<&IndexLinks>) {
    for line in format_catalog(catalog, save_dir, links) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::resolve;
    use crate::test_helpers::record;
    use url::Url;

    #[test]
    fn empty_catalog() {
        let lines = format_catalog(&Catalog::default(), Path::new("/srv/saves"), None);
        assert_eq!(lines, vec!["Saves in /srv/saves", "", "0 saves"]);
    }

    #[test]
    fn groups_with_links() {
        let catalog = resolve(vec![
            record("Factory", "/s/Factory_autosave_0.sav", 10),
            record("Factory", "/s/Factory_autosave_1.sav", 20),
            record("Outpost", "/s/Outpost.sav", 5),
        ]);
        let links = IndexLinks::new(Url::parse("https://saves.example.com").unwrap(), None);
        let lines = format_catalog(&catalog, Path::new("/s"), Some(&links));

        assert_eq!(lines[1], "Factory (2 versions)");
        assert_eq!(lines[2], "    Latest: Factory_autosave_1.sav");
        assert!(lines[3].starts_with("    Modified: ") && lines[3].ends_with("(mtime)"));
        assert_eq!(lines[4], "    Size: 1 B");
        assert_eq!(lines[5], "    Link: https://saves.example.com/map/Factory");
        assert_eq!(lines[6], "Outpost (1 version)");
        assert_eq!(lines.last().unwrap(), "2 saves");
    }

    #[test]
    fn without_links() {
        let catalog = resolve(vec![record("Alpha", "/s/Alpha.sav", 1)]);
        let lines = format_catalog(&catalog, Path::new("/s"), None);
        assert!(lines.iter().all(|l| !l.contains("Link:")));
        assert_eq!(lines.last().unwrap(), "1 save");
    }
}
