//! HTML rendering of the save index.
//!
//! Uses [maud](https://maud.lambda.xyz/) like the rest of the HTML in this
//! crate: templates are Rust code and every interpolation is escaped, which
//! matters here because save names come straight from the filesystem.
//!
//! ## Links
//!
//! Every save is listed with an absolute link built from the configured
//! `base_url`, `<base_url>/map/<name>`, with the name percent-encoded as a
//! path segment. When a viewer URL is configured, a second link opens the save
//! in the interactive map by passing the save link as its `url` parameter.

use crate::config::{ConfigError, ServerConfig};
use crate::resolve::{Catalog, SaveGroup};
use maud::{DOCTYPE, Markup, html};
use url::Url;

const CSS: &str = r#"
body { font-family: system-ui, sans-serif; margin: 2rem auto; max-width: 60rem; padding: 0 1rem; }
table { border-collapse: collapse; width: 100%; }
th, td { text-align: left; padding: .4rem .6rem; border-bottom: 1px solid #ddd; }
td.num { text-align: right; font-variant-numeric: tabular-nums; }
p.empty { color: #666; }
"#;

/// Absolute link builder for index pages.
#[derive(Debug, Clone)]
pub struct IndexLinks {
    base: Url,
    viewer: Option<Url>,
}

impl IndexLinks {
    pub fn new(base: Url, viewer: Option<Url>) -> Self {
        Self { base, viewer }
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self, ConfigError> {
        let viewer = if config.http.viewer_url.is_empty() {
            None
        } else {
            Some(Url::parse(&config.http.viewer_url).map_err(|e| {
                ConfigError::Validation(format!("http.viewer_url is not a valid URL: {e}"))
            })?)
        };
        Ok(Self::new(config.base_url()?, viewer))
    }

    /// `<base_url>/map/<name>`.
    pub fn save_url(&self, base_name: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("map").push(base_name);
        }
        url
    }

    /// `<viewer_url>?url=<save link>`, when a viewer is configured.
    pub fn viewer_url(&self, save_url: &Url) -> Option<Url> {
        self.viewer.as_ref().map(|viewer| {
            let mut url = viewer.clone();
            url.query_pairs_mut().append_pair("url", save_url.as_str());
            url
        })
    }
}

/// Renders the base HTML document structure
fn base_document(title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (CSS) }
            }
            body {
                (content)
            }
        }
    }
}

fn render_row(group: &SaveGroup, links: &IndexLinks) -> Markup {
    let save_url = links.save_url(&group.base_name);
    let viewer_url = links.viewer_url(&save_url);
    let latest = &group.latest;

    html! {
        tr {
            td {
                a.save href=(save_url.as_str()) { (group.base_name) }
            }
            td { (latest.file_name()) }
            td.num { (format_size(latest.size)) }
            td { (latest.modified_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()) }
            td.num { (group.candidate_count) }
            @if let Some(viewer) = viewer_url {
                td { a.viewer href=(viewer.as_str()) target="_blank" rel="noopener" { "Open map" } }
            }
        }
    }
}

/// Renders the index page listing every save in base-name order.
pub fn render_index(catalog: &Catalog, links: &IndexLinks) -> Markup {
    let content = html! {
        h1 { "Saves" }
        @if catalog.is_empty() {
            p.empty { "No saves found." }
        } @else {
            table {
                thead {
                    tr {
                        th { "Save" }
                        th { "Latest file" }
                        th { "Size" }
                        th { "Modified" }
                        th { "Versions" }
                        @if links.viewer.is_some() {
                            th { "Map" }
                        }
                    }
                }
                tbody {
                    @for group in catalog.groups() {
                        (render_row(group, links))
                    }
                }
            }
        }
    };

    base_document("Saves", content)
}

/// Human-readable byte count (`512 B`, `1.5 KiB`, `12.3 MiB`).
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["KiB", "MiB", "GiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = UNITS[0];
    for next in &UNITS[1..] {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{value:.1} {unit}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::resolve;
    use crate::test_helpers::record;

    fn links(viewer: Option<&str>) -> IndexLinks {
        IndexLinks::new(
            Url::parse("https://saves.example.com").unwrap(),
            viewer.map(|v| Url::parse(v).unwrap()),
        )
    }

    #[test]
    fn save_url_appends_map_segment() {
        let l = links(None);
        assert_eq!(l.save_url("Alpha").as_str(), "https://saves.example.com/map/Alpha");
    }

    #[test]
    fn save_url_keeps_base_path_and_encodes_name() {
        let l = IndexLinks::new(Url::parse("https://example.com/sf/").unwrap(), None);
        assert_eq!(
            l.save_url("My Factory#2").as_str(),
            "https://example.com/sf/map/My%20Factory%232"
        );
    }

    #[test]
    fn viewer_url_carries_save_link() {
        let l = links(Some("https://viewer.example/map"));
        let save = l.save_url("Alpha");
        assert_eq!(
            l.viewer_url(&save).unwrap().as_str(),
            "https://viewer.example/map?url=https%3A%2F%2Fsaves.example.com%2Fmap%2FAlpha"
        );
        assert!(links(None).viewer_url(&save).is_none());
    }

    #[test]
    fn index_lists_saves_in_order() {
        let catalog = resolve(vec![
            record("Beta", "/s/Beta.sav", 1),
            record("Alpha", "/s/Alpha.sav", 2),
        ]);
        let html = render_index(&catalog, &links(None)).into_string();

        assert!(html.starts_with("<!DOCTYPE html>"));
        let alpha = html.find("https://saves.example.com/map/Alpha").unwrap();
        let beta = html.find("https://saves.example.com/map/Beta").unwrap();
        assert!(alpha < beta);
        assert!(!html.contains("Open map"));
    }

    #[test]
    fn index_escapes_names() {
        let catalog = resolve(vec![record("<b>", "/s/<b>.sav", 1)]);
        let html = render_index(&catalog, &links(None)).into_string();
        assert!(html.contains("&lt;b&gt;"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn empty_catalog_renders_empty_page() {
        let html = render_index(&Catalog::default(), &links(None)).into_string();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("No saves found."));
        assert!(!html.contains("<table"));
    }

    #[test]
    fn viewer_column_when_configured() {
        let catalog = resolve(vec![record("Alpha", "/s/Alpha.sav", 1)]);
        let html = render_index(&catalog, &links(Some("https://viewer.example/map"))).into_string();
        assert!(html.contains("Open map"));
        assert!(html.contains("https://viewer.example/map?url="));
    }

    #[test]
    fn sizes() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.5 KiB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MiB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GiB");
    }
}
