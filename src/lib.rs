//! # satisfactory-serve-map
//!
//! Serves the newest Satisfactory save for each save name over HTTP, so the
//! browser-based interactive map can load a dedicated server's world straight
//! from a URL:
//!
//! ```text
//! https://satisfactory-calculator.com/en/interactive-map?url=https://saves.example.com/map/Factory
//! ```
//!
//! # Pipeline
//!
//! Every request runs (or reuses) the same three steps:
//!
//! ```text
//! 1. Scan      save_dir/  →  Vec<SaveRecord>   (filesystem → structured records)
//! 2. Resolve   records    →  Catalog           (base name → latest save)
//! 3. Serve     catalog    →  file bytes | HTML index
//! ```
//!
//! Steps 1 and 2 are pure functions of the directory contents, so a catalog can
//! be cached as an immutable snapshot and swapped out whole.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`naming`] | Save filename convention: base name + autosave slot or timestamp |
//! | [`scan`] | Lists the save directory and builds records, skipping half-written files |
//! | [`resolve`] | Groups records and picks the latest per save |
//! | [`cache`] | Snapshot-and-swap catalog cache with a staleness window |
//! | [`render`] | Maud HTML index page and absolute link building |
//! | [`server`] | axum routes, CORS, timeouts, JSON errors |
//! | [`config`] | Layered TOML config: defaults, file, CLI flags |
//! | [`types`] | Shared record and policy types |
//! | [`output`] | CLI output for the `list` command |
//!
//! # Design Decisions
//!
//! ## Rank by Time, Not by Slot Number
//!
//! Autosaves rotate through numbered slots, so `_autosave_2` is not newer than
//! `_autosave_0`. A save is ranked by the timestamp in its name when it has
//! one, otherwise by its modification time. Equal ranks go to the greatest
//! path, so the answer never depends on directory listing order.
//!
//! ## Rescan by Default
//!
//! A save directory holds a handful of files; listing it is cheaper than
//! reasoning about stale state. The cache is off unless `cache.ttl_ms` is set.

pub mod cache;
pub mod config;
pub mod naming;
pub mod output;
pub mod render;
pub mod resolve;
pub mod scan;
pub mod server;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
