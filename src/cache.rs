//! Catalog cache with a bounded staleness window.
//!
//! Scanning the save directory costs one `read_dir` plus a `stat` and an
//! `open` per save. That is cheap for a handful of saves but adds up when the
//! map tool polls hard, so the catalog can be kept for a short while.
//!
//! # Design
//!
//! The cache holds at most one [`CatalogSnapshot`]: a resolved catalog plus
//! the instant it was built. Snapshots are immutable and shared as
//! `Arc<CatalogSnapshot>` through an [`ArcSwapOption`]:
//!
//! - a reader loads the current `Arc` and keeps using it for the whole request,
//!   even if a newer snapshot is swapped in meanwhile;
//! - a refresh scans and resolves into a brand-new snapshot, then stores it in
//!   one atomic swap. Readers never see a catalog being built.
//!
//! Two requests that both find the snapshot expired may both rescan; the last
//! store wins. Both results are valid catalogs of the directory, so no lock is
//! taken.
//!
//! ## Staleness window
//!
//! A snapshot is served while it is younger than `ttl`. With `ttl = 0` (the
//! default) every request rescans, so a save written just before a request is
//! always visible. With a positive `ttl`, a new save shows up at most `ttl`
//! after it was written.
//!
//! ## Blocking work
//!
//! Scanning is synchronous filesystem I/O. It runs on tokio's blocking pool so
//! it never stalls the async workers serving other requests.

use crate::resolve::{Catalog, resolve};
use crate::scan::{ScanError, Scanner};
use arc_swap::ArcSwapOption;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// An immutable catalog plus its build instant.
#[derive(Debug)]
pub struct CatalogSnapshot {
    catalog: Catalog,
    created_at: Instant,
}

impl CatalogSnapshot {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            created_at: Instant::now(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Whether this snapshot may still be served under `ttl`.
    pub fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) < ttl
    }
}

/// Source of catalogs for the HTTP layer.
pub struct CatalogCache {
    scanner: Scanner,
    ttl: Duration,
    current: ArcSwapOption<CatalogSnapshot>,
}

impl CatalogCache {
    pub fn new(scanner: Scanner, ttl: Duration) -> Self {
        Self {
            scanner,
            ttl,
            current: ArcSwapOption::empty(),
        }
    }

    /// A snapshot no older than the staleness window, rescanning if needed.
    pub async fn snapshot(&self) -> Result<Arc<CatalogSnapshot>, ScanError> {
        if let Some(snapshot) = self.cached(Instant::now()) {
            return Ok(snapshot);
        }

        let scanner = self.scanner.clone();
        let catalog = tokio::task::spawn_blocking(move || scanner.scan().map(resolve))
            .await
            .map_err(|err| ScanError::Task(err.to_string()))??;

        let snapshot = Arc::new(CatalogSnapshot::new(catalog));
        debug!(saves = snapshot.catalog().len(), "catalog refreshed");
        if !self.ttl.is_zero() {
            self.current.store(Some(Arc::clone(&snapshot)));
        }
        Ok(snapshot)
    }

    fn cached(&self, now: Instant) -> Option<Arc<CatalogSnapshot>> {
        if self.ttl.is_zero() {
            return None;
        }
        self.current
            .load_full()
            .filter(|snapshot| snapshot.is_fresh(self.ttl, now))
    }

    /// Drop the current snapshot so the next request rescans.
    pub fn invalidate(&self) {
        self.current.store(None);
    }
}
