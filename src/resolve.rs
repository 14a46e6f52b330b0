//! Latest-save resolution.
//!
//! Groups scanned records by base name and picks one record per group: the
//! one with the greatest `version_key`. Two records with the same key (same
//! second, or two copies carrying the same embedded timestamp) are separated
//! by path, greatest path wins. The result depends only on the set of
//! records, never on their order.

use crate::types::SaveRecord;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// The current version of one logical save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveGroup {
    pub base_name: String,
    pub latest: SaveRecord,
    /// Number of files sharing this base name in the scan.
    pub candidate_count: usize,
}

/// Base name → current save, as of one scan. Iterates in base-name order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Catalog {
    groups: BTreeMap<String, SaveGroup>,
}

impl Catalog {
    pub fn get(&self, base_name: &str) -> Option<&SaveGroup> {
        self.groups.get(base_name)
    }

    pub fn groups(&self) -> impl Iterator<Item = &SaveGroup> {
        self.groups.values()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Ranking within a group: version key, then path.
fn rank(a: &SaveRecord, b: &SaveRecord) -> Ordering {
    a.version_key
        .cmp(&b.version_key)
        .then_with(|| a.path.cmp(&b.path))
}

/// Build a catalog from one scan's records.
pub fn resolve<I>(records: I) -> Catalog
where
    I: IntoIterator<Item = SaveRecord>,
{
    let mut groups: BTreeMap<String, SaveGroup> = BTreeMap::new();

    for record in records {
        match groups.entry(record.base_name.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(SaveGroup {
                    base_name: record.base_name.clone(),
                    latest: record,
                    candidate_count: 1,
                });
            }
            Entry::Occupied(mut slot) => {
                let group = slot.get_mut();
                group.candidate_count += 1;
                if rank(&record, &group.latest) == Ordering::Greater {
                    group.latest = record;
                }
            }
        }
    }

    Catalog { groups }
}
