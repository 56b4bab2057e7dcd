//! Groups overdue builds by packager so each packager gets one message.

use std::collections::btree_map::{self, BTreeMap};

use crate::contract::BuildRecord;

/// Packager → (build id → record).
///
/// Both levels are ordered, so iteration and the resulting email bodies are
/// stable for a given input. A packager only has an entry once a build was
/// inserted for them; there are no empty buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackagerBuckets {
    buckets: BTreeMap<String, BTreeMap<String, BuildRecord>>,
}

impl PackagerBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files `record` under its packager, creating the bucket if needed.
    /// A record with an id already present for that packager replaces it.
    pub fn insert(&mut self, record: BuildRecord) {
        self.buckets
            .entry(record.packager.clone())
            .or_default()
            .insert(record.id.clone(), record);
    }

    pub fn get(&self, packager: &str) -> Option<&BTreeMap<String, BuildRecord>> {
        self.buckets.get(packager)
    }

    pub fn packagers(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, BTreeMap<String, BuildRecord>> {
        self.buckets.iter()
    }

    /// Number of packagers with at least one build.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Total builds across all packagers.
    pub fn build_count(&self) -> usize {
        self.buckets.values().map(BTreeMap::len).sum()
    }
}

impl FromIterator<BuildRecord> for PackagerBuckets {
    fn from_iter<I: IntoIterator<Item = BuildRecord>>(iter: I) -> Self {
        let mut buckets = PackagerBuckets::new();
        for record in iter {
            buckets.insert(record);
        }
        buckets
    }
}

impl<'a> IntoIterator for &'a PackagerBuckets {
    type Item = (&'a String, &'a BTreeMap<String, BuildRecord>);
    type IntoIter = btree_map::Iter<'a, String, BTreeMap<String, BuildRecord>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Partitions `records` by their `packager` field.
pub fn group_by_packager<I>(records: I) -> PackagerBuckets
where
    I: IntoIterator<Item = BuildRecord>,
{
    records.into_iter().collect()
}
