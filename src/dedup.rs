// src/dedup.rs

use crate::hasher::Fingerprint;
use crate::model::Snapshot;
use indexmap::map::Entry;
use indexmap::IndexMap;

/// First-seen snapshot for every fingerprint, in insertion order
#[derive(Debug, Clone, Default)]
pub struct RetainedImages {
    images: IndexMap<Fingerprint, Snapshot>,
}

impl RetainedImages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps `snapshot` unless an image with the same fingerprint is already
    /// retained. Returns whether it was kept.
    pub fn offer(&mut self, fingerprint: Fingerprint, snapshot: Snapshot) -> bool {
        match self.images.entry(fingerprint) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(snapshot);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn get(&self, fingerprint: &Fingerprint) -> Option<&Snapshot> {
        self.images.get(fingerprint)
    }

    pub fn ordered_images(&self) -> impl Iterator<Item = &Snapshot> + '_ {
        self.images.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Fingerprint, &Snapshot)> + '_ {
        self.images.iter()
    }

    pub fn into_images(self) -> Vec<Snapshot> {
        self.images.into_values().collect()
    }
}
