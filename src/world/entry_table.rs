use std::collections::BTreeMap;

use glam::Vec2;

use crate::collision::quadtree::{IndexedEntries, Placement};
use crate::core::entry::{CollisionEntry, EntryId};

/// Which collection an entry lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    /// Fixed-radius circles tracked by the quadtree.
    Indexed,
    /// Every other shape, always checked exhaustively.
    NonIndexed,
}

/// Registered entries split by partition.
///
/// Ids are handed out in increasing order, so iterating a map visits entries in
/// registration order.
#[derive(Debug, Default)]
pub struct EntryTable {
    indexed: BTreeMap<EntryId, CollisionEntry>,
    non_indexed: BTreeMap<EntryId, CollisionEntry>,
}

impl EntryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: CollisionEntry, partition: Partition) {
        self.partition_mut(partition).insert(entry.id, entry);
    }

    pub fn remove(&mut self, id: EntryId) -> Option<(CollisionEntry, Partition)> {
        if let Some(entry) = self.indexed.remove(&id) {
            return Some((entry, Partition::Indexed));
        }
        self.non_indexed
            .remove(&id)
            .map(|entry| (entry, Partition::NonIndexed))
    }

    pub fn get(&self, id: EntryId) -> Option<&CollisionEntry> {
        self.indexed.get(&id).or_else(|| self.non_indexed.get(&id))
    }

    pub fn get_mut(&mut self, id: EntryId) -> Option<&mut CollisionEntry> {
        match self.indexed.get_mut(&id) {
            Some(entry) => Some(entry),
            None => self.non_indexed.get_mut(&id),
        }
    }

    pub fn partition_of(&self, id: EntryId) -> Option<Partition> {
        if self.indexed.contains_key(&id) {
            Some(Partition::Indexed)
        } else if self.non_indexed.contains_key(&id) {
            Some(Partition::NonIndexed)
        } else {
            None
        }
    }

    pub fn indexed_entries_mut(&mut self) -> impl Iterator<Item = &mut CollisionEntry> + '_ {
        self.indexed.values_mut()
    }

    /// Indexed ids in registration order.
    pub fn indexed_ids(&self) -> Vec<EntryId> {
        self.indexed.keys().copied().collect()
    }

    /// Non-indexed ids in registration order.
    pub fn non_indexed_ids(&self) -> Vec<EntryId> {
        self.non_indexed.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.indexed.len() + self.non_indexed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn indexed_len(&self) -> usize {
        self.indexed.len()
    }

    fn partition_mut(&mut self, partition: Partition) -> &mut BTreeMap<EntryId, CollisionEntry> {
        match partition {
            Partition::Indexed => &mut self.indexed,
            Partition::NonIndexed => &mut self.non_indexed,
        }
    }
}

impl IndexedEntries for EntryTable {
    fn indexed_position(&self, id: EntryId) -> Option<Vec2> {
        self.indexed.get(&id).map(|entry| entry.position)
    }

    fn set_membership(&mut self, id: EntryId, placement: Option<Placement>) {
        if let Some(entry) = self.indexed.get_mut(&id) {
            entry.membership = placement;
        }
    }
}
