use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec2;
use parking_lot::Mutex;

use crate::core::entry::OwnerHandle;

/// Receives position corrections for the objects that own registered shapes.
///
/// The registry updates its own copy of the position right after calling
/// [`EntityPositions::set_position`], so implementors must not feed the value
/// back through `update_position`.
pub trait EntityPositions: Send {
    fn set_position(&mut self, _owner: OwnerHandle, _position: Vec2) {}
}

pub type SharedEntityPositions = Arc<Mutex<dyn EntityPositions>>;

#[derive(Debug, Default)]
pub struct NoopEntityPositions;

impl NoopEntityPositions {
    pub fn shared() -> SharedEntityPositions {
        Arc::new(Mutex::new(Self))
    }
}

impl EntityPositions for NoopEntityPositions {}

/// Keeps the last corrected position of every owner.
#[derive(Debug, Default)]
pub struct RecordedPositions {
    pub positions: HashMap<OwnerHandle, Vec2>,
    pub corrections: usize,
}

impl RecordedPositions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, owner: OwnerHandle) -> Option<Vec2> {
        self.positions.get(&owner).copied()
    }
}

impl EntityPositions for RecordedPositions {
    fn set_position(&mut self, owner: OwnerHandle, position: Vec2) {
        self.positions.insert(owner, position);
        self.corrections += 1;
    }
}
