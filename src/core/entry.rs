use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::shape::CollisionShape;
use crate::collision::quadtree::Placement;

/// Process-unique, monotonically assigned entry identifier. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct EntryId(pub u32);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque reference to the external object that owns a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct OwnerHandle(pub u64);

/// Overlap handler: `(self_entry, other_entry, resolution, commands)`.
///
/// `resolution` is the displacement applied to `self_entry` for this contact
/// (zero when it did not move).
pub type CollisionCallback =
    Box<dyn FnMut(&CollisionEntry, &CollisionEntry, Vec2, &mut CollisionCommands) + Send>;

/// Wraps a closure as a [`CollisionCallback`].
pub fn callback<F>(f: F) -> CollisionCallback
where
    F: FnMut(&CollisionEntry, &CollisionEntry, Vec2, &mut CollisionCommands) + Send + 'static,
{
    Box::new(f)
}

/// Registry mutations requested from inside a callback.
///
/// They are applied as soon as the callback returns, through the same paths as
/// the public registry API.
#[derive(Debug, Default)]
pub struct CollisionCommands {
    pub(crate) removals: Vec<EntryId>,
}

impl CollisionCommands {
    pub fn unregister(&mut self, id: EntryId) {
        self.removals.push(id);
    }

    pub fn is_empty(&self) -> bool {
        self.removals.is_empty()
    }
}

/// Tracked shape record owned by the registry.
pub struct CollisionEntry {
    pub id: EntryId,
    pub owner: OwnerHandle,
    pub shape: CollisionShape,
    /// Last position reported through `update_position` (or a correction).
    pub position: Vec2,
    pub is_static: bool,
    pub is_trigger: bool,
    /// Set while a removal waits for the running pass to finish.
    pub is_deleted: bool,
    /// Indexed entry that has not been placed in the quadtree yet.
    pub pending_index_insert: bool,
    /// Node and quadrant currently holding this entry's id.
    pub membership: Option<Placement>,
    pub(crate) callback: Option<CollisionCallback>,
}

impl CollisionEntry {
    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }
}

impl fmt::Debug for CollisionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollisionEntry")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("shape", &self.shape)
            .field("position", &self.position)
            .field("is_static", &self.is_static)
            .field("is_trigger", &self.is_trigger)
            .field("is_deleted", &self.is_deleted)
            .field("pending_index_insert", &self.pending_index_insert)
            .field("membership", &self.membership)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

/// Registration description, built fluently.
pub struct EntryDesc {
    pub(crate) owner: OwnerHandle,
    pub(crate) shape: CollisionShape,
    pub(crate) position: Vec2,
    pub(crate) is_static: bool,
    pub(crate) is_trigger: bool,
    pub(crate) callback: Option<CollisionCallback>,
}

impl EntryDesc {
    pub fn new(shape: CollisionShape) -> Self {
        Self {
            owner: OwnerHandle::default(),
            shape,
            position: Vec2::ZERO,
            is_static: false,
            is_trigger: false,
            callback: None,
        }
    }

    pub fn circle(radius: f32) -> Self {
        Self::new(CollisionShape::circle(radius))
    }

    pub fn rect(width: f32, height: f32) -> Self {
        Self::new(CollisionShape::rect(width, height))
    }

    pub fn owner(mut self, owner: OwnerHandle) -> Self {
        self.owner = owner;
        self
    }

    pub fn at(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    pub fn fixed(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    pub fn trigger(mut self, is_trigger: bool) -> Self {
        self.is_trigger = is_trigger;
        self
    }

    pub fn on_overlap<F>(mut self, f: F) -> Self
    where
        F: FnMut(&CollisionEntry, &CollisionEntry, Vec2, &mut CollisionCommands) + Send + 'static,
    {
        self.callback = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for EntryDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryDesc")
            .field("owner", &self.owner)
            .field("shape", &self.shape)
            .field("position", &self.position)
            .field("is_static", &self.is_static)
            .field("is_trigger", &self.is_trigger)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}
