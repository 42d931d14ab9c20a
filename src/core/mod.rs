//! Core types describing tracked shapes and their registry records.

pub mod entry;
pub mod shape;

pub use entry::{
    callback, CollisionCallback, CollisionCommands, CollisionEntry, EntryDesc, EntryId,
    OwnerHandle,
};
pub use shape::CollisionShape;
