//! Quad Collision – adaptive quadtree broad-phase for 2D simulations.
//!
//! Shapes are registered with a [`CollisionRegistry`], which keeps fixed-radius
//! projectile circles in a [`QuadTree`] and checks every other shape
//! exhaustively. Each [`CollisionRegistry::tick`] resolves circle-circle and
//! circle-box overlaps, pushes corrections back to the owning objects and
//! invokes the registered overlap callbacks.

pub mod collision;
pub mod config;
pub mod core;
pub mod debug;
pub mod error;
pub mod input;
pub mod utils;
pub mod world;

pub use glam::Vec2;

pub use collision::{
    broadphase::BroadPhase,
    narrowphase::{Contact, ContactBody, NarrowPhase},
    quadtree::{Bounds, NodeId, Placement, QuadTree, QuadTreeNode, Quadrant},
};
pub use config::{CollisionConfig, KeyBindings};
pub use crate::core::{
    callback, CollisionCallback, CollisionCommands, CollisionEntry, CollisionShape, EntryDesc,
    EntryId, OwnerHandle,
};
pub use debug::{DebugDraw, NodeOutline, NoopDebugDraw, RecordingDebugDraw, Segment, SharedDebugDraw};
pub use error::{CollisionError, Result};
pub use input::{QueuedToggles, SharedToggleInput, ToggleAction, ToggleInput};
pub use utils::profiling::PassStats;
pub use world::{
    CollisionRegistry, EntityPositions, NoopEntityPositions, RecordedPositions,
    SharedEntityPositions,
};
