//! Collision detection: the quadtree index, pair enumeration and overlap resolution.

pub mod broadphase;
pub mod narrowphase;
pub mod quadtree;

pub use broadphase::BroadPhase;
pub use narrowphase::{Contact, ContactBody, NarrowPhase};
pub use quadtree::{Bounds, IndexedEntries, NodeId, Placement, QuadTree, QuadTreeNode, Quadrant};
