//! Debug overlay hooks for an external line/label renderer.

use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec2;
use parking_lot::Mutex;

use crate::collision::quadtree::{NodeId, Quadrant};

/// Line segment in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub from: Vec2,
    pub to: Vec2,
}

/// The two dividing lines drawn through a quadtree node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeOutline {
    pub horizontal: Segment,
    pub vertical: Segment,
}

/// Capability implemented by renderers that visualise the collision state.
///
/// Every hook defaults to doing nothing.
pub trait DebugDraw: Send {
    /// A node was created; `outline` stays valid until [`DebugDraw::node_destroyed`].
    fn node_created(&mut self, _node: NodeId, _outline: &NodeOutline) {}

    fn node_destroyed(&mut self, _node: NodeId) {}

    /// Occupancy label update. A `count` of zero clears the label.
    fn quadrant_count_changed(
        &mut self,
        _node: NodeId,
        _quadrant: Quadrant,
        _label_anchor: Vec2,
        _count: usize,
    ) {
    }

    fn overlay_visibility_changed(&mut self, _visible: bool) {}

    fn indexing_changed(&mut self, _enabled: bool) {}

    fn projectile_count_changed(&mut self, _count: usize) {}
}

/// Shared handle through which the quadtree and registry reach the renderer.
pub type SharedDebugDraw = Arc<Mutex<dyn DebugDraw>>;

/// Default sink that discards everything.
#[derive(Debug, Default)]
pub struct NoopDebugDraw;

impl NoopDebugDraw {
    pub fn new() -> Self {
        Self
    }

    pub fn shared() -> SharedDebugDraw {
        Arc::new(Mutex::new(Self))
    }
}

impl DebugDraw for NoopDebugDraw {}

/// Sink that keeps the latest overlay state in memory.
#[derive(Debug, Default)]
pub struct RecordingDebugDraw {
    pub outlines: HashMap<NodeId, NodeOutline>,
    pub labels: HashMap<(NodeId, Quadrant), (Vec2, usize)>,
    pub overlay_visible: bool,
    pub indexing_enabled: Option<bool>,
    pub projectile_count: usize,
    pub nodes_created: usize,
    pub nodes_destroyed: usize,
}

impl RecordingDebugDraw {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label value for a quadrant, zero when cleared or never set.
    pub fn label(&self, node: NodeId, quadrant: Quadrant) -> usize {
        self.labels
            .get(&(node, quadrant))
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }
}

impl DebugDraw for RecordingDebugDraw {
    fn node_created(&mut self, node: NodeId, outline: &NodeOutline) {
        self.outlines.insert(node, *outline);
        self.nodes_created += 1;
    }

    fn node_destroyed(&mut self, node: NodeId) {
        self.outlines.remove(&node);
        self.labels.retain(|(owner, _), _| *owner != node);
        self.nodes_destroyed += 1;
    }

    fn quadrant_count_changed(
        &mut self,
        node: NodeId,
        quadrant: Quadrant,
        label_anchor: Vec2,
        count: usize,
    ) {
        if count == 0 {
            self.labels.remove(&(node, quadrant));
        } else {
            self.labels.insert((node, quadrant), (label_anchor, count));
        }
    }

    fn overlay_visibility_changed(&mut self, visible: bool) {
        self.overlay_visible = visible;
    }

    fn indexing_changed(&mut self, enabled: bool) {
        self.indexing_enabled = Some(enabled);
    }

    fn projectile_count_changed(&mut self, count: usize) {
        self.projectile_count = count;
    }
}
