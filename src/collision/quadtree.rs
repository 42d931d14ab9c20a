//! Adaptive quadtree tracking the fixed-radius projectile circles.
//!
//! Nodes live in a generational [`Arena`]; a node owns the handles of up to four
//! children and keeps a non-owning handle back to its parent. Each quadrant of a
//! node stores entry ids in a slot array of `capacity + 1` slots, so a quadrant
//! can overflow by one before it subdivides.
//!
//! Subdivision is lazy: ids already stored in a quadrant stay there when the
//! quadrant gains a child, and only move once they are re-inserted.

use std::fmt;

use glam::Vec2;
use log::{debug, trace, warn};

use crate::config::CollisionConfig;
use crate::core::entry::EntryId;
use crate::debug::{NodeOutline, Segment, SharedDebugDraw};
use crate::utils::allocator::{Arena, GenerationalId};

/// Stable handle of a quadtree node. Stops resolving once the node is merged away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(GenerationalId);

/// One of the four subdivisions of a node, with y growing downwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quadrant {
    NorthWest = 0,
    NorthEast = 1,
    SouthEast = 2,
    SouthWest = 3,
}

impl Quadrant {
    /// Traversal order used everywhere in the tree.
    pub const ALL: [Quadrant; 4] = [
        Quadrant::NorthWest,
        Quadrant::NorthEast,
        Quadrant::SouthEast,
        Quadrant::SouthWest,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Signs of this quadrant's offset from the node centre.
    pub fn signs(self) -> Vec2 {
        match self {
            Quadrant::NorthWest => Vec2::new(-1.0, -1.0),
            Quadrant::NorthEast => Vec2::new(1.0, -1.0),
            Quadrant::SouthEast => Vec2::new(1.0, 1.0),
            Quadrant::SouthWest => Vec2::new(-1.0, 1.0),
        }
    }
}

/// Axis-aligned node region: centre plus full side lengths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub center: Vec2,
    pub size: Vec2,
}

impl Bounds {
    pub fn new(center: Vec2, size: Vec2) -> Self {
        Self { center, size }
    }

    pub fn half_size(&self) -> Vec2 {
        self.size * 0.5
    }

    /// Quadrant of `position` relative to the centre.
    ///
    /// A coordinate equal to the centre binds to the west/north side, so points on
    /// the dividing lines always land in the same quadrant. Positions with a NaN
    /// component fall through to [`Quadrant::SouthWest`].
    pub fn classify(&self, position: Vec2) -> Quadrant {
        let c = self.center;
        if position.x <= c.x && position.y <= c.y {
            Quadrant::NorthWest
        } else if position.x > c.x && position.y <= c.y {
            Quadrant::NorthEast
        } else if position.x > c.x && position.y > c.y {
            Quadrant::SouthEast
        } else {
            Quadrant::SouthWest
        }
    }

    /// Region covered by the child created for `quadrant`.
    pub fn child(&self, quadrant: Quadrant) -> Bounds {
        Bounds::new(
            self.center + quadrant.signs() * self.size * 0.25,
            self.size * 0.5,
        )
    }

    pub fn outline(&self) -> NodeOutline {
        let half = self.half_size();
        NodeOutline {
            horizontal: Segment {
                from: Vec2::new(self.center.x - half.x, self.center.y),
                to: Vec2::new(self.center.x + half.x, self.center.y),
            },
            vertical: Segment {
                from: Vec2::new(self.center.x, self.center.y - half.y),
                to: Vec2::new(self.center.x, self.center.y + half.y),
            },
        }
    }
}

/// Where an indexed entry's id is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Placement {
    pub node: NodeId,
    pub quadrant: Quadrant,
}

/// Access the quadtree needs to the records of indexed entries while merging.
pub trait IndexedEntries {
    /// Current position of an indexed entry, `None` if it is not registered.
    fn indexed_position(&self, id: EntryId) -> Option<Vec2>;

    fn set_membership(&mut self, id: EntryId, placement: Option<Placement>);
}

/// A single quadtree cell.
#[derive(Debug)]
pub struct QuadTreeNode {
    serial: u32,
    bounds: Bounds,
    parent: Option<NodeId>,
    parent_serial: Option<u32>,
    children: [Option<NodeId>; 4],
    slots: [Vec<Option<EntryId>>; 4],
    counts: [usize; 4],
    destroyed: bool,
}

impl QuadTreeNode {
    fn new(
        serial: u32,
        bounds: Bounds,
        parent: Option<(NodeId, u32)>,
        max_entries_per_quadrant: usize,
    ) -> Self {
        Self {
            serial,
            bounds,
            parent: parent.map(|(id, _)| id),
            parent_serial: parent.map(|(_, serial)| serial),
            children: [None; 4],
            slots: std::array::from_fn(|_| vec![None; max_entries_per_quadrant + 1]),
            counts: [0; 4],
            destroyed: false,
        }
    }

    /// Creation-order number, unique over the tree's lifetime. The root is 0.
    pub fn serial(&self) -> u32 {
        self.serial
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn child(&self, quadrant: Quadrant) -> Option<NodeId> {
        self.children[quadrant.index()]
    }

    pub fn has_children(&self) -> bool {
        self.children.iter().any(Option::is_some)
    }

    pub fn count(&self, quadrant: Quadrant) -> usize {
        self.counts[quadrant.index()]
    }

    pub fn total_count(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Ids stored in a quadrant, in slot order.
    pub fn entries(&self, quadrant: Quadrant) -> impl Iterator<Item = EntryId> + '_ {
        self.slots[quadrant.index()].iter().flatten().copied()
    }

    pub fn slot_capacity(&self, quadrant: Quadrant) -> usize {
        self.slots[quadrant.index()].len()
    }

    /// Stores `id` in the first free slot; the slot array only grows when full.
    fn store(&mut self, quadrant: Quadrant, id: EntryId) {
        let slots = &mut self.slots[quadrant.index()];
        match slots.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => *slot = Some(id),
            None => slots.push(Some(id)),
        }
        self.counts[quadrant.index()] += 1;
    }

    fn release(&mut self, quadrant: Quadrant, id: EntryId) -> bool {
        let slot = self.slots[quadrant.index()]
            .iter_mut()
            .find(|slot| **slot == Some(id));
        match slot {
            Some(slot) => {
                *slot = None;
                self.counts[quadrant.index()] -= 1;
                true
            }
            None => false,
        }
    }

    /// Empties every quadrant and returns the ids it held, NW to SW.
    fn drain_entries(&mut self) -> Vec<EntryId> {
        let mut drained = Vec::new();
        for quadrant in Quadrant::ALL {
            for slot in self.slots[quadrant.index()].iter_mut() {
                if let Some(id) = slot.take() {
                    self.counts[quadrant.index()] -= 1;
                    drained.push(id);
                }
            }
        }
        drained
    }
}

/// Adaptive quadtree over the indexed entries.
pub struct QuadTree {
    nodes: Arena<QuadTreeNode>,
    root: NodeId,
    next_serial: u32,
    max_entries_per_quadrant: usize,
    min_node_size: f32,
    label_offset: f32,
    show_overlay: bool,
    debug_draw: SharedDebugDraw,
}

impl fmt::Debug for QuadTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuadTree")
            .field("root", &self.root)
            .field("live_nodes", &self.nodes.len())
            .field("max_entries_per_quadrant", &self.max_entries_per_quadrant)
            .field("min_node_size", &self.min_node_size)
            .field("show_overlay", &self.show_overlay)
            .finish_non_exhaustive()
    }
}

impl QuadTree {
    pub fn new(config: &CollisionConfig, debug_draw: SharedDebugDraw) -> Self {
        let bounds = Bounds::new(config.world_center, config.world_size);
        let mut nodes = Arena::new();
        let root = NodeId(nodes.insert(QuadTreeNode::new(
            0,
            bounds,
            None,
            config.max_entries_per_quadrant,
        )));
        {
            let mut draw = debug_draw.lock();
            draw.node_created(root, &bounds.outline());
            draw.overlay_visibility_changed(config.show_overlay);
        }

        Self {
            nodes,
            root,
            next_serial: 1,
            max_entries_per_quadrant: config.max_entries_per_quadrant,
            min_node_size: config.min_node_size,
            label_offset: config.quadrant_label_offset,
            show_overlay: config.show_overlay,
            debug_draw,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn max_entries_per_quadrant(&self) -> usize {
        self.max_entries_per_quadrant
    }

    pub fn min_node_size(&self) -> f32 {
        self.min_node_size
    }

    pub fn node(&self, id: NodeId) -> Option<&QuadTreeNode> {
        self.nodes.get(id.0)
    }

    pub fn is_live(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|node| !node.destroyed)
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(QuadTreeNode::parent)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &QuadTreeNode)> + '_ {
        self.nodes.iter().map(|(id, node)| (NodeId(id), node))
    }

    pub fn overlay_visible(&self) -> bool {
        self.show_overlay
    }

    /// Ids stored at a placement, in slot order.
    pub fn quadrant_entries(&self, placement: Placement) -> Vec<EntryId> {
        self.node(placement.node)
            .map(|node| node.entries(placement.quadrant).collect())
            .unwrap_or_default()
    }

    /// Scans the whole tree for the slot holding `id`.
    pub fn find_entry(&self, id: EntryId) -> Option<Placement> {
        self.nodes().find_map(|(node_id, node)| {
            Quadrant::ALL
                .into_iter()
                .find(|quadrant| node.entries(*quadrant).any(|stored| stored == id))
                .map(|quadrant| Placement {
                    node: node_id,
                    quadrant,
                })
        })
    }

    /// Quadrants without a child, depth-first in NW, NE, SE, SW order.
    pub fn leaf_quadrants(&self) -> Vec<Placement> {
        let mut leaves = Vec::new();
        self.collect_leaves(self.root, &mut leaves);
        leaves
    }

    fn collect_leaves(&self, node_id: NodeId, leaves: &mut Vec<Placement>) {
        let Some(node) = self.node(node_id) else {
            return;
        };
        for quadrant in Quadrant::ALL {
            match node.child(quadrant) {
                Some(child) => self.collect_leaves(child, leaves),
                None => leaves.push(Placement {
                    node: node_id,
                    quadrant,
                }),
            }
        }
    }

    /// Deepest live node and terminal quadrant for `position`, starting at the root.
    pub fn descend(&self, position: Vec2) -> Placement {
        let mut current = self.root;
        loop {
            let node = self.node_ref(current);
            let quadrant = node.bounds.classify(position);
            match node.child(quadrant).filter(|child| self.is_live(*child)) {
                Some(child) => current = child,
                None => {
                    return Placement {
                        node: current,
                        quadrant,
                    }
                }
            }
        }
    }

    /// Recomputes the placement for `position` and records it as the entry's
    /// membership. Slot arrays are left untouched.
    pub fn reclassify<S>(&self, id: EntryId, position: Vec2, store: &mut S) -> Placement
    where
        S: IndexedEntries + ?Sized,
    {
        let placement = self.descend(position);
        trace!(
            "reclassify {id}: node {}/{:?}",
            self.node_ref(placement.node).serial,
            placement.quadrant
        );
        store.set_membership(id, Some(placement));
        placement
    }

    /// Stores `id` at the placement for `position`, subdividing the quadrant when it
    /// overflows. Returns the placement that received the id.
    pub fn insert(&mut self, id: EntryId, position: Vec2) -> Placement {
        let placement = self.descend(position);
        let (serial, count) = {
            let node = self.node_mut(placement.node);
            node.store(placement.quadrant, id);
            (node.serial, node.count(placement.quadrant))
        };
        trace!("insert {id}: node {serial}/{:?} now holds {count}", placement.quadrant);
        self.publish_count(placement.node, placement.quadrant);

        if count > self.max_entries_per_quadrant {
            self.subdivide(placement.node, placement.quadrant);
        }
        placement
    }

    /// Creates the child for `quadrant`, unless its side would drop below the
    /// minimum node size. Ids already in the quadrant stay where they are.
    pub fn subdivide(&mut self, node_id: NodeId, quadrant: Quadrant) -> Option<NodeId> {
        let node = self.node(node_id).filter(|node| !node.destroyed)?;
        if let Some(existing) = node.child(quadrant) {
            return Some(existing);
        }

        let child_bounds = node.bounds.child(quadrant);
        let serial = node.serial;
        if child_bounds.size.x < self.min_node_size {
            trace!(
                "subdivide node {serial}/{quadrant:?} refused: child side {} below {}",
                child_bounds.size.x,
                self.min_node_size
            );
            return None;
        }

        let child_serial = self.next_serial;
        self.next_serial += 1;
        let child = NodeId(self.nodes.insert(QuadTreeNode::new(
            child_serial,
            child_bounds,
            Some((node_id, serial)),
            self.max_entries_per_quadrant,
        )));
        self.node_mut(node_id).children[quadrant.index()] = Some(child);
        self.debug_draw
            .lock()
            .node_created(child, &child_bounds.outline());

        debug!("subdivide node {serial}/{quadrant:?} -> node {child_serial}");
        Some(child)
    }

    /// Clears `id` from the quadrant at `placement`.
    ///
    /// Unless `suppress_merge` is set, a non-root node left with at most
    /// `max_entries_per_quadrant` entries and no children is merged into its
    /// parent. Merging never cascades further up.
    pub fn remove<S>(&mut self, id: EntryId, placement: Placement, suppress_merge: bool, store: &mut S)
    where
        S: IndexedEntries + ?Sized,
    {
        let Placement { node, quadrant } = placement;
        let Some(host) = self.nodes.get_mut(node.0) else {
            warn!("remove {id}: node {node:?} no longer exists");
            return;
        };
        let removed = host.release(quadrant, id);
        let remaining = host.total_count();
        let has_children = host.has_children();
        let serial = host.serial;

        trace!("remove {id}: node {serial}/{quadrant:?} removed={removed} remaining={remaining}");
        if removed {
            self.publish_count(node, quadrant);
        }

        if node == self.root || suppress_merge {
            return;
        }
        if remaining > self.max_entries_per_quadrant {
            return;
        }
        if has_children {
            trace!("node {serial} keeps its children, not merging");
            return;
        }
        self.merge(node, store);
    }

    fn merge<S>(&mut self, node_id: NodeId, store: &mut S)
    where
        S: IndexedEntries + ?Sized,
    {
        let (serial, parent_serial) = {
            let node = self.node_ref(node_id);
            assert!(
                !node.has_children(),
                "quadtree corrupted: node {} scheduled for merge still has children",
                node.serial
            );
            (node.serial, node.parent_serial)
        };

        let parent = parent_serial
            .and_then(|parent_serial| self.find_node_by_serial(self.root, parent_serial))
            .unwrap_or_else(|| {
                panic!("quadtree corrupted: parent of node {serial} is unreachable from the root")
            });
        let link = self
            .node_mut(parent)
            .children
            .iter_mut()
            .find(|child| **child == Some(node_id));
        match link {
            Some(link) => *link = None,
            None => panic!("quadtree corrupted: node {serial} is not linked from its parent"),
        }

        let residual = {
            let node = self.node_mut(node_id);
            node.destroyed = true;
            node.drain_entries()
        };
        debug!(
            "merge node {serial} into node {}: re-inserting {} entries",
            self.node_ref(parent).serial,
            residual.len()
        );

        for id in residual {
            match store.indexed_position(id) {
                Some(position) => {
                    let placement = self.insert(id, position);
                    store.set_membership(id, Some(placement));
                }
                None => warn!("merge of node {serial}: entry {id} is no longer registered"),
            }
        }

        self.nodes.remove(node_id.0);
        self.debug_draw.lock().node_destroyed(node_id);
    }

    /// Frees every node below the root and empties the root's quadrants. Node
    /// serials keep counting from where they were.
    pub fn clear(&mut self) {
        let stale: Vec<NodeId> = self
            .nodes()
            .map(|(id, _)| id)
            .filter(|id| *id != self.root)
            .collect();
        for id in &stale {
            self.nodes.remove(id.0);
        }

        let capacity = self.max_entries_per_quadrant + 1;
        let root = self.node_mut(self.root);
        root.children = [None; 4];
        root.slots = std::array::from_fn(|_| vec![None; capacity]);
        root.counts = [0; 4];

        {
            let mut draw = self.debug_draw.lock();
            for id in &stale {
                draw.node_destroyed(*id);
            }
        }
        for quadrant in Quadrant::ALL {
            self.publish_count(self.root, quadrant);
        }
        debug!("quadtree cleared: {} nodes freed", stale.len());
    }

    /// Depth-first search from `from` for the live node with the given serial.
    pub fn find_node_by_serial(&self, from: NodeId, serial: u32) -> Option<NodeId> {
        let node = self.node(from).filter(|node| !node.destroyed)?;
        if node.serial == serial {
            return Some(from);
        }
        node.children
            .iter()
            .flatten()
            .find_map(|child| self.find_node_by_serial(*child, serial))
    }

    /// Flips the overlay visibility and returns the new state.
    pub fn toggle_visualization(&mut self) -> bool {
        self.show_overlay = !self.show_overlay;
        self.debug_draw
            .lock()
            .overlay_visibility_changed(self.show_overlay);
        debug!("quadtree overlay visible: {}", self.show_overlay);
        self.show_overlay
    }

    fn publish_count(&self, node_id: NodeId, quadrant: Quadrant) {
        if let Some(node) = self.node(node_id) {
            let anchor = node.bounds.center + quadrant.signs() * self.label_offset;
            self.debug_draw.lock().quadrant_count_changed(
                node_id,
                quadrant,
                anchor,
                node.count(quadrant),
            );
        }
    }

    fn node_ref(&self, id: NodeId) -> &QuadTreeNode {
        self.nodes
            .get(id.0)
            .unwrap_or_else(|| panic!("quadtree corrupted: node {id:?} is not allocated"))
    }

    fn node_mut(&mut self, id: NodeId) -> &mut QuadTreeNode {
        self.nodes
            .get_mut(id.0)
            .unwrap_or_else(|| panic!("quadtree corrupted: node {id:?} is not allocated"))
    }
}
