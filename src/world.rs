//! The collision registry: entry bookkeeping, the per-tick pass and runtime toggles.

mod entity_sync;
mod entry_table;

pub use entity_sync::{EntityPositions, NoopEntityPositions, RecordedPositions, SharedEntityPositions};
pub use entry_table::{EntryTable, Partition};

use std::time::Instant;

use glam::Vec2;
use log::{debug, info, trace};

use crate::{
    collision::{
        broadphase::BroadPhase,
        narrowphase::{ContactBody, NarrowPhase},
        quadtree::{IndexedEntries, NodeId, QuadTree, Quadrant},
    },
    config::CollisionConfig,
    core::{
        entry::{CollisionCallback, CollisionCommands, CollisionEntry, EntryDesc, EntryId, OwnerHandle},
        shape::CollisionShape,
    },
    debug::{NoopDebugDraw, SharedDebugDraw},
    error::{CollisionError, Result},
    input::{SharedToggleInput, ToggleAction},
    utils::{
        logging::{warn_if_tick_budget_exceeded, ScopedTimer},
        profiling::PassStats,
    },
};

/// Owns every registered shape and resolves overlaps once per tick.
///
/// Circles whose radius equals the configured projectile radius are kept in a
/// [`QuadTree`] and only tested against entries sharing a leaf quadrant. All
/// other shapes are tested against everything.
pub struct CollisionRegistry {
    config: CollisionConfig,
    entries: EntryTable,
    index: QuadTree,
    next_id: u32,
    indexing_enabled: bool,
    iterating: bool,
    deferred: Vec<EntryId>,
    projectile_count: usize,
    debug_draw: SharedDebugDraw,
    toggles: Option<SharedToggleInput>,
    positions: SharedEntityPositions,
    stats: PassStats,
}

impl CollisionRegistry {
    /// Validates `config` and builds an empty registry with a single root node.
    pub fn new(
        config: CollisionConfig,
        debug_draw: SharedDebugDraw,
        toggles: Option<SharedToggleInput>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, debug_draw, toggles))
    }

    /// Registry with the default configuration and no external capabilities.
    pub fn with_defaults() -> Self {
        Self::build(CollisionConfig::default(), NoopDebugDraw::shared(), None)
    }

    fn build(
        config: CollisionConfig,
        debug_draw: SharedDebugDraw,
        toggles: Option<SharedToggleInput>,
    ) -> Self {
        let index = QuadTree::new(&config, debug_draw.clone());
        {
            let mut draw = debug_draw.lock();
            draw.indexing_changed(config.indexing_enabled);
            draw.projectile_count_changed(0);
        }
        info!(
            "collision registry ready: world {} at {}, {} entries per quadrant, indexing {}",
            config.world_size,
            config.world_center,
            config.max_entries_per_quadrant,
            config.indexing_enabled
        );

        Self {
            indexing_enabled: config.indexing_enabled,
            config,
            entries: EntryTable::new(),
            index,
            next_id: 0,
            iterating: false,
            deferred: Vec::new(),
            projectile_count: 0,
            debug_draw,
            toggles,
            positions: NoopEntityPositions::shared(),
            stats: PassStats::default(),
        }
    }

    pub fn set_entity_positions(&mut self, positions: SharedEntityPositions) {
        self.positions = positions;
    }

    pub fn set_toggle_input(&mut self, toggles: Option<SharedToggleInput>) {
        self.toggles = toggles;
    }

    pub fn config(&self) -> &CollisionConfig {
        &self.config
    }

    /// Registers a shape and returns its id.
    pub fn register(
        &mut self,
        owner: OwnerHandle,
        shape: CollisionShape,
        position: Vec2,
        is_static: bool,
        is_trigger: bool,
        callback: Option<CollisionCallback>,
    ) -> EntryId {
        let mut desc = EntryDesc::new(shape)
            .owner(owner)
            .at(position)
            .fixed(is_static)
            .trigger(is_trigger);
        desc.callback = callback;
        self.register_desc(desc)
    }

    /// Registers a shape described by an [`EntryDesc`].
    ///
    /// A projectile registered while indexing is on is only placed in the
    /// quadtree on its first position update.
    pub fn register_desc(&mut self, desc: EntryDesc) -> EntryId {
        self.next_id += 1;
        let id = EntryId(self.next_id);
        let indexed = desc.shape.is_projectile(self.config.projectile_radius);
        let partition = if indexed {
            Partition::Indexed
        } else {
            Partition::NonIndexed
        };

        let entry = CollisionEntry {
            id,
            owner: desc.owner,
            shape: desc.shape,
            position: desc.position,
            is_static: desc.is_static,
            is_trigger: desc.is_trigger,
            is_deleted: false,
            pending_index_insert: indexed && self.indexing_enabled,
            membership: None,
            callback: desc.callback,
        };
        self.entries.insert(entry, partition);
        if indexed {
            self.set_projectile_count(self.projectile_count + 1);
        }

        debug!("register {id} ({partition:?}) at {}", desc.position);
        id
    }

    /// Removes an entry. Returns `false` for unknown ids.
    ///
    /// During a collision pass the entry is only flagged and disappears once the
    /// pass has finished.
    pub fn unregister(&mut self, id: EntryId) -> bool {
        if self.iterating {
            let Some(entry) = self.entries.get_mut(id) else {
                return false;
            };
            if !entry.is_deleted {
                entry.is_deleted = true;
                self.deferred.push(id);
                trace!("unregister {id} deferred until the pass ends");
            }
            return true;
        }

        let membership = match self.entries.get(id) {
            Some(entry) => entry.membership,
            None => {
                trace!("unregister {id}: unknown entry");
                return false;
            }
        };
        if self.indexing_enabled {
            if let Some(placement) = membership {
                self.index.remove(id, placement, false, &mut self.entries);
            }
        }
        if let Some((_, Partition::Indexed)) = self.entries.remove(id) {
            self.set_projectile_count(self.projectile_count.saturating_sub(1));
        }
        debug!("unregister {id}");
        true
    }

    /// Records a new position and keeps the quadtree placement in sync.
    /// Returns `false` for unknown ids.
    pub fn update_position(&mut self, id: EntryId, position: Vec2) -> bool {
        let Some(partition) = self.entries.partition_of(id) else {
            trace!("update_position {id}: unknown entry");
            return false;
        };
        let Some(entry) = self.entries.get_mut(id) else {
            return false;
        };
        entry.position = position;
        if partition == Partition::NonIndexed || !self.indexing_enabled {
            return true;
        }

        if entry.pending_index_insert {
            entry.pending_index_insert = false;
            let placement = self.index.insert(id, position);
            self.entries.set_membership(id, Some(placement));
            return true;
        }

        let Some(previous) = entry.membership else {
            return true;
        };
        let current = self.index.reclassify(id, position, &mut self.entries);
        if current == previous {
            return true;
        }

        let suppress_merge = current.node == previous.node
            || self.index.parent_of(current.node) == Some(previous.node);
        trace!(
            "{id} moves {:?}/{:?} -> {:?}/{:?} (merge suppressed: {suppress_merge})",
            previous.node,
            previous.quadrant,
            current.node,
            current.quadrant
        );
        self.index
            .remove(id, previous, suppress_merge, &mut self.entries);
        let placement = self.index.insert(id, position);
        self.entries.set_membership(id, Some(placement));
        true
    }

    /// Like [`CollisionRegistry::update_position`], but unknown ids are an error.
    pub fn try_update_position(&mut self, id: EntryId, position: Vec2) -> Result<()> {
        if self.update_position(id, position) {
            Ok(())
        } else {
            Err(CollisionError::UnknownEntry(id))
        }
    }

    /// Runs one collision pass.
    ///
    /// Pending toggles are applied first. Removals requested while the pass runs
    /// take effect once it ends.
    pub fn tick(&mut self, delta_seconds: f32) -> PassStats {
        let started = Instant::now();
        self.drain_toggles();

        self.stats.reset();
        self.stats.delta_seconds = delta_seconds;
        self.stats.indexed_pass = self.indexing_enabled;

        self.iterating = true;
        {
            let _timer = ScopedTimer::new("collision::pass");
            if self.indexing_enabled {
                let root = self.index.root();
                self.check_node(root);
                self.check_brute_force(false);
            } else {
                self.check_brute_force(true);
            }
        }
        self.iterating = false;

        let deferred = std::mem::take(&mut self.deferred);
        self.stats.deferred_removals = deferred.len();
        for id in deferred {
            self.unregister(id);
        }

        self.stats.live_nodes = self.index.node_count();
        self.stats.elapsed = started.elapsed();
        warn_if_tick_budget_exceeded(self.stats.elapsed, self.config.tick_budget_ms);
        self.stats
    }

    pub fn apply_toggle(&mut self, action: ToggleAction) {
        match action {
            ToggleAction::Indexing => {
                self.toggle_indexing();
            }
            ToggleAction::Visualization => {
                self.index.toggle_visualization();
            }
        }
    }

    /// Switches between quadtree and brute-force enumeration and returns the new
    /// state.
    ///
    /// Switching off empties the quadtree. Switching on leaves every projectile
    /// waiting for its next position update before it is indexed again.
    pub fn toggle_indexing(&mut self) -> bool {
        if self.indexing_enabled {
            for id in self.entries.indexed_ids() {
                let membership = self.entries.get(id).and_then(|entry| entry.membership);
                if let Some(placement) = membership {
                    self.index.remove(id, placement, false, &mut self.entries);
                }
            }
            // Parents emptied while they still had a child are left behind above.
            self.index.clear();
            for entry in self.entries.indexed_entries_mut() {
                entry.membership = None;
                entry.pending_index_insert = false;
            }
        } else {
            for entry in self.entries.indexed_entries_mut() {
                entry.pending_index_insert = true;
                entry.membership = None;
            }
        }

        self.indexing_enabled = !self.indexing_enabled;
        self.debug_draw.lock().indexing_changed(self.indexing_enabled);
        info!("quadtree indexing enabled: {}", self.indexing_enabled);
        self.indexing_enabled
    }

    pub fn entry(&self, id: EntryId) -> Option<&CollisionEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: EntryId) -> bool {
        self.entries.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn indexed_len(&self) -> usize {
        self.entries.indexed_len()
    }

    pub fn projectile_count(&self) -> usize {
        self.projectile_count
    }

    pub fn is_indexing_enabled(&self) -> bool {
        self.indexing_enabled
    }

    pub fn overlay_visible(&self) -> bool {
        self.index.overlay_visible()
    }

    pub fn index(&self) -> &QuadTree {
        &self.index
    }

    /// Statistics of the most recent [`CollisionRegistry::tick`].
    pub fn last_pass(&self) -> &PassStats {
        &self.stats
    }

    fn drain_toggles(&mut self) {
        let Some(source) = self.toggles.clone() else {
            return;
        };
        let actions: Vec<ToggleAction> = {
            let mut input = source.lock();
            std::iter::from_fn(|| input.poll()).collect()
        };
        for action in actions {
            self.apply_toggle(action);
        }
    }

    fn set_projectile_count(&mut self, count: usize) {
        self.projectile_count = count;
        self.debug_draw.lock().projectile_count_changed(count);
    }

    /// Depth-first over the tree, checking leaf quadrants in NW, NE, SE, SW
    /// order. Stops early if a correction merges this node away.
    fn check_node(&mut self, node_id: NodeId) {
        for quadrant in Quadrant::ALL {
            let Some(node) = self.index.node(node_id).filter(|node| !node.is_destroyed()) else {
                trace!("node {node_id:?} merged away during the pass");
                return;
            };
            match node.child(quadrant) {
                Some(child) => self.check_node(child),
                None => {
                    let ids: Vec<EntryId> = node.entries(quadrant).collect();
                    for (lhs, rhs) in BroadPhase::quadrant_pairs(&ids) {
                        self.resolve_pair(lhs, rhs);
                    }
                }
            }
        }
    }

    fn check_brute_force(&mut self, include_indexed_pairs: bool) {
        let non_indexed = self.entries.non_indexed_ids();
        let indexed = self.entries.indexed_ids();
        for (lhs, rhs) in BroadPhase::brute_force_pairs(&non_indexed, &indexed, include_indexed_pairs) {
            self.resolve_pair(lhs, rhs);
        }
    }

    fn resolve_pair(&mut self, lhs: EntryId, rhs: EntryId) {
        let (Some(a), Some(b)) = (self.entries.get(lhs), self.entries.get(rhs)) else {
            return;
        };
        if a.is_deleted || b.is_deleted {
            return;
        }

        // Mixed pairs are always handled circle first.
        let (first, second, body_first, body_second) = if !a.shape.is_circle() && b.shape.is_circle() {
            (rhs, lhs, ContactBody::from(b), ContactBody::from(a))
        } else {
            (lhs, rhs, ContactBody::from(a), ContactBody::from(b))
        };

        self.stats.candidate_pairs += 1;
        let Some(contact) = NarrowPhase::collide(&body_first, &body_second) else {
            return;
        };
        self.stats.overlaps += 1;
        trace!(
            "{first} overlaps {second}: penetration {:.3}",
            contact.penetration
        );

        self.apply_correction(first, contact.displacement_a);
        self.apply_correction(second, contact.displacement_b);
        self.dispatch_callback(first, second, contact.displacement_a);
        self.dispatch_callback(second, first, contact.displacement_b);
    }

    fn apply_correction(&mut self, id: EntryId, displacement: Vec2) {
        if displacement == Vec2::ZERO {
            return;
        }
        let Some(entry) = self.entries.get(id) else {
            return;
        };
        let (owner, target) = (entry.owner, entry.position + displacement);
        self.positions.lock().set_position(owner, target);
        self.update_position(id, target);
    }

    fn dispatch_callback(&mut self, self_id: EntryId, other_id: EntryId, resolution: Vec2) {
        let Some(mut callback) = self
            .entries
            .get_mut(self_id)
            .and_then(|entry| entry.callback.take())
        else {
            return;
        };

        let mut commands = CollisionCommands::default();
        if let (Some(me), Some(other)) = (self.entries.get(self_id), self.entries.get(other_id)) {
            callback(me, other, resolution, &mut commands);
        }
        if let Some(entry) = self.entries.get_mut(self_id) {
            entry.callback = Some(callback);
        }

        for id in commands.removals {
            self.unregister(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entry::callback;
    use crate::debug::RecordingDebugDraw;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn projectile(registry: &mut CollisionRegistry, x: f32, y: f32) -> EntryId {
        let id = registry.register_desc(EntryDesc::circle(10.0).at(Vec2::new(x, y)));
        registry.update_position(id, Vec2::new(x, y));
        id
    }

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let mut registry = CollisionRegistry::with_defaults();
        let a = registry.register_desc(EntryDesc::rect(10.0, 10.0));
        let b = registry.register_desc(EntryDesc::circle(4.0));
        assert_eq!(a, EntryId(1));
        assert_eq!(b, EntryId(2));
        assert!(registry.unregister(b));
        let c = registry.register_desc(EntryDesc::circle(4.0));
        assert_eq!(c, EntryId(3));
    }

    #[test]
    fn projectiles_wait_for_their_first_update() {
        let mut registry = CollisionRegistry::with_defaults();
        let id = registry.register_desc(EntryDesc::circle(10.0).at(Vec2::new(50.0, 50.0)));
        let entry = registry.entry(id).unwrap();
        assert!(entry.pending_index_insert);
        assert!(entry.membership.is_none());
        assert_eq!(registry.projectile_count(), 1);

        registry.update_position(id, Vec2::new(50.0, 50.0));
        let entry = registry.entry(id).unwrap();
        assert!(!entry.pending_index_insert);
        let placement = entry.membership.expect("indexed after the first update");
        assert_eq!(placement.node, registry.index().root());
        assert_eq!(placement.quadrant, Quadrant::SouthEast);
    }

    #[test]
    fn other_shapes_are_never_indexed() {
        let mut registry = CollisionRegistry::with_defaults();
        let id = registry.register_desc(EntryDesc::circle(10.5));
        registry.update_position(id, Vec2::new(5.0, 5.0));
        let entry = registry.entry(id).unwrap();
        assert!(entry.membership.is_none());
        assert!(!entry.pending_index_insert);
        assert_eq!(registry.indexed_len(), 0);
        assert_eq!(registry.projectile_count(), 0);
    }

    #[test]
    fn membership_matches_stored_slot_after_moves() {
        let mut registry = CollisionRegistry::with_defaults();
        let ids: Vec<EntryId> = (0..6)
            .map(|i| projectile(&mut registry, -500.0 + 30.0 * i as f32, -300.0))
            .collect();
        for (step, id) in ids.iter().enumerate() {
            let position = Vec2::new(400.0 - 25.0 * step as f32, 250.0);
            registry.update_position(*id, position);
        }
        for id in ids {
            let membership = registry.entry(id).unwrap().membership;
            assert_eq!(membership, registry.index().find_entry(id));
        }
    }

    #[test]
    fn callback_removal_is_deferred_to_the_end_of_the_pass() {
        let mut registry = CollisionRegistry::with_defaults();
        let wall = registry.register_desc(EntryDesc::rect(100.0, 20.0).fixed(true));
        let bullet = registry.register_desc(
            EntryDesc::circle(10.0)
                .at(Vec2::new(0.0, -15.0))
                .on_overlap(|me, _other, _resolution, commands| commands.unregister(me.id)),
        );
        registry.update_position(bullet, Vec2::new(0.0, -15.0));

        let stats = registry.tick(1.0 / 60.0);
        assert_eq!(stats.overlaps, 1);
        assert_eq!(stats.deferred_removals, 1);
        assert!(!registry.contains(bullet));
        assert!(registry.contains(wall));
        assert_eq!(registry.projectile_count(), 0);
        assert!(registry.index().find_entry(bullet).is_none());
    }

    #[test]
    fn corrections_reach_the_owner() {
        let recorded = Arc::new(Mutex::new(RecordedPositions::new()));
        let mut registry = CollisionRegistry::with_defaults();
        registry.set_entity_positions(recorded.clone());

        let anchor = registry.register_desc(
            EntryDesc::circle(10.0)
                .at(Vec2::new(100.0, 100.0))
                .fixed(true)
                .owner(OwnerHandle(1)),
        );
        let mover = registry.register_desc(
            EntryDesc::circle(10.0)
                .at(Vec2::new(115.0, 100.0))
                .owner(OwnerHandle(2)),
        );
        registry.update_position(anchor, Vec2::new(100.0, 100.0));
        registry.update_position(mover, Vec2::new(115.0, 100.0));

        registry.tick(0.016);
        let corrected = recorded.lock().get(OwnerHandle(2)).expect("mover was pushed");
        assert_eq!(corrected, Vec2::new(120.0, 100.0));
        assert_eq!(registry.entry(mover).unwrap().position, corrected);
        assert!(recorded.lock().get(OwnerHandle(1)).is_none());
    }

    #[test]
    fn toggle_counts_reach_the_overlay() {
        let recorder = Arc::new(Mutex::new(RecordingDebugDraw::new()));
        let mut registry =
            CollisionRegistry::new(CollisionConfig::default(), recorder.clone(), None).unwrap();
        assert_eq!(recorder.lock().indexing_enabled, Some(true));

        projectile(&mut registry, 10.0, 10.0);
        assert_eq!(recorder.lock().projectile_count, 1);

        registry.apply_toggle(ToggleAction::Indexing);
        assert_eq!(recorder.lock().indexing_enabled, Some(false));
        registry.apply_toggle(ToggleAction::Visualization);
        assert!(recorder.lock().overlay_visible);
        assert!(registry.overlay_visible());
    }

    #[test]
    fn callbacks_see_the_resolution_applied_to_them() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = CollisionRegistry::with_defaults();
        let sink = seen.clone();
        let a = registry.register(
            OwnerHandle(1),
            CollisionShape::circle(10.0),
            Vec2::new(100.0, 100.0),
            false,
            false,
            Some(callback(move |me, other, resolution, _| {
                sink.lock().push((me.id, other.id, resolution));
            })),
        );
        let b = registry.register(
            OwnerHandle(2),
            CollisionShape::circle(10.0),
            Vec2::new(115.0, 100.0),
            false,
            false,
            None,
        );
        registry.update_position(a, Vec2::new(100.0, 100.0));
        registry.update_position(b, Vec2::new(115.0, 100.0));

        registry.tick(0.016);
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], (a, b, Vec2::new(-2.5, 0.0)));
    }
}
