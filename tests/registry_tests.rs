use std::sync::Arc;

use parking_lot::Mutex;
use quad_collision::*;

type Hits = Arc<Mutex<Vec<(EntryId, EntryId, Vec2)>>>;

fn recording(hits: &Hits) -> impl FnMut(&CollisionEntry, &CollisionEntry, Vec2, &mut CollisionCommands) + Send + 'static {
    let hits = hits.clone();
    move |me, other, resolution, _commands| hits.lock().push((me.id, other.id, resolution))
}

#[test]
fn unknown_ids_are_ignored() {
    let mut registry = CollisionRegistry::with_defaults();
    assert!(!registry.unregister(EntryId(77)));
    assert!(!registry.update_position(EntryId(77), Vec2::ONE));
    assert!(matches!(
        registry.try_update_position(EntryId(77), Vec2::ONE),
        Err(CollisionError::UnknownEntry(EntryId(77)))
    ));

    let id = registry.register_desc(EntryDesc::rect(4.0, 4.0));
    assert!(registry.try_update_position(id, Vec2::ONE).is_ok());
    assert_eq!(registry.entry(id).unwrap().position, Vec2::ONE);
}

#[test]
fn callbacks_may_unregister_both_sides_mid_pass() {
    let mut registry = CollisionRegistry::with_defaults();
    let a = registry.register_desc(
        EntryDesc::circle(5.0)
            .at(Vec2::ZERO)
            .on_overlap(|me, other, _, commands| {
                commands.unregister(me.id);
                commands.unregister(other.id);
            }),
    );
    let b = registry.register_desc(
        EntryDesc::circle(5.0)
            .at(Vec2::new(4.0, 0.0))
            .on_overlap(|me, _, _, commands| commands.unregister(me.id)),
    );

    let stats = registry.tick(0.016);
    assert_eq!(stats.overlaps, 1);
    assert_eq!(stats.deferred_removals, 2);
    assert!(!registry.contains(a));
    assert!(!registry.contains(b));
    assert!(registry.is_empty());
}

#[test]
fn deleted_entries_are_skipped_for_the_rest_of_the_pass() {
    let hits: Hits = Arc::default();
    let mut registry = CollisionRegistry::with_defaults();
    let sink = hits.clone();
    let a = registry.register_desc(
        EntryDesc::circle(5.0)
            .fixed(true)
            .on_overlap(move |me, other, resolution, commands| {
                sink.lock().push((me.id, other.id, resolution));
                // Third registration.
                commands.unregister(EntryId(3));
            }),
    );
    let b = registry.register_desc(
        EntryDesc::circle(5.0)
            .at(Vec2::new(2.0, 0.0))
            .fixed(true)
            .on_overlap(recording(&hits)),
    );
    let c = registry.register_desc(
        EntryDesc::circle(5.0)
            .at(Vec2::new(1.0, 1.0))
            .fixed(true)
            .on_overlap(recording(&hits)),
    );
    assert_eq!(c, EntryId(3));

    let stats = registry.tick(0.016);
    assert_eq!(stats.overlaps, 1);
    assert_eq!(*hits.lock(), vec![(a, b, Vec2::ZERO), (b, a, Vec2::ZERO)]);
    assert!(!registry.contains(c));
}

#[test]
fn triggers_report_without_moving() {
    let hits: Hits = Arc::default();
    let mut registry = CollisionRegistry::with_defaults();
    let zone = registry.register_desc(
        EntryDesc::rect(40.0, 40.0)
            .trigger(true)
            .on_overlap(recording(&hits)),
    );
    let ball = registry.register_desc(
        EntryDesc::circle(6.0)
            .at(Vec2::new(0.0, 24.0))
            .on_overlap(recording(&hits)),
    );

    registry.tick(0.016);
    // Circle first, whatever the registration order.
    assert_eq!(*hits.lock(), vec![(ball, zone, Vec2::ZERO), (zone, ball, Vec2::ZERO)]);
    assert_eq!(registry.entry(ball).unwrap().position, Vec2::new(0.0, 24.0));
}

#[test]
fn static_box_pushes_a_circle_out() {
    let recorded = Arc::new(Mutex::new(RecordedPositions::new()));
    let mut registry = CollisionRegistry::with_defaults();
    registry.set_entity_positions(recorded.clone());

    registry.register_desc(EntryDesc::rect(20.0, 20.0).fixed(true));
    let ball = registry.register_desc(
        EntryDesc::circle(5.0)
            .owner(OwnerHandle(9))
            .at(Vec2::new(0.0, -13.0)),
    );

    let stats = registry.tick(0.016);
    assert_eq!(stats.overlaps, 1);
    assert_eq!(registry.entry(ball).unwrap().position, Vec2::new(0.0, -15.0));
    assert_eq!(recorded.lock().get(OwnerHandle(9)), Some(Vec2::new(0.0, -15.0)));

    let stats = registry.tick(0.016);
    assert_eq!(stats.overlaps, 0);
}

#[test]
fn boxes_are_never_resolved() {
    let hits: Hits = Arc::default();
    let mut registry = CollisionRegistry::with_defaults();
    registry.register_desc(EntryDesc::rect(10.0, 10.0).on_overlap(recording(&hits)));
    registry.register_desc(
        EntryDesc::rect(10.0, 10.0)
            .at(Vec2::new(2.0, 2.0))
            .on_overlap(recording(&hits)),
    );

    let stats = registry.tick(0.016);
    assert_eq!(stats.candidate_pairs, 1);
    assert_eq!(stats.overlaps, 0);
    assert!(hits.lock().is_empty());
}

#[test]
fn projectiles_only_meet_inside_a_shared_quadrant() {
    let hits: Hits = Arc::default();
    let mut registry = CollisionRegistry::with_defaults();
    let west = registry.register_desc(
        EntryDesc::circle(10.0)
            .at(Vec2::new(-5.0, -50.0))
            .fixed(true)
            .on_overlap(recording(&hits)),
    );
    let east = registry.register_desc(
        EntryDesc::circle(10.0)
            .at(Vec2::new(5.0, -50.0))
            .fixed(true)
            .on_overlap(recording(&hits)),
    );
    registry.update_position(west, Vec2::new(-5.0, -50.0));
    registry.update_position(east, Vec2::new(5.0, -50.0));

    let stats = registry.tick(0.016);
    assert!(stats.indexed_pass);
    assert_eq!(stats.overlaps, 0);

    registry.toggle_indexing();
    let stats = registry.tick(0.016);
    assert!(!stats.indexed_pass);
    assert_eq!(stats.overlaps, 1);
    assert_eq!(hits.lock().len(), 2);
}

#[test]
fn projectile_hits_a_wall_through_the_brute_force_pass() {
    let hits: Hits = Arc::default();
    let mut registry = CollisionRegistry::with_defaults();
    registry.register_desc(EntryDesc::rect(200.0, 20.0).at(Vec2::new(100.0, 100.0)).fixed(true));
    let bullet = registry.register_desc(
        EntryDesc::circle(10.0)
            .at(Vec2::new(100.0, 85.0))
            .on_overlap(recording(&hits)),
    );
    registry.update_position(bullet, Vec2::new(100.0, 85.0));

    registry.tick(0.016);
    assert_eq!(hits.lock().len(), 1);
    assert_eq!(registry.entry(bullet).unwrap().position, Vec2::new(100.0, 80.0));
    assert_eq!(
        registry.entry(bullet).unwrap().membership,
        registry.index().find_entry(bullet)
    );
}

#[test]
fn projectile_count_follows_registrations() {
    let mut registry = CollisionRegistry::with_defaults();
    let ids: Vec<EntryId> = (0..5)
        .map(|i| registry.register_desc(EntryDesc::circle(10.0).at(Vec2::new(i as f32 * 40.0, 0.0))))
        .collect();
    registry.register_desc(EntryDesc::circle(3.0));
    assert_eq!(registry.projectile_count(), 5);
    assert_eq!(registry.indexed_len(), 5);
    assert_eq!(registry.len(), 6);

    registry.unregister(ids[0]);
    registry.unregister(ids[1]);
    assert_eq!(registry.projectile_count(), 3);
}

#[test]
fn registry_can_move_between_threads() {
    fn assert_send<T: Send>() {}
    assert_send::<CollisionRegistry>();

    let shared = Arc::new(std::sync::Mutex::new(CollisionRegistry::with_defaults()));
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let shared = Arc::clone(&shared);
            std::thread::spawn(move || {
                let mut registry = shared.lock().unwrap();
                let id = registry.register_desc(EntryDesc::circle(10.0));
                registry.update_position(id, Vec2::new(i as f32 * 50.0, 10.0));
                registry.tick(1.0 / 60.0);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(shared.lock().unwrap().projectile_count(), 4);
}

fn nested_trio(registry: &mut CollisionRegistry) -> (Vec<EntryId>, NodeId) {
    let positions = [
        Vec2::new(-100.0, -100.0),
        Vec2::new(-200.0, -100.0),
        Vec2::new(-300.0, -200.0),
    ];
    let ids: Vec<EntryId> = positions
        .iter()
        .map(|position| {
            let id = registry.register_desc(EntryDesc::circle(10.0).at(*position));
            registry.update_position(id, *position);
            id
        })
        .collect();
    let root = registry.index().root();
    let child = registry
        .index()
        .node(root)
        .and_then(|node| node.child(Quadrant::NorthWest))
        .expect("third projectile subdivides the north-west quadrant");

    // Same positions again: the residents move down into the new child.
    for (id, position) in ids.iter().zip(positions) {
        registry.update_position(*id, position);
        assert_eq!(registry.entry(*id).unwrap().membership.unwrap().node, child);
    }
    assert!(registry.index().is_live(child));
    assert_eq!(registry.index().node(root).unwrap().count(Quadrant::NorthWest), 0);
    (ids, child)
}

#[test]
fn moving_within_a_node_keeps_it_alive() {
    let mut registry = CollisionRegistry::with_defaults();
    let (ids, child) = nested_trio(&mut registry);
    assert_eq!(
        registry.entry(ids[2]).unwrap().membership,
        Some(Placement { node: child, quadrant: Quadrant::NorthEast })
    );

    registry.update_position(ids[2], Vec2::new(-400.0, -250.0));

    assert!(registry.index().is_live(child));
    let expected = Placement { node: child, quadrant: Quadrant::NorthWest };
    assert_eq!(registry.entry(ids[2]).unwrap().membership, Some(expected));
    assert_eq!(registry.index().find_entry(ids[2]), Some(expected));
    let node = registry.index().node(child).unwrap();
    assert_eq!(node.count(Quadrant::NorthEast), 0);
    assert_eq!(node.count(Quadrant::SouthEast), 2);
    assert_eq!(registry.index().node_count(), 2);
}

#[test]
fn leaving_for_an_unrelated_node_merges_the_old_one() {
    let mut registry = CollisionRegistry::with_defaults();
    let (ids, child) = nested_trio(&mut registry);
    let root = registry.index().root();

    registry.update_position(ids[2], Vec2::new(300.0, 200.0));

    assert!(!registry.index().is_live(child));
    assert_eq!(registry.index().node_count(), 1);
    assert!(registry.index().node(root).unwrap().child(Quadrant::NorthWest).is_none());

    let residual = Placement { node: root, quadrant: Quadrant::NorthWest };
    for id in &ids[..2] {
        assert_eq!(registry.entry(*id).unwrap().membership, Some(residual));
        assert_eq!(registry.index().find_entry(*id), Some(residual));
    }
    let moved = Placement { node: root, quadrant: Quadrant::SouthEast };
    assert_eq!(registry.entry(ids[2]).unwrap().membership, Some(moved));
    assert_eq!(registry.index().node(root).unwrap().count(Quadrant::NorthWest), 2);
}
