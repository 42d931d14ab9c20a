use std::sync::Arc;

use parking_lot::Mutex;
use quad_collision::*;

const DT: f32 = 1.0 / 60.0;

fn main() {
    let mut registry = CollisionRegistry::with_defaults();
    let owners = Arc::new(Mutex::new(RecordedPositions::new()));
    registry.set_entity_positions(owners.clone());

    let half = registry.config().world_size * 0.5;
    for (x, width) in [(-half.x + 10.0, 20.0), (half.x - 10.0, 20.0)] {
        registry.register_desc(
            EntryDesc::rect(width, 2.0 * half.y)
                .at(Vec2::new(x, 0.0))
                .fixed(true)
                .on_overlap(|_, other, _, commands| commands.unregister(other.id)),
        );
    }

    let mut bullets = Vec::new();
    for i in 0..40 {
        let position = Vec2::new(-400.0 + 20.0 * i as f32, -200.0 + 10.0 * (i % 7) as f32);
        let velocity = Vec2::new(if i % 2 == 0 { 240.0 } else { -240.0 }, 30.0);
        let id = registry.register_desc(
            EntryDesc::circle(10.0)
                .owner(OwnerHandle(i))
                .at(position),
        );
        registry.update_position(id, position);
        bullets.push((id, velocity));
    }

    for frame in 0..240 {
        bullets.retain(|(id, _)| registry.contains(*id));
        for (id, velocity) in &bullets {
            if let Some(position) = registry.entry(*id).map(|entry| entry.position) {
                registry.update_position(*id, position + *velocity * DT);
            }
        }

        if frame == 120 {
            registry.apply_toggle(ToggleAction::Indexing);
        }
        let stats = registry.tick(DT);
        if frame % 60 == 0 {
            println!("frame {frame}: {} bullets", registry.projectile_count());
            stats.report();
        }
    }

    println!(
        "{} corrections pushed back to owners, {} bullets left",
        owners.lock().corrections,
        registry.projectile_count()
    );
}
