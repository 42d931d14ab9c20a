use glam::Vec2;

use crate::core::{entry::CollisionEntry, shape::CollisionShape};

/// Snapshot of the state the narrow phase reads from an entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactBody {
    pub shape: CollisionShape,
    pub position: Vec2,
    pub is_static: bool,
    pub is_trigger: bool,
}

impl ContactBody {
    pub fn new(shape: CollisionShape, position: Vec2) -> Self {
        Self {
            shape,
            position,
            is_static: false,
            is_trigger: false,
        }
    }

    pub fn fixed(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn trigger(mut self) -> Self {
        self.is_trigger = true;
        self
    }
}

impl From<&CollisionEntry> for ContactBody {
    fn from(entry: &CollisionEntry) -> Self {
        Self {
            shape: entry.shape,
            position: entry.position,
            is_static: entry.is_static,
            is_trigger: entry.is_trigger,
        }
    }
}

/// Outcome of an overlapping pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Overlap depth, always positive.
    pub penetration: f32,
    /// Displacement to apply to the first body, zero when it stays put.
    pub displacement_a: Vec2,
    /// Displacement to apply to the second body, zero when it stays put.
    pub displacement_b: Vec2,
}

/// Pairwise overlap tests and separation.
pub struct NarrowPhase;

impl NarrowPhase {
    /// Cardinal axes tried by the circle-box solver, in tie-break order.
    const SOLVE_DIRECTIONS: [Vec2; 4] = [
        Vec2::new(0.0, 1.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(0.0, -1.0),
        Vec2::new(-1.0, 0.0),
    ];

    /// Dispatches on the shape pair. A box-circle pair is solved as circle-box
    /// and the displacements handed back in argument order.
    pub fn collide(a: &ContactBody, b: &ContactBody) -> Option<Contact> {
        match (a.shape, b.shape) {
            (CollisionShape::Circle { .. }, CollisionShape::Circle { .. }) => {
                Self::circle_circle(a, b)
            }
            (CollisionShape::Circle { .. }, CollisionShape::Box { .. }) => Self::circle_box(a, b),
            (CollisionShape::Box { .. }, CollisionShape::Circle { .. }) => {
                Self::circle_box(b, a).map(|contact| Contact {
                    penetration: contact.penetration,
                    displacement_a: contact.displacement_b,
                    displacement_b: contact.displacement_a,
                })
            }
            (CollisionShape::Box { .. }, CollisionShape::Box { .. }) => Self::box_box(a, b),
        }
    }

    pub fn circle_circle(a: &ContactBody, b: &ContactBody) -> Option<Contact> {
        let (ra, rb) = (a.shape.radius()?, b.shape.radius()?);
        let offset = a.position - b.position;
        let gap = offset.length() - (ra + rb);
        if gap >= 0.0 {
            return None;
        }

        // Coincident centres have no axis to separate along.
        let normal = offset.normalize_or_zero();
        Some(Self::separate(a, b, -gap, normal * -gap))
    }

    /// Circle against an axis-aligned box.
    ///
    /// The push is snapped to the cardinal axis closest to the true separation.
    /// A circle whose centre lies inside the box is skipped.
    pub fn circle_box(circle: &ContactBody, rect: &ContactBody) -> Option<Contact> {
        let radius = circle.shape.radius()?;
        let half_extents = rect.shape.half_extents();

        let clamped = (circle.position - rect.position).clamp(-half_extents, half_extents);
        let closest = rect.position + clamped;
        let difference = closest - circle.position;
        if difference == Vec2::ZERO {
            return None;
        }

        let distance = difference.length();
        if distance >= radius {
            return None;
        }

        let penetration = radius - distance;
        let direction = Self::circle_box_solve_direction(difference);
        Some(Self::separate(circle, rect, penetration, -direction * penetration))
    }

    /// Box-box pairs are never resolved.
    pub fn box_box(_a: &ContactBody, _b: &ContactBody) -> Option<Contact> {
        None
    }

    /// Cardinal axis with the largest dot product against `difference`.
    ///
    /// Ties keep the earlier axis in the order (0, 1), (1, 0), (0, -1), (-1, 0).
    pub fn circle_box_solve_direction(difference: Vec2) -> Vec2 {
        let normal = difference.normalize_or_zero();
        let mut best = Self::SOLVE_DIRECTIONS[0];
        let mut best_dot = 0.0;
        for direction in Self::SOLVE_DIRECTIONS {
            let dot = normal.dot(direction);
            if dot > best_dot {
                best_dot = dot;
                best = direction;
            }
        }
        best
    }

    /// Splits `push_a`, the full displacement moving `a` clear of `b`, between
    /// the movable sides. Triggers and static pairs stay where they are.
    fn separate(a: &ContactBody, b: &ContactBody, penetration: f32, push_a: Vec2) -> Contact {
        let (displacement_a, displacement_b) = if a.is_trigger || b.is_trigger {
            (Vec2::ZERO, Vec2::ZERO)
        } else {
            match (a.is_static, b.is_static) {
                (true, true) => (Vec2::ZERO, Vec2::ZERO),
                (true, false) => (Vec2::ZERO, -push_a),
                (false, true) => (push_a, Vec2::ZERO),
                (false, false) => (push_a * 0.5, push_a * -0.5),
            }
        };

        Contact {
            penetration,
            displacement_a,
            displacement_b,
        }
    }
}
