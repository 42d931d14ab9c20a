use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Enumeration of supported collision geometries. Boxes are axis-aligned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CollisionShape {
    Circle { radius: f32 },
    Box { width: f32, height: f32 },
}

impl CollisionShape {
    pub fn circle(radius: f32) -> Self {
        Self::Circle { radius }
    }

    pub fn rect(width: f32, height: f32) -> Self {
        Self::Box { width, height }
    }

    pub fn is_circle(&self) -> bool {
        matches!(self, Self::Circle { .. })
    }

    pub fn radius(&self) -> Option<f32> {
        match self {
            Self::Circle { radius } => Some(*radius),
            Self::Box { .. } => None,
        }
    }

    pub fn half_extents(&self) -> Vec2 {
        match self {
            Self::Circle { radius } => Vec2::splat(*radius),
            Self::Box { width, height } => Vec2::new(width * 0.5, height * 0.5),
        }
    }

    /// Whether an entry with this shape belongs in the quadtree.
    ///
    /// Only circles of exactly `projectile_radius` qualify; the test is an exact
    /// float comparison and runs once, at registration.
    #[allow(clippy::float_cmp)]
    pub fn is_projectile(&self, projectile_radius: f32) -> bool {
        matches!(self, Self::Circle { radius } if *radius == projectile_radius)
    }
}
