//! Global configuration constants and the loadable [`CollisionConfig`].

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::{CollisionError, Result};

/// Default extents of the root quadtree node (the simulated play field).
pub const DEFAULT_WORLD_SIZE: [f32; 2] = [1280.0, 720.0];

/// Number of entries a quadrant holds before it asks to subdivide.
pub const DEFAULT_MAX_ENTRIES_PER_QUADRANT: usize = 2;

/// Smallest side length a subdivided child may have.
pub const DEFAULT_MIN_NODE_SIZE: f32 = 20.0;

/// Circles of exactly this radius are tracked by the quadtree.
pub const DEFAULT_PROJECTILE_RADIUS: f32 = 10.0;

/// Distance of a quadrant's occupancy label from the node centre.
pub const DEFAULT_QUADRANT_LABEL_OFFSET: f32 = 25.0;

/// A collision pass slower than this (in milliseconds) is reported.
pub const DEFAULT_TICK_BUDGET_MS: f32 = 4.0;

/// Keys that drive the runtime toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub indexing: char,
    pub visualization: char,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            indexing: 'q',
            visualization: 'v',
        }
    }
}

/// Tunables for the quadtree and the collision registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    pub world_center: Vec2,
    pub world_size: Vec2,
    pub max_entries_per_quadrant: usize,
    pub min_node_size: f32,
    pub projectile_radius: f32,
    pub indexing_enabled: bool,
    pub show_overlay: bool,
    pub quadrant_label_offset: f32,
    pub tick_budget_ms: f32,
    pub bindings: KeyBindings,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            world_center: Vec2::ZERO,
            world_size: Vec2::from_array(DEFAULT_WORLD_SIZE),
            max_entries_per_quadrant: DEFAULT_MAX_ENTRIES_PER_QUADRANT,
            min_node_size: DEFAULT_MIN_NODE_SIZE,
            projectile_radius: DEFAULT_PROJECTILE_RADIUS,
            indexing_enabled: true,
            show_overlay: false,
            quadrant_label_offset: DEFAULT_QUADRANT_LABEL_OFFSET,
            tick_budget_ms: DEFAULT_TICK_BUDGET_MS,
            bindings: KeyBindings::default(),
        }
    }
}

impl CollisionConfig {
    /// Parses a TOML document; missing keys fall back to their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|err| CollisionError::ConfigParse(err.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_entries_per_quadrant == 0 {
            return Err(CollisionError::InvalidConfig(
                "max_entries_per_quadrant must be at least 1".into(),
            ));
        }
        if !self.world_size.is_finite() || self.world_size.min_element() <= 0.0 {
            return Err(CollisionError::InvalidConfig(format!(
                "world_size must be positive, got {}",
                self.world_size
            )));
        }
        if !self.world_center.is_finite() {
            return Err(CollisionError::InvalidConfig(
                "world_center must be finite".into(),
            ));
        }
        if !(self.min_node_size > 0.0) {
            return Err(CollisionError::InvalidConfig(format!(
                "min_node_size must be positive, got {}",
                self.min_node_size
            )));
        }
        if !(self.projectile_radius > 0.0) {
            return Err(CollisionError::InvalidConfig(format!(
                "projectile_radius must be positive, got {}",
                self.projectile_radius
            )));
        }
        Ok(())
    }
}
