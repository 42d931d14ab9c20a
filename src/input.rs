//! Runtime toggles delivered by an external input service.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::KeyBindings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToggleAction {
    /// Switch between quadtree and brute-force pair enumeration.
    Indexing,
    /// Show or hide the quadtree overlay.
    Visualization,
}

/// Capability polled by the registry at the start of every tick.
pub trait ToggleInput: Send {
    fn poll(&mut self) -> Option<ToggleAction>;
}

pub type SharedToggleInput = Arc<Mutex<dyn ToggleInput>>;

/// FIFO of toggles, fed either with actions or with released keys.
#[derive(Debug, Default)]
pub struct QueuedToggles {
    bindings: KeyBindings,
    pending: VecDeque<ToggleAction>,
}

impl QueuedToggles {
    pub fn new(bindings: KeyBindings) -> Self {
        Self {
            bindings,
            pending: VecDeque::new(),
        }
    }

    pub fn push(&mut self, action: ToggleAction) {
        self.pending.push_back(action);
    }

    /// Maps a released key through the bindings. Unbound keys are ignored.
    pub fn key_released(&mut self, key: char) -> bool {
        let key = key.to_ascii_lowercase();
        let action = if key == self.bindings.indexing.to_ascii_lowercase() {
            ToggleAction::Indexing
        } else if key == self.bindings.visualization.to_ascii_lowercase() {
            ToggleAction::Visualization
        } else {
            return false;
        };
        self.push(action);
        true
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl ToggleInput for QueuedToggles {
    fn poll(&mut self) -> Option<ToggleAction> {
        self.pending.pop_front()
    }
}
