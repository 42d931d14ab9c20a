use std::time::Duration;

/// Counters and timing gathered over one collision pass.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PassStats {
    pub delta_seconds: f32,
    /// Pairs handed to the narrow phase.
    pub candidate_pairs: usize,
    /// Candidate pairs that actually overlapped.
    pub overlaps: usize,
    /// Entries hard-removed after the pass finished.
    pub deferred_removals: usize,
    pub indexed_pass: bool,
    pub live_nodes: usize,
    pub elapsed: Duration,
}

impl PassStats {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn report(&self) {
        log::info!(
            "collision pass: {} candidates, {} overlaps, {} deferred removals, {} nodes ({}), {:.3} ms",
            self.candidate_pairs,
            self.overlaps,
            self.deferred_removals,
            self.live_nodes,
            if self.indexed_pass { "quadtree" } else { "brute force" },
            self.elapsed.as_secs_f32() * 1000.0
        );
    }
}
