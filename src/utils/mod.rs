//! Utility helpers: node allocator, logging and pass profiling.

pub mod allocator;
pub mod logging;
pub mod profiling;

pub use allocator::{Arena, GenerationalId};
pub use profiling::PassStats;
