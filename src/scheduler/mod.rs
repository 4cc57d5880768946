//! Component B: the scheduler engine.

pub mod candidate;
pub mod engine;

pub use candidate::{PlacementResult, SchedulableTask};
pub use engine::{SchedulerEngine, SchedulerError};
