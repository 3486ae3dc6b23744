//! Autonomous evolution: a scheduler that periodically looks for
//! improvements and submits them to the construction pipeline.
//!
//! A cycle snapshots the system, searches the configured topics, asks a
//! backend to rank improvement opportunities, and builds the best few.
//! Cycles are admitted by a [`CycleGate`] (daily cap plus minimum interval).

pub mod cycle;
pub mod gate;
pub mod opportunity;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use cycle::{CycleRunner, Finding};
pub use gate::{CycleGate, GateDecision};
pub use opportunity::{Opportunity, Priority};
pub use scheduler::{EvolutionScheduler, SchedulerStatus};
