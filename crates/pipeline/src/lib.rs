//! The autonomous construction pipeline.
//!
//! A feature request moves through four stages, each of which formats a
//! prompt, routes it to a backend, and safely extracts a structured result:
//!
//! ```text
//! Requested → Planned → Implemented → Reviewed → Deployed | Rejected → Recorded
//!                         (any stage) → Aborted → Recorded
//! ```
//!
//! Every run ends in exactly one appended [`ConstructionRecord`]; failures
//! are fields on the record, never errors returned to the caller.
//!
//! [`ConstructionRecord`]: autoforge_core::record::ConstructionRecord

pub mod architect;
pub mod coder;
pub mod deployer;
pub mod history;
pub mod pipeline;
pub mod reviewer;
pub mod stage;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use deployer::Deployer;
pub use history::History;
pub use pipeline::ConstructionPipeline;
pub use stage::StageContext;
