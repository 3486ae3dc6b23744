//! # Autoforge Core
//!
//! Domain records, error taxonomy, and the traits every collaborator is
//! written against. Implementations live in their respective crates:
//! - Model backends (`Provider`) in `autoforge-providers`
//! - Persistence (`RecordStore`) in `autoforge-store`
//! - Search and version control in `autoforge-tools`
//!
//! Nothing here touches the network or the filesystem, so every subsystem can
//! be tested against stub implementations.

pub mod error;
pub mod event;
pub mod provider;
pub mod record;
pub mod search;
pub mod store;
pub mod vcs;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ExtractionError, ProviderError, Result};
pub use event::{DomainEvent, EventBus};
pub use provider::{Provider, ProviderProfile, ProviderRequest, ProviderResponse};
pub use record::{
    Architecture, CodeBundle, ConstructionRecord, DeploymentResult, EvolutionCycle,
    FeatureRequest, Outcome, ReviewVerdict, Stage,
};
pub use search::{SearchHit, SearchProvider};
pub use store::{RecordFilter, RecordStore};
pub use vcs::VersionControl;
