//! Record persistence backends for Autoforge.
//!
//! All backends implement the `autoforge_core::RecordStore` trait:
//! - `JsonlStore` — one JSON-lines file per collection
//! - `InMemoryStore` — process-local, for tests and degraded operation
//! - `DegradingStore` — a primary backend that falls back instead of failing

pub mod bounded;
pub mod degrading;
pub mod in_memory;
pub mod jsonl;

pub use bounded::{DEFAULT_WRITE_TIMEOUT, append_within};
pub use degrading::DegradingStore;
pub use in_memory::InMemoryStore;
pub use jsonl::JsonlStore;
