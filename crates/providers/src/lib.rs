//! Language-model backends for Autoforge.
//!
//! All backends implement the `autoforge_core::Provider` trait.
//! The router selects a backend for each piece of work and invokes it with a
//! single fallback hop.

pub mod fallback;
pub mod openai_compat;
pub mod router;

pub use fallback::FallbackProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ModelRouter, build_from_config};
