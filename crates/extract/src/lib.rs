//! Schema-directed extraction for Autoforge.
//!
//! Model backends are asked for JSON and frequently answer with something
//! close to it: prose around the object, markdown fences, trailing commas.
//! This crate recovers the structured value when it can and hands the caller
//! a typed fallback when it cannot.

pub mod extractor;
pub mod prompt;

pub use extractor::{ExtractionDiagnostic, Extractor, extract, extract_value};
pub use prompt::json_prompt;
