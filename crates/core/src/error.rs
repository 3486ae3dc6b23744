//! Error types for the Autoforge domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each collaborator has its own error enum; [`Error`] wraps them all.

use thiserror::Error;

/// The top-level error type for all Autoforge operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Extraction errors ---
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    // --- Persistence errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Version control errors ---
    #[error("Version control error: {0}")]
    Vcs(#[from] VcsError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this failure needs a human to fix credentials or permissions.
    pub fn is_authorization(&self) -> bool {
        match self {
            Error::Provider(e) => e.is_authorization(),
            _ => false,
        }
    }
}

// --- Collaborator errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider '{primary_id}' failed ({primary}); fallback '{fallback_id}' failed ({fallback})")]
    FallbackExhausted {
        primary_id: String,
        primary: Box<ProviderError>,
        fallback_id: String,
        fallback: Box<ProviderError>,
    },
}

impl ProviderError {
    /// Authorization/permission-class failures (401, 403, "forbidden").
    ///
    /// For an exhausted fallback, either hop counts.
    pub fn is_authorization(&self) -> bool {
        match self {
            ProviderError::AuthenticationFailed(_) => true,
            ProviderError::ApiError {
                status_code,
                message,
            } => {
                matches!(status_code, 401 | 403) || mentions_forbidden(message)
            }
            ProviderError::Network(message) => mentions_forbidden(message),
            ProviderError::FallbackExhausted {
                primary, fallback, ..
            } => primary.is_authorization() || fallback.is_authorization(),
            _ => false,
        }
    }
}

fn mentions_forbidden(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("403") || lower.contains("forbidden")
}

/// Model text could not be turned into the expected record shape.
#[derive(Debug, Clone, Error)]
#[error("{reason} (text: {snippet})")]
pub struct ExtractionError {
    pub reason: String,
    /// The offending text, truncated.
    pub snippet: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Storage write failed: {0}")]
    WriteFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Storage write timed out after {secs}s")]
    TimedOut { secs: u64 },
}

#[derive(Debug, Error)]
pub enum VcsError {
    #[error("Not a repository: {0}")]
    NotARepository(String),

    #[error("Version control command `{command}` failed: {reason}")]
    CommandFailed { command: String, reason: String },

    #[error("Version control command `{command}` timed out after {secs}s")]
    TimedOut { command: String, secs: u64 },
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Daily cycle cap of {cap} reached")]
    DailyCapReached { cap: u32 },

    #[error("Scheduler is already running")]
    AlreadyRunning,

    #[error("Cycle failed: {0}")]
    CycleFailed(String),
}
