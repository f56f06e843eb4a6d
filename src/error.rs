//! Vexillum error types

/// Vexillum error types.
///
/// Payloads are plain strings so the enum is `Clone`: a resolution that
/// several triggers joined hands the same outcome to every caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VexillumError {
    // Provider/network errors
    /// Transport-level failure (connect, DNS, timeout). The only error kind
    /// surfaced to the host as actionable.
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    // Vault errors
    #[error("failed to read {path}: {message}")]
    LocalRead { path: String, message: String },

    #[error("not found: {0}")]
    NotFound(String),

    /// A spawned resolution task panicked or was aborted.
    #[error("resolution task failed: {0}")]
    Task(String),
}

impl VexillumError {
    /// Whether a caller-initiated retry has a reasonable chance to succeed.
    ///
    /// Transport failures and server-side (5xx) or throttling (429) API
    /// responses are transient; everything else is permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            VexillumError::Http(_) => true,
            VexillumError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for VexillumError {
    fn from(err: reqwest::Error) -> Self {
        VexillumError::Http(err.to_string())
    }
}

/// Result type alias for Vexillum operations
pub type Result<T> = std::result::Result<T, VexillumError>;
