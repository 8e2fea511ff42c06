// SPDX-License-Identifier: MIT
//! Error types for text sources.

use thiserror::Error;

/// Result type alias for text source operations.
pub type Result<T> = std::result::Result<T, SourceError>;

/// Why a stream ended without completing.
///
/// The display string is what the user sees as the last error, so each
/// message reads as a sentence on its own.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Stream interrupted: {0}")]
    Stream(String),

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Generation cancelled")]
    Cancelled,
}

impl SourceError {
    /// Whether this error only reports that the caller walked away.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
