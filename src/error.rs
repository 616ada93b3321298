// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for LeafLens

use thiserror::Error;

/// Result type alias for LeafLens operations
pub type Result<T> = std::result::Result<T, LeafLensError>;

/// Longest error text shown to a user
pub const USER_MESSAGE_LIMIT: usize = 300;

/// LeafLens error types
#[derive(Error, Debug)]
pub enum LeafLensError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Create {status}: {body}")]
    SubmissionRejected { status: u16, body: String },

    #[error("Retrieve {status}: {body}")]
    RetrievalFailed { status: u16, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LeafLensError {
    /// Error text suitable for an alert, cut to [`USER_MESSAGE_LIMIT`] chars
    pub fn user_message(&self) -> String {
        self.to_string().chars().take(USER_MESSAGE_LIMIT).collect()
    }

    /// Whether the creation endpoint rejected the payload encoding itself
    pub fn is_payload_rejection(&self) -> bool {
        matches!(self, LeafLensError::SubmissionRejected { status: 400, .. })
    }
}
