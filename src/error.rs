// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client error types shared by every service.

/// Application error type.
///
/// Transport, status and decode failures from the backends stay distinct so
/// callers (and the UI) can tell "the network is down" from "the server sent
/// something we don't understand".
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Unexpected HTTP status {status}: {body}")]
    BadStatus { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Session is no longer valid: {0}")]
    SessionInvalid(String),

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Auth provider error: {0}")]
    Auth(String),

    #[error("Permission provider error: {0}")]
    Permission(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether an idempotent request that failed this way may be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Network(_) => true,
            AppError::BadStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Classify a reqwest failure that happened before a status was seen.
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::Decode(err.to_string())
        } else {
            AppError::Network(err.to_string())
        }
    }
}

impl From<crate::db::StoreError> for AppError {
    fn from(err: crate::db::StoreError) -> Self {
        AppError::Storage(err.to_string())
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, AppError>;
