//! Error handling for the data server

use thiserror::Error;

/// Errors raised while decoding raw account buffers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("{kind} account too short: {len} bytes, expected at least {expected}")]
    TooShort {
        kind: &'static str,
        len: usize,
        expected: usize,
    },

    #[error("token account is not initialized")]
    UninitializedTokenAccount,
}

/// Service-level errors surfaced at the HTTP boundary
///
/// The `Display` text is the `msg` callers receive, so it is part of the
/// wire contract.
#[derive(Error, Debug, Clone)]
pub enum ServiceError {
    #[error("server is not initialised")]
    Uninitialized,

    #[error("upstream fetch failed: {0}")]
    Upstream(String),

    #[error("subscription teardown failed: {0}")]
    SubscriptionTeardown(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("decode error: {0}")]
    Decode(#[from] LayoutError),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0} has shut down")]
    ShutDown(&'static str),
}

impl From<rusqlite::Error> for ServiceError {
    fn from(err: rusqlite::Error) -> Self {
        ServiceError::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::Upstream(err.to_string())
    }
}

impl From<solana_client::client_error::ClientError> for ServiceError {
    fn from(err: solana_client::client_error::ClientError) -> Self {
        ServiceError::Upstream(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uninitialized_message_is_stable() {
        assert_eq!(ServiceError::Uninitialized.to_string(), "server is not initialised");
    }

    #[test]
    fn test_layout_error_converts() {
        let err: ServiceError = LayoutError::UninitializedTokenAccount.into();
        assert_eq!(err.to_string(), "decode error: token account is not initialized");
    }
}
