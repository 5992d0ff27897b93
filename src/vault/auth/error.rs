//! # Auth Errors

use crate::vault::VaultError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while selecting, building or running an auth method
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("auth method {0} is unknown")]
    UnknownStrategy(String),
    #[error("auth method {0} is already registered")]
    DuplicateStrategy(String),
    #[error("'role' value is missing or empty")]
    MissingRole,
    #[error("invalid auth config: {0}")]
    InvalidConfig(String),
    #[error("error reading service account token from {}: {source}", path.display())]
    CredentialRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("auth handler: nil auth method")]
    NilStrategy,
    #[error("login request failed: {0}")]
    LoginRequestFailed(#[source] Box<VaultError>),
    #[error("authentication returned nil auth info")]
    EmptyAuthResponse,
    #[error("authentication returned empty client token")]
    EmptyClientToken,
    #[error("authentication cancelled")]
    Cancelled,
}

impl AuthError {
    /// Check if this error is transient (should retry)
    ///
    /// Configuration errors are permanent until the resource changes.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            AuthError::CredentialRead { .. } | AuthError::Cancelled => true,
            AuthError::LoginRequestFailed(e) => e.is_transient(),
            AuthError::UnknownStrategy(_)
            | AuthError::DuplicateStrategy(_)
            | AuthError::MissingRole
            | AuthError::InvalidConfig(_)
            | AuthError::NilStrategy
            | AuthError::EmptyAuthResponse
            | AuthError::EmptyClientToken => false,
        }
    }
}
