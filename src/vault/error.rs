//! # Vault Errors
//!
//! Error taxonomy for backend access and the field merge.

use super::auth::AuthError;
use thiserror::Error;

/// Errors returned by the Vault client, handler and merge engine
#[derive(Debug, Error)]
pub enum VaultError {
    /// The path holds no data. The merge treats this as an empty destination.
    #[error("Vault path not found")]
    PathNotFound,
    #[error("Source field to be mapped does not exist: {field}")]
    FieldNotAvailable { field: String },
    #[error("Invalid field mapping: {0}")]
    InvalidFieldMapping(String),
    #[error("Invalid Vault address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("Vault TLS configuration error: {0}")]
    Tls(String),
    #[error("HTTP request to Vault failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Vault API error (status {status}): {}", errors.join("; "))]
    Api { status: u16, errors: Vec<String> },
    #[error("Failed to decode Vault response: {0}")]
    Decode(String),
    #[error("Vault authentication failed: {0}")]
    Auth(#[from] AuthError),
}

impl VaultError {
    /// Check if this error is transient (should retry)
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            VaultError::Http(_) => true,
            VaultError::Api { status, .. } => *status == 429 || *status >= 500,
            VaultError::Auth(e) => e.is_transient(),
            VaultError::PathNotFound
            | VaultError::FieldNotAvailable { .. }
            | VaultError::InvalidFieldMapping(_)
            | VaultError::InvalidAddress { .. }
            | VaultError::Tls(_)
            | VaultError::Decode(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_message_joins_errors() {
        let err = VaultError::Api {
            status: 403,
            errors: vec!["permission denied".to_string(), "bad token".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Vault API error (status 403): permission denied; bad token"
        );
    }

    #[test]
    fn test_transient_classification() {
        let server = VaultError::Api {
            status: 503,
            errors: vec![],
        };
        let throttled = VaultError::Api {
            status: 429,
            errors: vec![],
        };
        let denied = VaultError::Api {
            status: 403,
            errors: vec![],
        };

        assert!(server.is_transient());
        assert!(throttled.is_transient());
        assert!(!denied.is_transient());
        assert!(!VaultError::FieldNotAvailable {
            field: "a".to_string()
        }
        .is_transient());
        assert!(VaultError::Auth(AuthError::Cancelled).is_transient());
        assert!(!VaultError::Auth(AuthError::EmptyClientToken).is_transient());
    }
}
