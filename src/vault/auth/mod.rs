//! # Vault Authentication
//!
//! Exchanges locally available credentials for a Vault session token.
//!
//! - [`AuthMethod`] builds a login request from local credential material
//!   without doing any network I/O itself.
//! - [`AuthMethodRegistry`] maps an auth type name to a constructor.
//! - [`AuthHandler`] runs exactly one login exchange and installs the token.
//!
//! Tokens are not renewed. A connection authenticates once when it is built.

use crate::observability::metrics;
use crate::vault::{SecretData, TokenWriter, Writer};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

mod error;
pub mod kubernetes;
pub mod registry;

pub use error::AuthError;
pub use kubernetes::KubernetesAuthMethod;
pub use registry::{AuthMethodFactory, AuthMethodRegistry};

/// Login request produced by an auth method
#[derive(Debug, Clone, Default)]
pub struct LoginRequest {
    /// Login endpoint, e.g. `auth/kubernetes/login`
    pub path: String,
    /// Extra headers. `None` if the method needs none.
    pub headers: Option<HeaderMap>,
    pub body: SecretData,
}

/// An auth method builds login requests from local credentials
#[async_trait]
pub trait AuthMethod: Send + Sync + std::fmt::Debug {
    async fn authenticate(&self) -> Result<LoginRequest, AuthError>;
}

/// Raw configuration handed to an auth method constructor
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub mount_path: String,
    pub config: serde_json::Map<String, serde_json::Value>,
}

/// Controller-wide fallbacks used when a resource leaves auth settings empty
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthDefaults {
    pub role: Option<String>,
    pub token_path: Option<String>,
}

/// Runs a single login exchange against Vault
pub struct AuthHandler {
    writer: Arc<dyn Writer>,
    token_writer: Arc<dyn TokenWriter>,
}

impl std::fmt::Debug for AuthHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthHandler").finish_non_exhaustive()
    }
}

impl AuthHandler {
    /// `writer` submits the login request, `token_writer` receives the token
    pub fn new(writer: Arc<dyn Writer>, token_writer: Arc<dyn TokenWriter>) -> Self {
        Self {
            writer,
            token_writer,
        }
    }

    /// Authenticate with the given method and install the resulting token
    ///
    /// The token writer is only touched on success. Cancelling `cancel` before
    /// the login response arrives aborts with `AuthError::Cancelled`.
    ///
    /// # Errors
    /// `NilStrategy` without a method, the method's own errors,
    /// `LoginRequestFailed` if the login call fails, `EmptyAuthResponse` or
    /// `EmptyClientToken` if the response carries no usable token.
    pub async fn authenticate(
        &self,
        cancel: &CancellationToken,
        method: Option<&dyn AuthMethod>,
    ) -> Result<(), AuthError> {
        let Some(method) = method else {
            return Err(AuthError::NilStrategy);
        };

        let span = info_span!("vault.auth.login", auth.path = tracing::field::Empty);
        let span_clone = span.clone();

        let result: Result<(), AuthError> = async move {
            let request = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(AuthError::Cancelled),
                request = method.authenticate() => request?,
            };
            span_clone.record("auth.path", request.path.as_str());
            debug!("submitting login request");

            let login = async {
                match &request.headers {
                    Some(headers) => {
                        self.writer
                            .write_with_headers(&request.path, headers, &request.body)
                            .await
                    }
                    None => self.writer.write(&request.path, &request.body).await,
                }
            };

            let response = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(AuthError::Cancelled),
                response = login => response,
            }
            .map_err(|e| AuthError::LoginRequestFailed(Box::new(e)))?;

            let auth = response
                .and_then(|secret| secret.auth)
                .ok_or(AuthError::EmptyAuthResponse)?;

            if auth.client_token.is_empty() {
                return Err(AuthError::EmptyClientToken);
            }

            self.token_writer.set_token(&auth.client_token);
            info!("authentication successful");
            Ok(())
        }
        .instrument(span)
        .await;

        match &result {
            Ok(()) => metrics::increment_authentications("success"),
            Err(e) => {
                warn!(error = %e, "vault authentication failed");
                metrics::increment_authentications("failure");
            }
        }

        result
    }
}
