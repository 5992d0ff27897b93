//! # Kubernetes Auth
//!
//! Logs in with the pod's service account token against the kubernetes
//! auth backend. The token file is read on every authentication so rotated
//! projected tokens are picked up.

use super::{AuthConfig, AuthDefaults, AuthError, AuthMethod, AuthMethodFactory, LoginRequest};
use crate::constants::{
    DEFAULT_SERVICE_ACCOUNT_TOKEN_PATH, DEFAULT_VAULT_ROLE, KUBERNETES_AUTH_MOUNT_PATH,
};
use crate::crd::VaultAuthSpec;
use crate::vault::SecretData;
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Kubernetes service account auth method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubernetesAuthMethod {
    mount_path: String,
    role: String,
    /// Defaults to the mounted service account token if unset
    token_path: Option<PathBuf>,
}

impl KubernetesAuthMethod {
    /// Build from raw config
    ///
    /// Recognized keys are `role` (required) and `token_path`.
    ///
    /// # Errors
    /// `MissingRole` if `role` is absent or empty, `InvalidConfig` if a value
    /// is not a string.
    pub fn new(conf: &AuthConfig) -> Result<Self, AuthError> {
        let role = match conf.config.get("role") {
            None => return Err(AuthError::MissingRole),
            Some(Value::String(role)) => role.clone(),
            Some(_) => {
                return Err(AuthError::InvalidConfig(
                    "could not convert 'role' config value to string".to_string(),
                ))
            }
        };

        let token_path = match conf.config.get("token_path") {
            None => None,
            Some(Value::String(path)) if path.is_empty() => None,
            Some(Value::String(path)) => Some(PathBuf::from(path)),
            Some(_) => {
                return Err(AuthError::InvalidConfig(
                    "could not convert 'token_path' config value to string".to_string(),
                ))
            }
        };

        if role.is_empty() {
            return Err(AuthError::MissingRole);
        }

        Ok(Self {
            mount_path: conf.mount_path.clone(),
            role,
            token_path,
        })
    }

    /// Build from the auth section of a resource
    ///
    /// Empty values fall back to `defaults`, then to the built-in role and
    /// the mounted service account token.
    ///
    /// # Errors
    /// See [`KubernetesAuthMethod::new`]
    pub fn from_spec(spec: &VaultAuthSpec, defaults: &AuthDefaults) -> Result<Self, AuthError> {
        let role = non_empty(&spec.role)
            .or(defaults.role.as_deref())
            .unwrap_or(DEFAULT_VAULT_ROLE);
        let token_path = non_empty(&spec.token_path)
            .or(defaults.token_path.as_deref())
            .unwrap_or(DEFAULT_SERVICE_ACCOUNT_TOKEN_PATH);

        let mut config = serde_json::Map::new();
        config.insert("role".to_string(), Value::from(role));
        config.insert("token_path".to_string(), Value::from(token_path));

        Self::new(&AuthConfig {
            mount_path: KUBERNETES_AUTH_MOUNT_PATH.to_string(),
            config,
        })
    }

    #[must_use]
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Token file read on authentication
    #[must_use]
    pub fn token_path(&self) -> &Path {
        self.token_path
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_SERVICE_ACCOUNT_TOKEN_PATH))
    }

    async fn read_jwt(&self) -> Result<String, AuthError> {
        let path = self.token_path();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| AuthError::CredentialRead {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl AuthMethod for KubernetesAuthMethod {
    async fn authenticate(&self) -> Result<LoginRequest, AuthError> {
        let jwt = self.read_jwt().await?;
        debug!(
            auth.role = %self.role,
            token.path = %self.token_path().display(),
            "read service account token"
        );

        Ok(LoginRequest {
            path: format!("{}/login", self.mount_path),
            headers: None,
            body: SecretData::from([
                ("role".to_string(), Value::from(self.role.as_str())),
                ("jwt".to_string(), Value::from(jwt)),
            ]),
        })
    }
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

/// Constructor registered under `kubernetes`
pub(crate) fn factory(defaults: AuthDefaults) -> AuthMethodFactory {
    Arc::new(
        move |spec: &VaultAuthSpec| -> Result<Box<dyn AuthMethod>, AuthError> {
            Ok(Box::new(KubernetesAuthMethod::from_spec(spec, &defaults)?))
        },
    )
}
