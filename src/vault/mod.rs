//! # Vault
//!
//! Everything needed to talk to a Vault KV engine:
//!
//! - `auth`: pluggable authentication (registry, strategies, login handler)
//! - `client`: reqwest based HTTP client
//! - `handler`: an authenticated connection exposing read and merge-write
//! - `merge`: the field merge engine and the `Mapper` capability
//! - `pool`: reuse of authenticated handlers across resources
//!
//! The traits in this module are the seams between those parts. The handler
//! and the auth handler only ever see `Reader`, `Writer` and `TokenWriter`,
//! which keeps them testable without a server.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod auth;
pub mod client;
pub mod error;
pub mod handler;
pub mod merge;
pub mod pool;
#[cfg(test)]
pub(crate) mod testing;

pub use client::{VaultClient, VaultClientConfig};
pub use error::VaultError;
pub use handler::VaultHandler;
pub use merge::{FieldAction, Mapper, MergeOutcome};
pub use pool::ClientPool;

/// Key/value data stored at a Vault path
pub type SecretData = HashMap<String, serde_json::Value>;

/// Response envelope of the Vault HTTP API
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Secret {
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub lease_id: String,
    #[serde(default)]
    pub lease_duration: u64,
    #[serde(default)]
    pub renewable: bool,
    #[serde(default)]
    pub data: Option<SecretData>,
    #[serde(default)]
    pub warnings: Option<Vec<String>>,
    #[serde(default)]
    pub auth: Option<SecretAuth>,
}

/// Auth section of a login response
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SecretAuth {
    #[serde(default)]
    pub client_token: String,
    #[serde(default)]
    pub accessor: String,
    #[serde(default)]
    pub policies: Vec<String>,
    #[serde(default)]
    pub lease_duration: u64,
    #[serde(default)]
    pub renewable: bool,
}

/// Read access to Vault paths
#[async_trait]
pub trait Reader: Send + Sync {
    /// Read a path. Returns `None` if Vault has no entry for it.
    async fn read(&self, path: &str) -> Result<Option<Secret>, VaultError>;
}

/// Write access to Vault paths
#[async_trait]
pub trait Writer: Send + Sync {
    /// Replace all data at a path. Returns the response body, if any.
    async fn write(&self, path: &str, data: &SecretData) -> Result<Option<Secret>, VaultError>;

    /// Like `write`, sending additional request headers.
    ///
    /// Implementations that cannot carry headers fall back to `write`.
    async fn write_with_headers(
        &self,
        path: &str,
        headers: &HeaderMap,
        data: &SecretData,
    ) -> Result<Option<Secret>, VaultError> {
        let _ = headers;
        self.write(path, data).await
    }
}

/// Combined read and write access
pub trait ReadWriter: Reader + Writer {}

impl<T: Reader + Writer> ReadWriter for T {}

/// Receives the session token after a successful login
pub trait TokenWriter: Send + Sync {
    fn set_token(&self, token: &str);
}
