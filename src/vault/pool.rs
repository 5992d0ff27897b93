//! # Client Pool
//!
//! Reuses authenticated handlers across resources that point at the same
//! server with the same credentials.
//!
//! Entries are keyed by a SHA-256 fingerprint of the resolved connection
//! settings. The Vault path and `forceApply` are not part of the key.

use crate::config::ControllerConfig;
use crate::crd::{VaultAuthSpec, VaultSpec, VaultTlsSpec};
use crate::vault::auth::AuthMethodRegistry;
use crate::vault::{VaultError, VaultHandler};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Settings that identify a connection
#[derive(Serialize)]
struct ConnectionKey {
    address: String,
    tls: VaultTlsSpec,
    auth: VaultAuthSpec,
}

/// Slot for one connection, filled by the first successful login
type HandlerCell = Arc<OnceCell<Arc<VaultHandler>>>;

/// Cache of authenticated handlers
///
/// The map lock is only held to look up or insert a slot. Logins run
/// outside of it, so a slow server only delays callers for the same
/// connection settings.
pub struct ClientPool {
    registry: Arc<AuthMethodRegistry>,
    config: Arc<ControllerConfig>,
    handlers: Mutex<HashMap<String, HandlerCell>>,
}

impl std::fmt::Debug for ClientPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientPool")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl ClientPool {
    pub fn new(registry: Arc<AuthMethodRegistry>, config: Arc<ControllerConfig>) -> Self {
        Self {
            registry,
            config,
            handlers: Mutex::new(HashMap::new()),
        }
    }

    /// Fingerprint of the connection settings of `spec`
    ///
    /// Address, TLS and auth are resolved against the controller fallbacks
    /// first, so spelled out defaults share an entry with omitted ones.
    #[must_use]
    pub fn fingerprint(&self, spec: &VaultSpec) -> String {
        let key = ConnectionKey {
            address: self.config.resolve_address(&spec.address),
            tls: self.config.resolve_tls(&spec.tls_config),
            auth: self.config.resolve_auth(&spec.auth),
        };
        // Serializing plain strings and bools cannot fail
        let encoded = serde_json::to_vec(&key).unwrap_or_default();
        format!("{:x}", Sha256::digest(&encoded))
    }

    /// Return the cached handler for `spec` or connect a new one
    ///
    /// Concurrent callers for the same settings wait for a single login.
    ///
    /// # Errors
    /// Connection and authentication errors from [`VaultHandler::connect`].
    /// Failed connections are not cached.
    pub async fn get_or_connect(
        &self,
        spec: &VaultSpec,
        cancel: &CancellationToken,
    ) -> Result<Arc<VaultHandler>, VaultError> {
        let key = self.fingerprint(spec);
        let cell = Arc::clone(self.handlers.lock().await.entry(key.clone()).or_default());

        if let Some(handler) = cell.get() {
            debug!(vault.address = handler.address(), "reusing Vault connection");
            return Ok(Arc::clone(handler));
        }

        let result = cell
            .get_or_try_init(|| async {
                VaultHandler::connect(spec, &self.registry, &self.config, cancel)
                    .await
                    .map(Arc::new)
            })
            .await
            .map(Arc::clone);

        if result.is_err() {
            let mut handlers = self.handlers.lock().await;
            let stale = handlers
                .get(&key)
                .is_some_and(|current| Arc::ptr_eq(current, &cell) && !current.initialized());
            if stale {
                handlers.remove(&key);
            }
        }
        result
    }

    /// Drop the cached handler for `spec`, e.g. after its token was revoked
    ///
    /// Returns whether a connected entry was removed.
    pub async fn invalidate(&self, spec: &VaultSpec) -> bool {
        let key = self.fingerprint(spec);
        self.handlers
            .lock()
            .await
            .remove(&key)
            .is_some_and(|cell| cell.initialized())
    }

    /// Number of connected handlers
    pub async fn len(&self) -> usize {
        self.handlers
            .lock()
            .await
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
