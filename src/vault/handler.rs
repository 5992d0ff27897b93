//! # Vault Handler
//!
//! An authenticated connection to one Vault server. Exposes the KV read and
//! the merging write used by the sync operations.

use crate::config::ControllerConfig;
use crate::constants::DEFAULT_VAULT_TIMEOUT_SECS;
use crate::crd::VaultSpec;
use crate::observability::metrics;
use crate::vault::auth::{AuthHandler, AuthMethodRegistry};
use crate::vault::merge::{merge_fields, Mapper};
use crate::vault::{ReadWriter, SecretData, VaultClient, VaultClientConfig, VaultError};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, Instrument};

/// Authenticated Vault connection
pub struct VaultHandler {
    client: Arc<dyn ReadWriter>,
    address: String,
}

impl std::fmt::Debug for VaultHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultHandler")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl VaultHandler {
    /// Wrap an already configured client
    pub fn new(client: Arc<dyn ReadWriter>, address: impl Into<String>) -> Self {
        Self {
            client,
            address: address.into(),
        }
    }

    /// Build a client for `spec` and authenticate it
    ///
    /// Address and TLS settings missing on the resource are taken from
    /// `config`. The auth method is looked up by `spec.auth.type`.
    ///
    /// # Errors
    /// Client construction errors and `VaultError::Auth` for any
    /// authentication failure.
    pub async fn connect(
        spec: &VaultSpec,
        registry: &AuthMethodRegistry,
        config: &ControllerConfig,
        cancel: &CancellationToken,
    ) -> Result<Self, VaultError> {
        let address = config.resolve_address(&spec.address);
        let span = info_span!(
            "vault.connect",
            vault.address = %address,
            auth.method = %spec.auth.auth_type
        );

        async move {
            let client = Arc::new(
                VaultClient::new(&VaultClientConfig {
                    address: address.clone(),
                    tls: config.resolve_tls(&spec.tls_config),
                    timeout: Duration::from_secs(DEFAULT_VAULT_TIMEOUT_SECS),
                })
                .await?,
            );

            let method = registry.invoke(&spec.auth.auth_type, &spec.auth)?;
            AuthHandler::new(
                Arc::<VaultClient>::clone(&client),
                Arc::<VaultClient>::clone(&client),
            )
            .authenticate(cancel, Some(&*method))
            .await?;

            info!("connected to Vault");
            Ok(Self::new(client, address))
        }
        .instrument(span)
        .await
    }

    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Read the data stored at `path`
    ///
    /// # Errors
    /// `PathNotFound` if the path holds no data, otherwise client errors.
    pub async fn read(&self, path: &str) -> Result<SecretData, VaultError> {
        self.client
            .read(path)
            .await?
            .and_then(|secret| secret.data)
            .ok_or(VaultError::PathNotFound)
    }

    /// Merge `src` into the mapper's path
    ///
    /// Reads the destination, merges field by field and writes the complete
    /// merged data back in a single call if anything changed. A missing
    /// destination counts as empty. Returns whether a write happened.
    ///
    /// # Errors
    /// Read errors other than `PathNotFound`, merge errors (nothing is
    /// written then) and write errors.
    pub async fn write<M: Mapper + ?Sized>(
        &self,
        mapper: &M,
        src: &SecretData,
    ) -> Result<bool, VaultError> {
        let path = mapper.path();
        let span = info_span!(
            "vault.merge",
            vault.path = path,
            force_apply = mapper.is_force_apply()
        );

        let result: Result<bool, VaultError> = async move {
            let existing = match self.read(path).await {
                Ok(data) => data,
                Err(VaultError::PathNotFound) => {
                    debug!("destination path does not exist yet");
                    SecretData::new()
                }
                Err(e) => return Err(e),
            };

            let outcome = merge_fields(mapper, existing, src)?;
            if !outcome.write_back {
                debug!("no update required");
                return Ok(false);
            }

            self.client.write(path, &outcome.data).await?;
            metrics::increment_fields_written(outcome.written_fields());
            info!(
                fields = outcome.written_fields(),
                "wrote merged fields to vault"
            );
            Ok(true)
        }
        .instrument(span)
        .await;

        metrics::increment_merges(match &result {
            Ok(true) => "written",
            Ok(false) => "unchanged",
            Err(_) => "failed",
        });
        result
    }
}
