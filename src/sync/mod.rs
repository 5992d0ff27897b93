//! # Sync Operations
//!
//! Entry points that feed Kubernetes secrets or other Vault paths into the
//! field merge.
//!
//! - [`bind_secret`]: Kubernetes secret to Vault path (`VaultBinding`)
//! - [`mirror`]: Vault path to Vault path (`VaultMirror`)
//! - [`annotations`]: `VaultBinding` specs from annotated secrets

pub mod annotations;

pub use annotations::binding_from_annotations;

use crate::crd::{VaultBindingSpec, VaultMirrorSpec};
use crate::vault::{SecretData, VaultError, VaultHandler};
use k8s_openapi::api::core::v1::Secret;
use serde_json::Value;
use tracing::{info, info_span, Instrument};

/// Field data of a Kubernetes secret
///
/// `data` values are decoded as UTF-8 (invalid sequences are replaced),
/// `stringData` entries take precedence.
#[must_use]
pub fn secret_data(secret: &Secret) -> SecretData {
    let mut fields = SecretData::new();

    if let Some(data) = &secret.data {
        for (key, value) in data {
            fields.insert(
                key.clone(),
                Value::String(String::from_utf8_lossy(&value.0).into_owned()),
            );
        }
    }

    if let Some(string_data) = &secret.string_data {
        for (key, value) in string_data {
            fields.insert(key.clone(), Value::String(value.clone()));
        }
    }

    fields
}

/// Merge the fields of `secret` into the binding's Vault path
///
/// # Errors
/// See [`VaultHandler::write`].
pub async fn bind_secret(
    handler: &VaultHandler,
    binding: &VaultBindingSpec,
    secret: &Secret,
) -> Result<bool, VaultError> {
    let span = info_span!(
        "sync.bind_secret",
        secret.name = binding.secret.name.as_str(),
        vault.path = binding.path.as_str()
    );

    async move {
        let written = handler.write(binding, &secret_data(secret)).await?;
        info!(written, "secret bound to vault");
        Ok(written)
    }
    .instrument(span)
    .await
}

/// Merge the data at the mirror's source path into its destination path
///
/// Unlike the destination, a missing source is an error.
///
/// # Errors
/// `PathNotFound` if the source holds no data, otherwise see
/// [`VaultHandler::write`].
pub async fn mirror(
    source: &VaultHandler,
    destination: &VaultHandler,
    spec: &VaultMirrorSpec,
) -> Result<bool, VaultError> {
    let span = info_span!(
        "sync.mirror",
        source.path = spec.source.path.as_str(),
        destination.path = spec.destination.path.as_str()
    );

    async move {
        let data = source.read(&spec.source.path).await?;
        let written = destination.write(spec, &data).await?;
        info!(written, "vault path mirrored");
        Ok(written)
    }
    .instrument(span)
    .await
}
