//! # Secret Annotations
//!
//! Plain Kubernetes secrets can be bound to Vault without a `VaultBinding`
//! by annotating them:
//!
//! ```yaml
//! metadata:
//!   annotations:
//!     k8svault-controller.v1beta1.infra.doodle.com/path: secret/my-app
//!     k8svault-controller.v1beta1.infra.doodle.com/fields: username,password=db_password
//!     k8svault-controller.v1beta1.infra.doodle.com/force: "true"
//! ```

use crate::constants::ANNOTATION_PREFIX;
use crate::crd::{FieldMapping, SecretReference, VaultAuthSpec, VaultBindingSpec, VaultTlsSpec};
use crate::vault::VaultError;
use k8s_openapi::api::core::v1::Secret;
use std::collections::BTreeMap;

pub const VAULT: &str = "vault";
pub const PATH: &str = "path";
pub const FORCE: &str = "force";
pub const FIELDS: &str = "fields";
pub const ROLE: &str = "role";
pub const TOKEN_PATH: &str = "tokenPath";
pub const TLS_CA_CERT: &str = "tlsCACert";
pub const TLS_CA_PATH: &str = "tlsCAPath";
pub const TLS_CLIENT_CERT: &str = "tlsClientCert";
pub const TLS_CLIENT_KEY: &str = "tlsClientKey";
pub const TLS_SERVER_NAME: &str = "tlsServerName";
pub const TLS_INSECURE: &str = "tlsInsecure";

/// Whether a flag annotation is set
///
/// Only the exact spellings `1`, `true` and `yes` enable a flag.
#[must_use]
pub fn is_enabled(value: &str) -> bool {
    matches!(value, "1" | "true" | "yes")
}

/// Full annotation key, e.g. `k8svault-controller.v1beta1.infra.doodle.com/path`
#[must_use]
pub fn annotation_key(name: &str) -> String {
    format!("{ANNOTATION_PREFIX}/{name}")
}

/// Parse a `fields` annotation value
///
/// Comma separated entries, each either `name` or `name=rename`.
///
/// # Errors
/// `InvalidFieldMapping` for entries with more than one `=` or an empty name.
pub fn parse_fields(value: &str) -> Result<Vec<FieldMapping>, VaultError> {
    value
        .split(',')
        .map(|entry| {
            let parts: Vec<&str> = entry.split('=').map(str::trim).collect();
            let mapping = match parts.as_slice() {
                [name] => FieldMapping::new(*name),
                [name, rename] => FieldMapping::renamed(*name, *rename),
                _ => {
                    return Err(VaultError::InvalidFieldMapping(format!(
                        "invalid field mapping {entry:?}"
                    )))
                }
            };
            mapping.validate().map(|()| mapping)
        })
        .collect()
}

/// Build a binding from the annotations of a secret
///
/// Returns `None` if the secret carries no path annotation.
///
/// # Errors
/// `InvalidFieldMapping` if the `fields` annotation is malformed.
pub fn binding_from_annotations(secret: &Secret) -> Result<Option<VaultBindingSpec>, VaultError> {
    let empty = BTreeMap::new();
    let annotations = secret.metadata.annotations.as_ref().unwrap_or(&empty);
    let get = |name: &str| annotations.get(&annotation_key(name)).cloned();

    let Some(path) = get(PATH) else {
        return Ok(None);
    };

    let fields = match get(FIELDS) {
        Some(value) => parse_fields(&value)?,
        None => Vec::new(),
    };

    Ok(Some(VaultBindingSpec {
        address: get(VAULT).unwrap_or_default(),
        path,
        force_apply: get(FORCE).is_some_and(|v| is_enabled(&v)),
        fields,
        secret: SecretReference {
            name: secret.metadata.name.clone().unwrap_or_default(),
            namespace: secret.metadata.namespace.clone(),
        },
        tls_config: VaultTlsSpec {
            ca_cert: get(TLS_CA_CERT).unwrap_or_default(),
            ca_path: get(TLS_CA_PATH).unwrap_or_default(),
            client_cert: get(TLS_CLIENT_CERT).unwrap_or_default(),
            client_key: get(TLS_CLIENT_KEY).unwrap_or_default(),
            server_name: get(TLS_SERVER_NAME).unwrap_or_default(),
            insecure: get(TLS_INSECURE).is_some_and(|v| is_enabled(&v)),
        },
        auth: VaultAuthSpec {
            role: get(ROLE).unwrap_or_default(),
            token_path: get(TOKEN_PATH).unwrap_or_default(),
            ..VaultAuthSpec::default()
        },
    }))
}
