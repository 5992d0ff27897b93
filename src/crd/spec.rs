//! # Vault Specification Types
//!
//! Connection, authentication, TLS and field mapping types shared by
//! `VaultBinding` and `VaultMirror`.

use crate::vault::VaultError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Maps a source field to a field at the Vault path
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    /// Source field name
    pub name: String,
    /// Optional destination field name. Defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,
}

impl FieldMapping {
    /// Identity mapping for a single field
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rename: None,
        }
    }

    /// Mapping that writes `name` to `rename` at the destination
    pub fn renamed(name: impl Into<String>, rename: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rename: Some(rename.into()),
        }
    }

    /// Field looked up in the source data
    #[must_use]
    pub fn source_field(&self) -> &str {
        &self.name
    }

    /// Field written at the destination
    #[must_use]
    pub fn destination_field(&self) -> &str {
        match self.rename.as_deref() {
            Some(rename) if !rename.is_empty() => rename,
            _ => &self.name,
        }
    }

    /// Reject mappings without a source field name
    ///
    /// # Errors
    /// Returns `VaultError::InvalidFieldMapping` if `name` is empty
    pub fn validate(&self) -> Result<(), VaultError> {
        if self.name.is_empty() {
            return Err(VaultError::InvalidFieldMapping(
                "field mapping requires a non-empty name".to_string(),
            ));
        }
        Ok(())
    }
}

/// Vault authentication configuration
///
/// Kubernetes authentication is used when `type` is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VaultAuthSpec {
    /// Auth method name registered with the controller (default: kubernetes)
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub auth_type: String,
    /// Alternative path to the service account token used for kubernetes auth
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token_path: String,
    /// Vault role the service account maps to.
    /// Falls back to `VAULT_ROLE` and then to the controller's default role.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub role: String,
}

/// Vault TLS options
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VaultTlsSpec {
    /// Path to a PEM-encoded CA certificate file
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ca_cert: String,
    /// Path to a directory of PEM-encoded CA certificate files
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ca_path: String,
    /// Path to the PEM-encoded client certificate
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_cert: String,
    /// Path to the PEM-encoded client private key
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_key: String,
    /// Host name used for SNI and certificate verification
    ///
    /// Requests still go to the addresses of `address` and keep its `Host`
    /// header.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub server_name: String,
    /// Disable certificate verification
    #[serde(default)]
    pub insecure: bool,
}

/// A Vault server and path
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VaultSpec {
    /// The http URL for the vault server.
    /// By default the controller's `VAULT_ADDR` is used.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub address: String,
    /// The vault path, for example: secret/myapp
    pub path: String,
    /// Overwrite existing fields which differ from the source
    #[serde(default)]
    pub force_apply: bool,
    /// Vault TLS configuration
    #[serde(default)]
    pub tls_config: VaultTlsSpec,
    /// Vault authentication parameters
    #[serde(default)]
    pub auth: VaultAuthSpec,
}
