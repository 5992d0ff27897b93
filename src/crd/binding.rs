//! # VaultBinding
//!
//! Binds the fields of a Kubernetes secret to a Vault path.

use super::spec::{FieldMapping, VaultAuthSpec, VaultSpec, VaultTlsSpec};
use super::status::VaultBindingStatus;
use crate::vault::merge::Mapper;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// VaultBinding Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: vault.infra.doodle.com/v1beta1
/// kind: VaultBinding
/// metadata:
///   name: my-app
///   namespace: default
/// spec:
///   path: secret/my-app
///   secret:
///     name: my-app-credentials
///   fields:
///     - name: username
///     - name: password
///       rename: db_password
/// ```
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "VaultBinding",
    group = "vault.infra.doodle.com",
    version = "v1beta1",
    namespaced,
    shortname = "vb",
    status = "VaultBindingStatus",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Bound\")].status"}"#,
    printcolumn = r#"{"name":"Status", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Bound\")].message"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct VaultBindingSpec {
    /// The http URL for the vault server.
    /// By default the controller's `VAULT_ADDR` is used.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub address: String,
    /// The vault path, for example: secret/myapp
    pub path: String,
    /// By default existing fields in vault do not get overwritten
    #[serde(default)]
    pub force_apply: bool,
    /// Fields of the secret to map. All fields are mapped when empty.
    #[serde(default)]
    pub fields: Vec<FieldMapping>,
    /// The kubernetes secret the binding refers to
    pub secret: SecretReference,
    /// Vault TLS configuration
    #[serde(default)]
    pub tls_config: VaultTlsSpec,
    /// Vault authentication parameters
    #[serde(default)]
    pub auth: VaultAuthSpec,
}

/// Reference to a Kubernetes secret
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretReference {
    pub name: String,
    /// Defaults to the namespace of the binding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl VaultBindingSpec {
    /// Connection settings of the destination Vault
    #[must_use]
    pub fn vault_spec(&self) -> VaultSpec {
        VaultSpec {
            address: self.address.clone(),
            path: self.path.clone(),
            force_apply: self.force_apply,
            tls_config: self.tls_config.clone(),
            auth: self.auth.clone(),
        }
    }
}

impl Mapper for VaultBindingSpec {
    fn is_force_apply(&self) -> bool {
        self.force_apply
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn field_mapping(&self) -> &[FieldMapping] {
        &self.fields
    }
}
