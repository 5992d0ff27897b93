//! # VaultMirror
//!
//! Mirrors fields from one Vault path (possibly on another server) to another.

use super::spec::{FieldMapping, VaultSpec};
use super::status::VaultMirrorStatus;
use crate::vault::merge::Mapper;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// VaultMirror Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: vault.infra.doodle.com/v1beta1
/// kind: VaultMirror
/// metadata:
///   name: shared-credentials
/// spec:
///   source:
///     address: https://vault-a:8200
///     path: secret/shared
///   destination:
///     address: https://vault-b:8200
///     path: secret/mirrored
/// ```
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "VaultMirror",
    group = "vault.infra.doodle.com",
    version = "v1beta1",
    namespaced,
    shortname = "vm",
    status = "VaultMirrorStatus",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Bound\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct VaultMirrorSpec {
    /// Source vault server and path to mirror
    pub source: VaultSpec,
    /// Destination vault server and path
    pub destination: VaultSpec,
    /// By default existing fields at the destination do not get overwritten
    #[serde(default)]
    pub force_apply: bool,
    /// Fields to mirror. All source fields are mirrored when empty.
    #[serde(default)]
    pub fields: Vec<FieldMapping>,
}

impl Mapper for VaultMirrorSpec {
    fn is_force_apply(&self) -> bool {
        self.force_apply
    }

    fn path(&self) -> &str {
        &self.destination.path
    }

    fn field_mapping(&self) -> &[FieldMapping] {
        &self.fields
    }
}
