//! # Custom Resource Definitions
//!
//! CRD types for the Vault Sync Controller.
//!
//! ## Module Structure
//!
//! - `spec.rs` - Shared Vault connection, auth, TLS and field mapping types
//! - `binding.rs` - `VaultBinding` (Kubernetes secret to Vault path)
//! - `mirror.rs` - `VaultMirror` (Vault path to Vault path)
//! - `status.rs` - Status types shared by both resources

mod binding;
mod mirror;
mod spec;
mod status;

pub use binding::{SecretReference, VaultBinding, VaultBindingSpec};
pub use mirror::{VaultMirror, VaultMirrorSpec};
pub use spec::{FieldMapping, VaultAuthSpec, VaultSpec, VaultTlsSpec};
pub use status::{Condition, VaultBindingStatus, VaultMirrorStatus};

/// API group of all resources served by the controller
pub const API_GROUP: &str = "vault.infra.doodle.com";
