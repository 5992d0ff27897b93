//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ## Usage
//!
//! ```rust
//! use vault_sync_controller::prelude::*;
//! ```
//!
//! This brings into scope:
//! - All CRD types (VaultBinding, VaultMirror, FieldMapping, etc.)
//! - The Vault handler, client pool and capability traits
//! - The auth method registry and auth method trait
//! - Config types and error types

// CRD types - most commonly used
pub use crate::crd::*;

// Vault access
pub use crate::vault::{
    ClientPool, FieldAction, Mapper, MergeOutcome, ReadWriter, Reader, SecretData, TokenWriter,
    VaultClient, VaultClientConfig, VaultHandler, Writer,
};

// Authentication
pub use crate::vault::auth::{
    AuthDefaults, AuthHandler, AuthMethod, AuthMethodRegistry, KubernetesAuthMethod, LoginRequest,
};

// Sync operations
pub use crate::sync::{bind_secret, binding_from_annotations, mirror, secret_data};

// Config types - for configuration management
pub use crate::config::ControllerConfig;

// Common error types
pub use crate::vault::auth::AuthError;
pub use crate::vault::VaultError;
