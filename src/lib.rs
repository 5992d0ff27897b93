//! Vault Sync Controller Library
//!
//! Synchronizes fields from Kubernetes secrets and other Vault paths into a
//! Vault KV engine without clobbering fields that already exist there.
//!
//! ## Quick Start
//!
//! ```rust
//! use vault_sync_controller::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod config;
pub mod constants;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod sync;
pub mod vault;
