//! # Status
//!
//! Status types for `VaultBinding` and `VaultMirror`.

use serde::{Deserialize, Serialize};

/// Condition represents a condition of a resource
#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of the condition (True, False, Unknown)
    pub status: String,
    /// Last transition time
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Reason for the condition
    #[serde(default)]
    pub reason: Option<String>,
    /// Message describing the condition
    #[serde(default)]
    pub message: Option<String>,
}

/// Status of the `VaultBinding` resource
#[derive(Debug, Clone, Deserialize, Serialize, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VaultBindingStatus {
    /// Number of failures since the last successful sync
    #[serde(default)]
    pub failures: i64,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// Status of the `VaultMirror` resource
#[derive(Debug, Clone, Deserialize, Serialize, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VaultMirrorStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}
