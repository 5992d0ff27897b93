//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Vault address used when neither the resource nor `VAULT_ADDR` provide one
pub const DEFAULT_VAULT_ADDRESS: &str = "https://127.0.0.1:8200";

/// Transport timeout applied to every Vault HTTP request (seconds)
pub const DEFAULT_VAULT_TIMEOUT_SECS: u64 = 60;

/// Auth method used when a resource leaves `auth.type` empty
pub const DEFAULT_AUTH_METHOD: &str = "kubernetes";

/// Mount path of the kubernetes auth backend
pub const KUBERNETES_AUTH_MOUNT_PATH: &str = "auth/kubernetes";

/// Vault role used when neither the resource nor `VAULT_ROLE` provide one
pub const DEFAULT_VAULT_ROLE: &str = "vault-sync-controller";

/// Projected service account token mounted into every pod
pub const DEFAULT_SERVICE_ACCOUNT_TOKEN_PATH: &str =
    "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Header carrying the session token on KV requests
pub const VAULT_TOKEN_HEADER: &str = "X-Vault-Token";

// Environment fallbacks
pub const ENV_VAULT_ADDR: &str = "VAULT_ADDR";
pub const ENV_VAULT_ROLE: &str = "VAULT_ROLE";
pub const ENV_VAULT_TOKEN_PATH: &str = "VAULT_TOKEN_PATH";
pub const ENV_VAULT_CACERT: &str = "VAULT_CACERT";
pub const ENV_VAULT_CAPATH: &str = "VAULT_CAPATH";
pub const ENV_VAULT_CLIENT_CERT: &str = "VAULT_CLIENT_CERT";
pub const ENV_VAULT_CLIENT_KEY: &str = "VAULT_CLIENT_KEY";
pub const ENV_VAULT_TLS_SERVER_NAME: &str = "VAULT_TLS_SERVER_NAME";
pub const ENV_VAULT_SKIP_VERIFY: &str = "VAULT_SKIP_VERIFY";

/// Prefix of the annotations understood on plain Kubernetes secrets
pub const ANNOTATION_PREFIX: &str = "k8svault-controller.v1beta1.infra.doodle.com";
