//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use crate::constants::{
    DEFAULT_AUTH_METHOD, DEFAULT_SERVICE_ACCOUNT_TOKEN_PATH, DEFAULT_VAULT_ADDRESS,
    DEFAULT_VAULT_ROLE, ENV_VAULT_ADDR, ENV_VAULT_CACERT, ENV_VAULT_CAPATH,
    ENV_VAULT_CLIENT_CERT, ENV_VAULT_CLIENT_KEY, ENV_VAULT_ROLE, ENV_VAULT_SKIP_VERIFY,
    ENV_VAULT_TLS_SERVER_NAME, ENV_VAULT_TOKEN_PATH,
};
use crate::crd::{VaultAuthSpec, VaultTlsSpec};
use crate::vault::auth::AuthDefaults;

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Values configured on a resource always take precedence over the ones here.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Fallback Vault address (`VAULT_ADDR`)
    pub vault_address: Option<String>,
    /// Fallback TLS settings (`VAULT_CACERT`, `VAULT_CAPATH`, ...)
    pub tls: VaultTlsSpec,
    /// Fallback Vault role for kubernetes auth (`VAULT_ROLE`)
    pub vault_role: Option<String>,
    /// Fallback service account token path for kubernetes auth (`VAULT_TOKEN_PATH`)
    pub vault_token_path: Option<String>,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
    /// Enable color in text format logs
    pub log_enable_color: bool,
    /// Enable metrics collection
    pub enable_metrics: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            vault_address: None,
            tls: VaultTlsSpec::default(),
            vault_role: None,
            vault_token_path: None,
            log_level: "INFO".to_string(),
            log_format: "json".to_string(),
            log_enable_color: false,
            enable_metrics: true,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Self {
            vault_address: get(ENV_VAULT_ADDR),
            tls: VaultTlsSpec {
                ca_cert: get(ENV_VAULT_CACERT).unwrap_or_default(),
                ca_path: get(ENV_VAULT_CAPATH).unwrap_or_default(),
                client_cert: get(ENV_VAULT_CLIENT_CERT).unwrap_or_default(),
                client_key: get(ENV_VAULT_CLIENT_KEY).unwrap_or_default(),
                server_name: get(ENV_VAULT_TLS_SERVER_NAME).unwrap_or_default(),
                insecure: get(ENV_VAULT_SKIP_VERIFY).is_some_and(|v| parse_bool(&v)),
            },
            vault_role: get(ENV_VAULT_ROLE),
            vault_token_path: get(ENV_VAULT_TOKEN_PATH),
            log_level: get("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format: get("LOG_FORMAT").unwrap_or(defaults.log_format),
            log_enable_color: get("LOG_ENABLE_COLOR")
                .map_or(defaults.log_enable_color, |v| parse_bool(&v)),
            enable_metrics: get("ENABLE_METRICS")
                .map_or(defaults.enable_metrics, |v| parse_bool(&v)),
        }
    }

    /// Resolve the Vault address for a resource
    ///
    /// Resource address, then `VAULT_ADDR`, then the built-in default.
    #[must_use]
    pub fn resolve_address(&self, address: &str) -> String {
        if !address.is_empty() {
            return address.to_string();
        }
        self.vault_address
            .clone()
            .unwrap_or_else(|| DEFAULT_VAULT_ADDRESS.to_string())
    }

    /// Overlay resource TLS settings on top of the controller-wide ones
    #[must_use]
    pub fn resolve_tls(&self, tls: &VaultTlsSpec) -> VaultTlsSpec {
        let pick = |own: &str, fallback: &str| {
            if own.is_empty() {
                fallback.to_string()
            } else {
                own.to_string()
            }
        };

        VaultTlsSpec {
            ca_cert: pick(&tls.ca_cert, &self.tls.ca_cert),
            ca_path: pick(&tls.ca_path, &self.tls.ca_path),
            client_cert: pick(&tls.client_cert, &self.tls.client_cert),
            client_key: pick(&tls.client_key, &self.tls.client_key),
            server_name: pick(&tls.server_name, &self.tls.server_name),
            insecure: tls.insecure || self.tls.insecure,
        }
    }

    /// Auth settings as the default kubernetes method sees them
    ///
    /// An empty type becomes `kubernetes`, whose empty role and token path
    /// are filled in the same order the method resolves them. Other types
    /// are returned unchanged.
    #[must_use]
    pub fn resolve_auth(&self, auth: &VaultAuthSpec) -> VaultAuthSpec {
        let auth_type = if auth.auth_type.is_empty() {
            DEFAULT_AUTH_METHOD
        } else {
            auth.auth_type.as_str()
        };
        if auth_type != DEFAULT_AUTH_METHOD {
            return auth.clone();
        }

        let pick = |own: &str, fallback: Option<&str>, default: &str| {
            if own.is_empty() {
                fallback.unwrap_or(default).to_string()
            } else {
                own.to_string()
            }
        };

        VaultAuthSpec {
            auth_type: auth_type.to_string(),
            role: pick(&auth.role, self.vault_role.as_deref(), DEFAULT_VAULT_ROLE),
            token_path: pick(
                &auth.token_path,
                self.vault_token_path.as_deref(),
                DEFAULT_SERVICE_ACCOUNT_TOKEN_PATH,
            ),
        }
    }

    /// Fallbacks handed to the auth method registry
    #[must_use]
    pub fn auth_defaults(&self) -> AuthDefaults {
        AuthDefaults {
            role: self.vault_role.clone(),
            token_path: self.vault_token_path.clone(),
        }
    }
}

/// Parse the boolean spellings accepted in env vars
pub(crate) fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
