//! # Vault HTTP Client
//!
//! Minimal client for the Vault HTTP API built on reqwest with rustls.
//!
//! Only what the sync needs is implemented: `GET` and `PUT` against
//! `/v1/{path}` with the session token sent as `X-Vault-Token`.
//!
//! References:
//! - [Vault HTTP API](https://developer.hashicorp.com/vault/api-docs)

use crate::constants::{DEFAULT_VAULT_ADDRESS, DEFAULT_VAULT_TIMEOUT_SECS, VAULT_TOKEN_HEADER};
use crate::crd::VaultTlsSpec;
use crate::observability::metrics;
use crate::vault::{Reader, Secret, SecretData, TokenWriter, VaultError, Writer};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HOST};
use reqwest::{Certificate, Client, Identity, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, info_span, warn, Instrument};

/// Connection settings for a Vault server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultClientConfig {
    /// Base address, e.g. `https://vault:8200`
    pub address: String,
    pub tls: VaultTlsSpec,
    /// Transport timeout for every request
    pub timeout: Duration,
}

impl Default for VaultClientConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_VAULT_ADDRESS.to_string(),
            tls: VaultTlsSpec::default(),
            timeout: Duration::from_secs(DEFAULT_VAULT_TIMEOUT_SECS),
        }
    }
}

/// Error body returned by Vault for failed requests
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    errors: Vec<String>,
}

/// Vault HTTP client
pub struct VaultClient {
    http_client: Client,
    base_url: Url,
    /// `Host` header of the configured address when `server_name` replaced it
    host_header: Option<String>,
    token: RwLock<Option<String>>,
}

impl std::fmt::Debug for VaultClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl VaultClient {
    /// Create a client for the configured server
    ///
    /// No request is sent. The client starts without a token.
    ///
    /// # Errors
    /// `InvalidAddress` if the address does not parse as an http(s) URL,
    /// `Tls` if certificate material cannot be loaded.
    pub async fn new(config: &VaultClientConfig) -> Result<Self, VaultError> {
        let mut base_url = parse_address(&config.address)?;

        let mut builder = Client::builder()
            .use_rustls_tls()
            .timeout(config.timeout);

        let tls = &config.tls;
        if !tls.ca_cert.is_empty() {
            for cert in load_certificates(Path::new(&tls.ca_cert)).await? {
                builder = builder.add_root_certificate(cert);
            }
        }

        if !tls.ca_path.is_empty() {
            for file in certificate_files(Path::new(&tls.ca_path)).await? {
                for cert in load_certificates(&file).await? {
                    builder = builder.add_root_certificate(cert);
                }
            }
        }

        match (tls.client_cert.is_empty(), tls.client_key.is_empty()) {
            (false, false) => {
                let mut pem = read_tls_file(Path::new(&tls.client_key)).await?;
                pem.push(b'\n');
                pem.extend(read_tls_file(Path::new(&tls.client_cert)).await?);
                let identity = Identity::from_pem(&pem)
                    .map_err(|e| VaultError::Tls(format!("invalid client certificate: {e}")))?;
                builder = builder.identity(identity);
            }
            (true, true) => {}
            _ => {
                return Err(VaultError::Tls(
                    "client certificate and client key must be set together".to_string(),
                ))
            }
        }

        if tls.insecure {
            warn!(vault.address = %base_url, "TLS certificate verification is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let mut host_header = None;
        if !tls.server_name.is_empty() {
            host_header = Some(authority(&base_url));
            let addrs = resolve(&base_url).await?;
            builder = builder.resolve_to_addrs(&tls.server_name, &addrs);
            base_url
                .set_host(Some(&tls.server_name))
                .map_err(|e| VaultError::InvalidAddress {
                    address: config.address.clone(),
                    reason: format!("invalid TLS server name {}: {e}", tls.server_name),
                })?;
        }

        let http_client = builder
            .build()
            .map_err(|e| VaultError::Tls(format!("failed to create HTTP client: {e}")))?;

        debug!(vault.address = %base_url, "created Vault client");

        Ok(Self {
            http_client,
            base_url,
            host_header,
            token: RwLock::new(None),
        })
    }

    /// Current session token
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn address(&self) -> &str {
        self.base_url.as_str()
    }

    /// URL of a logical path, e.g. `secret/app` -> `{base}/v1/secret/app`
    fn url(&self, path: &str) -> Result<Url, VaultError> {
        self.base_url
            .join(&format!("v1/{}", path.trim_start_matches('/')))
            .map_err(|e| VaultError::InvalidAddress {
                address: path.to_string(),
                reason: e.to_string(),
            })
    }

    fn authorize(&self, mut request: RequestBuilder) -> RequestBuilder {
        if let Some(host) = &self.host_header {
            request = request.header(HOST, host);
        }
        match self.token() {
            Some(token) => request.header(VAULT_TOKEN_HEADER, token),
            None => request,
        }
    }

    /// Send a request and decode the response envelope
    ///
    /// `None` for empty bodies, and for 404 if `not_found_is_empty` is set.
    async fn execute(
        &self,
        operation: &'static str,
        request: RequestBuilder,
        not_found_is_empty: bool,
    ) -> Result<Option<Secret>, VaultError> {
        let start = Instant::now();
        metrics::increment_vault_operations(operation);

        let result = self.send(request, not_found_is_empty).await;

        metrics::observe_vault_operation_duration(operation, start.elapsed().as_secs_f64());
        if let Err(e) = &result {
            metrics::increment_vault_operation_errors(operation);
            debug!(error = %e, "Vault {operation} failed");
        }
        result
    }

    async fn send(
        &self,
        request: RequestBuilder,
        not_found_is_empty: bool,
    ) -> Result<Option<Secret>, VaultError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND && not_found_is_empty {
            return Ok(None);
        }

        let body = response.text().await?;
        if !status.is_success() {
            return Err(handle_error_response(status, &body));
        }

        if status == StatusCode::NO_CONTENT || body.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| VaultError::Decode(e.to_string()))
    }
}

#[async_trait]
impl Reader for VaultClient {
    async fn read(&self, path: &str) -> Result<Option<Secret>, VaultError> {
        let span = info_span!("vault.kv.read", vault.path = path);
        async move {
            let url = self.url(path)?;
            self.execute("read", self.http_client.get(url), true).await
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl Writer for VaultClient {
    async fn write(&self, path: &str, data: &SecretData) -> Result<Option<Secret>, VaultError> {
        self.write_with_headers(path, &HeaderMap::new(), data).await
    }

    async fn write_with_headers(
        &self,
        path: &str,
        headers: &HeaderMap,
        data: &SecretData,
    ) -> Result<Option<Secret>, VaultError> {
        let span = info_span!("vault.kv.write", vault.path = path, fields = data.len());
        async move {
            let url = self.url(path)?;
            let request = self
                .http_client
                .put(url)
                .headers(headers.clone())
                .json(data);
            self.execute("write", request, false).await
        }
        .instrument(span)
        .await
    }
}

impl TokenWriter for VaultClient {
    fn set_token(&self, token: &str) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
    }
}

fn parse_address(address: &str) -> Result<Url, VaultError> {
    let invalid = |reason: String| VaultError::InvalidAddress {
        address: address.to_string(),
        reason,
    };

    let mut url = Url::parse(address).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }

    // Url::join replaces the last segment unless the path ends with a slash
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Map a non-success response to `VaultError::Api`
fn handle_error_response(status: StatusCode, body: &str) -> VaultError {
    let errors = match serde_json::from_str::<ErrorResponse>(body) {
        Ok(response) if !response.errors.is_empty() => response.errors,
        _ if body.trim().is_empty() => Vec::new(),
        _ => vec![body.trim().to_string()],
    };
    VaultError::Api {
        status: status.as_u16(),
        errors,
    }
}

/// `host[:port]` as sent in the `Host` header
fn authority(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

async fn resolve(url: &Url) -> Result<Vec<SocketAddr>, VaultError> {
    let host = url.host_str().unwrap_or_default();
    let port = url.port_or_known_default().unwrap_or(8200);
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| VaultError::InvalidAddress {
            address: url.to_string(),
            reason: format!("failed to resolve {host}: {e}"),
        })?
        .collect();
    if addrs.is_empty() {
        return Err(VaultError::InvalidAddress {
            address: url.to_string(),
            reason: format!("{host} resolved to no addresses"),
        });
    }
    Ok(addrs)
}

async fn read_tls_file(path: &Path) -> Result<Vec<u8>, VaultError> {
    tokio::fs::read(path)
        .await
        .map_err(|e| VaultError::Tls(format!("failed to read {}: {e}", path.display())))
}

async fn load_certificates(path: &Path) -> Result<Vec<Certificate>, VaultError> {
    let pem = read_tls_file(path).await?;
    let certs = Certificate::from_pem_bundle(&pem)
        .map_err(|e| VaultError::Tls(format!("invalid certificate {}: {e}", path.display())))?;
    if certs.is_empty() {
        return Err(VaultError::Tls(format!(
            "no certificates found in {}",
            path.display()
        )));
    }
    Ok(certs)
}

/// `*.pem` and `*.crt` files in a CA directory, sorted
async fn certificate_files(dir: &Path) -> Result<Vec<std::path::PathBuf>, VaultError> {
    let tls_error =
        |e: std::io::Error| VaultError::Tls(format!("failed to read {}: {e}", dir.display()));

    let mut entries = tokio::fs::read_dir(dir).await.map_err(tls_error)?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(tls_error)? {
        let path = entry.path();
        let is_cert = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| matches!(ext, "pem" | "crt"));
        if is_cert && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
