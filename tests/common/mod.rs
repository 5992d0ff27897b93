//! Common test utilities for integration tests
//!
//! Provides rustls setup and an in-process fake Vault server that speaks the
//! KV and kubernetes login endpoints used by the client.

#![allow(dead_code)]

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, put},
    Router,
};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use tempfile::NamedTempFile;
use tokio::net::TcpListener;

static RUSTLS_INIT: Once = Once::new();

/// Token handed out by the fake login endpoint
pub const CLIENT_TOKEN: &str = "s.fake-client-token";

/// Service account JWT accepted by the fake login endpoint
pub const SERVICE_ACCOUNT_JWT: &str = "eyJhbGciOiJSUzI1NiJ9.fake.jwt";

/// Initialize rustls crypto provider for tests
///
/// Uses a `Once` to ensure it's only called once across all tests.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

#[derive(Default)]
struct FakeVaultState {
    kv: Mutex<HashMap<String, Map<String, Value>>>,
    logins: AtomicUsize,
    writes: AtomicUsize,
    last_role: Mutex<Option<String>>,
    last_host: Mutex<Option<String>>,
}

/// Handle to a running fake Vault server
#[derive(Clone)]
pub struct FakeVault {
    pub address: String,
    state: Arc<FakeVaultState>,
}

impl FakeVault {
    /// Bind to an ephemeral port and serve in the background
    pub async fn start() -> Self {
        init_rustls();

        let state = Arc::new(FakeVaultState::default());
        let app = Router::new()
            .route("/v1/auth/kubernetes/login", put(login))
            .route("/v1/{*path}", get(read_path).put(write_path))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake Vault listener");
        let addr = listener.local_addr().expect("Failed to get local address");

        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("fake Vault server failed");
        });

        Self {
            address: format!("http://{addr}"),
            state,
        }
    }

    /// Store data at a path as if written earlier
    pub fn seed(&self, path: &str, data: Value) {
        let Value::Object(map) = data else {
            panic!("seed data must be a JSON object");
        };
        self.state
            .kv
            .lock()
            .unwrap()
            .insert(path.trim_matches('/').to_string(), map);
    }

    /// Data currently stored at a path
    pub fn stored(&self, path: &str) -> Option<Value> {
        self.state
            .kv
            .lock()
            .unwrap()
            .get(path.trim_matches('/'))
            .cloned()
            .map(Value::Object)
    }

    pub fn logins(&self) -> usize {
        self.state.logins.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.state.writes.load(Ordering::SeqCst)
    }

    pub fn last_role(&self) -> Option<String> {
        self.state.last_role.lock().unwrap().clone()
    }

    /// `Host` header of the last KV read
    pub fn last_host(&self) -> Option<String> {
        self.state.last_host.lock().unwrap().clone()
    }
}

/// Address of a server that accepts connections but never answers
pub async fn unresponsive_backend() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind unresponsive listener");
    let addr = listener.local_addr().expect("Failed to get local address");

    tokio::spawn(async move {
        let mut open = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            open.push(stream);
        }
    });

    format!("http://{addr}")
}

/// Write the accepted JWT to a temporary token file
pub fn service_account_token() -> NamedTempFile {
    service_account_token_with(SERVICE_ACCOUNT_JWT)
}

pub fn service_account_token_with(jwt: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create token file");
    writeln!(file, "{jwt}").expect("Failed to write token file");
    file
}

fn vault_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "errors": [message] }))).into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("x-vault-token")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|token| token == CLIENT_TOKEN)
}

async fn login(State(state): State<Arc<FakeVaultState>>, Json(body): Json<Value>) -> Response {
    let jwt = body.get("jwt").and_then(Value::as_str).unwrap_or_default();
    let role = body.get("role").and_then(Value::as_str).unwrap_or_default();
    *state.last_role.lock().unwrap() = Some(role.to_string());

    if jwt != SERVICE_ACCOUNT_JWT || role.is_empty() {
        return vault_error(StatusCode::FORBIDDEN, "permission denied");
    }

    state.logins.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "request_id": "3f9a1c2e",
        "lease_id": "",
        "renewable": false,
        "lease_duration": 0,
        "data": null,
        "warnings": null,
        "auth": {
            "client_token": CLIENT_TOKEN,
            "accessor": "fake-accessor",
            "policies": ["default"],
            "lease_duration": 3600,
            "renewable": true
        }
    }))
    .into_response()
}

async fn read_path(
    State(state): State<Arc<FakeVaultState>>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Response {
    *state.last_host.lock().unwrap() = headers
        .get("host")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if !authorized(&headers) {
        return vault_error(StatusCode::FORBIDDEN, "permission denied");
    }

    match state.kv.lock().unwrap().get(path.trim_matches('/')) {
        Some(data) => Json(json!({
            "request_id": "8d2b7e41",
            "lease_id": "",
            "renewable": false,
            "lease_duration": 2764800,
            "data": data,
            "warnings": null
        }))
        .into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "errors": [] }))).into_response(),
    }
}

async fn write_path(
    State(state): State<Arc<FakeVaultState>>,
    Path(path): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Map<String, Value>>,
) -> Response {
    if !authorized(&headers) {
        return vault_error(StatusCode::FORBIDDEN, "permission denied");
    }

    state.writes.fetch_add(1, Ordering::SeqCst);
    state
        .kv
        .lock()
        .unwrap()
        .insert(path.trim_matches('/').to_string(), body);
    StatusCode::NO_CONTENT.into_response()
}
