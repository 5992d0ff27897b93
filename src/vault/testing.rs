//! In-memory doubles for the Vault traits, shared by unit tests.

use super::{Reader, Secret, SecretData, TokenWriter, VaultError, Writer};
use async_trait::async_trait;
use std::sync::Mutex;

type Canned = Result<Option<Secret>, (u16, String)>;

fn replay(canned: &Canned) -> Result<Option<Secret>, VaultError> {
    match canned {
        Ok(secret) => Ok(secret.clone()),
        Err((status, message)) => Err(VaultError::Api {
            status: *status,
            errors: vec![message.clone()],
        }),
    }
}

/// Records every call and answers with canned responses
#[derive(Debug)]
pub(crate) struct MockReadWriter {
    read_response: Canned,
    write_response: Canned,
    reads: Mutex<Vec<String>>,
    writes: Mutex<Vec<(String, SecretData)>>,
}

impl MockReadWriter {
    /// Reads and writes both answer with an empty response
    pub(crate) fn new() -> Self {
        Self {
            read_response: Ok(None),
            write_response: Ok(None),
            reads: Mutex::new(Vec::new()),
            writes: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_read_data(mut self, data: SecretData) -> Self {
        self.read_response = Ok(Some(Secret {
            data: Some(data),
            ..Secret::default()
        }));
        self
    }

    pub(crate) fn with_read_error(mut self, status: u16, message: &str) -> Self {
        self.read_response = Err((status, message.to_string()));
        self
    }

    pub(crate) fn with_write_response(mut self, secret: Secret) -> Self {
        self.write_response = Ok(Some(secret));
        self
    }

    pub(crate) fn with_write_error(mut self, status: u16, message: &str) -> Self {
        self.write_response = Err((status, message.to_string()));
        self
    }

    pub(crate) fn reads(&self) -> Vec<String> {
        self.reads.lock().unwrap().clone()
    }

    pub(crate) fn writes(&self) -> Vec<(String, SecretData)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Reader for MockReadWriter {
    async fn read(&self, path: &str) -> Result<Option<Secret>, VaultError> {
        self.reads.lock().unwrap().push(path.to_string());
        replay(&self.read_response)
    }
}

#[async_trait]
impl Writer for MockReadWriter {
    async fn write(&self, path: &str, data: &SecretData) -> Result<Option<Secret>, VaultError> {
        self.writes
            .lock()
            .unwrap()
            .push((path.to_string(), data.clone()));
        replay(&self.write_response)
    }
}

/// Remembers the last token it was given
#[derive(Debug, Default)]
pub(crate) struct RecordingTokenWriter {
    token: Mutex<Option<String>>,
}

impl RecordingTokenWriter {
    pub(crate) fn token(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }
}

impl TokenWriter for RecordingTokenWriter {
    fn set_token(&self, token: &str) {
        *self.token.lock().unwrap() = Some(token.to_string());
    }
}
