//! Persisted session credentials.
//!
//! Access token, refresh token and the serialized admin profile live in one
//! JSON document so that storing and clearing are atomic. The auth service
//! is the only writer; the HTTP adapter reads tokens and writes rotated
//! pairs during refresh.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{ApiError, Result};
use crate::models::UserProfile;

/// Credential material persisted between application runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCredentials {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserProfile,
}

/// Storage backend for session credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self) -> Result<Option<StoredCredentials>>;
    async fn store(&self, credentials: &StoredCredentials) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

/// File-backed store, the default for the dashboard binary.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<StoredCredentials>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(ApiError::Storage(err.to_string())),
        };

        let credentials =
            serde_json::from_str(&content).map_err(|err| ApiError::Storage(err.to_string()))?;
        Ok(Some(credentials))
    }

    async fn store(&self, credentials: &StoredCredentials) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|err| ApiError::Storage(err.to_string()))?;
            }
        }

        let payload = serde_json::to_string_pretty(credentials)
            .map_err(|err| ApiError::Storage(err.to_string()))?;
        tokio::fs::write(&self.path, payload)
            .await
            .map_err(|err| ApiError::Storage(err.to_string()))
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(ApiError::Storage(err.to_string())),
        }
    }
}

/// In-memory store for tests and embedded use.
#[derive(Default)]
pub struct MemoryCredentialStore {
    inner: RwLock<Option<StoredCredentials>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Result<Option<StoredCredentials>> {
        Ok(self.inner.read().await.clone())
    }

    async fn store(&self, credentials: &StoredCredentials) -> Result<()> {
        *self.inner.write().await = Some(credentials.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.inner.write().await = None;
        Ok(())
    }
}
