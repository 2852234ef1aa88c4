// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Opaque key/value document persistence for the memory ledger.
//!
//! The ledger serializes itself to a single JSON document; backends only move
//! bytes. [`FileDocumentStore`] keeps one file per key and replaces it with an
//! atomic rename. [`InMemoryDocumentStore`] is used when no data directory is
//! configured and in tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use millwright_core::MillwrightError;
use tokio::sync::RwLock;
use tracing::debug;

fn storage_err(e: impl std::error::Error + Send + Sync + 'static) -> MillwrightError {
    MillwrightError::Storage {
        source: Box::new(e),
    }
}

/// Byte-level document persistence keyed by name.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns the stored bytes, or `None` if the key has never been written.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, MillwrightError>;

    /// Replaces the stored bytes for `key`.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), MillwrightError>;

    /// Human-readable location for logs.
    fn describe(&self) -> String;
}

/// Stores each key as a file inside a directory.
#[derive(Debug, Clone)]
pub struct FileDocumentStore {
    dir: PathBuf,
}

impl FileDocumentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, MillwrightError> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), MillwrightError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(storage_err)?;

        let target = self.path_for(key);
        let tmp = self.path_for(&format!("{key}.tmp"));
        tokio::fs::write(&tmp, &bytes).await.map_err(storage_err)?;
        tokio::fs::rename(&tmp, &target)
            .await
            .map_err(storage_err)?;

        debug!(path = %target.display(), bytes = bytes.len(), "document written");
        Ok(())
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

/// Process-local document store. Contents are lost on exit.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    docs: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, MillwrightError> {
        Ok(self.docs.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), MillwrightError> {
        self.docs.write().await.insert(key.to_string(), bytes);
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}
