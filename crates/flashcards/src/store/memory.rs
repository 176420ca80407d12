use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

use super::MemoryStore;
use crate::errors::{StoreError, StoreResult};
use crate::models::memory::Memory;

/// The default location of the memory file, under the platform data directory
pub fn default_memory_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("flashcards"))
        .unwrap_or_else(|| PathBuf::from(".flashcards"))
        .join("memory.json")
}

/// Memory persisted as a small JSON file, read on every access
#[derive(Debug)]
pub struct FileMemoryStore {
    path: PathBuf,
    // Serializes writers within this process
    lock: RwLock<()>,
}

impl FileMemoryStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> StoreResult<Memory> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| StoreError::Backend(format!("corrupt memory file: {}", e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Memory::default()),
            Err(e) => Err(StoreError::Backend(e.to_string())),
        }
    }
}

#[async_trait]
impl MemoryStore for FileMemoryStore {
    async fn get(&self) -> StoreResult<Memory> {
        let _guard = self.lock.read().await;
        self.read().await
    }

    async fn update(&self, content: &str) -> StoreResult<Memory> {
        let _guard = self.lock.write().await;
        let memory = Memory {
            content: content.trim().to_string(),
            updated_at: Utc::now(),
        };

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        let raw = serde_json::to_string_pretty(&memory)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        tokio::fs::write(&self.path, raw)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        debug!(path = %self.path.display(), chars = memory.content.len(), "memory updated");
        Ok(memory)
    }
}

/// Memory kept only for the life of the process
#[derive(Debug, Default)]
pub struct InMemoryMemoryStore {
    memory: RwLock<Memory>,
}

impl InMemoryMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemoryStore for InMemoryMemoryStore {
    async fn get(&self) -> StoreResult<Memory> {
        Ok(self.memory.read().await.clone())
    }

    async fn update(&self, content: &str) -> StoreResult<Memory> {
        let mut memory = self.memory.write().await;
        *memory = Memory {
            content: content.trim().to_string(),
            updated_at: Utc::now(),
        };
        Ok(memory.clone())
    }
}
