//! InMemoryArtifactStore - テスト・開発用の ArtifactStore

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::{ArtifactId, ArtifactRecord, StoreError};
use crate::ports::ArtifactStore;

#[derive(Default)]
struct Inner {
    payloads: HashMap<ArtifactId, Vec<u8>>,
    index: Vec<ArtifactRecord>,
}

/// InMemoryArtifactStore はプロセス内だけで完結する ArtifactStore
///
/// `fail_saves` を立てると save が I/O エラーを返す（ディスク障害の再現用）。
#[derive(Default)]
pub struct InMemoryArtifactStore {
    inner: Mutex<Inner>,
    fail_saves: AtomicBool,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.index.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn save(
        &self,
        id: ArtifactId,
        created_at: DateTime<Utc>,
        payload: &[u8],
        prompt: &str,
    ) -> Result<ArtifactRecord, StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::io(
                format!("writing payload {id}"),
                std::io::Error::other("disk full"),
            ));
        }
        let record = ArtifactRecord::new(id, prompt, created_at);
        let mut inner = self.inner.lock().await;
        inner.payloads.insert(record.id.clone(), payload.to_vec());
        inner.index.push(record.clone());
        Ok(record)
    }

    async fn load(&self, id: &ArtifactId) -> Result<Vec<u8>, StoreError> {
        self.inner
            .lock()
            .await
            .payloads
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<ArtifactRecord>, StoreError> {
        let inner = self.inner.lock().await;
        let skip = inner.index.len().saturating_sub(limit);
        Ok(inner.index[skip..].to_vec())
    }
}
