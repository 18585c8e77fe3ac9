//! RateWindow の永続化実装
//!
//! - **JsonFileStateStore**: `{"timestamp": ..., "count": ...}` を JSON ファイルに保存
//! - **InMemoryStateStore**: テスト・開発用

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::fs_util::write_atomic;
use crate::domain::{RateWindow, StateError};
use crate::ports::StateStore;

/// 既定のファイル名
pub const RATE_LIMIT_FILE: &str = "rate_limit.json";

/// JsonFileStateStore は RateWindow を JSON ファイル 1 つに保存する
///
/// # 実装詳細
/// - ファイルがなければ `Ok(None)`
/// - JSON として読めなければ `StateError::Corrupt`
/// - 書き込みは一時ファイル + rename
pub struct JsonFileStateStore {
    path: PathBuf,
}

impl JsonFileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<dir>/rate_limit.json` を使う
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(RATE_LIMIT_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StateStore for JsonFileStateStore {
    async fn load(&self) -> Result<Option<RateWindow>, StateError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StateError::Io(e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StateError::Corrupt(format!("{}: {e}", self.path.display())))
    }

    async fn store(&self, window: &RateWindow) -> Result<(), StateError> {
        let bytes =
            serde_json::to_vec(window).map_err(|e| StateError::Corrupt(e.to_string()))?;
        write_atomic(&self.path, &bytes).await?;
        Ok(())
    }
}

/// InMemoryStateStore はテスト用の StateStore
///
/// `fail_writes` を立てると store が失敗する（永続化失敗の再現用）。
#[derive(Default)]
pub struct InMemoryStateStore {
    window: Mutex<Option<RateWindow>>,
    fail_writes: std::sync::atomic::AtomicBool,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window(window: RateWindow) -> Self {
        Self {
            window: Mutex::new(Some(window)),
            ..Self::default()
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    /// テスト用: 現在保存されている状態
    pub async fn snapshot(&self) -> Option<RateWindow> {
        *self.window.lock().await
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn load(&self) -> Result<Option<RateWindow>, StateError> {
        Ok(*self.window.lock().await)
    }

    async fn store(&self, window: &RateWindow) -> Result<(), StateError> {
        if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(StateError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "writes disabled",
            )));
        }
        *self.window.lock().await = Some(*window);
        Ok(())
    }
}
