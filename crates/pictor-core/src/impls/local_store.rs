//! LocalArtifactStore - ディレクトリ + `metadata.json` による ArtifactStore
//!
//! # レイアウト
//! ```text
//! <dir>/
//!   metadata.json          [{"filename", "prompt", "timestamp"}, ...]（古い順）
//!   image_<...>.jpg        ペイロード
//! ```
//!
//! # 学習ポイント
//! - 書き込み順序でクラッシュ時の整合性を保つ（payload → index）
//! - インデックスの read-modify-write は tokio::sync::Mutex で直列化
//! - インデックスの置き換えは一時ファイル + rename
//! - 管理用ファイル（インデックス、状態、一時ファイル、退避ファイル）は ID として扱わない

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use ulid::Ulid;

use super::fs_util::write_atomic;
use super::state_store::RATE_LIMIT_FILE;
use crate::domain::{ArtifactId, ArtifactRecord, InvalidArtifactId, StoreError};
use crate::ports::{ArtifactStore, Clock, SystemClock};

/// メタデータインデックスのファイル名
pub const METADATA_FILE: &str = "metadata.json";

const CORRUPT_MARKER: &str = ".corrupt-";

/// キャッシュディレクトリ内の管理用ファイルか
fn is_bookkeeping_file(name: &str) -> bool {
    name == METADATA_FILE
        || name == RATE_LIMIT_FILE
        || name.ends_with(".tmp")
        || name.contains(CORRUPT_MARKER)
}

pub struct LocalArtifactStore {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
    /// インデックス追記の排他（同一プロセス内の呼び出し同士）
    append_lock: Mutex<()>,
}

impl LocalArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            clock: Arc::new(SystemClock),
            append_lock: Mutex::new(()),
        }
    }

    /// 退避ファイル名に使う時計を差し替える
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    fn payload_path(&self, id: &ArtifactId) -> PathBuf {
        self.dir.join(id.as_str())
    }

    /// インデックスを読む（未作成なら空）
    async fn read_index(&self) -> Result<Vec<ArtifactRecord>, StoreError> {
        let path = self.index_path();
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io("reading metadata index", e)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    /// 追記用にインデックスを読む
    ///
    /// 壊れている場合は `metadata.json.corrupt-<時刻>-<ULID>` に退避して空から始める。
    /// 同じ秒に何度退避しても前の退避ファイルは上書きしない。
    async fn read_index_for_append(&self) -> Result<Vec<ArtifactRecord>, StoreError> {
        match self.read_index().await {
            Err(StoreError::Corrupt(reason)) => {
                let now = self.clock.now();
                let suffix = Ulid::from_parts(now.timestamp_millis().max(0) as u64, rand::random());
                let backup = self.dir.join(format!(
                    "{METADATA_FILE}{CORRUPT_MARKER}{}-{suffix}",
                    now.format("%Y%m%d_%H%M%S")
                ));
                tracing::warn!(
                    reason = %reason,
                    backup = %backup.display(),
                    "metadata index is corrupt; starting a new one"
                );
                tokio::fs::rename(self.index_path(), &backup)
                    .await
                    .map_err(|e| StoreError::io("moving corrupt metadata index aside", e))?;
                Ok(Vec::new())
            }
            other => other,
        }
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn save(
        &self,
        id: ArtifactId,
        created_at: DateTime<Utc>,
        payload: &[u8],
        prompt: &str,
    ) -> Result<ArtifactRecord, StoreError> {
        if is_bookkeeping_file(id.as_str()) {
            return Err(StoreError::InvalidId(InvalidArtifactId(id.as_str().to_string())));
        }

        // 1) ペイロード（失敗したらインデックスには何も残さない）
        let payload_path = self.payload_path(&id);
        write_atomic(&payload_path, payload)
            .await
            .map_err(|e| StoreError::io(format!("writing payload {id}"), e))?;

        // 2) インデックス追記（read-modify-write 全体をロック）
        let record = ArtifactRecord::new(id, prompt, created_at);
        let _guard = self.append_lock.lock().await;
        let mut index = self.read_index_for_append().await?;
        index.push(record.clone());
        let bytes = serde_json::to_vec(&index).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        if let Err(e) = write_atomic(&self.index_path(), &bytes).await {
            // ペイロードは残す（失われない）
            tracing::warn!(
                id = %record.id,
                error = %e,
                "payload written but metadata append failed"
            );
            return Err(StoreError::io("appending metadata index", e));
        }

        tracing::debug!(id = %record.id, bytes = payload.len(), "artifact saved");
        Ok(record)
    }

    async fn load(&self, id: &ArtifactId) -> Result<Vec<u8>, StoreError> {
        if is_bookkeeping_file(id.as_str()) {
            return Err(StoreError::NotFound(id.clone()));
        }
        match tokio::fs::read(self.payload_path(id)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(id.clone()))
            }
            Err(e) => Err(StoreError::io(format!("reading payload {id}"), e)),
        }
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<ArtifactRecord>, StoreError> {
        let mut index = self.read_index().await?;
        let skip = index.len().saturating_sub(limit);
        Ok(index.split_off(skip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::FixedClock;
    use chrono::TimeZone;
    use rstest::rstest;

    fn at(sec: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, sec).unwrap()
    }

    fn id(name: &str) -> ArtifactId {
        ArtifactId::parse(name).unwrap()
    }

    #[tokio::test]
    async fn save_then_load_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path());
        let png = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR".to_vec();

        let record = store.save(id("a.jpg"), at(0), &png, "a cat").await.unwrap();
        assert_eq!(record.prompt, "a cat");
        assert_eq!(store.load(&record.id).await.unwrap(), png);

        let recent = store.list_recent(1).await.unwrap();
        assert_eq!(recent, vec![record]);
    }

    #[tokio::test]
    async fn empty_and_large_payloads_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path());

        let empty = store.save(id("empty.jpg"), at(0), &[], "empty").await.unwrap();
        assert!(store.load(&empty.id).await.unwrap().is_empty());

        let large: Vec<u8> = (0..(3 * 1024 * 1024)).map(|i| (i % 251) as u8).collect();
        let big = store.save(id("big.jpg"), at(1), &large, "big").await.unwrap();
        assert_eq!(store.load(&big.id).await.unwrap(), large);
    }

    #[tokio::test]
    async fn list_recent_on_missing_or_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path().join("never-created"));
        assert!(store.list_recent(5).await.unwrap().is_empty());

        let store = LocalArtifactStore::new(dir.path());
        std::fs::write(dir.path().join(METADATA_FILE), b"").unwrap();
        assert!(store.list_recent(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_recent_keeps_save_order_and_limit() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path());
        for i in 0..7u32 {
            store
                .save(id(&format!("{i}.jpg")), at(i), &[i as u8], &format!("p{i}"))
                .await
                .unwrap();
        }

        let recent = store.list_recent(5).await.unwrap();
        let prompts: Vec<_> = recent.iter().map(|r| r.prompt.as_str()).collect();
        assert_eq!(prompts, vec!["p2", "p3", "p4", "p5", "p6"]);

        assert_eq!(store.list_recent(100).await.unwrap().len(), 7);
        assert!(store.list_recent(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn load_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path());
        let err = store.load(&id("nope.jpg")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(missing) if missing.as_str() == "nope.jpg"));
    }

    #[tokio::test]
    async fn corrupt_index_is_moved_aside_on_save() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path());
        std::fs::write(dir.path().join(METADATA_FILE), b"[{broken").unwrap();

        assert!(matches!(
            store.list_recent(5).await,
            Err(StoreError::Corrupt(_))
        ));

        let record = store.save(id("x.jpg"), at(0), b"x", "after").await.unwrap();
        assert_eq!(store.list_recent(5).await.unwrap(), vec![record]);

        let backups = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".corrupt-"))
            .count();
        assert_eq!(backups, 1);
    }

    #[tokio::test]
    async fn repeated_corruption_in_one_second_keeps_every_backup() {
        let dir = tempfile::tempdir().unwrap();
        let store =
            LocalArtifactStore::new(dir.path()).with_clock(Arc::new(FixedClock::new(at(0))));

        for i in 0..2u32 {
            std::fs::write(dir.path().join(METADATA_FILE), format!("[{{broken {i}")).unwrap();
            store
                .save(id(&format!("r{i}.jpg")), at(0), b"x", "after")
                .await
                .unwrap();
        }

        let mut backups: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.contains(".corrupt-"))
            .collect();
        backups.sort();
        assert_eq!(backups.len(), 2);
        assert!(backups.iter().all(|b| b.starts_with("metadata.json.corrupt-20240301_090000-")));

        let contents: Vec<String> = backups
            .iter()
            .map(|b| std::fs::read_to_string(dir.path().join(b)).unwrap())
            .collect();
        assert!(contents.contains(&"[{broken 0".to_string()));
        assert!(contents.contains(&"[{broken 1".to_string()));
    }

    #[rstest]
    #[case(METADATA_FILE)]
    #[case(RATE_LIMIT_FILE)]
    #[case("image_1.jpg.tmp")]
    #[case("metadata.json.corrupt-20240301_090000-01HZZZZZZZZZZZZZZZZZZZZZZZ")]
    #[tokio::test]
    async fn bookkeeping_files_are_not_artifacts(#[case] name: &str) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path());
        store.save(id("a.jpg"), at(0), b"x", "a").await.unwrap();
        std::fs::write(dir.path().join(name), b"internal").unwrap();

        let err = store.load(&id(name)).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(missing) if missing.as_str() == name));

        let err = store.save(id(name), at(1), b"y", "b").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidId(_)));
        assert_eq!(std::fs::read(dir.path().join(name)).unwrap(), b"internal");
    }

    #[tokio::test]
    async fn payload_write_failure_records_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path());
        // 同名のディレクトリがあるとペイロードの rename が失敗する
        std::fs::create_dir(dir.path().join("blocked.jpg")).unwrap();
        std::fs::write(dir.path().join("blocked.jpg").join("keep"), b"k").unwrap();

        let result = store.save(id("blocked.jpg"), at(0), b"data", "p").await;
        assert!(matches!(result, Err(StoreError::Io { .. })));
        assert!(store.list_recent(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_saves_all_land_in_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalArtifactStore::new(dir.path()));

        let mut joins = Vec::new();
        for i in 0..16u32 {
            let store = Arc::clone(&store);
            joins.push(tokio::spawn(async move {
                store
                    .save(id(&format!("c{i}.jpg")), at(0), &[i as u8], "same second")
                    .await
                    .unwrap()
            }));
        }
        for j in joins {
            j.await.unwrap();
        }

        let all = store.list_recent(usize::MAX).await.unwrap();
        assert_eq!(all.len(), 16);
        for record in &all {
            assert!(store.load(&record.id).await.is_ok());
        }
    }
}
