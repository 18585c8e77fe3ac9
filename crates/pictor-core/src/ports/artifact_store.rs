//! ArtifactStore port - 画像ペイロードとメタデータインデックス
//!
//! # 実装
//! - **LocalArtifactStore**: ディレクトリ + `metadata.json`（本番用）
//! - **InMemoryArtifactStore**: テスト用

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{ArtifactId, ArtifactRecord, StoreError};

/// ArtifactStore はペイロードを保存し、追記専用のインデックスに記録する
///
/// # 設計原則
/// - ペイロードを先に書き、成功した場合だけインデックスに追記する
///   （書けていないペイロードのメタデータは残さない）
/// - インデックス追記に失敗してもペイロードは消さない
/// - レコードは古い順に並び、変更・削除しない
/// - ID は呼び出し側が IdGenerator で生成して渡す
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// ペイロードを `id` で保存し、インデックスに追記したレコードを返す
    async fn save(
        &self,
        id: ArtifactId,
        created_at: DateTime<Utc>,
        payload: &[u8],
        prompt: &str,
    ) -> Result<ArtifactRecord, StoreError>;

    /// 保存済みペイロードを読み込む（なければ StoreError::NotFound）
    async fn load(&self, id: &ArtifactId) -> Result<Vec<u8>, StoreError>;

    /// 直近 `limit` 件（古い順 = 保存順、最新が末尾）
    ///
    /// インデックスが空・未作成なら空の Vec を返す。
    async fn list_recent(&self, limit: usize) -> Result<Vec<ArtifactRecord>, StoreError>;
}
