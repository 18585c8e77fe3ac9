//! StateStore port - レート制限状態（RateWindow）の永続化
//!
//! # 実装
//! - **JsonFileStateStore**: `rate_limit.json`（本番用）
//! - **InMemoryStateStore**: テスト用

use async_trait::async_trait;

use crate::domain::{RateWindow, StateError};

/// StateStore は RateWindow を 1 件だけ保持する get/set ストア
///
/// # 設計原則
/// - 解釈（ウィンドウ失効やカウント判定）は RateLimiter の責務
/// - 読み取り失敗・破損は Err で返す（fresh 扱いにするかは RateLimiter が決める）
/// - read-modify-write の排他は呼び出し側（RateLimiter）が持つ
#[async_trait]
pub trait StateStore: Send + Sync {
    /// 保存済みの状態を取得（未保存なら None）
    async fn load(&self) -> Result<Option<RateWindow>, StateError>;

    /// 状態を上書き保存
    async fn store(&self, window: &RateWindow) -> Result<(), StateError>;
}
