//! ImageProvider port - 外部の画像生成サービス
//!
//! # 実装
//! - **OpenAiImageProvider**: OpenAI images API

use async_trait::async_trait;

use crate::domain::{ImageSettings, ProviderError};

/// ImageProvider は合成済みプロンプトから画像を生成し、その URL を返す
///
/// # 設計原則
/// - 同期的なリクエスト/レスポンス（1 回の呼び出しで URL まで）
/// - エラーは不透明な理由として返し、内部で再試行しない
/// - タイムアウトは呼び出し側（GenerationOrchestrator）でも掛ける
#[async_trait]
pub trait ImageProvider: Send + Sync {
    async fn create(&self, prompt: &str, settings: &ImageSettings) -> Result<String, ProviderError>;
}
