//! Downloader port - 生成済み画像の取得
//!
//! # 実装
//! - **HttpDownloader**: HTTP GET（2xx 以外はエラー）

use async_trait::async_trait;

use crate::domain::DownloadError;

/// Downloader は URL からペイロードを取得する
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError>;
}
