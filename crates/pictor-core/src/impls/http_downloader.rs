//! HttpDownloader - reqwest による Downloader 実装

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;

use crate::domain::DownloadError;
use crate::ports::Downloader;

pub struct HttpDownloader {
    http_client: HttpClient,
    timeout: Duration,
}

impl HttpDownloader {
    pub fn new(timeout: Duration) -> Result<Self, DownloadError> {
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DownloadError::Http(e.to_string()))?;
        Ok(Self::with_client(http_client, timeout))
    }

    /// 設定済みの reqwest::Client を使う（`timeout` はエラー報告用）
    pub fn with_client(http_client: HttpClient, timeout: Duration) -> Self {
        Self {
            http_client,
            timeout,
        }
    }

    fn map_err(&self, e: reqwest::Error) -> DownloadError {
        if e.is_timeout() {
            DownloadError::Timeout(self.timeout)
        } else {
            DownloadError::Http(e.to_string())
        }
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_err(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(|e| self.map_err(e))?;
        Ok(bytes.to_vec())
    }
}
