//! Errors - エラー型と分類
//!
//! # 方針
//! - ports ごとにエラー型を分ける（StoreError, StateError, ProviderError, DownloadError）
//! - パイプライン全体の失敗は GenerationError にまとめる
//! - ストレージ失敗・リミッタ永続化失敗は GenerationError にしない
//!   （outcome::Warning として成功結果に添える）

use std::time::Duration;

use super::ids::{ArtifactId, InvalidArtifactId};
use super::state::GenerationStage;

/// ErrorKind は呼び出し側が再試行を判断するための分類
///
/// - Transient: 時間をおけば成功しうる（レート制限、タイムアウト、5xx）
/// - Permanent: 入力を変えない限り失敗する（空プロンプト、4xx）
/// - Infrastructure: ローカル環境の障害（ディスクなど）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
    Infrastructure,
}

/// ArtifactStore のエラー
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("artifact not found: {0}")]
    NotFound(ArtifactId),

    #[error(transparent)]
    InvalidId(#[from] InvalidArtifactId),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("metadata index is corrupt: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        StoreError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound(_) | StoreError::InvalidId(_) => ErrorKind::Permanent,
            StoreError::Io { .. } | StoreError::Corrupt(_) => ErrorKind::Infrastructure,
        }
    }
}

/// StateStore（レート制限状態の永続化）のエラー
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("rate limit state I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("rate limit state is corrupt: {0}")]
    Corrupt(String),
}

/// ImageProvider のエラー（理由は不透明、再試行しない）
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Http(String),

    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider response was not understood: {0}")]
    InvalidResponse(String),

    #[error("provider did not answer within {0:?}")]
    Timeout(Duration),
}

impl ProviderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::Status { status, .. } if (400..500).contains(status) && *status != 429 => {
                ErrorKind::Permanent
            }
            ProviderError::InvalidResponse(_) => ErrorKind::Permanent,
            _ => ErrorKind::Transient,
        }
    }
}

/// Downloader のエラー
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("download failed: {0}")]
    Http(String),

    #[error("download failed: HTTP {0}")]
    Status(u16),

    #[error("download did not finish within {0:?}")]
    Timeout(Duration),
}

/// GenerationError はパイプラインを中断させる失敗
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("hourly request limit reached, retry in {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    #[error("prompt composition failed: {0}")]
    Compose(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Download(#[from] DownloadError),
}

impl GenerationError {
    /// 失敗した段階（この段階への遷移で止まった）
    pub fn stage(&self) -> GenerationStage {
        match self {
            GenerationError::InvalidRequest(_) | GenerationError::RateLimited { .. } => {
                GenerationStage::Idle
            }
            GenerationError::Compose(_) => GenerationStage::RateChecked,
            GenerationError::Provider(_) => GenerationStage::Composed,
            GenerationError::Download(_) => GenerationStage::Requested,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            GenerationError::InvalidRequest(_) | GenerationError::Compose(_) => ErrorKind::Permanent,
            GenerationError::RateLimited { .. } | GenerationError::Download(_) => {
                ErrorKind::Transient
            }
            GenerationError::Provider(e) => e.kind(),
        }
    }
}
