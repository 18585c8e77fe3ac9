//! OrchestratorBuilder - 設定からの組み立てとワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 既定アダプタと差し替え（テストではフェイクを注入）

use std::sync::Arc;

use crate::app::composer::PromptComposer;
use crate::app::orchestrator::{GenerationOrchestrator, Timeouts};
use crate::app::rate_limiter::{RateLimiter, RatePolicy};
use crate::config::Config;
use crate::domain::{DownloadError, ProviderError};
use crate::impls::{HttpDownloader, JsonFileStateStore, LocalArtifactStore, OpenAiImageProvider};
use crate::ports::{
    ArtifactStore, Clock, Downloader, ImageProvider, StateStore, SystemClock, UlidGenerator,
};

/// BuildError は組み立て時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("OPENAI_API_KEY is not set. Set it in the environment or in .env.")]
    MissingApiKey,

    #[error("image provider could not be created: {0}")]
    Provider(#[from] ProviderError),

    #[error("downloader could not be created: {0}")]
    Downloader(#[from] DownloadError),
}

/// OrchestratorBuilder は Config から GenerationOrchestrator を作る
///
/// # 使用例
/// ```ignore
/// let orchestrator = OrchestratorBuilder::new(Config::from_env()?).build()?;
/// ```
///
/// # Fail-fast 設計
/// - プロバイダを注入していない場合、API キーが無ければ build() が失敗する
/// - 注入していない部品は Config の値で既定アダプタを作る
pub struct OrchestratorBuilder {
    config: Config,
    composer: PromptComposer,
    clock: Arc<dyn Clock>,
    provider: Option<Arc<dyn ImageProvider>>,
    downloader: Option<Arc<dyn Downloader>>,
    artifact_store: Option<Arc<dyn ArtifactStore>>,
    state_store: Option<Arc<dyn StateStore>>,
}

impl OrchestratorBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            composer: PromptComposer::new(),
            clock: Arc::new(SystemClock),
            provider: None,
            downloader: None,
            artifact_store: None,
            state_store: None,
        }
    }

    pub fn composer(mut self, composer: PromptComposer) -> Self {
        self.composer = composer;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn provider(mut self, provider: Arc<dyn ImageProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn downloader(mut self, downloader: Arc<dyn Downloader>) -> Self {
        self.downloader = Some(downloader);
        self
    }

    pub fn artifact_store(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.artifact_store = Some(store);
        self
    }

    pub fn state_store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.state_store = Some(store);
        self
    }

    /// 部品を揃えて GenerationOrchestrator を生成
    ///
    /// # 検証
    /// - provider 未指定かつ API キー未設定 → BuildError::MissingApiKey
    pub fn build(self) -> Result<GenerationOrchestrator, BuildError> {
        let config = self.config;

        let provider: Arc<dyn ImageProvider> = match self.provider {
            Some(provider) => provider,
            None => {
                let key = config
                    .openai_api_key
                    .clone()
                    .ok_or(BuildError::MissingApiKey)?;
                let mut provider = OpenAiImageProvider::new(key, config.provider_timeout())?;
                if let Some(base_url) = &config.openai_base_url {
                    provider = provider.with_base_url(base_url.clone());
                }
                Arc::new(provider)
            }
        };

        let downloader: Arc<dyn Downloader> = match self.downloader {
            Some(downloader) => downloader,
            None => Arc::new(HttpDownloader::new(config.download_timeout())?),
        };

        let artifact_store: Arc<dyn ArtifactStore> = self
            .artifact_store
            .unwrap_or_else(|| {
                Arc::new(LocalArtifactStore::new(&config.cache_dir).with_clock(self.clock.clone()))
            });
        let state_store: Arc<dyn StateStore> = self
            .state_store
            .unwrap_or_else(|| Arc::new(JsonFileStateStore::in_dir(&config.cache_dir)));

        let policy = RatePolicy {
            max_requests: config.rate_limit_requests,
            window: config.rate_limit_window(),
        };
        let limiter = RateLimiter::new(state_store, self.clock.clone(), policy);

        tracing::debug!(
            cache_dir = %config.cache_dir.display(),
            max_requests = policy.max_requests,
            window_secs = policy.window.as_secs(),
            "orchestrator built"
        );

        Ok(GenerationOrchestrator::new(
            self.composer,
            limiter,
            provider,
            downloader,
            artifact_store,
            Arc::new(UlidGenerator::new(self.clock.clone())),
            self.clock,
            config.image_settings(),
            Timeouts {
                provider: config.provider_timeout(),
                download: config.download_timeout(),
            },
        ))
    }
}
