//! GenerationOrchestrator - 1 リクエスト分の生成パイプライン
//!
//! `Idle → RateChecked → Composed → Requested → Downloaded → Saved → Committed → Done`
//!
//! # 失敗の扱い
//! - 空プロンプト / レート制限 / プロバイダ / ダウンロード → GenerationError で中断
//! - 保存失敗 → 成功として返す（record = None, Warning::StorageFailed）。枠は消費しない
//! - リミッタの永続化失敗 → 成功として返す（Warning::LimiterPersistFailed）
//! - 再試行はしない（必要なら呼び出し側が generate 全体を再試行する）
//!
//! # ロック
//! プロバイダ呼び出しとダウンロードの間はどのロックも持たない。
//! 予約した枠（Reservation）だけを持ち、失敗時は drop で返却する。

use std::sync::Arc;
use std::time::Duration;

use crate::app::composer::PromptComposer;
use crate::app::rate_limiter::{Admission, RateLimiter};
use crate::domain::{
    ArtifactId, ArtifactRecord, DownloadError, GenerationError, GenerationOutcome,
    GenerationRequest, GenerationStage, ImageSettings, ProviderError, StoreError, Warning,
};
use crate::observability::QuotaStatus;
use crate::ports::{ArtifactStore, Clock, Downloader, IdGenerator, ImageProvider};

/// プロバイダ呼び出しとダウンロードの制限時間
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub provider: Duration,
    pub download: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            provider: Duration::from_secs(120),
            download: Duration::from_secs(60),
        }
    }
}

pub struct GenerationOrchestrator {
    composer: PromptComposer,
    limiter: RateLimiter,
    provider: Arc<dyn ImageProvider>,
    downloader: Arc<dyn Downloader>,
    store: Arc<dyn ArtifactStore>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    settings: ImageSettings,
    timeouts: Timeouts,
}

/// 段階遷移をログに残す
fn advance(stage: &mut GenerationStage, next: GenerationStage) {
    tracing::debug!(from = %stage, to = %next, "generation stage");
    *stage = next;
}

impl GenerationOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        composer: PromptComposer,
        limiter: RateLimiter,
        provider: Arc<dyn ImageProvider>,
        downloader: Arc<dyn Downloader>,
        store: Arc<dyn ArtifactStore>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
        settings: ImageSettings,
        timeouts: Timeouts,
    ) -> Self {
        Self {
            composer,
            limiter,
            provider,
            downloader,
            store,
            ids,
            clock,
            settings,
            timeouts,
        }
    }

    pub fn settings(&self) -> &ImageSettings {
        &self.settings
    }

    pub fn composer(&self) -> &PromptComposer {
        &self.composer
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// 1 リクエストを処理する
    pub async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationOutcome, GenerationError> {
        let mut stage = GenerationStage::Idle;

        if request.user_prompt.trim().is_empty() {
            return Err(GenerationError::InvalidRequest("prompt is empty".into()));
        }

        // Idle → RateChecked
        let reservation = match self.limiter.check_and_reserve().await {
            Admission::Granted(reservation) => reservation,
            Admission::Denied { retry_after } => {
                tracing::warn!(retry_after_secs = retry_after.as_secs(), "generation rate limited");
                return Err(GenerationError::RateLimited { retry_after });
            }
        };
        advance(&mut stage, GenerationStage::RateChecked);

        // RateChecked → Composed
        let prompt = self
            .composer
            .compose(&request.style_key, &request.user_prompt);
        advance(&mut stage, GenerationStage::Composed);

        // Composed → Requested
        let url = self.request_image(&prompt).await.inspect_err(|e| {
            tracing::error!(stage = %stage, error = %e, "image provider failed");
        })?;
        advance(&mut stage, GenerationStage::Requested);

        // Requested → Downloaded
        let payload = self.download(&url).await.inspect_err(|e| {
            tracing::error!(stage = %stage, error = %e, "image download failed");
        })?;
        advance(&mut stage, GenerationStage::Downloaded);

        let estimated_cost = self.settings.estimated_cost();
        let mut warnings = Vec::new();

        // Downloaded → Saved → Committed
        // 保存に失敗したら生成結果だけ返し、枠は確定せずに返却する
        let record = match self.save(&payload, &request.user_prompt).await {
            Ok(record) => {
                advance(&mut stage, GenerationStage::Saved);
                match reservation.commit().await {
                    Ok(_) => advance(&mut stage, GenerationStage::Committed),
                    Err(e) => warnings.push(Warning::LimiterPersistFailed(e.to_string())),
                }
                Some(record)
            }
            Err(e) => {
                tracing::warn!(error = %e, "generated image could not be saved; slot released");
                warnings.push(Warning::StorageFailed(e.to_string()));
                drop(reservation);
                None
            }
        };

        advance(&mut stage, GenerationStage::Done);
        tracing::info!(
            id = record.as_ref().map(|r| r.id.as_str()).unwrap_or("-"),
            bytes = payload.len(),
            cost_usd = estimated_cost.usd,
            warnings = warnings.len(),
            "image generated"
        );

        Ok(GenerationOutcome {
            payload,
            record,
            estimated_cost,
            warnings,
        })
    }

    /// 直近 `limit` 件（保存順、最新が末尾）
    pub async fn recent(&self, limit: usize) -> Result<Vec<ArtifactRecord>, StoreError> {
        self.store.list_recent(limit).await
    }

    /// 保存済みペイロードを読む
    pub async fn load(&self, id: &ArtifactId) -> Result<Vec<u8>, StoreError> {
        self.store.load(id).await
    }

    pub async fn quota(&self) -> QuotaStatus {
        self.limiter.status().await
    }

    async fn request_image(&self, prompt: &str) -> Result<String, ProviderError> {
        let limit = self.timeouts.provider;
        tokio::time::timeout(limit, self.provider.create(prompt, &self.settings))
            .await
            .map_err(|_| ProviderError::Timeout(limit))?
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        let limit = self.timeouts.download;
        tokio::time::timeout(limit, self.downloader.fetch(url))
            .await
            .map_err(|_| DownloadError::Timeout(limit))?
    }

    async fn save(&self, payload: &[u8], prompt: &str) -> Result<ArtifactRecord, StoreError> {
        let created_at = self.clock.now();
        let id = self.ids.generate_artifact_id(created_at);
        self.store.save(id, created_at, payload, prompt).await
    }
}
