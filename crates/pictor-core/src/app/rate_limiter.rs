//! RateLimiter - 永続化されたローリングウィンドウによる流量制限
//!
//! # 学習ポイント
//! - check と commit の分離（失敗したリクエストは枠を消費しない）
//! - RAII ガード（Reservation）による枠の自動解放
//! - ロックは状態の読み書きの間だけ（ネットワーク呼び出しをまたがない）
//!
//! # 排他の設計
//! - `state_lock`（tokio::sync::Mutex）: 永続化状態の read-modify-write を直列化
//! - `in_flight`（std::sync::Mutex）: 受理済み・未確定の件数。`.await` をまたいで保持しない
//!
//! check 時に `count + in_flight < max` を判定して in_flight を増やすので、
//! 同時に複数の呼び出しが check を通過しても上限を超えて受理されることはない。

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::{RateWindow, StateError};
use crate::observability::QuotaStatus;
use crate::ports::{Clock, StateStore};

/// 上限件数とウィンドウ幅
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePolicy {
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RatePolicy {
    /// 1 時間あたり 10 件
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_secs(3600),
        }
    }
}

/// check_and_reserve の結果
#[must_use = "a granted admission must be committed or dropped"]
pub enum Admission<'a> {
    Granted(Reservation<'a>),
    /// `retry_after` は現在のウィンドウが失効するまでの時間（上限の目安）
    Denied { retry_after: Duration },
}

impl<'a> Admission<'a> {
    pub fn is_granted(&self) -> bool {
        matches!(self, Admission::Granted(_))
    }

    pub fn into_reservation(self) -> Option<Reservation<'a>> {
        match self {
            Admission::Granted(reservation) => Some(reservation),
            Admission::Denied { .. } => None,
        }
    }
}

/// Reservation は受理済み・未確定の 1 枠
///
/// - `commit()` で永続化カウントに加算して枠を確定
/// - commit せずに drop されると枠を返すだけ（永続化カウントは変わらない）
pub struct Reservation<'a> {
    limiter: &'a RateLimiter,
    settled: bool,
}

impl Reservation<'_> {
    /// 成功したリクエストとして枠を確定する
    ///
    /// 永続化に失敗しても枠（in_flight）は解放される。
    pub async fn commit(mut self) -> Result<RateWindow, StateError> {
        let result = self.limiter.commit_inner(true).await;
        self.settled = true;
        result
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::debug!("reservation released without commit");
            self.limiter.release_slot();
        }
    }
}

impl std::fmt::Debug for Reservation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reservation")
            .field("settled", &self.settled)
            .finish()
    }
}

pub struct RateLimiter {
    store: Arc<dyn StateStore>,
    clock: Arc<dyn Clock>,
    policy: RatePolicy,
    state_lock: tokio::sync::Mutex<()>,
    in_flight: Mutex<u32>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn StateStore>, clock: Arc<dyn Clock>, policy: RatePolicy) -> Self {
        Self {
            store,
            clock,
            policy,
            state_lock: tokio::sync::Mutex::new(()),
            in_flight: Mutex::new(0),
        }
    }

    pub fn policy(&self) -> RatePolicy {
        self.policy
    }

    /// 1 件受理できるか判定し、できるなら枠を予約する
    ///
    /// - 状態がない・失効している → 新しいウィンドウ（count = 0）として判定
    /// - 状態が読めない・壊れている → 状態なしとして扱う（可用性を優先）
    pub async fn check_and_reserve(&self) -> Admission<'_> {
        let _guard = self.state_lock.lock().await;
        let now = self.clock.now();
        let window = RateWindow::current(self.read_state().await, now, self.policy.window);

        let mut in_flight = self.lock_in_flight();
        if window.count.saturating_add(*in_flight) < self.policy.max_requests {
            *in_flight += 1;
            tracing::debug!(
                count = window.count,
                in_flight = *in_flight,
                limit = self.policy.max_requests,
                "rate limit slot reserved"
            );
            Admission::Granted(Reservation {
                limiter: self,
                settled: false,
            })
        } else {
            let retry_after = retry_after(&window, now, self.policy.window);
            tracing::info!(
                count = window.count,
                in_flight = *in_flight,
                limit = self.policy.max_requests,
                retry_after_secs = retry_after.as_secs(),
                "rate limit reached"
            );
            Admission::Denied { retry_after }
        }
    }

    /// 現在のウィンドウのカウントを 1 増やして永続化する
    ///
    /// 下流の処理が成功したときだけ呼ぶ。check の後でウィンドウが失効していれば
    /// 新しいウィンドウ（count = 1）を始める。
    pub async fn commit(&self) -> Result<RateWindow, StateError> {
        self.commit_inner(false).await
    }

    /// 現在の利用状況
    pub async fn status(&self) -> QuotaStatus {
        let _guard = self.state_lock.lock().await;
        let now = self.clock.now();
        let active = self
            .read_state()
            .await
            .filter(|w| w.is_active(now, self.policy.window));
        let in_flight = *self.lock_in_flight();
        let used = active.map(|w| w.count).unwrap_or(0);

        QuotaStatus {
            limit: self.policy.max_requests,
            used,
            in_flight,
            remaining: self
                .policy
                .max_requests
                .saturating_sub(used.saturating_add(in_flight)),
            window_started_at: active.map(|w| w.window_start),
            resets_at: active.map(|w| w.expires_at(self.policy.window)),
        }
    }

    async fn commit_inner(&self, release: bool) -> Result<RateWindow, StateError> {
        let _guard = self.state_lock.lock().await;
        let now = self.clock.now();
        let next =
            RateWindow::current(self.read_state().await, now, self.policy.window).incremented();
        let result = self.store.store(&next).await.map(|()| next);
        if release {
            self.release_slot();
        }
        match &result {
            Ok(window) => tracing::debug!(count = window.count, "rate limit slot committed"),
            Err(e) => tracing::warn!(error = %e, "failed to persist rate limit state"),
        }
        result
    }

    async fn read_state(&self) -> Option<RateWindow> {
        match self.store.load().await {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(error = %e, "rate limit state unreadable; starting a fresh window");
                None
            }
        }
    }

    fn release_slot(&self) {
        let mut in_flight = self.lock_in_flight();
        *in_flight = in_flight.saturating_sub(1);
    }

    fn lock_in_flight(&self) -> std::sync::MutexGuard<'_, u32> {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn retry_after(window: &RateWindow, now: DateTime<Utc>, width: Duration) -> Duration {
    window
        .expires_at(width)
        .signed_duration_since(now)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::{InMemoryStateStore, JsonFileStateStore};
    use crate::ports::FixedClock;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn limiter_with(
        store: Arc<dyn StateStore>,
        max_requests: u32,
    ) -> (RateLimiter, FixedClock) {
        let clock = FixedClock::new(start());
        let limiter = RateLimiter::new(
            store,
            Arc::new(clock.clone()),
            RatePolicy {
                max_requests,
                window: Duration::from_secs(3600),
            },
        );
        (limiter, clock)
    }

    #[tokio::test]
    async fn ten_commits_then_eleventh_is_denied() {
        let store = Arc::new(InMemoryStateStore::new());
        let (limiter, _clock) = limiter_with(store.clone(), 10);

        for _ in 0..10 {
            let reservation = limiter.check_and_reserve().await.into_reservation().unwrap();
            reservation.commit().await.unwrap();
        }

        assert!(!limiter.check_and_reserve().await.is_granted());
        assert_eq!(store.snapshot().await.unwrap().count, 10);
    }

    #[tokio::test]
    async fn denied_admission_reports_time_until_reset() {
        let store = Arc::new(InMemoryStateStore::new());
        let (limiter, clock) = limiter_with(store, 1);

        limiter.check_and_reserve().await.into_reservation().unwrap().commit().await.unwrap();
        clock.advance(Duration::from_secs(600));

        match limiter.check_and_reserve().await {
            Admission::Denied { retry_after } => {
                assert_eq!(retry_after, Duration::from_secs(3000));
            }
            Admission::Granted(_) => panic!("expected denial"),
        }
    }

    #[tokio::test]
    async fn window_resets_after_expiry() {
        let store = Arc::new(InMemoryStateStore::new());
        let (limiter, clock) = limiter_with(store.clone(), 2);

        for _ in 0..2 {
            limiter.check_and_reserve().await.into_reservation().unwrap().commit().await.unwrap();
        }
        assert!(!limiter.check_and_reserve().await.is_granted());

        clock.advance(Duration::from_secs(3600));
        let reservation = limiter.check_and_reserve().await.into_reservation().unwrap();
        let window = reservation.commit().await.unwrap();

        // 新しいウィンドウには失効後の 1 件だけ
        assert_eq!(window.count, 1);
        assert_eq!(window.window_start, clock.now());
        assert_eq!(store.snapshot().await, Some(window));
    }

    #[tokio::test]
    async fn dropped_reservation_does_not_consume_a_slot() {
        let store = Arc::new(InMemoryStateStore::new());
        let (limiter, _clock) = limiter_with(store.clone(), 1);

        {
            let _reservation = limiter.check_and_reserve().await.into_reservation().unwrap();
            // 予約中は他の呼び出しを受理しない
            assert!(!limiter.check_and_reserve().await.is_granted());
        }

        assert_eq!(store.snapshot().await, None);
        assert!(limiter.check_and_reserve().await.is_granted());
    }

    #[tokio::test]
    async fn reservations_never_exceed_limit_under_concurrency() {
        let store = Arc::new(InMemoryStateStore::new());
        let (limiter, _clock) = limiter_with(store.clone(), 5);
        let limiter = Arc::new(limiter);

        let mut joins = Vec::new();
        for _ in 0..20 {
            let limiter = Arc::clone(&limiter);
            joins.push(tokio::spawn(async move {
                match limiter.check_and_reserve().await {
                    Admission::Granted(reservation) => {
                        tokio::task::yield_now().await;
                        reservation.commit().await.unwrap();
                        true
                    }
                    Admission::Denied { .. } => false,
                }
            }));
        }

        let mut granted = 0;
        for j in joins {
            if j.await.unwrap() {
                granted += 1;
            }
        }
        assert_eq!(granted, 5);
        assert_eq!(store.snapshot().await.unwrap().count, 5);
    }

    #[tokio::test]
    async fn commit_starts_new_window_if_expired_since_check() {
        let store = Arc::new(InMemoryStateStore::with_window(RateWindow {
            window_start: start(),
            count: 4,
        }));
        let (limiter, clock) = limiter_with(store.clone(), 10);

        let reservation = limiter.check_and_reserve().await.into_reservation().unwrap();
        clock.advance(Duration::from_secs(4000));
        let window = reservation.commit().await.unwrap();

        assert_eq!(window.count, 1);
        assert_eq!(window.window_start, clock.now());
    }

    #[tokio::test]
    async fn corrupt_state_is_treated_as_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let file_store = JsonFileStateStore::in_dir(dir.path());
        std::fs::write(file_store.path(), b"garbage").unwrap();
        let (limiter, _clock) = limiter_with(Arc::new(file_store), 1);

        let reservation = limiter.check_and_reserve().await.into_reservation().unwrap();
        let window = reservation.commit().await.unwrap();
        assert_eq!(window.count, 1);

        // 壊れたファイルは有効な状態で上書きされる
        let reloaded = JsonFileStateStore::in_dir(dir.path()).load().await.unwrap();
        assert_eq!(reloaded, Some(window));
    }

    #[tokio::test]
    async fn out_of_range_timestamp_is_treated_as_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let file_store = JsonFileStateStore::in_dir(dir.path());
        std::fs::write(file_store.path(), br#"{"timestamp": 1e17, "count": 10}"#).unwrap();
        assert!(matches!(file_store.load().await, Err(StateError::Corrupt(_))));

        let (limiter, clock) = limiter_with(Arc::new(file_store), 1);
        let reservation = limiter.check_and_reserve().await.into_reservation().unwrap();
        let window = reservation.commit().await.unwrap();

        assert_eq!(window.count, 1);
        assert_eq!(window.window_start, clock.now());
    }

    #[tokio::test]
    async fn persisted_state_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        {
            let (limiter, _clock) =
                limiter_with(Arc::new(JsonFileStateStore::in_dir(dir.path())), 2);
            for _ in 0..2 {
                limiter.check_and_reserve().await.into_reservation().unwrap().commit().await.unwrap();
            }
        }

        let (limiter, _clock) = limiter_with(Arc::new(JsonFileStateStore::in_dir(dir.path())), 2);
        assert!(!limiter.check_and_reserve().await.is_granted());
    }

    #[tokio::test]
    async fn failed_persist_still_releases_slot() {
        let store = Arc::new(InMemoryStateStore::new());
        let (limiter, _clock) = limiter_with(store.clone(), 1);
        store.fail_writes(true);

        let reservation = limiter.check_and_reserve().await.into_reservation().unwrap();
        assert!(reservation.commit().await.is_err());

        assert_eq!(limiter.status().await.in_flight, 0);
        assert!(limiter.check_and_reserve().await.is_granted());
    }

    #[tokio::test]
    async fn status_reports_usage() {
        let store = Arc::new(InMemoryStateStore::new());
        let (limiter, clock) = limiter_with(store, 10);

        let empty = limiter.status().await;
        assert_eq!(empty.used, 0);
        assert_eq!(empty.remaining, 10);
        assert_eq!(empty.resets_at, None);

        limiter.commit().await.unwrap();
        let _held = limiter.check_and_reserve().await.into_reservation().unwrap();

        let status = limiter.status().await;
        assert_eq!(status.used, 1);
        assert_eq!(status.in_flight, 1);
        assert_eq!(status.remaining, 8);
        assert_eq!(status.window_started_at, Some(clock.now()));
        assert_eq!(
            status.resets_at,
            Some(clock.now() + chrono::TimeDelta::seconds(3600))
        );
    }
}
