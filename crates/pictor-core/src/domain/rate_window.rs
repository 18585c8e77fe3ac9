//! RateWindow - ローリングウィンドウの状態
//!
//! 永続化形式は `{"timestamp": <unix 秒 (小数)>, "count": <件数>}`。
//! ウィンドウは「前のウィンドウ失効後の最初のリクエスト」から始まります
//! （固定の時計境界ではない）。

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Duration;

/// RateWindow は 1 つのウィンドウの開始時刻と受理件数
///
/// # 不変条件
/// - count >= 0（u32）
/// - window_start はリセットをまたいで単調非減少
/// - `now - window_start < window` の間だけ有効
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateWindow {
    #[serde(
        rename = "timestamp",
        serialize_with = "serialize_unix_seconds",
        deserialize_with = "deserialize_unix_seconds"
    )]
    pub window_start: DateTime<Utc>,
    pub count: u32,
}

impl RateWindow {
    /// 新しいウィンドウ（件数 0）
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            window_start: now,
            count: 0,
        }
    }

    /// ウィンドウが `now` 時点で有効か
    pub fn is_active(&self, now: DateTime<Utc>, window: Duration) -> bool {
        now.signed_duration_since(self.window_start) < to_delta(window)
    }

    /// ウィンドウが失効する時刻
    pub fn expires_at(&self, window: Duration) -> DateTime<Utc> {
        self.window_start
            .checked_add_signed(to_delta(window))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// 有効なウィンドウならそのまま、失効していれば `now` 開始の新ウィンドウを返す
    pub fn current(state: Option<Self>, now: DateTime<Utc>, window: Duration) -> Self {
        match state {
            Some(w) if w.is_active(now, window) => w,
            _ => Self::fresh(now),
        }
    }

    /// 1 件受理した後の状態
    pub fn incremented(self) -> Self {
        Self {
            count: self.count.saturating_add(1),
            ..self
        }
    }
}

fn to_delta(window: Duration) -> TimeDelta {
    TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX)
}

fn serialize_unix_seconds<S: Serializer>(at: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    let secs = at.timestamp() as f64 + f64::from(at.timestamp_subsec_micros()) / 1_000_000.0;
    s.serialize_f64(secs)
}

fn deserialize_unix_seconds<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
    let secs = f64::deserialize(d)?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(serde::de::Error::custom(format!("invalid timestamp: {secs}")));
    }
    let whole = secs.trunc() as i64;
    let micros = ((secs - secs.trunc()) * 1_000_000.0).round() as i64;
    whole
        .checked_mul(1_000_000)
        .and_then(|m| m.checked_add(micros))
        .and_then(DateTime::from_timestamp_micros)
        .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {secs}")))
}
