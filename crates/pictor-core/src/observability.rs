//! Observability - 読み取り専用のステータスビュー
//!
//! CLI の `quota` や JSON 出力向け。内部状態は公開せず、集計値だけを返す。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Read-only view of the rate limiter, for `quota`-style reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaStatus {
    pub limit: u32,
    /// Committed requests in the active window.
    pub used: u32,
    /// Admitted but not yet committed (or released).
    pub in_flight: u32,
    pub remaining: u32,
    /// `None` when no window is active.
    pub window_started_at: Option<DateTime<Utc>>,
    pub resets_at: Option<DateTime<Utc>>,
}
