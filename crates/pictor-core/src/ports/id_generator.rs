//! IdGenerator port - ID 生成の抽象化
//!
//! 秒単位の時刻だけでファイル名を作ると、同じ秒の保存同士が衝突して
//! 後の保存が前のペイロードを上書きしてしまいます。
//! ID 生成を trait として切り出し、ArtifactStore::save に明示的に渡します。
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）

use crate::domain::ids::ArtifactId;
use crate::ports::Clock;
use chrono::{DateTime, Utc};
use ulid::Ulid;

/// IdGenerator は保存用の一意な ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数タスクから使える）
pub trait IdGenerator: Send + Sync {
    /// `created_at` 時刻の Artifact ID を生成
    fn generate_artifact_id(&self, created_at: DateTime<Utc>) -> ArtifactId;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使って ULID の timestamp 部分を決めます。
/// これにより、テスト時に FixedClock を使って timestamp 部分を固定できます。
/// ランダム部分（80-bit）は毎回異なります。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    /// 新しい UlidGenerator を作成
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_artifact_id(&self, created_at: DateTime<Utc>) -> ArtifactId {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        ArtifactId::from_parts(created_at, ulid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::TimeZone;

    #[test]
    fn ulid_generator_generates_unique_ids() {
        let id_gen = UlidGenerator::new(SystemClock);
        let now = Utc::now();

        let id1 = id_gen.generate_artifact_id(now);
        let id2 = id_gen.generate_artifact_id(now);
        let id3 = id_gen.generate_artifact_id(now);

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn ulid_generator_with_fixed_clock_differs_only_in_random_part() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(FixedClock::new(fixed_time));

        let id1 = id_gen.generate_artifact_id(fixed_time);
        let id2 = id_gen.generate_artifact_id(fixed_time);

        // FixedClock を使っても、ランダム部分があるので ID は異なる
        assert_ne!(id1, id2);

        // ただし、timestamp 部分（ファイル名の先頭と ULID の先頭 10 文字）は同じ
        let prefix = "image_20240101_120000_";
        assert!(id1.as_str().starts_with(prefix));
        assert!(id2.as_str().starts_with(prefix));
        assert_eq!(
            id1.as_str()[prefix.len()..prefix.len() + 10],
            id2.as_str()[prefix.len()..prefix.len() + 10]
        );
    }
}
