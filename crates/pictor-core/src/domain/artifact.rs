//! ArtifactRecord - メタデータインデックスの 1 エントリ
//!
//! インデックス上の形は `{"filename", "prompt", "timestamp"}`。
//! timestamp は RFC 3339 で書き出し、読み込み時は旧形式
//! （`%Y%m%d_%H%M%S`、タイムゾーンなし）も UTC として受け付けます。

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::ids::ArtifactId;

const LEGACY_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// ArtifactRecord は保存済みペイロード 1 件のメタデータ
///
/// - `id` はストア内で一意（= ペイロードのファイル名）
/// - `prompt` は呼び出し側が渡したテキストそのもの（合成後のプロンプトではない）
/// - 作成後に変更・削除されることはない
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    #[serde(rename = "filename")]
    pub id: ArtifactId,
    pub prompt: String,
    #[serde(rename = "timestamp", deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl ArtifactRecord {
    pub fn new(id: ArtifactId, prompt: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            prompt: prompt.into(),
            created_at,
        }
    }

    /// 一覧表示用の短い見出し（`<timestamp> - <prompt 先頭 30 文字>...`）
    pub fn caption(&self) -> String {
        let head: String = self.prompt.chars().take(30).collect();
        let ellipsis = if self.prompt.chars().count() > 30 {
            "..."
        } else {
            ""
        };
        format!(
            "{} - {}{}",
            self.created_at.format(LEGACY_TIMESTAMP_FORMAT),
            head,
            ellipsis
        )
    }
}

fn deserialize_timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(d)?;
    if let Ok(at) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, LEGACY_TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| serde::de::Error::custom(format!("invalid timestamp {raw:?}: {e}")))
}
