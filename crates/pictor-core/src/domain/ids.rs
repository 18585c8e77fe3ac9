//! Artifact identifiers.
//!
//! # ULID + 秒単位タイムスタンプ
//! ArtifactId はファイル名そのものです（`image_<YYYYmmdd_HHMMSS>_<ULID>.jpg`）。
//!
//! - 先頭の timestamp は人間が読むためのもの（ls で並べたときに生成順になる）
//! - 一意性は ULID が担保する（同一ミリ秒内でも 80-bit のランダム部が異なる）
//! - 同一ミリ秒・同一ランダム値の衝突確率は 1 ペアあたり約 2^-80
//!
//! ## 外部から渡された ID の検証
//! `load` などで呼び出し側から受け取る ID は、そのままファイルパスに
//! 連結されるため、パス区切り文字や `..` を含むものは拒否します。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// 保存済みペイロードのファイル拡張子
pub const ARTIFACT_EXTENSION: &str = "jpg";

/// ArtifactId は保存済み画像の識別子（= ファイル名）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactId(String);

/// ArtifactId として使えない文字列
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid artifact id: {0:?}")]
pub struct InvalidArtifactId(pub String);

impl ArtifactId {
    /// 時刻と ULID から ID を組み立てる
    pub fn from_parts(created_at: DateTime<Utc>, ulid: Ulid) -> Self {
        Self(format!(
            "image_{}_{}.{}",
            created_at.format("%Y%m%d_%H%M%S"),
            ulid,
            ARTIFACT_EXTENSION
        ))
    }

    /// 文字列を検証して ArtifactId にする
    pub fn parse(value: impl Into<String>) -> Result<Self, InvalidArtifactId> {
        let value = value.into();
        let is_valid = !value.is_empty()
            && value != "."
            && !value.contains("..")
            && !value.contains(['/', '\\', '\0']);
        if is_valid {
            Ok(Self(value))
        } else {
            Err(InvalidArtifactId(value))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ArtifactId {
    type Err = InvalidArtifactId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ArtifactId {
    type Error = InvalidArtifactId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ArtifactId> for String {
    fn from(id: ArtifactId) -> Self {
        id.0
    }
}
