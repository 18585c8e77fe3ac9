//! Style table used by the prompt composer.

use serde::Serialize;

/// 既定スタイルのキー（未知のキーはここにフォールバック）
pub const DEFAULT_STYLE_KEY: &str = "기본";

/// StyleAttributes はテンプレートに差し込まれる属性の組
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StyleAttributes {
    pub style: &'static str,
    pub color: &'static str,
    pub lighting: &'static str,
    pub composition: &'static str,
    pub mood: &'static str,
}

/// スタイル定義（名前 + 英語エイリアス + 属性）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StylePreset {
    pub name: &'static str,
    pub alias: &'static str,
    pub attributes: StyleAttributes,
}

/// 固定のスタイルテーブル（表示順 = 定義順）
pub const STYLE_PRESETS: &[StylePreset] = &[
    StylePreset {
        name: "기본",
        alias: "default",
        attributes: StyleAttributes {
            style: "기본",
            color: "밝고 선명한",
            lighting: "자연스러운",
            composition: "균형잡힌",
            mood: "전문적인",
        },
    },
    StylePreset {
        name: "사진",
        alias: "photo",
        attributes: StyleAttributes {
            style: "사진",
            color: "자연스러운",
            lighting: "사진같은",
            composition: "사진적",
            mood: "현실적인",
        },
    },
    StylePreset {
        name: "일러스트레이션",
        alias: "illustration",
        attributes: StyleAttributes {
            style: "일러스트레이션",
            color: "선명하고 밝은",
            lighting: "부드러운",
            composition: "창의적인",
            mood: "친근한",
        },
    },
    StylePreset {
        name: "디지털 아트",
        alias: "digital-art",
        attributes: StyleAttributes {
            style: "디지털 아트",
            color: "강렬하고 현대적인",
            lighting: "극적인",
            composition: "동적인",
            mood: "미래지향적인",
        },
    },
    StylePreset {
        name: "수채화",
        alias: "watercolor",
        attributes: StyleAttributes {
            style: "수채화",
            color: "부드럽고 투명한",
            lighting: "자연스러운",
            composition: "유동적인",
            mood: "시원한",
        },
    },
    StylePreset {
        name: "유화",
        alias: "oil-painting",
        attributes: StyleAttributes {
            style: "유화",
            color: "풍부하고 따뜻한",
            lighting: "극적인",
            composition: "고전적인",
            mood: "우아한",
        },
    },
];

/// キー（名前または英語エイリアス）からスタイルを引く
///
/// 見つからなければ None。フォールバックは呼び出し側（PromptComposer）の責務。
pub fn find_style(key: &str) -> Option<&'static StylePreset> {
    let key = key.trim();
    STYLE_PRESETS
        .iter()
        .find(|preset| preset.name == key || preset.alias.eq_ignore_ascii_case(key))
}

/// 既定スタイル
pub fn default_style() -> &'static StylePreset {
    &STYLE_PRESETS[0]
}
