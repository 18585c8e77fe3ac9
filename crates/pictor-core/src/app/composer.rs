//! PromptComposer - スタイルテンプレート + ユーザー入力 → プロバイダ用プロンプト
//!
//! 純粋関数（状態なし・副作用なし）。同じ入力・同じテンプレートなら常に同じ出力。

use crate::domain::style::{self, StyleAttributes, StylePreset};

/// ユーザー入力の直前に置く区切り
pub const CONTENT_DELIMITER: &str = "\n\n[내용]: ";

/// 既定のシステム指示テンプレート
///
/// `{style}` `{color}` `{lighting}` `{composition}` `{mood}` が置換される。
pub const DEFAULT_SYSTEM_TEMPLATE: &str = "당신은 일러스트레이트 전문가입니다.
AI 학습 데이터셋을 판매하는 웹 사이트에 게시할 일러스트 이미지를 생성해야합니다. 주어질 주제와 키워드의 정보를 이해하고 주제에 어울리는 이미지를 [디자인 기준]에 맞춰 생성합니다.

[디자인 기준]
{style} 스타일의 디지털 일러스트레이션입니다.
색감은 {color} 느낌으로, 조명은 {lighting} 분위기로 표현합니다.
구도는 {composition} 형태를 유지하고, 전체적인 인상은 {mood} 느낌을 줍니다.
기술적인 그래픽의 요소를 사용하고 최소한으로 사용하여 직관적으로 보이게 합니다. 또한 이미지 내 언어(글자, 단어, 문장)은 최대한 사용하지 않습니다.
웹사이트에 게시할 때 이미지가 잘릴수 있으니, 태두리에 여백을 많이 넣어주세요.
흰색을 포인트로 사용합니다. 전체 그림에서 최대 2%정도만 사용합니다.

-------------------
- 다음 내용을 참고해서 관련된 썸네일을 생성하세요:";

/// PromptComposer はテンプレートを保持し、スタイルとユーザー入力を合成する
///
/// # 使用例
/// ```ignore
/// let composer = PromptComposer::new();
/// let prompt = composer.compose("수채화", "바다 위의 등대");
/// ```
#[derive(Debug, Clone)]
pub struct PromptComposer {
    template: String,
}

impl PromptComposer {
    pub fn new() -> Self {
        Self::with_template(DEFAULT_SYSTEM_TEMPLATE)
    }

    /// 独自のシステム指示を使う（含まれないプレースホルダは無視される）
    pub fn with_template(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// スタイルキーを解決する（未知のキーは既定スタイル）
    pub fn resolve_style(&self, style_key: &str) -> &'static StylePreset {
        style::find_style(style_key).unwrap_or_else(|| {
            tracing::debug!(style_key, "unknown style, using default");
            style::default_style()
        })
    }

    /// `style_key` の属性をテンプレートに差し込み、区切りとユーザー入力を続ける
    pub fn compose(&self, style_key: &str, user_prompt: &str) -> String {
        let preset = self.resolve_style(style_key);
        let mut composed = render(&self.template, &preset.attributes);
        composed.push_str(CONTENT_DELIMITER);
        composed.push_str(user_prompt);
        composed
    }

    /// 使えるスタイル名（テーブル順）
    pub fn styles(&self) -> impl Iterator<Item = &'static StylePreset> {
        style::STYLE_PRESETS.iter()
    }
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::new()
    }
}

fn render(template: &str, attrs: &StyleAttributes) -> String {
    [
        ("{style}", attrs.style),
        ("{color}", attrs.color),
        ("{lighting}", attrs.lighting),
        ("{composition}", attrs.composition),
        ("{mood}", attrs.mood),
    ]
    .iter()
    .fold(template.to_string(), |acc, (placeholder, value)| {
        acc.replace(placeholder, value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn compose_is_deterministic() {
        let composer = PromptComposer::new();
        let a = composer.compose("수채화", "바다 위의 등대");
        let b = composer.compose("수채화", "바다 위의 등대");
        assert_eq!(a, b);
    }

    #[test]
    fn compose_substitutes_attributes_and_appends_content() {
        let composer = PromptComposer::new();
        let prompt = composer.compose("유화", "a cat");

        assert!(prompt.contains("유화 스타일"));
        assert!(prompt.contains("풍부하고 따뜻한"));
        assert!(prompt.contains("우아한"));
        assert!(!prompt.contains("{mood}"));
        assert!(prompt.ends_with("\n\n[내용]: a cat"));
    }

    #[rstest]
    #[case("cubism")]
    #[case("")]
    #[case("기본 ")]
    fn unknown_style_composes_like_default(#[case] key: &str) {
        let composer = PromptComposer::new();
        assert_eq!(
            composer.compose(key, "a cat"),
            composer.compose("기본", "a cat")
        );
    }

    #[test]
    fn alias_composes_like_korean_name() {
        let composer = PromptComposer::new();
        assert_eq!(
            composer.compose("watercolor", "x"),
            composer.compose("수채화", "x")
        );
    }

    #[test]
    fn user_content_is_not_interpreted() {
        let composer = PromptComposer::with_template("[{style}]");
        // ユーザー入力中のプレースホルダは置換しない
        assert_eq!(
            composer.compose("사진", "{mood}"),
            "[사진]\n\n[내용]: {mood}"
        );
    }

    #[test]
    fn custom_template_without_placeholders_is_kept_verbatim() {
        let composer = PromptComposer::with_template("Draw thumbnails.");
        assert_eq!(
            composer.compose("사진", "robots"),
            "Draw thumbnails.\n\n[내용]: robots"
        );
    }

    #[test]
    fn styles_are_listed_in_table_order() {
        let names: Vec<_> = PromptComposer::new().styles().map(|p| p.name).collect();
        assert_eq!(names.first(), Some(&"기본"));
        assert_eq!(names.len(), 6);
    }
}
