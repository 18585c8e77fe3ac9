//! Generation request and provider settings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 呼び出し側が渡す 1 回分のリクエスト（永続化しない）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub user_prompt: String,
    pub style_key: String,
}

impl GenerationRequest {
    pub fn new(user_prompt: impl Into<String>, style_key: impl Into<String>) -> Self {
        Self {
            user_prompt: user_prompt.into(),
            style_key: style_key.into(),
        }
    }
}

/// 出力サイズ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageSize {
    #[serde(rename = "1024x1024")]
    Square,
    #[serde(rename = "1792x1024")]
    Landscape,
    #[serde(rename = "1024x1792")]
    Portrait,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::Square => "1024x1024",
            ImageSize::Landscape => "1792x1024",
            ImageSize::Portrait => "1024x1792",
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1024x1024" => Ok(ImageSize::Square),
            "1792x1024" => Ok(ImageSize::Landscape),
            "1024x1792" => Ok(ImageSize::Portrait),
            other => Err(format!("unsupported image size: {other}")),
        }
    }
}

/// 品質ティア
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageQuality {
    Standard,
    Hd,
}

impl ImageQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageQuality::Standard => "standard",
            ImageQuality::Hd => "hd",
        }
    }
}

impl fmt::Display for ImageQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(ImageQuality::Standard),
            "hd" => Ok(ImageQuality::Hd),
            other => Err(format!("unsupported image quality: {other}")),
        }
    }
}

/// ImageSettings はプロバイダに渡すモデル・サイズ・品質
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSettings {
    pub model: String,
    pub size: ImageSize,
    pub quality: ImageQuality,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            model: "dall-e-3".to_string(),
            size: ImageSize::Landscape,
            quality: ImageQuality::Standard,
        }
    }
}

impl ImageSettings {
    /// 1 枚あたりの見積もりコスト（USD）
    ///
    /// 実測値ではなく、サイズ × 品質ごとの固定価格表。
    pub fn estimated_cost(&self) -> Cost {
        let usd = match (self.size, self.quality) {
            (ImageSize::Square, ImageQuality::Standard) => 0.040,
            (ImageSize::Square, ImageQuality::Hd) => 0.080,
            (ImageSize::Landscape | ImageSize::Portrait, ImageQuality::Standard) => 0.080,
            (ImageSize::Landscape | ImageSize::Portrait, ImageQuality::Hd) => 0.120,
        };
        Cost::usd(usd)
    }
}

/// Cost は USD 建ての見積もり金額
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Cost {
    pub usd: f64,
}

impl Cost {
    pub fn usd(usd: f64) -> Self {
        Self { usd }
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.3} USD", self.usd)
    }
}
