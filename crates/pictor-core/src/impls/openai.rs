//! OpenAiImageProvider - OpenAI images API の ImageProvider 実装
//!
//! `POST {base_url}/images/generations` に `{model, prompt, size, quality, n: 1}`
//! を送り、`data[0].url` を返します。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

use crate::domain::{ImageSettings, ProviderError};
use crate::ports::ImageProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
struct GenerationBody<'a> {
    model: &'a str,
    prompt: &'a str,
    size: &'static str,
    quality: &'static str,
    n: u8,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    data: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    url: Option<String>,
}

pub struct OpenAiImageProvider {
    api_key: String,
    http_client: HttpClient,
    base_url: String,
    timeout: Duration,
}

impl OpenAiImageProvider {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Http(e.to_string()))?;
        Ok(Self {
            api_key: api_key.into(),
            http_client,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/images/generations", self.base_url)
    }
}

fn body<'a>(prompt: &'a str, settings: &'a ImageSettings) -> GenerationBody<'a> {
    GenerationBody {
        model: &settings.model,
        prompt,
        size: settings.size.as_str(),
        quality: settings.quality.as_str(),
        n: 1,
    }
}

fn first_url(response: GenerationResponse) -> Result<String, ProviderError> {
    response
        .data
        .into_iter()
        .next()
        .and_then(|image| image.url)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ProviderError::InvalidResponse("response contained no image url".into()))
}

#[async_trait]
impl ImageProvider for OpenAiImageProvider {
    async fn create(&self, prompt: &str, settings: &ImageSettings) -> Result<String, ProviderError> {
        let response = self
            .http_client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body(prompt, settings))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(self.timeout)
                } else {
                    ProviderError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerationResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        first_url(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ImageQuality, ImageSize};

    #[test]
    fn request_body_uses_settings() {
        let settings = ImageSettings {
            model: "dall-e-3".into(),
            size: ImageSize::Portrait,
            quality: ImageQuality::Hd,
        };
        let v = serde_json::to_value(body("draw", &settings)).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "model": "dall-e-3",
                "prompt": "draw",
                "size": "1024x1792",
                "quality": "hd",
                "n": 1
            })
        );
    }

    #[test]
    fn first_url_is_extracted() {
        let parsed: GenerationResponse = serde_json::from_str(
            r#"{"created": 1, "data": [{"url": "https://img/1.png", "revised_prompt": "x"}]}"#,
        )
        .unwrap();
        assert_eq!(first_url(parsed).unwrap(), "https://img/1.png");
    }

    #[test]
    fn missing_url_is_invalid_response() {
        let parsed: GenerationResponse = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert!(matches!(
            first_url(parsed),
            Err(ProviderError::InvalidResponse(_))
        ));

        let parsed: GenerationResponse =
            serde_json::from_str(r#"{"data": [{"b64_json": "AAAA"}]}"#).unwrap();
        assert!(first_url(parsed).is_err());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let provider = OpenAiImageProvider::new("k", Duration::from_secs(1))
            .unwrap()
            .with_base_url("http://localhost:9999/v1/");
        assert_eq!(provider.endpoint(), "http://localhost:9999/v1/images/generations");
    }
}
