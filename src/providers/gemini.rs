use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderValue;

use super::{build_http_client, garment_prompt, transport_error, ImageGenerationProvider, TRY_ON_PROMPT};
use crate::{
    codec::{payload_to_data_uri, DataUri},
    config::{GeminiConfig, Timeouts},
    error::{Result, TryOnError},
    models::gemini::{GeminiOutcome, GeminiPart, GeminiRequest, GeminiResponse},
};

const PROVIDER: &str = "gemini";

pub struct GeminiProvider {
    http: reqwest::Client,
    api_key: HeaderValue,
    base_url: String,
    model: String,
    timeouts: Timeouts,
}

impl GeminiProvider {
    pub fn new(config: &GeminiConfig, timeouts: Timeouts) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| TryOnError::ConfigError("GEMINI_API_KEY is required".into()))?;

        let api_key = HeaderValue::from_str(api_key)
            .map_err(|e| TryOnError::ConfigError(format!("invalid GEMINI_API_KEY: {}", e)))?;

        Ok(Self {
            http: build_http_client()?,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeouts,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, parts: Vec<GeminiPart>, timeout: Duration) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let request = GeminiRequest::image_only(parts);

        log::info!("Generating image with model: {}", self.model);

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", self.api_key.clone())
            .json(&request)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                log::error!("Gemini request failed: {}", e);
                transport_error(PROVIDER, timeout, e)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .map_err(|e| transport_error(PROVIDER, timeout, e))?;
            log::error!("Gemini API error: status {}, body: {}", status, error_text);
            return Err(TryOnError::generation(
                PROVIDER,
                format!("status {}: {}", status.as_u16(), error_text.trim()),
            ));
        }

        let parsed: GeminiResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                transport_error(PROVIDER, timeout, e)
            } else {
                TryOnError::generation(PROVIDER, format!("unrecognized response shape: {}", e))
            }
        })?;

        match parsed.into_outcome() {
            GeminiOutcome::Image { mime, data } => Ok(payload_to_data_uri(&data, &mime)),
            GeminiOutcome::TextOnly(text) => {
                log::warn!("Gemini answered with text instead of an image: {}", text);
                Err(TryOnError::generation(PROVIDER, "no image data generated"))
            }
            GeminiOutcome::Blocked(reason) => Err(TryOnError::generation(
                PROVIDER,
                format!("no image data generated (blocked: {})", reason),
            )),
            GeminiOutcome::Empty => Err(TryOnError::generation(PROVIDER, "no image data generated")),
        }
    }
}

#[async_trait]
impl ImageGenerationProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn generate_garment_image(&self, prompt: &str) -> Result<String> {
        let parts = vec![GeminiPart::text(garment_prompt(prompt))];
        self.generate(parts, self.timeouts.garment).await
    }

    async fn generate_try_on_image(&self, person_image: &str, garment_image: &str) -> Result<String> {
        let parts = vec![
            inline_part(person_image)?,
            inline_part(garment_image)?,
            GeminiPart::text(TRY_ON_PROMPT),
        ];
        self.generate(parts, self.timeouts.try_on).await
    }
}

fn inline_part(image: &str) -> Result<GeminiPart> {
    let uri = DataUri::from_reference(image)?;
    Ok(GeminiPart::inline(uri.mime, uri.payload))
}
