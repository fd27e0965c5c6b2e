use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;

use super::{build_http_client, garment_prompt, transport_error, ImageGenerationProvider, TRY_ON_PROMPT};
use crate::{
    codec::{payload_to_data_uri, DataUri, ImageCodec},
    config::{Timeouts, VolcengineConfig},
    error::{Result, TryOnError},
    models::volcengine::{
        GeneratedImage, VolcengineErrorResponse, VolcengineImageRequest, VolcengineImageResponse,
    },
};

const PROVIDER: &str = "volcengine";

/// Seedream over the Ark `images/generations` endpoint.
#[derive(Clone)]
pub struct VolcengineProvider {
    http: reqwest::Client,
    codec: ImageCodec,
    auth: HeaderValue,
    base_url: String,
    model: String,
    timeouts: Timeouts,
}

impl VolcengineProvider {
    pub fn new(config: &VolcengineConfig, timeouts: Timeouts) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| TryOnError::ConfigError("ARK_API_KEY is required".into()))?;

        let auth = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|e| TryOnError::ConfigError(format!("invalid ARK_API_KEY: {}", e)))?;

        let http = build_http_client()?;
        Ok(Self {
            codec: ImageCodec::new(http.clone(), timeouts.fetch),
            http,
            auth,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeouts,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Garment generation without resolving a returned URL.
    pub async fn request_garment(&self, prompt: &str) -> Result<GeneratedImage> {
        let body = VolcengineImageRequest::new(&self.model, garment_prompt(prompt));
        self.submit(&body, self.timeouts.garment).await
    }

    /// Try-on composition without resolving a returned URL.
    pub async fn request_try_on(
        &self,
        person_image: &str,
        garment_image: &str,
    ) -> Result<GeneratedImage> {
        let body = VolcengineImageRequest::new(&self.model, TRY_ON_PROMPT).with_images(vec![
            tagged_data_uri(person_image)?,
            tagged_data_uri(garment_image)?,
        ]);
        self.submit(&body, self.timeouts.try_on).await
    }

    /// Turns a response image into a data URI, downloading it when needed.
    pub async fn resolve(&self, image: GeneratedImage) -> Result<String> {
        let mime = image.mime();
        match image {
            GeneratedImage::B64Json(payload) | GeneratedImage::B64Image(payload) => {
                Ok(payload_to_data_uri(&payload, mime))
            }
            GeneratedImage::Url(url) => {
                log::debug!("Volcengine returned a URL, downloading {}", url);
                self.codec.fetch_as_data_uri(&url, mime).await
            }
        }
    }

    async fn submit(
        &self,
        body: &VolcengineImageRequest,
        timeout: Duration,
    ) -> Result<GeneratedImage> {
        let url = format!("{}/images/generations", self.base_url);
        log::info!(
            "Generating image with model: {} ({} input images)",
            self.model,
            body.image.as_ref().map_or(0, Vec::len)
        );

        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, self.auth.clone())
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                log::error!("Volcengine request failed: {}", e);
                transport_error(PROVIDER, timeout, e)
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| transport_error(PROVIDER, timeout, e))?;

        if !status.is_success() {
            let message = error_message(status, &text);
            log::error!("Volcengine API error: {}", message);
            return Err(TryOnError::generation(PROVIDER, message));
        }

        let parsed: VolcengineImageResponse = serde_json::from_str(&text).map_err(|e| {
            TryOnError::generation(PROVIDER, format!("unrecognized response shape: {}", e))
        })?;
        log::debug!("Volcengine response carried {} image entries", parsed.data.len());

        let data = parsed
            .data
            .into_iter()
            .next()
            .ok_or_else(|| TryOnError::generation(PROVIDER, "no image data in response"))?;

        GeneratedImage::from_data(data).ok_or_else(|| {
            TryOnError::generation(
                PROVIDER,
                "invalid response format: none of b64_json, b64_image or url present",
            )
        })
    }
}

#[async_trait]
impl ImageGenerationProvider for VolcengineProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn generate_garment_image(&self, prompt: &str) -> Result<String> {
        let image = self.request_garment(prompt).await?;
        self.resolve(image).await
    }

    async fn generate_try_on_image(&self, person_image: &str, garment_image: &str) -> Result<String> {
        let image = self.request_try_on(person_image, garment_image).await?;
        self.resolve(image).await
    }
}

/// Seedream takes images as data URIs; untagged payloads are declared PNG.
fn tagged_data_uri(image: &str) -> Result<String> {
    let uri = DataUri::from_reference(image)?;
    Ok(payload_to_data_uri(uri.payload, uri.mime))
}

fn error_message(status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<VolcengineErrorResponse>(body)
        .ok()
        .and_then(|envelope| envelope.error)
        .and_then(|error| match (error.code, error.message) {
            (Some(code), Some(message)) => Some(format!("{}: {}", code, message)),
            (None, Some(message)) => Some(message),
            (Some(code), None) => Some(code),
            (None, None) => None,
        });

    match detail {
        Some(detail) => format!("status {}: {}", status.as_u16(), detail),
        None if body.trim().is_empty() => format!("status {}", status.as_u16()),
        None => format!("status {}: {}", status.as_u16(), body.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::bytes_to_data_uri;
    use crate::test_support::should_skip_httpmock;
    use httpmock::{
        Method::{GET, POST},
        MockServer,
    };
    use serde_json::json;

    fn provider(server: &MockServer) -> VolcengineProvider {
        let config = VolcengineConfig::new()
            .with_api_key("ark-test")
            .with_base_url(server.url("/api/v3"))
            .with_model("seedream-test");
        VolcengineProvider::new(&config, Timeouts::uniform(Duration::from_secs(5))).unwrap()
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let err = VolcengineProvider::new(&VolcengineConfig::new(), Timeouts::default())
            .err()
            .unwrap();
        assert!(matches!(err, TryOnError::ConfigError(_)));

        let blank = VolcengineConfig::new().with_api_key("  ");
        assert!(VolcengineProvider::new(&blank, Timeouts::default()).is_err());
    }

    #[test]
    fn untagged_inputs_are_declared_png() {
        assert_eq!(tagged_data_uri("AAAA").unwrap(), "data:image/png;base64,AAAA");
        assert_eq!(
            tagged_data_uri("data:image/jpeg;base64,BBBB").unwrap(),
            "data:image/jpeg;base64,BBBB"
        );
    }

    #[tokio::test]
    async fn data_uri_without_base64_marker_is_rejected_locally() {
        if should_skip_httpmock() {
            return;
        }
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v3/images/generations");
                then.status(200).json_body(json!({"data": [{"b64_json": "X"}]}));
            })
            .await;

        let err = provider(&server)
            .generate_try_on_image("data:image/png,abc", "BBBB")
            .await
            .unwrap_err();

        assert!(matches!(err, TryOnError::FetchError(_)));
        mock.assert_calls(0);
    }

    #[test]
    fn error_message_prefers_error_envelope() {
        let body = r#"{"error":{"code":"InvalidParameter","message":"image too large"}}"#;
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, body),
            "status 400: InvalidParameter: image too large"
        );
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "upstream down"),
            "status 502: upstream down"
        );
    }

    #[tokio::test]
    async fn b64_json_takes_precedence_over_url() {
        if should_skip_httpmock() {
            return;
        }
        let server = MockServer::start_async().await;
        let generate = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/v3/images/generations")
                    .header("authorization", "Bearer ark-test")
                    .body_includes("\"model\":\"seedream-test\"")
                    .body_includes("a denim jacket")
                    .body_includes("\"response_format\":\"b64_json\"");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({"data": [{"b64_json": "X", "url": server.url("/Y.png")}]}));
            })
            .await;
        let download = server
            .mock_async(|when, then| {
                when.method(GET).path("/Y.png");
                then.status(200).body("unused");
            })
            .await;

        let result = provider(&server)
            .generate_garment_image("a denim jacket")
            .await
            .unwrap();

        generate.assert_async().await;
        download.assert_calls(0);
        assert_eq!(result, "data:image/jpeg;base64,X");
    }

    #[tokio::test]
    async fn b64_image_is_tagged_png() {
        if should_skip_httpmock() {
            return;
        }
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v3/images/generations");
                then.status(200)
                    .json_body(json!({"data": [{"b64_image": "Z"}]}));
            })
            .await;

        let result = provider(&server)
            .generate_garment_image("socks")
            .await
            .unwrap();
        assert_eq!(result, "data:image/png;base64,Z");
    }

    #[tokio::test]
    async fn url_only_response_is_downloaded_once() {
        if should_skip_httpmock() {
            return;
        }
        let server = MockServer::start_async().await;
        let image_url = server.url("/results/out.png");
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v3/images/generations");
                then.status(200).json_body(json!({"data": [{"url": image_url}]}));
            })
            .await;
        let download = server
            .mock_async(|when, then| {
                when.method(GET).path("/results/out.png");
                then.status(200).body("composited-bytes");
            })
            .await;

        let result = provider(&server)
            .generate_try_on_image("data:image/png;base64,UA==", "Rw==")
            .await
            .unwrap();

        download.assert_calls(1);
        assert_eq!(result, bytes_to_data_uri(b"composited-bytes", "image/png"));
    }

    #[tokio::test]
    async fn try_on_sends_both_images_as_data_uris() {
        if should_skip_httpmock() {
            return;
        }
        let server = MockServer::start_async().await;
        let generate = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/v3/images/generations")
                    .body_includes("\"image\":[\"data:image/png;base64,UEVSU09O\",\"data:image/png;base64,R0FSTUVOVA==\"]")
                    .body_includes("\"watermark\":false")
                    .body_includes("\"size\":\"2K\"");
                then.status(200).json_body(json!({"data": [{"b64_json": "UkVTVUxU"}]}));
            })
            .await;

        let result = provider(&server)
            .generate_try_on_image("data:image/png;base64,UEVSU09O", "R0FSTUVOVA==")
            .await
            .unwrap();

        generate.assert_async().await;
        assert_eq!(result, "data:image/jpeg;base64,UkVTVUxU");
    }

    #[tokio::test]
    async fn malformed_responses_are_generation_errors() {
        if should_skip_httpmock() {
            return;
        }
        for body in [
            json!({"data": []}),
            json!({"data": [{"size": "2048x2048"}]}),
            json!({"images": ["X"]}),
            json!({"data": "nope"}),
        ] {
            let server = MockServer::start_async().await;
            server
                .mock_async(|when, then| {
                    when.method(POST).path("/api/v3/images/generations");
                    then.status(200).json_body(body.clone());
                })
                .await;

            let err = provider(&server)
                .generate_garment_image("hat")
                .await
                .unwrap_err();
            assert!(
                matches!(err, TryOnError::GenerationError { ref provider, .. } if provider == "volcengine"),
                "unexpected error for {}: {:?}",
                body,
                err
            );
        }
    }

    #[tokio::test]
    async fn api_error_message_is_surfaced() {
        if should_skip_httpmock() {
            return;
        }
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v3/images/generations");
                then.status(401).json_body(json!({
                    "error": {"code": "AuthenticationError", "message": "the API key is invalid"}
                }));
            })
            .await;

        let err = provider(&server)
            .generate_garment_image("scarf")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("the API key is invalid"));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn slow_try_on_is_a_timeout_error() {
        if should_skip_httpmock() {
            return;
        }
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v3/images/generations");
                then.status(200)
                    .delay(Duration::from_secs(3))
                    .json_body(json!({"data": [{"b64_json": "X"}]}));
            })
            .await;

        let config = VolcengineConfig::new()
            .with_api_key("ark-test")
            .with_base_url(server.url("/api/v3"));
        let timeouts = Timeouts {
            try_on: Duration::from_millis(200),
            ..Timeouts::default()
        };
        let provider = VolcengineProvider::new(&config, timeouts).unwrap();

        let err = provider
            .generate_try_on_image("AAAA", "BBBB")
            .await
            .unwrap_err();
        assert!(matches!(err, TryOnError::TimeoutError { .. }));
    }
}
