//! Server-side try-on: the request handler that runs next to the API key so
//! clients never hold one.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    codec::{decode_payload, payload_to_data_uri},
    error::{Result, TryOnError},
    models::{GeneratedImage, TryOnProxyRequest, TryOnProxyResponse},
    providers::VolcengineProvider,
    storage::BlobStorageManager,
};

pub struct TryOnProxy {
    provider: Arc<VolcengineProvider>,
    storage: Arc<BlobStorageManager>,
    inline_limit_bytes: usize,
}

impl TryOnProxy {
    pub fn new(
        provider: Arc<VolcengineProvider>,
        storage: Arc<BlobStorageManager>,
        inline_limit_bytes: usize,
    ) -> Self {
        Self {
            provider,
            storage,
            inline_limit_bytes,
        }
    }

    pub fn storage(&self) -> &Arc<BlobStorageManager> {
        &self.storage
    }

    /// Never fails: every error is folded into a `success: false` response.
    pub async fn handle(&self, request: TryOnProxyRequest) -> TryOnProxyResponse {
        let (person, garment) = match (
            present(request.person_base64),
            present(request.garment_base64),
        ) {
            (Some(person), Some(garment)) => (person, garment),
            _ => {
                log::warn!("Rejected try-on request without both images");
                return TryOnProxyResponse::rejected(
                    "missing required parameter: personBase64 or garmentBase64",
                );
            }
        };

        let timer = crate::logger::timer("proxy try-on");
        let outcome = self.run(&person, &garment).await;
        drop(timer);

        match outcome {
            Ok(response) => response,
            Err(err) => {
                log::error!("Try-on proxy failed: {}", err);
                TryOnProxyResponse::failed(&err)
            }
        }
    }

    async fn run(&self, person: &str, garment: &str) -> Result<TryOnProxyResponse> {
        let image = self.provider.request_try_on(person, garment).await?;

        let payload = match image {
            GeneratedImage::Url(url) => return Ok(TryOnProxyResponse::image(url)),
            GeneratedImage::B64Json(ref payload) | GeneratedImage::B64Image(ref payload) => {
                payload
            }
        };

        let bytes = decode_payload(payload)?;
        if payload.len() <= self.inline_limit_bytes {
            return Ok(TryOnProxyResponse::image(payload_to_data_uri(
                payload,
                image.mime(),
            )));
        }
        if !self.storage.serves_public_urls() {
            log::warn!(
                "Result is {} base64 bytes but storage has no public URL, returning it inline",
                payload.len()
            );
            return Ok(TryOnProxyResponse::image(payload_to_data_uri(
                payload,
                image.mime(),
            )));
        }

        let path = format!(
            "tryon_results/{}_{}.{}",
            Utc::now().timestamp_millis(),
            &Uuid::new_v4().simple().to_string()[..9],
            image.extension()
        );
        log::info!("Result is {} bytes, uploading to {}", bytes.len(), path);

        let file_id = self.storage.upload(&path, bytes).await?;
        let temp_url = self.storage.temp_url(&file_id).await.map_err(|e| {
            TryOnError::StorageError(format!("failed to obtain temporary URL: {}", e))
        })?;

        Ok(TryOnProxyResponse::stored(temp_url, file_id))
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
