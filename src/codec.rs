//! Conversions between image references and the base64 payloads the
//! generation backends accept.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::{Result, TryOnError};

/// A parsed `data:<mime>;base64,<payload>` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataUri<'a> {
    pub mime: &'a str,
    pub payload: &'a str,
}

impl<'a> DataUri<'a> {
    pub fn parse(input: &'a str) -> Option<Self> {
        let rest = input.strip_prefix("data:")?;
        let (header, payload) = rest.split_once(',')?;
        let mime = header.strip_suffix(";base64")?;
        Some(DataUri { mime, payload })
    }

    /// Data URIs must carry a base64 payload; anything else is taken as a
    /// bare base64 PNG.
    pub fn from_reference(reference: &'a str) -> Result<Self> {
        if !is_data_uri(reference) {
            return Ok(DataUri {
                mime: "image/png",
                payload: reference,
            });
        }
        Self::parse(reference).ok_or_else(|| {
            TryOnError::FetchError(
                "malformed data URI, expected data:<mime>;base64,<payload>".into(),
            )
        })
    }
}

pub fn is_data_uri(reference: &str) -> bool {
    reference.starts_with("data:")
}

pub fn bytes_to_data_uri(bytes: &[u8], mime: &str) -> String {
    payload_to_data_uri(&STANDARD.encode(bytes), mime)
}

pub fn payload_to_data_uri(payload: &str, mime: &str) -> String {
    format!("data:{};base64,{}", mime, payload)
}

pub fn decode_payload(payload: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(payload.trim())
        .map_err(|e| TryOnError::SerializationError(format!("invalid base64 payload: {}", e)))
}

#[derive(Clone)]
pub struct ImageCodec {
    http: reqwest::Client,
    fetch_timeout: Duration,
}

impl ImageCodec {
    pub fn new(http: reqwest::Client, fetch_timeout: Duration) -> Self {
        Self {
            http,
            fetch_timeout,
        }
    }

    /// Raw base64 for `reference`, fetching it first when it is a URL.
    pub async fn to_base64_payload(&self, reference: &str) -> Result<String> {
        if is_data_uri(reference) {
            return DataUri::from_reference(reference).map(|uri| uri.payload.to_string());
        }

        let bytes = self.fetch_bytes(reference).await?;
        Ok(STANDARD.encode(bytes))
    }

    pub async fn fetch_as_data_uri(&self, url: &str, mime: &str) -> Result<String> {
        let bytes = self.fetch_bytes(url).await?;
        Ok(bytes_to_data_uri(&bytes, mime))
    }

    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        log::debug!("Fetching image bytes from {}", url);

        let response = self
            .http
            .get(url)
            .timeout(self.fetch_timeout)
            .send()
            .await
            .map_err(|e| {
                log::error!("Image fetch failed for {}: {}", url, e);
                if e.is_timeout() {
                    TryOnError::FetchError(format!(
                        "timed out after {}s fetching {}",
                        self.fetch_timeout.as_secs(),
                        url
                    ))
                } else {
                    TryOnError::FetchError(format!("failed to load image {}: {}", url, e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TryOnError::FetchError(format!(
                "failed to download image {}: status {}",
                url, status
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TryOnError::FetchError(format!("failed to read image body: {}", e)))?;
        Ok(bytes.to_vec())
    }
}
