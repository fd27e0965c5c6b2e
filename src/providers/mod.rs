pub mod gemini;
pub mod selector;
pub mod volcengine;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Result, TryOnError};

pub use gemini::GeminiProvider;
pub use selector::ProviderSelector;
pub use volcengine::VolcengineProvider;

/// A backend able to draw garments and dress people in them.
///
/// Both operations resolve to a single data URI (`data:image/<fmt>;base64,...`).
/// Implementations issue exactly one generation request per call; callers own
/// input validation.
#[async_trait]
pub trait ImageGenerationProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Text-to-image: a product shot of the garment described by `prompt`.
    async fn generate_garment_image(&self, prompt: &str) -> Result<String>;

    /// Composes the garment onto the person. Inputs are base64 payloads or
    /// data URIs; PNG is assumed when untagged.
    async fn generate_try_on_image(&self, person_image: &str, garment_image: &str)
        -> Result<String>;
}

pub(crate) fn garment_prompt(description: &str) -> String {
    format!(
        "Generate a high-quality, photorealistic product photo of a piece of clothing: {}. \
         Lay it flat or show it on a hanger or mannequin against a clean, neutral background. \
         The garment must be clearly visible and centered.",
        description
    )
}

pub(crate) const TRY_ON_PROMPT: &str = "Virtual try-on task. \
Image 1 shows the person; image 2 shows the garment. \
Generate a new photorealistic image of the person from image 1 wearing the garment from image 2.\n\
Requirements:\n\
1. Keep the person's identity, pose and body shape.\n\
2. Fit the garment naturally to the body.\n\
3. High resolution, studio lighting, professional photography quality.\n\
4. Keep lighting and shadows consistent so the result looks real.\n\
5. Return only the generated image.";

/// Maps a transport failure onto the error taxonomy, keeping timeouts distinct.
pub(crate) fn transport_error(provider: &str, timeout: Duration, err: reqwest::Error) -> TryOnError {
    if err.is_timeout() {
        TryOnError::TimeoutError {
            provider: provider.to_string(),
            seconds: timeout.as_secs(),
        }
    } else {
        TryOnError::generation(provider, format!("request failed: {}", err))
    }
}

pub(crate) fn build_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .build()
        .map_err(|e| TryOnError::ConfigError(format!("failed to build HTTP client: {}", e)))
}
