use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct VolcengineImageRequest {
    pub model: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Vec<String>>,
    pub size: String,
    pub response_format: String,
    pub watermark: bool,
}

impl VolcengineImageRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            image: None,
            size: "2K".to_string(),
            response_format: "b64_json".to_string(),
            watermark: false,
        }
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.image = Some(images);
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VolcengineImageResponse {
    #[serde(default)]
    pub data: Vec<VolcengineImageData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VolcengineImageData {
    pub url: Option<String>,
    pub b64_json: Option<String>,
    pub b64_image: Option<String>,
    pub size: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VolcengineErrorResponse {
    pub error: Option<VolcengineErrorBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VolcengineErrorBody {
    pub code: Option<String>,
    pub message: Option<String>,
}

/// The one image a Seedream response carries, by envelope field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedImage {
    /// `b64_json`, JPEG encoded.
    B64Json(String),
    /// `b64_image`, PNG encoded.
    B64Image(String),
    Url(String),
}

impl GeneratedImage {
    /// Picks `b64_json`, then `b64_image`, then `url`; empty fields count as absent.
    pub fn from_data(data: VolcengineImageData) -> Option<Self> {
        let present = |field: Option<String>| field.filter(|value| !value.is_empty());
        if let Some(payload) = present(data.b64_json) {
            Some(GeneratedImage::B64Json(payload))
        } else if let Some(payload) = present(data.b64_image) {
            Some(GeneratedImage::B64Image(payload))
        } else {
            present(data.url).map(GeneratedImage::Url)
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            GeneratedImage::B64Json(_) => "image/jpeg",
            GeneratedImage::B64Image(_) | GeneratedImage::Url(_) => "image/png",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            GeneratedImage::B64Json(_) => "jpg",
            GeneratedImage::B64Image(_) | GeneratedImage::Url(_) => "png",
        }
    }
}
