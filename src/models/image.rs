use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageItem {
    pub id: String,
    /// Remote URL or data URI.
    pub url: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_generated: bool,
}

impl ImageItem {
    pub fn preset(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            is_generated: false,
        }
    }

    pub fn uploaded(url: impl Into<String>) -> Self {
        Self {
            id: format!("upload-{}", Uuid::new_v4().simple()),
            url: url.into(),
            is_generated: false,
        }
    }

    pub fn generated(data_uri: impl Into<String>) -> Self {
        Self {
            id: format!("gen-{}", Uuid::new_v4().simple()),
            url: data_uri.into(),
            is_generated: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: String,
    pub person_image: String,
    pub garment_image: String,
    pub result_image: String,
    /// Unix milliseconds.
    pub timestamp: i64,
}

impl HistoryItem {
    pub fn new(
        person_image: impl Into<String>,
        garment_image: impl Into<String>,
        result_image: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            person_image: person_image.into(),
            garment_image: garment_image.into(),
            result_image: result_image.into(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}
