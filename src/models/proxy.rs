use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::TryOnError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TryOnProxyRequest {
    #[serde(default)]
    pub person_base64: Option<String>,
    #[serde(default)]
    pub garment_base64: Option<String>,
}

impl TryOnProxyRequest {
    pub fn new(person_base64: impl Into<String>, garment_base64: impl Into<String>) -> Self {
        Self {
            person_base64: Some(person_base64.into()),
            garment_base64: Some(garment_base64.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TryOnProxyResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_image: Option<String>,
    #[serde(default, rename = "fileID", skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl TryOnProxyResponse {
    pub fn image(result_image: impl Into<String>) -> Self {
        Self {
            success: true,
            result_image: Some(result_image.into()),
            file_id: None,
            error: None,
            details: None,
        }
    }

    pub fn stored(temp_url: impl Into<String>, file_id: impl Into<String>) -> Self {
        Self {
            file_id: Some(file_id.into()),
            ..Self::image(temp_url)
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result_image: None,
            file_id: None,
            error: Some(error.into()),
            details: None,
        }
    }

    pub fn failed(err: &TryOnError) -> Self {
        Self {
            details: Some(json!({
                "kind": err.kind(),
                "retryable": err.is_retryable(),
                "message": err.to_string(),
            })),
            ..Self::rejected(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_response_uses_file_id_key() {
        let json = serde_json::to_value(TryOnProxyResponse::stored("https://cdn/x.jpg", "blob-1"))
            .unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["resultImage"], "https://cdn/x.jpg");
        assert_eq!(json["fileID"], "blob-1");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn failure_carries_details() {
        let err = TryOnError::generation("volcengine", "quota exceeded");
        let json = serde_json::to_value(TryOnProxyResponse::failed(&err)).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "volcengine generation error: quota exceeded");
        assert_eq!(json["details"]["kind"], "generation");
        assert!(json.get("resultImage").is_none());
    }

    #[test]
    fn request_accepts_missing_fields() {
        let request: TryOnProxyRequest =
            serde_json::from_str(r#"{"personBase64": "data:image/png;base64,AAAA"}"#).unwrap();
        assert!(request.person_base64.is_some());
        assert!(request.garment_base64.is_none());
    }
}
