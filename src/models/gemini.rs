use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
    pub generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<GeminiInlineData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiInlineData {
    #[serde(default)]
    pub mime_type: Option<String>,
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerationConfig {
    pub response_modalities: Vec<String>,
}

impl GeminiPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn inline(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: None,
            inline_data: Some(GeminiInlineData {
                mime_type: Some(mime_type.into()),
                data: data.into(),
            }),
        }
    }

    fn output(&self) -> PartOutput<'_> {
        match (&self.inline_data, &self.text) {
            (Some(inline), _) if !inline.data.is_empty() => PartOutput::Image(inline),
            (_, Some(text)) => PartOutput::Text(text),
            _ => PartOutput::Empty,
        }
    }
}

enum PartOutput<'a> {
    Image(&'a GeminiInlineData),
    Text(&'a str),
    Empty,
}

impl GeminiRequest {
    pub fn image_only(parts: Vec<GeminiPart>) -> Self {
        Self {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config: GeminiGenerationConfig {
                response_modalities: vec!["IMAGE".to_string()],
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    pub prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    pub content: Option<GeminiContent>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiPromptFeedback {
    pub block_reason: Option<String>,
}

/// What the first candidate of a Gemini response amounts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeminiOutcome {
    Image { mime: String, data: String },
    /// The model answered in text only (often a refusal).
    TextOnly(String),
    Blocked(String),
    Empty,
}

impl GeminiResponse {
    pub fn into_outcome(self) -> GeminiOutcome {
        let block_reason = self.prompt_feedback.and_then(|feedback| feedback.block_reason);
        let Some(candidate) = self.candidates.into_iter().next() else {
            return match block_reason {
                Some(reason) => GeminiOutcome::Blocked(reason),
                None => GeminiOutcome::Empty,
            };
        };

        let parts = candidate.content.map(|content| content.parts).unwrap_or_default();
        let mut text = String::new();
        for part in &parts {
            match part.output() {
                PartOutput::Image(inline) => {
                    return GeminiOutcome::Image {
                        mime: inline
                            .mime_type
                            .clone()
                            .unwrap_or_else(|| "image/png".to_string()),
                        data: inline.data.clone(),
                    }
                }
                PartOutput::Text(value) => text.push_str(value),
                PartOutput::Empty => {}
            }
        }

        match (text.is_empty(), candidate.finish_reason) {
            (false, _) => GeminiOutcome::TextOnly(text),
            (true, Some(reason)) if reason != "STOP" => GeminiOutcome::Blocked(reason),
            _ => GeminiOutcome::Empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn outcome(value: serde_json::Value) -> GeminiOutcome {
        serde_json::from_value::<GeminiResponse>(value)
            .unwrap()
            .into_outcome()
    }

    #[test]
    fn request_serializes_in_camel_case() {
        let request = GeminiRequest::image_only(vec![GeminiPart::inline("image/png", "AAAA"), GeminiPart::text("hi")]);
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["generationConfig"]["responseModalities"], json!(["IMAGE"]));
        assert_eq!(body["contents"][0]["parts"][0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(body["contents"][0]["parts"][0]["inlineData"]["data"], "AAAA");
        assert_eq!(body["contents"][0]["parts"][1]["text"], "hi");
        assert!(body["contents"][0]["parts"][1].get("inlineData").is_none());
    }

    #[test]
    fn image_part_is_found_after_text() {
        let result = outcome(json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "Here you go"},
                    {"inlineData": {"mimeType": "image/jpeg", "data": "QUJD"}}
                ]},
                "finishReason": "STOP"
            }]
        }));
        assert_eq!(
            result,
            GeminiOutcome::Image {
                mime: "image/jpeg".into(),
                data: "QUJD".into()
            }
        );
    }

    #[test]
    fn text_only_and_blocked_responses_are_distinguished() {
        assert_eq!(
            outcome(json!({"candidates": [{"content": {"parts": [{"text": "I can't"}]}}]})),
            GeminiOutcome::TextOnly("I can't".into())
        );
        assert_eq!(
            outcome(json!({"promptFeedback": {"blockReason": "SAFETY"}})),
            GeminiOutcome::Blocked("SAFETY".into())
        );
        assert_eq!(
            outcome(json!({"candidates": [{"finishReason": "IMAGE_SAFETY"}]})),
            GeminiOutcome::Blocked("IMAGE_SAFETY".into())
        );
        assert_eq!(outcome(json!({})), GeminiOutcome::Empty);
    }
}
