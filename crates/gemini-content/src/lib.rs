//! Gemini backend for round generation.
//!
//! Talks to the Gemini REST API (`models/{model}:generateContent`): one call to
//! an image model for the scene picture, then one call to a text model that
//! looks at the picture and answers with a JSON list of labelled sentences
//! constrained by a response schema.

pub mod types;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use thereis_core::{
    GenerationError, GenerativeBackend, ImagePayload, SentenceItem, round::parse_sentences,
};
use tracing::{debug, warn};
use types::{
    Content, ErrorEnvelope, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    Part, ResponseModality,
};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";

/// Response schema for the sentence step: an array of `{sentence, isCorrect}` objects.
pub fn sentence_schema() -> serde_json::Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "sentence": {
                    "type": "STRING",
                    "description": "A sentence describing the image using 'There is' or 'There are'."
                },
                "isCorrect": {
                    "type": "BOOLEAN",
                    "description": "A boolean indicating if the sentence is a factually correct description of the image."
                }
            },
            "required": ["sentence", "isCorrect"]
        }
    })
}

pub struct GeminiBackend {
    http: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    image_model: String,
    text_model: String,
}

impl GeminiBackend {
    pub fn new(api_key: SecretString, image_model: String, text_model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            image_model,
            text_model,
        }
    }

    /// Overrides the API root, e.g. for a proxy.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GenerationError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model
        );

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(request)
            .send()
            .await
            .map_err(GenerationError::service)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, model, "Gemini request was rejected");
            return Err(GenerationError::ServiceError(format!(
                "{} returned {}: {}",
                model,
                status,
                error_message(&body)
            )));
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(GenerationError::service)
    }
}

/// Extracts the readable message from an error response body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

fn first_parts(response: &GenerateContentResponse) -> &[Part] {
    response
        .candidates
        .first()
        .and_then(|candidate| candidate.content.as_ref())
        .map(|content| content.parts.as_slice())
        .unwrap_or_default()
}

/// Takes the first inline image of the first candidate.
pub fn extract_image(response: &GenerateContentResponse) -> Result<ImagePayload, GenerationError> {
    match first_parts(response)
        .iter()
        .find_map(|part| part.inline_data.as_ref())
    {
        Some(blob) => ImagePayload::new(blob.mime_type.clone(), blob.data.clone()),
        None => {
            let reason = response
                .prompt_feedback
                .as_ref()
                .and_then(|feedback| feedback.block_reason.clone())
                .or_else(|| {
                    response
                        .candidates
                        .first()
                        .and_then(|candidate| candidate.finish_reason.clone())
                })
                .unwrap_or_else(|| "no inline image data".to_string());
            Err(GenerationError::ContentUnavailable(reason))
        }
    }
}

/// Concatenates the text parts of the first candidate.
pub fn extract_text(response: &GenerateContentResponse) -> Result<String, GenerationError> {
    let text: String = first_parts(response)
        .iter()
        .filter_map(|part| part.text.as_deref())
        .collect();
    if text.trim().is_empty() {
        return Err(GenerationError::InvalidContentFormat(
            "response contained no text".to_string(),
        ));
    }
    Ok(text)
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    async fn generate_image(&self, scene: &str) -> Result<ImagePayload, GenerationError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: None,
                parts: vec![Part::text(scene)],
            }],
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec![ResponseModality::Image]),
                ..Default::default()
            }),
        };

        let response = self.generate_content(&self.image_model, &request).await?;
        let image = extract_image(&response)?;
        debug!(model = %self.image_model, mime_type = %image.mime_type, "Image received");
        Ok(image)
    }

    async fn generate_sentences(
        &self,
        image: &ImagePayload,
        instructions: &str,
    ) -> Result<Vec<SentenceItem>, GenerationError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: None,
                parts: vec![
                    Part::inline(image.mime_type.clone(), image.data.clone()),
                    Part::text(instructions),
                ],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(sentence_schema()),
                ..Default::default()
            }),
        };

        let response = self.generate_content(&self.text_model, &request).await?;
        let text = extract_text(&response)?;
        parse_sentences(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(value: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_image_request_serialization() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: None,
                parts: vec![Part::text("A beach.")],
            }],
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec![ResponseModality::Image]),
                ..Default::default()
            }),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            json!({
                "contents": [{"parts": [{"text": "A beach."}]}],
                "generationConfig": {"responseModalities": ["IMAGE"]}
            })
        );
    }

    #[test]
    fn test_sentence_request_carries_image_and_schema() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: None,
                parts: vec![Part::inline("image/png", "aGVsbG8="), Part::text("Analyze")],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(sentence_schema()),
                ..Default::default()
            }),
        };
        let json = serde_json::to_value(&request).unwrap();
        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[0]["inlineData"]["data"], "aGVsbG8=");
        assert_eq!(parts[1]["text"], "Analyze");
        assert_eq!(
            json["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(
            json["generationConfig"]["responseSchema"]["items"]["required"],
            json!(["sentence", "isCorrect"])
        );
    }

    #[test]
    fn test_extract_image_skips_text_parts() {
        let response = response(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "Here is your picture."},
                        {"inlineData": {"mimeType": "image/png", "data": "aGVsbG8="}}
                    ]
                },
                "finishReason": "STOP"
            }]
        }));
        let image = extract_image(&response).unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.data, "aGVsbG8=");
    }

    #[test]
    fn test_extract_image_without_inline_data() {
        let blocked = response(json!({
            "candidates": [],
            "promptFeedback": {"blockReason": "SAFETY"}
        }));
        assert_eq!(
            extract_image(&blocked).unwrap_err(),
            GenerationError::ContentUnavailable("SAFETY".to_string())
        );

        let text_only = response(json!({
            "candidates": [{"content": {"parts": [{"text": "Sorry"}]}, "finishReason": "STOP"}]
        }));
        assert!(matches!(
            extract_image(&text_only).unwrap_err(),
            GenerationError::ContentUnavailable(_)
        ));
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response = response(json!({
            "candidates": [{"content": {"parts": [
                {"text": "[{\"sentence\": \"There is a dog.\", "},
                {"text": "\"isCorrect\": true}]"}
            ]}}]
        }));
        let text = extract_text(&response).unwrap();
        let sentences = parse_sentences(&text).unwrap();
        assert_eq!(sentences, vec![SentenceItem::new("There is a dog.", true)]);
    }

    #[test]
    fn test_extract_text_from_empty_response() {
        let err = extract_text(&GenerateContentResponse::default()).unwrap_err();
        assert!(matches!(err, GenerationError::InvalidContentFormat(_)));
    }

    #[test]
    fn test_error_message_prefers_api_message() {
        let body = r#"{"error": {"code": 403, "message": "API key not valid.", "status": "PERMISSION_DENIED"}}"#;
        assert_eq!(error_message(body), "API key not valid.");
        assert_eq!(error_message(" Bad Gateway \n"), "Bad Gateway");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_service_error() {
        let backend = GeminiBackend::new(
            SecretString::from("test-key".to_string()),
            DEFAULT_IMAGE_MODEL.to_string(),
            DEFAULT_TEXT_MODEL.to_string(),
        )
        .with_base_url("http://127.0.0.1:9");

        let err = backend.generate_image("A beach.").await.unwrap_err();
        assert!(matches!(err, GenerationError::ServiceError(_)));
    }
}
