//! Round Content Model
//!
//! The data a single round of the game is played over: one generated image and
//! an ordered list of sentences, each labelled as a true or false description
//! of that image. Values here are produced by a generative backend and are
//! immutable once a round has been composed.

use crate::content::GenerationError;
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

/// A single "There is / There are" sentence and whether it truly describes the image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceItem {
    pub sentence: String,
    pub is_correct: bool,
}

impl SentenceItem {
    pub fn new(sentence: impl Into<String>, is_correct: bool) -> Self {
        Self {
            sentence: sentence.into(),
            is_correct,
        }
    }
}

/// Raw image output of the image-generation step.
///
/// `data` holds the base64-encoded bytes exactly as the backend returned them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: String,
}

impl ImagePayload {
    /// Validates a backend image result.
    ///
    /// Fails with `ContentUnavailable` when the data is empty, is not valid
    /// base64, or is tagged with a non-image content type.
    pub fn new(
        mime_type: impl Into<String>,
        data: impl Into<String>,
    ) -> Result<Self, GenerationError> {
        let mime_type = mime_type.into();
        let data = data.into();

        if !mime_type.starts_with("image/") {
            return Err(GenerationError::ContentUnavailable(format!(
                "unexpected content type '{}'",
                mime_type
            )));
        }
        let decoded = STANDARD.decode(data.as_bytes()).map_err(|e| {
            GenerationError::ContentUnavailable(format!("image data is not valid base64: {}", e))
        })?;
        if decoded.is_empty() {
            return Err(GenerationError::ContentUnavailable(
                "image data was empty".to_string(),
            ));
        }

        Ok(Self { mime_type, data })
    }

    /// Renders the payload as a `data:` URI suitable for an `<img src>`.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// One round of game content: the scene image plus its labelled sentences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundContent {
    /// Encoded image reference, normally a `data:` URI.
    pub image: String,
    pub sentences: Vec<SentenceItem>,
}

impl RoundContent {
    pub fn new(image: &ImagePayload, sentences: Vec<SentenceItem>) -> Self {
        Self {
            image: image.to_data_uri(),
            sentences,
        }
    }

    /// Number of questions in the round, derived from the sentence list.
    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SentenceEnvelope {
    List(Vec<SentenceItem>),
    Wrapped { sentences: Vec<SentenceItem> },
}

/// Parses the JSON text returned by the sentence step.
///
/// Accepts either a bare array of items or an object with a `sentences`
/// array. Any other shape, an empty list, or an item with blank text is an
/// `InvalidContentFormat` error. The number of items and the split between
/// true and false labels are not checked.
pub fn parse_sentences(text: &str) -> Result<Vec<SentenceItem>, GenerationError> {
    let envelope: SentenceEnvelope = serde_json::from_str(text.trim()).map_err(|e| {
        GenerationError::InvalidContentFormat(format!("sentence output is not a valid list: {}", e))
    })?;
    let sentences = match envelope {
        SentenceEnvelope::List(items) => items,
        SentenceEnvelope::Wrapped { sentences } => sentences,
    };

    if sentences.is_empty() {
        return Err(GenerationError::InvalidContentFormat(
            "sentence output was an empty list".to_string(),
        ));
    }
    if let Some(pos) = sentences.iter().position(|s| s.sentence.trim().is_empty()) {
        return Err(GenerationError::InvalidContentFormat(format!(
            "sentence {} has no text",
            pos + 1
        )));
    }

    Ok(sentences)
}
