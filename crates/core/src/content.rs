//! Round Content Generation
//!
//! This module defines how a round of game content is obtained. A
//! [`ContentProvider`] hands out complete rounds; the standard implementation,
//! [`SceneContentProvider`], picks a scene and drives a [`GenerativeBackend`]
//! through its two dependent remote steps: generate an image for the scene,
//! then generate labelled sentences about that image.

use crate::{
    round::{ImagePayload, RoundContent, SentenceItem},
    scene::SceneSelector,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Prompt key for the sentence-generation instructions.
pub const GENERATE_SENTENCES_PROMPT: &str = "generate_sentences";

pub const SERVICE_FAILURE_MESSAGE: &str =
    "Failed to communicate with the AI service. Please check your connection and API key.";
pub const EMPTY_ROUND_MESSAGE: &str = "The AI failed to generate questions. Please try again.";
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred. Please try again later.";

/// Everything that can go wrong while producing a round.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// The image step returned no usable image payload.
    #[error("image generation returned no usable image: {0}")]
    ContentUnavailable(String),
    /// The sentence step returned something other than a non-empty list of sentences.
    #[error("sentence generation returned an invalid format: {0}")]
    InvalidContentFormat(String),
    /// Transport, authentication, timeout, or other remote-service failure.
    #[error("AI service request failed: {0}")]
    ServiceError(String),
    /// A provider reported success but the round had no sentences.
    #[error("the generated round contained no sentences")]
    EmptyRound,
}

impl GenerationError {
    /// Wraps any underlying failure as a `ServiceError`, keeping its cause chain.
    pub fn service(err: impl Into<anyhow::Error>) -> Self {
        Self::ServiceError(format!("{:#}", err.into()))
    }

    /// The message shown to the player. The detailed cause is only logged.
    pub fn display_message(&self) -> &'static str {
        match self {
            Self::EmptyRound => EMPTY_ROUND_MESSAGE,
            Self::ContentUnavailable(_)
            | Self::InvalidContentFormat(_)
            | Self::ServiceError(_) => SERVICE_FAILURE_MESSAGE,
        }
    }
}

/// Supplies complete rounds of game content.
///
/// Implementations hold no state between calls and do not cache: every call
/// produces a fresh round.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentProvider: Send + Sync {
    async fn request_round(&self) -> Result<RoundContent, GenerationError>;
}

/// A remote generative service able to perform both steps of round creation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Generates an image for a natural-language scene description.
    async fn generate_image(&self, scene: &str) -> Result<ImagePayload, GenerationError>;

    /// Generates labelled sentences describing `image`, following `instructions`.
    async fn generate_sentences(
        &self,
        image: &ImagePayload,
        instructions: &str,
    ) -> Result<Vec<SentenceItem>, GenerationError>;
}

/// The standard [`ContentProvider`]: a random scene fed through a backend.
pub struct SceneContentProvider {
    scenes: Arc<dyn SceneSelector>,
    backend: Arc<dyn GenerativeBackend>,
    instructions: String,
}

impl SceneContentProvider {
    /// Creates a provider.
    ///
    /// # Arguments
    ///
    /// * `scenes` - Picks the scene description for each round.
    /// * `backend` - Performs the image and sentence requests.
    /// * `instructions` - The sentence-generation instruction template.
    pub fn new(
        scenes: Arc<dyn SceneSelector>,
        backend: Arc<dyn GenerativeBackend>,
        instructions: String,
    ) -> Self {
        Self {
            scenes,
            backend,
            instructions,
        }
    }
}

#[async_trait]
impl ContentProvider for SceneContentProvider {
    async fn request_round(&self) -> Result<RoundContent, GenerationError> {
        let scene = self.scenes.choose();
        debug!(%scene, "Requesting scene image");

        let image = self.backend.generate_image(&scene).await?;
        info!(mime_type = %image.mime_type, "Scene image generated");

        let sentences = self
            .backend
            .generate_sentences(&image, &self.instructions)
            .await?;
        if sentences.is_empty() {
            return Err(GenerationError::InvalidContentFormat(
                "sentence step returned no sentences".to_string(),
            ));
        }
        info!(count = sentences.len(), "Round sentences generated");

        Ok(RoundContent::new(&image, sentences))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::FixedScene;

    fn sample_image() -> ImagePayload {
        ImagePayload::new("image/png", "aGVsbG8=").unwrap()
    }

    fn provider(backend: MockGenerativeBackend) -> SceneContentProvider {
        SceneContentProvider::new(
            Arc::new(FixedScene("A beach.".to_string())),
            Arc::new(backend),
            "Write sentences.".to_string(),
        )
    }

    #[tokio::test]
    async fn test_request_round_chains_image_into_sentences() {
        let mut backend = MockGenerativeBackend::new();
        backend
            .expect_generate_image()
            .withf(|scene| scene == "A beach.")
            .times(1)
            .returning(|_| Ok(sample_image()));
        backend
            .expect_generate_sentences()
            .withf(|image, instructions| {
                image.mime_type == "image/png" && instructions == "Write sentences."
            })
            .times(1)
            .returning(|_, _| Ok(vec![SentenceItem::new("There is a boat.", true)]));

        let round = provider(backend).request_round().await.unwrap();

        assert_eq!(round.image, "data:image/png;base64,aGVsbG8=");
        assert_eq!(round.sentences.len(), 1);
    }

    #[tokio::test]
    async fn test_image_failure_skips_sentence_step() {
        let mut backend = MockGenerativeBackend::new();
        backend.expect_generate_image().returning(|_| {
            Err(GenerationError::ContentUnavailable("no inline data".to_string()))
        });
        backend.expect_generate_sentences().times(0);

        let err = provider(backend).request_round().await.unwrap_err();
        assert!(matches!(err, GenerationError::ContentUnavailable(_)));
    }

    #[tokio::test]
    async fn test_empty_sentence_list_is_invalid_format() {
        let mut backend = MockGenerativeBackend::new();
        backend
            .expect_generate_image()
            .returning(|_| Ok(sample_image()));
        backend
            .expect_generate_sentences()
            .returning(|_, _| Ok(vec![]));

        let err = provider(backend).request_round().await.unwrap_err();
        assert!(matches!(err, GenerationError::InvalidContentFormat(_)));
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(GenerationError::EmptyRound.display_message(), EMPTY_ROUND_MESSAGE);
        assert_eq!(
            GenerationError::ServiceError("401".into()).display_message(),
            SERVICE_FAILURE_MESSAGE
        );
        assert_eq!(
            GenerationError::InvalidContentFormat("x".into()).display_message(),
            SERVICE_FAILURE_MESSAGE
        );
    }

    #[test]
    fn test_service_error_keeps_cause_chain() {
        let err = anyhow::anyhow!("connection refused").context("image request");
        let wrapped = GenerationError::service(err);
        assert_eq!(
            wrapped,
            GenerationError::ServiceError("image request: connection refused".to_string())
        );
    }
}
