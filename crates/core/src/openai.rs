use crate::{
    content::{GenerationError, GenerativeBackend},
    round::{ImagePayload, SentenceItem, parse_sentences},
};
use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestMessageContentPartImageArgs,
        ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContentPart,
        CreateChatCompletionRequestArgs, CreateImageRequestArgs, Image, ImageModel,
        ImageResponseFormat, ImageUrlArgs, ResponseFormat,
    },
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

const SENTENCE_FORMAT_INSTRUCTIONS: &str = "You write exercises for an ESL grammar game. \
Reply only with a JSON object of the form \
{\"sentences\": [{\"sentence\": string, \"isCorrect\": boolean}]}.";

/// A [`GenerativeBackend`] for any OpenAI-compatible API.
///
/// Images come from the images endpoint as base64 PNG data; sentences come
/// from a chat completion that receives the image as a data URI and answers
/// in JSON mode.
pub struct OpenAIBackend {
    client: Client<OpenAIConfig>,
    image_model: String,
    text_model: String,
}

impl OpenAIBackend {
    /// Creates a new backend.
    ///
    /// # Arguments
    ///
    /// * `config` - API key and base URL.
    /// * `image_model` - Image model identifier (e.g. "gpt-image-1").
    /// * `text_model` - Vision-capable chat model identifier (e.g. "gpt-4o").
    pub fn new(config: OpenAIConfig, image_model: String, text_model: String) -> Self {
        Self {
            client: Client::with_config(config),
            image_model,
            text_model,
        }
    }

    async fn create_image(&self, scene: &str) -> Result<Option<String>, OpenAIError> {
        let mut args = CreateImageRequestArgs::default();
        args.prompt(scene)
            .model(ImageModel::Other(self.image_model.clone()))
            .n(1);
        if accepts_response_format(&self.image_model) {
            args.response_format(ImageResponseFormat::B64Json);
        }

        let response = self.client.images().create(args.build()?).await?;
        Ok(first_b64_image(&response.data))
    }

    async fn create_sentences(
        &self,
        image: &ImagePayload,
        instructions: &str,
    ) -> Result<Option<String>, OpenAIError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.text_model)
            .response_format(ResponseFormat::JsonObject)
            .messages(vec![
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(SENTENCE_FORMAT_INSTRUCTIONS)
                    .build()?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(vec![
                        ChatCompletionRequestUserMessageContentPart::ImageUrl(
                            ChatCompletionRequestMessageContentPartImageArgs::default()
                                .image_url(ImageUrlArgs::default().url(image.to_data_uri()).build()?)
                                .build()?,
                        ),
                        ChatCompletionRequestUserMessageContentPart::Text(
                            ChatCompletionRequestMessageContentPartTextArgs::default()
                                .text(instructions)
                                .build()?,
                        ),
                    ])
                    .build()?
                    .into(),
            ])
            .build()?;

        let response = self.client.chat().create(request).await?;
        Ok(response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone()))
    }
}

/// gpt-image models always answer with base64 and reject `response_format`.
fn accepts_response_format(model: &str) -> bool {
    !model.starts_with("gpt-image")
}

fn first_b64_image(data: &[Arc<Image>]) -> Option<String> {
    data.first().and_then(|image| match image.as_ref() {
        Image::B64Json { b64_json, .. } => Some(b64_json.to_string()),
        Image::Url { .. } => None,
    })
}

fn require_image(data: Option<String>) -> Result<String, GenerationError> {
    data.ok_or_else(|| {
        GenerationError::ContentUnavailable("images response contained no base64 image".to_string())
    })
}

fn require_content(content: Option<String>) -> Result<String, GenerationError> {
    content.ok_or_else(|| {
        GenerationError::InvalidContentFormat("no content in chat response".to_string())
    })
}

#[async_trait]
impl GenerativeBackend for OpenAIBackend {
    async fn generate_image(&self, scene: &str) -> Result<ImagePayload, GenerationError> {
        let data = self
            .create_image(scene)
            .await
            .map_err(GenerationError::service)
            .and_then(require_image)?;
        debug!(model = %self.image_model, bytes = data.len(), "Image received");
        ImagePayload::new("image/png", data)
    }

    async fn generate_sentences(
        &self,
        image: &ImagePayload,
        instructions: &str,
    ) -> Result<Vec<SentenceItem>, GenerationError> {
        let text = self
            .create_sentences(image, instructions)
            .await
            .map_err(GenerationError::service)
            .and_then(require_content)?;
        parse_sentences(&text)
    }
}
