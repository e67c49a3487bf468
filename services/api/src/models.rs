//! REST API Models
//!
//! Response bodies for the REST endpoints, annotated for OpenAPI generation
//! with `utoipa`.

use serde::Serialize;
use thereis_core::{RoundContent, SentenceItem};
use utoipa::ToSchema;

#[derive(Serialize, ToSchema, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Sentence {
    #[schema(example = "There are two cups on the table.")]
    pub sentence: String,
    pub is_correct: bool,
}

/// One generated round: an image as a data URI and its labelled sentences.
#[derive(Serialize, ToSchema, Debug, Clone, PartialEq, Eq)]
pub struct Round {
    #[schema(example = "data:image/png;base64,iVBORw0KGgo=")]
    pub image: String,
    pub sentences: Vec<Sentence>,
}

impl From<SentenceItem> for Sentence {
    fn from(item: SentenceItem) -> Self {
        Self {
            sentence: item.sentence,
            is_correct: item.is_correct,
        }
    }
}

impl From<RoundContent> for Round {
    fn from(round: RoundContent) -> Self {
        Self {
            image: round.image,
            sentences: round.sentences.into_iter().map(Sentence::from).collect(),
        }
    }
}

#[derive(Serialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub message: String,
}
