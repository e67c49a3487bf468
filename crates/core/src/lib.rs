//! Core logic for the "There is / There are" grammar quiz.
//!
//! - `round`: the content of a round (image + labelled sentences) and its validation.
//! - `scene`: the pool of scene descriptions rounds are generated from.
//! - `content`: the content-provider and generative-backend contracts.
//! - `openai`: a generative backend for OpenAI-compatible APIs.
//! - `controller`: the per-session game state machine.

pub mod content;
pub mod controller;
pub mod openai;
pub mod round;
pub mod scene;

pub use content::{ContentProvider, GenerationError, GenerativeBackend, SceneContentProvider};
pub use controller::{GameController, Phase, PhaseKind, SessionSnapshot, TransitionError};
pub use round::{ImagePayload, RoundContent, SentenceItem};
