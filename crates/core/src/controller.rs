//! Game Controller
//!
//! Owns the state of one play session and exposes the transitions the
//! presentation layer drives:
//!
//! ```text
//! Start -> Loading -> Playing <-> ShowingResult -> GameOver
//!             |                                      |
//!             +-> Error --------(start)--------------+--> Loading
//! ```
//!
//! Loading a round is the only asynchronous step. [`GameController::start`]
//! switches to `Loading` and returns a [`RoundRequest`]; whoever drives the
//! controller awaits it and hands the resulting [`RoundOutcome`] back through
//! [`GameController::complete`]. Each request carries the generation number it
//! was issued under, so an outcome that arrives after a newer `start` is
//! discarded instead of overwriting the current session.

use crate::{
    content::{ContentProvider, GenerationError, UNKNOWN_ERROR_MESSAGE},
    round::{RoundContent, SentenceItem},
};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc, time::Duration};
use tracing::{debug, error, info, warn};

/// The named phases of a session, without their data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    Start,
    Loading,
    Playing,
    ShowingResult,
    GameOver,
    Error,
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseKind::Start => write!(f, "start"),
            PhaseKind::Loading => write!(f, "loading"),
            PhaseKind::Playing => write!(f, "playing"),
            PhaseKind::ShowingResult => write!(f, "showing_result"),
            PhaseKind::GameOver => write!(f, "game_over"),
            PhaseKind::Error => write!(f, "error"),
        }
    }
}

/// A loaded round and how far the player has got through it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundProgress {
    pub round: RoundContent,
    /// Always a valid index into `round.sentences`.
    pub question_index: usize,
    /// Correct judgments so far, never more than the number of sentences.
    pub score: usize,
}

impl RoundProgress {
    fn new(round: RoundContent) -> Self {
        Self {
            round,
            question_index: 0,
            score: 0,
        }
    }

    fn current(&self) -> &SentenceItem {
        &self.round.sentences[self.question_index]
    }

    fn is_last_question(&self) -> bool {
        self.question_index + 1 >= self.round.len()
    }
}

/// The full session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Start,
    Loading,
    Playing(RoundProgress),
    ShowingResult {
        progress: RoundProgress,
        last_judgment_correct: bool,
    },
    /// The round is finished; it is kept so the final score can be shown against its length.
    GameOver(RoundProgress),
    Error {
        message: String,
    },
}

impl Phase {
    pub fn kind(&self) -> PhaseKind {
        match self {
            Phase::Start => PhaseKind::Start,
            Phase::Loading => PhaseKind::Loading,
            Phase::Playing(_) => PhaseKind::Playing,
            Phase::ShowingResult { .. } => PhaseKind::ShowingResult,
            Phase::GameOver(_) => PhaseKind::GameOver,
            Phase::Error { .. } => PhaseKind::Error,
        }
    }

    fn progress(&self) -> Option<&RoundProgress> {
        match self {
            Phase::Playing(progress)
            | Phase::ShowingResult { progress, .. }
            | Phase::GameOver(progress) => Some(progress),
            Phase::Start | Phase::Loading | Phase::Error { .. } => None,
        }
    }
}

/// An operation was invoked in a phase that does not allow it. State is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot {operation} while in phase '{phase}'")]
pub struct TransitionError {
    pub operation: &'static str,
    pub phase: PhaseKind,
}

/// A pending round-content request issued by [`GameController::start`].
pub struct RoundRequest {
    generation: u64,
    provider: Arc<dyn ContentProvider>,
    timeout: Option<Duration>,
}

impl RoundRequest {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Performs the request. Expiry of the configured timeout is a `ServiceError`.
    pub async fn fetch(self) -> RoundOutcome {
        let request = self.provider.request_round();
        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, request)
                .await
                .unwrap_or_else(|_| {
                    Err(GenerationError::ServiceError(format!(
                        "round request timed out after {}ms",
                        limit.as_millis()
                    )))
                }),
            None => request.await,
        };
        RoundOutcome {
            generation: self.generation,
            result,
        }
    }
}

/// The result of a [`RoundRequest`], tagged with the generation it belongs to.
#[derive(Debug, Clone)]
pub struct RoundOutcome {
    pub generation: u64,
    pub result: Result<RoundContent, GenerationError>,
}

/// A serialisable, read-only view of the session for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub phase: PhaseKind,
    pub image: Option<String>,
    /// Text of the sentence being judged.
    pub sentence: Option<String>,
    /// 1-based position of the current question.
    pub question_number: Option<usize>,
    pub total_questions: Option<usize>,
    pub score: usize,
    pub last_answer_correct: Option<bool>,
    pub is_last_question: bool,
    pub error_message: Option<String>,
}

/// Drives one play session through its phases.
pub struct GameController {
    provider: Arc<dyn ContentProvider>,
    timeout: Option<Duration>,
    phase: Phase,
    generation: u64,
}

impl GameController {
    /// Creates a controller in the `Start` phase.
    pub fn new(provider: Arc<dyn ContentProvider>) -> Self {
        Self {
            provider,
            timeout: None,
            phase: Phase::Start,
            generation: 0,
        }
    }

    /// Bounds every round request by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn phase_kind(&self) -> PhaseKind {
        self.phase.kind()
    }

    /// The loaded round, if any.
    pub fn round(&self) -> Option<&RoundContent> {
        self.phase.progress().map(|p| &p.round)
    }

    pub fn question_index(&self) -> usize {
        self.phase.progress().map_or(0, |p| p.question_index)
    }

    pub fn score(&self) -> usize {
        self.phase.progress().map_or(0, |p| p.score)
    }

    /// Whether the most recent judgment was right. `None` unless a result is being shown.
    pub fn last_judgment_correct(&self) -> Option<bool> {
        match &self.phase {
            Phase::ShowingResult {
                last_judgment_correct,
                ..
            } => Some(*last_judgment_correct),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.phase {
            Phase::Error { message } => Some(message),
            _ => None,
        }
    }

    /// The sentence the player is judging or has just judged.
    pub fn current_sentence(&self) -> Option<&SentenceItem> {
        match &self.phase {
            Phase::Playing(progress) | Phase::ShowingResult { progress, .. } => {
                Some(progress.current())
            }
            _ => None,
        }
    }

    /// The generation number of the most recent `start`.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let progress = self.phase.progress();
        let in_question = self.current_sentence().is_some();
        SessionSnapshot {
            phase: self.phase_kind(),
            image: progress.map(|p| p.round.image.clone()),
            sentence: self.current_sentence().map(|s| s.sentence.clone()),
            question_number: progress
                .filter(|_| in_question)
                .map(|p| p.question_index + 1),
            total_questions: progress.map(|p| p.round.len()),
            score: self.score(),
            last_answer_correct: self.last_judgment_correct(),
            is_last_question: in_question && progress.is_some_and(|p| p.is_last_question()),
            error_message: self.error_message().map(str::to_string),
        }
    }

    /// Begins a new round from `Start`, `Error` or `GameOver`.
    ///
    /// Discards any previous round, enters `Loading` and returns the request to
    /// await. The outcome must be passed to [`GameController::complete`].
    pub fn start(&mut self) -> Result<RoundRequest, TransitionError> {
        match self.phase.kind() {
            PhaseKind::Start | PhaseKind::Error | PhaseKind::GameOver => {}
            phase => {
                warn!(%phase, "Ignoring start request");
                return Err(TransitionError {
                    operation: "start",
                    phase,
                });
            }
        }

        self.generation += 1;
        self.phase = Phase::Loading;
        info!(generation = self.generation, "Loading new round");

        Ok(RoundRequest {
            generation: self.generation,
            provider: self.provider.clone(),
            timeout: self.timeout,
        })
    }

    /// Applies a finished round request.
    ///
    /// Returns `false` and leaves the state untouched when the outcome is stale,
    /// i.e. it was issued under an older generation or the controller is no
    /// longer loading.
    pub fn complete(&mut self, outcome: RoundOutcome) -> bool {
        if outcome.generation != self.generation || self.phase != Phase::Loading {
            warn!(
                outcome_generation = outcome.generation,
                current_generation = self.generation,
                phase = %self.phase.kind(),
                "Discarding stale round outcome"
            );
            return false;
        }

        self.phase = match outcome.result {
            Ok(round) if !round.is_empty() => {
                info!(questions = round.len(), "Round loaded");
                Phase::Playing(RoundProgress::new(round))
            }
            Ok(_) => Self::failed(GenerationError::EmptyRound),
            Err(e) => Self::failed(e),
        };
        true
    }

    fn failed(err: GenerationError) -> Phase {
        error!(error = %err, "Round generation failed");
        let message = err.display_message();
        let message = if message.trim().is_empty() {
            UNKNOWN_ERROR_MESSAGE
        } else {
            message
        };
        Phase::Error {
            message: message.to_string(),
        }
    }

    /// Starts a round and waits for it to load. Returns the resulting phase.
    pub async fn load_round(&mut self) -> Result<PhaseKind, TransitionError> {
        let request = self.start()?;
        let outcome = request.fetch().await;
        self.complete(outcome);
        Ok(self.phase_kind())
    }

    /// Records the player's judgment of the current sentence.
    ///
    /// Only valid while `Playing`; returns whether the judgment was correct.
    pub fn submit_answer(&mut self, choice: bool) -> Result<bool, TransitionError> {
        match std::mem::replace(&mut self.phase, Phase::Start) {
            Phase::Playing(mut progress) => {
                let correct = progress.current().is_correct == choice;
                if correct {
                    progress.score += 1;
                }
                debug!(
                    question = progress.question_index,
                    choice,
                    correct,
                    score = progress.score,
                    "Answer submitted"
                );
                self.phase = Phase::ShowingResult {
                    progress,
                    last_judgment_correct: correct,
                };
                Ok(correct)
            }
            other => {
                let phase = other.kind();
                self.phase = other;
                debug!(%phase, "Rejected answer outside of play");
                Err(TransitionError {
                    operation: "submit an answer",
                    phase,
                })
            }
        }
    }

    /// Moves past the shown result to the next question, or ends the round.
    pub fn advance(&mut self) -> Result<PhaseKind, TransitionError> {
        match std::mem::replace(&mut self.phase, Phase::Start) {
            Phase::ShowingResult { mut progress, .. } => {
                if progress.is_last_question() {
                    info!(
                        score = progress.score,
                        total = progress.round.len(),
                        "Round complete"
                    );
                    self.phase = Phase::GameOver(progress);
                } else {
                    progress.question_index += 1;
                    self.phase = Phase::Playing(progress);
                }
                Ok(self.phase_kind())
            }
            other => {
                let phase = other.kind();
                self.phase = other;
                debug!(%phase, "Rejected advance outside of result display");
                Err(TransitionError {
                    operation: "advance",
                    phase,
                })
            }
        }
    }
}
