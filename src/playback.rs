//! Quiz playback engine.
//!
//! `PlaybackState` is the per-attempt progress (current question, selection, score, completion).
//! `QuizFlow` wraps it with the loading lifecycle and is driven exclusively through
//! [`QuizFlow::apply`], so every transition can be exercised without a transport.
//!
//! Load results are tagged with the epoch returned by `BeginLoad`; a result whose epoch is
//! no longer current belongs to a superseded request and is dropped.

use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::{Outcome, Question, Quiz};
use crate::error::{GenerationError, PlaybackError};

/// Shown to the user when the generation call fails. The only offered action is starting over.
pub const GENERATION_FAILED_MESSAGE: &str =
    "Failed to generate quiz. The material might not contain enough recognizable content.";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlaybackState {
    pub current_index: usize,
    pub selected_option_index: Option<usize>,
    pub score: usize,
    pub completed: bool,
}

/// Result of a `SelectAnswer` that was accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selection {
    Correct,
    Incorrect,
    /// An answer was already recorded for this question; nothing changed.
    Ignored,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Next(usize),
    Completed,
}

impl PlaybackState {
    fn ensure_active(&self, quiz: &Quiz) -> Result<(), PlaybackError> {
        if self.completed {
            return Err(PlaybackError::AlreadyCompleted);
        }
        if self.current_index >= quiz.len() {
            return Err(PlaybackError::NotPlaying);
        }
        Ok(())
    }

    pub fn select_answer(&mut self, quiz: &Quiz, option_index: usize) -> Result<Selection, PlaybackError> {
        self.ensure_active(quiz)?;
        if self.selected_option_index.is_some() {
            return Ok(Selection::Ignored);
        }
        let question = quiz.get(self.current_index).ok_or(PlaybackError::NotPlaying)?;
        if option_index >= question.options().len() {
            return Err(PlaybackError::InvalidSelection {
                index: option_index,
                options: question.options().len(),
            });
        }

        self.selected_option_index = Some(option_index);
        if question.is_correct(option_index) {
            self.score += 1;
            Ok(Selection::Correct)
        } else {
            Ok(Selection::Incorrect)
        }
    }

    pub fn advance(&mut self, quiz: &Quiz) -> Result<Step, PlaybackError> {
        self.ensure_active(quiz)?;
        if self.selected_option_index.is_none() {
            return Err(PlaybackError::NoAnswerSelected);
        }
        if self.current_index + 1 < quiz.len() {
            self.current_index += 1;
            self.selected_option_index = None;
            Ok(Step::Next(self.current_index))
        } else {
            self.completed = true;
            Ok(Step::Completed)
        }
    }

    pub fn restart(&mut self) {
        *self = Self::default();
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlowStatus {
    Loading,
    Playing { quiz: Quiz, progress: PlaybackState },
    NoQuestions,
    Failed { message: String },
}

/// Coarse state consumers render from. `Error`, `NoQuestions` and `Completed` never overlap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Loading,
    Ready,
    AnswerRevealed,
    Completed,
    NoQuestions,
    Error,
}

#[derive(Debug)]
pub enum Action {
    BeginLoad,
    Loaded { epoch: u64, result: Result<Quiz, GenerationError> },
    SelectAnswer(usize),
    Advance,
    Restart,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    LoadStarted { epoch: u64 },
    Loaded(Phase),
    /// Load result from a superseded request; state untouched.
    Stale,
    Selected(Selection),
    Advanced(Step),
    Restarted,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuizFlow {
    epoch: u64,
    status: FlowStatus,
}

impl Default for QuizFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizFlow {
    pub fn new() -> Self {
        Self { epoch: 0, status: FlowStatus::Loading }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Single entry point for every transition. Errors leave the flow unchanged.
    pub fn apply(&mut self, action: Action) -> Result<Effect, PlaybackError> {
        match action {
            Action::BeginLoad => {
                self.epoch += 1;
                self.status = FlowStatus::Loading;
                Ok(Effect::LoadStarted { epoch: self.epoch })
            }
            Action::Loaded { epoch, result } => Ok(self.finish_load(epoch, result)),
            Action::SelectAnswer(option_index) => {
                let (quiz, progress) = self.playing_mut()?;
                progress.select_answer(quiz, option_index).map(Effect::Selected)
            }
            Action::Advance => {
                let (quiz, progress) = self.playing_mut()?;
                progress.advance(quiz).map(Effect::Advanced)
            }
            Action::Restart => {
                let (_, progress) = self.playing_mut()?;
                progress.restart();
                Ok(Effect::Restarted)
            }
        }
    }

    fn finish_load(&mut self, epoch: u64, result: Result<Quiz, GenerationError>) -> Effect {
        if epoch != self.epoch {
            debug!(target: "quiz", epoch, current = self.epoch, "Dropping superseded load result");
            return Effect::Stale;
        }
        self.status = match result {
            Ok(quiz) if quiz.is_empty() => FlowStatus::NoQuestions,
            Ok(quiz) => FlowStatus::Playing { quiz, progress: PlaybackState::default() },
            Err(e) => {
                warn!(target: "quiz", epoch, error = %e, "Quiz generation failed");
                FlowStatus::Failed { message: GENERATION_FAILED_MESSAGE.to_string() }
            }
        };
        Effect::Loaded(self.phase())
    }

    fn playing_mut(&mut self) -> Result<(&Quiz, &mut PlaybackState), PlaybackError> {
        match &mut self.status {
            FlowStatus::Playing { quiz, progress } => Ok((&*quiz, progress)),
            _ => Err(PlaybackError::NotPlaying),
        }
    }

    pub fn phase(&self) -> Phase {
        match &self.status {
            FlowStatus::Loading => Phase::Loading,
            FlowStatus::NoQuestions => Phase::NoQuestions,
            FlowStatus::Failed { .. } => Phase::Error,
            FlowStatus::Playing { progress, .. } if progress.completed => Phase::Completed,
            FlowStatus::Playing { progress, .. } if progress.selected_option_index.is_some() => {
                Phase::AnswerRevealed
            }
            FlowStatus::Playing { .. } => Phase::Ready,
        }
    }

    pub fn progress(&self) -> Option<&PlaybackState> {
        match &self.status {
            FlowStatus::Playing { progress, .. } => Some(progress),
            _ => None,
        }
    }

    pub fn quiz(&self) -> Option<&Quiz> {
        match &self.status {
            FlowStatus::Playing { quiz, .. } => Some(quiz),
            _ => None,
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        match &self.status {
            FlowStatus::Playing { quiz, progress } if !progress.completed => quiz.get(progress.current_index),
            _ => None,
        }
    }

    /// Only defined for a completed attempt.
    pub fn outcome(&self) -> Option<Outcome> {
        match &self.status {
            FlowStatus::Playing { quiz, progress } if progress.completed => {
                Some(Outcome::classify(progress.score, quiz.len()))
            }
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.status {
            FlowStatus::Failed { message } => Some(message),
            _ => None,
        }
    }
}
