//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{Difficulty, GenerationOptions, Outcome, SourceMaterial};
use crate::error::InputError;
use crate::playback::{Phase, QuizFlow};
use crate::reviewer::{DetailLevel, ReviewFormat, ReviewerOptions};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    NewQuiz(NewQuizIn),
    SelectAnswer {
        #[serde(rename = "optionIndex")]
        option_index: usize,
    },
    Advance,
    Restart {
        #[serde(default)]
        regenerate: bool,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    State { quiz: QuizOut },
    Error { message: String },
}

/// Source material plus optional generation overrides.
/// `pages` (one OCR result per uploaded image, in upload order) wins over `text` when non-empty.
#[derive(Debug, Default, Deserialize)]
pub struct NewQuizIn {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub pages: Option<Vec<String>>,
    #[serde(default)]
    pub options: Option<OptionsIn>,
}

impl NewQuizIn {
    pub fn source(&self) -> Result<SourceMaterial, InputError> {
        match &self.pages {
            Some(pages) if !pages.is_empty() => SourceMaterial::from_pages(pages),
            _ => SourceMaterial::from_text(self.text.clone().unwrap_or_default()),
        }
    }

    /// Overrides applied on top of the configured defaults, then validated.
    pub fn options(&self, defaults: &GenerationOptions) -> Result<GenerationOptions, InputError> {
        let mut out = defaults.clone();
        if let Some(o) = &self.options {
            if let Some(n) = o.number_of_questions {
                out.number_of_questions = n;
            }
            if let Some(d) = o.difficulty {
                out.difficulty = d;
            }
            if let Some(l) = &o.language {
                out.language = l.clone();
            }
            if o.instruction.is_some() {
                out.instruction = o.instruction.clone();
            }
        }
        out.validate()?;
        Ok(out)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsIn {
    pub number_of_questions: Option<usize>,
    pub difficulty: Option<Difficulty>,
    pub language: Option<String>,
    pub instruction: Option<String>,
}

/// Snapshot of one playback session, used by both WS and HTTP.
/// Progress fields are absent unless a quiz is in play, so an empty result never reads as 0/0.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizOut {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub phase: Phase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_option_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_option_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
}

#[derive(Debug, Serialize)]
pub struct QuestionOut {
    pub prompt: String,
    pub options: Vec<String>,
}

pub const NO_QUESTIONS_MESSAGE: &str =
    "We couldn't generate quiz questions from this material. Try a different input with more recognizable content.";

/// Convert a flow into the public DTO. The correct answer is only revealed once an answer is selected.
pub fn to_out(id: Option<&str>, flow: &QuizFlow) -> QuizOut {
    let phase = flow.phase();
    let progress = flow.progress();
    let question = flow.current_question();
    let selected = progress.and_then(|p| p.selected_option_index);

    let message = match phase {
        Phase::Error => flow.error_message().map(str::to_string),
        Phase::NoQuestions => Some(NO_QUESTIONS_MESSAGE.to_string()),
        _ => None,
    };

    QuizOut {
        id: id.map(str::to_string),
        phase,
        message,
        total: flow.quiz().map(|q| q.len()),
        current_index: progress.map(|p| p.current_index),
        score: progress.map(|p| p.score),
        question: question.map(|q| QuestionOut {
            prompt: q.prompt().to_string(),
            options: q.options().to_vec(),
        }),
        selected_option_index: selected,
        correct_option_index: question.filter(|_| selected.is_some()).map(|q| q.correct_option_index()),
        outcome: flow.outcome(),
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct AnswerIn {
    #[serde(rename = "optionIndex")]
    pub option_index: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct RestartIn {
    #[serde(default)]
    pub regenerate: bool,
}

/// Study reviewer request. Unknown `detailLevel`/`format` names fall back to defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewerIn {
    #[serde(default)]
    pub content: String,
    pub detail_level: Option<String>,
    pub format: Option<String>,
    pub language: Option<String>,
}

impl ReviewerIn {
    pub fn source(&self) -> Result<SourceMaterial, InputError> {
        SourceMaterial::from_text(self.content.clone())
    }

    pub fn options(&self, defaults: &GenerationOptions) -> ReviewerOptions {
        ReviewerOptions::resolve(
            self.detail_level.as_deref(),
            self.format.as_deref(),
            self.language.as_deref(),
            &defaults.language,
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewerOut {
    pub content: String,
    pub detail_level: DetailLevel,
    pub format: ReviewFormat,
    pub language: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub generator: &'static str,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub error: String,
    pub kind: &'static str,
}
