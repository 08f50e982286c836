//! Minimal OpenAI client for quiz and reviewer generation.
//!
//! We only call chat.completions: quizzes request a strict JSON object, reviewers plain markdown.
//! Calls are instrumented and log model names, latencies, and response sizes (not contents).
//!
//! NOTE: We never log the API key and we keep payload truncations short to avoid PII leaks.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::config::Prompts;
use crate::domain::{GenerationOptions, Question, Quiz, SourceMaterial};
use crate::error::GenerationError;
use crate::generator::{QuizGenerator, ReviewerGenerator};
use crate::reviewer::{build_reviewer_prompt, ReviewerOptions};
use crate::util::{fill_template, trunc_for_log};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
  pub prompts: Prompts,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env(prompts: Prompts) -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url = std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
    let timeout = std::env::var("OPENAI_TIMEOUT_SECS")
      .ok()
      .and_then(|s| s.parse::<u64>().ok())
      .unwrap_or(DEFAULT_TIMEOUT_SECS);

    match Self::new(api_key, base_url, model, Duration::from_secs(timeout), prompts) {
      Ok(oa) => Some(oa),
      Err(e) => {
        error!(target: "pic2quiz", error = %e, "Failed to build HTTP client; OpenAI disabled");
        None
      }
    }
  }

  pub fn new(
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
    prompts: Prompts,
  ) -> Result<Self, reqwest::Error> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(Self { client, api_key, base_url, model, prompts })
  }

  /// Chat completion returning the raw message content. `json` requests a strict JSON object.
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model, user_len = user.len()))]
  async fn chat(&self, system: &str, user: &str, temperature: f32, json: bool) -> Result<String, GenerationError> {
    let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      response_format: json.then(|| ResponseFormat { r#type: "json_object".into() }),
      max_tokens: None,
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "pic2quiz-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&body).unwrap_or_else(|| trunc_for_log(&body, 200));
      return Err(GenerationError::Api { status: status.as_u16(), message });
    }

    let body: ChatCompletionResponse = res.json().await?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let choice = body.choices.into_iter().next().ok_or(GenerationError::EmptyCompletion)?;
    Ok(choice.message.content.unwrap_or_default())
  }
}

#[async_trait]
impl QuizGenerator for OpenAI {
  fn name(&self) -> &'static str { "openai" }

  #[instrument(
    level = "info",
    skip(self, source, options),
    fields(model = %self.model, source_len = source.as_str().len(), count = options.number_of_questions, difficulty = options.difficulty.as_str())
  )]
  async fn generate(
    &self,
    source: &SourceMaterial,
    options: &GenerationOptions,
  ) -> Result<Quiz, GenerationError> {
    let system = build_system_prompt(&self.prompts, options);
    let start = Instant::now();
    let result = self.chat(&system, source.as_str(), 0.7, true).await;
    let elapsed = start.elapsed();

    let text = match result {
      Ok(t) => {
        info!(?elapsed, response_len = t.len(), "Model response received successfully");
        t
      }
      Err(e) => {
        error!(?elapsed, error = %e, "Model call failed during quiz generation");
        return Err(e);
      }
    };

    let quiz = parse_quiz(&text, options.number_of_questions);
    info!(questions = quiz.len(), "Quiz generated");
    Ok(quiz)
  }
}

#[async_trait]
impl ReviewerGenerator for OpenAI {
  #[instrument(
    level = "info",
    skip(self, source, options),
    fields(model = %self.model, source_len = source.as_str().len(), detail = ?options.detail_level, format = ?options.format)
  )]
  async fn generate_reviewer(
    &self,
    source: &SourceMaterial,
    options: &ReviewerOptions,
  ) -> Result<String, GenerationError> {
    let system = build_reviewer_prompt(&self.prompts, options);
    let start = Instant::now();
    let text = self.chat(&system, source.as_str(), 0.7, false).await.map_err(|e| {
      error!(elapsed = ?start.elapsed(), error = %e, "Model call failed during reviewer generation");
      e
    })?;
    if text.trim().is_empty() {
      return Err(GenerationError::EmptyCompletion);
    }
    info!(elapsed = ?start.elapsed(), response_len = text.len(), "Reviewer generated");
    Ok(text)
  }
}

/// System prompt for one generation call: template filled with the options, plus the optional instruction.
pub fn build_system_prompt(prompts: &Prompts, options: &GenerationOptions) -> String {
  let count = options.number_of_questions.to_string();
  let mut system = fill_template(
    &prompts.quiz_system,
    &[
      ("count", count.as_str()),
      ("difficulty", options.difficulty.as_str()),
      ("language", options.language.trim()),
    ],
  );
  if let Some(instruction) = options.instruction() {
    system.push_str(&fill_template(&prompts.instruction_suffix, &[("instruction", instruction)]));
  }
  system
}

/// Turn model output into a quiz. Unparseable output yields an empty quiz; malformed
/// questions are dropped; the result never exceeds `max_questions`.
pub fn parse_quiz(text: &str, max_questions: usize) -> Quiz {
  let payload = match serde_json::from_str::<QuizPayload>(strip_code_fence(text)) {
    Ok(p) => p,
    Err(e) => {
      warn!(target: "quiz", error = %e, preview = %trunc_for_log(text, 80), "Model output is not a quiz payload");
      return Quiz::default();
    }
  };
  let raw = match payload {
    QuizPayload::Wrapped { questions } => questions,
    QuizPayload::Bare(questions) => questions,
  };

  let questions = raw
    .into_iter()
    .enumerate()
    .filter_map(|(i, q)| {
      let correct = q.correct_answer.and_then(|c| usize::try_from(c).ok());
      let prompt = q.question.trim();
      if prompt.is_empty() {
        warn!(target: "quiz", index = i, "Dropping generated question without text");
        return None;
      }
      let Some(correct) = correct else {
        warn!(target: "quiz", index = i, "Dropping generated question without a valid answer index");
        return None;
      };
      match Question::new(prompt, q.options, correct) {
        Ok(q) => Some(q),
        Err(e) => {
          warn!(target: "quiz", index = i, error = %e, "Dropping malformed generated question");
          None
        }
      }
    })
    .take(max_questions)
    .collect();

  Quiz::new(questions)
}

fn strip_code_fence(text: &str) -> &str {
  let t = text.trim();
  let Some(rest) = t.strip_prefix("```") else { return t };
  let rest = rest.strip_prefix("json").unwrap_or(rest);
  rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum QuizPayload {
  Wrapped { questions: Vec<RawQuestion> },
  Bare(Vec<RawQuestion>),
}

#[derive(Deserialize)]
struct RawQuestion {
  #[serde(default)] question: String,
  #[serde(default)] options: Vec<String>,
  #[serde(default, rename = "correctAnswer", alias = "correct_answer")] correct_answer: Option<i64>,
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
