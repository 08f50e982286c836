//! Loading service configuration (prompts + generation defaults) from TOML.
//!
//! See `AppConfig` and `Prompts` for expected schema. Every section is optional:
//!
//! ```toml
//! [prompts]
//! quiz_system = "..."       # placeholders: {count}, {difficulty}, {language}
//! reviewer_system = "..."   # placeholders: {detail}, {format}, {language}
//!
//! [defaults]
//! numberOfQuestions = 10
//! difficulty = "hard"
//! language = "Filipino"
//! ```

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::GenerationOptions;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub defaults: GenerationOptions,
}

/// Prompts used by the OpenAI client.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub quiz_system: String,
  /// Appended to the system prompt when the caller supplies an instruction.
  pub instruction_suffix: String,
  pub reviewer_system: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      quiz_system: "You are an AI-powered tutor that turns study material into quiz questions. \
Analyze the user's content and generate {count} multiple-choice questions at {difficulty} difficulty, \
written in {language}. Each question must have exactly 4 options with exactly one correct answer, \
and must be directly related to the content.\n\
Respond ONLY with strict JSON of the form \
{\"questions\": [{\"question\": string, \"options\": [string, string, string, string], \"correctAnswer\": number}]} \
where correctAnswer is the 0-based index of the correct option.\n\
If the content does not contain enough recognizable material, return {\"questions\": []}.".into(),
      instruction_suffix: "\n\nAdditional Instructions: {instruction}".into(),
      reviewer_system: "You are an AI-powered educational assistant that creates concise, effective study materials from text.\n\n\
Detail Level: {detail}.\n\
Format: {format}.\n\n\
Create a comprehensive study reviewer based on the following content. Focus on organizing the information in a way \
that helps with learning and retention. If the content appears to be from a textbook, lecture notes, or educational \
material, structure the reviewer to highlight key concepts, definitions, theories, and examples.\n\n\
Use the {language} language for the entire response.\n\n\
Start with a brief overview of what the content covers, then organize the main body of the reviewer according to the \
specified format. Maintain academic accuracy while making the content more accessible for studying.\n\n\
Formatting rules:\n\
- Do not use horizontal rules (---, ___, ***)\n\
- Do not use HTML tags\n\
- Use headings (# Title), bold (**text**), and italic (*text*) for formatting\n\
- Lists use a space after the marker (- Item or 1. Item)\n\
- Tables are simple markdown tables with | separators".into(),
    }
  }
}

impl AppConfig {
  pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
    toml::from_str::<AppConfig>(s)
  }
}

/// Attempt to load `AppConfig` from QUIZ_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("QUIZ_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match AppConfig::from_toml(&s) {
      Ok(cfg) => {
        if let Err(e) = cfg.defaults.validate() {
          error!(target: "pic2quiz", %path, error = %e, "Invalid generation defaults in config; ignoring file");
          return None;
        }
        info!(target: "pic2quiz", %path, "Loaded quiz config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "pic2quiz", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "pic2quiz", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
