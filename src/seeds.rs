//! Built-in seed quiz and the offline generator used when no model provider is configured.

use async_trait::async_trait;
use tracing::{instrument, warn};

use crate::domain::{GenerationOptions, Question, Quiz, SourceMaterial};
use crate::error::GenerationError;
use crate::generator::{QuizGenerator, ReviewerGenerator};
use crate::reviewer::ReviewerOptions;

/// Lines of source material the offline reviewer keeps.
const SEED_REVIEWER_LINES: usize = 20;

/// Minimal set of built-in questions that keep the app usable without external config or OpenAI.
pub fn seed_questions() -> Vec<Question> {
  let raw: [(&str, [&str; 4], usize); 5] = [
    ("What is the capital of France?", ["Paris", "Rome", "Berlin", "Madrid"], 0),
    ("What is 2 + 2?", ["3", "4", "5", "6"], 1),
    ("Which planet is known as the Red Planet?", ["Venus", "Jupiter", "Mars", "Mercury"], 2),
    ("What is the chemical symbol for water?", ["O2", "CO2", "NaCl", "H2O"], 3),
    ("Which organelle produces most of a cell's energy?", ["Mitochondrion", "Nucleus", "Ribosome", "Golgi body"], 0),
  ];

  raw
    .into_iter()
    .filter_map(|(prompt, options, correct)| {
      Question::new(prompt, options.iter().map(|o| o.to_string()).collect(), correct).ok()
    })
    .collect()
}

/// Offline generator: ignores the material and serves the seed quiz, cut to the requested size.
#[derive(Clone, Debug, Default)]
pub struct SeedGenerator;

#[async_trait]
impl QuizGenerator for SeedGenerator {
  fn name(&self) -> &'static str { "seed" }

  #[instrument(level = "info", skip_all, fields(source_len = source.as_str().len(), count = options.number_of_questions))]
  async fn generate(
    &self,
    source: &SourceMaterial,
    options: &GenerationOptions,
  ) -> Result<Quiz, GenerationError> {
    warn!(target: "quiz", "Serving built-in seed quiz (no model provider configured)");
    let mut questions = seed_questions();
    questions.truncate(options.number_of_questions);
    Ok(Quiz::new(questions))
  }
}

/// Offline reviewer: an outline of the material's first non-blank lines.
#[async_trait]
impl ReviewerGenerator for SeedGenerator {
  #[instrument(level = "info", skip_all, fields(source_len = source.as_str().len(), format = ?options.format))]
  async fn generate_reviewer(
    &self,
    source: &SourceMaterial,
    options: &ReviewerOptions,
  ) -> Result<String, GenerationError> {
    warn!(target: "quiz", "Serving offline reviewer outline (no model provider configured)");
    let mut out = String::from("# Overview\n\n");
    for line in source.as_str().lines().map(str::trim).filter(|l| !l.is_empty()).take(SEED_REVIEWER_LINES) {
      out.push_str("- ");
      out.push_str(line);
      out.push('\n');
    }
    Ok(out)
  }
}
