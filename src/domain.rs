//! Domain models: questions, quizzes, outcome tiers, and the material a quiz is generated from.

use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// Upper bound on questions per generated quiz (largest choice the forms offer).
pub const MAX_QUESTIONS: usize = 20;
pub const DEFAULT_QUESTIONS: usize = 5;

/// One multiple-choice question. Immutable once built; the correct index is always in range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Question {
  prompt: String,
  options: Vec<String>,
  correct_option_index: usize,
}

impl Question {
  pub fn new(
    prompt: impl Into<String>,
    options: Vec<String>,
    correct_option_index: usize,
  ) -> Result<Self, InputError> {
    if options.len() < 2 {
      return Err(InputError::TooFewOptions(options.len()));
    }
    if correct_option_index >= options.len() {
      return Err(InputError::CorrectIndexOutOfRange { index: correct_option_index, options: options.len() });
    }
    Ok(Self { prompt: prompt.into(), options, correct_option_index })
  }

  pub fn prompt(&self) -> &str { &self.prompt }
  pub fn options(&self) -> &[String] { &self.options }
  pub fn correct_option_index(&self) -> usize { self.correct_option_index }

  pub fn is_correct(&self, option_index: usize) -> bool {
    option_index == self.correct_option_index
  }
}

/// Ordered, fixed-length sequence of questions. Never mutated after load.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Quiz {
  questions: Vec<Question>,
}

impl Quiz {
  pub fn new(questions: Vec<Question>) -> Self { Self { questions } }

  pub fn len(&self) -> usize { self.questions.len() }
  pub fn is_empty(&self) -> bool { self.questions.is_empty() }
  pub fn get(&self, index: usize) -> Option<&Question> { self.questions.get(index) }
  #[cfg(test)]
  pub fn questions(&self) -> &[Question] { &self.questions }
}

/// Display tier for a finished attempt. Derived, never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
  Perfect,
  Pass,
  Fail,
}

impl Outcome {
  /// Exactly half correct counts as a pass (`score >= len / 2`, compared without rounding).
  pub fn classify(score: usize, len: usize) -> Self {
    if score == len {
      Outcome::Perfect
    } else if score * 2 >= len {
      Outcome::Pass
    } else {
      Outcome::Fail
    }
  }
}

/// Text a quiz is generated from: typed text, or OCR pages joined in upload order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceMaterial {
  text: String,
}

impl SourceMaterial {
  pub fn from_text(text: impl Into<String>) -> Result<Self, InputError> {
    let text = text.into();
    if text.trim().is_empty() {
      return Err(InputError::EmptySource);
    }
    Ok(Self { text })
  }

  /// One entry per uploaded image, already in upload order. Blank pages are skipped.
  pub fn from_pages<I, S>(pages: I) -> Result<Self, InputError>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let joined = pages
      .into_iter()
      .filter_map(|p| {
        let p = p.as_ref().trim();
        (!p.is_empty()).then(|| p.to_string())
      })
      .collect::<Vec<_>>()
      .join("\n\n");
    Self::from_text(joined)
  }

  pub fn as_str(&self) -> &str { &self.text }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
  Easy,
  #[default]
  Medium,
  Hard,
}

impl Difficulty {
  pub fn as_str(self) -> &'static str {
    match self {
      Difficulty::Easy => "easy",
      Difficulty::Medium => "medium",
      Difficulty::Hard => "hard",
    }
  }
}

/// Knobs forwarded to the generator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationOptions {
  pub number_of_questions: usize,
  pub difficulty: Difficulty,
  pub language: String,
  pub instruction: Option<String>,
}

impl Default for GenerationOptions {
  fn default() -> Self {
    Self {
      number_of_questions: DEFAULT_QUESTIONS,
      difficulty: Difficulty::Medium,
      language: "English".into(),
      instruction: None,
    }
  }
}

impl GenerationOptions {
  pub fn validate(&self) -> Result<(), InputError> {
    if self.number_of_questions == 0 || self.number_of_questions > MAX_QUESTIONS {
      return Err(InputError::QuestionCount(self.number_of_questions));
    }
    if self.language.trim().is_empty() {
      return Err(InputError::EmptyLanguage);
    }
    Ok(())
  }

  /// Instruction text if it carries anything besides whitespace.
  pub fn instruction(&self) -> Option<&str> {
    self.instruction.as_deref().map(str::trim).filter(|s| !s.is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn opts(v: &[&str]) -> Vec<String> { v.iter().map(|s| s.to_string()).collect() }

  #[test]
  fn question_rejects_out_of_range_answer() {
    let err = Question::new("q", opts(&["a", "b", "c", "d"]), 4).unwrap_err();
    assert!(matches!(err, InputError::CorrectIndexOutOfRange { index: 4, options: 4 }));
  }

  #[test]
  fn question_rejects_single_option() {
    assert!(matches!(Question::new("q", opts(&["a"]), 0), Err(InputError::TooFewOptions(1))));
  }

  #[test]
  fn outcome_tiers() {
    assert_eq!(Outcome::classify(5, 5), Outcome::Perfect);
    assert_eq!(Outcome::classify(3, 5), Outcome::Pass);
    assert_eq!(Outcome::classify(2, 5), Outcome::Fail);
    assert_eq!(Outcome::classify(0, 1), Outcome::Fail);
  }

  #[test]
  fn exact_half_passes() {
    assert_eq!(Outcome::classify(1, 2), Outcome::Pass);
    assert_eq!(Outcome::classify(5, 10), Outcome::Pass);
    assert_eq!(Outcome::classify(4, 10), Outcome::Fail);
  }

  #[test]
  fn pages_keep_upload_order() {
    let src = SourceMaterial::from_pages(["first page", "  ", "second page\n", "third"]).unwrap();
    assert_eq!(src.as_str(), "first page\n\nsecond page\n\nthird");
  }

  #[test]
  fn blank_source_is_rejected() {
    assert!(matches!(SourceMaterial::from_text("  \n\t"), Err(InputError::EmptySource)));
    assert!(matches!(SourceMaterial::from_pages(Vec::<String>::new()), Err(InputError::EmptySource)));
  }

  #[test]
  fn options_bounds() {
    let mut o = GenerationOptions::default();
    assert!(o.validate().is_ok());
    o.number_of_questions = 0;
    assert!(matches!(o.validate(), Err(InputError::QuestionCount(0))));
    o.number_of_questions = MAX_QUESTIONS + 1;
    assert!(o.validate().is_err());
  }

  #[test]
  fn blank_instruction_is_ignored() {
    let mut o = GenerationOptions::default();
    o.instruction = Some("   ".into());
    assert_eq!(o.instruction(), None);
    o.instruction = Some(" focus on dates ".into());
    assert_eq!(o.instruction(), Some("focus on dates"));
  }
}
