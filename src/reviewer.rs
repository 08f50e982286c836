//! Study reviewer options and prompt assembly.
//!
//! A reviewer is free-form markdown study material generated from the same source text a quiz
//! is built from. Callers pick a detail level and a layout by name; unknown or missing names
//! fall back to `medium` and `bullet-points`.

use serde::Serialize;

use crate::config::Prompts;
use crate::util::fill_template;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetailLevel {
  VeryDetailed,
  Thorough,
  #[default]
  Medium,
  MainIdeas,
  Concise,
}

impl DetailLevel {
  /// Lenient lookup: anything unrecognised is `Medium`.
  pub fn from_name(name: Option<&str>) -> Self {
    match name.map(str::trim) {
      Some("very-detailed") => DetailLevel::VeryDetailed,
      Some("thorough") => DetailLevel::Thorough,
      Some("main-ideas") => DetailLevel::MainIdeas,
      Some("concise") => DetailLevel::Concise,
      _ => DetailLevel::Medium,
    }
  }

  pub fn guidance(self) -> &'static str {
    match self {
      DetailLevel::VeryDetailed => "Create an extremely detailed and comprehensive reviewer that covers all aspects of the content with thorough explanations and examples",
      DetailLevel::Thorough => "Create a thorough reviewer that covers important concepts in detail with clear explanations",
      DetailLevel::Medium => "Create a balanced reviewer with moderate detail, focusing on key concepts and supporting points",
      DetailLevel::MainIdeas => "Focus only on the main ideas and core concepts, ignoring minor details",
      DetailLevel::Concise => "Create a concise, minimalist reviewer that captures only the absolute essential information",
    }
  }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReviewFormat {
  #[default]
  BulletPoints,
  Paragraphs,
  Flashcards,
  MindMap,
  Summary,
  TermsTable,
}

impl ReviewFormat {
  /// Lenient lookup: anything unrecognised is `BulletPoints`.
  pub fn from_name(name: Option<&str>) -> Self {
    match name.map(str::trim) {
      Some("paragraphs") => ReviewFormat::Paragraphs,
      Some("flashcards") => ReviewFormat::Flashcards,
      Some("mind-map") => ReviewFormat::MindMap,
      Some("summary") => ReviewFormat::Summary,
      Some("terms-table") => ReviewFormat::TermsTable,
      _ => ReviewFormat::BulletPoints,
    }
  }

  pub fn guidance(self) -> &'static str {
    match self {
      ReviewFormat::BulletPoints => "Format the content as organized bullet points with clear hierarchical structure",
      ReviewFormat::Paragraphs => "Format the content as well-structured paragraphs with clear transitions",
      ReviewFormat::Flashcards => "Format the content as question/answer pairs suitable for flashcard studying",
      ReviewFormat::MindMap => "Format the content in a hierarchical structure similar to a mind map, with main concepts and supporting details",
      ReviewFormat::Summary => "Format the content as a concise executive summary of the most important information",
      ReviewFormat::TermsTable => "Format the content as a simple two-column table with the structure **Term** | **Definition / Example**. \
Each row holds a term in the first column and its definition (plus an example if applicable) in the second. \
Keep the table in clean markdown",
    }
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReviewerOptions {
  pub detail_level: DetailLevel,
  pub format: ReviewFormat,
  pub language: String,
}

impl ReviewerOptions {
  /// Resolve caller-supplied names; a blank language falls back to `default_language`.
  pub fn resolve(detail_level: Option<&str>, format: Option<&str>, language: Option<&str>, default_language: &str) -> Self {
    let language = language.map(str::trim).filter(|l| !l.is_empty()).unwrap_or(default_language);
    Self {
      detail_level: DetailLevel::from_name(detail_level),
      format: ReviewFormat::from_name(format),
      language: language.to_string(),
    }
  }
}

pub fn build_reviewer_prompt(prompts: &Prompts, options: &ReviewerOptions) -> String {
  fill_template(
    &prompts.reviewer_system,
    &[
      ("detail", options.detail_level.guidance()),
      ("format", options.format.guidance()),
      ("language", options.language.as_str()),
    ],
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unknown_names_fall_back() {
    assert_eq!(DetailLevel::from_name(Some("exhaustive")), DetailLevel::Medium);
    assert_eq!(DetailLevel::from_name(None), DetailLevel::Medium);
    assert_eq!(ReviewFormat::from_name(Some("haiku")), ReviewFormat::BulletPoints);
    assert_eq!(ReviewFormat::from_name(None), ReviewFormat::BulletPoints);
  }

  #[test]
  fn known_names_map() {
    assert_eq!(DetailLevel::from_name(Some("very-detailed")), DetailLevel::VeryDetailed);
    assert_eq!(DetailLevel::from_name(Some(" main-ideas ")), DetailLevel::MainIdeas);
    assert_eq!(ReviewFormat::from_name(Some("terms-table")), ReviewFormat::TermsTable);
    assert_eq!(ReviewFormat::from_name(Some("mind-map")), ReviewFormat::MindMap);
  }

  #[test]
  fn blank_language_uses_default() {
    let o = ReviewerOptions::resolve(None, None, Some("  "), "English");
    assert_eq!(o.language, "English");
    let o = ReviewerOptions::resolve(Some("concise"), Some("summary"), Some("Filipino"), "English");
    assert_eq!(o, ReviewerOptions { detail_level: DetailLevel::Concise, format: ReviewFormat::Summary, language: "Filipino".into() });
  }

  #[test]
  fn prompt_carries_guidance_and_language() {
    let o = ReviewerOptions::resolve(Some("thorough"), Some("flashcards"), Some("Spanish"), "English");
    let system = build_reviewer_prompt(&Prompts::default(), &o);
    assert!(system.contains("Detail Level: Create a thorough reviewer"));
    assert!(system.contains("Format: Format the content as question/answer pairs"));
    assert!(system.contains("Use the Spanish language"));
    assert!(!system.contains('{'));
  }
}
