//! The generation seams. The playback engine only needs a call that resolves to a
//! validated `Quiz` (possibly empty) or fails; reviewers are plain markdown.

use async_trait::async_trait;

use crate::domain::{GenerationOptions, Quiz, SourceMaterial};
use crate::error::GenerationError;
use crate::reviewer::ReviewerOptions;

#[async_trait]
pub trait QuizGenerator: Send + Sync {
  /// Short name used in logs ("openai", "seed", ...).
  fn name(&self) -> &'static str;

  async fn generate(
    &self,
    source: &SourceMaterial,
    options: &GenerationOptions,
  ) -> Result<Quiz, GenerationError>;
}

/// Study reviewer generation. Resolves to markdown text.
#[async_trait]
pub trait ReviewerGenerator: Send + Sync {
  async fn generate_reviewer(
    &self,
    source: &SourceMaterial,
    options: &ReviewerOptions,
  ) -> Result<String, GenerationError>;
}
