//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Creating a session and loading its quiz through the generator
//!   - Forwarding playback actions (select, advance, restart) to the session's flow
//!   - Regenerating a quiz, with late results from superseded loads discarded
//!   - Generating a study reviewer from the same kind of source material

use tracing::{debug, error, info, instrument};

use crate::domain::{GenerationOptions, Quiz, SourceMaterial};
use crate::error::{GenerationError, ServiceError};
use crate::generator::QuizGenerator;
use crate::playback::{Action, Effect, QuizFlow};
use crate::protocol::{to_out, NewQuizIn, QuizOut, ReviewerIn, ReviewerOut};
use crate::state::{begin_load, AppState};

/// Await the generator once, logging which implementation served the request.
#[instrument(level = "info", skip_all, fields(generator = generator.name(), count = options.number_of_questions))]
pub async fn generate(
  generator: &dyn QuizGenerator,
  source: &SourceMaterial,
  options: &GenerationOptions,
) -> Result<Quiz, GenerationError> {
  let result = generator.generate(source, options).await;
  if let Ok(quiz) = &result {
    debug!(target: "quiz", questions = quiz.len(), "Generator resolved");
  }
  result
}

#[instrument(level = "info", skip(state, input))]
pub async fn create_quiz(state: &AppState, input: &NewQuizIn) -> Result<QuizOut, ServiceError> {
  let source = input.source()?;
  let options = input.options(&state.defaults)?;
  let (id, epoch) = state.insert_session(source.clone(), options.clone()).await;
  info!(target: "quiz", %id, count = options.number_of_questions, difficulty = options.difficulty.as_str(), "Quiz session created");
  load_session(state, &id, epoch, &source, &options).await
}

/// Generate outside the lock, then apply the result only if `epoch` is still current.
async fn load_session(
  state: &AppState,
  id: &str,
  epoch: u64,
  source: &SourceMaterial,
  options: &GenerationOptions,
) -> Result<QuizOut, ServiceError> {
  let result = generate(state.generator.as_ref(), source, options).await;
  state
    .with_session(id, |s| {
      if let Ok(Effect::Stale) = s.flow.apply(Action::Loaded { epoch, result }) {
        debug!(target: "quiz", %id, epoch, "Load superseded by a newer request");
      }
      to_out(Some(id), &s.flow)
    })
    .await
}

#[instrument(level = "debug", skip(state))]
pub async fn get_quiz(state: &AppState, id: &str) -> Result<QuizOut, ServiceError> {
  state.with_session(id, |s| to_out(Some(id), &s.flow)).await
}

#[instrument(level = "info", skip(state))]
pub async fn select_answer(state: &AppState, id: &str, option_index: usize) -> Result<QuizOut, ServiceError> {
  apply(state, id, Action::SelectAnswer(option_index)).await
}

#[instrument(level = "info", skip(state))]
pub async fn advance(state: &AppState, id: &str) -> Result<QuizOut, ServiceError> {
  apply(state, id, Action::Advance).await
}

/// Restart the attempt with the same quiz, or fetch a fresh one from the stored material.
#[instrument(level = "info", skip(state))]
pub async fn restart(state: &AppState, id: &str, regenerate: bool) -> Result<QuizOut, ServiceError> {
  if !regenerate {
    return apply(state, id, Action::Restart).await;
  }
  let (epoch, source, options) = state
    .with_session(id, |s| (begin_load(&mut s.flow), s.source.clone(), s.options.clone()))
    .await?;
  info!(target: "quiz", %id, epoch, "Regenerating quiz");
  load_session(state, id, epoch, &source, &options).await
}

async fn apply(state: &AppState, id: &str, action: Action) -> Result<QuizOut, ServiceError> {
  state
    .with_session(id, |s| -> Result<QuizOut, ServiceError> {
      let effect = s.flow.apply(action)?;
      debug!(target: "quiz", %id, ?effect, "Playback transition");
      Ok(to_out(Some(id), &s.flow))
    })
    .await?
}

#[instrument(level = "info", skip(state))]
pub async fn delete_quiz(state: &AppState, id: &str) -> Result<(), ServiceError> {
  if state.remove_session(id).await {
    Ok(())
  } else {
    Err(ServiceError::NotFound(id.to_string()))
  }
}

/// Stateless: nothing is stored, the reviewer text is returned directly.
#[instrument(level = "info", skip(state, input), fields(content_len = input.content.len()))]
pub async fn create_reviewer(state: &AppState, input: &ReviewerIn) -> Result<ReviewerOut, ServiceError> {
  let source = input.source()?;
  let options = input.options(&state.defaults);
  match state.reviewer.generate_reviewer(&source, &options).await {
    Ok(content) => {
      info!(target: "quiz", detail = ?options.detail_level, format = ?options.format, len = content.len(), "Reviewer created");
      Ok(ReviewerOut { content, detail_level: options.detail_level, format: options.format, language: options.language })
    }
    Err(e) => {
      error!(target: "quiz", error = %e, "Reviewer generation failed");
      Err(ServiceError::ReviewerFailed)
    }
  }
}

/// Connection-owned variant used by the WebSocket loop: the flow lives with the socket.
#[instrument(level = "info", skip_all, fields(source_len = source.as_str().len()))]
pub async fn load_owned(
  generator: &dyn QuizGenerator,
  flow: &mut QuizFlow,
  source: &SourceMaterial,
  options: &GenerationOptions,
) -> QuizOut {
  let epoch = begin_load(flow);
  let result = generate(generator, source, options).await;
  if let Ok(Effect::Stale) = flow.apply(Action::Loaded { epoch, result }) {
    debug!(target: "quiz", epoch, "Load superseded by a newer request");
  }
  to_out(None, flow)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;

  use async_trait::async_trait;
  use tokio::sync::Notify;

  use crate::domain::Question;
  use crate::error::PlaybackError;
  use crate::playback::Phase;
  use crate::protocol::OptionsIn;

  fn two_questions() -> Quiz {
    Quiz::new(vec![
      Question::new("Capital of France?", vec!["Paris".into(), "Rome".into(), "Berlin".into(), "Madrid".into()], 0).unwrap(),
      Question::new("2+2?", vec!["3".into(), "4".into(), "5".into(), "6".into()], 1).unwrap(),
    ])
  }

  struct Fixed(Result<Quiz, u16>);

  #[async_trait]
  impl QuizGenerator for Fixed {
    fn name(&self) -> &'static str { "fixed" }
    async fn generate(&self, _: &SourceMaterial, _: &GenerationOptions) -> Result<Quiz, GenerationError> {
      self.0.clone().map_err(|status| GenerationError::Api { status, message: "boom".into() })
    }
  }

  fn state_with(result: Result<Quiz, u16>) -> AppState {
    AppState::new(Arc::new(Fixed(result)), GenerationOptions::default())
  }

  fn input(text: &str) -> NewQuizIn {
    NewQuizIn { text: Some(text.into()), ..Default::default() }
  }

  #[tokio::test]
  async fn full_attempt_through_the_session_store() {
    let state = state_with(Ok(two_questions()));
    let out = create_quiz(&state, &input("notes")).await.unwrap();
    let id = out.id.clone().unwrap();
    assert_eq!(out.phase, Phase::Ready);
    assert_eq!(out.total, Some(2));

    assert_eq!(select_answer(&state, &id, 0).await.unwrap().score, Some(1));
    assert_eq!(advance(&state, &id).await.unwrap().current_index, Some(1));
    select_answer(&state, &id, 2).await.unwrap();
    let done = advance(&state, &id).await.unwrap();
    assert_eq!(done.phase, Phase::Completed);
    assert_eq!(done.score, Some(1));
    assert_eq!(done.outcome, Some(crate::domain::Outcome::Pass));

    let again = restart(&state, &id, false).await.unwrap();
    assert_eq!(again.phase, Phase::Ready);
    assert_eq!(again.score, Some(0));
    assert_eq!(again.current_index, Some(0));
  }

  #[tokio::test]
  async fn empty_and_failed_generation_are_distinct() {
    let empty = create_quiz(&state_with(Ok(Quiz::default())), &input("x")).await.unwrap();
    assert_eq!(empty.phase, Phase::NoQuestions);
    assert_eq!(empty.score, None);

    let failed = create_quiz(&state_with(Err(502)), &input("x")).await.unwrap();
    assert_eq!(failed.phase, Phase::Error);
    assert!(!failed.message.unwrap().is_empty());
    assert_eq!(failed.score, None);
  }

  #[tokio::test]
  async fn input_errors_create_no_session() {
    let state = state_with(Ok(two_questions()));
    let err = create_quiz(&state, &input("   ")).await.unwrap_err();
    assert!(matches!(err, ServiceError::Input(_)));

    let bad = NewQuizIn {
      text: Some("notes".into()),
      options: Some(OptionsIn { number_of_questions: Some(0), ..Default::default() }),
      ..Default::default()
    };
    assert!(create_quiz(&state, &bad).await.is_err());
    assert_eq!(state.session_count().await, 0);
  }

  #[tokio::test]
  async fn rejected_transitions_surface_as_errors() {
    let state = state_with(Ok(two_questions()));
    let id = create_quiz(&state, &input("notes")).await.unwrap().id.unwrap();

    assert_eq!(
      advance(&state, &id).await.unwrap_err(),
      ServiceError::Playback(PlaybackError::NoAnswerSelected)
    );
    assert_eq!(
      select_answer(&state, &id, 9).await.unwrap_err(),
      ServiceError::Playback(PlaybackError::InvalidSelection { index: 9, options: 4 })
    );
    assert_eq!(
      get_quiz(&state, "missing").await.unwrap_err(),
      ServiceError::NotFound("missing".into())
    );
  }

  #[tokio::test]
  async fn delete_removes_the_session() {
    let state = state_with(Ok(two_questions()));
    let id = create_quiz(&state, &input("notes")).await.unwrap().id.unwrap();
    delete_quiz(&state, &id).await.unwrap();
    assert!(matches!(get_quiz(&state, &id).await, Err(ServiceError::NotFound(_))));
    assert!(delete_quiz(&state, &id).await.is_err());
  }

  /// First call blocks until released and returns two questions; later calls return one.
  struct Gated {
    calls: AtomicUsize,
    release: Notify,
    entered: Notify,
  }

  #[async_trait]
  impl QuizGenerator for Gated {
    fn name(&self) -> &'static str { "gated" }
    async fn generate(&self, _: &SourceMaterial, _: &GenerationOptions) -> Result<Quiz, GenerationError> {
      let n = self.calls.fetch_add(1, Ordering::SeqCst);
      if n == 1 {
        self.entered.notify_one();
        self.release.notified().await;
        return Ok(two_questions());
      }
      Ok(Quiz::new(vec![two_questions().questions()[0].clone()]))
    }
  }

  #[tokio::test]
  async fn late_result_from_superseded_regeneration_is_dropped() {
    let gated = Arc::new(Gated { calls: AtomicUsize::new(0), release: Notify::new(), entered: Notify::new() });
    let state = AppState::new(gated.clone(), GenerationOptions::default());
    let id = create_quiz(&state, &input("notes")).await.unwrap().id.unwrap();

    // Second generation call (first regenerate) hangs until released.
    let slow = {
      let state = state.clone();
      let id = id.clone();
      tokio::spawn(async move { restart(&state, &id, true).await })
    };
    gated.entered.notified().await;

    // A newer regenerate completes first.
    let fresh = restart(&state, &id, true).await.unwrap();
    assert_eq!(fresh.total, Some(1));

    gated.release.notify_one();
    let late = slow.await.unwrap().unwrap();
    assert_eq!(late.total, Some(1));
    assert_eq!(get_quiz(&state, &id).await.unwrap().total, Some(1));
  }

  #[tokio::test]
  async fn owned_flow_loads_and_plays() {
    let mut flow = QuizFlow::new();
    let source = SourceMaterial::from_text("notes").unwrap();
    let out = load_owned(&Fixed(Ok(two_questions())), &mut flow, &source, &GenerationOptions::default()).await;
    assert_eq!(out.phase, Phase::Ready);
    assert!(out.id.is_none());
    assert_eq!(flow.epoch(), 1);
  }
}
