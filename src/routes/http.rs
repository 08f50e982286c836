//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{
  extract::{Path, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument, warn};

use crate::error::{PlaybackError, ServiceError};
use crate::logic;
use crate::protocol::*;
use crate::state::AppState;

impl ServiceError {
  fn status_and_kind(&self) -> (StatusCode, &'static str) {
    match self {
      ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
      ServiceError::Input(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
      ServiceError::Playback(PlaybackError::InvalidSelection { .. }) => (StatusCode::BAD_REQUEST, "invalid_selection"),
      ServiceError::Playback(PlaybackError::NoAnswerSelected) => (StatusCode::CONFLICT, "no_answer_selected"),
      ServiceError::Playback(PlaybackError::AlreadyCompleted) => (StatusCode::CONFLICT, "already_completed"),
      ServiceError::Playback(PlaybackError::NotPlaying) => (StatusCode::CONFLICT, "not_playing"),
      ServiceError::ReviewerFailed => (StatusCode::BAD_GATEWAY, "generation_failed"),
    }
  }
}

impl IntoResponse for ServiceError {
  fn into_response(self) -> Response {
    let (status, kind) = self.status_and_kind();
    warn!(target: "quiz", %status, kind, error = %self, "Request rejected");
    (status, Json(ErrorOut { error: self.to_string(), kind })).into_response()
  }
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, generator: state.generator.name() })
}

#[instrument(level = "info", skip(state, body), fields(text_len = body.text.as_ref().map_or(0, |t| t.len()), pages = body.pages.as_ref().map_or(0, |p| p.len())))]
pub async fn http_create_quiz(
  State(state): State<Arc<AppState>>,
  Json(body): Json<NewQuizIn>,
) -> Result<(StatusCode, Json<QuizOut>), ServiceError> {
  let out = logic::create_quiz(&state, &body).await?;
  info!(target: "quiz", id = ?out.id, phase = ?out.phase, total = ?out.total, "HTTP quiz created");
  Ok((StatusCode::CREATED, Json(out)))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_quiz(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<QuizOut>, ServiceError> {
  logic::get_quiz(&state, &id).await.map(Json)
}

#[instrument(level = "info", skip(state, body), fields(option_index = body.option_index))]
pub async fn http_post_answer(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<AnswerIn>,
) -> Result<Json<QuizOut>, ServiceError> {
  let out = logic::select_answer(&state, &id, body.option_index).await?;
  info!(target: "quiz", %id, score = ?out.score, "HTTP answer recorded");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_next(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<QuizOut>, ServiceError> {
  logic::advance(&state, &id).await.map(Json)
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_restart(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  body: Option<Json<RestartIn>>,
) -> Result<Json<QuizOut>, ServiceError> {
  let regenerate = body.map_or(false, |Json(b)| b.regenerate);
  logic::restart(&state, &id, regenerate).await.map(Json)
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_quiz(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
  logic::delete_quiz(&state, &id).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[instrument(level = "info", skip(state, body), fields(content_len = body.content.len()))]
pub async fn http_create_reviewer(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ReviewerIn>,
) -> Result<Json<ReviewerOut>, ServiceError> {
  logic::create_reviewer(&state, &body).await.map(Json)
}
