//! Router assembly: HTTP endpoints, WebSocket upgrade, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws` (one connection-owned quiz flow per socket)
/// - REST-ish API under `/api/v1/...` (sessions kept in the shared store)
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // HTTP API
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/quiz", post(http::http_create_quiz))
        .route(
            "/api/v1/quiz/:id",
            get(http::http_get_quiz).delete(http::http_delete_quiz),
        )
        .route("/api/v1/quiz/:id/answer", post(http::http_post_answer))
        .route("/api/v1/quiz/:id/next", post(http::http_post_next))
        .route("/api/v1/quiz/:id/restart", post(http::http_post_restart))
        .route("/api/v1/reviewer", post(http::http_create_reviewer))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::domain::{GenerationOptions, Question, Quiz, SourceMaterial};
    use crate::error::GenerationError;
    use crate::generator::{QuizGenerator, ReviewerGenerator};
    use crate::reviewer::ReviewerOptions;

    struct Stub;

    #[async_trait]
    impl ReviewerGenerator for Stub {
        async fn generate_reviewer(
            &self,
            source: &SourceMaterial,
            options: &ReviewerOptions,
        ) -> Result<String, GenerationError> {
            match source.as_str() {
                "fail" => Err(GenerationError::EmptyCompletion),
                text => Ok(format!("# {} ({:?}, {:?})", text, options.detail_level, options.format)),
            }
        }
    }

    #[async_trait]
    impl QuizGenerator for Stub {
        fn name(&self) -> &'static str {
            "stub"
        }
        async fn generate(
            &self,
            source: &SourceMaterial,
            _: &GenerationOptions,
        ) -> Result<Quiz, GenerationError> {
            match source.as_str() {
                "fail" => Err(GenerationError::Api { status: 500, message: "down".into() }),
                "nothing" => Ok(Quiz::default()),
                _ => Ok(Quiz::new(vec![
                    Question::new("Capital of France?", vec!["Paris".into(), "Rome".into(), "Berlin".into(), "Madrid".into()], 0)
                        .unwrap(),
                    Question::new("2+2?", vec!["3".into(), "4".into(), "5".into(), "6".into()], 1).unwrap(),
                ])),
            }
        }
    }

    fn app() -> Router {
        build_router(Arc::new(
            AppState::new(Arc::new(Stub), GenerationOptions::default()).with_reviewer(Arc::new(Stub)),
        ))
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let res = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    #[tokio::test]
    async fn health_reports_generator() {
        let (status, body) = call(&app(), Method::GET, "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true, "generator": "stub" }));
    }

    #[tokio::test]
    async fn plays_a_quiz_over_http() {
        let app = app();
        let (status, created) =
            call(&app, Method::POST, "/api/v1/quiz", Some(json!({ "pages": ["page one", "page two"] }))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["phase"], "ready");
        assert_eq!(created["total"], 2);
        assert_eq!(created["question"]["prompt"], "Capital of France?");
        assert!(created.get("correctOptionIndex").is_none());
        let id = created["id"].as_str().unwrap().to_string();

        let (_, answered) =
            call(&app, Method::POST, &format!("/api/v1/quiz/{id}/answer"), Some(json!({ "optionIndex": 0 }))).await;
        assert_eq!(answered["phase"], "answer_revealed");
        assert_eq!(answered["score"], 1);
        assert_eq!(answered["correctOptionIndex"], 0);

        call(&app, Method::POST, &format!("/api/v1/quiz/{id}/next"), None).await;
        call(&app, Method::POST, &format!("/api/v1/quiz/{id}/answer"), Some(json!({ "optionIndex": 2 }))).await;
        let (_, done) = call(&app, Method::POST, &format!("/api/v1/quiz/{id}/next"), None).await;
        assert_eq!(done["phase"], "completed");
        assert_eq!(done["score"], 1);
        assert_eq!(done["outcome"], "pass");

        let (_, restarted) =
            call(&app, Method::POST, &format!("/api/v1/quiz/{id}/restart"), Some(json!({}))).await;
        assert_eq!(restarted["phase"], "ready");
        assert_eq!(restarted["score"], 0);

        let (status, _) = call(&app, Method::DELETE, &format!("/api/v1/quiz/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = call(&app, Method::GET, &format!("/api/v1/quiz/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["kind"], "not_found");
    }

    #[tokio::test]
    async fn error_and_empty_results_render_differently() {
        let app = app();
        let (_, failed) = call(&app, Method::POST, "/api/v1/quiz", Some(json!({ "text": "fail" }))).await;
        assert_eq!(failed["phase"], "error");
        assert!(failed["message"].as_str().is_some());

        let (_, empty) = call(&app, Method::POST, "/api/v1/quiz", Some(json!({ "text": "nothing" }))).await;
        assert_eq!(empty["phase"], "no_questions");
        assert!(empty.get("score").is_none());
    }

    #[tokio::test]
    async fn rejected_requests_map_to_status_codes() {
        let app = app();
        let (status, body) = call(&app, Method::POST, "/api/v1/quiz", Some(json!({ "text": "  " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_input");

        let (_, created) = call(&app, Method::POST, "/api/v1/quiz", Some(json!({ "text": "notes" }))).await;
        let id = created["id"].as_str().unwrap().to_string();

        let (status, body) =
            call(&app, Method::POST, &format!("/api/v1/quiz/{id}/answer"), Some(json!({ "optionIndex": 7 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_selection");

        let (status, body) = call(&app, Method::POST, &format!("/api/v1/quiz/{id}/next"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["kind"], "no_answer_selected");
    }

    #[tokio::test]
    async fn reviewer_endpoint_resolves_options() {
        let app = app();
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/v1/reviewer",
            Some(json!({ "content": "Cells", "detailLevel": "main-ideas", "format": "sonnet", "language": "Filipino" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["content"], "# Cells (MainIdeas, BulletPoints)");
        assert_eq!(body["detailLevel"], "main-ideas");
        assert_eq!(body["format"], "bullet-points");
        assert_eq!(body["language"], "Filipino");
    }

    #[tokio::test]
    async fn reviewer_failures_map_to_status_codes() {
        let app = app();
        let (status, body) = call(&app, Method::POST, "/api/v1/reviewer", Some(json!({ "content": "fail" }))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["kind"], "generation_failed");
        assert_eq!(body["error"], "Failed to generate reviewer content");

        let (status, body) = call(&app, Method::POST, "/api/v1/reviewer", Some(json!({ "content": " " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_input");
    }
}
