//! WebSocket upgrade + message loop. Each connection owns one quiz flow; client messages
//! are parsed as JSON and applied in order. We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument};

use crate::domain::{GenerationOptions, SourceMaterial};
use crate::logic::load_owned;
use crate::playback::{Action, QuizFlow};
use crate::protocol::{to_out, ClientWsMessage, ServerWsMessage};
use crate::state::AppState;

/// Per-connection state: the flow plus what is needed to regenerate it.
#[derive(Default)]
struct Connection {
  flow: QuizFlow,
  loaded_from: Option<(SourceMaterial, GenerationOptions)>,
}

#[instrument(level = "info", skip(ws, state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "pic2quiz", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "pic2quiz", "WebSocket connected");
  let mut conn = Connection::default();
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "pic2quiz", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state, &mut conn).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "pic2quiz", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "pic2quiz", "WebSocket disconnected");
}

#[instrument(level = "info", skip(state, conn))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState, conn: &mut Connection) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::NewQuiz(input) => {
      let prepared = input
        .source()
        .and_then(|source| input.options(&state.defaults).map(|options| (source, options)));
      match prepared {
        Ok((source, options)) => {
          let quiz = load_owned(state.generator.as_ref(), &mut conn.flow, &source, &options).await;
          info!(target: "quiz", phase = ?quiz.phase, total = ?quiz.total, "WS quiz loaded");
          conn.loaded_from = Some((source, options));
          ServerWsMessage::State { quiz }
        }
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::SelectAnswer { option_index } => apply(conn, Action::SelectAnswer(option_index)),

    ClientWsMessage::Advance => apply(conn, Action::Advance),

    ClientWsMessage::Restart { regenerate: false } => apply(conn, Action::Restart),

    ClientWsMessage::Restart { regenerate: true } => match &conn.loaded_from {
      Some((source, options)) => {
        let quiz = load_owned(state.generator.as_ref(), &mut conn.flow, source, options).await;
        ServerWsMessage::State { quiz }
      }
      None => ServerWsMessage::Error { message: "No quiz has been requested on this connection.".into() },
    },
  }
}

fn apply(conn: &mut Connection, action: Action) -> ServerWsMessage {
  match conn.flow.apply(action) {
    Ok(_) => ServerWsMessage::State { quiz: to_out(None, &conn.flow) },
    Err(e) => ServerWsMessage::Error { message: e.to_string() },
  }
}
