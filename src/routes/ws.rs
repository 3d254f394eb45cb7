//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument};

use crate::protocol::*;
use crate::session::{save_authored_problem, submit};
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "codegym_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "codegym_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target = "codegym_backend", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "codegym_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "codegym_backend", "WebSocket disconnected");
}

#[instrument(level = "info", skip(state, msg))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::ListProblems => {
      let problems = state.list_problems().await;
      let mut out = Vec::with_capacity(problems.len());
      for p in &problems {
        let solved = state.is_solved(&p.id).await;
        out.push(summary_out(p, solved));
      }
      tracing::info!(target: "problem", count = out.len(), "WS problem list served");
      ServerWsMessage::Problems { problems: out }
    }

    ClientWsMessage::SelectProblem { problem_id } => {
      match state.select_problem(&problem_id).await {
        Some(session) => match state.get_problem(&session.problem_id).await {
          Some(p) => {
            tracing::info!(target: "problem", id = %p.id, "WS problem selected");
            ServerWsMessage::ProblemSelected { problem: problem_out(&p), dialect: session.dialect }
          }
          None => ServerWsMessage::Error { message: format!("Unknown problem id: {}", problem_id) },
        },
        None => ServerWsMessage::Error { message: format!("Unknown problem id: {}", problem_id) },
      }
    }

    ClientWsMessage::ChangeDialect { dialect } => {
      match state.change_dialect(dialect).await {
        Some(session) => ServerWsMessage::DialectChanged {
          dialect: session.dialect,
          cases: session_cases_out(&session),
        },
        None => ServerWsMessage::Error { message: "No problem selected.".into() },
      }
    }

    ClientWsMessage::Submit { source } => {
      let outcome = submit(state, &source).await;
      ServerWsMessage::SubmitResult(submit_out(&outcome))
    }

    ClientWsMessage::SaveProblem { problem } => {
      match save_authored_problem(state, problem.into()).await {
        Ok(p) => {
          tracing::info!(target: "problem", id = %p.id, "WS problem saved");
          ServerWsMessage::ProblemSaved { problem: problem_out(&p) }
        }
        Err(errors) => ServerWsMessage::ValidationFailed { errors },
      }
    }

    ClientWsMessage::SolvedList => ServerWsMessage::Solved { ids: state.solved_ids().await },
  }
}
