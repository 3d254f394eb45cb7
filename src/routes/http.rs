//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs include parameters and basic result info.

use std::sync::Arc;
use axum::{
  extract::{Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument};

use crate::protocol::*;
use crate::session::{save_authored_problem, submit};
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_list_problems(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let problems = state.list_problems().await;
  let mut out = Vec::with_capacity(problems.len());
  for p in &problems {
    let solved = state.is_solved(&p.id).await;
    out.push(summary_out(p, solved));
  }
  info!(target: "problem", count = out.len(), "HTTP problem list served");
  Json(out)
}

#[instrument(level = "info", skip(state), fields(%q.id))]
pub async fn http_get_problem(
  State(state): State<Arc<AppState>>,
  Query(q): Query<ProblemQuery>,
) -> Response {
  match state.get_problem(&q.id).await {
    Some(p) => Json(problem_out(&p)).into_response(),
    None => (
      StatusCode::NOT_FOUND,
      Json(ErrorOut { message: format!("Unknown problem id: {}", q.id) }),
    )
      .into_response(),
  }
}

#[instrument(level = "info", skip(state, body), fields(%body.problem_id))]
pub async fn http_post_select(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SelectIn>,
) -> Response {
  match state.select_problem(&body.problem_id).await {
    Some(session) => {
      // select_problem only returns a session for an existing problem.
      let problem = state.get_problem(&session.problem_id).await;
      match problem {
        Some(p) => {
          info!(target: "problem", id = %p.id, "HTTP problem selected");
          Json(serde_json::json!({
            "problem": problem_out(&p),
            "dialect": session.dialect,
          }))
          .into_response()
        }
        None => (
          StatusCode::NOT_FOUND,
          Json(ErrorOut { message: format!("Unknown problem id: {}", body.problem_id) }),
        )
          .into_response(),
      }
    }
    None => (
      StatusCode::NOT_FOUND,
      Json(ErrorOut { message: format!("Unknown problem id: {}", body.problem_id) }),
    )
      .into_response(),
  }
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_dialect(
  State(state): State<Arc<AppState>>,
  Json(body): Json<DialectIn>,
) -> Response {
  match state.change_dialect(body.dialect).await {
    Some(session) => Json(serde_json::json!({
      "dialect": session.dialect,
      "cases": session_cases_out(&session),
    }))
    .into_response(),
    None => (
      StatusCode::CONFLICT,
      Json(ErrorOut { message: "No problem selected.".into() }),
    )
      .into_response(),
  }
}

#[instrument(level = "info", skip(state, body), fields(source_len = body.source.len()))]
pub async fn http_post_submit(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SubmitIn>,
) -> impl IntoResponse {
  let outcome = submit(&state, &body.source).await;
  Json(submit_out(&outcome))
}

#[instrument(level = "info", skip(state, body), fields(id = %body.id))]
pub async fn http_save_problem(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ProblemIn>,
) -> Response {
  match save_authored_problem(&state, body.into()).await {
    Ok(p) => {
      info!(target: "problem", id = %p.id, "HTTP problem saved");
      Json(problem_out(&p)).into_response()
    }
    Err(errors) => (
      StatusCode::UNPROCESSABLE_ENTITY,
      Json(serde_json::json!({ "errors": errors })),
    )
      .into_response(),
  }
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_solved(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(state.solved_ids().await)
}
