//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Grading a submission against the active session
//!   - Validating and saving authored problems
//!
//! Submissions are serialized through the state's grading mutex: while one
//! runs, a second is rejected instead of queued, so a hung evaluation can
//! never stack up work behind it.

use tracing::{debug, error, info, instrument, warn};

use crate::domain::{
  Category, Difficulty, Problem, ProblemSource, StarterCode, TestCase,
};
use crate::engine::Engine;
use crate::predicate::Predicate;
use crate::state::AppState;
use crate::transform::transform;
use crate::util::{is_blank, trunc_for_log};

/// What one submission attempt produced.
#[derive(Clone, Debug)]
pub enum SubmitOutcome {
  AllPassed { cases: Vec<TestCase>, passed_count: usize },
  SomeFailed { cases: Vec<TestCase>, passed_count: usize, total: usize },
  /// The submitted source itself failed to evaluate; every case shares the
  /// message.
  ExecutionError { cases: Vec<TestCase>, message: String },
  /// Nothing was graded: no active session, or grading already in progress.
  Rejected { message: String },
}

/// Grade `source` against the active session's problem.
#[instrument(level = "info", skip(state, source), fields(source_len = source.len()))]
pub async fn submit(state: &AppState, source: &str) -> SubmitOutcome {
  let Some(session) = state.session_snapshot().await else {
    return SubmitOutcome::Rejected { message: "No problem selected.".into() };
  };
  let Ok(_guard) = state.grading.try_lock() else {
    warn!(target: "grader", problem = %session.problem_id, "submission rejected: grading already in progress");
    return SubmitOutcome::Rejected { message: "A submission is already being graded.".into() };
  };

  let Some(problem) = state.get_problem(&session.problem_id).await else {
    return SubmitOutcome::Rejected { message: "Selected problem no longer exists.".into() };
  };

  debug!(target: "grader", problem = %problem.id, dialect = ?session.dialect, source = %trunc_for_log(source, 200), "grading submission");
  let plain = transform(source, session.dialect);
  let result = Engine::new().run(&plain, &session.cases, &problem.exposes);
  state.set_session_results(&problem.id, session.dialect, result.cases.clone()).await;

  if let Some(message) = result.execution_error {
    debug!(target: "grader", problem = %problem.id, "submission failed to evaluate");
    return SubmitOutcome::ExecutionError { cases: result.cases, message };
  }
  if result.all_passed {
    let newly = state.mark_solved(&problem.id).await;
    info!(target: "grader", problem = %problem.id, newly_solved = newly, "all test cases passed");
    SubmitOutcome::AllPassed { cases: result.cases, passed_count: result.passed_count }
  } else {
    let total = result.cases.len();
    SubmitOutcome::SomeFailed { cases: result.cases, passed_count: result.passed_count, total }
  }
}

/// An authored problem as it arrives from the editor, before validation.
#[derive(Clone, Debug)]
pub struct ProblemDraft {
  pub id: String,
  pub title: String,
  pub description: String,
  pub difficulty: Difficulty,
  pub category: Category,
  pub starter_javascript: String,
  pub starter_typescript: String,
  pub exposes: Vec<String>,
  pub test_cases: Vec<TestCaseDraft>,
}

#[derive(Clone, Debug)]
pub struct TestCaseDraft {
  pub id: u32,
  pub description: String,
  pub predicate_source: String,
}

/// Structural validation. Returns every violation found, not just the first.
pub fn validate_problem(draft: &ProblemDraft) -> Vec<String> {
  let mut errors = Vec::new();
  if is_blank(&draft.id) {
    errors.push("Problem ID is required".to_string());
  }
  if is_blank(&draft.title) {
    errors.push("Problem title is required".to_string());
  }
  if is_blank(&draft.description) {
    errors.push("Problem description is required".to_string());
  }
  if draft.test_cases.is_empty() {
    errors.push("At least one test case is required".to_string());
  }
  let mut seen = std::collections::HashSet::new();
  for case in &draft.test_cases {
    if !seen.insert(case.id) {
      errors.push(format!("Duplicate test case id {}", case.id));
    }
    if is_blank(&case.description) {
      errors.push(format!("Test case {} needs a description", case.id));
    }
  }
  errors
}

/// Validate and persist an authored problem.
///
/// A test case whose predicate fails to compile keeps the previously saved
/// predicate for that case id when one exists; a brand-new case with a
/// broken predicate is an error.
#[instrument(level = "info", skip(state, draft), fields(id = %draft.id))]
pub async fn save_authored_problem(
  state: &AppState,
  draft: ProblemDraft,
) -> Result<Problem, Vec<String>> {
  let mut errors = validate_problem(&draft);

  let existing = state.get_problem(&draft.id).await;
  if let Some(existing) = &existing {
    if !existing.editable() {
      return Err(vec![format!("Problem '{}' is read-only", draft.id)]);
    }
  }

  let mut cases = Vec::with_capacity(draft.test_cases.len());
  for case in &draft.test_cases {
    match Predicate::compile(&case.predicate_source) {
      Ok(p) => cases.push(TestCase::new(case.id, case.description.clone(), p)),
      Err(e) => {
        let previous = existing
          .as_ref()
          .and_then(|p| p.test_cases.iter().find(|c| c.id == case.id))
          .map(|c| c.predicate.clone());
        match previous {
          Some(p) => {
            // Keep the last predicate that compiled for this slot.
            warn!(target: "problem", problem = %draft.id, case = case.id, %e, "new predicate does not compile, keeping previous");
            cases.push(TestCase::new(case.id, case.description.clone(), p));
          }
          None => errors.push(format!("Test case {}: {}", case.id, e)),
        }
      }
    }
  }

  if !errors.is_empty() {
    return Err(errors);
  }

  let problem = Problem {
    id: draft.id,
    title: draft.title,
    description: draft.description,
    difficulty: draft.difficulty,
    category: draft.category,
    starter_code: StarterCode {
      javascript: draft.starter_javascript,
      typescript: draft.starter_typescript,
    },
    exposes: draft.exposes,
    test_cases: cases,
    source: ProblemSource::Authored,
  };
  if let Err(e) = state.save_custom_problem(problem.clone()).await {
    error!(target: "codegym_backend", error = %e, "Failed to persist authored problems");
    return Err(vec!["Failed to save problem to disk".to_string()]);
  }
  Ok(problem)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::storage::Storage;
  use std::collections::{HashMap, HashSet};
  use std::sync::Arc;
  use tokio::sync::{Mutex, RwLock};
  use uuid::Uuid;

  fn temp_state() -> AppState {
    let storage =
      Storage::new(std::env::temp_dir().join(format!("codegym-session-{}", Uuid::new_v4())));
    let mut by_id = HashMap::new();
    let mut order = Vec::new();
    for p in crate::seeds::seed_problems() {
      order.push(p.id.clone());
      by_id.insert(p.id.clone(), p);
    }
    AppState {
      by_id: Arc::new(RwLock::new(by_id)),
      order: Arc::new(RwLock::new(order)),
      solved: Arc::new(RwLock::new(HashSet::new())),
      session: Arc::new(RwLock::new(None)),
      grading: Arc::new(Mutex::new(())),
      storage,
    }
  }

  fn draft(id: &str) -> ProblemDraft {
    ProblemDraft {
      id: id.to_string(),
      title: "Triple It".into(),
      description: "Write a function `triple`.".into(),
      difficulty: Difficulty::Easy,
      category: Category::JavaScript,
      starter_javascript: "function triple(n) {\n}\n".into(),
      starter_typescript: "function triple(n: number): number {\n}\n".into(),
      exposes: vec!["triple".into()],
      test_cases: vec![TestCaseDraft {
        id: 1,
        description: "triples".into(),
        predicate_source: "() => triple(2) === 6".into(),
      }],
    }
  }

  #[tokio::test]
  async fn submit_without_session_is_rejected() {
    let state = temp_state();
    let outcome = submit(&state, "function add(a, b) { return a + b; }").await;
    assert!(matches!(outcome, SubmitOutcome::Rejected { .. }));
  }

  #[tokio::test]
  async fn passing_submission_marks_solved() {
    let state = temp_state();
    state.select_problem("sum-two-numbers").await.expect("session");
    let outcome = submit(&state, "function add(a, b) { return a + b; }").await;
    match outcome {
      SubmitOutcome::AllPassed { passed_count, .. } => assert_eq!(passed_count, 5),
      other => panic!("expected AllPassed, got {other:?}"),
    }
    assert!(state.is_solved("sum-two-numbers").await);
  }

  #[tokio::test]
  async fn failing_submission_does_not_unsolve() {
    let state = temp_state();
    state.select_problem("sum-two-numbers").await.expect("session");
    submit(&state, "function add(a, b) { return a + b; }").await;
    assert!(state.is_solved("sum-two-numbers").await);
    let outcome = submit(&state, "function add(a, b) { return a - b; }").await;
    assert!(matches!(outcome, SubmitOutcome::SomeFailed { .. }));
    assert!(state.is_solved("sum-two-numbers").await);
  }

  #[tokio::test]
  async fn syntax_error_reports_execution_error() {
    let state = temp_state();
    state.select_problem("sum-two-numbers").await.expect("session");
    let outcome = submit(&state, "function add(a, b) {").await;
    match outcome {
      SubmitOutcome::ExecutionError { message, cases } => {
        assert!(message.starts_with("Execution error: "));
        assert!(cases.iter().all(|c| c.passed == Some(false)));
      }
      other => panic!("expected ExecutionError, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn typescript_session_strips_types_before_grading() {
    let state = temp_state();
    state.select_problem("sum-two-numbers").await.expect("session");
    state.change_dialect(crate::domain::Dialect::Typescript).await.expect("session");
    let outcome = submit(
      &state,
      "function add(a: number, b: number): number {\n  return a + b;\n}",
    )
    .await;
    assert!(matches!(outcome, SubmitOutcome::AllPassed { .. }));
  }

  #[test]
  fn validation_collects_every_problem() {
    let mut d = draft("");
    d.title = String::new();
    d.test_cases.clear();
    let errors = validate_problem(&d);
    assert!(errors.contains(&"Problem ID is required".to_string()));
    assert!(errors.contains(&"Problem title is required".to_string()));
    assert!(errors.contains(&"At least one test case is required".to_string()));
  }

  #[test]
  fn validation_flags_duplicate_case_ids() {
    let mut d = draft("dup");
    d.test_cases.push(TestCaseDraft {
      id: 1,
      description: "again".into(),
      predicate_source: "() => true".into(),
    });
    assert!(validate_problem(&d).contains(&"Duplicate test case id 1".to_string()));
  }

  #[tokio::test]
  async fn authored_problems_save_and_reload() {
    let state = temp_state();
    let saved = save_authored_problem(&state, draft("triple-it")).await.expect("save");
    assert_eq!(saved.source, ProblemSource::Authored);
    assert!(state.get_problem("triple-it").await.is_some());
  }

  #[tokio::test]
  async fn seed_problems_are_read_only() {
    let state = temp_state();
    let err = save_authored_problem(&state, draft("sum-two-numbers")).await.expect_err("err");
    assert_eq!(err, vec!["Problem 'sum-two-numbers' is read-only".to_string()]);
  }

  #[tokio::test]
  async fn broken_predicate_keeps_last_known_good() {
    let state = temp_state();
    save_authored_problem(&state, draft("triple-it")).await.expect("save");

    let mut edited = draft("triple-it");
    edited.test_cases[0].predicate_source = "() =>".into();
    let saved = save_authored_problem(&state, edited).await.expect("save keeps previous");
    assert_eq!(saved.test_cases[0].predicate.source(), "() => triple(2) === 6");
  }

  #[tokio::test]
  async fn broken_predicate_on_new_case_is_an_error() {
    let state = temp_state();
    let mut d = draft("quad-it");
    d.test_cases[0].predicate_source = "() =>".into();
    let err = save_authored_problem(&state, d).await.expect_err("err");
    assert!(err.iter().any(|e| e.starts_with("Test case 1:")));
  }
}
