//! Application state: the problem catalog, the solved set, and the active
//! grading session.
//!
//! This module owns:
//!   - the catalog (by id, plus insertion order for stable listings)
//!   - the set of solved problem ids, persisted to disk
//!   - the current session (selected problem, dialect, live case results)
//!   - the grading mutex that serializes submissions

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, instrument, warn};

use crate::config::{bank_problem, load_problem_bank_from_env};
use crate::domain::{Dialect, Problem, ProblemSource, TestCase};
use crate::seeds::seed_problems;
use crate::storage::Storage;

/// The currently selected problem plus its per-case result state. Results
/// live here, not in the catalog, so reselecting a problem always starts
/// from a clean slate.
#[derive(Clone, Debug)]
pub struct Session {
    pub problem_id: String,
    pub dialect: Dialect,
    pub cases: Vec<TestCase>,
}

#[derive(Clone)]
pub struct AppState {
    pub by_id: Arc<RwLock<HashMap<String, Problem>>>,
    pub order: Arc<RwLock<Vec<String>>>,
    pub solved: Arc<RwLock<HashSet<String>>>,
    pub session: Arc<RwLock<Option<Session>>>,
    /// Held for the duration of one grading pass; a second concurrent
    /// submission is rejected rather than queued.
    pub grading: Arc<Mutex<()>>,
    pub storage: Storage,
}

impl AppState {
    /// Build state from env: seed catalog, optional TOML bank, persisted
    /// authored problems and solved set.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let storage = Storage::from_env();

        let mut by_id = HashMap::<String, Problem>::new();
        let mut order = Vec::<String>::new();

        for p in seed_problems() {
            order.push(p.id.clone());
            by_id.insert(p.id.clone(), p);
        }

        // Bank entries supplement the seeds but never overwrite them.
        if let Some(bank) = load_problem_bank_from_env() {
            for cfg in bank.problems {
                let Some(p) = bank_problem(cfg) else { continue };
                if by_id.contains_key(&p.id) {
                    warn!(target: "problem", id = %p.id, "bank entry collides with an existing id, skipping");
                    continue;
                }
                order.push(p.id.clone());
                by_id.insert(p.id.clone(), p);
            }
        }

        for p in storage.load_custom_problems() {
            if by_id.contains_key(&p.id) {
                warn!(target: "problem", id = %p.id, "stored problem collides with an existing id, skipping");
                continue;
            }
            order.push(p.id.clone());
            by_id.insert(p.id.clone(), p);
        }

        // Inventory summary by source.
        let mut counts = HashMap::<ProblemSource, usize>::new();
        for p in by_id.values() {
            *counts.entry(p.source).or_insert(0) += 1;
        }
        info!(
            target: "problem",
            seed = counts.get(&ProblemSource::Seed).copied().unwrap_or(0),
            config_bank = counts.get(&ProblemSource::ConfigBank).copied().unwrap_or(0),
            authored = counts.get(&ProblemSource::Authored).copied().unwrap_or(0),
            "Startup problem inventory"
        );

        let solved: HashSet<String> = storage
            .load_solved()
            .into_iter()
            .filter(|id| {
                let known = by_id.contains_key(id);
                if !known {
                    warn!(target: "problem", %id, "solved id no longer in catalog, ignoring");
                }
                known
            })
            .collect();

        Self {
            by_id: Arc::new(RwLock::new(by_id)),
            order: Arc::new(RwLock::new(order)),
            solved: Arc::new(RwLock::new(solved)),
            session: Arc::new(RwLock::new(None)),
            grading: Arc::new(Mutex::new(())),
            storage,
        }
    }

    /// Catalog in insertion order (seeds first, then bank, then authored).
    #[instrument(level = "debug", skip(self))]
    pub async fn list_problems(&self) -> Vec<Problem> {
        let by_id = self.by_id.read().await;
        let order = self.order.read().await;
        order.iter().filter_map(|id| by_id.get(id).cloned()).collect()
    }

    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn get_problem(&self, id: &str) -> Option<Problem> {
        self.by_id.read().await.get(id).cloned()
    }

    pub async fn solved_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.solved.read().await.iter().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn is_solved(&self, id: &str) -> bool {
        self.solved.read().await.contains(id)
    }

    /// Add to the solved set; returns false when already present. The set is
    /// append-only: later failed attempts never remove an id.
    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn mark_solved(&self, id: &str) -> bool {
        let newly = self.solved.write().await.insert(id.to_string());
        if newly {
            let ids = self.solved_ids().await;
            if let Err(e) = self.storage.save_solved(&ids) {
                error!(target: "codegym_backend", error = %e, "Failed to persist solved set");
            }
        }
        newly
    }

    /// Start a session on a problem. Dialect resets to JavaScript and all
    /// case results reset to the unset state.
    #[instrument(level = "info", skip(self), fields(%id))]
    pub async fn select_problem(&self, id: &str) -> Option<Session> {
        let problem = self.get_problem(id).await?;
        let mut cases = problem.test_cases.clone();
        for c in &mut cases {
            c.reset();
        }
        let session = Session {
            problem_id: problem.id.clone(),
            dialect: Dialect::default(),
            cases,
        };
        *self.session.write().await = Some(session.clone());
        Some(session)
    }

    /// Switch the active dialect. Case results reset: results computed for
    /// one dialect's source say nothing about the other's.
    #[instrument(level = "debug", skip(self))]
    pub async fn change_dialect(&self, dialect: Dialect) -> Option<Session> {
        let mut guard = self.session.write().await;
        let session = guard.as_mut()?;
        session.dialect = dialect;
        for c in &mut session.cases {
            c.reset();
        }
        Some(session.clone())
    }

    pub async fn session_snapshot(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    /// Write graded case results back into the session, if it is still on
    /// the same problem and the same dialect the grading ran under. A
    /// dialect switch resets every result to unset; results computed before
    /// the switch must not resurrect afterwards.
    pub async fn set_session_results(&self, problem_id: &str, dialect: Dialect, cases: Vec<TestCase>) {
        let mut guard = self.session.write().await;
        if let Some(session) = guard.as_mut() {
            if session.problem_id == problem_id && session.dialect == dialect {
                session.cases = cases;
            }
        }
    }

    /// Insert or replace an authored problem and persist the authored slice
    /// of the catalog.
    #[instrument(level = "info", skip(self, problem), fields(id = %problem.id))]
    pub async fn save_custom_problem(&self, problem: Problem) -> std::io::Result<()> {
        {
            let mut by_id = self.by_id.write().await;
            let mut order = self.order.write().await;
            if !by_id.contains_key(&problem.id) {
                order.push(problem.id.clone());
            }
            by_id.insert(problem.id.clone(), problem);
        }
        let by_id = self.by_id.read().await;
        let order = self.order.read().await;
        let authored: Vec<Problem> = order
            .iter()
            .filter_map(|id| by_id.get(id))
            .filter(|p| p.source == ProblemSource::Authored)
            .cloned()
            .collect();
        self.storage.save_custom_problems(&authored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_state() -> AppState {
        // Point STATE_DIR nowhere persistent by constructing directly.
        let storage =
            Storage::new(std::env::temp_dir().join(format!("codegym-state-{}", Uuid::new_v4())));
        let mut by_id = HashMap::new();
        let mut order = Vec::new();
        for p in seed_problems() {
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

    #[tokio::test]
    async fn listing_preserves_insertion_order() {
        let state = temp_state();
        let listed: Vec<String> = state.list_problems().await.into_iter().map(|p| p.id).collect();
        let expected: Vec<String> = seed_problems().into_iter().map(|p| p.id).collect();
        assert_eq!(listed, expected);
    }

    #[tokio::test]
    async fn selecting_resets_dialect_and_results() {
        let state = temp_state();
        let session = state.select_problem("sum-two-numbers").await.expect("session");
        assert_eq!(session.dialect, Dialect::Javascript);
        assert!(session.cases.iter().all(|c| c.passed.is_none() && c.error.is_none()));

        state.change_dialect(Dialect::Typescript).await.expect("session");
        let session = state.select_problem("reverse-string").await.expect("session");
        assert_eq!(session.dialect, Dialect::Javascript);
    }

    #[tokio::test]
    async fn dialect_switch_clears_results() {
        let state = temp_state();
        state.select_problem("sum-two-numbers").await.expect("session");
        {
            let mut guard = state.session.write().await;
            let session = guard.as_mut().expect("session");
            session.cases[0].passed = Some(true);
        }
        let session = state.change_dialect(Dialect::Typescript).await.expect("session");
        assert!(session.cases.iter().all(|c| c.passed.is_none()));
        assert_eq!(session.dialect, Dialect::Typescript);
    }

    #[tokio::test]
    async fn selecting_unknown_problem_yields_none() {
        let state = temp_state();
        assert!(state.select_problem("nope").await.is_none());
    }

    #[tokio::test]
    async fn mark_solved_is_idempotent() {
        let state = temp_state();
        assert!(state.mark_solved("sum-two-numbers").await);
        assert!(!state.mark_solved("sum-two-numbers").await);
        assert_eq!(state.solved_ids().await, vec!["sum-two-numbers".to_string()]);
    }

    #[tokio::test]
    async fn stale_results_do_not_apply_to_a_new_session() {
        let state = temp_state();
        let session = state.select_problem("sum-two-numbers").await.expect("session");
        let mut cases = session.cases.clone();
        for c in &mut cases {
            c.passed = Some(true);
        }
        state.select_problem("reverse-string").await.expect("session");
        state.set_session_results("sum-two-numbers", Dialect::Javascript, cases).await;
        let session = state.session_snapshot().await.expect("session");
        assert_eq!(session.problem_id, "reverse-string");
        assert!(session.cases.iter().all(|c| c.passed.is_none()));
    }

    #[tokio::test]
    async fn results_graded_before_a_dialect_switch_are_discarded() {
        let state = temp_state();
        let session = state.select_problem("sum-two-numbers").await.expect("session");
        let mut cases = session.cases.clone();
        for c in &mut cases {
            c.passed = Some(true);
        }
        // The switch happens while those results are still in flight.
        state.change_dialect(Dialect::Typescript).await.expect("session");
        state.set_session_results("sum-two-numbers", Dialect::Javascript, cases).await;
        let session = state.session_snapshot().await.expect("session");
        assert_eq!(session.dialect, Dialect::Typescript);
        assert!(session.cases.iter().all(|c| c.passed.is_none()));
    }
}
