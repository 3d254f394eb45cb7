//! Domain models used by the backend: problems, test cases, dialects, and
//! per-submission results.

use serde::{Deserialize, Serialize};

use crate::predicate::Predicate;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Difficulty {
  Easy,
  Medium,
  Hard,
}

/// Closed set of catalog categories, matching the browser filter chips.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Category {
  #[serde(rename = "DSA")]
  Dsa,
  #[serde(rename = "CSS")]
  Css,
  JavaScript,
  #[serde(rename = "HTML")]
  Html,
  React,
  #[serde(rename = "Design System")]
  DesignSystem,
  TypeScript,
}

/// Which starter-code variant is active. The typed dialect is downgraded by
/// the source transform before it reaches the engine.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
  Javascript,
  Typescript,
}
impl Default for Dialect {
  fn default() -> Self { Dialect::Javascript }
}

/// Where did the problem come from?
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProblemSource {
  Seed,       // built-in catalog
  ConfigBank, // from user-provided TOML bank
  Authored,   // created in the problem editor, persisted to disk
}

/// Initial source text per dialect.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StarterCode {
  #[serde(default)] pub javascript: String,
  #[serde(default)] pub typescript: String,
}

impl StarterCode {
  pub fn for_dialect(&self, dialect: Dialect) -> &str {
    match dialect {
      Dialect::Javascript => &self.javascript,
      Dialect::Typescript => &self.typescript,
    }
  }
}

/// One boolean check against the submitted source. `passed`/`error` are
/// transient: recomputed on every submission, never persisted.
#[derive(Clone, Debug)]
pub struct TestCase {
  pub id: u32,
  pub description: String,
  pub predicate: Predicate,
  pub passed: Option<bool>,
  pub error: Option<String>,
}

impl TestCase {
  pub fn new(id: u32, description: String, predicate: Predicate) -> Self {
    Self { id, description, predicate, passed: None, error: None }
  }

  /// Back to the unset tri-state (problem selection, dialect switch).
  pub fn reset(&mut self) {
    self.passed = None;
    self.error = None;
  }
}

/// One coding exercise: prompt + starter source + test predicates.
/// Invariants: `id` non-empty and unique in the catalog, ≥ 1 test case.
#[derive(Clone, Debug)]
pub struct Problem {
  pub id: String,
  pub title: String,
  pub description: String,
  pub difficulty: Difficulty,
  pub category: Category,
  pub starter_code: StarterCode,
  /// Top-level names the problem documents (e.g. `add`). The engine clears
  /// these from the namespace before evaluating a submission.
  pub exposes: Vec<String>,
  pub test_cases: Vec<TestCase>,
  pub source: ProblemSource,
}

impl Problem {
  /// Only authored problems may be edited; seeds and bank entries are read-only.
  pub fn editable(&self) -> bool {
    self.source == ProblemSource::Authored
  }
}

/// Derived output of one engine run. Never stored.
#[derive(Clone, Debug)]
pub struct SubmissionResult {
  /// Input cases annotated with results, same order and ids.
  pub cases: Vec<TestCase>,
  pub passed_count: usize,
  pub all_passed: bool,
  /// Set when the submitted source itself failed to evaluate; in that case
  /// every test case carries the same shared message and no predicate ran.
  pub execution_error: Option<String>,
}
