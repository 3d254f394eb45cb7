//! Loading an optional problem bank from TOML.
//!
//! See `ProblemBank` for the expected schema. The bank supplements the
//! built-in seed catalog; entries with unusable predicates are skipped.

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::{
  Category, Difficulty, Problem, ProblemSource, StarterCode, TestCase,
};
use crate::predicate::Predicate;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ProblemBank {
  #[serde(default)]
  pub problems: Vec<ProblemCfg>,
}

/// Problem entry accepted in TOML configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct ProblemCfg {
  pub id: String,
  pub title: String,
  pub description: String,
  pub difficulty: Difficulty,
  pub category: Category,
  #[serde(default)] pub starter_javascript: String,
  #[serde(default)] pub starter_typescript: String,
  #[serde(default)] pub exposes: Vec<String>,
  #[serde(default)] pub tests: Vec<TestCfg>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TestCfg {
  pub id: u32,
  pub description: String,
  /// Predicate source text, compiled at load time.
  pub predicate: String,
}

/// Attempt to load `ProblemBank` from PROBLEM_BANK_PATH. On any parsing/IO
/// error, returns None.
pub fn load_problem_bank_from_env() -> Option<ProblemBank> {
  let path = std::env::var("PROBLEM_BANK_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<ProblemBank>(&s) {
      Ok(bank) => {
        info!(target: "codegym_backend", %path, problems = bank.problems.len(), "Loaded problem bank (TOML)");
        Some(bank)
      }
      Err(e) => {
        error!(target: "codegym_backend", %path, error = %e, "Failed to parse TOML problem bank");
        None
      }
    },
    Err(e) => {
      error!(target: "codegym_backend", %path, error = %e, "Failed to read TOML problem bank file");
      None
    }
  }
}

/// Turn a bank entry into a catalog problem. Test cases whose predicates do
/// not compile are dropped with an error log; an entry left with no usable
/// tests is rejected entirely.
pub fn bank_problem(cfg: ProblemCfg) -> Option<Problem> {
  if cfg.id.trim().is_empty() {
    error!(target: "problem", "bank entry with empty id, skipping");
    return None;
  }
  let mut cases = Vec::with_capacity(cfg.tests.len());
  for t in cfg.tests {
    match Predicate::compile(&t.predicate) {
      Ok(p) => cases.push(TestCase::new(t.id, t.description, p)),
      Err(e) => {
        error!(target: "problem", problem = %cfg.id, case = t.id, %e, "bank predicate failed to compile, skipping case");
      }
    }
  }
  if cases.is_empty() {
    error!(target: "problem", problem = %cfg.id, "bank entry has no usable test cases, skipping");
    return None;
  }
  Some(Problem {
    id: cfg.id,
    title: cfg.title,
    description: cfg.description,
    difficulty: cfg.difficulty,
    category: cfg.category,
    starter_code: StarterCode {
      javascript: cfg.starter_javascript,
      typescript: cfg.starter_typescript,
    },
    exposes: cfg.exposes,
    test_cases: cases,
    source: ProblemSource::ConfigBank,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  const BANK: &str = r#"
[[problems]]
id = "double-it"
title = "Double It"
description = "Write a function `double` that doubles a number."
difficulty = "Easy"
category = "DSA"
starter_javascript = "function double(n) {\n}\n"
starter_typescript = "function double(n: number): number {\n}\n"
exposes = ["double"]

[[problems.tests]]
id = 1
description = "doubles a number"
predicate = "() => double(4) === 8"

[[problems.tests]]
id = 2
description = "broken predicate"
predicate = "() =>"
"#;

  #[test]
  fn parses_bank_toml_and_compiles_predicates() {
    let bank: ProblemBank = toml::from_str(BANK).expect("toml");
    assert_eq!(bank.problems.len(), 1);
    let p = bank_problem(bank.problems[0].clone()).expect("problem");
    assert_eq!(p.id, "double-it");
    assert_eq!(p.source, ProblemSource::ConfigBank);
    // The second predicate does not compile and is dropped.
    assert_eq!(p.test_cases.len(), 1);
    assert_eq!(p.test_cases[0].predicate.source(), "() => double(4) === 8");
  }

  #[test]
  fn rejects_entries_with_no_usable_tests() {
    let cfg = ProblemCfg {
      id: "empty".into(),
      title: "Empty".into(),
      description: "no tests".into(),
      difficulty: Difficulty::Easy,
      category: Category::Dsa,
      starter_javascript: String::new(),
      starter_typescript: String::new(),
      exposes: vec![],
      tests: vec![],
    };
    assert!(bank_problem(cfg).is_none());
  }

  #[test]
  fn rejects_entries_with_blank_ids() {
    let cfg = ProblemCfg {
      id: "  ".into(),
      title: "Blank".into(),
      description: "blank id".into(),
      difficulty: Difficulty::Easy,
      category: Category::Dsa,
      starter_javascript: String::new(),
      starter_typescript: String::new(),
      exposes: vec![],
      tests: vec![TestCfg {
        id: 1,
        description: "ok".into(),
        predicate: "() => true".into(),
      }],
    };
    assert!(bank_problem(cfg).is_none());
  }
}
