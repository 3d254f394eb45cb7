//! Disk persistence for the solved set and authored problems.
//!
//! Both files live under STATE_DIR (default `./state`) as plain JSON. A
//! corrupt file is logged, deleted, and treated as empty; the catalog of
//! seeds and bank problems never depends on it.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::domain::{Problem, ProblemSource, StarterCode, TestCase};
use crate::predicate::Predicate;

const SOLVED_FILE: &str = "solved.json";
const CUSTOM_PROBLEMS_FILE: &str = "custom_problems.json";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTestCase {
    pub id: u32,
    pub description: String,
    /// Predicates persist as their source text and recompile on load.
    #[serde(rename = "predicateSourceText")]
    pub predicate_source: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredProblem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub difficulty: crate::domain::Difficulty,
    pub category: crate::domain::Category,
    #[serde(default)]
    pub starter_javascript: String,
    #[serde(default)]
    pub starter_typescript: String,
    #[serde(default)]
    pub exposes: Vec<String>,
    pub test_cases: Vec<StoredTestCase>,
}

#[derive(Clone, Debug)]
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// STATE_DIR, or `./state` when unset.
    pub fn from_env() -> Self {
        let dir = std::env::var("STATE_DIR").unwrap_or_else(|_| "./state".to_string());
        Self::new(dir)
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    fn ensure_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)
    }

    /// Read and deserialize a state file. Absent file means empty state; a
    /// corrupt file is deleted so it cannot wedge every later boot.
    fn read_or_reset<T: DeserializeOwned>(&self, file: &str) -> Option<T> {
        let path = self.path(file);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                error!(target: "codegym_backend", path = %path.display(), error = %e, "Failed to read state file");
                return None;
            }
        };
        match serde_json::from_str::<T>(&raw) {
            Ok(v) => Some(v),
            Err(e) => {
                error!(target: "codegym_backend", path = %path.display(), error = %e, "Corrupt state file, resetting");
                if let Err(e) = fs::remove_file(&path) {
                    warn!(target: "codegym_backend", path = %path.display(), error = %e, "Failed to remove corrupt state file");
                }
                None
            }
        }
    }

    fn write_json<T: Serialize>(&self, file: &str, value: &T) -> std::io::Result<()> {
        self.ensure_dir()?;
        let raw = serde_json::to_string_pretty(value)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(self.path(file), raw)
    }

    pub fn load_solved(&self) -> Vec<String> {
        self.read_or_reset::<Vec<String>>(SOLVED_FILE).unwrap_or_default()
    }

    pub fn save_solved(&self, ids: &[String]) -> std::io::Result<()> {
        let mut sorted: Vec<&String> = ids.iter().collect();
        sorted.sort();
        self.write_json(SOLVED_FILE, &sorted)
    }

    /// Load authored problems, recompiling each predicate. A problem whose
    /// predicates no longer compile is skipped with an error log; the rest
    /// of the file still loads.
    pub fn load_custom_problems(&self) -> Vec<Problem> {
        let stored = self
            .read_or_reset::<Vec<StoredProblem>>(CUSTOM_PROBLEMS_FILE)
            .unwrap_or_default();
        let mut out = Vec::with_capacity(stored.len());
        for sp in stored {
            if let Some(p) = revive_problem(sp) {
                out.push(p);
            }
        }
        if !out.is_empty() {
            info!(target: "codegym_backend", count = out.len(), "Loaded authored problems from disk");
        }
        out
    }

    pub fn save_custom_problems(&self, problems: &[Problem]) -> std::io::Result<()> {
        let stored: Vec<StoredProblem> = problems.iter().map(store_problem).collect();
        self.write_json(CUSTOM_PROBLEMS_FILE, &stored)
    }
}

fn store_problem(p: &Problem) -> StoredProblem {
    StoredProblem {
        id: p.id.clone(),
        title: p.title.clone(),
        description: p.description.clone(),
        difficulty: p.difficulty,
        category: p.category,
        starter_javascript: p.starter_code.javascript.clone(),
        starter_typescript: p.starter_code.typescript.clone(),
        exposes: p.exposes.clone(),
        test_cases: p
            .test_cases
            .iter()
            .map(|c| StoredTestCase {
                id: c.id,
                description: c.description.clone(),
                predicate_source: c.predicate.source().to_string(),
            })
            .collect(),
    }
}

fn revive_problem(sp: StoredProblem) -> Option<Problem> {
    let mut cases = Vec::with_capacity(sp.test_cases.len());
    for c in sp.test_cases {
        match Predicate::compile(&c.predicate_source) {
            Ok(p) => cases.push(TestCase::new(c.id, c.description, p)),
            Err(e) => {
                error!(target: "problem", problem = %sp.id, case = c.id, %e, "stored predicate no longer compiles, dropping problem");
                return None;
            }
        }
    }
    if cases.is_empty() {
        error!(target: "problem", problem = %sp.id, "stored problem has no test cases, dropping");
        return None;
    }
    Some(Problem {
        id: sp.id,
        title: sp.title,
        description: sp.description,
        difficulty: sp.difficulty,
        category: sp.category,
        starter_code: StarterCode {
            javascript: sp.starter_javascript,
            typescript: sp.starter_typescript,
        },
        exposes: sp.exposes,
        test_cases: cases,
        source: ProblemSource::Authored,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Category, Difficulty};
    use uuid::Uuid;

    fn temp_storage() -> Storage {
        Storage::new(std::env::temp_dir().join(format!("codegym-test-{}", Uuid::new_v4())))
    }

    fn sample_problem(id: &str) -> Problem {
        Problem {
            id: id.to_string(),
            title: "Sample".into(),
            description: "sample".into(),
            difficulty: Difficulty::Easy,
            category: Category::Dsa,
            starter_code: StarterCode {
                javascript: "function f() {}\n".into(),
                typescript: "function f(): void {}\n".into(),
            },
            exposes: vec!["f".into()],
            test_cases: vec![TestCase::new(
                1,
                "is callable".into(),
                Predicate::compile("() => f() === undefined").expect("predicate"),
            )],
            source: ProblemSource::Authored,
        }
    }

    #[test]
    fn solved_round_trips_sorted() {
        let storage = temp_storage();
        storage
            .save_solved(&["zeta".into(), "alpha".into()])
            .expect("save");
        assert_eq!(storage.load_solved(), vec!["alpha".to_string(), "zeta".to_string()]);
    }

    #[test]
    fn missing_files_mean_empty_state() {
        let storage = temp_storage();
        assert!(storage.load_solved().is_empty());
        assert!(storage.load_custom_problems().is_empty());
    }

    #[test]
    fn corrupt_solved_file_is_reset() {
        let storage = temp_storage();
        storage.ensure_dir().expect("dir");
        fs::write(storage.path(SOLVED_FILE), "{not json").expect("write");
        assert!(storage.load_solved().is_empty());
        assert!(!storage.path(SOLVED_FILE).exists());
    }

    #[test]
    fn custom_problems_round_trip_with_predicates() {
        let storage = temp_storage();
        let original = sample_problem("authored-one");
        storage.save_custom_problems(&[original.clone()]).expect("save");
        let loaded = storage.load_custom_problems();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, original.id);
        assert_eq!(loaded[0].source, ProblemSource::Authored);
        assert_eq!(
            loaded[0].test_cases[0].predicate.source(),
            original.test_cases[0].predicate.source()
        );
    }

    #[test]
    fn stored_problem_with_rotten_predicate_is_skipped() {
        let storage = temp_storage();
        storage.ensure_dir().expect("dir");
        let raw = serde_json::json!([
            {
                "id": "rotten",
                "title": "Rotten",
                "description": "predicate does not compile",
                "difficulty": "Easy",
                "category": "DSA",
                "starterJavascript": "",
                "starterTypescript": "",
                "exposes": [],
                "testCases": [
                    { "id": 1, "description": "bad", "predicateSourceText": "() =>" }
                ]
            },
            {
                "id": "fine",
                "title": "Fine",
                "description": "ok",
                "difficulty": "Easy",
                "category": "DSA",
                "starterJavascript": "",
                "starterTypescript": "",
                "exposes": [],
                "testCases": [
                    { "id": 1, "description": "ok", "predicateSourceText": "() => true" }
                ]
            }
        ]);
        fs::write(
            storage.path(CUSTOM_PROBLEMS_FILE),
            serde_json::to_string(&raw).expect("json"),
        )
        .expect("write");
        let loaded = storage.load_custom_problems();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "fine");
    }
}
