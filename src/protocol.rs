//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{Category, Dialect, Difficulty, Problem, ProblemSource, TestCase};
use crate::session::{ProblemDraft, SubmitOutcome, TestCaseDraft};
use crate::state::Session;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    ListProblems,
    SelectProblem {
        #[serde(rename = "problemId")]
        problem_id: String,
    },
    ChangeDialect {
        dialect: Dialect,
    },
    Submit {
        source: String,
    },
    SaveProblem {
        problem: ProblemIn,
    },
    SolvedList,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Problems {
        problems: Vec<ProblemSummaryOut>,
    },
    ProblemSelected {
        problem: ProblemOut,
        dialect: Dialect,
    },
    DialectChanged {
        dialect: Dialect,
        cases: Vec<TestCaseOut>,
    },
    SubmitResult(SubmitOut),
    ProblemSaved {
        problem: ProblemOut,
    },
    ValidationFailed {
        errors: Vec<String>,
    },
    Solved {
        ids: Vec<String>,
    },
    Error {
        message: String,
    },
}

/// Catalog listing entry; omits starter code and predicates.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemSummaryOut {
    pub id: String,
    pub title: String,
    pub difficulty: Difficulty,
    pub category: Category,
    pub source: ProblemSource,
    pub solved: bool,
}

/// Full problem DTO used by both WS and HTTP.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemOut {
    pub id: String,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub category: Category,
    pub starter_javascript: String,
    pub starter_typescript: String,
    pub exposes: Vec<String>,
    pub test_cases: Vec<TestCaseOut>,
    pub source: ProblemSource,
    pub editable: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseOut {
    pub id: u32,
    pub description: String,
    #[serde(rename = "predicateSourceText")]
    pub predicate_source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubmitStatus {
    AllPassed,
    SomeFailed,
    ExecutionError,
    Rejected,
}

/// Result of one graded submission.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOut {
    pub status: SubmitStatus,
    /// One-line summary shown to the user.
    pub message: String,
    pub passed_count: usize,
    pub total: usize,
    pub cases: Vec<TestCaseOut>,
}

/// Authored problem as submitted by the editor.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemIn {
    pub id: String,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub category: Category,
    #[serde(default)]
    pub starter_javascript: String,
    #[serde(default)]
    pub starter_typescript: String,
    #[serde(default)]
    pub exposes: Vec<String>,
    #[serde(default)]
    pub test_cases: Vec<TestCaseIn>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseIn {
    pub id: u32,
    pub description: String,
    #[serde(rename = "predicateSourceText")]
    pub predicate_source: String,
}

impl From<ProblemIn> for ProblemDraft {
    fn from(p: ProblemIn) -> Self {
        ProblemDraft {
            id: p.id,
            title: p.title,
            description: p.description,
            difficulty: p.difficulty,
            category: p.category,
            starter_javascript: p.starter_javascript,
            starter_typescript: p.starter_typescript,
            exposes: p.exposes,
            test_cases: p
                .test_cases
                .into_iter()
                .map(|c| TestCaseDraft {
                    id: c.id,
                    description: c.description,
                    predicate_source: c.predicate_source,
                })
                .collect(),
        }
    }
}

// HTTP request bodies.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectIn {
    pub problem_id: String,
}

#[derive(Debug, Deserialize)]
pub struct DialectIn {
    pub dialect: Dialect,
}

#[derive(Debug, Deserialize)]
pub struct SubmitIn {
    pub source: String,
}

#[derive(Debug, Deserialize)]
pub struct ProblemQuery {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorOut {
    pub message: String,
}

// Converters from internal models to DTOs.

pub fn case_out(c: &TestCase) -> TestCaseOut {
    TestCaseOut {
        id: c.id,
        description: c.description.clone(),
        predicate_source: c.predicate.source().to_string(),
        passed: c.passed,
        error: c.error.clone(),
    }
}

pub fn summary_out(p: &Problem, solved: bool) -> ProblemSummaryOut {
    ProblemSummaryOut {
        id: p.id.clone(),
        title: p.title.clone(),
        difficulty: p.difficulty,
        category: p.category,
        source: p.source,
        solved,
    }
}

pub fn problem_out(p: &Problem) -> ProblemOut {
    ProblemOut {
        id: p.id.clone(),
        title: p.title.clone(),
        description: p.description.clone(),
        difficulty: p.difficulty,
        category: p.category,
        starter_javascript: p.starter_code.javascript.clone(),
        starter_typescript: p.starter_code.typescript.clone(),
        exposes: p.exposes.clone(),
        test_cases: p.test_cases.iter().map(case_out).collect(),
        source: p.source,
        editable: p.editable(),
    }
}

/// Session DTO pieces for dialect-change responses.
pub fn session_cases_out(s: &Session) -> Vec<TestCaseOut> {
    s.cases.iter().map(case_out).collect()
}

pub fn submit_out(outcome: &SubmitOutcome) -> SubmitOut {
    match outcome {
        SubmitOutcome::AllPassed { cases, passed_count } => SubmitOut {
            status: SubmitStatus::AllPassed,
            message: "All test cases passed!".into(),
            passed_count: *passed_count,
            total: cases.len(),
            cases: cases.iter().map(case_out).collect(),
        },
        SubmitOutcome::SomeFailed { cases, passed_count, total } => SubmitOut {
            status: SubmitStatus::SomeFailed,
            message: format!("{passed_count}/{total} test cases passed."),
            passed_count: *passed_count,
            total: *total,
            cases: cases.iter().map(case_out).collect(),
        },
        SubmitOutcome::ExecutionError { cases, message } => SubmitOut {
            status: SubmitStatus::ExecutionError,
            message: message.clone(),
            passed_count: 0,
            total: cases.len(),
            cases: cases.iter().map(case_out).collect(),
        },
        SubmitOutcome::Rejected { message } => SubmitOut {
            status: SubmitStatus::Rejected,
            message: message.clone(),
            passed_count: 0,
            total: 0,
            cases: Vec::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_deserialize_from_tagged_json() {
        let msg: ClientWsMessage =
            serde_json::from_str(r#"{"type":"select_problem","problemId":"sum-two-numbers"}"#)
                .expect("json");
        assert!(matches!(msg, ClientWsMessage::SelectProblem { problem_id } if problem_id == "sum-two-numbers"));

        let msg: ClientWsMessage =
            serde_json::from_str(r#"{"type":"change_dialect","dialect":"typescript"}"#)
                .expect("json");
        assert!(matches!(
            msg,
            ClientWsMessage::ChangeDialect { dialect: Dialect::Typescript }
        ));
    }

    #[test]
    fn unset_case_results_are_omitted_from_json() {
        let out = TestCaseOut {
            id: 1,
            description: "adds".into(),
            predicate_source: "() => true".into(),
            passed: None,
            error: None,
        };
        let json = serde_json::to_string(&out).expect("json");
        assert!(!json.contains("passed"));
        assert!(!json.contains("error"));
        assert!(json.contains("predicateSourceText"));
    }

    #[test]
    fn submit_out_messages_are_distinct_per_status() {
        use crate::domain::TestCase;
        use crate::predicate::Predicate;
        let case = TestCase::new(
            1,
            "x".into(),
            Predicate::compile("() => true").expect("predicate"),
        );
        let all = submit_out(&SubmitOutcome::AllPassed { cases: vec![case.clone()], passed_count: 1 });
        let some = submit_out(&SubmitOutcome::SomeFailed {
            cases: vec![case.clone()],
            passed_count: 0,
            total: 1,
        });
        let exec = submit_out(&SubmitOutcome::ExecutionError {
            cases: vec![case],
            message: "Execution error: boom".into(),
        });
        let rejected = submit_out(&SubmitOutcome::Rejected { message: "busy".into() });
        assert_eq!(all.status, SubmitStatus::AllPassed);
        assert_eq!(some.message, "0/1 test cases passed.");
        assert_eq!(exec.status, SubmitStatus::ExecutionError);
        assert_eq!(rejected.total, 0);
        assert_ne!(all.message, some.message);
    }
}
