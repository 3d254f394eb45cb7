//! Submission grading engine.
//!
//! One [`Engine::run`] call is a complete, self-contained grading pass: it
//! builds a fresh namespace, evaluates the submitted source into it, then
//! invokes every test predicate against the resulting bindings. The actual
//! evaluation sits behind [`SourceRuntime`] so tests can grade against a
//! scripted runtime without parsing anything.

use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::domain::{SubmissionResult, TestCase};
use crate::predicate::Predicate;
use crate::script::{parse_program, Interp, Namespace, RuntimeError, Value};

/// Capability boundary between grading and evaluation. `load` installs a
/// submission's top-level declarations into the namespace; `check` invokes
/// one compiled predicate against it.
pub trait SourceRuntime {
    fn load(&self, source: &str, ns: &mut Namespace) -> Result<(), RuntimeError>;
    fn check(&self, predicate: &Predicate, ns: &mut Namespace) -> Result<Value, RuntimeError>;
}

/// The real runtime: the embedded script interpreter.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScriptRuntime;

impl SourceRuntime for ScriptRuntime {
    fn load(&self, source: &str, ns: &mut Namespace) -> Result<(), RuntimeError> {
        let program =
            parse_program(source).map_err(|e| RuntimeError::Syntax(e.to_string()))?;
        Interp::new(ns).run_program(&program)
    }

    fn check(&self, predicate: &Predicate, ns: &mut Namespace) -> Result<Value, RuntimeError> {
        let f = Value::Function(predicate.def().clone());
        Interp::new(ns).call_value(&f, Vec::new(), "predicate")
    }
}

pub struct Engine<R = ScriptRuntime> {
    runtime: R,
}

impl Engine<ScriptRuntime> {
    pub fn new() -> Self {
        Self { runtime: ScriptRuntime }
    }
}

impl Default for Engine<ScriptRuntime> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: SourceRuntime> Engine<R> {
    pub fn with_runtime(runtime: R) -> Self {
        Self { runtime }
    }

    /// Grade `source` against `cases`.
    ///
    /// Steps: reset the cases, clear the problem's exposed names from the
    /// namespace, load the source, run each predicate in order, aggregate.
    /// A load failure marks every case failed with a shared message; a
    /// predicate failure is isolated to its own case.
    #[instrument(
        target = "grader",
        skip_all,
        fields(submission = %Uuid::new_v4(), cases = cases.len())
    )]
    pub fn run(&self, source: &str, cases: &[TestCase], exposes: &[String]) -> SubmissionResult {
        let mut graded: Vec<TestCase> = cases
            .iter()
            .map(|c| {
                let mut c = c.clone();
                c.reset();
                c
            })
            .collect();

        let mut ns = Namespace::with_builtins();
        // The namespace is fresh per run, so this normally removes nothing.
        // It stays as an explicit step so a stale definition can never make
        // a broken submission appear to pass.
        let cleared = ns.clear_names(exposes);
        if cleared > 0 {
            warn!(target: "grader", cleared, "removed stale bindings before load");
        }

        if let Err(e) = self.runtime.load(source, &mut ns) {
            let message = format!("Execution error: {e}");
            debug!(target: "grader", error = %e, "source failed to load");
            for case in &mut graded {
                case.passed = Some(false);
                case.error = Some(message.clone());
            }
            return SubmissionResult {
                passed_count: 0,
                all_passed: false,
                execution_error: Some(message),
                cases: graded,
            };
        }

        for case in &mut graded {
            match self.runtime.check(&case.predicate, &mut ns) {
                Ok(v) if v.is_truthy() => {
                    case.passed = Some(true);
                }
                Ok(_) => {
                    case.passed = Some(false);
                    case.error = Some("Test case failed".to_string());
                }
                Err(e) => {
                    case.passed = Some(false);
                    case.error = Some(e.to_string());
                }
            }
        }

        let passed_count = graded.iter().filter(|c| c.passed == Some(true)).count();
        let all_passed = !graded.is_empty() && passed_count == graded.len();
        debug!(target: "grader", passed_count, all_passed, "grading pass finished");
        SubmissionResult { cases: graded, passed_count, all_passed, execution_error: None }
    }
}
