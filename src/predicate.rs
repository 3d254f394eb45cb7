//! Compiled test-case predicates.
//!
//! A predicate is a zero-argument function literal in the script dialect,
//! compiled once and kept alongside its original source text so it can be
//! persisted and re-edited without loss.

use std::sync::Arc;

use thiserror::Error;

use crate::script::ast::{Expr, FunctionDef};
use crate::script::{parse_expression, ParseError};

#[derive(Debug, Error)]
pub enum PredicateError {
    #[error(transparent)]
    Syntax(#[from] ParseError),
    #[error("predicate must be a function literal")]
    NotAFunction,
    #[error("predicate must take no parameters")]
    TakesParameters,
}

#[derive(Clone, Debug)]
pub struct Predicate {
    def: Arc<FunctionDef>,
    source: String,
}

impl Predicate {
    /// Compile predicate source text. The text must be a single function
    /// literal (arrow or `function`) taking no parameters.
    pub fn compile(text: &str) -> Result<Self, PredicateError> {
        let expr = parse_expression(text)?;
        let def = match expr {
            Expr::Function(def) => def,
            _ => return Err(PredicateError::NotAFunction),
        };
        if !def.params.is_empty() {
            return Err(PredicateError::TakesParameters);
        }
        Ok(Self { def, source: text.trim().to_string() })
    }

    pub fn def(&self) -> &Arc<FunctionDef> {
        &self.def
    }

    /// The exact text the predicate was compiled from. Compiling this text
    /// again yields an equivalent predicate, which is what persistence and
    /// the authoring form rely on.
    pub fn source(&self) -> &str {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_arrow_predicates() {
        let p = Predicate::compile("() => 1 / 0 === Infinity").expect("compile");
        assert!(p.def().params.is_empty());
        assert_eq!(p.source(), "() => 1 / 0 === Infinity");
    }

    #[test]
    fn compiles_function_keyword_predicates() {
        let p = Predicate::compile("function () { return add(2, 3) === 5; }").expect("compile");
        assert!(p.def().params.is_empty());
    }

    #[test]
    fn rejects_syntax_errors() {
        assert!(matches!(Predicate::compile("() => {"), Err(PredicateError::Syntax(_))));
    }

    #[test]
    fn rejects_non_function_expressions() {
        assert!(matches!(Predicate::compile("1 + 1"), Err(PredicateError::NotAFunction)));
    }

    #[test]
    fn rejects_parameters() {
        assert!(matches!(
            Predicate::compile("(x) => x === 1"),
            Err(PredicateError::TakesParameters)
        ));
    }

    #[test]
    fn round_trips_through_source_text() {
        let text = "() => {\n  const got = add(2, 3);\n  return got === 5;\n}";
        let p = Predicate::compile(text).expect("compile");
        let again = Predicate::compile(p.source()).expect("recompile");
        assert_eq!(p.def(), again.def());
        assert_eq!(p.source(), again.source());
    }
}
