//! The embedded script dialect.
//!
//! Submitted solutions and test predicates are written in a small
//! JavaScript-flavored language. This module owns its whole pipeline:
//! lexer → recursive-descent parser → tree-walking interpreter, plus the
//! explicit [`Namespace`] that top-level declarations land in and that
//! predicates read back from.
//!
//! Deliberate subset notes:
//! - All equality (`==`, `===`, `!=`, `!==`) is strict; there is no coercive
//!   comparison. Predicates are written against that contract.
//! - Function values close over the shared namespace only, never over local
//!   frames. This is what keeps predicate serialize/recompile lossless.
//! - Loops have no step or time budget; an infinite loop hangs the grading
//!   call. Deep recursion is capped so it surfaces as a runtime error
//!   instead of a stack overflow, the same way a JS host reports it.

pub mod ast;
pub mod interp;
pub mod lexer;
pub mod parser;
pub mod scope;
pub mod value;

pub use interp::{Interp, RuntimeError};
pub use parser::{parse_expression, parse_program, ParseError};
pub use scope::Namespace;
pub use value::Value;
