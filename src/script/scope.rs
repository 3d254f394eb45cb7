//! The explicit shared evaluation namespace.
//!
//! Submitted source installs its top-level declarations here and predicates
//! read them back. Passing it by reference into both sides (instead of
//! relying on an ambient global) makes the engine's "clear previous
//! bindings" step an inspectable operation and removes hidden cross-run
//! leakage: the engine builds a fresh namespace per run and owns it for the
//! duration of that run only.

use std::collections::HashMap;

use super::value::{Builtin, Value};

#[derive(Clone, Debug, Default)]
pub struct Namespace {
    bindings: HashMap<String, Value>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Namespace pre-seeded with the host builtins every run may use.
    pub fn with_builtins() -> Self {
        let mut ns = Self::new();
        ns.set("Math", Value::Builtin(Builtin::Math));
        ns.set("String", Value::Builtin(Builtin::StringCast));
        ns.set("Number", Value::Builtin(Builtin::NumberCast));
        ns.set("isNaN", Value::Builtin(Builtin::IsNan));
        ns.set("Error", Value::Builtin(Builtin::ErrorCtor));
        ns.set("Infinity", Value::Number(f64::INFINITY));
        ns.set("NaN", Value::Number(f64::NAN));
        ns
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.bindings.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Remove the given names; returns how many were actually bound. This is
    /// the engine's guard against a stale definition from a prior run making
    /// a broken new submission appear to pass.
    pub fn clear_names(&mut self, names: &[String]) -> usize {
        names.iter().filter(|n| self.bindings.remove(n.as_str()).is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_seeded() {
        let ns = Namespace::with_builtins();
        assert!(ns.contains("Math"));
        assert!(ns.contains("Infinity"));
        assert!(matches!(ns.get("isNaN"), Some(Value::Builtin(Builtin::IsNan))));
    }

    #[test]
    fn clear_names_reports_removed_count() {
        let mut ns = Namespace::new();
        ns.set("add", Value::Number(1.0));
        let removed = ns.clear_names(&["add".to_string(), "reverseString".to_string()]);
        assert_eq!(removed, 1);
        assert!(!ns.contains("add"));
    }
}
