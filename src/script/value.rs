//! Runtime values and their JS-flavored semantics (truthiness, strict
//! equality, stringification, numeric coercion for arithmetic).

use std::fmt;
use std::sync::Arc;

use super::ast::FunctionDef;

/// Host-provided callables and namespaces available to every run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Builtin {
    Math,
    MathFloor,
    MathAbs,
    MathMax,
    MathMin,
    MathSqrt,
    StringCast,
    NumberCast,
    IsNan,
    ErrorCtor,
}

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Math => "Math",
            Builtin::MathFloor => "Math.floor",
            Builtin::MathAbs => "Math.abs",
            Builtin::MathMax => "Math.max",
            Builtin::MathMin => "Math.min",
            Builtin::MathSqrt => "Math.sqrt",
            Builtin::StringCast => "String",
            Builtin::NumberCast => "Number",
            Builtin::IsNan => "isNaN",
            Builtin::ErrorCtor => "Error",
        }
    }
}

#[derive(Clone, Debug)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    /// Value semantics, except that mutating methods (`push`, `pop`,
    /// `reverse`) write back through assignable paths.
    Array(Vec<Value>),
    Function(Arc<FunctionDef>),
    Builtin(Builtin),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Array(_) => "object",
            Value::Function(_) | Value::Builtin(_) => "function",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Array(_) | Value::Function(_) | Value::Builtin(_) => true,
        }
    }

    /// Strict equality: no coercion. `NaN !== NaN`; arrays and functions
    /// compare by identity in JS and are never equal here (every evaluation
    /// step clones them).
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            _ => false,
        }
    }

    /// Numeric coercion used by arithmetic and relational operators.
    pub fn as_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(true) => 1.0,
            Value::Bool(false) => 0.0,
            Value::Number(n) => *n,
            Value::Str(s) => {
                let t = s.trim();
                if t.is_empty() {
                    0.0
                } else {
                    t.parse::<f64>().unwrap_or(f64::NAN)
                }
            }
            Value::Array(_) | Value::Function(_) | Value::Builtin(_) => f64::NAN,
        }
    }

    /// String form used by `+` concatenation, `String(…)` and `join`.
    pub fn to_display(&self) -> String {
        match self {
            Value::Undefined => "undefined".into(),
            Value::Null => "null".into(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::Str(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(|v| match v {
                    // Array.prototype.toString renders holes as empty.
                    Value::Undefined | Value::Null => String::new(),
                    other => other.to_display(),
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::Function(def) => match &def.name {
                Some(name) => format!("function {name}"),
                None => "function".into(),
            },
            Value::Builtin(b) => format!("function {}", b.name()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display())
    }
}

pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".into();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity".into() } else { "-Infinity".into() };
    }
    if n == n.trunc() && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }
    n.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_equality_has_no_coercion() {
        assert!(Value::Number(5.0).strict_eq(&Value::Number(5.0)));
        assert!(!Value::Number(5.0).strict_eq(&Value::Str("5".into())));
        assert!(!Value::Bool(true).strict_eq(&Value::Number(1.0)));
        assert!(!Value::Null.strict_eq(&Value::Undefined));
        assert!(!Value::Number(f64::NAN).strict_eq(&Value::Number(f64::NAN)));
        assert!(Value::Number(f64::INFINITY).strict_eq(&Value::Number(f64::INFINITY)));
    }

    #[test]
    fn arrays_never_compare_equal() {
        let a = Value::Array(vec![Value::Number(1.0)]);
        let b = Value::Array(vec![Value::Number(1.0)]);
        assert!(!a.strict_eq(&b));
    }

    #[test]
    fn truthiness_matches_js() {
        assert!(!Value::Undefined.is_truthy());
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::Number(f64::NAN).is_truthy());
        assert!(!Value::Str(String::new()).is_truthy());
        assert!(Value::Str("0".into()).is_truthy());
        assert!(Value::Array(Vec::new()).is_truthy());
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(5.0), "5");
        assert_eq!(format_number(-30.0), "-30");
        assert_eq!(format_number(3.25), "3.25");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(format_number(f64::NAN), "NaN");
    }

    #[test]
    fn display_joins_arrays_like_js() {
        let v = Value::Array(vec![
            Value::Number(1.0),
            Value::Str("x".into()),
            Value::Undefined,
        ]);
        assert_eq!(v.to_display(), "1,x,");
    }
}
