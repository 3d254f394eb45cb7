//! Tree-walking interpreter for the script dialect.
//!
//! Top-level declarations land in the shared [`Namespace`]; each function
//! call gets a private frame stack on top of it. Runtime failures carry
//! JS-flavored messages because the grading UI shows them verbatim.

use std::collections::HashMap;

use thiserror::Error;

use super::ast::{AssignOp, BinaryOp, Expr, FunctionDef, LogicalOp, Stmt, UnaryOp};
use super::scope::Namespace;
use super::value::{Builtin, Value};

/// Recursion cap so runaway recursion surfaces as a runtime error instead of
/// a host stack overflow (a JS engine reports the same condition).
const MAX_CALL_DEPTH: usize = 200;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum RuntimeError {
    /// The submitted source did not even parse.
    #[error("{0}")]
    Syntax(String),
    #[error("{0} is not defined")]
    NotDefined(String),
    #[error("{0} is not a function")]
    NotAFunction(String),
    #[error("{0}")]
    Type(String),
    /// A `throw` statement in script code.
    #[error("{0}")]
    Thrown(String),
    #[error("Maximum call stack size exceeded")]
    CallStackExceeded,
}

enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

pub struct Interp<'a> {
    globals: &'a mut Namespace,
    frames: Vec<HashMap<String, Value>>,
    depth: usize,
}

impl<'a> Interp<'a> {
    pub fn new(globals: &'a mut Namespace) -> Self {
        Self { globals, frames: Vec::new(), depth: 0 }
    }

    /// Execute a program at top level: declarations become bindings in the
    /// shared namespace. A stray top-level `return` stops execution.
    pub fn run_program(&mut self, program: &[Stmt]) -> Result<(), RuntimeError> {
        self.hoist(program);
        for stmt in program {
            if let Flow::Return(_) | Flow::Break | Flow::Continue = self.exec(stmt)? {
                break;
            }
        }
        Ok(())
    }

    /// Invoke a callable value with the given arguments. `label` names the
    /// callee in error messages.
    pub fn call_value(
        &mut self,
        callee: &Value,
        args: Vec<Value>,
        label: &str,
    ) -> Result<Value, RuntimeError> {
        match callee {
            Value::Function(def) => self.call_function(def, args),
            Value::Builtin(b) => builtin_call(*b, args),
            _ => Err(RuntimeError::NotAFunction(label.to_string())),
        }
    }

    fn call_function(
        &mut self,
        def: &FunctionDef,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(RuntimeError::CallStackExceeded);
        }
        self.depth += 1;
        let mut frame = HashMap::new();
        for (i, param) in def.params.iter().enumerate() {
            frame.insert(param.clone(), args.get(i).cloned().unwrap_or(Value::Undefined));
        }
        // Functions see only their own locals plus the shared namespace;
        // they do not capture enclosing frames.
        let saved = std::mem::replace(&mut self.frames, vec![frame]);
        let result = self.exec_block(&def.body);
        self.frames = saved;
        self.depth -= 1;
        match result? {
            Flow::Return(v) => Ok(v),
            _ => Ok(Value::Undefined),
        }
    }

    // ---- statements ----

    /// Install function declarations before executing a statement list, so a
    /// call may precede its declaration the way JS hoisting allows.
    fn hoist(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            if let Stmt::Function(def) = stmt {
                if let Some(name) = &def.name {
                    self.declare(name.clone(), Value::Function(def.clone()));
                }
            }
        }
    }

    fn exec_block(&mut self, stmts: &[Stmt]) -> Result<Flow, RuntimeError> {
        self.hoist(stmts);
        for stmt in stmts {
            match self.exec(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeError> {
        match stmt {
            Stmt::Function(def) => {
                if let Some(name) = &def.name {
                    self.declare(name.clone(), Value::Function(def.clone()));
                }
                Ok(Flow::Normal)
            }
            Stmt::VarDecl { decls } => {
                for (name, init) in decls {
                    let value = match init {
                        Some(e) => self.eval(e)?,
                        None => Value::Undefined,
                    };
                    self.declare(name.clone(), value);
                }
                Ok(Flow::Normal)
            }
            Stmt::Return(value) => {
                let v = match value {
                    Some(e) => self.eval(e)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(v))
            }
            Stmt::If { cond, then_branch, else_branch } => {
                if self.eval(cond)?.is_truthy() {
                    self.exec_block(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.exec_block(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While { cond, body } => {
                while self.eval(cond)?.is_truthy() {
                    match self.exec_block(body)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::For { init, cond, step, body } => {
                if let Some(init) = init {
                    self.exec(init)?;
                }
                loop {
                    if let Some(cond) = cond {
                        if !self.eval(cond)?.is_truthy() {
                            break;
                        }
                    }
                    match self.exec_block(body)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => {}
                    }
                    if let Some(step) = step {
                        self.eval(step)?;
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Break => Ok(Flow::Break),
            Stmt::Continue => Ok(Flow::Continue),
            Stmt::Throw(expr) => {
                let v = self.eval(expr)?;
                Err(RuntimeError::Thrown(v.to_display()))
            }
            Stmt::Block(stmts) => self.exec_block(stmts),
            Stmt::Expr(expr) => {
                self.eval(expr)?;
                Ok(Flow::Normal)
            }
        }
    }

    // ---- name resolution ----

    fn declare(&mut self, name: String, value: Value) {
        match self.frames.last_mut() {
            Some(frame) => {
                frame.insert(name, value);
            }
            None => self.globals.set(name, value),
        }
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        for frame in self.frames.iter().rev() {
            if let Some(v) = frame.get(name) {
                return Some(v.clone());
            }
        }
        self.globals.get(name).cloned()
    }

    fn assign_var(&mut self, name: &str, value: Value) {
        for frame in self.frames.iter_mut().rev() {
            if let Some(slot) = frame.get_mut(name) {
                *slot = value;
                return;
            }
        }
        // Undeclared assignment lands in the shared namespace, like JS.
        self.globals.set(name.to_string(), value);
    }

    // ---- expressions ----

    pub fn eval(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Null => Ok(Value::Null),
            Expr::Undefined => Ok(Value::Undefined),
            Expr::Ident(name) => {
                self.lookup(name).ok_or_else(|| RuntimeError::NotDefined(name.clone()))
            }
            Expr::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.eval(item)?);
                }
                Ok(Value::Array(out))
            }
            Expr::Function(def) => Ok(Value::Function(def.clone())),
            Expr::Unary { op, operand } => {
                let v = self.eval(operand)?;
                Ok(match op {
                    UnaryOp::Neg => Value::Number(-v.as_number()),
                    UnaryOp::Not => Value::Bool(!v.is_truthy()),
                })
            }
            Expr::Binary { op, lhs, rhs } => {
                let a = self.eval(lhs)?;
                let b = self.eval(rhs)?;
                Ok(binary_op(*op, a, b))
            }
            Expr::Logical { op, lhs, rhs } => {
                let a = self.eval(lhs)?;
                match op {
                    LogicalOp::And => {
                        if a.is_truthy() {
                            self.eval(rhs)
                        } else {
                            Ok(a)
                        }
                    }
                    LogicalOp::Or => {
                        if a.is_truthy() {
                            Ok(a)
                        } else {
                            self.eval(rhs)
                        }
                    }
                }
            }
            Expr::Conditional { cond, then_val, else_val } => {
                if self.eval(cond)?.is_truthy() {
                    self.eval(then_val)
                } else {
                    self.eval(else_val)
                }
            }
            Expr::Assign { op, target, value } => {
                let new = match op {
                    AssignOp::Set => self.eval(value)?,
                    AssignOp::Add => {
                        let cur = self.eval(target)?;
                        binary_op(BinaryOp::Add, cur, self.eval(value)?)
                    }
                    AssignOp::Sub => {
                        let cur = self.eval(target)?;
                        binary_op(BinaryOp::Sub, cur, self.eval(value)?)
                    }
                    AssignOp::Mul => {
                        let cur = self.eval(target)?;
                        binary_op(BinaryOp::Mul, cur, self.eval(value)?)
                    }
                    AssignOp::Div => {
                        let cur = self.eval(target)?;
                        binary_op(BinaryOp::Div, cur, self.eval(value)?)
                    }
                };
                self.store_path(target, new.clone())?;
                Ok(new)
            }
            Expr::Update { target, delta } => {
                let old = self.eval(target)?.as_number();
                self.store_path(target, Value::Number(old + delta))?;
                Ok(Value::Number(old))
            }
            Expr::Call { callee, args } => {
                if let Expr::Member { object, property } = callee.as_ref() {
                    return self.eval_method_call(object, property, args);
                }
                let f = self.eval(callee)?;
                let label = match callee.as_ref() {
                    Expr::Ident(name) => name.clone(),
                    _ => "expression".to_string(),
                };
                let argv = self.eval_args(args)?;
                self.call_value(&f, argv, &label)
            }
            Expr::Member { object, property } => {
                let obj = self.eval(object)?;
                self.read_property(obj, property)
            }
            Expr::Index { object, index } => {
                let obj = self.eval(object)?;
                let idx = self.eval(index)?;
                match obj {
                    Value::Undefined | Value::Null => Err(RuntimeError::Type(format!(
                        "Cannot read properties of {} (reading index)",
                        if matches!(obj, Value::Null) { "null" } else { "undefined" }
                    ))),
                    Value::Str(s) => Ok(match array_index(&idx) {
                        Some(i) => s
                            .chars()
                            .nth(i)
                            .map(|c| Value::Str(c.to_string()))
                            .unwrap_or(Value::Undefined),
                        None => Value::Undefined,
                    }),
                    Value::Array(items) => Ok(match array_index(&idx) {
                        Some(i) => items.get(i).cloned().unwrap_or(Value::Undefined),
                        None => Value::Undefined,
                    }),
                    _ => Ok(Value::Undefined),
                }
            }
        }
    }

    fn eval_args(&mut self, args: &[Expr]) -> Result<Vec<Value>, RuntimeError> {
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            out.push(self.eval(arg)?);
        }
        Ok(out)
    }

    fn read_property(&mut self, obj: Value, property: &str) -> Result<Value, RuntimeError> {
        match obj {
            Value::Undefined | Value::Null => Err(RuntimeError::Type(format!(
                "Cannot read properties of {} (reading '{property}')",
                if matches!(obj, Value::Null) { "null" } else { "undefined" }
            ))),
            Value::Str(s) => Ok(match property {
                "length" => Value::Number(s.chars().count() as f64),
                _ => Value::Undefined,
            }),
            Value::Array(items) => Ok(match property {
                "length" => Value::Number(items.len() as f64),
                _ => Value::Undefined,
            }),
            Value::Builtin(Builtin::Math) => Ok(match math_member(property) {
                Some(b) => Value::Builtin(b),
                None => Value::Undefined,
            }),
            _ => Ok(Value::Undefined),
        }
    }

    fn eval_method_call(
        &mut self,
        object: &Expr,
        property: &str,
        args: &[Expr],
    ) -> Result<Value, RuntimeError> {
        let obj = self.eval(object)?;
        let argv = self.eval_args(args)?;
        match obj {
            Value::Builtin(Builtin::Math) => match math_member(property) {
                Some(b) => builtin_call(b, argv),
                None => Err(RuntimeError::NotAFunction(format!("Math.{property}"))),
            },
            Value::Str(s) => string_method(&s, property, &argv),
            Value::Array(items) => {
                let (result, mutated) = array_method(items, property, argv)?;
                if let Some(new_items) = mutated {
                    if object.is_assignable() {
                        self.store_path(object, Value::Array(new_items))?;
                    }
                }
                Ok(result)
            }
            Value::Undefined | Value::Null => Err(RuntimeError::Type(format!(
                "Cannot read properties of {} (reading '{property}')",
                if matches!(obj, Value::Null) { "null" } else { "undefined" }
            ))),
            Value::Function(_) | Value::Builtin(_) | Value::Number(_) | Value::Bool(_) => {
                Err(RuntimeError::NotAFunction(property.to_string()))
            }
        }
    }

    /// Write a value through an assignable path (identifier, index chain).
    fn store_path(&mut self, target: &Expr, value: Value) -> Result<(), RuntimeError> {
        match target {
            Expr::Ident(name) => {
                self.assign_var(name, value);
                Ok(())
            }
            Expr::Index { object, index } => {
                let idx = self.eval(index)?;
                let mut obj = self.eval(object)?;
                match &mut obj {
                    Value::Array(items) => {
                        let i = array_index(&idx).ok_or_else(|| {
                            RuntimeError::Type("invalid array index in assignment".into())
                        })?;
                        if i >= items.len() {
                            items.resize(i + 1, Value::Undefined);
                        }
                        items[i] = value;
                    }
                    other => {
                        return Err(RuntimeError::Type(format!(
                            "cannot assign into a {}",
                            other.type_name()
                        )))
                    }
                }
                self.store_path(object, obj)
            }
            Expr::Member { .. } => {
                Err(RuntimeError::Type("cannot assign to a property".into()))
            }
            _ => Err(RuntimeError::Type("invalid assignment target".into())),
        }
    }
}

// ---- operator and builtin semantics ----

fn binary_op(op: BinaryOp, a: Value, b: Value) -> Value {
    match op {
        BinaryOp::Add => {
            if matches!(a, Value::Str(_) | Value::Array(_))
                || matches!(b, Value::Str(_) | Value::Array(_))
            {
                Value::Str(format!("{}{}", a.to_display(), b.to_display()))
            } else {
                Value::Number(a.as_number() + b.as_number())
            }
        }
        BinaryOp::Sub => Value::Number(a.as_number() - b.as_number()),
        BinaryOp::Mul => Value::Number(a.as_number() * b.as_number()),
        BinaryOp::Div => Value::Number(a.as_number() / b.as_number()),
        BinaryOp::Rem => Value::Number(a.as_number() % b.as_number()),
        BinaryOp::Lt => compare(a, b, |o| o == std::cmp::Ordering::Less),
        BinaryOp::Le => compare(a, b, |o| o != std::cmp::Ordering::Greater),
        BinaryOp::Gt => compare(a, b, |o| o == std::cmp::Ordering::Greater),
        BinaryOp::Ge => compare(a, b, |o| o != std::cmp::Ordering::Less),
        BinaryOp::StrictEq => Value::Bool(a.strict_eq(&b)),
        BinaryOp::StrictNe => Value::Bool(!a.strict_eq(&b)),
    }
}

fn compare(a: Value, b: Value, pick: fn(std::cmp::Ordering) -> bool) -> Value {
    if let (Value::Str(x), Value::Str(y)) = (&a, &b) {
        return Value::Bool(pick(x.cmp(y)));
    }
    let (x, y) = (a.as_number(), b.as_number());
    match x.partial_cmp(&y) {
        Some(ord) => Value::Bool(pick(ord)),
        None => Value::Bool(false), // NaN involved
    }
}

fn math_member(property: &str) -> Option<Builtin> {
    Some(match property {
        "floor" => Builtin::MathFloor,
        "abs" => Builtin::MathAbs,
        "max" => Builtin::MathMax,
        "min" => Builtin::MathMin,
        "sqrt" => Builtin::MathSqrt,
        _ => return None,
    })
}

fn builtin_call(b: Builtin, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let first = args.first();
    Ok(match b {
        Builtin::Math => return Err(RuntimeError::NotAFunction("Math".into())),
        Builtin::MathFloor => Value::Number(first.map(Value::as_number).unwrap_or(f64::NAN).floor()),
        Builtin::MathAbs => Value::Number(first.map(Value::as_number).unwrap_or(f64::NAN).abs()),
        Builtin::MathSqrt => Value::Number(first.map(Value::as_number).unwrap_or(f64::NAN).sqrt()),
        Builtin::MathMax => fold_numbers(&args, f64::NEG_INFINITY, f64::max),
        Builtin::MathMin => fold_numbers(&args, f64::INFINITY, f64::min),
        Builtin::StringCast => Value::Str(first.map(Value::to_display).unwrap_or_default()),
        Builtin::NumberCast => Value::Number(first.map(Value::as_number).unwrap_or(0.0)),
        Builtin::IsNan => Value::Bool(first.map(Value::as_number).unwrap_or(f64::NAN).is_nan()),
        Builtin::ErrorCtor => Value::Str(first.map(Value::to_display).unwrap_or_default()),
    })
}

fn fold_numbers(args: &[Value], start: f64, pick: fn(f64, f64) -> f64) -> Value {
    let mut acc = start;
    for v in args {
        let n = v.as_number();
        if n.is_nan() {
            return Value::Number(f64::NAN);
        }
        acc = pick(acc, n);
    }
    Value::Number(acc)
}

/// Non-negative integral index, or None (JS would fall through to an absent
/// property and yield undefined).
fn array_index(v: &Value) -> Option<usize> {
    let n = v.as_number();
    if n.is_finite() && n >= 0.0 && n.fract() == 0.0 {
        Some(n as usize)
    } else {
        None
    }
}

fn slice_bounds(len: usize, start: Option<&Value>, end: Option<&Value>) -> (usize, usize) {
    let norm = |v: Option<&Value>, default: f64| -> f64 {
        v.map(Value::as_number).filter(|n| !n.is_nan()).unwrap_or(default)
    };
    let clamp = |n: f64| -> usize {
        if n < 0.0 {
            (len as f64 + n).max(0.0) as usize
        } else {
            (n as usize).min(len)
        }
    };
    (clamp(norm(start, 0.0)), clamp(norm(end, len as f64)))
}

fn string_method(s: &str, property: &str, args: &[Value]) -> Result<Value, RuntimeError> {
    let chars: Vec<char> = s.chars().collect();
    Ok(match property {
        "charAt" => {
            let i = args.first().map(Value::as_number).unwrap_or(0.0);
            if i.is_finite() && i >= 0.0 && (i.trunc() as usize) < chars.len() {
                Value::Str(chars[i.trunc() as usize].to_string())
            } else {
                Value::Str(String::new())
            }
        }
        "slice" => {
            let (start, end) = slice_bounds(chars.len(), args.first(), args.get(1));
            if start < end {
                Value::Str(chars[start..end].iter().collect())
            } else {
                Value::Str(String::new())
            }
        }
        "split" => match args.first() {
            None | Some(Value::Undefined) => Value::Array(vec![Value::Str(s.to_string())]),
            Some(sep) => {
                let sep = sep.to_display();
                if sep.is_empty() {
                    Value::Array(chars.iter().map(|c| Value::Str(c.to_string())).collect())
                } else {
                    Value::Array(
                        s.split(sep.as_str()).map(|p| Value::Str(p.to_string())).collect(),
                    )
                }
            }
        },
        "includes" => {
            let needle = args.first().map(Value::to_display).unwrap_or_default();
            Value::Bool(s.contains(&needle))
        }
        "indexOf" => {
            let needle = args.first().map(Value::to_display).unwrap_or_default();
            match s.find(&needle) {
                Some(byte_idx) => Value::Number(s[..byte_idx].chars().count() as f64),
                None => Value::Number(-1.0),
            }
        }
        "toUpperCase" => Value::Str(s.to_uppercase()),
        "toLowerCase" => Value::Str(s.to_lowercase()),
        "trim" => Value::Str(s.trim().to_string()),
        _ => return Err(RuntimeError::NotAFunction(property.to_string())),
    })
}

/// Returns (result, mutated array for writeback if the method mutates).
fn array_method(
    mut items: Vec<Value>,
    property: &str,
    args: Vec<Value>,
) -> Result<(Value, Option<Vec<Value>>), RuntimeError> {
    Ok(match property {
        "push" => {
            items.extend(args);
            let len = items.len();
            (Value::Number(len as f64), Some(items))
        }
        "pop" => {
            let popped = items.pop().unwrap_or(Value::Undefined);
            (popped, Some(items))
        }
        "reverse" => {
            items.reverse();
            (Value::Array(items.clone()), Some(items))
        }
        "join" => {
            let sep = match args.first() {
                None | Some(Value::Undefined) => ",".to_string(),
                Some(v) => v.to_display(),
            };
            let joined = items
                .iter()
                .map(|v| match v {
                    Value::Undefined | Value::Null => String::new(),
                    other => other.to_display(),
                })
                .collect::<Vec<_>>()
                .join(&sep);
            (Value::Str(joined), None)
        }
        "slice" => {
            let (start, end) = slice_bounds(items.len(), args.first(), args.get(1));
            let out = if start < end { items[start..end].to_vec() } else { Vec::new() };
            (Value::Array(out), None)
        }
        "includes" => {
            let needle = args.first().cloned().unwrap_or(Value::Undefined);
            (Value::Bool(items.iter().any(|v| v.strict_eq(&needle))), None)
        }
        "indexOf" => {
            let needle = args.first().cloned().unwrap_or(Value::Undefined);
            let idx = items
                .iter()
                .position(|v| v.strict_eq(&needle))
                .map(|i| i as f64)
                .unwrap_or(-1.0);
            (Value::Number(idx), None)
        }
        _ => return Err(RuntimeError::NotAFunction(property.to_string())),
    })
}
