//! Recursive-descent parser for the script dialect.

use std::sync::Arc;

use thiserror::Error;

use super::ast::{AssignOp, BinaryOp, Expr, FunctionDef, LogicalOp, Stmt, UnaryOp};
use super::lexer::{lex, LexError, Spanned, Token};

#[derive(Clone, Debug, Error, PartialEq)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub line: u32,
    pub message: String,
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError { line: e.line, message: e.message }
    }
}

/// Parse a whole program (sequence of statements).
pub fn parse_program(src: &str) -> Result<Vec<Stmt>, ParseError> {
    let mut p = Parser::new(lex(src)?);
    let mut stmts = Vec::new();
    while !p.at_end() {
        stmts.push(p.statement()?);
    }
    Ok(stmts)
}

/// Parse the input as exactly one expression (used by the predicate compiler).
pub fn parse_expression(src: &str) -> Result<Expr, ParseError> {
    let mut p = Parser::new(lex(src)?);
    let expr = p.expression()?;
    p.eat(&Token::Semi);
    if !p.at_end() {
        return Err(p.error("unexpected trailing input after expression"));
    }
    Ok(expr)
}

struct Parser {
    toks: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn new(toks: Vec<Spanned>) -> Self {
        Self { toks, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.toks.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.toks.get(self.pos).map(|s| &s.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.toks.get(self.pos + offset).map(|s| &s.token)
    }

    fn line(&self) -> u32 {
        self.toks
            .get(self.pos)
            .or_else(|| self.toks.last())
            .map(|s| s.line)
            .unwrap_or(1)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError { line: self.line(), message: message.into() }
    }

    fn bump(&mut self) -> Option<Token> {
        let t = self.toks.get(self.pos).map(|s| s.token.clone());
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn eat(&mut self, t: &Token) -> bool {
        if self.peek() == Some(t) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, t: &Token, what: &str) -> Result<(), ParseError> {
        if self.eat(t) {
            Ok(())
        } else {
            Err(self.error(format!("expected {what}")))
        }
    }

    fn ident(&mut self, what: &str) -> Result<String, ParseError> {
        match self.peek() {
            Some(Token::Ident(_)) => match self.bump() {
                Some(Token::Ident(name)) => Ok(name),
                _ => unreachable!(),
            },
            _ => Err(self.error(format!("expected {what}"))),
        }
    }

    // ---- statements ----

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        match self.peek() {
            Some(Token::Function) => {
                // Only a declaration when a name follows; otherwise it is a
                // function expression statement.
                if matches!(self.peek_at(1), Some(Token::Ident(_))) {
                    self.bump();
                    let def = self.function_rest(true)?;
                    return Ok(Stmt::Function(Arc::new(def)));
                }
                self.expression_statement()
            }
            Some(Token::Let) | Some(Token::Const) | Some(Token::Var) => {
                let stmt = self.var_decl()?;
                self.eat(&Token::Semi);
                Ok(stmt)
            }
            Some(Token::Return) => {
                self.bump();
                let value = match self.peek() {
                    None | Some(Token::Semi) | Some(Token::RBrace) => None,
                    _ => Some(self.expression()?),
                };
                self.eat(&Token::Semi);
                Ok(Stmt::Return(value))
            }
            Some(Token::If) => self.if_statement(),
            Some(Token::While) => {
                self.bump();
                self.expect(&Token::LParen, "'(' after 'while'")?;
                let cond = self.expression()?;
                self.expect(&Token::RParen, "')' after condition")?;
                let body = self.branch()?;
                Ok(Stmt::While { cond, body })
            }
            Some(Token::For) => self.for_statement(),
            Some(Token::Break) => {
                self.bump();
                self.eat(&Token::Semi);
                Ok(Stmt::Break)
            }
            Some(Token::Continue) => {
                self.bump();
                self.eat(&Token::Semi);
                Ok(Stmt::Continue)
            }
            Some(Token::Throw) => {
                self.bump();
                let value = self.expression()?;
                self.eat(&Token::Semi);
                Ok(Stmt::Throw(value))
            }
            Some(Token::LBrace) => Ok(Stmt::Block(self.block()?)),
            Some(Token::Semi) => {
                self.bump();
                Ok(Stmt::Block(Vec::new()))
            }
            Some(_) => self.expression_statement(),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn expression_statement(&mut self) -> Result<Stmt, ParseError> {
        let expr = self.expression()?;
        self.eat(&Token::Semi);
        Ok(Stmt::Expr(expr))
    }

    /// `let a = 1, b = 2` without the trailing semicolon.
    fn var_decl(&mut self) -> Result<Stmt, ParseError> {
        self.bump(); // let/const/var
        let mut decls = Vec::new();
        loop {
            let name = self.ident("variable name")?;
            let init = if self.eat(&Token::Assign) { Some(self.expression()?) } else { None };
            decls.push((name, init));
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok(Stmt::VarDecl { decls })
    }

    fn if_statement(&mut self) -> Result<Stmt, ParseError> {
        self.bump(); // if
        self.expect(&Token::LParen, "'(' after 'if'")?;
        let cond = self.expression()?;
        self.expect(&Token::RParen, "')' after condition")?;
        let then_branch = self.branch()?;
        let else_branch = if self.eat(&Token::Else) { Some(self.branch()?) } else { None };
        Ok(Stmt::If { cond, then_branch, else_branch })
    }

    fn for_statement(&mut self) -> Result<Stmt, ParseError> {
        self.bump(); // for
        self.expect(&Token::LParen, "'(' after 'for'")?;
        let init = if self.eat(&Token::Semi) {
            None
        } else {
            let stmt = match self.peek() {
                Some(Token::Let) | Some(Token::Const) | Some(Token::Var) => self.var_decl()?,
                _ => Stmt::Expr(self.expression()?),
            };
            self.expect(&Token::Semi, "';' after for-initializer")?;
            Some(Box::new(stmt))
        };
        let cond = if self.peek() == Some(&Token::Semi) { None } else { Some(self.expression()?) };
        self.expect(&Token::Semi, "';' after for-condition")?;
        let step = if self.peek() == Some(&Token::RParen) { None } else { Some(self.expression()?) };
        self.expect(&Token::RParen, "')' after for-step")?;
        let body = self.branch()?;
        Ok(Stmt::For { init, cond, step, body })
    }

    /// A `{ ... }` block or a single statement, normalized to a list.
    fn branch(&mut self) -> Result<Vec<Stmt>, ParseError> {
        if self.peek() == Some(&Token::LBrace) {
            self.block()
        } else {
            Ok(vec![self.statement()?])
        }
    }

    fn block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(&Token::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        while self.peek() != Some(&Token::RBrace) {
            if self.at_end() {
                return Err(self.error("unexpected end of input: missing '}'"));
            }
            stmts.push(self.statement()?);
        }
        self.bump(); // }
        Ok(stmts)
    }

    /// Parameter list and body after the `function` keyword.
    fn function_rest(&mut self, named: bool) -> Result<FunctionDef, ParseError> {
        let name = if named {
            Some(self.ident("function name")?)
        } else if matches!(self.peek(), Some(Token::Ident(_))) {
            Some(self.ident("function name")?)
        } else {
            None
        };
        self.expect(&Token::LParen, "'(' after function name")?;
        let mut params = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            loop {
                params.push(self.ident("parameter name")?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::RParen, "')' after parameters")?;
        let body = self.block()?;
        Ok(FunctionDef { name, params, body })
    }

    // ---- expressions ----

    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr, ParseError> {
        if let Some(expr) = self.try_arrow()? {
            return Ok(expr);
        }
        let lhs = self.conditional()?;
        let op = match self.peek() {
            Some(Token::Assign) => Some(AssignOp::Set),
            Some(Token::PlusAssign) => Some(AssignOp::Add),
            Some(Token::MinusAssign) => Some(AssignOp::Sub),
            Some(Token::StarAssign) => Some(AssignOp::Mul),
            Some(Token::SlashAssign) => Some(AssignOp::Div),
            _ => None,
        };
        if let Some(op) = op {
            if !lhs.is_assignable() {
                return Err(self.error("invalid assignment target"));
            }
            self.bump();
            let value = self.assignment()?; // right-associative
            return Ok(Expr::Assign { op, target: Box::new(lhs), value: Box::new(value) });
        }
        Ok(lhs)
    }

    /// Arrow functions need lookahead: `x => …` or `(a, b) => …`.
    fn try_arrow(&mut self) -> Result<Option<Expr>, ParseError> {
        match self.peek() {
            Some(Token::Ident(_)) if self.peek_at(1) == Some(&Token::Arrow) => {
                let param = self.ident("parameter name")?;
                self.bump(); // =>
                let body = self.arrow_body()?;
                Ok(Some(Expr::Function(Arc::new(FunctionDef {
                    name: None,
                    params: vec![param],
                    body,
                }))))
            }
            Some(Token::LParen) => {
                // Look for `( ident, ident … ) =>`; anything else is a
                // parenthesized expression.
                let mut i = 1usize;
                let mut params_ok = true;
                loop {
                    match self.peek_at(i) {
                        Some(Token::RParen) => break,
                        Some(Token::Ident(_)) | Some(Token::Comma) => i += 1,
                        _ => {
                            params_ok = false;
                            break;
                        }
                    }
                }
                if !params_ok || self.peek_at(i + 1) != Some(&Token::Arrow) {
                    return Ok(None);
                }
                self.bump(); // (
                let mut params = Vec::new();
                if self.peek() != Some(&Token::RParen) {
                    loop {
                        params.push(self.ident("parameter name")?);
                        if !self.eat(&Token::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&Token::RParen, "')' after parameters")?;
                self.expect(&Token::Arrow, "'=>'")?;
                let body = self.arrow_body()?;
                Ok(Some(Expr::Function(Arc::new(FunctionDef { name: None, params, body }))))
            }
            _ => Ok(None),
        }
    }

    fn arrow_body(&mut self) -> Result<Vec<Stmt>, ParseError> {
        if self.peek() == Some(&Token::LBrace) {
            self.block()
        } else {
            let value = self.assignment()?;
            Ok(vec![Stmt::Return(Some(value))])
        }
    }

    fn conditional(&mut self) -> Result<Expr, ParseError> {
        let cond = self.logical_or()?;
        if self.eat(&Token::Question) {
            let then_val = self.assignment()?;
            self.expect(&Token::Colon, "':' in conditional expression")?;
            let else_val = self.assignment()?;
            return Ok(Expr::Conditional {
                cond: Box::new(cond),
                then_val: Box::new(then_val),
                else_val: Box::new(else_val),
            });
        }
        Ok(cond)
    }

    fn logical_or(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.logical_and()?;
        while self.eat(&Token::OrOr) {
            let rhs = self.logical_and()?;
            lhs = Expr::Logical { op: LogicalOp::Or, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn logical_and(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.equality()?;
        while self.eat(&Token::AndAnd) {
            let rhs = self.equality()?;
            lhs = Expr::Logical { op: LogicalOp::And, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn equality(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.relational()?;
        loop {
            let op = match self.peek() {
                Some(Token::EqEq) | Some(Token::EqEqEq) => BinaryOp::StrictEq,
                Some(Token::NotEq) | Some(Token::NotEqEq) => BinaryOp::StrictNe,
                _ => break,
            };
            self.bump();
            let rhs = self.relational()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn relational(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Le) => BinaryOp::Le,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Ge) => BinaryOp::Ge,
                _ => break,
            };
            self.bump();
            let rhs = self.additive()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.bump();
            let rhs = self.multiplicative()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => break,
            };
            self.bump();
            let rhs = self.unary()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.bump();
                let operand = self.unary()?;
                Ok(Expr::Unary { op: UnaryOp::Neg, operand: Box::new(operand) })
            }
            Some(Token::Bang) => {
                self.bump();
                let operand = self.unary()?;
                Ok(Expr::Unary { op: UnaryOp::Not, operand: Box::new(operand) })
            }
            Some(Token::New) => {
                // `new Error("x")` desugars to a plain call.
                self.bump();
                let expr = self.postfix()?;
                match expr {
                    Expr::Call { .. } => Ok(expr),
                    other => Ok(Expr::Call { callee: Box::new(other), args: Vec::new() }),
                }
            }
            _ => self.postfix(),
        }
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        loop {
            match self.peek() {
                Some(Token::LParen) => {
                    self.bump();
                    let mut args = Vec::new();
                    if self.peek() != Some(&Token::RParen) {
                        loop {
                            args.push(self.expression()?);
                            if !self.eat(&Token::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(&Token::RParen, "')' after arguments")?;
                    expr = Expr::Call { callee: Box::new(expr), args };
                }
                Some(Token::Dot) => {
                    self.bump();
                    let property = self.ident("property name")?;
                    expr = Expr::Member { object: Box::new(expr), property };
                }
                Some(Token::LBracket) => {
                    self.bump();
                    let index = self.expression()?;
                    self.expect(&Token::RBracket, "']' after index")?;
                    expr = Expr::Index { object: Box::new(expr), index: Box::new(index) };
                }
                Some(Token::PlusPlus) | Some(Token::MinusMinus) => {
                    let delta = if self.peek() == Some(&Token::PlusPlus) { 1.0 } else { -1.0 };
                    if !expr.is_assignable() {
                        return Err(self.error("invalid increment target"));
                    }
                    self.bump();
                    expr = Expr::Update { target: Box::new(expr), delta };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        match self.bump() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::True) => Ok(Expr::Bool(true)),
            Some(Token::False) => Ok(Expr::Bool(false)),
            Some(Token::Null) => Ok(Expr::Null),
            Some(Token::Undefined) => Ok(Expr::Undefined),
            Some(Token::Ident(name)) => Ok(Expr::Ident(name)),
            Some(Token::LParen) => {
                let expr = self.expression()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(expr)
            }
            Some(Token::LBracket) => {
                let mut items = Vec::new();
                if self.peek() != Some(&Token::RBracket) {
                    loop {
                        items.push(self.expression()?);
                        if !self.eat(&Token::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&Token::RBracket, "']' after array literal")?;
                Ok(Expr::Array(items))
            }
            Some(Token::Function) => {
                let def = self.function_rest(false)?;
                Ok(Expr::Function(Arc::new(def)))
            }
            Some(t) => Err(ParseError {
                line: self.toks.get(self.pos.saturating_sub(1)).map(|s| s.line).unwrap_or(1),
                message: format!("unexpected token {t:?}"),
            }),
            None => Err(self.error("unexpected end of input")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_function_declaration() {
        let stmts = parse_program("function add(a, b) { return a + b; }").expect("parse");
        assert_eq!(stmts.len(), 1);
        match &stmts[0] {
            Stmt::Function(def) => {
                assert_eq!(def.name.as_deref(), Some("add"));
                assert_eq!(def.params, vec!["a".to_string(), "b".to_string()]);
                assert_eq!(def.body.len(), 1);
            }
            other => panic!("expected function declaration, got {other:?}"),
        }
    }

    #[test]
    fn respects_precedence() {
        let expr = parse_expression("1 + 2 * 3 === 7").expect("parse");
        match expr {
            Expr::Binary { op: BinaryOp::StrictEq, lhs, .. } => match *lhs {
                Expr::Binary { op: BinaryOp::Add, .. } => {}
                other => panic!("expected addition on lhs, got {other:?}"),
            },
            other => panic!("expected strict equality at top, got {other:?}"),
        }
    }

    #[test]
    fn parses_zero_arg_arrow() {
        let expr = parse_expression("() => add(2, 3) === 5").expect("parse");
        match expr {
            Expr::Function(def) => {
                assert!(def.params.is_empty());
                assert_eq!(def.body.len(), 1);
                assert!(matches!(def.body[0], Stmt::Return(Some(_))));
            }
            other => panic!("expected arrow function, got {other:?}"),
        }
    }

    #[test]
    fn parses_arrow_with_block_body() {
        let expr = parse_expression("() => { let x = 1; return x === 1; }").expect("parse");
        match expr {
            Expr::Function(def) => assert_eq!(def.body.len(), 2),
            other => panic!("expected arrow function, got {other:?}"),
        }
    }

    #[test]
    fn parenthesized_expression_is_not_an_arrow() {
        let expr = parse_expression("(1 + 2) * 3").expect("parse");
        assert!(matches!(expr, Expr::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn parses_classic_for_loop() {
        let stmts =
            parse_program("for (let i = 0; i < 10; i++) { total += i; }").expect("parse");
        match &stmts[0] {
            Stmt::For { init, cond, step, body } => {
                assert!(init.is_some());
                assert!(cond.is_some());
                assert!(matches!(step, Some(Expr::Update { .. })));
                assert_eq!(body.len(), 1);
            }
            other => panic!("expected for loop, got {other:?}"),
        }
    }

    #[test]
    fn parses_multi_declarator_let() {
        let stmts = parse_program("let a = 0, b = 1, c").expect("parse");
        match &stmts[0] {
            Stmt::VarDecl { decls } => {
                assert_eq!(decls.len(), 3);
                assert!(decls[2].1.is_none());
            }
            other => panic!("expected var decl, got {other:?}"),
        }
    }

    #[test]
    fn parses_ternary_and_new() {
        let expr = parse_expression("n <= 1 ? n : n - 1").expect("parse");
        assert!(matches!(expr, Expr::Conditional { .. }));
        let expr = parse_expression("new Error('boom')").expect("parse");
        assert!(matches!(expr, Expr::Call { .. }));
    }

    #[test]
    fn rejects_unbalanced_brace() {
        let err = parse_program("function add(a, b) { return a + b;").expect_err("should fail");
        assert!(err.message.contains("missing '}'"), "got: {err}");
    }

    #[test]
    fn rejects_assignment_to_literal() {
        let err = parse_expression("3 = 4").expect_err("should fail");
        assert!(err.message.contains("invalid assignment target"));
    }

    #[test]
    fn rejects_trailing_input_in_expression_mode() {
        let err = parse_expression("1 + 1 function").expect_err("should fail");
        assert!(err.message.contains("trailing"));
    }
}
