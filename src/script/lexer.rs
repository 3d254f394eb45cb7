//! Hand-written lexer for the script dialect.

use thiserror::Error;

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    // keywords
    Function,
    Return,
    Let,
    Const,
    Var,
    If,
    Else,
    While,
    For,
    Break,
    Continue,
    Throw,
    New,
    True,
    False,
    Null,
    Undefined,
    // punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semi,
    Dot,
    Colon,
    Question,
    // operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PlusPlus,
    MinusMinus,
    EqEq,
    NotEq,
    EqEqEq,
    NotEqEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Arrow,
}

/// Token plus the 1-based source line it started on.
#[derive(Clone, Debug, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub line: u32,
}

#[derive(Clone, Debug, Error, PartialEq)]
#[error("line {line}: {message}")]
pub struct LexError {
    pub line: u32,
    pub message: String,
}

fn keyword(word: &str) -> Option<Token> {
    Some(match word {
        "function" => Token::Function,
        "return" => Token::Return,
        "let" => Token::Let,
        "const" => Token::Const,
        "var" => Token::Var,
        "if" => Token::If,
        "else" => Token::Else,
        "while" => Token::While,
        "for" => Token::For,
        "break" => Token::Break,
        "continue" => Token::Continue,
        "throw" => Token::Throw,
        "new" => Token::New,
        "true" => Token::True,
        "false" => Token::False,
        "null" => Token::Null,
        "undefined" => Token::Undefined,
        _ => return None,
    })
}

pub fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

pub fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
}

impl Lexer {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn err(&self, message: impl Into<String>) -> LexError {
        LexError { line: self.line, message: message.into() }
    }

    fn string(&mut self, quote: char) -> Result<Token, LexError> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.err("unterminated string literal")),
                Some('\n') => return Err(self.err("unterminated string literal")),
                Some(c) if c == quote => return Ok(Token::Str(out)),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('0') => out.push('\0'),
                    Some(c @ ('\\' | '\'' | '"' | '`')) => out.push(c),
                    Some(c) => out.push(c),
                    None => return Err(self.err("unterminated string literal")),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn number(&mut self, first: char) -> Result<Token, LexError> {
        let mut text = String::from(first);
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        if self.peek() == Some('.') && self.peek2().map(|c| c.is_ascii_digit()).unwrap_or(false) {
            text.push('.');
            self.bump();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    text.push(c);
                    self.bump();
                } else {
                    break;
                }
            }
        }
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| self.err(format!("invalid number literal '{text}'")))
    }
}

/// Tokenize the whole input. Comments and whitespace are dropped.
pub fn lex(src: &str) -> Result<Vec<Spanned>, LexError> {
    let mut lx = Lexer { chars: src.chars().collect(), pos: 0, line: 1 };
    let mut out = Vec::new();

    while let Some(c) = lx.peek() {
        let line = lx.line;
        if c.is_whitespace() {
            lx.bump();
            continue;
        }
        // comments
        if c == '/' && lx.peek2() == Some('/') {
            while let Some(c) = lx.peek() {
                if c == '\n' {
                    break;
                }
                lx.bump();
            }
            continue;
        }
        if c == '/' && lx.peek2() == Some('*') {
            lx.bump();
            lx.bump();
            loop {
                match lx.bump() {
                    None => return Err(lx.err("unterminated block comment")),
                    Some('*') if lx.peek() == Some('/') => {
                        lx.bump();
                        break;
                    }
                    _ => {}
                }
            }
            continue;
        }

        lx.bump();
        let token = match c {
            '(' => Token::LParen,
            ')' => Token::RParen,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            ',' => Token::Comma,
            ';' => Token::Semi,
            '.' => Token::Dot,
            ':' => Token::Colon,
            '?' => Token::Question,
            '%' => Token::Percent,
            '\'' | '"' => lx.string(c)?,
            '+' => {
                if lx.eat('+') {
                    Token::PlusPlus
                } else if lx.eat('=') {
                    Token::PlusAssign
                } else {
                    Token::Plus
                }
            }
            '-' => {
                if lx.eat('-') {
                    Token::MinusMinus
                } else if lx.eat('=') {
                    Token::MinusAssign
                } else {
                    Token::Minus
                }
            }
            '*' => {
                if lx.eat('=') {
                    Token::StarAssign
                } else {
                    Token::Star
                }
            }
            '/' => {
                if lx.eat('=') {
                    Token::SlashAssign
                } else {
                    Token::Slash
                }
            }
            '!' => {
                if lx.eat('=') {
                    if lx.eat('=') {
                        Token::NotEqEq
                    } else {
                        Token::NotEq
                    }
                } else {
                    Token::Bang
                }
            }
            '=' => {
                if lx.eat('>') {
                    Token::Arrow
                } else if lx.eat('=') {
                    if lx.eat('=') {
                        Token::EqEqEq
                    } else {
                        Token::EqEq
                    }
                } else {
                    Token::Assign
                }
            }
            '<' => {
                if lx.eat('=') {
                    Token::Le
                } else {
                    Token::Lt
                }
            }
            '>' => {
                if lx.eat('=') {
                    Token::Ge
                } else {
                    Token::Gt
                }
            }
            '&' => {
                if lx.eat('&') {
                    Token::AndAnd
                } else {
                    return Err(lx.err("unexpected character '&'"));
                }
            }
            '|' => {
                if lx.eat('|') {
                    Token::OrOr
                } else {
                    return Err(lx.err("unexpected character '|'"));
                }
            }
            c if c.is_ascii_digit() => lx.number(c)?,
            c if is_ident_start(c) => {
                let mut word = String::from(c);
                while let Some(c) = lx.peek() {
                    if is_ident_part(c) {
                        word.push(c);
                        lx.bump();
                    } else {
                        break;
                    }
                }
                keyword(&word).unwrap_or(Token::Ident(word))
            }
            c => return Err(lx.err(format!("unexpected character '{c}'"))),
        };
        out.push(Spanned { token, line });
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Token> {
        lex(src).expect("lex").into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn lexes_function_declaration() {
        assert_eq!(
            kinds("function add(a, b) { return a + b; }"),
            vec![
                Token::Function,
                Token::Ident("add".into()),
                Token::LParen,
                Token::Ident("a".into()),
                Token::Comma,
                Token::Ident("b".into()),
                Token::RParen,
                Token::LBrace,
                Token::Return,
                Token::Ident("a".into()),
                Token::Plus,
                Token::Ident("b".into()),
                Token::Semi,
                Token::RBrace,
            ]
        );
    }

    #[test]
    fn distinguishes_equality_operators() {
        assert_eq!(kinds("= == === != !== =>"), vec![
            Token::Assign,
            Token::EqEq,
            Token::EqEqEq,
            Token::NotEq,
            Token::NotEqEq,
            Token::Arrow,
        ]);
    }

    #[test]
    fn lexes_strings_with_escapes() {
        assert_eq!(kinds(r#""ol\"leh" 'x'"#), vec![
            Token::Str("ol\"leh".into()),
            Token::Str("x".into()),
        ]);
    }

    #[test]
    fn lexes_numbers() {
        assert_eq!(kinds("0 42 3.25"), vec![
            Token::Number(0.0),
            Token::Number(42.0),
            Token::Number(3.25),
        ]);
    }

    #[test]
    fn drops_comments() {
        assert_eq!(kinds("a // line\n/* block\nstill */ b"), vec![
            Token::Ident("a".into()),
            Token::Ident("b".into()),
        ]);
    }

    #[test]
    fn tracks_lines() {
        let toks = lex("a\nb").expect("lex");
        assert_eq!(toks[0].line, 1);
        assert_eq!(toks[1].line, 2);
    }

    #[test]
    fn rejects_unterminated_string() {
        let err = lex("\"oops").expect_err("should fail");
        assert!(err.message.contains("unterminated"));
    }
}
