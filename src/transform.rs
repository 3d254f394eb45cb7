//! Source transform applied before execution.
//!
//! JavaScript submissions pass through untouched. TypeScript submissions get
//! their type syntax erased (annotations, `as` casts, generic argument
//! lists) so the result is plain script-dialect source. This is an erasure
//! pass, not a type checker: it never validates the types it removes.

use crate::domain::Dialect;
use crate::script::lexer::{is_ident_part, is_ident_start};

pub fn transform(source: &str, dialect: Dialect) -> String {
    match dialect {
        Dialect::Javascript => source.to_string(),
        Dialect::Typescript => strip_types(source),
    }
}

/// Erase TypeScript type syntax from `source`.
///
/// The scanner is string- and comment-aware. Colon handling has to
/// disambiguate annotations from ternary colons, which it does by counting
/// pending `?` operators on the current statement.
fn strip_types(source: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut i = 0;
    let mut pending_ternary = 0usize;

    while i < chars.len() {
        let c = chars[i];

        // String literals copy verbatim.
        if c == '"' || c == '\'' || c == '`' {
            i = copy_string(&chars, i, c, &mut out);
            continue;
        }
        // Comments copy verbatim.
        if c == '/' && chars.get(i + 1) == Some(&'/') {
            while i < chars.len() && chars[i] != '\n' {
                out.push(chars[i]);
                i += 1;
            }
            continue;
        }
        if c == '/' && chars.get(i + 1) == Some(&'*') {
            out.push_str("/*");
            i += 2;
            while i < chars.len() {
                out.push(chars[i]);
                if chars[i] == '/' && chars[i - 1] == '*' {
                    i += 1;
                    break;
                }
                i += 1;
            }
            continue;
        }

        match c {
            '?' => {
                // Optional-member marker (`x?: T`) vanishes with the
                // annotation; a real ternary `?` is remembered so its colon
                // is kept.
                let mut j = i + 1;
                while j < chars.len() && chars[j].is_whitespace() && chars[j] != '\n' {
                    j += 1;
                }
                if chars.get(j) == Some(&':') {
                    i += 1;
                } else {
                    pending_ternary += 1;
                    out.push(c);
                    i += 1;
                }
            }
            ':' => {
                if pending_ternary > 0 {
                    pending_ternary -= 1;
                    out.push(c);
                    i += 1;
                } else if annotation_position(&out) {
                    i = consume_type(&chars, i + 1);
                } else {
                    out.push(c);
                    i += 1;
                }
            }
            '<' => {
                if last_significant(&out).is_some_and(is_ident_part) {
                    if let Some(end) = generic_args_end(&chars, i) {
                        i = end + 1;
                        continue;
                    }
                }
                out.push(c);
                i += 1;
            }
            'a' if is_as_keyword(&chars, i, &out) => {
                i = consume_type(&chars, i + 2);
            }
            ';' | '{' | '}' | '\n' => {
                pending_ternary = 0;
                out.push(c);
                i += 1;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

fn copy_string(chars: &[char], start: usize, quote: char, out: &mut String) -> usize {
    let mut i = start;
    out.push(chars[i]);
    i += 1;
    while i < chars.len() {
        let c = chars[i];
        out.push(c);
        i += 1;
        if c == '\\' && i < chars.len() {
            out.push(chars[i]);
            i += 1;
        } else if c == quote {
            break;
        }
    }
    i
}

fn last_significant(out: &str) -> Option<char> {
    out.chars().rev().find(|c| !c.is_whitespace())
}

/// A colon starts a type annotation when it follows an identifier or a
/// parameter-list close paren.
fn annotation_position(out: &str) -> bool {
    matches!(last_significant(out), Some(c) if is_ident_part(c) || c == ')')
}

fn is_as_keyword(chars: &[char], i: usize, out: &str) -> bool {
    chars.get(i + 1) == Some(&'s')
        && chars.get(i + 2).is_some_and(|c| c.is_whitespace())
        && out.chars().last().is_some_and(|c| c.is_whitespace())
}

/// Skip over a type expression. Balances `<>`, `[]`, `()` and object-type
/// braces; at top level it stops before `,`, `;`, `=` (but not `=>`), a
/// newline, a closing delimiter, or a function-body `{`.
fn consume_type(chars: &[char], start: usize) -> usize {
    let mut i = start;
    let mut depth = 0usize;
    let mut last_nonws = None;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '<' | '[' | '(' => depth += 1,
            '{' => {
                // Leading `{` opens an object type; a later one at top level
                // is the function body.
                if depth == 0 && last_nonws.is_some() {
                    break;
                }
                depth += 1;
            }
            '>' | ']' | ')' | '}' => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            ',' | ';' | '\n' if depth == 0 => break,
            '=' if depth == 0 => {
                // `(x) => y` is a function type; any other `=>` here is the
                // start of an arrow body, and a bare `=` a default value.
                if chars.get(i + 1) == Some(&'>') && last_nonws == Some(')') {
                    last_nonws = Some('>');
                    i += 2;
                    continue;
                }
                break;
            }
            _ => {}
        }
        if !c.is_whitespace() {
            last_nonws = Some(c);
        }
        i += 1;
    }
    // Leave trailing whitespace for the caller to re-emit, so `) {` and
    // ` = ` keep their spacing.
    while i > start && chars[i - 1].is_whitespace() {
        i -= 1;
    }
    i
}

/// If the `<` at `i` opens a generic argument list whose matching `>` is
/// immediately followed by `(`, return the index of that `>`. Anything that
/// does not look like type arguments (operators, newlines) is a comparison.
fn generic_args_end(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut j = open + 1;
    while j < chars.len() {
        let c = chars[j];
        match c {
            '<' => depth += 1,
            '>' => {
                depth -= 1;
                if depth == 0 {
                    let mut k = j + 1;
                    while k < chars.len() && chars[k].is_whitespace() && chars[k] != '\n' {
                        k += 1;
                    }
                    return if chars.get(k) == Some(&'(') { Some(j) } else { None };
                }
            }
            ',' | '.' | '[' | ']' | ' ' | '\t' => {}
            _ if is_ident_start(c) || c.is_ascii_digit() => {}
            _ => return None,
        }
        j += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::parse_program;

    fn strip(src: &str) -> String {
        transform(src, Dialect::Typescript)
    }

    #[test]
    fn javascript_passes_through_untouched() {
        let src = "function add(a, b) {\n  return a + b;\n}";
        assert_eq!(transform(src, Dialect::Javascript), src);
    }

    #[test]
    fn strips_parameter_and_return_annotations() {
        let src = "function add(a: number, b: number): number {\n  return a + b;\n}";
        assert_eq!(strip(src), "function add(a, b) {\n  return a + b;\n}");
    }

    #[test]
    fn strips_annotations_on_arrow_functions() {
        let src = "const upper = (s: string): string => s.toUpperCase();";
        assert_eq!(strip(src), "const upper = (s) => s.toUpperCase();");
    }

    #[test]
    fn keeps_ternary_colons() {
        let src = "function max(a: number, b: number): number {\n  return a > b ? a : b;\n}";
        assert_eq!(strip(src), "function max(a, b) {\n  return a > b ? a : b;\n}");
    }

    #[test]
    fn strips_optional_parameter_markers() {
        let src = "function greet(name?: string) { return 'hi ' + name; }";
        assert_eq!(strip(src), "function greet(name) { return 'hi ' + name; }");
    }

    #[test]
    fn strips_array_and_generic_type_annotations() {
        let src = "const xs: Array<number> = [];\nfunction sum(ys: number[]): number { return 0; }";
        assert_eq!(strip(src), "const xs = [];\nfunction sum(ys) { return 0; }");
    }

    #[test]
    fn strips_generic_parameter_lists_on_declarations() {
        let src = "function identity<T>(value: T): T { return value; }";
        assert_eq!(strip(src), "function identity(value) { return value; }");
    }

    #[test]
    fn keeps_less_than_comparisons() {
        let src = "for (let i = 0; i < xs.length; i++) { total += xs[i]; }";
        assert_eq!(strip(src), src);
    }

    #[test]
    fn strips_as_casts() {
        let src = "const n = value as number;";
        let stripped = strip(src);
        assert!(!stripped.contains("as"));
        assert!(!stripped.contains("number"));
    }

    #[test]
    fn leaves_strings_and_comments_alone() {
        let src = "// ratio a:b stays\nlet s = 'a: string';";
        assert_eq!(strip(src), src);
    }

    #[test]
    fn stripped_output_parses_in_the_script_dialect() {
        let src = "function fibonacci(n: number): number {\n  if (n <= 1) { return n; }\n  let a: number = 0;\n  let b = 1;\n  for (let i = 2; i <= n; i++) {\n    const next: number = a + b;\n    a = b;\n    b = next;\n  }\n  return b;\n}";
        parse_program(&strip(src)).expect("stripped source should parse");
    }
}
