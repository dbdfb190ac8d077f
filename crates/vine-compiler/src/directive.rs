//! Directive translation.
//!
//! Maps the raw text between a directive's delimiters to a generated code
//! fragment, validating block nesting through the session's open-directive
//! stack. `capture` and `function` interleave with the output buffer stack
//! to isolate their nested bodies before splicing them back.

use vine_lexer::{Token, TokenKind};

use crate::emit::{self, code};
use crate::parser::{BlockCompiler, OpenDirective, Until};
use crate::{CompileError, ErrorKind};

/// A generated fragment. `echo` carries the echoed expression when the
/// fragment is a bare expression echo, for the boolean-attribute rewrite.
pub(crate) struct Fragment {
    pub text: String,
    pub echo: Option<String>,
}

fn plain(text: impl Into<String>) -> Fragment {
    Fragment {
        text: text.into(),
        echo: None,
    }
}

/// A recognized directive, parsed once from the leading word.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Directive {
    If(String),
    ElseIf(String),
    Else,
    For(String),
    While(String),
    ContinueIf(String),
    BreakIf(String),
    Isset(String),
    Default(String),
    Var(String),
    Comment,
    Capture(String),
    Function { signature: String, raw: bool },
    /// `/name`
    Close(String),
    /// `~path`
    BaseUrl(String),
    /// `^expr`
    Dump(String),
    /// `%text%`
    Note(String),
    /// Fallback: expression echo.
    Echo(String),
    /// Incidental brace usage, re-emitted as literal text.
    Literal,
}

/// Classify raw directive-span content.
pub(crate) fn classify(content: &str) -> Directive {
    if looks_incidental(content) {
        return Directive::Literal;
    }
    if let Some(path) = content.strip_prefix('~') {
        return Directive::BaseUrl(path.trim().trim_start_matches('/').to_string());
    }
    if let Some(expr) = content.strip_prefix('^') {
        return Directive::Dump(expr.trim().to_string());
    }
    if content.len() >= 2 && content.starts_with('%') && content.ends_with('%') {
        return Directive::Note(content[1..content.len() - 1].trim().to_string());
    }
    if let Some(name) = content.strip_prefix('/') {
        return Directive::Close(name.trim().to_string());
    }

    let trimmed = content.trim();
    let (word, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim().to_string()),
        None => (trimmed, String::new()),
    };

    match word {
        "if" => Directive::If(rest),
        "elseif" => Directive::ElseIf(rest),
        "else" => Directive::Else,
        "for" => Directive::For(rest),
        "while" => Directive::While(rest),
        "continueif" => Directive::ContinueIf(rest),
        "breakif" => Directive::BreakIf(rest),
        "isset" => Directive::Isset(rest),
        "default" => Directive::Default(rest),
        "var" => Directive::Var(rest),
        "comment" => Directive::Comment,
        "capture" => Directive::Capture(rest),
        "function" => Directive::Function {
            signature: rest,
            raw: false,
        },
        "function!" => Directive::Function {
            signature: rest,
            raw: true,
        },
        _ => Directive::Echo(trimmed.to_string()),
    }
}

/// Content that looks like incidental brace usage rather than a directive:
/// empty, starting with whitespace, or a quote immediately followed by a
/// line break.
fn looks_incidental(content: &str) -> bool {
    let mut chars = content.chars();
    match chars.next() {
        None => true,
        Some(' ') | Some('\t') | Some('\n') | Some('\r') => true,
        Some('\'') | Some('"') => matches!(chars.next(), Some('\n') | Some('\r')),
        _ => false,
    }
}

/// Translate one directive span (the raw tokens between its balanced
/// delimiters) into a generated fragment. `at` is the opening delimiter
/// token, used for diagnostics.
pub(crate) fn translate(
    cc: &mut BlockCompiler,
    span: &[Token],
    at: &Token,
) -> Result<Fragment, CompileError> {
    let content: String = span.iter().map(|t| t.kind.lexeme()).collect();

    match classify(&content) {
        Directive::Literal => incidental(cc, span, at),

        Directive::If(expr) => {
            open(cc, "if", at);
            Ok(plain(code(&format!("if ({expr}) {{"))))
        }
        Directive::ElseIf(expr) => Ok(plain(code(&format!("}} elseif ({expr}) {{")))),
        Directive::Else => Ok(plain(code("} else {"))),

        Directive::For(expr) => {
            open(cc, "for", at);
            // `as` distinguishes iterate-over-collection from a counting loop
            if expr.contains(" as ") {
                Ok(plain(code(&format!("foreach ({expr}) {{"))))
            } else {
                Ok(plain(code(&format!("for ({expr}) {{"))))
            }
        }
        Directive::While(expr) => {
            open(cc, "while", at);
            Ok(plain(code(&format!("while ({expr}) {{"))))
        }
        Directive::ContinueIf(expr) => Ok(plain(code(&format!("if ({expr}) {{ continue; }}")))),
        Directive::BreakIf(expr) => Ok(plain(code(&format!("if ({expr}) {{ break; }}")))),

        Directive::Isset(expr) => {
            // shares the `if` closer
            open(cc, "if", at);
            Ok(plain(code(&format!("if (isset({expr})) {{"))))
        }
        Directive::Default(arg) => {
            let (name, expr) = match arg.split_once('=') {
                Some((name, expr)) => (name.trim().to_string(), expr.trim().to_string()),
                None => (arg.trim().to_string(), "null".to_string()),
            };
            let var = variable(&name);
            Ok(plain(code(&format!(
                "if (!isset({var})) {{ {var} = {expr}; }}"
            ))))
        }
        Directive::Var(expr) => {
            let mut stmt = expr.trim_end().to_string();
            if !stmt.ends_with(';') {
                stmt.push(';');
            }
            Ok(plain(code(&stmt)))
        }

        Directive::Comment => {
            open(cc, "comment", at);
            Ok(plain("<!--"))
        }
        Directive::Close(name) => close_directive(cc, &name, at),

        Directive::Capture(arg) => capture(cc, &arg, at),
        Directive::Function { signature, raw } => function(cc, &signature, raw, at),

        Directive::BaseUrl(path) => Ok(plain(code(&format!(
            "echo baseurl({});",
            emit::quote(&path)
        )))),
        Directive::Dump(expr) => Ok(plain(code(&format!("dump({expr});")))),
        Directive::Note(text) => Ok(plain(code(&format!("/* {text} */")))),

        Directive::Echo(expr) => Ok(Fragment {
            text: emit::echo(&expr),
            echo: Some(expr),
        }),
    }
}

/// Re-emit incidental brace content as literal text, translating any
/// directive spans nested inside it.
fn incidental(
    cc: &mut BlockCompiler,
    span: &[Token],
    at: &Token,
) -> Result<Fragment, CompileError> {
    let mut text = String::new();
    text.push(cc.open);

    let mut i = 0;
    while i < span.len() {
        if matches!(span[i].kind, TokenKind::OpenDelim(_)) {
            // the span was read with balanced delimiters, so the matching
            // closer is in range
            let mut depth = 1usize;
            let mut j = i + 1;
            while j < span.len() {
                match span[j].kind {
                    TokenKind::OpenDelim(_) => depth += 1,
                    TokenKind::CloseDelim(_) => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
                j += 1;
            }
            if depth == 0 {
                let inner = translate(cc, &span[i + 1..j], at)?;
                text.push_str(&inner.text);
                i = j + 1;
                continue;
            }
        }
        text.push_str(&span[i].kind.lexeme());
        i += 1;
    }

    text.push(cc.close);
    Ok(plain(text))
}

fn open(cc: &mut BlockCompiler, name: &'static str, at: &Token) {
    cc.directives.push(OpenDirective {
        name,
        line: at.span.line,
        column: at.span.column,
    });
}

/// Pop the open-directive stack for a `/name` closer and emit the closing
/// fragment. The closer must match the top of the stack.
fn close_directive(
    cc: &mut BlockCompiler,
    name: &str,
    at: &Token,
) -> Result<Fragment, CompileError> {
    let top = match cc.directives.pop() {
        Some(top) => top,
        None => {
            return Err(cc.err_at(
                at,
                ErrorKind::StrayCloser {
                    found: name.to_string(),
                },
            ));
        }
    };

    if top.name != name {
        return Err(cc.err_at(
            at,
            ErrorKind::MismatchedCloser {
                found: name.to_string(),
                expected: top.name.to_string(),
                opened_line: top.line,
                opened_column: top.column,
            },
        ));
    }

    if top.name == "comment" {
        Ok(plain("-->"))
    } else {
        Ok(plain(code("}")))
    }
}

/// Compile a `capture` body into an isolated buffer, then bind the captured
/// text to a variable (quoted name) or a global constant (bareword).
fn capture(cc: &mut BlockCompiler, arg: &str, at: &Token) -> Result<Fragment, CompileError> {
    open(cc, "capture", at);
    let depth = cc.directives.len();
    cc.buffers.push();
    cc.compile_block(&Until::CloseDirective {
        name: "capture",
        depth,
    })?;

    if matches!(cc.cursor.peek(0).kind, TokenKind::Eof) {
        // left open; reported by the end-of-input stack check
        cc.buffers.pop();
        return Ok(plain(String::new()));
    }

    eat_closer(cc)?;
    cc.directives.pop();
    let body = cc.buffers.pop();

    let arg = arg.trim();
    let text = match quoted_name(arg) {
        Some(name) => {
            let var = variable(name);
            code(&format!("{var} = {};", emit::quote(&body)))
        }
        None => code(&format!("define('{arg}', {});", emit::quote(&body))),
    };
    Ok(plain(text))
}

/// Compile a `function` body into an isolated buffer, then splice it back
/// as the body of a named callable. Raw mode (`function!`) copies the body
/// token-for-token with no interpretation.
fn function(
    cc: &mut BlockCompiler,
    signature: &str,
    raw: bool,
    at: &Token,
) -> Result<Fragment, CompileError> {
    open(cc, "function", at);
    let depth = cc.directives.len();
    cc.buffers.push();

    if raw {
        copy_raw(cc)?;
    } else {
        cc.compile_block(&Until::CloseDirective {
            name: "function",
            depth,
        })?;
    }

    if matches!(cc.cursor.peek(0).kind, TokenKind::Eof) {
        cc.buffers.pop();
        return Ok(plain(String::new()));
    }

    eat_closer(cc)?;
    cc.directives.pop();
    let body = cc.buffers.pop();

    let mut sig = signature.trim().to_string();
    if !sig.contains('(') {
        sig.push_str("()");
    }

    let mut text = code(&format!("function {sig} {{"));
    text.push_str(&body);
    text.push_str(&code("}"));
    Ok(plain(text))
}

/// Copy token values verbatim until the `{/function}` lookahead, with no
/// interpretation of markup or directives.
fn copy_raw(cc: &mut BlockCompiler) -> Result<(), CompileError> {
    loop {
        if matches!(cc.cursor.peek(0).kind, TokenKind::Eof) {
            return Ok(());
        }
        let at_closer = matches!(cc.cursor.peek(0).kind, TokenKind::OpenDelim(_))
            && matches!(cc.cursor.peek(1).kind, TokenKind::Slash)
            && matches!(&cc.cursor.peek(2).kind, TokenKind::Text(s) if s == "function")
            && matches!(cc.cursor.peek(3).kind, TokenKind::CloseDelim(_));
        if at_closer {
            return Ok(());
        }
        let tok = cc.next()?;
        let lexeme = tok.kind.lexeme();
        cc.write(&lexeme);
    }
}

/// Consume a `{/name}` closer whose shape the lookahead already verified.
fn eat_closer(cc: &mut BlockCompiler) -> Result<(), CompileError> {
    cc.next()?; // open delimiter
    cc.next()?; // '/'
    cc.next()?; // name
    cc.next()?; // close delimiter
    Ok(())
}

/// `'name'` or `"name"` → `name`.
fn quoted_name(arg: &str) -> Option<&str> {
    let inner = arg
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| arg.strip_prefix('"').and_then(|s| s.strip_suffix('"')))?;
    if inner.is_empty() {
        None
    } else {
        Some(inner)
    }
}

/// Ensure a PHP variable sigil on a name.
fn variable(name: &str) -> String {
    if name.starts_with('$') {
        name.to_string()
    } else {
        format!("${name}")
    }
}
