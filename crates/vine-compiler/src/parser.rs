//! Block compiler for Vine templates.
//!
//! Walks the token sequence exactly once, left to right, writing literal
//! and generated fragments to the active output buffer. Markup elements
//! recurse through `compile_block`; directive spans are delegated to the
//! translator in `directive`.

use vine_lexer::{is_void_element, Token, TokenKind};

use crate::buffer::OutputStack;
use crate::cursor::Cursor;
use crate::directive;
use crate::emit;
use crate::{CompileError, ErrorKind};

/// A block-opening directive awaiting its closer.
pub(crate) struct OpenDirective {
    pub name: &'static str,
    pub line: usize,
    pub column: usize,
}

/// Terminator condition for `compile_block`. The terminating tokens are
/// never consumed by the block itself; the caller consumes them.
pub(crate) enum Until {
    /// End of input.
    Eof,
    /// Any closing markup tag `</name>`. The caller validates that the name
    /// matches; carrying the expected name and opening position here lets
    /// end-of-input inside the block report the unclosed element.
    CloseTag {
        name: String,
        line: usize,
        column: usize,
    },
    /// The matching closer for a block directive, recognized only once
    /// every directive opened inside the block has been closed again
    /// (`depth` is the open-directive stack depth at block entry).
    CloseDirective { name: &'static str, depth: usize },
}

/// One compilation session: owns the cursor, the open-directive stack, and
/// the output buffer stack. Constructed fresh per compilation.
pub(crate) struct BlockCompiler {
    pub(crate) source: String,
    pub(crate) open: char,
    pub(crate) close: char,
    pub(crate) cursor: Cursor,
    pub(crate) directives: Vec<OpenDirective>,
    pub(crate) buffers: OutputStack,
}

/// A parsed attribute value. `single_echo` carries the echoed expression
/// when the whole quoted value was exactly one expression-echo span, which
/// triggers the boolean-attribute rewrite.
struct AttrValue {
    text: String,
    single_echo: Option<String>,
    quote: Option<char>,
}

impl BlockCompiler {
    pub fn new(source: &str, open: char, close: char, tokens: Vec<Token>) -> Self {
        Self {
            source: source.to_string(),
            open,
            close,
            cursor: Cursor::new(tokens),
            directives: Vec::new(),
            buffers: OutputStack::new(),
        }
    }

    /// Consume tokens until the terminator condition is met, writing
    /// fragments to the active output buffer. The terminating token is left
    /// for the caller.
    pub fn compile_block(&mut self, until: &Until) -> Result<(), CompileError> {
        loop {
            if self.terminated(until) {
                return Ok(());
            }

            let tok = self.next()?;
            match &tok.kind {
                TokenKind::Eof => {
                    return match until {
                        Until::Eof => Ok(()),
                        Until::CloseTag { name, line, column } => Err(CompileError {
                            source: self.source.clone(),
                            line: *line,
                            column: *column,
                            kind: ErrorKind::UnclosedTag {
                                expected: name.clone(),
                            },
                        }),
                        // Left-open block directives are reported by the
                        // stack check once the whole input is consumed.
                        Until::CloseDirective { .. } => Ok(()),
                    };
                }
                TokenKind::Lt => {
                    if let TokenKind::Text(name) = &self.cursor.peek(0).kind {
                        if name.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
                            let name = name.clone();
                            self.element(&tok, name)?;
                            continue;
                        }
                    }
                    self.write("<");
                }
                TokenKind::OpenDelim(_) => {
                    let span = self.read_span(&tok)?;
                    let fragment = directive::translate(self, &span, &tok)?;
                    self.write(&fragment.text);
                }
                _ => {
                    let lexeme = tok.kind.lexeme();
                    self.write(&lexeme);
                }
            }
        }
    }

    /// Lookahead check for the block terminator.
    fn terminated(&self, until: &Until) -> bool {
        match until {
            Until::Eof => matches!(self.cursor.peek(0).kind, TokenKind::Eof),
            Until::CloseTag { .. } => {
                matches!(self.cursor.peek(0).kind, TokenKind::Lt)
                    && matches!(self.cursor.peek(1).kind, TokenKind::Slash)
                    && matches!(self.cursor.peek(2).kind, TokenKind::Text(_))
                    && matches!(self.cursor.peek(3).kind, TokenKind::Gt)
            }
            Until::CloseDirective { name, depth } => {
                self.directives.len() == *depth
                    && matches!(self.cursor.peek(0).kind, TokenKind::OpenDelim(_))
                    && matches!(self.cursor.peek(1).kind, TokenKind::Slash)
                    && matches!(&self.cursor.peek(2).kind, TokenKind::Text(s) if s == name)
                    && matches!(self.cursor.peek(3).kind, TokenKind::CloseDelim(_))
            }
        }
    }

    /// Read the raw token span between balanced directive delimiters. The
    /// opening delimiter has already been consumed; the closing one is
    /// consumed here and not included.
    pub(crate) fn read_span(&mut self, opening: &Token) -> Result<Vec<Token>, CompileError> {
        let mut depth = 1usize;
        let mut span = Vec::new();

        loop {
            let tok = self.next()?;
            match tok.kind {
                TokenKind::Eof => {
                    return Err(self.err_at(
                        opening,
                        ErrorKind::UnterminatedDirective { close: self.close },
                    ));
                }
                TokenKind::OpenDelim(_) => {
                    depth += 1;
                    span.push(tok);
                }
                TokenKind::CloseDelim(_) => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(span);
                    }
                    span.push(tok);
                }
                _ => span.push(tok),
            }
        }
    }

    // =========================================================================
    // Markup elements
    // =========================================================================

    /// Parse an element whose `<` has been consumed and whose name token is
    /// next. Emits the rebuilt open tag, recurses for children, and
    /// validates the closing tag.
    fn element(&mut self, lt: &Token, name: String) -> Result<(), CompileError> {
        self.next()?; // the tag name, already peeked by the caller

        let mut tag = String::new();
        tag.push('<');
        tag.push_str(&name);
        let mut self_closed = false;

        loop {
            let tok = self.next()?;
            match &tok.kind {
                TokenKind::Gt => break,
                TokenKind::Slash => {
                    let next = self.next()?;
                    if matches!(next.kind, TokenKind::Gt) {
                        self_closed = true;
                        break;
                    }
                    self.cursor.unread();
                    tag.push('/');
                }
                TokenKind::Eof => {
                    return Err(self.err_at(
                        lt,
                        ErrorKind::UnexpectedInTag {
                            found: "end of input".into(),
                        },
                    ));
                }
                TokenKind::Text(s) => {
                    if matches!(self.cursor.peek(0).kind, TokenKind::Eq) {
                        if s.trim().is_empty() {
                            let eq = self.cursor.peek(0).clone();
                            return Err(self.err_at(
                                &eq,
                                ErrorKind::UnexpectedInTag {
                                    found: eq.kind.to_string(),
                                },
                            ));
                        }
                        self.next()?; // consume '='
                        let value = self.attribute_value()?;
                        match value.single_echo {
                            Some(expr) => {
                                // Boolean-attribute rewrite: the attribute is
                                // emitted only when the expression is truthy.
                                let q = value.quote.unwrap_or('"');
                                tag.push_str(&emit::code(&format!("if ({expr}) {{")));
                                tag.push_str(s);
                                tag.push('=');
                                tag.push(q);
                                tag.push_str(&emit::echo(&expr));
                                tag.push(q);
                                tag.push_str(&emit::code("}"));
                            }
                            None => {
                                tag.push_str(s);
                                tag.push('=');
                                tag.push_str(&value.text);
                            }
                        }
                    } else {
                        // bare flag or whitespace chunk
                        tag.push_str(s);
                    }
                }
                TokenKind::Eq => {
                    return Err(self.err_at(
                        &tok,
                        ErrorKind::UnexpectedInTag {
                            found: tok.kind.to_string(),
                        },
                    ));
                }
                TokenKind::OpenDelim(_) => {
                    return Err(self.err_at(
                        &tok,
                        ErrorKind::UnexpectedInTag {
                            found: "directive".into(),
                        },
                    ));
                }
                _ => tag.push_str(&tok.kind.lexeme()),
            }
        }

        if self_closed || is_void_element(&name) {
            tag.push_str("/>");
            self.write(&tag);
            return Ok(());
        }

        tag.push('>');
        self.write(&tag);

        let until = Until::CloseTag {
            name: name.clone(),
            line: lt.span.line,
            column: lt.span.column,
        };
        self.compile_block(&until)?;

        // Consume `</name>` — the terminator lookahead guarantees the shape.
        self.next()?; // '<'
        self.next()?; // '/'
        let close_tok = self.next()?;
        let closing = match &close_tok.kind {
            TokenKind::Text(s) => s.clone(),
            _ => String::new(),
        };
        self.next()?; // '>'

        if closing != name {
            return Err(self.err_at(
                &close_tok,
                ErrorKind::MismatchedTag {
                    found: closing,
                    expected: name,
                    opened_line: lt.span.line,
                    opened_column: lt.span.column,
                },
            ));
        }

        self.write(&format!("</{closing}>"));
        Ok(())
    }

    /// Parse an attribute value after `=`: a quoted string (which may embed
    /// directive spans), an unquoted directive expression, or a bare token
    /// run.
    fn attribute_value(&mut self) -> Result<AttrValue, CompileError> {
        match self.cursor.peek(0).kind {
            TokenKind::SingleQuote | TokenKind::DoubleQuote => self.quoted_value(),
            TokenKind::OpenDelim(_) => {
                let opening = self.next()?;
                let span = self.read_span(&opening)?;
                let fragment = directive::translate(self, &span, &opening)?;
                Ok(AttrValue {
                    text: fragment.text,
                    single_echo: None,
                    quote: None,
                })
            }
            _ => {
                let mut text = String::new();
                loop {
                    let done = match &self.cursor.peek(0).kind {
                        TokenKind::Gt | TokenKind::Newline | TokenKind::Eof => true,
                        TokenKind::Slash => matches!(self.cursor.peek(1).kind, TokenKind::Gt),
                        TokenKind::Text(s) => s.starts_with(char::is_whitespace),
                        _ => false,
                    };
                    if done {
                        break;
                    }
                    let tok = self.next()?;
                    text.push_str(&tok.kind.lexeme());
                }
                Ok(AttrValue {
                    text,
                    single_echo: None,
                    quote: None,
                })
            }
        }
    }

    /// Parse a quoted attribute value, honoring the active quote character
    /// and backslash-escaped quotes, translating embedded directive spans.
    fn quoted_value(&mut self) -> Result<AttrValue, CompileError> {
        let opening = self.next()?;
        let q = match opening.kind {
            TokenKind::SingleQuote => '\'',
            _ => '"',
        };

        let mut text = String::new();
        text.push(q);
        let mut spans = 0usize;
        let mut literal_seen = false;
        let mut last_echo = None;

        loop {
            let tok = self.next()?;
            if tok.kind == opening.kind {
                text.push(q);
                break;
            }
            match &tok.kind {
                TokenKind::Eof => {
                    return Err(self.err_at(&opening, ErrorKind::UnterminatedQuote));
                }
                TokenKind::Backslash => {
                    // An escaped quote stays literal and does not end the value.
                    if matches!(
                        self.cursor.peek(0).kind,
                        TokenKind::SingleQuote | TokenKind::DoubleQuote
                    ) {
                        let quote = self.next()?;
                        text.push('\\');
                        text.push_str(&quote.kind.lexeme());
                    } else {
                        text.push('\\');
                    }
                    literal_seen = true;
                }
                TokenKind::OpenDelim(_) => {
                    let span = self.read_span(&tok)?;
                    let fragment = directive::translate(self, &span, &tok)?;
                    text.push_str(&fragment.text);
                    spans += 1;
                    last_echo = fragment.echo;
                }
                _ => {
                    text.push_str(&tok.kind.lexeme());
                    literal_seen = true;
                }
            }
        }

        let single_echo = if !literal_seen && spans == 1 {
            last_echo
        } else {
            None
        };
        Ok(AttrValue {
            text,
            single_echo,
            quote: Some(q),
        })
    }

    // =========================================================================
    // Session plumbing
    // =========================================================================

    /// Append a fragment to the active output buffer.
    pub(crate) fn write(&mut self, fragment: &str) {
        self.buffers.write(fragment);
    }

    /// Consume the next token, mapping a tripped stall guard to a
    /// compilation error.
    pub(crate) fn next(&mut self) -> Result<Token, CompileError> {
        self.cursor.next().map_err(|stall| CompileError {
            source: self.source.clone(),
            line: stall.token.span.line,
            column: stall.token.span.column,
            kind: ErrorKind::Stalled {
                token: stall.token.kind.to_string(),
            },
        })
    }

    pub(crate) fn err_at(&self, tok: &Token, kind: ErrorKind) -> CompileError {
        CompileError {
            source: self.source.clone(),
            line: tok.span.line,
            column: tok.span.column,
            kind,
        }
    }

    /// Final checks and teardown: every opened directive must have been
    /// closed; the root buffer becomes the output after the collapse pass.
    pub(crate) fn finish(self) -> Result<String, CompileError> {
        if let Some(first) = self.directives.first() {
            let (line, column) = (first.line, first.column);
            let list = self
                .directives
                .iter()
                .map(|d| format!("'{}' at {}:{}", d.name, d.line, d.column))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(CompileError {
                source: self.source,
                line,
                column,
                kind: ErrorKind::UnclosedDirectives { list },
            });
        }

        Ok(emit::collapse(&self.buffers.into_root()))
    }
}
