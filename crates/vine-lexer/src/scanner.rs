use crate::token::{Span, Token, TokenKind};

/// Defensive circuit breaker on the scan loop. Each iteration consumes at
/// least one character, so a healthy scan can never get near this; tripping
/// it aborts production with the sequence built so far.
const MAX_STEPS: usize = 1_000_000;

/// Vine source scanner.
///
/// Tokenizes template source into a flat stream of tokens, eagerly and in
/// one pass over the whole input. The scanner never fails: every character
/// maps to some token, and the stream always ends with a single `Eof`.
///
/// The directive delimiter pair is configurable but fixed for the whole
/// scan; a backslash immediately before either delimiter escapes it into a
/// literal text token.
pub struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
    open: char,
    close: char,
}

impl Scanner {
    /// Create a new scanner with the default `{` `}` delimiters.
    pub fn new(source: &str) -> Self {
        Self::with_delimiters(source, '{', '}')
    }

    /// Create a scanner with a specific directive delimiter pair.
    pub fn with_delimiters(source: &str, open: char, close: char) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
            open,
            close,
        }
    }

    /// Tokenize the entire source with default delimiters.
    pub fn tokenize(source: &str) -> Vec<Token> {
        Scanner::new(source).scan()
    }

    /// Scan all tokens from the source, consuming the scanner.
    pub fn scan(mut self) -> Vec<Token> {
        let mut steps = 0;
        while !self.is_at_end() {
            steps += 1;
            if steps > MAX_STEPS {
                break;
            }
            self.scan_token();
        }

        self.emit_here(TokenKind::Eof);
        self.tokens
    }

    /// Scan the next token.
    fn scan_token(&mut self) {
        let ch = self.peek();

        // Escaped delimiter: `\{` or `\}` becomes literal text.
        if ch == '\\' && (self.peek_next() == self.open || self.peek_next() == self.close) {
            let start = self.here();
            self.advance();
            let delim = self.peek();
            self.advance();
            self.push(TokenKind::Text(delim.to_string()), start);
            return;
        }

        if ch == self.open {
            self.emit_here(TokenKind::OpenDelim(ch));
            self.advance();
            return;
        }
        if ch == self.close {
            self.emit_here(TokenKind::CloseDelim(ch));
            self.advance();
            return;
        }

        match ch {
            '<' => {
                self.emit_here(TokenKind::Lt);
                self.advance();
            }
            '>' => {
                self.emit_here(TokenKind::Gt);
                self.advance();
            }
            '/' => {
                self.emit_here(TokenKind::Slash);
                self.advance();
            }
            '\\' => {
                self.emit_here(TokenKind::Backslash);
                self.advance();
            }
            '=' => {
                self.emit_here(TokenKind::Eq);
                self.advance();
            }
            '\'' => {
                self.emit_here(TokenKind::SingleQuote);
                self.advance();
            }
            '"' => {
                self.emit_here(TokenKind::DoubleQuote);
                self.advance();
            }
            '\n' => {
                self.emit_here(TokenKind::Newline);
                self.advance();
            }
            '\r' => {
                // Handle \r\n as a single newline
                self.emit_here(TokenKind::Newline);
                self.advance();
                if self.peek() == '\n' {
                    self.advance();
                } else {
                    self.line += 1;
                    self.column = 1;
                }
            }
            _ => self.scan_text(),
        }
    }

    /// Scan a text run: the first character is arbitrary, then the run
    /// extends greedily while the following characters are alphanumeric,
    /// underscore, or hyphen.
    fn scan_text(&mut self) {
        let start = self.here();
        let mut text = String::new();
        text.push(self.peek());
        self.advance();

        while !self.is_at_end() {
            let c = self.peek();
            if c.is_alphanumeric() || c == '_' || c == '-' {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }

        self.push(TokenKind::Text(text), start);
    }

    // --- Helpers ---

    fn here(&self) -> Span {
        Span::new(self.pos, self.pos, self.line, self.column)
    }

    fn emit_here(&mut self, kind: TokenKind) {
        let span = self.here();
        self.tokens.push(Token::new(kind, span));
    }

    fn push(&mut self, kind: TokenKind, start: Span) {
        let span = Span::new(start.start, self.pos, start.line, start.column);
        self.tokens.push(Token::new(kind, span));
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.chars[self.pos]
        }
    }

    fn peek_next(&self) -> char {
        if self.pos + 1 >= self.chars.len() {
            '\0'
        } else {
            self.chars[self.pos + 1]
        }
    }

    /// Advance one character, keeping row/column tracking correct across
    /// embedded line breaks.
    fn advance(&mut self) {
        if self.is_at_end() {
            return;
        }
        if self.chars[self.pos] == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.pos += 1;
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Helper: tokenize and return token kinds (ignoring spans).
    fn kinds(source: &str) -> Vec<TokenKind> {
        Scanner::tokenize(source)
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn text(s: &str) -> TokenKind {
        TokenKind::Text(s.into())
    }

    // =========================================================================
    // Structure: empty, newlines, EOF
    // =========================================================================

    #[test]
    fn test_empty_source() {
        let toks = Scanner::tokenize("");
        assert_eq!(toks.len(), 1);
        assert_eq!(toks[0].kind, TokenKind::Eof);
    }

    #[test]
    fn test_single_newline() {
        assert_eq!(kinds("\n"), vec![TokenKind::Newline, TokenKind::Eof]);
    }

    #[test]
    fn test_windows_line_endings() {
        assert_eq!(kinds("\r\n"), vec![TokenKind::Newline, TokenKind::Eof]);
    }

    #[test]
    fn test_carriage_return_only() {
        assert_eq!(kinds("\r"), vec![TokenKind::Newline, TokenKind::Eof]);
    }

    #[test]
    fn test_line_tracking_after_crlf() {
        let toks = Scanner::tokenize("\r\nx");
        let x = toks.iter().find(|t| t.kind == text("x")).unwrap();
        assert_eq!(x.span.line, 2);
        assert_eq!(x.span.column, 1);
    }

    // =========================================================================
    // Single-character tokens
    // =========================================================================

    #[test]
    fn test_markup_singles() {
        assert_eq!(
            kinds("</>"),
            vec![
                TokenKind::Lt,
                TokenKind::Slash,
                TokenKind::Gt,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_assign_and_quotes() {
        assert_eq!(
            kinds("='\""),
            vec![
                TokenKind::Eq,
                TokenKind::SingleQuote,
                TokenKind::DoubleQuote,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_default_delimiters() {
        assert_eq!(
            kinds("{}"),
            vec![
                TokenKind::OpenDelim('{'),
                TokenKind::CloseDelim('}'),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lone_backslash() {
        assert_eq!(kinds("\\"), vec![TokenKind::Backslash, TokenKind::Eof]);
    }

    // =========================================================================
    // Text runs
    // =========================================================================

    #[test]
    fn test_simple_text_run() {
        assert_eq!(kinds("div"), vec![text("div"), TokenKind::Eof]);
    }

    #[test]
    fn test_text_run_with_hyphen_and_underscore() {
        assert_eq!(kinds("data-id_1"), vec![text("data-id_1"), TokenKind::Eof]);
    }

    #[test]
    fn test_space_starts_its_own_run() {
        // A space is an arbitrary first character; the run then absorbs the word.
        assert_eq!(
            kinds("div class"),
            vec![text("div"), text(" class"), TokenKind::Eof]
        );
    }

    #[test]
    fn test_punctuation_splits_runs() {
        assert_eq!(
            kinds("a.b"),
            vec![text("a"), text(".b"), TokenKind::Eof]
        );
    }

    #[test]
    fn test_apostrophe_splits_text() {
        assert_eq!(
            kinds("don't"),
            vec![
                text("don"),
                TokenKind::SingleQuote,
                text("t"),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_markup_snippet() {
        assert_eq!(
            kinds("<div class=\"x\">"),
            vec![
                TokenKind::Lt,
                text("div"),
                text(" class"),
                TokenKind::Eq,
                TokenKind::DoubleQuote,
                text("x"),
                TokenKind::DoubleQuote,
                TokenKind::Gt,
                TokenKind::Eof,
            ]
        );
    }

    // =========================================================================
    // Escaped delimiters
    // =========================================================================

    #[test]
    fn test_escaped_open_delimiter() {
        assert_eq!(kinds("\\{"), vec![text("{"), TokenKind::Eof]);
    }

    #[test]
    fn test_escaped_close_delimiter() {
        assert_eq!(kinds("\\}"), vec![text("}"), TokenKind::Eof]);
    }

    #[test]
    fn test_backslash_before_other_char_stays_backslash() {
        assert_eq!(
            kinds("\\n"),
            vec![TokenKind::Backslash, text("n"), TokenKind::Eof]
        );
    }

    #[test]
    fn test_escaped_pair_wraps_literal_text() {
        assert_eq!(
            kinds("\\{x\\}"),
            vec![text("{"), text("x"), text("}"), TokenKind::Eof]
        );
    }

    // =========================================================================
    // Configurable delimiters
    // =========================================================================

    #[test]
    fn test_custom_delimiters() {
        let toks = Scanner::with_delimiters("[x]", '[', ']').scan();
        let k: Vec<_> = toks.into_iter().map(|t| t.kind).collect();
        assert_eq!(
            k,
            vec![
                TokenKind::OpenDelim('['),
                text("x"),
                TokenKind::CloseDelim(']'),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_custom_delimiters_escape() {
        let toks = Scanner::with_delimiters("\\[", '[', ']').scan();
        let k: Vec<_> = toks.into_iter().map(|t| t.kind).collect();
        assert_eq!(k, vec![text("["), TokenKind::Eof]);
    }

    #[test]
    fn test_braces_are_text_under_custom_delimiters() {
        let toks = Scanner::with_delimiters("{a}", '[', ']').scan();
        let k: Vec<_> = toks.into_iter().map(|t| t.kind).collect();
        assert_eq!(k, vec![text("{a"), text("}"), TokenKind::Eof]);
    }

    // =========================================================================
    // Span tracking
    // =========================================================================

    #[test]
    fn test_span_line_column() {
        let toks = Scanner::tokenize("ab\ncd");
        assert_eq!(toks[0].span.line, 1);
        assert_eq!(toks[0].span.column, 1);
        let cd = toks.iter().find(|t| t.kind == text("cd")).unwrap();
        assert_eq!(cd.span.line, 2);
        assert_eq!(cd.span.column, 1);
    }

    #[test]
    fn test_span_column_mid_line() {
        let toks = Scanner::tokenize("<p>");
        assert_eq!(toks[1].span.column, 2); // "p"
        assert_eq!(toks[2].span.column, 3); // ">"
    }

    #[test]
    fn test_eof_span_points_past_input() {
        let toks = Scanner::tokenize("ab");
        let eof = toks.last().unwrap();
        assert_eq!(eof.kind, TokenKind::Eof);
        assert_eq!(eof.span.column, 3);
    }

    // =========================================================================
    // Lexemes round-trip
    // =========================================================================

    #[test]
    fn test_lexemes_reconstruct_source() {
        let source = "<p id=\"a\">don't / \\ = {x}</p>\n";
        let rebuilt: String = Scanner::tokenize(source)
            .iter()
            .map(|t| t.kind.lexeme())
            .collect();
        assert_eq!(rebuilt, source);
    }
}
