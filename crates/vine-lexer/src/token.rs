use std::fmt;

/// A position in source text, tracking line and column for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }
}

/// Token classification for Vine source.
///
/// Data-carrying variants embed their value directly (no separate `value`
/// field on Token). The delimiter variants carry the configured character so
/// the compiler can reconstruct raw directive text regardless of which pair
/// is in use.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `/`
    Slash,
    /// `\`
    Backslash,
    /// The configured directive-open character (default `{`).
    OpenDelim(char),
    /// The configured directive-close character (default `}`).
    CloseDelim(char),
    /// `=`
    Eq,
    /// `'`
    SingleQuote,
    /// `"`
    DoubleQuote,
    /// A line break (`\n`, `\r\n`, or lone `\r`).
    Newline,
    /// A greedy run of text (first character arbitrary, continued over
    /// alphanumerics, `_` and `-`).
    Text(String),
    /// End of input. Always the final token of a sequence.
    Eof,
}

impl TokenKind {
    /// The literal source text this token stands for, used when re-emitting
    /// passthrough output.
    pub fn lexeme(&self) -> String {
        match self {
            TokenKind::Lt => "<".into(),
            TokenKind::Gt => ">".into(),
            TokenKind::Slash => "/".into(),
            TokenKind::Backslash => "\\".into(),
            TokenKind::OpenDelim(c) | TokenKind::CloseDelim(c) => c.to_string(),
            TokenKind::Eq => "=".into(),
            TokenKind::SingleQuote => "'".into(),
            TokenKind::DoubleQuote => "\"".into(),
            TokenKind::Newline => "\n".into(),
            TokenKind::Text(s) => s.clone(),
            TokenKind::Eof => String::new(),
        }
    }
}

/// Human-readable rendering for diagnostics.
impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Lt => write!(f, "'<'"),
            TokenKind::Gt => write!(f, "'>'"),
            TokenKind::Slash => write!(f, "'/'"),
            TokenKind::Backslash => write!(f, "'\\'"),
            TokenKind::OpenDelim(c) | TokenKind::CloseDelim(c) => write!(f, "'{c}'"),
            TokenKind::Eq => write!(f, "'='"),
            TokenKind::SingleQuote => write!(f, "quote (')"),
            TokenKind::DoubleQuote => write!(f, "quote (\")"),
            TokenKind::Newline => write!(f, "newline"),
            TokenKind::Text(s) => write!(f, "text {s:?}"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

/// A token produced by the Vine lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// HTML5 void elements (self-closing, no children).
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Check if a tag name is an HTML5 void element.
pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}
