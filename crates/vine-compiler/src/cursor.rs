//! Token cursor with lookahead, single-step rollback, and a
//! consumption-stall guard.

use vine_lexer::{Token, TokenKind};

/// How many consecutive consumption requests may repeat the same cursor
/// position before the parse is declared stalled. This guards against
/// compiler bugs producing unbounded loops, not against any valid input.
pub(crate) const STALL_LIMIT: usize = 100;

/// Raised when the cursor detects a non-terminating parse.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Stall {
    pub token: Token,
}

/// An index into the token sequence.
///
/// Lookahead by arbitrary offset never consumes; reading past the end
/// returns the trailing end-of-input token repeatedly. `unread` rolls the
/// cursor back a single step.
pub(crate) struct Cursor {
    tokens: Vec<Token>,
    pos: usize,
    last_pos: usize,
    stalled: usize,
}

impl Cursor {
    /// The token sequence must end with `Eof`; the scanner guarantees this.
    pub fn new(tokens: Vec<Token>) -> Self {
        debug_assert!(matches!(
            tokens.last().map(|t| &t.kind),
            Some(TokenKind::Eof)
        ));
        Self {
            tokens,
            pos: 0,
            last_pos: usize::MAX,
            stalled: 0,
        }
    }

    /// Look ahead `offset` tokens without consuming. Clamped to the trailing
    /// end-of-input token.
    pub fn peek(&self, offset: usize) -> &Token {
        let last = self.tokens.len() - 1;
        let at = self.pos.saturating_add(offset).min(last);
        &self.tokens[at]
    }

    /// Consume and return the current token. The cursor does not advance
    /// past the trailing end-of-input token; repeated requests there (or
    /// after repeated rollbacks) trip the stall guard.
    pub fn next(&mut self) -> Result<Token, Stall> {
        if self.pos == self.last_pos {
            self.stalled += 1;
            if self.stalled > STALL_LIMIT {
                return Err(Stall {
                    token: self.peek(0).clone(),
                });
            }
        } else {
            self.last_pos = self.pos;
            self.stalled = 0;
        }

        let token = self.peek(0).clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        Ok(token)
    }

    /// Roll the cursor back one token.
    pub fn unread(&mut self) {
        self.pos = self.pos.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vine_lexer::Scanner;

    fn cursor(source: &str) -> Cursor {
        Cursor::new(Scanner::tokenize(source))
    }

    #[test]
    fn test_peek_does_not_consume() {
        let c = cursor("ab");
        assert_eq!(c.peek(0).kind, TokenKind::Text("ab".into()));
        assert_eq!(c.peek(0).kind, TokenKind::Text("ab".into()));
    }

    #[test]
    fn test_peek_past_end_returns_eof() {
        let c = cursor("x");
        assert_eq!(c.peek(10).kind, TokenKind::Eof);
        assert_eq!(c.peek(1000).kind, TokenKind::Eof);
    }

    #[test]
    fn test_next_walks_sequence() {
        let mut c = cursor("a<");
        assert_eq!(c.next().unwrap().kind, TokenKind::Text("a".into()));
        assert_eq!(c.next().unwrap().kind, TokenKind::Lt);
        assert_eq!(c.next().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn test_next_at_end_repeats_eof() {
        let mut c = cursor("");
        assert_eq!(c.next().unwrap().kind, TokenKind::Eof);
        assert_eq!(c.next().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn test_unread_single_step() {
        let mut c = cursor("a<");
        let first = c.next().unwrap();
        c.unread();
        assert_eq!(c.next().unwrap(), first);
    }

    #[test]
    fn test_stall_guard_trips_on_unread_loop() {
        let mut c = cursor("a");
        let mut tripped = false;
        for _ in 0..(STALL_LIMIT * 2) {
            match c.next() {
                Ok(_) => c.unread(),
                Err(stall) => {
                    assert_eq!(stall.token.kind, TokenKind::Text("a".into()));
                    tripped = true;
                    break;
                }
            }
        }
        assert!(tripped, "stall guard never tripped");
    }

    #[test]
    fn test_stall_guard_trips_reading_past_end() {
        let mut c = cursor("");
        let mut tripped = false;
        for _ in 0..(STALL_LIMIT * 2) {
            if c.next().is_err() {
                tripped = true;
                break;
            }
        }
        assert!(tripped, "stall guard never tripped at end of input");
    }

    #[test]
    fn test_forward_progress_never_stalls() {
        let mut c = cursor("a b c d e f g h");
        while c.peek(0).kind != TokenKind::Eof {
            c.next().unwrap();
        }
    }
}
