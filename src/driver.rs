//! Host session driver.
//!
//! Plays the role of the parsing engine around the scanner: it asks [`Scanner::scan`] for a structural token at
//! every position, and when the scanner declines it applies the grammar's own lexical rules (extras, comments,
//! everything else as opaque content). Used by the CLI to show how a document tokenizes, and by tests to exercise the
//! scanner the way tree-sitter does, including state persistence between calls.
//!
//! ## Notes
//! - Every session owns its scanner; nothing is shared between sessions.
//! - [`Session::snapshot`] + [`Session::resume`] model an incremental re-parse: the host stores scanner state at a
//!   token boundary and later restarts lexing there.

use std::fmt;

use rad_scanner::{Scanner, SourceCursor, TokenKind};
use serde::Serialize;
use thiserror::Error;

use crate::config::LexConfig;

// ============================================================================
// TOKEN TYPES
// ============================================================================

/// Byte range of a token in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What the session produced: one of the scanner's structural tokens, or a run of other text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LexKind {
    Newline,
    Indent,
    Dedent,
    /// Anything the grammar lexes itself (identifiers, operators, literals...)
    Content,
}

impl LexKind {
    pub fn name(self) -> &'static str {
        match self {
            LexKind::Newline => TokenKind::Newline.name(),
            LexKind::Indent => TokenKind::Indent.name(),
            LexKind::Dedent => TokenKind::Dedent.name(),
            LexKind::Content => "CONTENT",
        }
    }

    pub fn is_structural(self) -> bool {
        !matches!(self, LexKind::Content)
    }
}

impl From<TokenKind> for LexKind {
    fn from(kind: TokenKind) -> Self {
        match kind {
            TokenKind::Newline => LexKind::Newline,
            TokenKind::Indent => LexKind::Indent,
            TokenKind::Dedent => LexKind::Dedent,
        }
    }
}

impl fmt::Display for LexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A token together with the indentation levels open right after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LexToken {
    pub kind: LexKind,
    pub span: Span,
    pub levels: Vec<u16>,
}

/// Errors when restarting a session mid-document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("offset {offset} is past the end of the source ({len} bytes)")]
    OffsetOutOfRange { offset: usize, len: usize },

    #[error("offset {0} is not on a character boundary")]
    NotCharBoundary(usize),
}

// ============================================================================
// SESSION
// ============================================================================

/// One parsing session over a document, yielding tokens in order.
pub struct Session<'src> {
    source: &'src str,
    pos: usize,
    scanner: Scanner,
    config: LexConfig,
    state_buffer: Vec<u8>,
}

impl<'src> Session<'src> {
    /// Start at the beginning of `source` with a fresh scanner.
    pub fn new(source: &'src str, config: LexConfig) -> Self {
        Self {
            source,
            pos: 0,
            scanner: Scanner::new(),
            config,
            state_buffer: Vec::new(),
        }
    }

    /// Restart at `offset` with scanner state restored from `state`.
    ///
    /// `state` goes through the scanner's lenient deserializer, so any bytes are accepted.
    pub fn resume(source: &'src str, offset: usize, state: &[u8], config: LexConfig) -> Result<Self, SessionError> {
        if offset > source.len() {
            return Err(SessionError::OffsetOutOfRange {
                offset,
                len: source.len(),
            });
        }
        if !source.is_char_boundary(offset) {
            return Err(SessionError::NotCharBoundary(offset));
        }

        let mut session = Self::new(source, config);
        session.pos = offset;
        session.scanner.deserialize(state);
        tracing::debug!(offset, levels = ?session.scanner.indents().levels(), "resumed session");
        Ok(session)
    }

    /// Byte offset where the next token will be looked for.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    /// Serialize the scanner with the configured capacity, as the host would before an edit.
    pub fn snapshot(&self) -> Vec<u8> {
        let mut buffer = vec![0u8; self.config.state_capacity];
        let len = self.scanner.serialize(&mut buffer);
        buffer.truncate(len);
        buffer
    }

    fn token(&self, kind: LexKind, span: Span) -> LexToken {
        LexToken {
            kind,
            span,
            levels: self.scanner.indents().levels().to_vec(),
        }
    }

    /// Persist and restore the scanner, as if the host had re-created it between calls.
    fn checkpoint(&mut self) {
        self.state_buffer.resize(self.config.state_capacity, 0);
        let len = self.scanner.serialize(&mut self.state_buffer);
        let mut restored = Scanner::new();
        restored.deserialize(&self.state_buffer[..len]);
        self.scanner = restored;
    }

    fn scan_structural(&mut self) -> Option<LexToken> {
        if self.config.checkpoint {
            self.checkpoint();
        }
        let mut cursor = SourceCursor::new(self.source, self.pos);
        let kind = self.scanner.scan(&mut cursor, self.config.accept)?;
        let span = Span::new(cursor.token_start(), cursor.token_end());
        self.pos = cursor.token_end();
        Some(self.token(kind.into(), span))
    }
}

impl Iterator for Session<'_> {
    type Item = LexToken;

    fn next(&mut self) -> Option<LexToken> {
        loop {
            if let Some(token) = self.scan_structural() {
                return Some(token);
            }

            let rest = self.source.get(self.pos..)?;
            let c = rest.chars().next()?;
            if is_extra(c) {
                self.pos += c.len_utf8();
                continue;
            }
            if self.config.skip_comments && rest.starts_with("//") {
                self.pos += rest.find('\n').unwrap_or(rest.len());
                continue;
            }

            let start = self.pos;
            self.pos += content_len(rest, self.config.skip_comments);
            return Some(self.token(LexKind::Content, Span::new(start, self.pos)));
        }
    }
}

/// Whitespace the grammar skips between tokens. A newline only gets here when NEWLINE is not accepted.
fn is_extra(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\x0c' | '\r' | '\n')
}

/// Length of the content run at the start of `rest`: up to whitespace or the start of a comment.
fn content_len(rest: &str, skip_comments: bool) -> usize {
    rest.char_indices()
        .skip(1)
        .find(|&(i, c)| is_extra(c) || (skip_comments && rest[i..].starts_with("//")))
        .map_or(rest.len(), |(i, _)| i)
}

// ============================================================================
// Entry points
// ============================================================================

/// Tokenize `source` with the default configuration.
pub fn lex(source: &str) -> Vec<LexToken> {
    lex_with_config(source, &LexConfig::default())
}

/// Tokenize `source` in a single session.
#[tracing::instrument(skip_all, fields(source_len = source.len(), checkpoint = config.checkpoint))]
pub fn lex_with_config(source: &str, config: &LexConfig) -> Vec<LexToken> {
    let tokens: Vec<LexToken> = Session::new(source, config.clone()).collect();
    tracing::debug!(token_count = tokens.len(), "lexed document");
    tokens
}

/// One line per token: kind, byte range, then the open levels (structural tokens) or the text (content).
pub fn render(source: &str, tokens: &[LexToken]) -> String {
    let mut out = String::new();
    for token in tokens {
        let Span { start, end } = token.span;
        let detail = if token.kind.is_structural() {
            format!("{:?}", token.levels)
        } else {
            format!("{:?}", source.get(start..end).unwrap_or_default())
        };
        out.push_str(&format!("{:<7} {start}..{end} {detail}\n", token.kind.name()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rad_scanner::ValidSymbols;

    fn kinds(tokens: &[LexToken]) -> Vec<LexKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_content_and_structure() {
        let tokens = lex("x = 1\nif x:\n    y\n");
        assert_eq!(
            kinds(&tokens),
            vec![
                LexKind::Content,
                LexKind::Content,
                LexKind::Content,
                LexKind::Newline,
                LexKind::Content,
                LexKind::Content,
                LexKind::Newline,
                LexKind::Indent,
                LexKind::Content,
                LexKind::Newline,
                LexKind::Dedent,
            ]
        );
        assert_eq!(tokens.last().map(|t| t.levels.clone()), Some(vec![0]));
    }

    #[test]
    fn test_comments_are_trivia() {
        let tokens = lex("a // note\nb");
        assert_eq!(kinds(&tokens), vec![LexKind::Content, LexKind::Newline, LexKind::Content]);

        let config = LexConfig::default().with_skip_comments(false);
        let tokens = lex_with_config("a//b", &config);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].span, Span::new(0, 4));
    }

    #[test]
    fn test_content_stops_at_comment() {
        let tokens = lex("a//b");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].span, Span::new(0, 1));
    }

    #[test]
    fn test_newline_without_acceptance_is_trivia() {
        let config = LexConfig::default().with_accept(ValidSymbols::none());
        let tokens = lex_with_config("a\n    b\n", &config);
        assert_eq!(kinds(&tokens), vec![LexKind::Content, LexKind::Content]);
    }

    #[test]
    fn test_structural_spans_are_zero_width() {
        let tokens = lex("a\n  b");
        assert_eq!(tokens[1].kind, LexKind::Newline);
        assert_eq!(tokens[1].span, Span::new(4, 4));
        assert_eq!(tokens[2].kind, LexKind::Indent);
        assert!(tokens[2].span.is_empty());
    }

    #[test]
    fn test_resume_rejects_bad_offsets() {
        let config = LexConfig::default();
        assert_eq!(
            Session::resume("ab", 3, &[], config.clone()).err(),
            Some(SessionError::OffsetOutOfRange { offset: 3, len: 2 })
        );
        assert_eq!(
            Session::resume("é", 1, &[], config).err(),
            Some(SessionError::NotCharBoundary(1))
        );
    }

    #[test]
    fn test_resume_continues_with_restored_state() {
        let source = "a\n    b\nc";
        let mut session = Session::new(source, LexConfig::default());
        // CONTENT, NEWLINE, INDENT
        for _ in 0..3 {
            session.next();
        }
        let snapshot = session.snapshot();
        let offset = session.position();
        let rest: Vec<LexToken> = session.collect();

        let resumed = Session::resume(source, offset, &snapshot, LexConfig::default()).unwrap();
        assert_eq!(resumed.scanner().indents().levels(), &[0, 4]);
        assert_eq!(resumed.collect::<Vec<_>>(), rest);
    }

    #[test]
    fn test_render() {
        let source = "a\n  b";
        insta::assert_snapshot!(render(source, &lex(source)), @r#"
        CONTENT 0..1 "a"
        NEWLINE 4..4 [0]
        INDENT  4..4 [0, 2]
        CONTENT 4..5 "b"
        DEDENT  5..5 [0]
        "#);
    }
}
