//! The scanner's view of the host lexer.
//!
//! The host owns the input; the scanner only peeks one character ahead, advances, and marks where its token ends.
//! [`SourceCursor`] implements the same contract over an in-memory `&str` for tooling and tests.

/// Lexer operations the host exposes to the scanner.
pub trait Cursor {
    /// The next character, or `None` at end of input.
    fn lookahead(&self) -> Option<char>;

    /// Consume the lookahead character.
    ///
    /// With `skip` set the character is trivia: the token restarts after it, dropping anything kept so far.
    fn advance(&mut self, skip: bool);

    /// Fix the end of the token at the current position.
    fn mark_end(&mut self);

    /// Whether the cursor has reached end of input.
    fn is_eof(&self) -> bool;
}

/// A [`Cursor`] over a string slice, positioned at a byte offset.
///
/// Token boundaries follow tree-sitter's rules: every skipped character moves the token start past it,
/// [`Cursor::mark_end`] pins the end, and without a mark the end is wherever the cursor stopped.
#[derive(Debug, Clone)]
pub struct SourceCursor<'src> {
    source: &'src str,
    pos: usize,
    token_start: usize,
    marked_end: Option<usize>,
}

impl<'src> SourceCursor<'src> {
    /// Create a cursor at `offset`. Offsets past the end clamp to the end of `source`.
    ///
    /// `offset` should lie on a char boundary; a cursor inside a character sees no lookahead.
    pub fn new(source: &'src str, offset: usize) -> Self {
        let pos = offset.min(source.len());
        Self {
            source,
            pos,
            token_start: pos,
            marked_end: None,
        }
    }

    /// Current byte offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Start of the token being scanned, after any skipped trivia.
    pub fn token_start(&self) -> usize {
        self.token_start
    }

    /// End of the token: the marked end if any, otherwise the current position.
    pub fn token_end(&self) -> usize {
        self.marked_end.unwrap_or(self.pos)
    }
}

impl Cursor for SourceCursor<'_> {
    fn lookahead(&self) -> Option<char> {
        self.source.get(self.pos..).and_then(|rest| rest.chars().next())
    }

    fn advance(&mut self, skip: bool) {
        let Some(c) = self.lookahead() else {
            return;
        };
        self.pos += c.len_utf8();
        if skip {
            self.token_start = self.pos;
        }
    }

    fn mark_end(&mut self) {
        self.marked_end = Some(self.pos);
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.source.len()
    }
}
