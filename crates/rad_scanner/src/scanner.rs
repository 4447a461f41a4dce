//! The NEWLINE / INDENT / DEDENT state machine.

use crate::cursor::Cursor;
use crate::indent::{IndentStack, Pending, measure_indent};
use crate::tokens::{TokenKind, ValidSymbols};
use crate::wire::{self, SERIALIZATION_BUFFER_SIZE, WireError};

// ============================================================================
// SCANNER STATE
// ----------------------------------------------------------------------------
// Per-call decision (simplified):
//
// pending width W?  ──W > top, INDENT ok──▶ push W, emit INDENT
//        │          ──W < top, DEDENT ok──▶ pop, emit DEDENT (W stays pending while top > W)
//        │          ──W == top──────────▶ clear, keep going
//        ▼
// end of input, DEDENT ok, levels open ──▶ pop, emit DEDENT
//        ▼
// '\n', NEWLINE ok ──▶ skip blank lines, measure indent, W := width, emit NEWLINE
//        ▼
//     no token
// ============================================================================

/// Indentation scanner state: the open indentation levels and a measurement waiting to be classified.
///
/// One scanner belongs to one parsing session. It is created fresh with [`Scanner::new`], persisted between
/// incremental parses with [`Scanner::serialize`] / [`Scanner::deserialize`], and released by dropping it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Scanner {
    indents: IndentStack,
    pending: Pending,
}

impl Scanner {
    /// A scanner at the start of a document: levels `[0]`, nothing pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a scanner from parts. The stack is repaired if it breaks its invariants.
    pub fn from_parts(levels: impl IntoIterator<Item = u16>, pending: Pending) -> Self {
        Self {
            indents: IndentStack::from_levels(levels),
            pending,
        }
    }

    pub fn indents(&self) -> &IndentStack {
        &self.indents
    }

    pub fn pending(&self) -> Pending {
        self.pending
    }

    /// Return to the fresh state.
    pub fn reset(&mut self) {
        self.indents.reset();
        self.pending = Pending::NoPending;
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Write the state into `buffer`, returning the number of bytes used.
    ///
    /// `buffer.len()` is the capacity; nothing is written past it. See [`wire`] for the layout and for what happens
    /// to stacks deeper than [`wire::MAX_SERIALIZED_DEPTH`].
    pub fn serialize(&self, buffer: &mut [u8]) -> usize {
        wire::encode(self.pending, &self.indents, buffer)
    }

    /// Serialize into a fresh vector, as if into a tree-sitter buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = vec![0u8; wire::encoded_len(self.indents.depth()).min(SERIALIZATION_BUFFER_SIZE)];
        let len = self.serialize(&mut buffer);
        buffer.truncate(len);
        buffer
    }

    /// Replace the state with whatever `buffer` holds.
    ///
    /// Never fails: an empty buffer resets to the fresh state, missing fields fall back to defaults, and the stack is
    /// repaired so its invariants hold.
    pub fn deserialize(&mut self, buffer: &[u8]) {
        let (pending, indents) = wire::decode_lenient(buffer);
        tracing::trace!(len = buffer.len(), levels = ?indents.levels(), ?pending, "restored scanner state");
        self.pending = pending;
        self.indents = indents;
    }

    /// Decode a scanner from `buffer`, rejecting anything the encoder would not have written.
    pub fn restore(buffer: &[u8]) -> Result<Self, WireError> {
        let (pending, indents) = wire::decode_strict(buffer)?;
        Ok(Self { indents, pending })
    }

    // ========================================================================
    // Scanning
    // ========================================================================

    /// Try to produce one structural token at the cursor.
    ///
    /// `valid` is the set of tokens the grammar accepts here. Returns the token kind on a match, `None` otherwise;
    /// a `None` never consumes input.
    pub fn scan<C: Cursor + ?Sized>(&mut self, cursor: &mut C, valid: ValidSymbols) -> Option<TokenKind> {
        if let Some(kind) = self.resolve_pending(valid) {
            return self.emit(kind);
        }

        if cursor.is_eof() && valid.accepts(TokenKind::Dedent) && self.indents.pop().is_some() {
            return self.emit(TokenKind::Dedent);
        }

        if cursor.lookahead() == Some('\n') && valid.accepts(TokenKind::Newline) {
            cursor.advance(true);
            let mut width = measure_indent(cursor);
            // Blank lines never change indentation; measure the next line instead.
            while matches!(cursor.lookahead(), Some('\n' | '\r')) {
                cursor.advance(true);
                width = measure_indent(cursor);
            }
            self.pending = Pending::Indent(width);
            cursor.mark_end();
            return self.emit(TokenKind::Newline);
        }

        None
    }

    /// Compare the pending width against the innermost level.
    ///
    /// Returns the token to emit, if any. A width equal to the top is consumed silently so scanning can continue.
    fn resolve_pending(&mut self, valid: ValidSymbols) -> Option<TokenKind> {
        let Pending::Indent(width) = self.pending else {
            return None;
        };
        let top = self.indents.top();

        if valid.accepts(TokenKind::Indent) && width > top {
            self.indents.push(width);
            self.pending = Pending::NoPending;
            return Some(TokenKind::Indent);
        }

        if valid.accepts(TokenKind::Dedent) && width < top && self.indents.pop().is_some() {
            // Stay pending while the line is still left of the new top: one DEDENT per call.
            if self.indents.top() <= width {
                self.pending = Pending::NoPending;
            }
            return Some(TokenKind::Dedent);
        }

        if width == top {
            self.pending = Pending::NoPending;
        }
        None
    }

    fn emit(&self, kind: TokenKind) -> Option<TokenKind> {
        tracing::trace!(token = %kind, levels = ?self.indents.levels(), pending = ?self.pending, "scanned");
        Some(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::SourceCursor;

    const ALL: ValidSymbols = ValidSymbols::all();

    /// Run the scanner over `source` the way a permissive host would: accept every structural token, and skip one
    /// character whenever the scanner declines. Returns each token with the stack after it.
    fn drive(source: &str) -> Vec<(TokenKind, Vec<u16>)> {
        let mut scanner = Scanner::new();
        let mut pos = 0;
        let mut out = Vec::new();
        loop {
            let mut cursor = SourceCursor::new(source, pos);
            match scanner.scan(&mut cursor, ALL) {
                Some(kind) => {
                    out.push((kind, scanner.indents().levels().to_vec()));
                    pos = cursor.token_end();
                }
                None => match source[pos..].chars().next() {
                    Some(c) => pos += c.len_utf8(),
                    None => break,
                },
            }
        }
        out
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        drive(source).into_iter().map(|(kind, _)| kind).collect()
    }

    #[test]
    fn test_fresh_scanner() {
        let scanner = Scanner::new();
        assert_eq!(scanner.indents().levels(), &[0]);
        assert_eq!(scanner.pending(), Pending::NoPending);
    }

    #[test]
    fn test_indent_sibling_dedent_sequence() {
        let tokens = drive("a\n    b\n    c\nd");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Newline, vec![0]),
                (TokenKind::Indent, vec![0, 4]),
                (TokenKind::Newline, vec![0, 4]),
                (TokenKind::Newline, vec![0, 4]),
                (TokenKind::Dedent, vec![0]),
            ]
        );
    }

    #[test]
    fn test_tab_measures_like_four_spaces() {
        let mut tabbed = Scanner::new();
        tabbed.scan(&mut SourceCursor::new("\n\tx", 0), ALL);
        let mut spaced = Scanner::new();
        spaced.scan(&mut SourceCursor::new("\n    x", 0), ALL);
        assert_eq!(tabbed.pending(), Pending::Indent(4));
        assert_eq!(tabbed.pending(), spaced.pending());
    }

    #[test]
    fn test_blank_lines_are_invisible() {
        assert_eq!(kinds("a\n\n\nb"), vec![TokenKind::Newline]);
        assert_eq!(
            kinds("a\n  b\n\n    \n\t\n  c"),
            vec![TokenKind::Newline, TokenKind::Indent, TokenKind::Newline, TokenKind::Dedent]
        );
    }

    #[test]
    fn test_carriage_return_line_counts_as_blank() {
        let mut scanner = Scanner::new();
        let mut cursor = SourceCursor::new("\n  \r\n    x", 0);
        assert_eq!(scanner.scan(&mut cursor, ALL), Some(TokenKind::Newline));
        assert_eq!(scanner.pending(), Pending::Indent(4));
        assert_eq!(cursor.token_end(), 9);
    }

    #[test]
    fn test_newline_token_is_zero_width_after_indentation() {
        let mut scanner = Scanner::new();
        let mut cursor = SourceCursor::new("x\n  y", 1);
        assert_eq!(scanner.scan(&mut cursor, ALL), Some(TokenKind::Newline));
        assert_eq!(cursor.token_start(), 4);
        assert_eq!(cursor.token_end(), 4);
    }

    #[test]
    fn test_multi_level_dedent_one_per_call() {
        let mut scanner = Scanner::from_parts([0, 2, 4, 8], Pending::Indent(2));
        let mut cursor = SourceCursor::new("x", 0);
        assert_eq!(scanner.scan(&mut cursor, ALL), Some(TokenKind::Dedent));
        assert_eq!(scanner.indents().levels(), &[0, 2, 4]);
        assert_eq!(scanner.pending(), Pending::Indent(2));
        assert_eq!(scanner.scan(&mut cursor, ALL), Some(TokenKind::Dedent));
        assert_eq!(scanner.indents().levels(), &[0, 2]);
        assert_eq!(scanner.pending(), Pending::NoPending);
        assert_eq!(scanner.scan(&mut cursor, ALL), None);
    }

    #[test]
    fn test_dedent_to_unopened_level_lands_on_outer_level() {
        let mut scanner = Scanner::from_parts([0, 4], Pending::Indent(2));
        let mut cursor = SourceCursor::new("x", 0);
        assert_eq!(scanner.scan(&mut cursor, ALL), Some(TokenKind::Dedent));
        assert_eq!(scanner.indents().levels(), &[0]);
        assert_eq!(scanner.pending(), Pending::NoPending);
    }

    #[test]
    fn test_end_of_input_drains_one_level_per_call() {
        let mut scanner = Scanner::from_parts([0, 2, 4, 8], Pending::NoPending);
        let dedent_only = ValidSymbols::none().with(TokenKind::Dedent);
        for expected in [&[0, 2, 4][..], &[0, 2], &[0]] {
            let mut cursor = SourceCursor::new("", 0);
            assert_eq!(scanner.scan(&mut cursor, dedent_only), Some(TokenKind::Dedent));
            assert_eq!(scanner.indents().levels(), expected);
        }
        assert_eq!(scanner.scan(&mut SourceCursor::new("", 0), dedent_only), None);
    }

    #[test]
    fn test_pending_waits_when_indent_not_accepted() {
        let mut scanner = Scanner::from_parts([0], Pending::Indent(4));
        let newline_only = ValidSymbols::none().with(TokenKind::Newline);
        assert_eq!(scanner.scan(&mut SourceCursor::new("x", 0), newline_only), None);
        assert_eq!(scanner.pending(), Pending::Indent(4));
        assert_eq!(scanner.scan(&mut SourceCursor::new("x", 0), ALL), Some(TokenKind::Indent));
        assert_eq!(scanner.indents().levels(), &[0, 4]);
    }

    #[test]
    fn test_matching_width_clears_and_continues_to_newline() {
        let mut scanner = Scanner::from_parts([0, 4], Pending::Indent(4));
        let mut cursor = SourceCursor::new("\n", 0);
        assert_eq!(scanner.scan(&mut cursor, ALL), Some(TokenKind::Newline));
        assert_eq!(scanner.pending(), Pending::Indent(0));
    }

    #[test]
    fn test_declines_without_consuming() {
        let mut scanner = Scanner::new();
        let mut cursor = SourceCursor::new("x\n", 0);
        assert_eq!(scanner.scan(&mut cursor, ALL), None);
        assert_eq!(cursor.position(), 0);

        let mut cursor = SourceCursor::new("\n", 0);
        assert_eq!(scanner.scan(&mut cursor, ValidSymbols::none()), None);
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_newline_at_end_of_input() {
        let mut scanner = Scanner::from_parts([0, 4], Pending::NoPending);
        let mut cursor = SourceCursor::new("\n", 0);
        assert_eq!(scanner.scan(&mut cursor, ValidSymbols::none().with(TokenKind::Newline)), Some(TokenKind::Newline));
        assert_eq!(scanner.pending(), Pending::Indent(0));
        assert!(cursor.is_eof());
    }

    #[test]
    fn test_serialize_round_trip_and_reset() {
        let scanner = Scanner::from_parts([0, 2, 6], Pending::Indent(3));
        let bytes = scanner.to_bytes();
        assert_eq!(bytes, vec![1, 3, 0, 3, 0, 0, 2, 0, 6, 0]);

        let mut restored = Scanner::new();
        restored.deserialize(&bytes);
        assert_eq!(restored, scanner);
        assert_eq!(Scanner::restore(&bytes), Ok(scanner));

        restored.deserialize(&[]);
        assert_eq!(restored, Scanner::new());
    }

    #[test]
    fn test_nested_blocks_trace() {
        let source = "if a:\n  if b:\n    c\n  d\ne\n";
        let trace: Vec<String> = drive(source)
            .into_iter()
            .map(|(kind, levels)| format!("{kind} {levels:?}"))
            .collect();
        insta::assert_snapshot!(trace.join("\n"), @r"
        NEWLINE [0]
        INDENT [0, 2]
        NEWLINE [0, 2]
        INDENT [0, 2, 4]
        NEWLINE [0, 2, 4]
        DEDENT [0, 2]
        NEWLINE [0, 2]
        DEDENT [0]
        NEWLINE [0]
        ");
    }

    #[test]
    fn test_to_bytes_matches_full_buffer_serialize() {
        let scanner = Scanner::from_parts(0..150u16, Pending::Indent(3));
        let mut buffer = [0u8; SERIALIZATION_BUFFER_SIZE];
        let len = scanner.serialize(&mut buffer);

        let bytes = scanner.to_bytes();
        assert_eq!(bytes.len(), wire::encoded_len(150));
        assert_eq!(bytes, buffer[..len]);
    }
}
