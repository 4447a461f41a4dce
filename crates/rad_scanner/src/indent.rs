//! Indentation levels and the deferred measurement taken at a line break.

use crate::cursor::Cursor;

/// Width of a tab. Not configurable: tabs always count 4, spaces always count 1.
pub const TAB_WIDTH: u16 = 4;

// ============================================================================
// INDENT STACK
// ============================================================================

/// The currently open indentation levels, bottom to top.
///
/// Never empty, the bottom level is always 0, and each level is strictly wider than the one below it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndentStack {
    levels: Vec<u16>,
}

impl Default for IndentStack {
    fn default() -> Self {
        Self::new()
    }
}

impl IndentStack {
    /// A stack holding only the base level 0.
    pub fn new() -> Self {
        Self { levels: vec![0] }
    }

    /// Build a stack from arbitrary levels, repairing anything that breaks the invariants.
    ///
    /// A missing base level is inserted, and any level not wider than the one below it is dropped.
    pub fn from_levels<I: IntoIterator<Item = u16>>(levels: I) -> Self {
        let mut stack = Self::new();
        for level in levels {
            if level > stack.top() {
                stack.levels.push(level);
            }
        }
        stack
    }

    /// The innermost open level.
    pub fn top(&self) -> u16 {
        self.levels.last().copied().unwrap_or(0)
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Whether anything is open above the base level.
    pub fn has_open_levels(&self) -> bool {
        self.levels.len() > 1
    }

    pub fn levels(&self) -> &[u16] {
        &self.levels
    }

    /// Open a new level. Returns `false` (and leaves the stack alone) unless `width` is wider than the top.
    pub fn push(&mut self, width: u16) -> bool {
        if width > self.top() {
            self.levels.push(width);
            true
        } else {
            false
        }
    }

    /// Close the innermost level. The base level is never popped.
    pub fn pop(&mut self) -> Option<u16> {
        if self.has_open_levels() {
            self.levels.pop()
        } else {
            None
        }
    }

    pub fn reset(&mut self) {
        self.levels.clear();
        self.levels.push(0);
    }
}

// ============================================================================
// PENDING INDENT
// ============================================================================

/// An indentation width measured at a line break and not yet compared against the stack.
///
/// Classification waits for the next scan call, because whether the width becomes INDENT, DEDENT or nothing depends
/// on which tokens the grammar accepts there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Pending {
    #[default]
    NoPending,
    Indent(u16),
}

impl Pending {
    pub fn width(self) -> Option<u16> {
        match self {
            Pending::NoPending => None,
            Pending::Indent(width) => Some(width),
        }
    }

    pub fn is_pending(self) -> bool {
        matches!(self, Pending::Indent(_))
    }
}

// ============================================================================
// MEASUREMENT
// ============================================================================

/// Consume leading spaces and then tabs as trivia, returning the accumulated width.
///
/// Spaces after the first tab are left for the caller; the measurement mirrors the grammar's notion of indentation,
/// not a column count. Widths saturate at `u16::MAX`.
pub(crate) fn measure_indent<C: Cursor + ?Sized>(cursor: &mut C) -> u16 {
    let mut width: u16 = 0;
    while cursor.lookahead() == Some(' ') {
        width = width.saturating_add(1);
        cursor.advance(true);
    }
    while cursor.lookahead() == Some('\t') {
        width = width.saturating_add(TAB_WIDTH);
        cursor.advance(true);
    }
    width
}
