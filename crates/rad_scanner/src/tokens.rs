//! Token vocabulary shared between the scanner and its hosts.

use std::fmt;

// ============================================================================
// TOKEN KINDS
// ============================================================================

/// Structural tokens produced by the scanner.
///
/// The discriminants follow the order of the grammar's `externals` list, which is also the index into the host's
/// valid-symbols array and the value written to `result_symbol`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum TokenKind {
    Newline = 0,
    Indent = 1,
    Dedent = 2,
}

impl TokenKind {
    /// Every kind, in symbol order.
    pub const ALL: [TokenKind; 3] = [TokenKind::Newline, TokenKind::Indent, TokenKind::Dedent];

    /// The external symbol ordinal the host knows this kind by.
    pub const fn symbol(self) -> u16 {
        self as u16
    }

    /// Look up a kind by its external symbol ordinal.
    pub const fn from_symbol(symbol: u16) -> Option<TokenKind> {
        match symbol {
            0 => Some(TokenKind::Newline),
            1 => Some(TokenKind::Indent),
            2 => Some(TokenKind::Dedent),
            _ => None,
        }
    }

    /// Upper-case display name (`NEWLINE`, `INDENT`, `DEDENT`).
    pub const fn name(self) -> &'static str {
        match self {
            TokenKind::Newline => "NEWLINE",
            TokenKind::Indent => "INDENT",
            TokenKind::Dedent => "DEDENT",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// VALID SYMBOLS
// ============================================================================

/// The set of structural tokens the grammar accepts at the current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidSymbols {
    accepted: [bool; 3],
}

impl ValidSymbols {
    /// Accept nothing.
    pub const fn none() -> Self {
        Self { accepted: [false; 3] }
    }

    /// Accept all three structural tokens.
    pub const fn all() -> Self {
        Self { accepted: [true; 3] }
    }

    /// Build from the host's boolean array, indexed by [`TokenKind::symbol`].
    ///
    /// Missing trailing entries are treated as not accepted; extra entries are ignored.
    pub fn from_flags(flags: &[bool]) -> Self {
        let mut accepted = [false; 3];
        for (slot, flag) in accepted.iter_mut().zip(flags) {
            *slot = *flag;
        }
        Self { accepted }
    }

    /// Return a copy that also accepts `kind`.
    pub const fn with(mut self, kind: TokenKind) -> Self {
        self.accepted[kind as usize] = true;
        self
    }

    /// Return a copy that no longer accepts `kind`.
    pub const fn without(mut self, kind: TokenKind) -> Self {
        self.accepted[kind as usize] = false;
        self
    }

    pub const fn accepts(&self, kind: TokenKind) -> bool {
        self.accepted[kind as usize]
    }

    pub fn is_empty(&self) -> bool {
        !self.accepted.iter().any(|a| *a)
    }

    /// The accepted kinds, in symbol order.
    pub fn kinds(&self) -> impl Iterator<Item = TokenKind> + '_ {
        TokenKind::ALL.into_iter().filter(|kind| self.accepts(*kind))
    }
}

impl FromIterator<TokenKind> for ValidSymbols {
    fn from_iter<I: IntoIterator<Item = TokenKind>>(iter: I) -> Self {
        iter.into_iter().fold(ValidSymbols::none(), ValidSymbols::with)
    }
}

impl fmt::Display for ValidSymbols {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.kinds().map(TokenKind::name).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}
