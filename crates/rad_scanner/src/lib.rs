#![forbid(unsafe_code)]
//! Indentation scanner for the rad language.
//!
//! rad delimits blocks by indentation. The grammar itself cannot see leading whitespace, so it delegates three
//! structural tokens to this crate: `NEWLINE`, `INDENT` and `DEDENT`. The host parser calls [`Scanner::scan`]
//! whenever one of them could be accepted; the scanner produces at most one token per call.
//!
//! This crate is dependency-light and knows nothing about the host: input is read through the [`Cursor`] trait, and
//! the set of acceptable tokens arrives as [`ValidSymbols`]. The C ABI expected by tree-sitter lives in
//! `rad_scanner_ffi`.
//!
//! ## Notes
//! - The scanner never reports errors. It declines (returns `None`) and lets the grammar decide.
//! - State survives incremental re-parses through [`Scanner::serialize`] / [`Scanner::deserialize`]. The byte layout
//!   is documented in [`wire`].
//!
//! ## Examples
//! ```rust
//! use rad_scanner::{Scanner, SourceCursor, TokenKind, ValidSymbols};
//!
//! let mut scanner = Scanner::new();
//! let mut cursor = SourceCursor::new("\n    body", 0);
//! assert_eq!(scanner.scan(&mut cursor, ValidSymbols::all()), Some(TokenKind::Newline));
//!
//! let mut cursor = SourceCursor::new("\n    body", cursor.token_end());
//! assert_eq!(scanner.scan(&mut cursor, ValidSymbols::all()), Some(TokenKind::Indent));
//! assert_eq!(scanner.indents().levels(), &[0, 4]);
//! ```

pub mod cursor;
pub mod indent;
pub mod scanner;
pub mod tokens;
pub mod wire;

pub use cursor::{Cursor, SourceCursor};
pub use indent::{IndentStack, Pending, TAB_WIDTH};
pub use scanner::Scanner;
pub use tokens::{TokenKind, ValidSymbols};
pub use wire::{MAX_SERIALIZED_DEPTH, SERIALIZATION_BUFFER_SIZE, WireError};
