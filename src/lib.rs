#![forbid(unsafe_code)]
//! Tooling around the rad indentation scanner.
//!
//! The scanner itself lives in the `rad_scanner` crate (re-exported here as [`scanner`]). This crate adds what a
//! developer needs around it: a host-session [`driver`] that tokenizes whole documents the way tree-sitter calls the
//! scanner, a [`config`] layer for that driver, and the `rad` command-line tool.
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod cli;
pub mod config;
pub mod driver;
pub mod version;

pub use rad_scanner as scanner;

pub use config::LexConfig;
pub use driver::{LexKind, LexToken, Session, SessionError, Span, lex, lex_with_config, render};
