//! CLI module for the rad tooling
//!
//! This module provides the command-line interface around the indentation scanner.
//!
//! ## Commands
//!
//! - `lex <file>` - Show how a document tokenizes (structural tokens + content)
//! - `state encode <levels>...` - Serialize a scanner state to hex
//! - `state decode <hex>` - Show the scanner state a serialized buffer restores to
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use rad_scanner::{SERIALIZATION_BUFFER_SIZE, TokenKind, ValidSymbols};

use crate::config::LexConfig;
use crate::version::RAD_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Inspect the rad indentation scanner
#[derive(Parser, Debug)]
#[command(name = "rad")]
#[command(version = RAD_VERSION)]
#[command(about = "Inspect the rad indentation scanner", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the token stream of a rad source file
    Lex {
        /// Source file to tokenize
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Emit tokens as JSON
        #[arg(long)]
        json: bool,
        /// Persist and restore scanner state before every scan call
        #[arg(long)]
        checkpoint: bool,
        /// Serialization buffer capacity in bytes
        #[arg(long, value_name = "BYTES", default_value_t = SERIALIZATION_BUFFER_SIZE)]
        capacity: usize,
        /// Structural tokens the grammar accepts (default: all)
        #[arg(long, value_enum, value_delimiter = ',', value_name = "KIND")]
        accept: Vec<AcceptKind>,
        /// Lex `//` comments as content instead of skipping them
        #[arg(long)]
        keep_comments: bool,
    },

    /// Encode or decode serialized scanner state
    State {
        #[command(subcommand)]
        action: StateCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum StateCommand {
    /// Serialize a scanner state and print it as hex
    Encode {
        /// Pending indentation width measured at the last line break
        #[arg(long, value_name = "WIDTH")]
        pending: Option<u16>,
        /// Open indentation levels, bottom to top (default: 0)
        #[arg(value_name = "LEVEL")]
        levels: Vec<u16>,
    },

    /// Show the state a hex-encoded buffer restores to
    Decode {
        /// Serialized state as hex (e.g. `01040001 0000`)
        #[arg(value_name = "HEX", num_args = 1.., required = true)]
        hex: Vec<String>,
        /// Reject buffers the encoder would not have written
        #[arg(long)]
        strict: bool,
    },
}

/// Structural token names accepted by `--accept`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptKind {
    Newline,
    Indent,
    Dedent,
}

impl From<AcceptKind> for TokenKind {
    fn from(kind: AcceptKind) -> Self {
        match kind {
            AcceptKind::Newline => TokenKind::Newline,
            AcceptKind::Indent => TokenKind::Indent,
            AcceptKind::Dedent => TokenKind::Dedent,
        }
    }
}

/// Build the session configuration for `rad lex` from its flags.
fn lex_config(checkpoint: bool, capacity: usize, accept: &[AcceptKind], keep_comments: bool) -> LexConfig {
    let accept = if accept.is_empty() {
        ValidSymbols::all()
    } else {
        accept.iter().copied().map(TokenKind::from).collect()
    };
    LexConfig::new()
        .with_accept(accept)
        .with_checkpoint(checkpoint)
        .with_state_capacity(capacity)
        .with_skip_comments(!keep_comments)
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Command::Lex {
            file,
            json,
            checkpoint,
            capacity,
            accept,
            keep_comments,
        } => {
            let config = lex_config(checkpoint, capacity, &accept, keep_comments);
            commands::lex_file(&file.to_string_lossy(), &config, json)
        }
        Command::State { action } => match action {
            StateCommand::Encode { pending, levels } => commands::encode_state(&levels, pending),
            StateCommand::Decode { hex, strict } => commands::decode_state(&hex.concat(), strict),
        },
    }
}

// ============================================================================
// Tests
// ============================================================================
