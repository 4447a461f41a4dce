//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::fmt::Write as _;
use std::fs;

use miette::{Diagnostic, SourceSpan};
use rad_scanner::{IndentStack, Pending, Scanner, WireError};
use thiserror::Error;

use crate::config::LexConfig;
use crate::driver::{lex_with_config, render};

use super::{CliError, CliResult, ExitCode};

/// Maximum source file size (8 MiB)
const MAX_SOURCE_SIZE: u64 = 8 * 1024 * 1024;

// ============================================================================
// Source loading
// ============================================================================

/// Read a source file with a size guard.
pub fn read_source(file_path: &str) -> CliResult<String> {
    // Check file size before reading
    let metadata =
        fs::metadata(file_path).map_err(|e| CliError::failure(format!("Cannot access file '{}': {}", file_path, e)))?;

    if metadata.len() > MAX_SOURCE_SIZE {
        return Err(CliError::failure(format!(
            "Source file '{}' is too large ({} bytes, max {} bytes)",
            file_path,
            metadata.len(),
            MAX_SOURCE_SIZE
        )));
    }

    fs::read_to_string(file_path).map_err(|e| CliError::failure(format!("Error reading file '{}': {}", file_path, e)))
}

// ============================================================================
// rad lex
// ============================================================================

/// Tokenize a file and print the token stream.
pub fn lex_file(file_path: &str, config: &LexConfig, json: bool) -> CliResult<ExitCode> {
    let source = read_source(file_path)?;
    let tokens = lex_with_config(&source, config);

    if json {
        let out = serde_json::to_string_pretty(&tokens)
            .map_err(|e| CliError::failure(format!("Error encoding tokens as JSON: {}", e)))?;
        println!("{}", out);
    } else {
        print!("{}", render(&source, &tokens));
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// rad state
// ============================================================================

/// Serialize the given levels and pending width and print the bytes as hex.
pub fn encode_state(levels: &[u16], pending: Option<u16>) -> CliResult<ExitCode> {
    println!("{}", state_hex(levels, pending)?);
    Ok(ExitCode::SUCCESS)
}

/// Decode a hex buffer and print the state it restores to.
pub fn decode_state(hex: &str, strict: bool) -> CliResult<ExitCode> {
    print!("{}", describe_state(hex, strict)?);
    Ok(ExitCode::SUCCESS)
}

/// Hex encoding of a scanner with `levels` open and `pending` measured.
///
/// Levels must start at 0 and strictly increase; an empty list means the fresh stack.
pub fn state_hex(levels: &[u16], pending: Option<u16>) -> CliResult<String> {
    let stack = IndentStack::from_levels(levels.iter().copied());
    if !levels.is_empty() && stack.levels() != levels {
        return Err(CliError::failure(format!(
            "Error: levels must start at 0 and strictly increase (got {:?})",
            levels
        )));
    }
    let pending = pending.map_or(Pending::NoPending, Pending::Indent);
    let scanner = Scanner::from_parts(stack.levels().iter().copied(), pending);
    Ok(encode_hex(&scanner.to_bytes()))
}

/// Human-readable description of the state `hex` restores to.
pub fn describe_state(hex: &str, strict: bool) -> CliResult<String> {
    let bytes = decode_hex(hex).map_err(|e| CliError::failure(format!("Error: {}", e)))?;

    let scanner = if strict {
        Scanner::restore(&bytes).map_err(|err| CliError::failure(render_wire_error(&bytes, err)))?
    } else {
        let mut scanner = Scanner::new();
        scanner.deserialize(&bytes);
        scanner
    };

    let mut out = String::new();
    let pending = match scanner.pending() {
        Pending::NoPending => "none".to_string(),
        Pending::Indent(width) => width.to_string(),
    };
    let _ = writeln!(out, "pending: {}", pending);
    let _ = writeln!(out, "levels:  {:?}", scanner.indents().levels());
    Ok(out)
}

/// A strict-decoding failure, labelled on the hex text the user passed in.
#[derive(Debug, Error, Diagnostic)]
#[error("invalid scanner state: {reason}")]
#[diagnostic(code(rad::state::invalid), help("`rad state decode` without --strict shows what the scanner recovers"))]
struct InvalidState {
    #[source_code]
    hex: String,
    #[label("{reason}")]
    at: SourceSpan,
    reason: String,
}

fn render_wire_error(bytes: &[u8], err: WireError) -> String {
    let hex = encode_hex(bytes);
    // Errors past the last byte are labelled on the last byte.
    let offset = (err.byte_offset(bytes.len()) * 2).min(hex.len().saturating_sub(2));
    let len = hex.len().min(2);
    let report = miette::Report::new(InvalidState {
        hex,
        at: (offset, len).into(),
        reason: err.to_string(),
    });
    format!("{:?}", report)
}

// ============================================================================
// Hex helpers
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HexError {
    #[error("hex input has an odd number of digits ({0})")]
    OddLength(usize),

    #[error("invalid hex digit {found:?} at position {index}")]
    InvalidDigit { index: usize, found: char },
}

/// Lower-case hex, two digits per byte.
pub fn encode_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

/// Parse hex digits, ignoring whitespace and `_` separators and an optional `0x` prefix.
pub fn decode_hex(text: &str) -> Result<Vec<u8>, HexError> {
    let text = text.trim();
    let text = text.strip_prefix("0x").unwrap_or(text);
    let digits: Vec<char> = text.chars().filter(|c| !c.is_whitespace() && *c != '_').collect();
    if digits.len() % 2 != 0 {
        return Err(HexError::OddLength(digits.len()));
    }

    let nibble = |index: usize| -> Result<u8, HexError> {
        let found = digits[index];
        found
            .to_digit(16)
            .and_then(|d| u8::try_from(d).ok())
            .ok_or(HexError::InvalidDigit { index, found })
    };
    (0..digits.len())
        .step_by(2)
        .map(|i| Ok((nibble(i)? << 4) | nibble(i + 1)?))
        .collect()
}
