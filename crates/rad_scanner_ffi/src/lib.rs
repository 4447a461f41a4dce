#![deny(unsafe_op_in_unsafe_fn)]
//! tree-sitter external scanner entry points for the rad grammar.
//!
//! The generated parser links against five C symbols named after the grammar
//! (`tree_sitter_rad_external_scanner_{create,destroy,serialize,deserialize,scan}`). This crate provides them on top
//! of [`rad_scanner::Scanner`], so the scanner logic itself stays safe Rust.
//!
//! ## Notes
//! - The scanner handle is a boxed [`Scanner`] behind a `void *`. tree-sitter owns the handle between `create` and
//!   `destroy` and never shares it across threads.
//! - Null pointers are tolerated everywhere: the call degrades to "no token" / "nothing written".

use std::ffi::{c_char, c_uint, c_void};
use std::ptr::NonNull;
use std::slice;

use rad_scanner::{Cursor, SERIALIZATION_BUFFER_SIZE, Scanner, TokenKind, ValidSymbols};

/// Number of external tokens declared by the grammar (`_newline`, `_indent`, `_dedent`).
pub const EXTERNAL_TOKEN_COUNT: usize = TokenKind::ALL.len();

/// Mirror of tree-sitter's `TSLexer` (see `tree_sitter/parser.h`).
#[repr(C)]
pub struct TSLexer {
    pub lookahead: i32,
    pub result_symbol: u16,
    pub advance: unsafe extern "C" fn(*mut TSLexer, bool),
    pub mark_end: unsafe extern "C" fn(*mut TSLexer),
    pub get_column: unsafe extern "C" fn(*mut TSLexer) -> u32,
    pub is_at_included_range_start: unsafe extern "C" fn(*const TSLexer) -> bool,
    pub eof: unsafe extern "C" fn(*const TSLexer) -> bool,
    pub log: Option<unsafe extern "C" fn(*const TSLexer, *const c_char, ...)>,
}

/// [`Cursor`] over a host-owned `TSLexer`.
struct LexerCursor {
    lexer: NonNull<TSLexer>,
}

impl Cursor for LexerCursor {
    fn lookahead(&self) -> Option<char> {
        if self.is_eof() {
            return None;
        }
        // SAFETY: the host keeps the lexer alive and unaliased for the duration of the scan call.
        let raw = unsafe { self.lexer.as_ref().lookahead };
        u32::try_from(raw).ok().and_then(char::from_u32)
    }

    fn advance(&mut self, skip: bool) {
        let ptr = self.lexer.as_ptr();
        // SAFETY: see `lookahead`; the callback expects the lexer it belongs to.
        unsafe { ((*ptr).advance)(ptr, skip) }
    }

    fn mark_end(&mut self) {
        let ptr = self.lexer.as_ptr();
        // SAFETY: see `advance`.
        unsafe { ((*ptr).mark_end)(ptr) }
    }

    fn is_eof(&self) -> bool {
        let ptr = self.lexer.as_ptr();
        // SAFETY: see `advance`.
        unsafe { ((*ptr).eof)(ptr) }
    }
}

// ============================================================================
// Entry points
// ============================================================================

/// Allocate a fresh scanner. Release it with [`tree_sitter_rad_external_scanner_destroy`].
#[unsafe(no_mangle)]
pub extern "C" fn tree_sitter_rad_external_scanner_create() -> *mut c_void {
    tracing::debug!("creating rad scanner");
    Box::into_raw(Box::new(Scanner::new())).cast()
}

/// Release a scanner created by [`tree_sitter_rad_external_scanner_create`].
///
/// # Safety
/// `payload` must be null or a handle from `create` that has not been destroyed yet.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tree_sitter_rad_external_scanner_destroy(payload: *mut c_void) {
    if payload.is_null() {
        return;
    }
    // SAFETY: the caller hands back ownership of a box created by `create`.
    drop(unsafe { Box::from_raw(payload.cast::<Scanner>()) });
}

/// Serialize the scanner into tree-sitter's state buffer, returning the number of bytes written.
///
/// # Safety
/// `payload` must be null or a live handle; `buffer` must be null or valid for
/// [`SERIALIZATION_BUFFER_SIZE`] bytes of writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tree_sitter_rad_external_scanner_serialize(
    payload: *mut c_void,
    buffer: *mut c_char,
) -> c_uint {
    // SAFETY: per the contract above.
    let Some(scanner) = (unsafe { payload.cast::<Scanner>().as_ref() }) else {
        return 0;
    };
    if buffer.is_null() {
        return 0;
    }
    // SAFETY: tree-sitter provides a buffer of exactly this size.
    let buffer = unsafe { slice::from_raw_parts_mut(buffer.cast::<u8>(), SERIALIZATION_BUFFER_SIZE) };
    c_uint::try_from(scanner.serialize(buffer)).unwrap_or(0)
}

/// Restore the scanner from `length` bytes of `buffer`. A zero length resets it.
///
/// # Safety
/// `payload` must be null or a live handle; `buffer` must be null or valid for `length` bytes of reads.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tree_sitter_rad_external_scanner_deserialize(
    payload: *mut c_void,
    buffer: *const c_char,
    length: c_uint,
) {
    // SAFETY: per the contract above.
    let Some(scanner) = (unsafe { payload.cast::<Scanner>().as_mut() }) else {
        return;
    };
    let bytes: &[u8] = if length == 0 || buffer.is_null() {
        &[]
    } else {
        // SAFETY: per the contract above.
        unsafe { slice::from_raw_parts(buffer.cast::<u8>(), length as usize) }
    };
    scanner.deserialize(bytes);
}

/// Scan for one structural token, storing its symbol in `result_symbol` on a match.
///
/// # Safety
/// `payload` must be null or a live handle; `lexer` must be null or a valid `TSLexer`; `valid_symbols` must be null
/// or point to [`EXTERNAL_TOKEN_COUNT`] booleans.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tree_sitter_rad_external_scanner_scan(
    payload: *mut c_void,
    lexer: *mut TSLexer,
    valid_symbols: *const bool,
) -> bool {
    // SAFETY: per the contract above.
    let Some(scanner) = (unsafe { payload.cast::<Scanner>().as_mut() }) else {
        return false;
    };
    let Some(lexer) = NonNull::new(lexer) else {
        return false;
    };
    if valid_symbols.is_null() {
        return false;
    }
    // SAFETY: per the contract above.
    let flags = unsafe { slice::from_raw_parts(valid_symbols, EXTERNAL_TOKEN_COUNT) };

    let mut cursor = LexerCursor { lexer };
    match scanner.scan(&mut cursor, ValidSymbols::from_flags(flags)) {
        Some(kind) => {
            // SAFETY: the lexer is valid and no other reference to it is live.
            unsafe { (*lexer.as_ptr()).result_symbol = kind.symbol() };
            true
        }
        None => false,
    }
}
