//! Byte layout for persisting scanner state between parses.
//!
//! ```text
//! byte 0:      pending flag (0|1)
//! bytes 1-2:   pending width, u16 little-endian (0 when nothing is pending)
//! byte 3:      stack depth N (0..=100)
//! bytes 4..:   N levels, each u16 little-endian, bottom to top
//! ```
//!
//! ## Depth cap
//!
//! At most [`MAX_SERIALIZED_DEPTH`] levels are written, fewer if the caller's buffer is smaller. When the stack has
//! to be cut, the base level 0 is kept together with the innermost `cap - 1` levels (not the innermost `cap` levels),
//! and the outer levels in between are lost.
//! A restored scanner then reports fewer DEDENTs than the original would have when those levels close. The cut is
//! logged at `warn` level.
//!
//! ## Decoding
//!
//! Two decoders exist. The lenient one backs [`Scanner::deserialize`](crate::Scanner::deserialize): it never fails,
//! defaults whatever is missing, and repairs the stack. The strict one backs [`Scanner::restore`](crate::Scanner::restore)
//! and reports the first problem as a [`WireError`], for tooling that wants to validate a buffer.

use thiserror::Error;

use crate::indent::{IndentStack, Pending};

/// Maximum number of levels written by [`encode`].
pub const MAX_SERIALIZED_DEPTH: usize = 100;

/// Size of the buffer tree-sitter hands to external scanners for serialization.
pub const SERIALIZATION_BUFFER_SIZE: usize = 1024;

/// Pending flag, pending width, depth.
pub const HEADER_LEN: usize = 4;

/// Problems found by the strict decoder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("buffer ends inside the {field} (offset {offset})")]
    Truncated { field: &'static str, offset: usize },

    #[error("pending flag must be 0 or 1, found {0}")]
    InvalidPendingFlag(u8),

    #[error("pending width {0} stored without the pending flag")]
    StrayPendingWidth(u16),

    #[error("stack depth {0} exceeds the maximum of {MAX_SERIALIZED_DEPTH}")]
    DepthOutOfRange(u8),

    #[error("stack depth is 0; the base level is missing")]
    EmptyStack,

    #[error("base level must be 0, found {0}")]
    NonZeroBase(u16),

    #[error("level {level} at index {index} is not wider than the level below it ({previous})")]
    NotIncreasing { index: usize, level: u16, previous: u16 },

    #[error("{0} unexpected trailing byte(s)")]
    TrailingBytes(usize),
}

impl WireError {
    /// Offset of the first offending byte in a buffer of `buffer_len` bytes.
    pub fn byte_offset(&self, buffer_len: usize) -> usize {
        match self {
            WireError::Truncated { offset, .. } => *offset,
            WireError::InvalidPendingFlag(_) => 0,
            WireError::StrayPendingWidth(_) => 1,
            WireError::DepthOutOfRange(_) | WireError::EmptyStack => 3,
            WireError::NonZeroBase(_) => HEADER_LEN,
            WireError::NotIncreasing { index, .. } => HEADER_LEN + 2 * index,
            WireError::TrailingBytes(count) => buffer_len.saturating_sub(*count),
        }
    }
}

// ============================================================================
// Readers and writers
// ============================================================================

struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn u8(&mut self) -> Option<u8> {
        let byte = *self.bytes.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    fn u16_le(&mut self) -> Option<u16> {
        let chunk: [u8; 2] = self.bytes.get(self.pos..self.pos + 2)?.try_into().ok()?;
        self.pos += 2;
        Some(u16::from_le_bytes(chunk))
    }

    fn offset(&self) -> usize {
        self.pos
    }

    fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }
}

struct ByteWriter<'a> {
    buffer: &'a mut [u8],
    len: usize,
}

impl<'a> ByteWriter<'a> {
    fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer, len: 0 }
    }

    fn put_u8(&mut self, byte: u8) -> Option<()> {
        *self.buffer.get_mut(self.len)? = byte;
        self.len += 1;
        Some(())
    }

    fn put_u16_le(&mut self, value: u16) -> Option<()> {
        let slot = self.buffer.get_mut(self.len..self.len + 2)?;
        slot.copy_from_slice(&value.to_le_bytes());
        self.len += 2;
        Some(())
    }
}

// ============================================================================
// Encoding
// ============================================================================

/// Number of bytes [`encode`] needs for a stack of `depth` levels, ignoring the caller's capacity.
pub fn encoded_len(depth: usize) -> usize {
    HEADER_LEN + 2 * depth.min(MAX_SERIALIZED_DEPTH)
}

/// Write `pending` and `stack` into `buffer`, returning the number of bytes written.
///
/// Never writes past `buffer.len()`. A buffer shorter than the header receives nothing (0 is returned, which restores
/// as a fresh scanner).
pub fn encode(pending: Pending, stack: &IndentStack, buffer: &mut [u8]) -> usize {
    if buffer.len() < HEADER_LEN {
        tracing::warn!(
            capacity = buffer.len(),
            "serialization buffer too small for the state header; state not persisted"
        );
        return 0;
    }

    let fit = (buffer.len() - HEADER_LEN) / 2;
    let keep = stack.depth().min(MAX_SERIALIZED_DEPTH).min(fit);
    if keep < stack.depth() {
        tracing::warn!(
            depth = stack.depth(),
            kept = keep,
            capacity = buffer.len(),
            "indent stack truncated while serializing; outer levels are lost"
        );
    }
    let levels = retained_levels(stack.levels(), keep);

    let mut writer = ByteWriter::new(buffer);
    let written = write_state(&mut writer, pending, &levels);
    debug_assert!(written.is_some(), "sizes are computed before writing");
    written.map_or(0, |()| writer.len)
}

fn write_state(writer: &mut ByteWriter<'_>, pending: Pending, levels: &[u16]) -> Option<()> {
    writer.put_u8(u8::from(pending.is_pending()))?;
    writer.put_u16_le(pending.width().unwrap_or(0))?;
    writer.put_u8(u8::try_from(levels.len()).ok()?)?;
    for level in levels {
        writer.put_u16_le(*level)?;
    }
    Some(())
}

/// The base level plus the innermost `keep - 1` levels.
fn retained_levels(levels: &[u16], keep: usize) -> Vec<u16> {
    if keep >= levels.len() {
        return levels.to_vec();
    }
    if keep == 0 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(keep);
    out.extend(levels.first().copied());
    out.extend_from_slice(&levels[levels.len() - (keep - 1)..]);
    out
}

// ============================================================================
// Decoding
// ============================================================================

/// Decode whatever `bytes` holds, defaulting missing fields and repairing the stack.
///
/// An empty buffer yields the fresh state. Levels stop at the end of the buffer even if the declared depth says
/// otherwise. The pending indent is only restored when both the flag and the full width are present.
pub fn decode_lenient(bytes: &[u8]) -> (Pending, IndentStack) {
    let mut reader = ByteReader::new(bytes);

    let flag = reader.u8();
    let width = reader.u16_le();
    let pending = match (flag, width) {
        (Some(flag), Some(width)) if flag != 0 => Pending::Indent(width),
        _ => Pending::NoPending,
    };

    let declared = reader.u8().unwrap_or(0);
    let mut levels = Vec::with_capacity(usize::from(declared));
    for _ in 0..declared {
        let Some(level) = reader.u16_le() else {
            break;
        };
        levels.push(level);
    }

    (pending, IndentStack::from_levels(levels))
}

/// Decode `bytes`, rejecting anything [`encode`] would not have produced.
///
/// An empty buffer is the encoding of the fresh state.
pub fn decode_strict(bytes: &[u8]) -> Result<(Pending, IndentStack), WireError> {
    if bytes.is_empty() {
        return Ok((Pending::NoPending, IndentStack::new()));
    }

    let mut reader = ByteReader::new(bytes);
    let truncated = |field, offset| WireError::Truncated { field, offset };

    let flag = reader.u8().ok_or_else(|| truncated("pending flag", reader.offset()))?;
    let width = reader.u16_le().ok_or_else(|| truncated("pending width", 1))?;
    let pending = match flag {
        0 if width == 0 => Pending::NoPending,
        0 => return Err(WireError::StrayPendingWidth(width)),
        1 => Pending::Indent(width),
        other => return Err(WireError::InvalidPendingFlag(other)),
    };

    let depth = reader.u8().ok_or_else(|| truncated("stack depth", 3))?;
    if usize::from(depth) > MAX_SERIALIZED_DEPTH {
        return Err(WireError::DepthOutOfRange(depth));
    }
    if depth == 0 {
        return Err(WireError::EmptyStack);
    }

    let mut levels: Vec<u16> = Vec::with_capacity(usize::from(depth));
    for index in 0..usize::from(depth) {
        let offset = reader.offset();
        let level = reader.u16_le().ok_or_else(|| truncated("indent level", offset))?;
        match levels.last() {
            None if level != 0 => return Err(WireError::NonZeroBase(level)),
            Some(&previous) if level <= previous => {
                return Err(WireError::NotIncreasing { index, level, previous });
            }
            _ => levels.push(level),
        }
    }

    if reader.remaining() > 0 {
        return Err(WireError::TrailingBytes(reader.remaining()));
    }

    Ok((pending, IndentStack::from_levels(levels)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_to_vec(pending: Pending, stack: &IndentStack) -> Vec<u8> {
        let mut buffer = [0u8; SERIALIZATION_BUFFER_SIZE];
        let len = encode(pending, stack, &mut buffer);
        buffer[..len].to_vec()
    }

    #[test]
    fn test_encode_layout() {
        let stack = IndentStack::from_levels([0, 4, 0x0102]);
        let bytes = encode_to_vec(Pending::Indent(0x0203), &stack);
        assert_eq!(bytes, vec![1, 0x03, 0x02, 3, 0, 0, 4, 0, 0x02, 0x01]);
    }

    #[test]
    fn test_encode_fresh_state() {
        let bytes = encode_to_vec(Pending::NoPending, &IndentStack::new());
        assert_eq!(bytes, vec![0, 0, 0, 1, 0, 0]);
        assert_eq!(bytes.len(), encoded_len(1));
    }

    #[test]
    fn test_encode_caps_depth_keeping_base_and_innermost() {
        let stack = IndentStack::from_levels(0..150u16);
        let bytes = encode_to_vec(Pending::NoPending, &stack);
        assert_eq!(bytes.len(), encoded_len(150));
        assert_eq!(bytes[3], 100);

        let (_, restored) = decode_strict(&bytes).unwrap();
        assert_eq!(restored.depth(), 100);
        assert_eq!(restored.levels()[0], 0);
        assert_eq!(restored.levels()[1], 51);
        assert_eq!(restored.top(), 149);
    }

    #[test]
    fn test_encode_respects_capacity() {
        let stack = IndentStack::from_levels([0, 2, 4, 8]);

        let mut tiny = [0xAAu8; 3];
        assert_eq!(encode(Pending::Indent(1), &stack, &mut tiny), 0);
        assert_eq!(tiny, [0xAA; 3]);

        // Room for the header and two levels: base plus innermost.
        let mut small = [0xAAu8; 9];
        assert_eq!(encode(Pending::Indent(1), &stack, &mut small), 8);
        assert_eq!(&small[..8], &[1, 1, 0, 2, 0, 0, 8, 0]);
        assert_eq!(small[8], 0xAA);
    }

    #[test]
    fn test_lenient_empty_buffer_is_fresh() {
        assert_eq!(decode_lenient(&[]), (Pending::NoPending, IndentStack::new()));
    }

    #[test]
    fn test_lenient_missing_width_means_no_pending() {
        assert_eq!(decode_lenient(&[1]), (Pending::NoPending, IndentStack::new()));
        assert_eq!(decode_lenient(&[1, 7]), (Pending::NoPending, IndentStack::new()));
        assert_eq!(decode_lenient(&[1, 7, 0]), (Pending::Indent(7), IndentStack::new()));
    }

    #[test]
    fn test_lenient_stops_at_end_of_buffer() {
        // Declares 3 levels but carries one and a half.
        let (pending, stack) = decode_lenient(&[0, 0, 0, 3, 0, 0, 4]);
        assert_eq!(pending, Pending::NoPending);
        assert_eq!(stack.levels(), &[0]);

        let (_, stack) = decode_lenient(&[0, 0, 0, 3, 0, 0, 4, 0]);
        assert_eq!(stack.levels(), &[0, 4]);
    }

    #[test]
    fn test_lenient_repairs_stack() {
        // Depth 0 and a stack without its base.
        assert_eq!(decode_lenient(&[0, 0, 0, 0]).1.levels(), &[0]);
        assert_eq!(decode_lenient(&[0, 0, 0, 2, 4, 0, 2, 0]).1.levels(), &[0, 4]);
    }

    #[test]
    fn test_strict_errors() {
        assert_eq!(
            decode_strict(&[0, 0]),
            Err(WireError::Truncated { field: "pending width", offset: 1 })
        );
        assert_eq!(decode_strict(&[2, 0, 0, 1, 0, 0]), Err(WireError::InvalidPendingFlag(2)));
        assert_eq!(decode_strict(&[0, 5, 0, 1, 0, 0]), Err(WireError::StrayPendingWidth(5)));
        assert_eq!(decode_strict(&[0, 0, 0, 101]), Err(WireError::DepthOutOfRange(101)));
        assert_eq!(decode_strict(&[0, 0, 0, 0]), Err(WireError::EmptyStack));
        assert_eq!(decode_strict(&[0, 0, 0, 1, 4, 0]), Err(WireError::NonZeroBase(4)));
        assert_eq!(
            decode_strict(&[0, 0, 0, 3, 0, 0, 4, 0, 4, 0]),
            Err(WireError::NotIncreasing { index: 2, level: 4, previous: 4 })
        );
        assert_eq!(
            decode_strict(&[0, 0, 0, 2, 0, 0, 4]),
            Err(WireError::Truncated { field: "indent level", offset: 6 })
        );
        assert_eq!(decode_strict(&[0, 0, 0, 1, 0, 0, 9]), Err(WireError::TrailingBytes(1)));
    }

    #[test]
    fn test_strict_accepts_encoder_output() {
        let stack = IndentStack::from_levels([0, 3, 7]);
        let bytes = encode_to_vec(Pending::Indent(2), &stack);
        assert_eq!(decode_strict(&bytes), Ok((Pending::Indent(2), stack)));
        assert_eq!(decode_strict(&[]), Ok((Pending::NoPending, IndentStack::new())));
    }

    #[test]
    fn test_error_offsets_point_at_offending_bytes() {
        let bytes = [0, 0, 0, 3, 0, 0, 4, 0, 4, 0];
        let err = decode_strict(&bytes).unwrap_err();
        assert_eq!(err.byte_offset(bytes.len()), 8);

        let bytes = [0, 0, 0, 1, 0, 0, 9, 9];
        let err = decode_strict(&bytes).unwrap_err();
        assert_eq!(err.byte_offset(bytes.len()), 6);
    }

    #[test]
    fn test_error_messages() {
        insta::assert_snapshot!(
            WireError::NotIncreasing { index: 2, level: 4, previous: 8 },
            @"level 4 at index 2 is not wider than the level below it (8)"
        );
        insta::assert_snapshot!(
            WireError::Truncated { field: "stack depth", offset: 3 },
            @"buffer ends inside the stack depth (offset 3)"
        );
    }
}
