//! Bounds-checked little-endian field access.
//!
//! These are the only primitives that touch image bytes for editing. A
//! write is validated completely before the first byte changes, so a
//! rejected write leaves the buffer untouched.

use byteorder::{ByteOrder, LittleEndian};
use tracing::debug;

use crate::error::{AtomError, Result};
use crate::formats::{read_bytes, read_u16, read_u32, read_u8};
use crate::types::{FieldWidth, LEGACY_BASE};

/// Read an unsigned little-endian value of `width` at `offset`.
pub fn read_field(data: &[u8], offset: usize, width: FieldWidth) -> Result<u32> {
    match width {
        FieldWidth::U8 => read_u8(data, offset).map(u32::from),
        FieldWidth::U16 => read_u16(data, offset).map(u32::from),
        FieldWidth::U32 => read_u32(data, offset),
    }
}

/// Write an unsigned little-endian value of `width` at `offset`.
///
/// Fails without modifying `data` if the field runs past the end of the
/// buffer or `value` does not fit in `width`.
pub fn write_field(data: &mut [u8], offset: usize, width: FieldWidth, value: u32) -> Result<()> {
    if value > width.max_value() {
        return Err(AtomError::ValueTooWide {
            value,
            bits: width.bits(),
        });
    }
    read_bytes(data, offset, width.bytes())?;

    let field = &mut data[offset..offset + width.bytes()];
    match width {
        FieldWidth::U8 => field[0] = value as u8,
        FieldWidth::U16 => LittleEndian::write_u16(field, value as u16),
        FieldWidth::U32 => LittleEndian::write_u32(field, value),
    }

    debug!(value, "wrote {} at 0x{:X}", width, offset);
    Ok(())
}

/// Parse a user-supplied offset into an absolute image offset.
///
/// Accepts decimal (`262400`), hex (`0x40100`), and a `rel:` prefix for
/// offsets relative to [`LEGACY_BASE`] (`rel:0x100`).
pub fn parse_offset(input: &str) -> Result<usize> {
    let trimmed = input.trim();
    let (relative, number) = match trimmed.strip_prefix("rel:") {
        Some(rest) => (true, rest.trim()),
        None => (false, trimmed),
    };

    let parsed = match number
        .strip_prefix("0x")
        .or_else(|| number.strip_prefix("0X"))
    {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => number.parse::<usize>(),
    };
    let value = parsed.map_err(|e| AtomError::InvalidOffset {
        input: input.to_string(),
        message: e.to_string(),
    })?;

    if relative {
        value
            .checked_add(LEGACY_BASE)
            .ok_or_else(|| AtomError::InvalidOffset {
                input: input.to_string(),
                message: "offset overflows".to_string(),
            })
    } else {
        Ok(value)
    }
}
