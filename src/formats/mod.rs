//! Firmware image structure parsers.
//!
//! This module provides:
//! - ATOM BIOS header, master table and sub-table discovery
//! - Bounds-checked little-endian field access

pub mod atom;
pub mod field;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{AtomError, Result};

/// Magic byte signatures and fixed layout constants.
pub mod magic {
    /// ATOM BIOS header signature: 'A' 'T' 'O' 'M'
    pub const ATOM: [u8; 4] = *b"ATOM";

    /// Distance from the header start to the signature (the header's
    /// common size/revision prefix).
    pub const SIGNATURE_OFFSET: usize = 4;

    /// Bytes searched past the legacy base for the signature.
    pub const SEARCH_SPAN: usize = 0x4000;

    /// Minimum image length for a header search to make sense.
    pub const MIN_IMAGE_SPAN: usize = 0x200;

    /// Accepted range of the header size field.
    pub const HEADER_SIZE_MIN: u16 = 0x20;
    /// Accepted range of the header size field.
    pub const HEADER_SIZE_MAX: u16 = 0x80;

    /// Header slot holding the master data table offset: past the common
    /// prefix and signature, twelve u16 fields in.
    pub const MASTER_DATA_TABLE_SLOT: usize = 8 + 12 * 2;

    /// Reserved prefix of the master table before its entries.
    pub const MASTER_TABLE_HEADER_LEN: usize = 4;

    /// Smallest master table size worth walking.
    pub const MASTER_TABLE_MIN_SIZE: u16 = 8;
}

/// Read bytes with bounds checking.
pub fn read_bytes(data: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    match offset.checked_add(len) {
        Some(end) if end <= data.len() => Ok(&data[offset..end]),
        _ => Err(AtomError::OutOfBounds {
            offset,
            width: len,
            len: data.len(),
        }),
    }
}

/// Read a u8.
pub fn read_u8(data: &[u8], offset: usize) -> Result<u8> {
    Ok(read_bytes(data, offset, 1)?[0])
}

/// Read a little-endian u16.
pub fn read_u16(data: &[u8], offset: usize) -> Result<u16> {
    read_bytes(data, offset, 2).map(LittleEndian::read_u16)
}

/// Read a little-endian u32.
pub fn read_u32(data: &[u8], offset: usize) -> Result<u32> {
    read_bytes(data, offset, 4).map(LittleEndian::read_u32)
}
