//! Synthetic image builders shared by unit tests.

use byteorder::{ByteOrder, LittleEndian};

use crate::formats::magic;
use crate::types::LEGACY_BASE;

/// Default image length used by tests: 64 KiB of legacy content.
pub const TEST_IMAGE_LEN: usize = LEGACY_BASE + 0x10000;

/// Builds zero-filled images with an ATOM header, master table and tables.
pub struct RomBuilder {
    data: Vec<u8>,
}

impl RomBuilder {
    pub fn new(len: usize) -> Self {
        Self { data: vec![0; len] }
    }

    /// Header at `LEGACY_BASE + header_rel` pointing at `master_rel`.
    pub fn header(mut self, header_rel: usize, size: u16, master_rel: u16) -> Self {
        let h = LEGACY_BASE + header_rel;
        LittleEndian::write_u16(&mut self.data[h..], size);
        self.data[h + 4..h + 8].copy_from_slice(&magic::ATOM);
        LittleEndian::write_u16(&mut self.data[h + magic::MASTER_DATA_TABLE_SLOT..], master_rel);
        self
    }

    /// Master table at `master_rel` holding `entries`.
    pub fn master(mut self, master_rel: u16, entries: &[u16]) -> Self {
        let m = LEGACY_BASE + master_rel as usize;
        let size = (magic::MASTER_TABLE_HEADER_LEN + entries.len() * 2) as u16;
        LittleEndian::write_u16(&mut self.data[m..], size);
        for (i, &entry) in entries.iter().enumerate() {
            LittleEndian::write_u16(&mut self.data[m + 4 + i * 2..], entry);
        }
        self
    }

    /// Sub-table header at `table_rel`.
    pub fn table(mut self, table_rel: u16, size: u16, format_rev: u8, content_rev: u8) -> Self {
        let t = LEGACY_BASE + table_rel as usize;
        LittleEndian::write_u16(&mut self.data[t..], size);
        self.data[t + 2] = format_rev;
        self.data[t + 3] = content_rev;
        self
    }

    pub fn u16_at(mut self, offset_abs: usize, value: u16) -> Self {
        LittleEndian::write_u16(&mut self.data[offset_abs..], value);
        self
    }

    pub fn u32_at(mut self, offset_abs: usize, value: u32) -> Self {
        LittleEndian::write_u32(&mut self.data[offset_abs..], value);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.data
    }
}

/// Image with a header at the legacy base, master table at rel 0x100, and
/// the given `(rel, size)` tables listed in order.
pub fn image_with_tables(tables: &[(u16, u16)]) -> RomBuilder {
    let entries: Vec<u16> = tables.iter().map(|&(rel, _)| rel).collect();
    let mut builder = RomBuilder::new(TEST_IMAGE_LEN)
        .header(0, 0x40, 0x100)
        .master(0x100, &entries);
    for &(rel, size) in tables {
        builder = builder.table(rel, size, 1, 1);
    }
    builder
}
