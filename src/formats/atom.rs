//! ATOM BIOS structure discovery.
//!
//! The legacy image starts at [`LEGACY_BASE`]. Its header is found by
//! signature, the header names the master data table, and the master table
//! lists sub-tables by offset relative to the legacy base:
//!
//! | Field                   | Location               | Width  |
//! |-------------------------|------------------------|--------|
//! | Header size             | `header`               | u16 LE |
//! | Signature `ATOM`        | `header + 4`           | 4      |
//! | Master table rel offset | `header + 8 + 24`      | u16 LE |
//! | Master table size       | `master`               | u16 LE |
//! | Master table entries    | `master + 4 + i*2`     | u16 LE |
//! | Sub-table size          | `table`                | u16 LE |
//! | Sub-table format rev    | `table + 2`            | u8     |
//! | Sub-table content rev   | `table + 3`            | u8     |
//!
//! Every lookup here treats the image as untrusted: anything that fails a
//! bounds or sanity check yields `None` or is skipped.

use memchr::memmem;
use tracing::{debug, trace, warn};

use crate::formats::{magic, read_u16, read_u8};
use crate::types::{TableDescriptor, LEGACY_BASE};

/// Find the absolute offset of the ATOM header.
///
/// Searches `[LEGACY_BASE, min(len - 16, LEGACY_BASE + 0x4000))` for the
/// signature and accepts the lowest match whose preceding size field lies in
/// `[0x20, 0x80]`.
pub fn find_atom_header(data: &[u8]) -> Option<usize> {
    if data.len() < LEGACY_BASE + magic::MIN_IMAGE_SPAN {
        return None;
    }

    let upper = (data.len() - 16).min(LEGACY_BASE + magic::SEARCH_SPAN);
    if upper <= LEGACY_BASE {
        return None;
    }

    // Matches must start below `upper`; the slice end leaves room for the
    // whole signature at the last allowed position.
    let window = &data[LEGACY_BASE..upper + magic::ATOM.len() - 1];
    for pos in memmem::find_iter(window, &magic::ATOM) {
        let Some(header) = (LEGACY_BASE + pos).checked_sub(magic::SIGNATURE_OFFSET) else {
            continue;
        };
        let Ok(size) = read_u16(data, header) else {
            continue;
        };
        if (magic::HEADER_SIZE_MIN..=magic::HEADER_SIZE_MAX).contains(&size) {
            debug!(size, "ATOM header found at 0x{:X}", header);
            return Some(header);
        }
        trace!(size, "signature at 0x{:X} rejected: header size out of range", header);
    }

    None
}

/// Resolve the master data table for a header at `header`.
pub fn master_table_at(data: &[u8], header: usize) -> Option<usize> {
    let slot = header.checked_add(magic::MASTER_DATA_TABLE_SLOT)?;
    let rel = read_u16(data, slot).ok()?;
    let master = LEGACY_BASE + rel as usize;
    if master + magic::MASTER_TABLE_HEADER_LEN > data.len() {
        debug!("master table offset 0x{:X} past end of image", master);
        return None;
    }
    Some(master)
}

/// Find the absolute offset of the master data table.
pub fn find_master_table(data: &[u8]) -> Option<usize> {
    let header = find_atom_header(data)?;
    let master = master_table_at(data, header)?;
    debug!("master data table resolved at 0x{:X}", master);
    Some(master)
}

/// Enumerate every non-empty, in-bounds sub-table of the master table.
///
/// Returns an empty list when the header or master table cannot be found or
/// the master table's size field is too small. Descriptor indices are master
/// table slots, so they may skip numbers.
pub fn enumerate_tables(data: &[u8]) -> Vec<TableDescriptor> {
    let Some(master) = find_master_table(data) else {
        return Vec::new();
    };
    let Ok(master_size) = read_u16(data, master) else {
        return Vec::new();
    };
    if master_size < magic::MASTER_TABLE_MIN_SIZE {
        debug!(master_size, "master table too small");
        return Vec::new();
    }

    let count = (master_size as usize - magic::MASTER_TABLE_HEADER_LEN) / 2;
    let mut tables = Vec::with_capacity(count);

    for idx in 0..count {
        let entry = master + magic::MASTER_TABLE_HEADER_LEN + idx * 2;
        let Ok(rel) = read_u16(data, entry) else {
            warn!(idx, count, "master table truncated by end of image, stopping");
            break;
        };
        if rel == 0 {
            continue;
        }

        let abs = LEGACY_BASE + rel as usize;
        if abs + TableDescriptor::HEADER_LEN > data.len() {
            trace!(idx, rel, "sub-table past end of image, skipped");
            continue;
        }

        // In bounds by the check above.
        let (Ok(size), Ok(format_rev), Ok(content_rev)) = (
            read_u16(data, abs),
            read_u8(data, abs + 2),
            read_u8(data, abs + 3),
        ) else {
            continue;
        };

        tables.push(TableDescriptor {
            index: idx,
            offset_rel: rel,
            offset_abs: abs,
            size,
            format_rev,
            content_rev,
        });
    }

    debug!(slots = count, tables = tables.len(), "sub-tables enumerated");
    tables
}

/// Tables whose declared size is at least `min_size`.
pub fn large_tables(tables: &[TableDescriptor], min_size: u16) -> Vec<TableDescriptor> {
    tables.iter().filter(|t| t.size >= min_size).copied().collect()
}

/// Large tables, or every table when none qualifies.
pub fn scan_targets(tables: &[TableDescriptor], min_size: u16) -> Vec<TableDescriptor> {
    let large = large_tables(tables, min_size);
    if large.is_empty() {
        debug!(min_size, "no large tables, scanning all");
        tables.to_vec()
    } else {
        large
    }
}
