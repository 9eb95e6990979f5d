//! ATOM BIOS Scan - GPU firmware table discovery and parameter search
//!
//! This library locates the structural metadata inside an ATOM BIOS GPU
//! firmware image and heuristically identifies byte offsets that plausibly
//! hold tunable operating parameters (power limits, voltages, clocks).
//!
//! # Features
//!
//! - **Structure Discovery**: Finds the `ATOM` header, the master data table and every sub-table
//! - **Range Scanning**: Linear scan for values in plausible power/voltage/clock ranges
//! - **Density Scoring**: Ranks candidates by how many similar values surround them
//! - **Exact Search**: Finds a known quantity under common fixed-point scalings
//! - **Field Access**: Bounds-checked little-endian reads and writes for editing
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use atombios_scan::{enumerate_tables, scan_smart, ScanConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let rom = std::fs::read("path/to/vbios.rom")?;
//!     let tables = enumerate_tables(&rom);
//!     for candidate in scan_smart(&rom, &tables, &ScanConfig::default()).iter().take(10) {
//!         println!("{}", candidate);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Buffer Ownership
//!
//! The caller owns the image. Every function borrows it for the duration of
//! one call; table descriptors and candidates are plain values that describe
//! the image by offset. Editing the image does not update them: re-run
//! [`enumerate_tables`] after touching structural bytes.

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]

pub mod error;
pub mod formats;
pub mod formatter;
pub mod heuristics;
pub mod types;

#[cfg(test)]
mod testutil;

pub use error::{AtomError, Result};
pub use formats::atom::{
    enumerate_tables, find_atom_header, find_master_table, large_tables, scan_targets,
};
pub use formats::field::{parse_offset, read_field, write_field};
pub use heuristics::{scan, scan_exact, scan_exact_scored, scan_naive, scan_smart, ScanStrategy};
pub use types::{
    format_legacy_relative, to_legacy_relative, CandidateKind, FieldWidth, KindRange,
    ParameterKind, RomReport, ScaleHypothesis, ScanCandidate, ScanConfig, TableDescriptor,
    LEGACY_BASE,
};

use std::path::Path;

use tracing::debug;

/// Smallest image that can hold a legacy ATOM BIOS.
pub const MIN_IMAGE_LEN: usize = LEGACY_BASE + formats::magic::MIN_IMAGE_SPAN;

/// Analyze a firmware image file.
///
/// Reads the whole file, enumerates its tables and, if `strategy` is given,
/// runs that scan.
///
/// # Errors
///
/// * [`AtomError::Io`] if the file cannot be read
/// * [`AtomError::FileTooSmall`] if it cannot contain a legacy image
///
/// # Example
///
/// ```rust,no_run
/// use atombios_scan::{analyze_file, ScanConfig, ScanStrategy};
///
/// let report = analyze_file("vbios.rom", Some(ScanStrategy::Smart), &ScanConfig::default())?;
/// println!("{} tables, {} candidates", report.tables.len(), report.candidates.len());
/// # Ok::<(), atombios_scan::AtomError>(())
/// ```
pub fn analyze_file<P: AsRef<Path>>(
    path: P,
    strategy: Option<ScanStrategy>,
    config: &ScanConfig,
) -> Result<RomReport> {
    let data = load_image(path)?;
    Ok(analyze_bytes(&data, strategy, config))
}

/// Read an image file, rejecting files too small to hold a legacy image.
///
/// # Errors
///
/// * [`AtomError::Io`] if the file cannot be read
/// * [`AtomError::FileTooSmall`] if it is shorter than [`MIN_IMAGE_LEN`]
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let data = std::fs::read(path.as_ref())?;
    if data.len() < MIN_IMAGE_LEN {
        return Err(AtomError::FileTooSmall {
            expected: MIN_IMAGE_LEN,
            actual: data.len(),
        });
    }
    debug!(len = data.len(), "loaded {}", path.as_ref().display());
    Ok(data)
}

/// Analyze an in-memory image.
///
/// Never fails: a malformed image yields a report with no header and no
/// tables.
pub fn analyze_bytes(
    data: &[u8],
    strategy: Option<ScanStrategy>,
    config: &ScanConfig,
) -> RomReport {
    let header_offset = find_atom_header(data);
    let master_table_offset = header_offset.and_then(|h| formats::atom::master_table_at(data, h));
    let tables = enumerate_tables(data);
    let candidates = strategy
        .map(|s| s.run(data, &tables, config))
        .unwrap_or_default();

    RomReport {
        image_len: data.len(),
        header_offset,
        master_table_offset,
        tables,
        scan: strategy.map(|s| s.to_string()),
        candidates,
    }
}

/// Get version information for this library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
