//! Heuristic candidate scanning.
//!
//! The firmware gives no schema for table contents, so tunable parameters
//! are located by value: positions whose little-endian u16 falls in a
//! plausible range, optionally weighted by how many similar values sit
//! nearby. Three strategies share the same table walker and scorer:
//!
//! - **naive**: every in-range value, first come first served, capped per kind
//! - **smart**: density-scored, deduplicated and ranked
//! - **exact**: a known target under several fixed-point scales

pub mod exact;
pub mod naive;
pub mod scorer;
pub mod smart;

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::types::{ScanCandidate, ScanConfig, TableDescriptor};

pub use exact::{scan_exact, scan_exact_scored};
pub use naive::scan_naive;
pub use scorer::{combined_score, neighborhood_score};
pub use smart::scan_smart;

/// Candidate scan strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStrategy {
    /// Linear range scan with per-kind caps
    Naive,
    /// Density-scored scan over large tables
    Smart,
    /// Exact search for a target value
    Exact {
        /// Value to look for
        target: u32,
    },
    /// Exact search ranked by neighborhood density
    ExactScored {
        /// Value to look for
        target: u32,
    },
}

impl ScanStrategy {
    /// Run this strategy over `tables`.
    pub fn run(
        self,
        data: &[u8],
        tables: &[TableDescriptor],
        config: &ScanConfig,
    ) -> Vec<ScanCandidate> {
        match self {
            ScanStrategy::Naive => scan_naive(data, tables, config),
            ScanStrategy::Smart => scan_smart(data, tables, config),
            ScanStrategy::Exact { target } => scan_exact(data, tables, target, config),
            ScanStrategy::ExactScored { target } => scan_exact_scored(data, tables, target, config),
        }
    }
}

impl fmt::Display for ScanStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanStrategy::Naive => write!(f, "naive"),
            ScanStrategy::Smart => write!(f, "smart"),
            ScanStrategy::Exact { target } => write!(f, "exact({})", target),
            ScanStrategy::ExactScored { target } => write!(f, "exact-scored({})", target),
        }
    }
}

/// Scan `tables` with `strategy`.
pub fn scan(
    data: &[u8],
    tables: &[TableDescriptor],
    strategy: ScanStrategy,
    config: &ScanConfig,
) -> Vec<ScanCandidate> {
    strategy.run(data, tables, config)
}

/// Every overlapping little-endian u16 inside a table, with its absolute
/// offset. Stride is one byte so no unaligned value is missed.
pub(crate) fn table_words<'a>(
    data: &'a [u8],
    table: &TableDescriptor,
) -> impl Iterator<Item = (usize, u16)> + 'a {
    let bounds = table.bounds(data.len());
    let start = bounds.start;
    data[bounds]
        .windows(2)
        .enumerate()
        .map(move |(i, pair)| (start + i, LittleEndian::read_u16(pair)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::atom::enumerate_tables;
    use crate::testutil::image_with_tables;
    use crate::types::LEGACY_BASE;

    #[test]
    fn test_table_words_overlap() {
        let table = TableDescriptor {
            index: 0,
            offset_rel: 0,
            offset_abs: 2,
            size: 4,
            format_rev: 0,
            content_rev: 0,
        };
        let data = [0xFF, 0xFF, 0x01, 0x02, 0x03, 0x04, 0xFF];
        let words: Vec<_> = table_words(&data, &table).collect();
        assert_eq!(words, vec![(2, 0x0201), (3, 0x0302), (4, 0x0403)]);
    }

    #[test]
    fn test_table_words_clamped_to_image() {
        let table = TableDescriptor {
            index: 0,
            offset_rel: 0,
            offset_abs: 4,
            size: 0x100,
            format_rev: 0,
            content_rev: 0,
        };
        let data = [0u8; 7];
        assert_eq!(table_words(&data, &table).count(), 2);
    }

    #[test]
    fn test_dispatch_matches_direct_calls() {
        let t = LEGACY_BASE + 0x1000;
        let mut builder = image_with_tables(&[(0x1000, 0x800)]);
        for i in 0..6 {
            builder = builder.u16_at(t + 0x100 + i * 2, 304);
        }
        let data = builder.build();
        let tables = enumerate_tables(&data);
        let config = ScanConfig::new();

        assert_eq!(
            scan(&data, &tables, ScanStrategy::Smart, &config),
            scan_smart(&data, &tables, &config)
        );
        assert_eq!(
            scan(&data, &tables, ScanStrategy::Naive, &config),
            scan_naive(&data, &tables, &config)
        );
        assert_eq!(
            scan(&data, &tables, ScanStrategy::ExactScored { target: 304 }, &config).len(),
            6
        );
        assert_eq!(ScanStrategy::Exact { target: 304 }.to_string(), "exact(304)");
    }
}
