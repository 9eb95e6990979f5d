//! Linear range scan.
//!
//! Cheap first pass: every byte position of every table is read as a u16
//! and kept if it falls inside a kind's range. Each kind stops as soon as
//! its cap is reached, so early tables can crowd out later ones. Use the
//! smart scan when ranking matters.

use std::collections::HashSet;

use tracing::debug;

use crate::heuristics::table_words;
use crate::types::{CandidateKind, ParameterKind, ScanCandidate, ScanConfig, TableDescriptor};

/// Scan `tables` for power, voltage and clock values in range.
///
/// Kinds run in order (power, voltage, clock) and tables in the order
/// given. An offset already taken by an earlier candidate, of any kind, is
/// not reported again.
pub fn scan_naive(
    data: &[u8],
    tables: &[TableDescriptor],
    config: &ScanConfig,
) -> Vec<ScanCandidate> {
    let mut results = Vec::new();
    let mut seen = HashSet::new();

    for kind in ParameterKind::ALL {
        let range = config.range(kind);
        let mut count = 0;

        'tables: for table in tables {
            if count >= range.naive_cap {
                break;
            }
            for (offset, value) in table_words(data, table) {
                let value = u32::from(value);
                if !range.contains(value) || !seen.insert(offset) {
                    continue;
                }
                results.push(ScanCandidate::new(
                    CandidateKind::Parameter(kind),
                    kind.unit(),
                    table,
                    offset,
                    value,
                ));
                count += 1;
                if count >= range.naive_cap {
                    debug!(cap = range.naive_cap, "{} cap reached at table {}", kind, table.index);
                    break 'tables;
                }
            }
        }
    }

    debug!(candidates = results.len(), "naive scan complete");
    results
}
