//! Density-scored range scan.
//!
//! Scans only large tables, classifies every position against all three
//! kinds at once, and keeps a hit only when enough same-kind values sit
//! around it. Unlike the naive scan, everything is collected first and
//! then ranked, so the cap never depends on table order.

use std::collections::HashMap;

use tracing::debug;

use crate::formats::atom::scan_targets;
use crate::heuristics::{scorer, table_words};
use crate::types::{CandidateKind, ParameterKind, ScanCandidate, ScanConfig, TableDescriptor};

/// Scan large tables for densely clustered power, voltage and clock values.
///
/// Results hold at most one candidate per offset (the higher score wins),
/// are sorted by score then table size, both descending, and are capped at
/// `config.smart_result_cap`.
pub fn scan_smart(
    data: &[u8],
    tables: &[TableDescriptor],
    config: &ScanConfig,
) -> Vec<ScanCandidate> {
    let targets = scan_targets(tables, config.large_table_min_size);
    let mut candidates = Vec::new();

    for table in &targets {
        let bounds = table.bounds(data.len());
        for (offset, value) in table_words(data, table) {
            // Size and revision bytes, not data.
            if offset < table.data_start() {
                continue;
            }
            let value = u32::from(value);
            for kind in ParameterKind::ALL {
                let range = config.range(kind);
                if !range.contains(value) {
                    continue;
                }
                let score = scorer::kind_score(data, offset, bounds.clone(), kind, config);
                if score < range.min_score {
                    continue;
                }
                candidates.push(
                    ScanCandidate::new(
                        CandidateKind::Parameter(kind),
                        kind.unit(),
                        table,
                        offset,
                        value,
                    )
                    .with_score(score),
                );
            }
        }
    }

    let found = candidates.len();
    let mut ranked = dedup_by_best_score(candidates);
    ranked.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| b.table_size.cmp(&a.table_size))
    });
    ranked.truncate(config.smart_result_cap);

    debug!(
        tables = targets.len(),
        found,
        kept = ranked.len(),
        "smart scan complete"
    );
    ranked
}

/// Keep one candidate per offset, preferring the higher score. On a tie the
/// earlier candidate stays. First-appearance order is preserved.
pub(crate) fn dedup_by_best_score(candidates: Vec<ScanCandidate>) -> Vec<ScanCandidate> {
    let mut slots: HashMap<usize, usize> = HashMap::with_capacity(candidates.len());
    let mut unique: Vec<ScanCandidate> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        match slots.get(&candidate.offset_abs) {
            Some(&i) => {
                if candidate.score > unique[i].score {
                    unique[i] = candidate;
                }
            }
            None => {
                slots.insert(candidate.offset_abs, unique.len());
                unique.push(candidate);
            }
        }
    }
    unique
}
