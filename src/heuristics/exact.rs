//! Exact-value search under fixed-point scale hypotheses.
//!
//! When the user already knows a quantity the firmware must encode (for
//! example the board's rated power), the quickest route to its offset is to
//! look for that number directly. Firmware revisions store such values with
//! different fixed-point scales and widths, so every [`ScaleHypothesis`] is
//! tried.

use std::collections::HashSet;

use byteorder::{ByteOrder, LittleEndian};
use tracing::debug;

use crate::formats::atom::scan_targets;
use crate::heuristics::scorer;
use crate::heuristics::smart::dedup_by_best_score;
use crate::types::{
    CandidateKind, FieldWidth, ParameterKind, ScaleHypothesis, ScanCandidate, ScanConfig,
    TableDescriptor,
};

/// Collect every hypothesis match in the large tables, in scan order.
fn collect_matches(
    data: &[u8],
    tables: &[TableDescriptor],
    target: u32,
    config: &ScanConfig,
) -> Vec<ScanCandidate> {
    if target == 0 {
        debug!("exact scan skipped: zero target matches every empty byte");
        return Vec::new();
    }

    let encoded: Vec<(ScaleHypothesis, u32)> = ScaleHypothesis::ALL
        .iter()
        .filter_map(|hyp| hyp.encode(target).map(|v| (*hyp, v)))
        .collect();

    let mut matches = Vec::new();
    for table in &scan_targets(tables, config.large_table_min_size) {
        let bounds = table.bounds(data.len());
        let region = &data[bounds.clone()];

        for pos in 0..region.len() {
            for &(hyp, expected) in &encoded {
                let width = hyp.width.bytes();
                let Some(bytes) = region.get(pos..pos + width) else {
                    continue;
                };
                let raw = match hyp.width {
                    FieldWidth::U8 => u32::from(bytes[0]),
                    FieldWidth::U16 => u32::from(LittleEndian::read_u16(bytes)),
                    FieldWidth::U32 => LittleEndian::read_u32(bytes),
                };
                if raw != expected {
                    continue;
                }
                matches.push(
                    ScanCandidate::new(
                        CandidateKind::Exact(hyp),
                        ParameterKind::Power.unit(),
                        table,
                        bounds.start + pos,
                        raw,
                    )
                    .with_value(f64::from(raw) / f64::from(hyp.multiplier)),
                );
            }
        }
    }
    matches
}

/// Search large tables for `target` under every scale hypothesis.
///
/// One candidate per offset: the first hypothesis to match there (u16
/// scales before u32) is kept. Scores are left at zero.
pub fn scan_exact(
    data: &[u8],
    tables: &[TableDescriptor],
    target: u32,
    config: &ScanConfig,
) -> Vec<ScanCandidate> {
    let mut seen = HashSet::new();
    let results: Vec<_> = collect_matches(data, tables, target, config)
        .into_iter()
        .filter(|c| seen.insert(c.offset_abs))
        .collect();

    debug!(target, candidates = results.len(), "exact scan complete");
    results
}

/// Like [`scan_exact`], but ranks hits by surrounding parameter density.
///
/// Each hit scores `3 * power + voltage + clock` neighborhood counts within
/// its table. Results hold one candidate per offset (highest score) sorted
/// by score, descending.
pub fn scan_exact_scored(
    data: &[u8],
    tables: &[TableDescriptor],
    target: u32,
    config: &ScanConfig,
) -> Vec<ScanCandidate> {
    let scored: Vec<_> = collect_matches(data, tables, target, config)
        .into_iter()
        .map(|c| {
            let bounds = tables
                .iter()
                .find(|t| Some(t.index) == c.table_index)
                .map(|t| t.bounds(data.len()))
                .unwrap_or(c.offset_abs..c.offset_abs);
            let score = scorer::combined_score(data, c.offset_abs, bounds, config);
            c.with_score(score)
        })
        .collect();

    let mut ranked = dedup_by_best_score(scored);
    ranked.sort_by(|a, b| b.score.cmp(&a.score));

    debug!(target, candidates = ranked.len(), "scored exact scan complete");
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::atom::enumerate_tables;
    use crate::testutil::image_with_tables;
    use crate::types::LEGACY_BASE;

    const T: usize = LEGACY_BASE + 0x1000;

    #[test]
    fn test_scaled_u16_variants() {
        let data = image_with_tables(&[(0x1000, 0x800)])
            .u16_at(T + 0x100, 304)
            .u16_at(T + 0x200, 3040)
            .u16_at(T + 0x300, 304 * 16)
            .build();
        let tables = enumerate_tables(&data);

        let results = scan_exact(&data, &tables, 304, &ScanConfig::new());
        let find = |offset: usize| results.iter().find(|c| c.offset_abs == offset).unwrap();

        let u16_scale =
            |multiplier| CandidateKind::Exact(ScaleHypothesis::new(multiplier, FieldWidth::U16));
        assert_eq!(find(T + 0x100).kind, u16_scale(1));
        assert_eq!(find(T + 0x200).kind, u16_scale(10));
        assert_eq!(find(T + 0x300).kind, u16_scale(16));
        for c in &results {
            assert_eq!(c.value, 304.0);
            assert_eq!(c.score, 0);
            assert_eq!(c.unit, "W");
        }
    }

    #[test]
    fn test_u32_variants() {
        let data = image_with_tables(&[(0x1000, 0x800)])
            .u32_at(T + 0x100, 304 * 256)
            .u32_at(T + 0x200, 304_000)
            .build();
        let tables = enumerate_tables(&data);

        let results = scan_exact(&data, &tables, 304, &ScanConfig::new());
        let found: Vec<_> = results.iter().map(|c| (c.offset_abs, c.kind)).collect();
        let exact =
            |multiplier, width| CandidateKind::Exact(ScaleHypothesis::new(multiplier, width));

        // x256 shifts the target up one byte, so the u16 read one byte in
        // sees the plain value too.
        assert_eq!(
            found,
            vec![
                (T + 0x100, exact(256, FieldWidth::U32)),
                (T + 0x101, exact(1, FieldWidth::U16)),
                (T + 0x200, exact(1000, FieldWidth::U32)),
            ]
        );
        assert_eq!(results[0].raw_value, 304 * 256);
        assert!(results.iter().all(|c| c.value == 304.0));
    }

    #[test]
    fn test_same_offset_keeps_first_hypothesis() {
        // 304 followed by zero bytes is both a u16 and a u32 match.
        let data = image_with_tables(&[(0x1000, 0x800)]).u16_at(T + 0x100, 304).build();
        let tables = enumerate_tables(&data);

        let results = scan_exact(&data, &tables, 304, &ScanConfig::new());
        let found: Vec<_> = results.iter().map(|c| (c.offset_abs, c.kind)).collect();
        // The zero byte before it also makes a x256 u32 one byte earlier.
        assert_eq!(
            found,
            vec![
                (T + 0xFF, CandidateKind::Exact(ScaleHypothesis::new(256, FieldWidth::U32))),
                (T + 0x100, CandidateKind::Exact(ScaleHypothesis::new(1, FieldWidth::U16))),
            ]
        );
    }

    #[test]
    fn test_zero_target_is_empty() {
        let data = image_with_tables(&[(0x1000, 0x800)]).build();
        let tables = enumerate_tables(&data);
        assert!(scan_exact(&data, &tables, 0, &ScanConfig::new()).is_empty());
        assert!(scan_exact_scored(&data, &tables, 0, &ScanConfig::new()).is_empty());
    }

    #[test]
    fn test_u32_match_needs_four_bytes_in_table() {
        // The value straddles the end of the table.
        let data = image_with_tables(&[(0x1000, 0x10)])
            .u32_at(T + 0xE, 304 * 256)
            .build();
        let tables = enumerate_tables(&data);
        assert!(scan_exact(&data, &tables, 304, &ScanConfig::new()).is_empty());
    }

    #[test]
    fn test_scored_dense_neighborhood_positive() {
        let data = image_with_tables(&[(0x1000, 0x800)])
            .u16_at(T + 0x100, 304)
            .u16_at(T + 0x102, 250)
            .u16_at(T + 0x104, 200)
            .u16_at(T + 0x106, 220)
            .u16_at(T + 0x400, 304)
            .build();
        let tables = enumerate_tables(&data);

        let results = scan_exact_scored(&data, &tables, 304, &ScanConfig::new());
        assert!(!results.is_empty());
        assert_eq!(results[0].offset_abs, T + 0x100);
        assert_eq!(results[0].score, 9);

        let lone = results.iter().find(|c| c.offset_abs == T + 0x400).unwrap();
        assert_eq!(lone.score, 0);

        let offsets: HashSet<_> = results.iter().map(|c| c.offset_abs).collect();
        assert_eq!(offsets.len(), results.len());
    }

    #[test]
    fn test_lone_value_found_but_unscored() {
        let data = image_with_tables(&[(0x1000, 0x800)]).u16_at(T + 0x100, 304).build();
        let tables = enumerate_tables(&data);

        let plain = scan_exact(&data, &tables, 304, &ScanConfig::new());
        assert!(plain.iter().any(|c| c.offset_abs == T + 0x100));

        let scored = scan_exact_scored(&data, &tables, 304, &ScanConfig::new());
        assert_eq!(scored.len(), plain.len());
        assert!(scored.iter().all(|c| c.score == 0));
    }
}
