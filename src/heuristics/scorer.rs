//! Neighborhood density scoring.
//!
//! Real tuning parameters tend to sit in blocks of similar values (a power
//! table, a voltage curve, a clock ladder). A value in a plausible range
//! with several plausible neighbors is more likely to be one of them than
//! an isolated byte pattern that happens to decode into range.

use std::ops::Range;

use byteorder::{ByteOrder, LittleEndian};

use crate::types::{KindRange, ParameterKind, ScanConfig};

/// Weight of the power density in [`combined_score`].
pub const POWER_WEIGHT: u32 = 3;

/// Count other plausible values around `offset`.
///
/// Visits `offset ± k * stride` for `k >= 1` while `k * stride <= window`,
/// keeping only positions inside `[bounds.start, bounds.end - 2]`, and
/// counts those holding a little-endian u16 within `range`. The position
/// at `offset` itself is not counted.
pub fn neighborhood_score(
    data: &[u8],
    offset: usize,
    bounds: Range<usize>,
    range: &KindRange,
    window: usize,
    stride: usize,
) -> u32 {
    let stride = stride.max(1);
    let end = bounds.end.min(data.len());
    if end < bounds.start + 2 {
        return 0;
    }
    let first = bounds.start;
    let last = end - 2;

    let hit = |pos: usize| {
        (first..=last).contains(&pos)
            && range.contains(u32::from(LittleEndian::read_u16(&data[pos..pos + 2])))
    };

    // Nothing past the farther table edge can hit, whatever the window.
    let reach = window.min(offset.abs_diff(first).max(offset.abs_diff(last)));

    let mut score = 0;
    let mut step = stride;
    while step <= reach {
        if offset.checked_sub(step).is_some_and(hit) {
            score += 1;
        }
        if offset.checked_add(step).is_some_and(hit) {
            score += 1;
        }
        step += stride;
    }
    score
}

/// Neighborhood score for one parameter kind under `config`.
pub fn kind_score(
    data: &[u8],
    offset: usize,
    bounds: Range<usize>,
    kind: ParameterKind,
    config: &ScanConfig,
) -> u32 {
    neighborhood_score(
        data,
        offset,
        bounds,
        config.range(kind),
        config.window,
        config.stride,
    )
}

/// Weighted density across all kinds: `3 * power + voltage + clock`.
pub fn combined_score(
    data: &[u8],
    offset: usize,
    bounds: Range<usize>,
    config: &ScanConfig,
) -> u32 {
    let power = kind_score(data, offset, bounds.clone(), ParameterKind::Power, config);
    let voltage = kind_score(data, offset, bounds.clone(), ParameterKind::Voltage, config);
    let clock = kind_score(data, offset, bounds, ParameterKind::Clock, config);
    power * POWER_WEIGHT + voltage + clock
}
