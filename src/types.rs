//! Core types for the ATOM BIOS scanner.
//!
//! This module defines the plain value records produced by table discovery
//! and candidate scanning, together with the scan configuration. None of
//! these types hold a reference into the ROM buffer; they describe it by
//! offset only and go stale when the buffer is edited.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

use crate::error::{AtomError, Result};

/// Offset at which legacy ATOM BIOS content begins inside a full image.
///
/// Every relative offset stored in the firmware (master table, sub-tables)
/// and every "relative" offset shown to users is relative to this value.
pub const LEGACY_BASE: usize = 0x40000;

/// Convert an absolute image offset to a legacy-relative offset.
pub fn to_legacy_relative(offset_abs: usize) -> i64 {
    offset_abs as i64 - LEGACY_BASE as i64
}

/// Render a legacy-relative offset as signed hex, zero-padded to `width`
/// digits: `0x01020`, `-0x3FFF0`.
pub fn format_legacy_relative(rel: i64, width: usize) -> String {
    let sign = if rel < 0 { "-" } else { "" };
    format!("{}0x{:0width$X}", sign, rel.unsigned_abs(), width = width)
}

/// Width of an unsigned little-endian field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldWidth {
    /// 8-bit field
    U8,
    /// 16-bit field
    U16,
    /// 32-bit field
    U32,
}

impl FieldWidth {
    /// Number of bytes occupied by the field.
    pub const fn bytes(self) -> usize {
        match self {
            FieldWidth::U8 => 1,
            FieldWidth::U16 => 2,
            FieldWidth::U32 => 4,
        }
    }

    /// Number of bits in the field.
    pub const fn bits(self) -> u32 {
        self.bytes() as u32 * 8
    }

    /// Largest value representable in the field.
    pub const fn max_value(self) -> u32 {
        match self {
            FieldWidth::U8 => u8::MAX as u32,
            FieldWidth::U16 => u16::MAX as u32,
            FieldWidth::U32 => u32::MAX,
        }
    }

    /// Look up a width by its bit count (8, 16 or 32).
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            8 => Some(FieldWidth::U8),
            16 => Some(FieldWidth::U16),
            32 => Some(FieldWidth::U32),
            _ => None,
        }
    }
}

impl fmt::Display for FieldWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "u{}", self.bits())
    }
}

/// One resolved sub-table from the master data table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Slot position within the master table (not the output position)
    pub index: usize,
    /// Offset as stored in the master table, relative to [`LEGACY_BASE`]
    pub offset_rel: u16,
    /// Absolute offset within the image
    pub offset_abs: usize,
    /// Declared size from the sub-table's own header
    pub size: u16,
    /// Format revision byte
    pub format_rev: u8,
    /// Content revision byte
    pub content_rev: u8,
}

impl TableDescriptor {
    /// Size of the common sub-table header (size, format rev, content rev).
    pub const HEADER_LEN: usize = 4;

    /// Byte range covered by the table, clamped to an image of `len` bytes.
    pub fn bounds(&self, len: usize) -> Range<usize> {
        let start = self.offset_abs.min(len);
        let end = self.offset_abs.saturating_add(self.size as usize).min(len);
        start..end.max(start)
    }

    /// First byte past the common sub-table header.
    pub fn data_start(&self) -> usize {
        self.offset_abs + Self::HEADER_LEN
    }
}

impl fmt::Display for TableDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:<3} rel 0x{:04X}  abs 0x{:06X}  size {:5}  rev {}.{}",
            self.index,
            self.offset_rel,
            self.offset_abs,
            self.size,
            self.format_rev,
            self.content_rev
        )
    }
}

/// Parameter families the range scanners look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    /// Board or chip power limit
    Power,
    /// Voltage target
    Voltage,
    /// Clock frequency target
    Clock,
}

impl ParameterKind {
    /// All kinds in scan order.
    pub const ALL: [ParameterKind; 3] =
        [ParameterKind::Power, ParameterKind::Voltage, ParameterKind::Clock];

    /// Display unit for values of this kind.
    pub const fn unit(self) -> &'static str {
        match self {
            ParameterKind::Power => "W",
            ParameterKind::Voltage => "mV",
            ParameterKind::Clock => "MHz",
        }
    }

    /// Human-readable label including the unit.
    pub const fn label(self) -> &'static str {
        match self {
            ParameterKind::Power => "Power (W)",
            ParameterKind::Voltage => "Voltage (mV)",
            ParameterKind::Clock => "Clock (MHz)",
        }
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One fixed-point encoding guess for an exact-value search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScaleHypothesis {
    /// Factor applied to the target before encoding
    pub multiplier: u32,
    /// Encoded field width
    pub width: FieldWidth,
}

impl ScaleHypothesis {
    /// Encoding guesses tried by the exact-value scanner, in match order.
    pub const ALL: [ScaleHypothesis; 9] = [
        ScaleHypothesis::new(1, FieldWidth::U16),
        ScaleHypothesis::new(2, FieldWidth::U16),
        ScaleHypothesis::new(4, FieldWidth::U16),
        ScaleHypothesis::new(8, FieldWidth::U16),
        ScaleHypothesis::new(10, FieldWidth::U16),
        ScaleHypothesis::new(16, FieldWidth::U16),
        ScaleHypothesis::new(1, FieldWidth::U32),
        ScaleHypothesis::new(256, FieldWidth::U32),
        ScaleHypothesis::new(1000, FieldWidth::U32),
    ];

    /// Create a hypothesis.
    pub const fn new(multiplier: u32, width: FieldWidth) -> Self {
        Self { multiplier, width }
    }

    /// Encoded value for `target`, or `None` if it does not fit the width.
    pub fn encode(&self, target: u32) -> Option<u32> {
        target
            .checked_mul(self.multiplier)
            .filter(|&v| v <= self.width.max_value())
    }
}

impl fmt::Display for ScaleHypothesis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.multiplier == 1 {
            write!(f, "exact {}", self.width)
        } else {
            write!(f, "x{} {}", self.multiplier, self.width)
        }
    }
}

/// What a scan candidate was matched as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    /// Value within a parameter kind's plausible range
    Parameter(ParameterKind),
    /// Exact match of a target under a scale hypothesis
    Exact(ScaleHypothesis),
}

impl fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateKind::Parameter(kind) => write!(f, "{}", kind),
            CandidateKind::Exact(hyp) => write!(f, "Exact ({})", hyp),
        }
    }
}

/// One offset that plausibly holds a tunable parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanCandidate {
    /// How the candidate was matched
    pub kind: CandidateKind,
    /// Display unit
    pub unit: &'static str,
    /// Master-table slot of the owning table, if table scoped
    pub table_index: Option<usize>,
    /// Absolute offset within the image
    pub offset_abs: usize,
    /// Offset relative to [`LEGACY_BASE`]
    pub offset_rel_legacy: i64,
    /// Value exactly as encoded
    pub raw_value: u32,
    /// Value scaled for display
    pub value: f64,
    /// Neighborhood confidence (0 where not computed)
    pub score: u32,
    /// Declared size of the owning table
    pub table_size: u16,
}

impl ScanCandidate {
    pub(crate) fn new(
        kind: CandidateKind,
        unit: &'static str,
        table: &TableDescriptor,
        offset_abs: usize,
        raw_value: u32,
    ) -> Self {
        Self {
            kind,
            unit,
            table_index: Some(table.index),
            offset_abs,
            offset_rel_legacy: to_legacy_relative(offset_abs),
            raw_value,
            value: f64::from(raw_value),
            score: 0,
            table_size: table.size,
        }
    }

    pub(crate) fn with_value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    pub(crate) fn with_score(mut self, score: u32) -> Self {
        self.score = score;
        self
    }
}

impl fmt::Display for ScanCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:06X} (rel {}) {} = {} {} [raw {}, score {}]",
            self.offset_abs,
            format_legacy_relative(self.offset_rel_legacy, 5),
            self.kind,
            self.value,
            self.unit,
            self.raw_value,
            self.score
        )
    }
}

/// Plausible value range and thresholds for one parameter kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindRange {
    /// Smallest plausible raw value (inclusive)
    pub min: u32,
    /// Largest plausible raw value (inclusive)
    pub max: u32,
    /// Maximum candidates kept by the naive scan
    pub naive_cap: usize,
    /// Minimum neighborhood score accepted by the smart scan
    pub min_score: u32,
}

impl KindRange {
    /// Create a range.
    pub const fn new(min: u32, max: u32, naive_cap: usize, min_score: u32) -> Self {
        Self {
            min,
            max,
            naive_cap,
            min_score,
        }
    }

    /// Whether `value` lies inside `[min, max]`.
    pub fn contains(&self, value: u32) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Options controlling the candidate scanners.
///
/// Defaults reproduce the stock thresholds: power 150-600 W, voltage
/// 600-1600 mV, clock 500-4000 MHz, a 64-byte neighborhood window at
/// stride 2 and a 1024-byte minimum for "large" tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Power range
    pub power: KindRange,
    /// Voltage range
    pub voltage: KindRange,
    /// Clock range
    pub clock: KindRange,
    /// Neighborhood half-width in bytes
    pub window: usize,
    /// Neighborhood step in bytes
    pub stride: usize,
    /// Minimum table size for the smart and exact scans
    pub large_table_min_size: u16,
    /// Maximum number of smart-scan results
    pub smart_result_cap: usize,
    /// Target used by the scored exact scan when none is given
    pub exact_target: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanConfig {
    /// Create a configuration with the stock thresholds.
    pub const fn new() -> Self {
        Self {
            power: KindRange::new(150, 600, 60, 3),
            voltage: KindRange::new(600, 1600, 80, 4),
            clock: KindRange::new(500, 4000, 120, 4),
            window: 64,
            stride: 2,
            large_table_min_size: 1024,
            smart_result_cap: 400,
            exact_target: 304,
        }
    }

    /// Higher score thresholds, fewer results.
    pub fn strict() -> Self {
        let mut config = Self::new();
        config.power.min_score = 5;
        config.voltage.min_score = 6;
        config.clock.min_score = 6;
        config.smart_result_cap = 100;
        config
    }

    /// Lower score thresholds and larger caps for sparse images.
    pub fn permissive() -> Self {
        let mut config = Self::new();
        config.power = KindRange::new(150, 600, 200, 1);
        config.voltage = KindRange::new(600, 1600, 200, 2);
        config.clock = KindRange::new(500, 4000, 300, 2);
        config.large_table_min_size = 256;
        config.smart_result_cap = 1000;
        config
    }

    /// Range for a parameter kind.
    pub fn range(&self, kind: ParameterKind) -> &KindRange {
        match kind {
            ParameterKind::Power => &self.power,
            ParameterKind::Voltage => &self.voltage,
            ParameterKind::Clock => &self.clock,
        }
    }

    /// Parse a configuration from JSON; missing fields take defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).map_err(|e| AtomError::ConfigError {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<()> {
        if self.stride == 0 {
            return Err(AtomError::ConfigError {
                message: "stride must be at least 1".to_string(),
            });
        }
        for kind in ParameterKind::ALL {
            let range = self.range(kind);
            if range.min > range.max {
                return Err(AtomError::ConfigError {
                    message: format!(
                        "{} range is empty: min {} > max {}",
                        kind, range.min, range.max
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Complete result of analysing one image.
#[derive(Debug, Clone, Serialize)]
pub struct RomReport {
    /// Image length in bytes
    pub image_len: usize,
    /// Absolute offset of the ATOM header
    pub header_offset: Option<usize>,
    /// Absolute offset of the master data table
    pub master_table_offset: Option<usize>,
    /// Enumerated sub-tables
    pub tables: Vec<TableDescriptor>,
    /// Scan that produced `candidates`, if any
    pub scan: Option<String>,
    /// Scan results
    pub candidates: Vec<ScanCandidate>,
}
