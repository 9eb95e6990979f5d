//! Output formatters for analysis reports.
//!
//! This module provides trait-based formatters for rendering a [`RomReport`]
//! in various output formats (human-readable, JSON, compact).

use crate::types::{format_legacy_relative, RomReport, ScanCandidate, TableDescriptor};
use std::path::Path;

/// Trait for formatting analysis reports.
///
/// Implementors provide methods for rendering each component of a report,
/// plus a method to render the complete report.
pub trait ReportFormatter {
    /// Format the file path header.
    fn format_file(&self, path: &Path) -> String;

    /// Format header and master table locations.
    fn format_structure(&self, report: &RomReport) -> Option<String>;

    /// Format the sub-table list.
    fn format_tables(&self, tables: &[TableDescriptor]) -> Option<String>;

    /// Format scan candidates.
    fn format_candidates(
        &self,
        scan: Option<&str>,
        candidates: &[ScanCandidate],
    ) -> Option<String>;

    /// Format the complete report.
    ///
    /// Default implementation concatenates all component outputs.
    fn format_report(&self, report: &RomReport, path: &Path) -> String {
        let mut parts = Vec::new();

        parts.push(self.format_file(path));

        if let Some(s) = self.format_structure(report) {
            parts.push(s);
        }
        if let Some(s) = self.format_tables(&report.tables) {
            parts.push(s);
        }
        if let Some(s) = self.format_candidates(report.scan.as_deref(), &report.candidates) {
            parts.push(s);
        }

        parts.join("")
    }
}

fn hex_or_dash(offset: Option<usize>) -> String {
    offset.map_or_else(|| "-".to_string(), |o| format!("0x{:X}", o))
}

/// Human-readable output formatter.
#[derive(Debug, Clone)]
pub struct HumanFormatter {
    /// Show verbose output (table list alongside candidates)
    pub verbose: bool,
    /// Quiet mode (minimal output)
    pub quiet: bool,
    /// Maximum number of candidates listed
    pub limit: usize,
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self {
            verbose: false,
            quiet: false,
            limit: 50,
        }
    }
}

impl HumanFormatter {
    /// Create a new human formatter with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a verbose formatter.
    pub fn verbose() -> Self {
        Self {
            verbose: true,
            ..Self::default()
        }
    }

    /// Create a quiet formatter.
    pub fn quiet() -> Self {
        Self {
            quiet: true,
            ..Self::default()
        }
    }
}

impl ReportFormatter for HumanFormatter {
    fn format_file(&self, path: &Path) -> String {
        if self.quiet {
            String::new()
        } else {
            format!("File: {}\n", path.display())
        }
    }

    fn format_structure(&self, report: &RomReport) -> Option<String> {
        if self.quiet {
            return None;
        }
        let mut s = format!("  Size:         {} bytes\n", report.image_len);
        match report.header_offset {
            Some(h) => s.push_str(&format!("  ATOM header:  0x{:X}\n", h)),
            None => s.push_str("  ATOM header:  not found\n"),
        }
        if report.header_offset.is_some() {
            s.push_str(&format!(
                "  Master table: {}\n",
                hex_or_dash(report.master_table_offset)
            ));
        }
        s.push_str(&format!("  Tables:       {}\n", report.tables.len()));
        Some(s)
    }

    fn format_tables(&self, tables: &[TableDescriptor]) -> Option<String> {
        if tables.is_empty() || self.quiet {
            return None;
        }
        let mut s = String::from("  Sub-tables:\n");
        for table in tables {
            s.push_str(&format!("    {}\n", table));
        }
        Some(s)
    }

    fn format_candidates(
        &self,
        scan: Option<&str>,
        candidates: &[ScanCandidate],
    ) -> Option<String> {
        let scan = scan?;

        if self.quiet {
            let mut s = String::new();
            for c in candidates.iter().take(self.limit) {
                s.push_str(&format!("0x{:X}\t{}\n", c.offset_abs, c.raw_value));
            }
            return Some(s);
        }

        let mut s = format!("  Scan:         {} ({} candidates)\n", scan, candidates.len());
        for (i, c) in candidates.iter().take(self.limit).enumerate() {
            let table = c
                .table_index
                .map_or_else(|| "-".to_string(), |t| t.to_string());
            s.push_str(&format!(
                "    {:>3}. 0x{:06X} (rel {}) {:<22} {:>9} {:<3} score {:>3} table {} ({} bytes)\n",
                i + 1,
                c.offset_abs,
                format_legacy_relative(c.offset_rel_legacy, 5),
                c.kind.to_string(),
                c.value,
                c.unit,
                c.score,
                table,
                c.table_size
            ));
        }
        if candidates.len() > self.limit {
            s.push_str(&format!("    ... {} more\n", candidates.len() - self.limit));
        }
        Some(s)
    }

    fn format_report(&self, report: &RomReport, path: &Path) -> String {
        let mut parts = Vec::new();

        parts.push(self.format_file(path));

        if let Some(s) = self.format_structure(report) {
            parts.push(s);
        }
        // The table list is noise next to a candidate list unless asked for.
        if report.scan.is_none() || self.verbose {
            if let Some(s) = self.format_tables(&report.tables) {
                parts.push(s);
            }
        }
        if let Some(s) = self.format_candidates(report.scan.as_deref(), &report.candidates) {
            parts.push(s);
        }

        if !self.quiet {
            parts.push(String::from("\n"));
        }
        parts.join("")
    }
}

/// JSON output formatter.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    /// Pretty-print JSON
    pub pretty: bool,
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl JsonFormatter {
    /// Create a new JSON formatter with pretty printing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compact JSON formatter.
    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

impl ReportFormatter for JsonFormatter {
    fn format_file(&self, _path: &Path) -> String {
        String::new() // Handled in format_report
    }

    fn format_structure(&self, _report: &RomReport) -> Option<String> {
        None // Handled in format_report
    }

    fn format_tables(&self, _tables: &[TableDescriptor]) -> Option<String> {
        None // Handled in format_report
    }

    fn format_candidates(
        &self,
        _scan: Option<&str>,
        _candidates: &[ScanCandidate],
    ) -> Option<String> {
        None // Handled in format_report
    }

    fn format_report(&self, report: &RomReport, path: &Path) -> String {
        #[derive(serde::Serialize)]
        struct JsonOutput<'a> {
            file: String,
            #[serde(flatten)]
            report: &'a RomReport,
        }

        let output = JsonOutput {
            file: path.display().to_string(),
            report,
        };

        let mut s = if self.pretty {
            serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
        } else {
            serde_json::to_string(&output).unwrap_or_else(|_| "{}".to_string())
        };
        s.push('\n');
        s
    }
}

/// Compact single-line output formatter.
#[derive(Debug, Clone, Default)]
pub struct ShortFormatter;

impl ShortFormatter {
    /// Create a new short formatter.
    pub fn new() -> Self {
        Self
    }
}

impl ReportFormatter for ShortFormatter {
    fn format_file(&self, _path: &Path) -> String {
        String::new() // Handled in format_report
    }

    fn format_structure(&self, _report: &RomReport) -> Option<String> {
        None
    }

    fn format_tables(&self, _tables: &[TableDescriptor]) -> Option<String> {
        None
    }

    fn format_candidates(
        &self,
        _scan: Option<&str>,
        _candidates: &[ScanCandidate],
    ) -> Option<String> {
        None
    }

    fn format_report(&self, report: &RomReport, path: &Path) -> String {
        let best = report
            .candidates
            .first()
            .map_or_else(String::new, |c| format!("\t0x{:X}={}", c.offset_abs, c.raw_value));

        format!(
            "{}\t{}\t{}\t{}\t{}{}\n",
            path.display(),
            hex_or_dash(report.header_offset),
            hex_or_dash(report.master_table_offset),
            report.tables.len(),
            report.candidates.len(),
            best
        )
    }
}
