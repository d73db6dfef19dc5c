//! Report generation module for scan results.
//!
//! Generates reports in various formats:
//! - Console table (top candidates with rule letters)
//! - JSON (full scan report)
//! - CSV (one row per candidate)

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::candidate::Candidate;
use super::engine::ScanReport;

/// Rows shown in the console table by default.
pub const DEFAULT_TABLE_ROWS: usize = 50;

// ============================================================================
// Report Format
// ============================================================================

/// Supported report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    /// Fixed-width console table
    Table,
    /// Full scan report as JSON
    Json,
    /// Candidate rows as CSV
    Csv,
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" | "txt" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            _ => Err(format!("Unknown report format: {}", s)),
        }
    }
}

/// Flat CSV record for one candidate.
#[derive(Debug, Serialize)]
struct CandidateRow<'a> {
    symbol: &'a str,
    pair: &'a str,
    timestamp: String,
    close: f64,
    score: f64,
    momentum_up: bool,
    trend_up: bool,
    not_near_lower: bool,
    near_upper: bool,
    oscillator_ok: bool,
    relative_strength_ok: bool,
    momentum_diff: f64,
    oscillator_fast: Option<f64>,
    oscillator_slow: Option<f64>,
    coin_return: Option<f64>,
    return_diff: f64,
    rules: String,
}

impl<'a> From<&'a Candidate> for CandidateRow<'a> {
    fn from(c: &'a Candidate) -> Self {
        let m = &c.metrics;
        Self {
            symbol: &c.symbol,
            pair: &c.pair,
            timestamp: c.timestamp.to_rfc3339(),
            close: c.close,
            score: c.score,
            momentum_up: m.momentum_up,
            trend_up: m.trend_up,
            not_near_lower: m.not_near_lower,
            near_upper: m.near_upper,
            oscillator_ok: m.oscillator_ok,
            relative_strength_ok: m.relative_strength_ok,
            momentum_diff: m.momentum_diff,
            oscillator_fast: m.oscillator_fast,
            oscillator_slow: m.oscillator_slow,
            coin_return: m.coin_return,
            return_diff: m.return_diff,
            rules: c.rule_letters(),
        }
    }
}

/// `scout_results_YYYYMMDD_HHMMSS.csv` in the working directory.
pub fn default_csv_path() -> PathBuf {
    PathBuf::from(format!("scout_results_{}.csv", Local::now().format("%Y%m%d_%H%M%S")))
}

// ============================================================================
// Screener Report
// ============================================================================

/// Report generator for scan results.
pub struct ScreenerReport {
    report: ScanReport,
}

impl ScreenerReport {
    /// Create a new report from a scan.
    pub fn new(report: ScanReport) -> Self {
        Self { report }
    }

    pub fn scan(&self) -> &ScanReport {
        &self.report
    }

    /// Generate report in the specified format.
    pub fn generate(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Table => Ok(self.to_table(DEFAULT_TABLE_ROWS)),
            ReportFormat::Json => self.to_json(),
            ReportFormat::Csv => {
                let mut buf = Vec::new();
                self.write_csv(&mut buf)?;
                String::from_utf8(buf).context("CSV output was not UTF-8")
            }
        }
    }

    /// Save report to file, adding the format's extension when missing.
    pub fn save_to_file(&self, path: &Path, format: ReportFormat) -> Result<PathBuf> {
        let extension = match format {
            ReportFormat::Table => "txt",
            ReportFormat::Json => "json",
            ReportFormat::Csv => "csv",
        };
        let file_path = if path.extension().is_none() {
            path.with_extension(extension)
        } else {
            path.to_path_buf()
        };

        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).context("Failed to create report directory")?;
        }

        let content = self.generate(format)?;
        std::fs::write(&file_path, content)
            .with_context(|| format!("Failed to write report file {}", file_path.display()))?;

        Ok(file_path)
    }

    /// Fixed-width table of the top `limit` candidates.
    pub fn to_table(&self, limit: usize) -> String {
        let candidates = &self.report.candidates;
        if candidates.is_empty() {
            return "No candidates found.\n".to_string();
        }

        let rule = "=".repeat(100);
        let mut out = String::new();
        out.push('\n');
        out.push_str(&rule);
        out.push_str("\nCOIN SCOUT RESULTS\n");
        out.push_str(&rule);
        out.push_str("\n\n");
        out.push_str(&format!(
            "{:<8} {:>6} {:>12} {:>10} {:>8} {:>8} {:>8} {:<8}\n",
            "Symbol", "Score", "Close", "MACDdiff", "StochK", "StochD", "RSdiff", "Rules"
        ));
        out.push_str(&"-".repeat(100));
        out.push('\n');

        for c in self.report.top(limit) {
            let k = c.metrics.oscillator_fast.unwrap_or(0.0) * 100.0;
            let d = c.metrics.oscillator_slow.unwrap_or(0.0) * 100.0;
            out.push_str(&format!(
                "{:<8} {:>6.1} {:>12.4} {:>10.4} {:>7.1}% {:>7.1}% {:>8.3} {:<8}\n",
                c.symbol,
                c.score,
                c.close,
                c.metrics.momentum_diff,
                k,
                d,
                c.metrics.return_diff,
                c.rule_letters()
            ));
        }

        out.push('\n');
        out.push_str(&format!("Total candidates: {}\n", candidates.len()));
        out.push_str(&format!("Average score: {:.1}\n", self.report.average_score()));
        out
    }

    /// Full scan report as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.report).context("Failed to serialize scan report")
    }

    /// Write every candidate as a CSV row.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        for c in &self.report.candidates {
            csv.serialize(CandidateRow::from(c))
                .with_context(|| format!("Failed to write CSV row for {}", c.symbol))?;
        }
        csv.flush().context("Failed to flush CSV output")?;
        Ok(())
    }
}
