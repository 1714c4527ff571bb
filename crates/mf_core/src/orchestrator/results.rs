//! Ranked sweep results and the two result tables.
//!
//! Table layout, one template per row:
//!
//! ```text
//! # signal: GW150914_H1
//! # order: bank | columns: name score time m1 m2 M r Mc
//! bank_mm_36-29 0.912345 16.442383 36.000000 29.000000 65.000000 0.805556 28.094412
//! ```

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analysis::BestMatch;
use crate::bank::Template;
use crate::models::MassPair;

use super::errors::{EngineError, EngineResult};

/// Results in bank order.
pub const RESULTS_FILE: &str = "00_matched_filtering_results.dat";
/// Results by descending score.
pub const SORTED_RESULTS_FILE: &str = "00_matched_filtering_results_sorted.dat";

const COLUMNS: &str = "name score time m1 m2 M r Mc";

/// Row order of a result table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableOrder {
    Bank,
    ScoreDescending,
}

impl TableOrder {
    pub fn file_name(&self) -> &'static str {
        match self {
            TableOrder::Bank => RESULTS_FILE,
            TableOrder::ScoreDescending => SORTED_RESULTS_FILE,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            TableOrder::Bank => "bank",
            TableOrder::ScoreDescending => "score descending",
        }
    }
}

/// Best match of one template against the swept signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub name: String,
    pub score: f64,
    pub time: f64,
    pub m1: f64,
    pub m2: f64,
    pub total_mass: f64,
    pub ratio: f64,
    pub chirp_mass: f64,
    /// Segment that produced the best match. Not written to the tables.
    #[serde(default)]
    pub segment_index: usize,
}

impl RankedResult {
    pub fn new(name: impl Into<String>, masses: MassPair, score: f64, time: f64) -> Self {
        Self {
            name: name.into(),
            score,
            time,
            m1: masses.m1,
            m2: masses.m2,
            total_mass: masses.total_mass(),
            ratio: masses.ratio(),
            chirp_mass: masses.chirp_mass(),
            segment_index: 0,
        }
    }

    pub fn from_best(template: &Template, best: &BestMatch) -> Self {
        Self {
            segment_index: best.segment_index,
            ..Self::new(&template.name, template.masses, best.score(), best.time())
        }
    }

    pub fn masses(&self) -> MassPair {
        MassPair::new(self.m1, self.m2)
    }

    fn to_row(&self) -> String {
        format!(
            "{} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6}",
            self.name,
            self.score,
            self.time,
            self.m1,
            self.m2,
            self.total_mass,
            self.ratio,
            self.chirp_mass
        )
    }

    /// Parse a row. The name may contain spaces; the seven numbers are taken
    /// from the end.
    fn from_row(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 8 {
            return None;
        }
        let split = fields.len() - 7;
        let numbers: Vec<f64> = fields[split..]
            .iter()
            .map(|f| f.parse().ok())
            .collect::<Option<_>>()?;
        Some(Self {
            name: fields[..split].join(" "),
            score: numbers[0],
            time: numbers[1],
            m1: numbers[2],
            m2: numbers[3],
            total_mass: numbers[4],
            ratio: numbers[5],
            chirp_mass: numbers[6],
            segment_index: 0,
        })
    }
}

/// Indices of `results` by descending score. Equal scores keep bank order.
pub fn rank_order(results: &[RankedResult]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..results.len()).collect();
    order.sort_by(|&a, &b| results[b].score.total_cmp(&results[a].score));
    order
}

/// Results sorted by descending score.
pub fn rank(results: &[RankedResult]) -> Vec<RankedResult> {
    rank_order(results)
        .into_iter()
        .map(|i| results[i].clone())
        .collect()
}

/// Write a result table, replacing any previous one.
pub fn write_table(
    dir: &Path,
    signal_name: &str,
    order: TableOrder,
    rows: &[RankedResult],
) -> EngineResult<()> {
    let mut content = String::new();
    let _ = writeln!(content, "# signal: {signal_name}");
    let _ = writeln!(content, "# order: {} | columns: {COLUMNS}", order.label());
    for row in rows {
        content.push_str(&row.to_row());
        content.push('\n');
    }

    let path = dir.join(order.file_name());
    let temp = path.with_extension("dat.tmp");
    fs::write(&temp, content).map_err(|e| EngineError::io("writing result table", e))?;
    fs::rename(&temp, &path).map_err(|e| EngineError::io("writing result table", e))?;
    tracing::debug!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Read a result table written by `write_table`.
pub fn load_table(path: &Path) -> EngineResult<Vec<RankedResult>> {
    let content =
        fs::read_to_string(path).map_err(|e| EngineError::io("reading result table", e))?;
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            RankedResult::from_row(line).ok_or_else(|| {
                EngineError::configuration(format!(
                    "malformed row in {}: {line}",
                    path.display()
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn row(name: &str, score: f64) -> RankedResult {
        RankedResult::new(name, MassPair::new(36.0, 29.0), score, 16.4)
    }

    #[test]
    fn derived_columns() {
        let r = RankedResult::new("t", MassPair::new(10.0, 10.0), 0.5, 1.0);
        assert_eq!(r.total_mass, 20.0);
        assert_eq!(r.ratio, 1.0);
        assert!((r.chirp_mass - 8.705505632961241).abs() < 1e-9);
    }

    #[test]
    fn rank_is_stable_for_ties() {
        let rows = vec![row("a", 0.3), row("b", 0.9), row("c", 0.3), row("d", 0.9)];
        let names: Vec<_> = rank(&rows).into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn table_has_two_header_lines_and_reloads() {
        let dir = tempdir().unwrap();
        let rows = vec![row("bank_mm_36-29", 0.912345), row("with space", 0.1)];
        write_table(dir.path(), "GW150914_H1", TableOrder::Bank, &rows).unwrap();

        let content = fs::read_to_string(dir.path().join(RESULTS_FILE)).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "# signal: GW150914_H1");
        assert!(lines[1].starts_with("# order: bank"));
        assert!(lines[2].starts_with("bank_mm_36-29 0.912345 16.400000 36.000000"));

        let loaded = load_table(&dir.path().join(RESULTS_FILE)).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].name, "with space");
        assert!((loaded[0].score - 0.912345).abs() < 1e-12);
    }
}
