//! Append-only record of items that failed during a run.
//!
//! One line per failure: `item_name (timestamp): reason [m1, m2]`.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::models::MassPair;

/// File name of the error record inside a job's output directory.
pub const ERROR_LOG_FILE: &str = "errors.txt";

/// Appends failure lines to `errors.txt`.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    /// Error log inside `output_dir`. The file is created on first append.
    pub fn in_dir(output_dir: impl AsRef<Path>) -> Self {
        Self {
            path: output_dir.as_ref().join(ERROR_LOG_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one failure line.
    pub fn append(&self, item_name: &str, reason: &str, masses: MassPair) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(
            file,
            "{} ({}): {} [{}, {}]",
            item_name,
            timestamp,
            reason.replace('\n', " "),
            masses.m1,
            masses.m2
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn appends_lines() {
        let dir = tempdir().unwrap();
        let log = ErrorLog::in_dir(dir.path());

        log.append("bank_mm_10-5", "all approximants failed", MassPair::new(10.0, 5.0))
            .unwrap();
        log.append("bank_mm_12-5", "bad\nreason", MassPair::new(12.0, 5.0))
            .unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("bank_mm_10-5 ("));
        assert!(lines[0].ends_with("): all approximants failed [10, 5]"));
        assert!(lines[1].contains("bad reason"));
    }
}
