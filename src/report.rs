//! Run statistics and the end-of-run summary.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Number of errors of each category listed in the summary.
pub const MAX_LISTED_ERRORS: usize = 5;

const RULE_WIDTH: usize = 50;

/// A file that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseErrorRecord {
    pub file: String,
    pub error: String,
}

/// A declaration that could not be identified or stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordError {
    pub file: String,
    pub callable: String,
    pub error: String,
}

/// Counters accumulated over one indexing run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub files_scanned: usize,
    pub callables_found: usize,
    pub skipped_not_standalone: usize,
    pub skipped_no_docstring: usize,
    pub skipped_duplicates: usize,
    pub new_uploads: usize,
    pub errors: Vec<RecordError>,
    pub parse_errors: Vec<ParseErrorRecord>,
}

impl RunStats {
    /// Declarations that passed classification.
    pub fn valid_callables(&self) -> usize {
        self.callables_found
            .saturating_sub(self.skipped_not_standalone)
            .saturating_sub(self.skipped_no_docstring)
    }

    pub fn total_errors(&self) -> usize {
        self.errors.len() + self.parse_errors.len()
    }

    /// Process exit code for this run.
    ///
    /// `0` without errors. With errors, `1` if anything was stored and `2`
    /// if nothing was.
    pub fn exit_code(&self) -> i32 {
        if self.total_errors() == 0 {
            0
        } else if self.new_uploads > 0 {
            1
        } else {
            2
        }
    }

    /// Structured form of the summary, for `--json`.
    pub fn summary(&self, catalog_total: Option<usize>) -> SummaryReport {
        SummaryReport {
            files_scanned: self.files_scanned,
            callables_found: self.callables_found,
            skipped_not_standalone: self.skipped_not_standalone,
            skipped_no_docstring: self.skipped_no_docstring,
            valid_callables: self.valid_callables(),
            new_uploads: self.new_uploads,
            skipped_duplicates: self.skipped_duplicates,
            total_errors: self.total_errors(),
            catalog_total,
            parse_errors: self.parse_errors.clone(),
            errors: self.errors.clone(),
        }
    }

    /// Human-readable summary.
    pub fn render(&self, catalog_total: Option<usize>) -> String {
        let mut out = String::new();
        let rule = "=".repeat(RULE_WIDTH);

        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "Indexing Complete!");
        let _ = writeln!(out, "{rule}");

        let rows = [
            ("Files scanned:", self.files_scanned),
            ("Callables found:", self.callables_found),
            ("Skipped (not standalone):", self.skipped_not_standalone),
            ("Skipped (no docstring):", self.skipped_no_docstring),
            ("Valid callables:", self.valid_callables()),
            ("New uploads:", self.new_uploads),
            ("Duplicates skipped:", self.skipped_duplicates),
            ("Errors:", self.total_errors()),
        ];
        for (label, value) in rows {
            let _ = writeln!(out, "{label:<26}{value}");
        }

        if let Some(total) = catalog_total {
            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "Catalog now contains {} code entries",
                group_thousands(total)
            );
        }

        if !self.parse_errors.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Parse Errors:");
            for e in self.parse_errors.iter().take(MAX_LISTED_ERRORS) {
                let _ = writeln!(out, "  - {}: {}", e.file, e.error);
            }
            write_remaining(&mut out, self.parse_errors.len());
        }

        if !self.errors.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Upload Errors:");
            for e in self.errors.iter().take(MAX_LISTED_ERRORS) {
                let _ = writeln!(out, "  - {} ({}): {}", e.file, e.callable, e.error);
            }
            write_remaining(&mut out, self.errors.len());
        }

        out
    }
}

/// Serializable summary of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryReport {
    pub files_scanned: usize,
    pub callables_found: usize,
    pub skipped_not_standalone: usize,
    pub skipped_no_docstring: usize,
    pub valid_callables: usize,
    pub new_uploads: usize,
    pub skipped_duplicates: usize,
    pub total_errors: usize,
    pub catalog_total: Option<usize>,
    pub parse_errors: Vec<ParseErrorRecord>,
    pub errors: Vec<RecordError>,
}

fn write_remaining(out: &mut String, total: usize) {
    if total > MAX_LISTED_ERRORS {
        let _ = writeln!(out, "  ... and {} more", total - MAX_LISTED_ERRORS);
    }
}

/// `1247` becomes `1,247`.
fn group_thousands(value: usize) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_error(n: usize) -> ParseErrorRecord {
        ParseErrorRecord {
            file: format!("bad_{n}.py"),
            error: "Syntax error".to_string(),
        }
    }

    #[test]
    fn test_valid_callables_formula() {
        let stats = RunStats {
            callables_found: 156,
            skipped_not_standalone: 89,
            skipped_no_docstring: 34,
            ..Default::default()
        };
        assert_eq!(stats.valid_callables(), 33);
    }

    #[test]
    fn test_exit_codes() {
        let mut stats = RunStats::default();
        assert_eq!(stats.exit_code(), 0);

        stats.parse_errors.push(parse_error(0));
        assert_eq!(stats.exit_code(), 2);

        stats.new_uploads = 3;
        assert_eq!(stats.exit_code(), 1);
    }

    #[test]
    fn test_render_lists_first_five_errors() {
        let stats = RunStats {
            files_scanned: 8,
            parse_errors: (0..8).map(parse_error).collect(),
            ..Default::default()
        };
        let text = stats.render(Some(1247));

        assert!(text.contains("Files scanned:            8"));
        assert!(text.contains("Errors:                   8"));
        assert!(text.contains("Catalog now contains 1,247 code entries"));
        assert!(text.contains("bad_4.py"));
        assert!(!text.contains("bad_5.py"));
        assert!(text.contains("  ... and 3 more"));
        assert!(!text.contains("Upload Errors:"));
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }
}
