//! Output formatting for CLI display.
//!
//! Provides the [`PrettyPrint`] trait for human-readable output
//! as an alternative to JSON serialization.

use tabled::builder::Builder;

use crate::download::{DownloadReport, JobStatus};
use crate::table::{Table, Tables};

/// Trait for human-readable output.
///
/// Implemented by result types to provide formatted output
/// suitable for terminal display when `--json` is not specified.
pub trait PrettyPrint {
    /// Returns a formatted string for terminal display.
    fn pretty_print(&self) -> String;
}

impl PrettyPrint for Table {
    fn pretty_print(&self) -> String {
        if self.columns().is_empty() {
            return "(no records)".to_string();
        }

        let mut builder = Builder::default();
        builder.push_record(self.columns().iter().cloned());
        for row in self.rows() {
            builder.push_record(row.iter().map(ToString::to_string));
        }
        builder.build().to_string()
    }
}

impl PrettyPrint for Tables {
    fn pretty_print(&self) -> String {
        let mut builder = Builder::default();
        builder.push_record(["entity", "records", "columns"]);
        for (entity, table) in self.iter() {
            builder.push_record([
                entity.to_string(),
                table.len().to_string(),
                table.columns().len().to_string(),
            ]);
        }
        builder.build().to_string()
    }
}

impl PrettyPrint for DownloadReport {
    fn pretty_print(&self) -> String {
        let header = format!("Downloads: {}", self.output_dir.display());
        let divider = "─".repeat(header.chars().count().max(30));

        let mut lines = vec![
            header,
            divider,
            format!("Succeeded:      {}", self.succeeded()),
            format!("Skipped:        {}", self.skipped()),
            format!("Failed:         {}", self.failed()),
        ];

        for outcome in &self.outcomes {
            if let JobStatus::Failed { error } = &outcome.status {
                lines.push(format!("  ✗ {}: {}", outcome.document_id, error));
            }
        }

        lines.join("\n")
    }
}
