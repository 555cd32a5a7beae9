//! Per-batch result tables: a pretty table for the console and CSV for files.

use std::{fmt, io};

use serde::{Serialize, Serializer};
use tabled::{Table, Tabled, settings::Style};

use super::Summary;

/// How an instance left the pipeline.
#[derive(Clone, Debug, PartialEq)]
pub enum Status {
    Solved,
    /// The engine stopped at its time limit without a feasible solution.
    NoSolution,
    /// Processing failed; carries the error kind.
    Failed(String),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Solved => write!(f, "solved"),
            Status::NoSolution => write!(f, "time limit (no solution)"),
            Status::Failed(kind) => write!(f, "failed ({kind})"),
        }
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One processed instance of a batch. Failed instances keep only their name and error;
/// instances without a solution keep the bound and the runtime.
#[derive(Clone, Debug, PartialEq, Serialize, Tabled)]
pub struct InstanceRow {
    #[tabled(rename = "Batch")]
    pub batch: String,
    #[tabled(rename = "Instance")]
    pub instance: String,
    #[tabled(rename = "Status")]
    pub status: Status,
    #[tabled(rename = "n", display_with = "display_option")]
    pub n: Option<usize>,
    #[tabled(rename = "Objective", display_with = "display_option")]
    pub objective: Option<f64>,
    #[tabled(rename = "Best Bound", display_with = "display_option")]
    pub dual: Option<f64>,
    #[tabled(rename = "Gap (%)", display_with = "display_percent")]
    pub relative_gap: Option<f64>,
    #[tabled(rename = "Runtime (s)", display_with = "display_seconds")]
    pub runtime_secs: Option<f64>,
    #[tabled(rename = "Chosen", display_with = "display_option")]
    pub chosen: Option<usize>,
    #[tabled(rename = "Coverage (%)", display_with = "display_option")]
    pub coverage_pct: Option<f64>,
    #[tabled(rename = "Coefficient Sum", display_with = "display_option")]
    pub coefficient_sum: Option<f64>,
}

fn display_option<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map_or_else(String::new, ToString::to_string)
}

fn display_percent(value: &Option<f64>) -> String {
    value.map_or_else(String::new, |v| format!("{:.4}", v * 100.0))
}

fn display_seconds(value: &Option<f64>) -> String {
    value.map_or_else(String::new, |v| format!("{v:.2}"))
}

impl InstanceRow {
    /// Row for an instance the engine returned on, with or without a solution.
    pub fn from_summary(
        batch: &str,
        instance: &str,
        summary: &Summary,
        coefficient_sum: f64,
    ) -> Self {
        if summary.has_solution() {
            Self::solved(batch, instance, summary, coefficient_sum)
        } else {
            Self::no_solution(batch, instance, summary, coefficient_sum)
        }
    }

    fn solved(batch: &str, instance: &str, summary: &Summary, coefficient_sum: f64) -> Self {
        Self {
            batch: batch.to_string(),
            instance: instance.to_string(),
            status: Status::Solved,
            n: Some(summary.n),
            objective: Some(summary.objective),
            dual: Some(summary.dual),
            relative_gap: summary.relative_gap,
            runtime_secs: Some(summary.runtime.as_secs_f64()),
            chosen: Some(summary.chosen.len()),
            coverage_pct: Some(summary.coverage_pct),
            coefficient_sum: Some(coefficient_sum),
        }
    }

    fn no_solution(batch: &str, instance: &str, summary: &Summary, coefficient_sum: f64) -> Self {
        Self {
            status: Status::NoSolution,
            objective: None,
            relative_gap: None,
            chosen: None,
            coverage_pct: None,
            ..Self::solved(batch, instance, summary, coefficient_sum)
        }
    }

    pub fn failed(batch: &str, instance: &str, kind: &str) -> Self {
        Self {
            batch: batch.to_string(),
            instance: instance.to_string(),
            status: Status::Failed(kind.to_string()),
            n: None,
            objective: None,
            dual: None,
            relative_gap: None,
            runtime_secs: None,
            chosen: None,
            coverage_pct: None,
            coefficient_sum: None,
        }
    }

    pub fn is_solved(&self) -> bool {
        self.status == Status::Solved
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, Status::Failed(_))
    }
}

pub fn render_table(rows: &[InstanceRow]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    table.to_string()
}

/// Writes `rows` as CSV with a header line. Missing values become empty fields.
///
/// # Arguments
///
/// * `rows` - Rows in output order
/// * `writer` - Destination, flushed before returning
pub fn render_csv<W: io::Write>(rows: &[InstanceRow], writer: W) -> csv::Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for row in rows {
        csv.serialize(row)?;
    }
    csv.flush()?;
    Ok(())
}
