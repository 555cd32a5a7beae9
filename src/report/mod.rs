//! Summaries of solved instances.
//!
//! [`summarize`] derives the chosen sets and the coverage from a [`ResultRecord`]; the
//! [`Summary`] then renders as log lines (batch logs) or as a coloured block (console).

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use colored::Colorize;
use itertools::Itertools;

use crate::instance::{Element, Instance};
use crate::solver::ResultRecord;

pub mod table;

pub use table::{InstanceRow, Status, render_csv, render_table};

/// Assignment values at or above this are read as 1.
pub const SELECTION_THRESHOLD: f64 = 0.5;

#[derive(Clone, Debug, PartialEq)]
pub struct Summary {
    pub n: usize,
    pub objective: f64,
    pub primal: Option<f64>,
    pub dual: f64,
    pub relative_gap: Option<f64>,
    pub absolute_gap: Option<f64>,
    pub runtime: Duration,
    /// 1-based indices of the selected sets.
    pub chosen: Vec<usize>,
    pub covered: usize,
    pub universe: usize,
    pub coverage_pct: f64,
    /// Rounded `x_1..x_n`.
    pub assignment: Vec<u8>,
}

/// Derives the chosen sets and their coverage from a solver result.
///
/// # Arguments
///
/// * `record` - Result of one solve of `instance`
/// * `instance` - The instance the program was built from
///
/// # Returns
///
/// A [`Summary`]. When the engine found no feasible solution the engine's values are not
/// a selection, so the assignment and the chosen sets are left empty.
pub fn summarize(record: &ResultRecord, instance: &Instance) -> Summary {
    let assignment: Vec<u8> = if record.primal.is_some() {
        record
            .assignment
            .iter()
            .map(|&v| u8::from(v >= SELECTION_THRESHOLD))
            .collect()
    } else {
        Vec::new()
    };
    let chosen: Vec<usize> = assignment
        .iter()
        .enumerate()
        .filter(|&(_, &bit)| bit == 1)
        .map(|(i, _)| i + 1)
        .collect();

    let universe = instance.universe();
    let covered: BTreeSet<Element> = chosen
        .iter()
        .filter(|&&i| i <= instance.subsets().len())
        .flat_map(|&i| instance.subset(i).iter().copied())
        .collect();
    let coverage_pct = if universe.is_empty() {
        0.0
    } else {
        covered.len() as f64 / universe.len() as f64 * 100.0
    };

    Summary {
        n: instance.n(),
        objective: record.objective,
        primal: record.primal,
        dual: record.dual,
        relative_gap: record.relative_gap,
        absolute_gap: record.absolute_gap,
        runtime: record.runtime,
        chosen,
        covered: covered.len(),
        universe: universe.len(),
        coverage_pct,
        assignment,
    }
}

fn format_gap(gap: Option<f64>) -> String {
    gap.map_or_else(|| String::from("n/a"), |g| g.to_string())
}

impl Summary {
    fn chosen_list(&self) -> String {
        format!("[{}]", self.chosen.iter().join(", "))
    }

    /// Whether the engine returned a feasible selection.
    pub fn has_solution(&self) -> bool {
        self.primal.is_some()
    }

    /// Lines written to a batch summary log for one processed instance.
    pub fn log_lines(&self, instance_name: &str) -> Vec<String> {
        let mut lines = vec![format!("--- Results for instance: {instance_name} ---")];
        if !self.has_solution() {
            lines.push(format!(
                "- No feasible solution within the time limit (best bound {})",
                self.dual
            ));
            lines.push(format!(
                "- Solver Runtime (sec): {:.2}",
                self.runtime.as_secs_f64()
            ));
            lines.push("-".repeat(50));
            return lines;
        }

        lines.push(format!("- Objective value: {}", self.objective));
        if let Some(rel) = self.relative_gap {
            lines.push(format!(
                "- Gap: relative={:.4}%, absolute={}",
                rel * 100.0,
                format_gap(self.absolute_gap)
            ));
        }
        lines.push(format!(
            "- Solver Runtime (sec): {:.2}",
            self.runtime.as_secs_f64()
        ));
        lines.push(format!(
            "- Selected sets ({}/{}): {}",
            self.chosen.len(),
            self.n,
            self.chosen_list()
        ));
        lines.push(format!(
            "- Coverage: {}/{} elements ({:.1}%)",
            self.covered, self.universe, self.coverage_pct
        ));
        lines.push(format!(
            "- Variables: {}",
            self.assignment
                .iter()
                .enumerate()
                .map(|(i, bit)| format!("x[{}]={bit}", i + 1))
                .join(" ")
        ));
        lines.push("-".repeat(50));
        lines
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "Solution summary".bold())?;
        if !self.has_solution() {
            writeln!(
                f,
                "- {} (best bound {})",
                "No feasible solution within the time limit".yellow(),
                self.dual
            )?;
            return writeln!(f, "- Solver Runtime: {:.2}", self.runtime.as_secs_f64());
        }
        writeln!(f, "- Objective value: {}", self.objective.to_string().green())?;
        if let Some(rel) = self.relative_gap {
            writeln!(
                f,
                "- Gap: relative={:.2}%, absolute={}",
                rel * 100.0,
                format_gap(self.absolute_gap)
            )?;
        }
        writeln!(f, "- Solver Runtime: {:.2}", self.runtime.as_secs_f64())?;
        writeln!(
            f,
            "- Selected sets ({}/{}): {}",
            self.chosen.len(),
            self.n,
            self.chosen_list()
        )?;
        writeln!(
            f,
            "- Coverage: {}/{} elements ({:.1}%)",
            self.covered, self.universe, self.coverage_pct
        )?;
        writeln!(f, "- Variables:")?;
        for (i, bit) in self.assignment.iter().enumerate() {
            writeln!(f, "  x[{}] = {bit}", i + 1)?;
        }
        Ok(())
    }
}
