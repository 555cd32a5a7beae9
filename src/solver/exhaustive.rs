//! Brute-force engine for small programs.
//!
//! Enumerates every selection `x in {0,1}^n`, derives the product variables and keeps the
//! best feasible point. Useful as a reference for the CBC engine and for running the
//! pipeline without a MIP library.

use std::time::Instant;

use super::{EngineReport, FEASIBILITY_TOLERANCE, MipEngine, SolveOptions, SolverFailure};
use crate::model::{Program, Sense};

#[derive(Clone, Copy, Debug)]
pub struct ExhaustiveEngine {
    /// Largest number of selection variables accepted.
    pub max_selection: usize,
}

impl Default for ExhaustiveEngine {
    fn default() -> Self {
        Self { max_selection: 20 }
    }
}

impl MipEngine for ExhaustiveEngine {
    fn name(&self) -> &str {
        "exhaustive"
    }

    fn solve(
        &self,
        program: &Program,
        options: &SolveOptions,
    ) -> Result<EngineReport, SolverFailure> {
        let n = program.selection_count();
        if n > self.max_selection.min(63) {
            return Err(SolverFailure::Unsupported {
                engine: self.name().to_string(),
                reason: format!("{n} selection variables, at most {} allowed", self.max_selection),
            });
        }

        let start = Instant::now();
        let mut best: Option<(f64, Vec<f64>)> = None;
        let mut solution_count = 0;
        let mut finished = true;

        for mask in 0..(1u64 << n) {
            if start.elapsed() >= options.time_limit {
                finished = false;
                break;
            }
            let selection: Vec<bool> = (0..n).map(|bit| (mask >> bit) & 1 == 1).collect();
            let values = program.complete_assignment(&selection);
            if !program.is_feasible(&values, FEASIBILITY_TOLERANCE) {
                continue;
            }
            solution_count += 1;

            let value = program.objective_value(&values);
            let improves = match (&best, program.sense()) {
                (None, _) => true,
                (Some((incumbent, _)), Sense::Maximize) => value > *incumbent,
                (Some((incumbent, _)), Sense::Minimize) => value < *incumbent,
            };
            if improves {
                best = Some((value, values));
            }
        }
        let runtime = start.elapsed();

        let status = if finished { "optimal" } else { "time limit" };
        match best {
            Some((value, values)) => Ok(EngineReport {
                solution_count,
                incumbent: Some(value),
                best_bound: if finished {
                    value
                } else {
                    program.objective_bound()
                },
                relative_gap: None,
                runtime,
                values,
                status: status.to_string(),
            }),
            None if finished => Err(SolverFailure::Infeasible {
                engine: self.name().to_string(),
            }),
            None => Ok(EngineReport {
                solution_count: 0,
                incumbent: None,
                best_bound: program.objective_bound(),
                relative_gap: None,
                runtime,
                values: vec![0.0; program.variable_count()],
                status: status.to_string(),
            }),
        }
    }
}
