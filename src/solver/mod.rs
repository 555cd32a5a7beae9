//! Solving linearized programs with an external mixed-integer engine.
//!
//! The engine is a black box behind [`MipEngine`]: it receives a [`Program`] and a time
//! budget and returns an [`EngineReport`]. [`SolverAdapter`] turns that report into a
//! [`ResultRecord`], cross-checking the incumbent against the program's own objective.
//!
//! Hitting the time limit is a normal outcome. A record without a primal value means the
//! engine found no feasible solution in time.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::model::Program;

pub mod cbc;
pub mod exhaustive;

pub use cbc::CbcEngine;
pub use exhaustive::ExhaustiveEngine;

/// Default wall-clock budget for one solve.
pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(600);

/// Tolerance used when checking engine assignments against the program.
pub const FEASIBILITY_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Error)]
pub enum SolverFailure {
    #[error("{engine}: program is infeasible")]
    Infeasible { engine: String },
    #[error("{engine}: program is unbounded")]
    Unbounded { engine: String },
    #[error("{engine}: abnormal termination: {reason}")]
    Aborted { engine: String, reason: String },
    #[error("{engine}: refused the program: {reason}")]
    Unsupported { engine: String, reason: String },
    #[error("{engine}: inconsistent report: {reason}")]
    Inconsistent { engine: String, reason: String },
    #[error("cannot write solver trace {}", path.display())]
    Trace {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Clone, Debug)]
pub struct SolveOptions {
    pub time_limit: Duration,
    /// File receiving a plain-text trace of the solve.
    pub trace: Option<PathBuf>,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            time_limit: DEFAULT_TIME_LIMIT,
            trace: None,
        }
    }
}

/// Raw outcome of an engine run.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineReport {
    /// Feasible solutions found. Zero means `incumbent` is meaningless.
    pub solution_count: usize,
    pub incumbent: Option<f64>,
    /// Best proven bound on the optimum.
    pub best_bound: f64,
    pub relative_gap: Option<f64>,
    pub runtime: Duration,
    /// One value per program variable.
    pub values: Vec<f64>,
    /// Short engine-specific status, used in traces.
    pub status: String,
}

pub trait MipEngine {
    fn name(&self) -> &str;

    fn solve(&self, program: &Program, options: &SolveOptions)
    -> Result<EngineReport, SolverFailure>;
}

/// Normalised result of one solve.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultRecord {
    /// Program objective re-evaluated on the returned assignment.
    pub objective: f64,
    /// Values of `x_1..x_n`.
    pub assignment: Vec<f64>,
    pub primal: Option<f64>,
    pub dual: f64,
    pub relative_gap: Option<f64>,
    pub absolute_gap: Option<f64>,
    pub runtime: Duration,
}

/// `|primal - dual| / |primal|`, with the denominator kept away from zero.
pub fn relative_gap(primal: f64, dual: f64) -> f64 {
    (primal - dual).abs() / primal.abs().max(1e-10)
}

pub struct SolverAdapter<'e, E: MipEngine + ?Sized> {
    engine: &'e E,
    options: SolveOptions,
}

impl<'e, E: MipEngine + ?Sized> SolverAdapter<'e, E> {
    pub fn new(engine: &'e E, options: SolveOptions) -> Self {
        Self { engine, options }
    }

    pub fn options(&self) -> &SolveOptions {
        &self.options
    }

    pub fn solve(&self, program: &Program) -> Result<ResultRecord, SolverFailure> {
        let report = self.engine.solve(program, &self.options)?;
        if report.values.len() != program.variable_count() {
            return Err(SolverFailure::Inconsistent {
                engine: self.engine.name().to_string(),
                reason: format!(
                    "{} values for {} variables",
                    report.values.len(),
                    program.variable_count()
                ),
            });
        }

        let primal = match (report.solution_count, report.incumbent) {
            (0, _) => None,
            (_, Some(incumbent)) => Some(incumbent),
            (count, None) => {
                return Err(SolverFailure::Inconsistent {
                    engine: self.engine.name().to_string(),
                    reason: format!("{count} solutions reported without an incumbent"),
                });
            }
        };

        let objective = program.objective_value(&report.values);
        if let Some(primal) = primal
            && (objective - primal).abs() > FEASIBILITY_TOLERANCE * primal.abs().max(1.0)
        {
            tracing::warn!(
                engine = self.engine.name(),
                objective,
                primal,
                "incumbent disagrees with the program objective"
            );
        }

        let record = ResultRecord {
            objective,
            assignment: program.selection_values(&report.values),
            primal,
            dual: report.best_bound,
            relative_gap: primal
                .map(|p| report.relative_gap.unwrap_or_else(|| relative_gap(p, report.best_bound))),
            absolute_gap: primal.map(|p| (p - report.best_bound).abs()),
            runtime: report.runtime,
        };

        if let Some(path) = &self.options.trace {
            self.write_trace(path, program, &report, &record)
                .map_err(|source| SolverFailure::Trace {
                    path: path.clone(),
                    source,
                })?;
        }

        Ok(record)
    }

    fn write_trace(
        &self,
        path: &Path,
        program: &Program,
        report: &EngineReport,
        record: &ResultRecord,
    ) -> io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "engine: {}", self.engine.name())?;
        writeln!(out, "time limit (s): {}", self.options.time_limit.as_secs_f64())?;
        writeln!(
            out,
            "variables: {} ({} selection)",
            program.variable_count(),
            program.selection_count()
        )?;
        writeln!(
            out,
            "constraints: {} ({} cover)",
            program.constraints().len(),
            program.cover_constraint_count()
        )?;
        writeln!(out, "status: {}", report.status)?;
        writeln!(out, "solutions: {}", report.solution_count)?;
        match record.primal {
            Some(primal) => writeln!(out, "incumbent: {primal}")?,
            None => writeln!(out, "incumbent: none")?,
        }
        writeln!(out, "best bound: {}", record.dual)?;
        if let (Some(rel), Some(abs)) = (record.relative_gap, record.absolute_gap) {
            writeln!(out, "gap: relative={rel} absolute={abs}")?;
        }
        writeln!(out, "runtime (s): {:.3}", record.runtime.as_secs_f64())?;
        writeln!(out, "nonzero variables:")?;
        for (var, value) in program.variables().iter().zip(&report.values) {
            if value.abs() > FEASIBILITY_TOLERANCE {
                writeln!(out, "  {var} = {value}")?;
            }
        }
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use nalgebra::DMatrix;

    use super::*;
    use crate::instance::Instance;
    use crate::model::build_program;

    /// Replays a fixed report.
    struct Scripted(Result<EngineReport, String>);

    impl MipEngine for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn solve(&self, _: &Program, _: &SolveOptions) -> Result<EngineReport, SolverFailure> {
            self.0.clone().map_err(|reason| SolverFailure::Aborted {
                engine: self.name().to_string(),
                reason,
            })
        }
    }

    fn scenario_program() -> Program {
        build_program(&Instance::new(
            2,
            vec![BTreeSet::from([1]), BTreeSet::from([2])],
            DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 0.0, 3.0]),
        ))
        .unwrap()
    }

    fn report(solution_count: usize, incumbent: Option<f64>, values: Vec<f64>) -> EngineReport {
        EngineReport {
            solution_count,
            incumbent,
            best_bound: 8.0,
            relative_gap: None,
            runtime: Duration::from_millis(5),
            values,
            status: String::from("scripted"),
        }
    }

    #[test]
    fn test_no_solutions_means_no_primal_and_no_gaps() {
        let program = scenario_program();
        let engine = Scripted(Ok(report(0, Some(123.0), vec![0.0; 5])));
        let record = SolverAdapter::new(&engine, SolveOptions::default())
            .solve(&program)
            .unwrap();
        assert_eq!(record.primal, None);
        assert_eq!(record.absolute_gap, None);
        assert_eq!(record.relative_gap, None);
        assert_eq!(record.dual, 8.0);
    }

    #[test]
    fn test_gaps_are_computed_from_incumbent_and_bound() {
        let program = scenario_program();
        let values = program.complete_assignment(&[true, true]);
        let engine = Scripted(Ok(report(1, Some(6.0), values)));
        let record = SolverAdapter::new(&engine, SolveOptions::default())
            .solve(&program)
            .unwrap();
        assert_eq!(record.objective, 6.0);
        assert_eq!(record.primal, Some(6.0));
        assert_eq!(record.assignment, vec![1.0, 1.0]);
        assert_eq!(record.absolute_gap, Some(2.0));
        assert!((record.relative_gap.unwrap() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_engine_failures_propagate() {
        let engine = Scripted(Err(String::from("license expired")));
        let err = SolverAdapter::new(&engine, SolveOptions::default())
            .solve(&scenario_program())
            .unwrap_err();
        assert!(matches!(err, SolverFailure::Aborted { .. }));
        assert!(err.to_string().contains("license expired"));
    }

    #[test]
    fn test_wrong_value_count_is_inconsistent() {
        let engine = Scripted(Ok(report(1, Some(6.0), vec![1.0])));
        let err = SolverAdapter::new(&engine, SolveOptions::default())
            .solve(&scenario_program())
            .unwrap_err();
        assert!(matches!(err, SolverFailure::Inconsistent { .. }));
    }

    #[test]
    fn test_solutions_without_incumbent_are_inconsistent() {
        let engine = Scripted(Ok(report(2, None, vec![0.0; 5])));
        let err = SolverAdapter::new(&engine, SolveOptions::default())
            .solve(&scenario_program())
            .unwrap_err();
        assert!(matches!(err, SolverFailure::Inconsistent { .. }));
    }

    #[test]
    fn test_writes_trace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("instance1.txt.log");
        let program = scenario_program();
        let engine = Scripted(Ok(report(1, Some(6.0), program.complete_assignment(&[true, true]))));
        let options = SolveOptions {
            trace: Some(path.clone()),
            ..SolveOptions::default()
        };
        SolverAdapter::new(&engine, options).solve(&program).unwrap();

        let trace = std::fs::read_to_string(path).unwrap();
        assert!(trace.contains("engine: scripted"));
        assert!(trace.contains("constraints: 11 (2 cover)"));
        assert!(trace.contains("y_1_2 = 1"));
    }

    #[test]
    fn test_relative_gap_guards_zero() {
        assert_eq!(relative_gap(4.0, 5.0), 0.25);
        assert!(relative_gap(0.0, 1.0).is_finite());
    }
}
