//! Batch experiments.
//!
//! A run walks a list of batches. Each batch is a directory of instance files which are
//! read, linearized and solved one by one; every instance gets a block in the batch's
//! summary log and a solver trace under the batch's trace directory.
//!
//! Per-instance failures are logged and the batch moves on. A missing instance directory
//! skips the whole batch. Only failures to create or write the logs themselves abort the
//! run.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::instance::{ReadError, read_instance};
use crate::model::{ValidationError, build_program};
use crate::report::{InstanceRow, Summary, render_csv, render_table, summarize};
use crate::solver::{MipEngine, SolveOptions, SolverAdapter, SolverFailure};

pub mod log;

pub use log::BatchLog;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Directory name under the instance and trace roots.
    pub name: String,
    pub summary_log: PathBuf,
}

impl BatchConfig {
    pub fn new(name: &str, summary_log: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            summary_log: summary_log.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub batches: Vec<BatchConfig>,
    pub instance_root: PathBuf,
    pub solver_log_root: PathBuf,
    pub time_limit_secs: u64,
    /// Only files with this extension are treated as instances.
    pub extension: String,
    /// Write `results.csv` next to the solver traces of each batch.
    pub results_csv: bool,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            batches: (1..=3)
                .map(|k| BatchConfig::new(&format!("gen{k}"), format!("summary_results{k}.log")))
                .collect(),
            instance_root: PathBuf::from("data/instances"),
            solver_log_root: PathBuf::from("solver_logs"),
            time_limit_secs: 600,
            extension: String::from("txt"),
            results_csv: true,
        }
    }
}

impl ExperimentConfig {
    pub fn time_limit(&self) -> Duration {
        Duration::from_secs(self.time_limit_secs)
    }

    pub fn instance_dir(&self, batch: &BatchConfig) -> PathBuf {
        self.instance_root.join(&batch.name)
    }

    pub fn trace_dir(&self, batch: &BatchConfig) -> PathBuf {
        self.solver_log_root.join(&batch.name)
    }
}

/// Failure confined to a single instance.
#[derive(Debug, Error)]
pub enum InstanceError {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error("invalid instance")]
    Validation(#[from] ValidationError),
    #[error("solve failed")]
    Solver(#[from] SolverFailure),
}

impl InstanceError {
    pub fn kind(&self) -> &'static str {
        match self {
            InstanceError::Read(ReadError::Io { .. }) => "io",
            InstanceError::Read(ReadError::Format { .. }) => "format",
            InstanceError::Validation(_) => "validation",
            InstanceError::Solver(_) => "solver",
        }
    }
}

/// Failure confined to a single batch.
#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("instance directory {} not found", .0.display())]
    MissingInstanceDir(PathBuf),
    #[error("cannot list {}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub struct SolvedInstance {
    pub summary: Summary,
    pub coefficient_sum: f64,
}

/// Reads, validates, linearizes and solves one instance file.
///
/// # Arguments
///
/// * `path` - Instance file in the text format
/// * `engine` - Engine used for the solve
/// * `options` - Time limit and trace destination
///
/// # Returns
///
/// The summary of the solve, which may carry no solution when the engine hit its time
/// limit first, or the error that stopped this instance.
pub fn process_instance<E: MipEngine + ?Sized>(
    path: &Path,
    engine: &E,
    options: SolveOptions,
) -> Result<SolvedInstance, InstanceError> {
    let instance = read_instance(path)?;
    let program = build_program(&instance)?;
    tracing::debug!(
        variables = program.variable_count(),
        constraints = program.constraints().len(),
        "built program for {}",
        path.display()
    );
    let record = SolverAdapter::new(engine, options).solve(&program)?;
    Ok(SolvedInstance {
        summary: summarize(&record, &instance),
        coefficient_sum: instance.coefficient_sum(),
    })
}

/// Instance files of a directory, sorted by name.
fn list_instances(dir: &Path, extension: &str) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[derive(Debug)]
pub enum BatchOutcome {
    Completed(Vec<InstanceRow>),
    /// Wraps an [`EnvironmentError`].
    Skipped(anyhow::Error),
}

#[derive(Debug)]
pub struct BatchReport {
    pub name: String,
    pub outcome: BatchOutcome,
}

impl BatchReport {
    pub fn rows(&self) -> &[InstanceRow] {
        match &self.outcome {
            BatchOutcome::Completed(rows) => rows,
            BatchOutcome::Skipped(_) => &[],
        }
    }

    pub fn solved(&self) -> usize {
        self.rows().iter().filter(|row| row.is_solved()).count()
    }

    /// Instances the engine returned on without a feasible solution.
    pub fn unsolved(&self) -> usize {
        self.rows()
            .iter()
            .filter(|row| !row.is_solved() && !row.is_failed())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.rows().iter().filter(|row| row.is_failed()).count()
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, BatchOutcome::Skipped(_))
    }

    pub fn skip_reason(&self) -> Option<&EnvironmentError> {
        match &self.outcome {
            BatchOutcome::Skipped(reason) => reason.downcast_ref(),
            BatchOutcome::Completed(_) => None,
        }
    }
}

fn skip_batch<W: Write>(
    batch: &BatchConfig,
    log: &mut BatchLog<W>,
    reason: EnvironmentError,
) -> Result<BatchReport> {
    let reason = anyhow::Error::new(reason);
    log.warn(format!("Skipping batch {}: {reason:#}", batch.name))?;
    Ok(BatchReport {
        name: batch.name.clone(),
        outcome: BatchOutcome::Skipped(reason),
    })
}

/// Solves every instance of one batch, logging to `log`.
///
/// # Arguments
///
/// * `batch` - The batch to run
/// * `config` - Directory roots, time limit and file filter
/// * `engine` - Engine used for every instance
/// * `log` - The batch's summary log
///
/// # Returns
///
/// A [`BatchReport`] with one row per instance file, or a skipped report when the
/// instance directory is unusable. Errors returned here are fatal for the whole run.
pub fn run_batch<E, W>(
    batch: &BatchConfig,
    config: &ExperimentConfig,
    engine: &E,
    log: &mut BatchLog<W>,
) -> Result<BatchReport>
where
    E: MipEngine + ?Sized,
    W: Write,
{
    log.info(format!(
        "--- Starting new batch for generation: {} (engine: {}) ---",
        batch.name,
        engine.name()
    ))?;

    let instance_dir = config.instance_dir(batch);
    let trace_dir = config.trace_dir(batch);
    fs::create_dir_all(&trace_dir)
        .with_context(|| format!("cannot create trace directory {}", trace_dir.display()))?;

    if !instance_dir.is_dir() {
        return skip_batch(batch, log, EnvironmentError::MissingInstanceDir(instance_dir));
    }
    let files = match list_instances(&instance_dir, &config.extension) {
        Ok(files) => files,
        Err(source) => {
            let reason = EnvironmentError::Unreadable {
                path: instance_dir,
                source,
            };
            return skip_batch(batch, log, reason);
        }
    };

    let mut rows = Vec::with_capacity(files.len());
    for path in files {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        log.info(format!("Processing instance: {name}"))?;

        let options = SolveOptions {
            time_limit: config.time_limit(),
            trace: Some(trace_dir.join(format!("{name}.log"))),
        };
        match process_instance(&path, engine, options) {
            Ok(solved) => {
                for line in solved.summary.log_lines(&name) {
                    log.info(line)?;
                }
                if !solved.summary.has_solution() {
                    log.warn(format!(
                        "No feasible solution for instance {name} in batch {} within {}s",
                        batch.name, config.time_limit_secs
                    ))?;
                }
                rows.push(InstanceRow::from_summary(
                    &batch.name,
                    &name,
                    &solved.summary,
                    solved.coefficient_sum,
                ));
            }
            Err(err) => {
                rows.push(InstanceRow::failed(&batch.name, &name, err.kind()));
                let err = anyhow::Error::new(err);
                log.error(format!(
                    "Failed to process instance {name} in batch {}. Error: {err:#}",
                    batch.name
                ))?;
            }
        }
    }

    if config.results_csv && !rows.is_empty() {
        let path = trace_dir.join("results.csv");
        let file = File::create(&path)
            .with_context(|| format!("cannot create {}", path.display()))?;
        render_csv(&rows, BufWriter::new(file))
            .with_context(|| format!("cannot write {}", path.display()))?;
    }

    let report = BatchReport {
        name: batch.name.clone(),
        outcome: BatchOutcome::Completed(rows),
    };
    log.info(format!(
        "--- Finished batch {}: {} solved, {} without solution, {} failed ---",
        batch.name,
        report.solved(),
        report.unsolved(),
        report.failed()
    ))?;
    Ok(report)
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub batches: Vec<BatchReport>,
}

impl RunSummary {
    pub fn rows(&self) -> impl Iterator<Item = &InstanceRow> {
        self.batches.iter().flat_map(BatchReport::rows)
    }

    pub fn solved(&self) -> usize {
        self.batches.iter().map(BatchReport::solved).sum()
    }

    pub fn unsolved(&self) -> usize {
        self.batches.iter().map(BatchReport::unsolved).sum()
    }

    pub fn failed(&self) -> usize {
        self.batches.iter().map(BatchReport::failed).sum()
    }

    pub fn skipped(&self) -> usize {
        self.batches.iter().filter(|b| b.is_skipped()).count()
    }

    pub fn table(&self) -> String {
        render_table(&self.rows().cloned().collect::<Vec<_>>())
    }
}

/// Runs every configured batch in order, each with its own summary log.
pub fn run_experiments<E: MipEngine + ?Sized>(
    config: &ExperimentConfig,
    engine: &E,
) -> Result<RunSummary> {
    fs::create_dir_all(&config.solver_log_root).with_context(|| {
        format!(
            "cannot create solver log root {}",
            config.solver_log_root.display()
        )
    })?;

    let mut summary = RunSummary::default();
    for batch in &config.batches {
        let mut log = BatchLog::open(&batch.name, &batch.summary_log)
            .with_context(|| format!("cannot open summary log {}", batch.summary_log.display()))?;
        let report = run_batch(batch, config, engine, &mut log)
            .with_context(|| format!("batch {} aborted", batch.name))?;
        summary.batches.push(report);
    }

    tracing::info!(
        generations = summary.batches.len(),
        solved = summary.solved(),
        unsolved = summary.unsolved(),
        failed = summary.failed(),
        skipped = summary.skipped(),
        "Finished processing all generations."
    );
    Ok(summary)
}
