use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use maxscqbf::experiment::{ExperimentConfig, run_experiments};
use maxscqbf::instance::read_instance;
use maxscqbf::model::{build_program, build_unconstrained};
use maxscqbf::report::summarize;
use maxscqbf::solver::{CbcEngine, ExhaustiveEngine, MipEngine, SolveOptions, SolverAdapter};
use maxscqbf::utils::json::{load_json, save_json};

#[derive(Parser, Debug)]
#[command(author, version, about = "Solve MAX-SC-QBF instances and run batch experiments", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Solve a single instance file and print its summary
    Solve {
        instance: PathBuf,

        /// Time limit in seconds
        #[arg(short, long)]
        time_limit: Option<u64>,

        #[arg(short, long, value_enum, default_value_t = Engine::Cbc)]
        engine: Engine,

        /// Write a solver trace to this file
        #[arg(long)]
        trace: Option<PathBuf>,

        /// Drop the coverage constraints
        #[arg(long)]
        unconstrained: bool,
    },
    /// Run every batch of an experiment configuration
    Run {
        /// JSON configuration; the defaults are used when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Time limit in seconds, overrides the configuration
        #[arg(short, long)]
        time_limit: Option<u64>,

        #[arg(short, long, value_enum, default_value_t = Engine::Cbc)]
        engine: Engine,
    },
    /// Write the default experiment configuration as JSON
    InitConfig { output: PathBuf },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Engine {
    Cbc,
    Exhaustive,
}

impl Engine {
    fn build(self) -> Box<dyn MipEngine> {
        match self {
            Engine::Cbc => Box::new(CbcEngine),
            Engine::Exhaustive => Box::new(ExhaustiveEngine::default()),
        }
    }
}

fn enable_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

fn solve(
    path: PathBuf,
    time_limit: Option<u64>,
    engine: Engine,
    trace: Option<PathBuf>,
    unconstrained: bool,
) -> Result<()> {
    let instance = read_instance(&path)?;
    let program = if unconstrained {
        build_unconstrained(&instance)
    } else {
        build_program(&instance)
    }
    .with_context(|| format!("cannot model {}", path.display()))?;
    tracing::info!(
        variables = program.variable_count(),
        constraints = program.constraints().len(),
        "solving {}",
        path.display()
    );

    let mut options = SolveOptions {
        trace,
        ..SolveOptions::default()
    };
    if let Some(secs) = time_limit {
        options.time_limit = Duration::from_secs(secs);
    }
    let engine = engine.build();
    let record = SolverAdapter::new(engine.as_ref(), options).solve(&program)?;
    println!("{}", summarize(&record, &instance));
    Ok(())
}

fn run(config: Option<PathBuf>, time_limit: Option<u64>, engine: Engine) -> Result<()> {
    let mut config: ExperimentConfig = match config {
        Some(path) => load_json(&path)?,
        None => ExperimentConfig::default(),
    };
    if let Some(secs) = time_limit {
        config.time_limit_secs = secs;
    }

    let engine = engine.build();
    let summary = run_experiments(&config, engine.as_ref())?;

    let table = summary.table();
    if !table.is_empty() {
        println!("{table}");
    }
    println!(
        "{} ({} generations, {} solved, {} without solution, {} failed, {} skipped)",
        "Finished processing all generations.".bold(),
        summary.batches.len(),
        summary.solved(),
        summary.unsolved(),
        summary.failed(),
        summary.skipped()
    );
    Ok(())
}

fn main() -> Result<()> {
    enable_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Solve {
            instance,
            time_limit,
            engine,
            trace,
            unconstrained,
        } => solve(instance, time_limit, engine, trace, unconstrained),
        Command::Run {
            config,
            time_limit,
            engine,
        } => run(config, time_limit, engine),
        Command::InitConfig { output } => {
            save_json(&ExperimentConfig::default(), &output)?;
            println!("Wrote default configuration to {}", output.display());
            Ok(())
        }
    }
}
