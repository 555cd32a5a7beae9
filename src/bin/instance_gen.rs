//! Writes random MAX-SC-QBF instances as `instance{k}.txt` files.
//!
//! Instances are generated in parallel. Instance `k` uses its own RNG seeded with
//! `seed + k`, so a given seed always reproduces the same files.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use tracing_subscriber::EnvFilter;

use maxscqbf::instance::{EncodeOptions, GeneratorConfig, generate, write_instance};
use maxscqbf::utils::json::load_json;

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate random MAX-SC-QBF instances", long_about = None)]
struct Args {
    /// Number of instances
    #[arg(short, long)]
    count: usize,

    /// Output directory
    #[arg(short, long)]
    output: PathBuf,

    /// Probability of a positive coefficient; symmetric coefficients when omitted
    #[arg(short, long)]
    probability: Option<f64>,

    /// Comma separated choices for n
    #[arg(long, value_delimiter = ',')]
    sizes: Option<Vec<usize>>,

    /// Generator configuration as JSON, replaces --probability and --sizes
    #[arg(long)]
    config: Option<PathBuf>,

    /// Base seed; random when omitted
    #[arg(short, long)]
    seed: Option<u64>,

    /// Decimal digits written per coefficient
    #[arg(long, default_value_t = 2)]
    precision: usize,
}

fn enable_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

fn generator_config(args: &Args) -> Result<GeneratorConfig> {
    if let Some(path) = &args.config {
        return load_json(path);
    }
    let mut config = match args.probability {
        Some(p) => GeneratorConfig::sign_biased(p),
        None => GeneratorConfig::symmetric(),
    };
    if let Some(sizes) = &args.sizes {
        config.size_choices = sizes.clone();
    }
    Ok(config)
}

fn main() -> Result<()> {
    enable_tracing();
    let args = Args::parse();

    let config = generator_config(&args)?;
    let seed = args.seed.unwrap_or_else(rand::random);
    let options = EncodeOptions {
        precision: args.precision,
    };
    fs::create_dir_all(&args.output)
        .with_context(|| format!("cannot create {}", args.output.display()))?;

    (1..=args.count).into_par_iter().try_for_each(|k| -> Result<()> {
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(k as u64));
        let instance = generate(&config, &mut rng)?;
        let path = args.output.join(format!("instance{k}.txt"));
        write_instance(&path, &instance, &options)
            .with_context(|| format!("cannot write {}", path.display()))?;
        tracing::debug!(n = instance.n(), "wrote {}", path.display());
        Ok(())
    })?;

    tracing::info!(
        seed,
        "wrote {} instances to {}",
        args.count,
        args.output.display()
    );
    Ok(())
}
