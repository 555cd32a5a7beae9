// Generates a few small instances, linearizes them and solves them by enumeration

use std::time::Duration;

use maxscqbf::instance::{EncodeOptions, GeneratorConfig, encode, generate};
use maxscqbf::model::build_program;
use maxscqbf::report::summarize;
use maxscqbf::solver::{ExhaustiveEngine, SolveOptions, SolverAdapter};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn main() {
    let mut rng = StdRng::seed_from_u64(42);
    let engine = ExhaustiveEngine::default();
    let options = SolveOptions {
        time_limit: Duration::from_secs(10),
        trace: None,
    };

    let configs = [
        ("symmetric", GeneratorConfig::symmetric()),
        ("sign-biased (p = 0.8)", GeneratorConfig::sign_biased(0.8)),
    ];

    for (label, config) in configs {
        let config = GeneratorConfig {
            size_choices: vec![4, 6, 8],
            ..config
        };
        let instance = generate(&config, &mut rng).unwrap();

        println!("=== {} instance, n = {} ===", label, instance.n());
        print!("{}", encode(&instance, &EncodeOptions::default()));

        let program = build_program(&instance).unwrap();
        println!(
            "\n{} variables, {} constraints ({} cover)",
            program.variable_count(),
            program.constraints().len(),
            program.cover_constraint_count()
        );

        let record = SolverAdapter::new(&engine, options.clone())
            .solve(&program)
            .unwrap();
        println!("{}", summarize(&record, &instance));
    }
}
