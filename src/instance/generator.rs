//! Random MAX-SC-QBF instances.
//!
//! Generated instances always have the universe `{1..n}`: after the random subsets are
//! drawn, every element that no subset contains is added to a random subset.

use std::collections::BTreeSet;

use nalgebra::DMatrix;
use rand::Rng;
use rand::distributions::{Bernoulli, Distribution};
use rand::seq::{SliceRandom, index};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Instance;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeneratorError {
    #[error("positive coefficient probability must lie in [0, 1], got {0}")]
    InvalidProbability(f64),
    #[error("coefficient magnitude must be finite and span a finite range, got {0}")]
    InvalidMagnitude(f64),
    #[error("size choices must be non-empty and positive, got {0:?}")]
    InvalidSizes(Vec<usize>),
}

/// How the upper-triangle coefficients are drawn. Every value is rounded to two decimals.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum CoefficientDistribution {
    /// Uniform on `[-magnitude, magnitude]`.
    Symmetric { magnitude: f64 },
    /// Uniform on `[0, 10]` with probability `positive_probability`, uniform on `[-10, 0]`
    /// otherwise.
    SignBiased { positive_probability: f64 },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Candidate values for `n`, picked uniformly.
    pub size_choices: Vec<usize>,
    pub coefficients: CoefficientDistribution,
}

pub const DEFAULT_SIZE_CHOICES: [usize; 5] = [25, 50, 100, 200, 400];

const COEFFICIENT_BOUND: f64 = 10.0;

impl GeneratorConfig {
    pub fn symmetric() -> Self {
        Self {
            size_choices: DEFAULT_SIZE_CHOICES.to_vec(),
            coefficients: CoefficientDistribution::Symmetric {
                magnitude: COEFFICIENT_BOUND,
            },
        }
    }

    pub fn sign_biased(positive_probability: f64) -> Self {
        Self {
            size_choices: DEFAULT_SIZE_CHOICES.to_vec(),
            coefficients: CoefficientDistribution::SignBiased {
                positive_probability,
            },
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self::symmetric()
    }
}

fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Draws `n` subsets of `{1..n}` whose union is exactly `{1..n}`.
pub fn generate_subsets(n: usize, rng: &mut impl Rng) -> Vec<BTreeSet<usize>> {
    let mut subsets: Vec<BTreeSet<usize>> = (0..n)
        .map(|_| {
            let size = rng.gen_range(0..=n);
            index::sample(rng, n, size)
                .into_iter()
                .map(|i| i + 1)
                .collect()
        })
        .collect();

    let covered: BTreeSet<usize> = subsets.iter().flatten().copied().collect();
    for element in (1..=n).filter(|e| !covered.contains(e)) {
        let target = rng.gen_range(0..n);
        subsets[target].insert(element);
    }

    subsets
}

enum Sampler {
    Symmetric { magnitude: f64 },
    SignBiased { positive: Bernoulli },
}

impl Sampler {
    fn new(distribution: CoefficientDistribution) -> Result<Self, GeneratorError> {
        match distribution {
            // The sampled range is twice as wide as the magnitude.
            CoefficientDistribution::Symmetric { magnitude } if !(2.0 * magnitude).is_finite() => {
                Err(GeneratorError::InvalidMagnitude(magnitude))
            }
            CoefficientDistribution::Symmetric { magnitude } => Ok(Self::Symmetric {
                magnitude: magnitude.abs(),
            }),
            CoefficientDistribution::SignBiased {
                positive_probability,
            } => Bernoulli::new(positive_probability)
                .map(|positive| Self::SignBiased { positive })
                .map_err(|_| GeneratorError::InvalidProbability(positive_probability)),
        }
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let value = match self {
            Self::Symmetric { magnitude } => rng.gen_range(-magnitude..=*magnitude),
            Self::SignBiased { positive } => {
                if positive.sample(rng) {
                    rng.gen_range(0.0..=COEFFICIENT_BOUND)
                } else {
                    rng.gen_range(-COEFFICIENT_BOUND..=0.0)
                }
            }
        };
        round_to_cents(value)
    }
}

/// Generates a random instance.
pub fn generate(config: &GeneratorConfig, rng: &mut impl Rng) -> Result<Instance, GeneratorError> {
    if config.size_choices.contains(&0) {
        return Err(GeneratorError::InvalidSizes(config.size_choices.clone()));
    }
    let sampler = Sampler::new(config.coefficients)?;
    let n = *config
        .size_choices
        .choose(rng)
        .ok_or_else(|| GeneratorError::InvalidSizes(config.size_choices.clone()))?;

    let subsets = generate_subsets(n, rng);

    let mut coefficients = DMatrix::zeros(n, n);
    for row in 0..n {
        for col in row..n {
            coefficients[(row, col)] = sampler.draw(rng);
        }
    }

    Ok(Instance::new(n, subsets, coefficients))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::{SeedableRng, rngs::StdRng};

    fn small(distribution: CoefficientDistribution) -> GeneratorConfig {
        GeneratorConfig {
            size_choices: vec![1, 5, 20],
            coefficients: distribution,
        }
    }

    #[test]
    fn default_sizes() {
        let mut rng = StdRng::seed_from_u64(1);
        let instance = generate(&GeneratorConfig::symmetric(), &mut rng).unwrap();
        assert!(DEFAULT_SIZE_CHOICES.contains(&instance.n()));
        assert_eq!(instance.subsets().len(), instance.n());
    }

    #[test]
    fn rejects_invalid_probability() {
        let mut rng = StdRng::seed_from_u64(1);
        for p in [-0.1, 1.5, f64::NAN] {
            let err = generate(&GeneratorConfig::sign_biased(p), &mut rng).unwrap_err();
            assert!(matches!(err, GeneratorError::InvalidProbability(_)));
        }
    }

    #[test]
    fn test_rejects_unusable_magnitude() {
        let mut rng = StdRng::seed_from_u64(1);
        for magnitude in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, f64::MAX] {
            let config = small(CoefficientDistribution::Symmetric { magnitude });
            assert!(matches!(
                generate(&config, &mut rng),
                Err(GeneratorError::InvalidMagnitude(_))
            ));
        }
        let zero = small(CoefficientDistribution::Symmetric { magnitude: 0.0 });
        let instance = generate(&zero, &mut rng).unwrap();
        assert!(instance.coefficients().iter().all(|&c| c == 0.0));
    }

    #[test]
    fn rejects_invalid_sizes() {
        let mut rng = StdRng::seed_from_u64(1);
        for sizes in [vec![], vec![0], vec![3, 0]] {
            let config = GeneratorConfig {
                size_choices: sizes,
                ..GeneratorConfig::symmetric()
            };
            assert!(matches!(
                generate(&config, &mut rng),
                Err(GeneratorError::InvalidSizes(_))
            ));
        }
    }

    #[test]
    fn extreme_probabilities_fix_the_sign() {
        let mut rng = StdRng::seed_from_u64(3);
        let positive = generate(
            &small(CoefficientDistribution::SignBiased {
                positive_probability: 1.0,
            }),
            &mut rng,
        )
        .unwrap();
        assert!(positive.coefficients().iter().all(|&c| c >= 0.0));

        let negative = generate(
            &small(CoefficientDistribution::SignBiased {
                positive_probability: 0.0,
            }),
            &mut rng,
        )
        .unwrap();
        assert!(negative.coefficients().iter().all(|&c| c <= 0.0));
    }

    #[test]
    fn same_seed_same_instance() {
        let config = small(CoefficientDistribution::Symmetric { magnitude: 10.0 });
        let a = generate(&config, &mut StdRng::seed_from_u64(11)).unwrap();
        let b = generate(&config, &mut StdRng::seed_from_u64(11)).unwrap();
        assert_eq!(a, b);
    }

    proptest! {
        #[test]
        fn universe_is_exactly_one_to_n(seed in any::<u64>(), p in 0.0f64..=1.0) {
            let mut rng = StdRng::seed_from_u64(seed);
            let instance = generate(
                &small(CoefficientDistribution::SignBiased { positive_probability: p }),
                &mut rng,
            ).unwrap();
            let expected: BTreeSet<usize> = (1..=instance.n()).collect();
            prop_assert_eq!(instance.universe(), expected);
        }

        #[test]
        fn coefficients_are_bounded_upper_triangular_cents(seed in any::<u64>()) {
            let mut rng = StdRng::seed_from_u64(seed);
            let instance = generate(
                &small(CoefficientDistribution::Symmetric { magnitude: 10.0 }),
                &mut rng,
            ).unwrap();
            let m = instance.coefficients();
            for row in 0..instance.n() {
                for col in 0..instance.n() {
                    let c = m[(row, col)];
                    if col < row {
                        prop_assert_eq!(c, 0.0);
                    }
                    prop_assert!((-10.0..=10.0).contains(&c));
                    prop_assert!(((c * 100.0).round() - c * 100.0).abs() < 1e-6);
                }
            }
        }
    }
}
