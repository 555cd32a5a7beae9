//! Text format of MAX-SC-QBF instances.
//!
//! ```text
//! n
//! size_1 size_2 ... size_n
//! elements of subset 1            (one line per subset, blank for an empty one)
//! ...
//! a_11 a_12 ... a_1n              (row r lists the columns r..n)
//! a_22 ... a_2n
//! ...
//! ```
//!
//! Missing trailing matrix rows, and missing trailing values inside a row, read as zero.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use itertools::Itertools;
use nalgebra::DMatrix;
use thiserror::Error;

use super::Instance;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormatError {
    #[error("instance text is empty")]
    Empty,
    #[error("line {line}: invalid token `{token}`")]
    InvalidToken { line: usize, token: String },
    #[error("line {line}: expected {expected} subset sizes, found {found}")]
    SizeCountMismatch {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("missing line for {what}")]
    MissingLine { what: String },
    #[error("line {line}: expected {expected} elements in subset {subset}, got {found}")]
    SubsetSizeMismatch {
        line: usize,
        subset: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: matrix row {row} has {found} values, at most {expected} allowed")]
    RowTooLong {
        line: usize,
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// Failure to read an instance file.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("cannot read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed instance {}", path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: FormatError,
    },
}

#[derive(Clone, Debug)]
pub struct EncodeOptions {
    /// Number of decimal digits written for each coefficient.
    pub precision: usize,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self { precision: 2 }
    }
}

fn parse_tokens<T: FromStr>(text: &str, line: usize) -> Result<Vec<T>, FormatError> {
    text.split_whitespace()
        .map(|token| {
            token.parse().map_err(|_| FormatError::InvalidToken {
                line,
                token: token.to_string(),
            })
        })
        .collect()
}

/// Parses an instance from its text representation.
pub fn decode(text: &str) -> Result<Instance, FormatError> {
    let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l.trim()));

    let (n_line, n_text) = lines
        .by_ref()
        .find(|(_, l)| !l.is_empty())
        .ok_or(FormatError::Empty)?;
    let n: usize = n_text.parse().map_err(|_| FormatError::InvalidToken {
        line: n_line,
        token: n_text.to_string(),
    })?;

    // With n > 0 the size line has tokens, so blank lines before it are padding.
    let sizes_entry = if n == 0 {
        lines.next()
    } else {
        lines.by_ref().find(|(_, l)| !l.is_empty())
    };
    let (sizes_line, sizes_text) = sizes_entry.ok_or_else(|| FormatError::MissingLine {
        what: String::from("subset sizes"),
    })?;
    let sizes: Vec<usize> = parse_tokens(sizes_text, sizes_line)?;
    if sizes.len() != n {
        return Err(FormatError::SizeCountMismatch {
            line: sizes_line,
            expected: n,
            found: sizes.len(),
        });
    }

    let mut subsets = Vec::with_capacity(n);
    for (index, &size) in sizes.iter().enumerate() {
        let (line, text) = lines.next().ok_or_else(|| FormatError::MissingLine {
            what: format!("subset {}", index + 1),
        })?;
        // Repeated elements collapse, so they show up as a size mismatch.
        let elements: BTreeSet<usize> = parse_tokens(text, line)?.into_iter().collect();
        if elements.len() != size {
            return Err(FormatError::SubsetSizeMismatch {
                line,
                subset: index + 1,
                expected: size,
                found: elements.len(),
            });
        }
        subsets.push(elements);
    }

    let mut coefficients = DMatrix::zeros(n, n);
    for (row, (line, text)) in lines.filter(|(_, l)| !l.is_empty()).take(n).enumerate() {
        let values: Vec<f64> = parse_tokens(text, line)?;
        if values.len() > n - row {
            return Err(FormatError::RowTooLong {
                line,
                row,
                expected: n - row,
                found: values.len(),
            });
        }
        for (offset, value) in values.into_iter().enumerate() {
            coefficients[(row, row + offset)] = value;
        }
    }

    Ok(Instance::new(n, subsets, coefficients))
}

/// Writes `instance` in the text format. Subset elements are written in ascending order.
///
/// # Panics
///
/// Panics if the coefficient matrix is smaller than `n x n`.
pub fn encode(instance: &Instance, options: &EncodeOptions) -> String {
    let n = instance.n();
    let mut text = format!("{n}\n");

    text.push_str(&instance.subsets().iter().map(BTreeSet::len).join(" "));
    text.push('\n');

    for subset in instance.subsets() {
        text.push_str(&subset.iter().join(" "));
        text.push('\n');
    }

    for row in 0..n {
        let values = (row..n)
            .map(|col| format!("{:.*}", options.precision, instance.coefficients()[(row, col)]))
            .join(" ");
        text.push_str(&values);
        text.push('\n');
    }

    text
}

/// Reads and decodes an instance file.
///
/// # Arguments
///
/// * `path` - File in the text format
///
/// # Returns
///
/// The decoded instance, or a [`ReadError`] telling I/O failures apart from malformed
/// content.
pub fn read_instance<P: AsRef<Path>>(path: P) -> Result<Instance, ReadError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| ReadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode(&text).map_err(|source| ReadError::Format {
        path: path.to_path_buf(),
        source,
    })
}

/// Encodes `instance` and writes it to `path`, replacing any existing file.
pub fn write_instance<P: AsRef<Path>>(
    path: P,
    instance: &Instance,
    options: &EncodeOptions,
) -> io::Result<()> {
    fs::write(path, encode(instance, options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::generator::{CoefficientDistribution, GeneratorConfig, generate};
    use proptest::prelude::*;
    use rand::{SeedableRng, rngs::StdRng};

    const SAMPLE: &str = "3\n2 0 2\n1 2\n\n3 2\n1.5 -2 0.25\n3 4\n-1\n";

    #[test]
    fn test_decodes_sample() {
        let instance = decode(SAMPLE).unwrap();
        assert_eq!(instance.n(), 3);
        assert_eq!(instance.subsets()[0], BTreeSet::from([1, 2]));
        assert!(instance.subsets()[1].is_empty());
        assert_eq!(instance.subsets()[2], BTreeSet::from([2, 3]));
        assert_eq!(instance.coefficient(1, 1), 1.5);
        assert_eq!(instance.coefficient(1, 3), 0.25);
        assert_eq!(instance.coefficient(2, 3), 4.0);
        assert_eq!(instance.coefficient(3, 3), -1.0);
        assert_eq!(instance.coefficients()[(1, 0)], 0.0);
    }

    #[test]
    fn missing_rows_are_zero() {
        let instance = decode("3\n1 1 1\n1\n2\n3\n1 2 3\n").unwrap();
        assert_eq!(instance.coefficient(1, 3), 3.0);
        assert_eq!(instance.coefficient(2, 2), 0.0);
        assert_eq!(instance.coefficient(3, 3), 0.0);
    }

    #[test]
    fn short_rows_are_zero_padded() {
        let instance = decode("2\n1 1\n1\n2\n7\n").unwrap();
        assert_eq!(instance.coefficient(1, 1), 7.0);
        assert_eq!(instance.coefficient(1, 2), 0.0);
    }

    #[test]
    fn blank_lines_in_matrix_are_ignored() {
        let instance = decode("\n2\n1 1\n1\n2\n\n1 2\n\n3\n\n").unwrap();
        assert_eq!(instance.coefficient(1, 2), 2.0);
        assert_eq!(instance.coefficient(2, 2), 3.0);
    }

    #[test]
    fn test_blank_lines_before_sizes_are_ignored() {
        let instance = decode("2\n\n  \n1 1\n1\n2\n1 2\n3\n").unwrap();
        assert_eq!(instance.subsets()[0], BTreeSet::from([1]));
        assert_eq!(instance.subsets()[1], BTreeSet::from([2]));
        assert_eq!(instance.coefficient(1, 2), 2.0);
        assert_eq!(instance.coefficient(2, 2), 3.0);
    }

    #[test]
    fn declared_size_must_match_elements() {
        let err = decode("2\n3 1\n1 2\n2\n").unwrap_err();
        assert_eq!(
            err,
            FormatError::SubsetSizeMismatch {
                line: 3,
                subset: 1,
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn repeated_elements_are_a_size_mismatch() {
        let err = decode("2\n2 1\n1 1\n2\n").unwrap_err();
        assert!(matches!(err, FormatError::SubsetSizeMismatch { found: 1, .. }));
    }

    #[test]
    fn out_of_range_elements_are_accepted_by_decode() {
        let instance = decode("1\n1\n5\n").unwrap();
        assert!(instance.subsets()[0].contains(&5));
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(decode("  \n\n"), Err(FormatError::Empty));
        assert!(matches!(
            decode("two\n"),
            Err(FormatError::InvalidToken { line: 1, .. })
        ));
        assert!(matches!(
            decode("2\n1\n"),
            Err(FormatError::SizeCountMismatch { expected: 2, found: 1, .. })
        ));
        assert!(matches!(
            decode("2\n1 1\n1\n"),
            Err(FormatError::MissingLine { .. })
        ));
        assert!(matches!(
            decode("1\n1\n1\n1 2\n"),
            Err(FormatError::RowTooLong { row: 0, .. })
        ));
    }

    #[test]
    fn encodes_rows_of_decreasing_length() {
        let instance = decode(SAMPLE).unwrap();
        let text = encode(&instance, &EncodeOptions::default());
        assert_eq!(
            text,
            "3\n2 0 2\n1 2\n\n2 3\n1.50 -2.00 0.25\n3.00 4.00\n-1.00\n"
        );
    }

    fn distribution() -> impl Strategy<Value = CoefficientDistribution> {
        prop_oneof![
            (0.0..=20.0f64).prop_map(|magnitude| CoefficientDistribution::Symmetric { magnitude }),
            (0.0..=1.0f64).prop_map(|positive_probability| {
                CoefficientDistribution::SignBiased {
                    positive_probability,
                }
            }),
        ]
    }

    proptest! {
        #[test]
        fn test_generated_instances_survive_round_trip(
            seed in any::<u64>(),
            coefficients in distribution(),
            size_choices in prop::collection::vec(1usize..=15, 1..4),
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let config = GeneratorConfig { size_choices, coefficients };
            let instance = generate(&config, &mut rng).unwrap();
            let text = encode(&instance, &EncodeOptions::default());
            prop_assert_eq!(decode(&text).unwrap(), instance);
        }

        #[test]
        fn test_single_set_instances_survive_round_trip(
            seed in any::<u64>(),
            coefficients in distribution(),
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let config = GeneratorConfig { size_choices: vec![1], coefficients };
            let instance = generate(&config, &mut rng).unwrap();
            prop_assert_eq!(instance.n(), 1);
            let text = encode(&instance, &EncodeOptions::default());
            prop_assert_eq!(decode(&text).unwrap(), instance);
        }
    }

    #[test]
    fn read_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_instance(dir.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, ReadError::Io { .. }));
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("instance1.txt");
        let instance = decode(SAMPLE).unwrap();
        write_instance(&path, &instance, &EncodeOptions::default()).unwrap();
        assert_eq!(read_instance(&path).unwrap(), instance);
    }
}
