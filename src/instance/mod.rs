//! MAX-SC-QBF problem instances.
//!
//! An [`Instance`] holds `n` candidate sets over the elements `1..=n` and the
//! `n x n` coefficient matrix of the quadratic objective. Only the upper
//! triangle of the matrix (row <= column) is part of the objective.

use std::collections::BTreeSet;

use nalgebra::DMatrix;

pub mod codec;
pub mod generator;

pub use codec::{
    EncodeOptions, FormatError, ReadError, decode, encode, read_instance, write_instance,
};
pub use generator::{CoefficientDistribution, GeneratorConfig, GeneratorError, generate};

/// Elements are 1-based, as in the instance files.
pub type Element = usize;

#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    n: usize,
    subsets: Vec<BTreeSet<Element>>,
    coefficients: DMatrix<f64>,
}

impl Instance {
    /// Creates an instance without validating it.
    ///
    /// Structural checks (subset count, element range, matrix shape) are done by
    /// the model builder, so that malformed data can still be read and reported.
    pub fn new(n: usize, subsets: Vec<BTreeSet<Element>>, coefficients: DMatrix<f64>) -> Self {
        Self {
            n,
            subsets,
            coefficients,
        }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn subsets(&self) -> &[BTreeSet<Element>] {
        &self.subsets
    }

    /// Subset of the 1-based decision variable `index`.
    pub fn subset(&self, index: usize) -> &BTreeSet<Element> {
        &self.subsets[index - 1]
    }

    pub fn coefficients(&self) -> &DMatrix<f64> {
        &self.coefficients
    }

    /// Coefficient of the pair `(i, j)`, 1-based. Entries below the diagonal are zero
    /// by definition, whatever the matrix stores there.
    pub fn coefficient(&self, i: usize, j: usize) -> f64 {
        if i > j {
            return 0.0;
        }
        self.coefficients[(i - 1, j - 1)]
    }

    /// The union of all subsets: every element that has to be covered.
    pub fn universe(&self) -> BTreeSet<Element> {
        self.subsets.iter().flatten().copied().collect()
    }

    /// Sum of the upper-triangle coefficients.
    pub fn coefficient_sum(&self) -> f64 {
        let size = self.coefficients.nrows().min(self.coefficients.ncols());
        (0..size)
            .flat_map(|row| (row..self.coefficients.ncols()).map(move |col| (row, col)))
            .map(|(row, col)| self.coefficients[(row, col)])
            .sum()
    }
}
