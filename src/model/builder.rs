//! Linearized MAX-SC-QBF model.
//!
//! The quadratic objective `sum_{i<=j} a_ij x_i x_j` is rewritten over auxiliary binaries
//! `y_ij`, one per pair `i <= j`, tied to the selection variables by
//!
//! ```text
//! y_ij <= x_i
//! y_ij <= x_j
//! y_ij >= x_i + x_j - 1
//! ```
//!
//! which forces `y_ij = x_i AND x_j` at every binary point. The set-cover part asks for one
//! selected set per element of the universe.

use std::collections::BTreeMap;

use thiserror::Error;

use super::{Constraint, Family, LinearExpr, Program, Relation, Sense, Var, VarId};
use crate::instance::Instance;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("instance has no candidate sets (n = 0)")]
    Empty,
    #[error("instance declares n = {n} but has {found} subsets")]
    SubsetCount { n: usize, found: usize },
    #[error("coefficient matrix is {rows}x{cols}, expected {n}x{n}")]
    MatrixShape { n: usize, rows: usize, cols: usize },
    #[error("subset {subset} references element {element} outside [1, {n}]")]
    ElementOutOfRange {
        subset: usize,
        element: usize,
        n: usize,
    },
}

fn validate(instance: &Instance) -> Result<(), ValidationError> {
    let n = instance.n();
    if n == 0 {
        return Err(ValidationError::Empty);
    }
    if instance.subsets().len() != n {
        return Err(ValidationError::SubsetCount {
            n,
            found: instance.subsets().len(),
        });
    }
    let matrix = instance.coefficients();
    if matrix.nrows() != n || matrix.ncols() != n {
        return Err(ValidationError::MatrixShape {
            n,
            rows: matrix.nrows(),
            cols: matrix.ncols(),
        });
    }
    for (index, subset) in instance.subsets().iter().enumerate() {
        if let Some(&element) = subset.iter().find(|&&e| e == 0 || e > n) {
            return Err(ValidationError::ElementOutOfRange {
                subset: index + 1,
                element,
                n,
            });
        }
    }
    Ok(())
}

/// Adds the selection and product variables, the objective and the linearization rows.
fn build_quadratic_part(instance: &Instance) -> (Program, Vec<VarId>) {
    let n = instance.n();
    let mut program = Program::new(Sense::Maximize);

    let x: Vec<VarId> = (1..=n)
        .map(|i| program.add_variable(Var::Selection(i)))
        .collect();

    let mut objective = LinearExpr::with_capacity(n * (n + 1) / 2);
    for i in 1..=n {
        for j in i..=n {
            let y = program.add_variable(Var::Product(i, j));
            let (xi, xj) = (x[i - 1], x[j - 1]);

            let coefficient = instance.coefficient(i, j);
            if coefficient != 0.0 {
                objective.add(y, coefficient);
            }

            program.add_constraint(Constraint {
                family: Family::ProductBelowFirst { i, j },
                expr: LinearExpr::new().term(y, 1.0).term(xi, -1.0),
                relation: Relation::LessEq,
                rhs: 0.0,
            });
            program.add_constraint(Constraint {
                family: Family::ProductBelowSecond { i, j },
                expr: LinearExpr::new().term(y, 1.0).term(xj, -1.0),
                relation: Relation::LessEq,
                rhs: 0.0,
            });
            // For i == j the two x terms share a variable, which collapses to y >= 2x - 1.
            program.add_constraint(Constraint {
                family: Family::ProductAboveSum { i, j },
                expr: LinearExpr::new().term(y, 1.0).term(xi, -1.0).term(xj, -1.0),
                relation: Relation::GreaterEq,
                rhs: -1.0,
            });
        }
    }
    program.set_objective(objective);

    (program, x)
}

/// Builds the linearized MAX-SC-QBF program for `instance`.
///
/// An empty universe yields no cover constraints.
pub fn build_program(instance: &Instance) -> Result<Program, ValidationError> {
    validate(instance)?;
    let (mut program, x) = build_quadratic_part(instance);

    let mut containing: BTreeMap<usize, Vec<VarId>> = BTreeMap::new();
    for (index, subset) in instance.subsets().iter().enumerate() {
        for &element in subset {
            containing.entry(element).or_default().push(x[index]);
        }
    }

    for (element, sets) in containing {
        let mut expr = LinearExpr::with_capacity(sets.len());
        for var in sets {
            expr.add(var, 1.0);
        }
        program.add_constraint(Constraint {
            family: Family::Cover { element },
            expr,
            relation: Relation::GreaterEq,
            rhs: 1.0,
        });
    }

    Ok(program)
}

/// Builds the plain QBF program: same objective and linearization, no cover constraints.
pub fn build_unconstrained(instance: &Instance) -> Result<Program, ValidationError> {
    validate(instance)?;
    Ok(build_quadratic_part(instance).0)
}
