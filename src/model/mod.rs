//! Linear binary programs.
//!
//! A [`Program`] is the solver-independent form of a linearized MAX-SC-QBF model: binary
//! variables, a linear objective and linear constraints. Engines in [`crate::solver`]
//! translate it into whatever their backend expects.

use std::collections::HashMap;
use std::fmt;

pub mod builder;

pub use builder::{ValidationError, build_program, build_unconstrained};

/// Index of a variable inside a [`Program`].
pub type VarId = usize;

/// What a binary variable stands for. Indices are 1-based, matching the instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Var {
    /// `x_i`: set `i` is selected.
    Selection(usize),
    /// `y_{i,j}` with `i <= j`: both sets are selected.
    Product(usize, usize),
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Var::Selection(i) => write!(f, "x_{i}"),
            Var::Product(i, j) => write!(f, "y_{i}_{j}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sense {
    Maximize,
    Minimize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Relation {
    LessEq,
    GreaterEq,
}

/// Constraint families, kept so constraints can be counted and traced by origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Family {
    /// `y_{i,j} <= x_i`
    ProductBelowFirst { i: usize, j: usize },
    /// `y_{i,j} <= x_j`
    ProductBelowSecond { i: usize, j: usize },
    /// `y_{i,j} >= x_i + x_j - 1`
    ProductAboveSum { i: usize, j: usize },
    /// `sum of x_i over the sets containing element >= 1`
    Cover { element: usize },
}

impl Family {
    pub fn is_cover(&self) -> bool {
        matches!(self, Family::Cover { .. })
    }
}

/// Sparse linear expression without a constant term.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LinearExpr {
    terms: Vec<(VarId, f64)>,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            terms: Vec::with_capacity(capacity),
        }
    }

    pub fn add(&mut self, var: VarId, coefficient: f64) {
        self.terms.push((var, coefficient));
    }

    pub fn term(mut self, var: VarId, coefficient: f64) -> Self {
        self.add(var, coefficient);
        self
    }

    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms.iter().map(|&(var, c)| c * values[var]).sum()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Constraint {
    pub family: Family,
    pub expr: LinearExpr,
    pub relation: Relation,
    pub rhs: f64,
}

impl Constraint {
    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.expr.evaluate(values);
        match self.relation {
            Relation::LessEq => lhs <= self.rhs + tolerance,
            Relation::GreaterEq => lhs >= self.rhs - tolerance,
        }
    }
}

/// All variables are binary.
#[derive(Clone, Debug)]
pub struct Program {
    sense: Sense,
    variables: Vec<Var>,
    index: HashMap<Var, VarId>,
    objective: LinearExpr,
    constraints: Vec<Constraint>,
    selection_count: usize,
}

impl Program {
    pub fn new(sense: Sense) -> Self {
        Self {
            sense,
            variables: Vec::new(),
            index: HashMap::new(),
            objective: LinearExpr::new(),
            constraints: Vec::new(),
            selection_count: 0,
        }
    }

    /// Adds `var` unless it already exists and returns its id.
    pub fn add_variable(&mut self, var: Var) -> VarId {
        if let Some(&id) = self.index.get(&var) {
            return id;
        }
        let id = self.variables.len();
        self.variables.push(var);
        self.index.insert(var, id);
        if let Var::Selection(_) = var {
            self.selection_count += 1;
        }
        id
    }

    pub fn set_objective(&mut self, objective: LinearExpr) {
        self.objective = objective;
    }

    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn sense(&self) -> Sense {
        self.sense
    }

    pub fn variables(&self) -> &[Var] {
        &self.variables
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    pub fn var_id(&self, var: Var) -> Option<VarId> {
        self.index.get(&var).copied()
    }

    /// Number of `x_i` variables.
    pub fn selection_count(&self) -> usize {
        self.selection_count
    }

    /// Values of `x_1..x_n` in order, taken from a full assignment.
    pub fn selection_values(&self, values: &[f64]) -> Vec<f64> {
        (1..=self.selection_count)
            .map(|i| self.var_id(Var::Selection(i)).map_or(0.0, |id| values[id]))
            .collect()
    }

    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn cover_constraint_count(&self) -> usize {
        self.constraints.iter().filter(|c| c.family.is_cover()).count()
    }

    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective.evaluate(values)
    }

    /// Checks bounds, integrality and every constraint within `tolerance`.
    pub fn is_feasible(&self, values: &[f64], tolerance: f64) -> bool {
        values.len() == self.variables.len()
            && values
                .iter()
                .all(|&v| v.abs() <= tolerance || (v - 1.0).abs() <= tolerance)
            && self
                .constraints
                .iter()
                .all(|c| c.is_satisfied(values, tolerance))
    }

    /// Extends a selection (`x_1..x_n`) into a full assignment with `y_{i,j} = x_i AND x_j`.
    pub fn complete_assignment(&self, selection: &[bool]) -> Vec<f64> {
        let selected = |i: usize| selection.get(i - 1).copied().unwrap_or(false);
        self.variables
            .iter()
            .map(|var| match *var {
                Var::Selection(i) => selected(i),
                Var::Product(i, j) => selected(i) && selected(j),
            })
            .map(|b| if b { 1.0 } else { 0.0 })
            .collect()
    }

    /// Best objective any binary assignment could reach, ignoring constraints.
    pub fn objective_bound(&self) -> f64 {
        let favourable = |c: f64| match self.sense {
            Sense::Maximize => c.max(0.0),
            Sense::Minimize => c.min(0.0),
        };
        self.objective
            .terms()
            .iter()
            .map(|&(_, c)| favourable(c))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> Program {
        // max 2 x1 - 3 x2 s.t. x1 + x2 >= 1
        let mut program = Program::new(Sense::Maximize);
        let x1 = program.add_variable(Var::Selection(1));
        let x2 = program.add_variable(Var::Selection(2));
        program.set_objective(LinearExpr::new().term(x1, 2.0).term(x2, -3.0));
        program.add_constraint(Constraint {
            family: Family::Cover { element: 1 },
            expr: LinearExpr::new().term(x1, 1.0).term(x2, 1.0),
            relation: Relation::GreaterEq,
            rhs: 1.0,
        });
        program
    }

    #[test]
    fn test_variables_are_deduplicated() {
        let mut program = tiny();
        assert_eq!(program.add_variable(Var::Selection(2)), 1);
        assert_eq!(program.variable_count(), 2);
        assert_eq!(program.selection_count(), 2);
    }

    #[test]
    fn test_evaluates_and_checks() {
        let program = tiny();
        assert_eq!(program.objective_value(&[1.0, 0.0]), 2.0);
        assert!(program.is_feasible(&[1.0, 0.0], 1e-6));
        assert!(!program.is_feasible(&[0.0, 0.0], 1e-6));
        assert!(!program.is_feasible(&[0.5, 0.5], 1e-6));
        assert!(!program.is_feasible(&[1.0], 1e-6));
        assert_eq!(program.objective_bound(), 2.0);
        assert_eq!(program.cover_constraint_count(), 1);
    }

    #[test]
    fn test_var_display() {
        assert_eq!(Var::Selection(3).to_string(), "x_3");
        assert_eq!(Var::Product(1, 4).to_string(), "y_1_4");
    }
}
