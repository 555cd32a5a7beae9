//! CBC engine through `good_lp`.

use std::time::Instant;

use good_lp::solvers::coin_cbc::coin_cbc;
use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution, SolutionStatus, SolverModel,
    Variable, variable,
};

use super::{EngineReport, FEASIBILITY_TOLERANCE, MipEngine, SolveOptions, SolverFailure};
use crate::model::{LinearExpr, Program, Relation, Sense};

/// Solves programs with COIN-OR CBC. CBC's own console output is suppressed; the time
/// limit is passed as CBC's `seconds` parameter.
#[derive(Clone, Copy, Debug, Default)]
pub struct CbcEngine;

fn to_expression(expr: &LinearExpr, vars: &[Variable]) -> Expression {
    let mut expression = Expression::with_capacity(expr.terms().len());
    for &(var, coefficient) in expr.terms() {
        expression.add_mul(coefficient, vars[var]);
    }
    expression
}

impl MipEngine for CbcEngine {
    fn name(&self) -> &str {
        "cbc"
    }

    fn solve(
        &self,
        program: &Program,
        options: &SolveOptions,
    ) -> Result<EngineReport, SolverFailure> {
        let mut problem_vars = ProblemVariables::new();
        let vars: Vec<Variable> = program
            .variables()
            .iter()
            .map(|var| problem_vars.add(variable().binary().name(var.to_string())))
            .collect();

        let objective = to_expression(program.objective(), &vars);
        let unsolved = match program.sense() {
            Sense::Maximize => problem_vars.maximise(objective),
            Sense::Minimize => problem_vars.minimise(objective),
        };
        let mut problem = unsolved.using(coin_cbc);
        problem.set_parameter("log", "0");
        problem.set_parameter("seconds", &options.time_limit.as_secs_f64().to_string());

        for constraint in program.constraints() {
            let lhs = to_expression(&constraint.expr, &vars);
            problem.add_constraint(match constraint.relation {
                Relation::LessEq => lhs.leq(constraint.rhs),
                Relation::GreaterEq => lhs.geq(constraint.rhs),
            });
        }

        let start = Instant::now();
        let outcome = problem.solve();
        let runtime = start.elapsed();

        let solution = outcome.map_err(|err| match err {
            ResolutionError::Infeasible => SolverFailure::Infeasible {
                engine: self.name().to_string(),
            },
            ResolutionError::Unbounded => SolverFailure::Unbounded {
                engine: self.name().to_string(),
            },
            other => SolverFailure::Aborted {
                engine: self.name().to_string(),
                reason: other.to_string(),
            },
        })?;

        let values: Vec<f64> = vars.iter().map(|&var| solution.value(var)).collect();
        let proven = matches!(solution.status(), SolutionStatus::Optimal);
        let status = format!("{:?}", solution.status());
        let raw = solution.model();

        // A time-limited stop may hand back a column vector that is not a solution.
        let feasible = program.is_feasible(&values, FEASIBILITY_TOLERANCE);
        let incumbent = feasible.then(|| raw.obj_value());
        let best_bound = match incumbent {
            Some(incumbent) if proven => incumbent,
            _ => raw.best_possible_value(),
        };

        tracing::debug!(%status, feasible, best_bound, "cbc finished");

        Ok(EngineReport {
            solution_count: usize::from(feasible),
            incumbent,
            best_bound,
            relative_gap: None,
            runtime,
            values,
            status,
        })
    }
}
