//! Solver adapter over the `good_lp` modelling crate.
//!
//! The backend (microlp by default, HiGHS with the `highs` feature) is an
//! opaque LP/MIP capability. This module only marshals a [`Model`] into it and
//! the variable values back out, keeping `VarId` order intact.

#[cfg(not(feature = "highs"))]
use std::sync::mpsc::{self, RecvTimeoutError};
#[cfg(not(feature = "highs"))]
use std::thread;
use std::time::{Duration, Instant};

use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable as LpVariable,
    constraint, variable,
};
use tracing::{debug, info, warn};

#[cfg(feature = "highs")]
use good_lp::solvers::WithTimeLimit;
#[cfg(feature = "highs")]
use good_lp::solvers::highs::highs as backend;
#[cfg(all(feature = "microlp", not(feature = "highs")))]
use good_lp::solvers::microlp::microlp as backend;

#[cfg(not(any(feature = "microlp", feature = "highs")))]
compile_error!("combopt-model needs a solver backend: enable the `microlp` or `highs` feature");

use crate::expr::LinearExpr;
use crate::problem::{ConstraintOp, Model, Sense, VariableKind};
use crate::solution::{SolveResult, SolverFailure};

/// Tolerance for constraints that have no variable terms left.
const TRIVIAL_TOLERANCE: f64 = 1e-9;

/// Anything that can turn a [`Model`] into a [`SolveResult`].
///
/// Expected outcomes (infeasible, unbounded, timeout) are reported through
/// [`SolveResult::status`], never by panicking.
pub trait Solver {
    fn name(&self) -> &'static str;

    fn solve(&self, model: &Model) -> SolveResult;
}

/// LP/MIP solver backed by `good_lp`.
#[derive(Debug, Default, Clone)]
pub struct GoodLpSolver {
    time_limit: Option<Duration>,
}

impl GoodLpSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give up and report [`SolverFailure::Timeout`] once `limit` has elapsed.
    ///
    /// HiGHS receives the limit and stops itself. microlp cannot be
    /// interrupted: it runs on a detached worker thread, and after a timeout
    /// that thread keeps its copy of the model and its backend session until
    /// microlp finishes on its own.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }
}

/// What the backend said, before timing is attached.
#[derive(Debug)]
enum Outcome {
    Optimal(Vec<f64>),
    Infeasible,
    Unbounded,
    Failed(String),
}

impl Solver for GoodLpSolver {
    fn name(&self) -> &'static str {
        if cfg!(feature = "highs") { "highs" } else { "microlp" }
    }

    fn solve(&self, model: &Model) -> SolveResult {
        let started = Instant::now();

        if let Err(e) = model.validate() {
            warn!(model = model.name(), error = %e, "refusing to solve malformed model");
            return SolveResult::error(SolverFailure::MalformedModel(e.to_string()), started.elapsed());
        }

        debug!(
            model = model.name(),
            backend = self.name(),
            variables = model.num_variables(),
            integers = model.num_integer_variables(),
            constraints = model.num_constraints(),
            "solving"
        );

        let outcome = match self.time_limit {
            None => solve_with_good_lp(model, None),
            Some(limit) => match solve_within(model, limit) {
                Some(outcome) => outcome,
                None => {
                    warn!(model = model.name(), limit_ms = limit.as_millis() as u64, "solve timed out");
                    return SolveResult::error(SolverFailure::Timeout, started.elapsed());
                }
            },
        };
        let elapsed = started.elapsed();

        let result = match outcome {
            Outcome::Optimal(values) => {
                let objective = model.objective().expr.evaluate(&values).unwrap_or(f64::NAN);
                SolveResult::optimal(objective, values, elapsed)
            }
            Outcome::Infeasible => SolveResult::infeasible(elapsed),
            Outcome::Unbounded => SolveResult::unbounded(elapsed),
            Outcome::Failed(reason) => SolveResult::error(SolverFailure::Backend(reason), elapsed),
        };

        if result.is_optimal() {
            info!(
                model = model.name(),
                objective = result.objective_value,
                elapsed_ms = result.elapsed_ms(),
                "solved"
            );
        } else {
            warn!(model = model.name(), status = %result.status, elapsed_ms = result.elapsed_ms(), "no optimal solution");
        }
        result
    }
}

/// HiGHS enforces the limit itself, so the solve stays on the calling thread.
/// A run that used up the whole limit is a timeout even when HiGHS hands back
/// its incumbent, since that point is not proven optimal.
#[cfg(feature = "highs")]
fn solve_within(model: &Model, limit: Duration) -> Option<Outcome> {
    let started = Instant::now();
    let outcome = solve_with_good_lp(model, Some(limit));
    (started.elapsed() < limit).then_some(outcome)
}

/// Run microlp on a worker thread that owns its own copy of the model.
/// Returns `None` when `limit` elapses first. The worker is not cancelled: it
/// holds the backend session until microlp returns, then drops it unread.
#[cfg(not(feature = "highs"))]
fn solve_within(model: &Model, limit: Duration) -> Option<Outcome> {
    let (tx, rx) = mpsc::channel();
    let owned = model.clone();
    let spawned = thread::Builder::new()
        .name("combopt-solve".to_string())
        .spawn(move || {
            // The receiver is gone after a timeout; nothing left to report to.
            let _ = tx.send(solve_with_good_lp(&owned, None));
        });
    if let Err(e) = spawned {
        return Some(Outcome::Failed(format!("cannot start solver thread: {}", e)));
    }

    match rx.recv_timeout(limit) {
        Ok(outcome) => Some(outcome),
        Err(RecvTimeoutError::Timeout) => None,
        Err(RecvTimeoutError::Disconnected) => Some(Outcome::Failed("solver thread panicked".to_string())),
    }
}

#[cfg(feature = "highs")]
fn apply_time_limit<P: WithTimeLimit>(problem: P, limit: Option<Duration>) -> P {
    match limit {
        Some(limit) => problem.with_time_limit(limit.as_secs_f64()),
        None => problem,
    }
}

#[cfg(not(feature = "highs"))]
fn apply_time_limit<P>(problem: P, _limit: Option<Duration>) -> P {
    problem
}

fn solve_with_good_lp(model: &Model, limit: Option<Duration>) -> Outcome {
    // Rows without variables never reach the backend.
    for c in model.constraints().iter().filter(|c| c.expr().is_empty()) {
        if !c.op().holds(0.0, c.rhs(), TRIVIAL_TOLERANCE) {
            debug!(constraint = c.name(), "constant constraint cannot hold");
            return Outcome::Infeasible;
        }
    }

    if model.num_variables() == 0 {
        return Outcome::Optimal(Vec::new());
    }

    let mut vars = ProblemVariables::new();
    let lp_vars: Vec<LpVariable> = model
        .variables()
        .iter()
        .map(|v| {
            let mut def = variable().name(v.name.clone());
            if v.lower > f64::MIN {
                def = def.min(v.lower);
            }
            if v.has_upper_bound() {
                def = def.max(v.upper);
            }
            if v.kind == VariableKind::Integer {
                def = def.integer();
            }
            vars.add(def)
        })
        .collect();

    let objective = to_expression(&model.objective().expr, &lp_vars);
    let unsolved = match model.objective().sense {
        Sense::Minimize => vars.minimise(objective),
        Sense::Maximize => vars.maximise(objective),
    };
    let mut problem = apply_time_limit(unsolved.using(backend), limit);

    for c in model.constraints().iter().filter(|c| !c.expr().is_empty()) {
        let lhs = to_expression(c.expr(), &lp_vars);
        let rhs = c.rhs();
        let lp_constraint = match c.op() {
            ConstraintOp::Le => constraint!(lhs <= rhs),
            ConstraintOp::Ge => constraint!(lhs >= rhs),
            ConstraintOp::Eq => constraint!(lhs == rhs),
        };
        problem.add_constraint(lp_constraint);
    }

    match problem.solve() {
        Ok(solution) => Outcome::Optimal(
            model
                .variables()
                .iter()
                .zip(&lp_vars)
                .map(|(v, lp_var)| {
                    let value = solution.value(*lp_var);
                    match v.kind {
                        VariableKind::Integer => value.round(),
                        VariableKind::Continuous => value,
                    }
                })
                .collect(),
        ),
        Err(ResolutionError::Infeasible) => Outcome::Infeasible,
        Err(ResolutionError::Unbounded) => Outcome::Unbounded,
        Err(other) => Outcome::Failed(other.to_string()),
    }
}

/// Terms only; the constant is added back when the objective is evaluated.
fn to_expression(expr: &LinearExpr, lp_vars: &[LpVariable]) -> Expression {
    expr.terms()
        .map(|(var, coef)| coef * lp_vars[var.index()])
        .sum()
}
