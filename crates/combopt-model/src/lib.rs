mod activation;
mod error;
mod expr;
mod problem;
mod solution;
mod solver;

pub use error::ModelError;
pub use expr::{LinearExpr, VarId};
pub use problem::{
    Constraint, ConstraintOp, Model, ModelBuilder, Objective, Sense, UNBOUNDED, VarGroup, Variable, VariableKind,
};
pub use solution::{SolutionStatus, SolveResult, SolverFailure};
pub use solver::{GoodLpSolver, Solver};
