use thiserror::Error;

use crate::expr::VarId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Constraint '{constraint}' references unregistered variable {var}")]
    UnknownVariable { constraint: String, var: VarId },
    #[error("Non-finite coefficient for {var} in '{context}'")]
    NonFiniteCoefficient { context: String, var: VarId },
    #[error("Non-finite right-hand side in constraint '{0}'")]
    NonFiniteRhs(String),
    #[error("Invalid bounds for variable '{name}': [{lower}, {upper}]")]
    InvalidBounds { name: String, lower: f64, upper: f64 },
    #[error("Model '{0}' has no objective")]
    MissingObjective(String),
}
