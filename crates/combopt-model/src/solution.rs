use std::fmt;
use std::time::Duration;

use crate::expr::VarId;

/// The result of solving a model
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SolveResult {
    /// Solution status
    pub status: SolutionStatus,
    /// Optimal objective value (meaningful only when optimal)
    pub objective_value: f64,
    /// Value of each variable, indexed by [`VarId`]. Empty unless optimal.
    pub values: Vec<f64>,
    /// Wall-clock time spent in the backend
    pub elapsed: Duration,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolutionStatus {
    /// An optimal solution was found
    Optimal,
    /// The model is infeasible (no solution exists)
    Infeasible,
    /// The objective can be improved without limit
    Unbounded,
    /// The solver failed or gave up
    Error(SolverFailure),
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolverFailure {
    /// The configured time limit elapsed
    Timeout,
    /// The model broke an invariant and was never handed to the backend
    MalformedModel(String),
    /// The backend reported a failure of its own
    Backend(String),
}

impl fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolutionStatus::Optimal => write!(f, "optimal"),
            SolutionStatus::Infeasible => write!(f, "infeasible"),
            SolutionStatus::Unbounded => write!(f, "unbounded"),
            SolutionStatus::Error(failure) => write!(f, "solver error: {}", failure),
        }
    }
}

impl fmt::Display for SolverFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverFailure::Timeout => write!(f, "timeout"),
            SolverFailure::MalformedModel(reason) => write!(f, "malformed model: {}", reason),
            SolverFailure::Backend(reason) => write!(f, "backend failure: {}", reason),
        }
    }
}

impl SolveResult {
    pub fn optimal(objective_value: f64, values: Vec<f64>, elapsed: Duration) -> Self {
        Self {
            status: SolutionStatus::Optimal,
            objective_value,
            values,
            elapsed,
        }
    }

    pub fn infeasible(elapsed: Duration) -> Self {
        Self::without_values(SolutionStatus::Infeasible, elapsed)
    }

    pub fn unbounded(elapsed: Duration) -> Self {
        Self::without_values(SolutionStatus::Unbounded, elapsed)
    }

    pub fn error(failure: SolverFailure, elapsed: Duration) -> Self {
        Self::without_values(SolutionStatus::Error(failure), elapsed)
    }

    fn without_values(status: SolutionStatus, elapsed: Duration) -> Self {
        Self {
            status,
            objective_value: f64::NAN,
            values: Vec::new(),
            elapsed,
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolutionStatus::Optimal
    }

    /// Value of `var`, `None` unless the solve was optimal.
    pub fn value(&self, var: VarId) -> Option<f64> {
        self.values.get(var.index()).copied()
    }

    /// Objective value, `None` unless the solve was optimal.
    pub fn objective(&self) -> Option<f64> {
        self.is_optimal().then_some(self.objective_value)
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infeasible_carries_no_values() {
        let result = SolveResult::infeasible(Duration::from_millis(3));
        assert!(!result.is_optimal());
        assert_eq!(result.value(VarId(0)), None);
        assert_eq!(result.objective(), None);
        assert_eq!(result.status.to_string(), "infeasible");
    }

    #[test]
    fn test_error_display() {
        let result = SolveResult::error(SolverFailure::Timeout, Duration::ZERO);
        assert_eq!(result.status.to_string(), "solver error: timeout");
    }

    #[test]
    fn test_optimal_values() {
        let result = SolveResult::optimal(8.0, vec![0.0, 5.0, 8.0], Duration::from_millis(2));
        assert_eq!(result.objective(), Some(8.0));
        assert_eq!(result.value(VarId(2)), Some(8.0));
        assert!((result.elapsed_ms() - 2.0).abs() < 1e-9);
    }
}
