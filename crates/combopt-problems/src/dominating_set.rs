//! Minimum-weight dominating set and its LP relaxation.

use combopt_model::{LinearExpr, Model, ModelBuilder, SolutionStatus, SolveResult, Solver, VarGroup, VarId};
use thiserror::Error;
use tracing::{debug, info};

use crate::error::{InvalidInstanceError, expect_non_negative};
use crate::graph::Graph;
use crate::report::{GapMeasurement, GapRow, Report, integrality_gap};

#[derive(Debug, Clone)]
pub struct DominatingSetModel {
    pub model: Model,
    pub selected: VarGroup,
}

/// Build the integer model: every node is covered by itself or a neighbour,
/// minimising the total weight of selected nodes.
pub fn build_dominating_set_model(graph: &Graph) -> Result<DominatingSetModel, InvalidInstanceError> {
    expect_non_negative("node weights", graph.node_weights())?;
    let n = graph.num_nodes();

    let mut builder = ModelBuilder::new("dominating set");
    let selected = builder.add_binary_group("selected", n);

    for i in 0..n {
        let mut closed = graph.neighbors(i);
        if let Err(pos) = closed.binary_search(&i) {
            closed.insert(pos, i);
        }
        builder.add_ge(
            format!("dominated[{}]", i),
            LinearExpr::sum(closed.into_iter().map(|j| selected.at(j))),
            1.0,
        )?;
    }

    let mut weight = LinearExpr::new();
    for (i, &w) in graph.node_weights().iter().enumerate() {
        weight.add_term(w, selected.at(i));
    }
    builder.minimize(weight)?;

    debug!(nodes = n, edges = graph.num_edges(), "dominating set model assembled");
    Ok(DominatingSetModel {
        model: builder.build()?,
        selected,
    })
}

impl DominatingSetModel {
    /// Same constraints with every selection continuous in `[0, 1]`.
    pub fn relaxed(&self) -> DominatingSetModel {
        DominatingSetModel {
            model: self.model.relaxed(),
            selected: self.selected.clone(),
        }
    }

    pub fn label(&self, var: VarId) -> String {
        match self.selected.position(var) {
            Some(node) => format!("node {} selected", node),
            None => var.to_string(),
        }
    }

    /// Nodes selected at more than one half.
    pub fn chosen_nodes(&self, result: &SolveResult) -> Option<Vec<usize>> {
        let values = self
            .selected
            .iter()
            .map(|v| result.value(v))
            .collect::<Option<Vec<_>>>()?;
        Some(
            values
                .iter()
                .enumerate()
                .filter(|(_, x)| **x > 0.5)
                .map(|(i, _)| i)
                .collect(),
        )
    }

    pub fn report(&self, result: &SolveResult) -> Report {
        Report::from_solve(&self.model, result, |v| self.label(v)).with_parameter("nodes", self.selected.len())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RelaxationError {
    #[error(transparent)]
    Invalid(#[from] InvalidInstanceError),
    #[error("{which} solve did not reach an optimum: {status}")]
    NotOptimal { which: &'static str, status: SolutionStatus },
}

/// Solve the integer model and its relaxation and compare the optima.
pub fn compare_relaxation(graph: &Graph, solver: &dyn Solver) -> Result<GapMeasurement, RelaxationError> {
    let integer = build_dominating_set_model(graph)?;
    let relaxed = integer.relaxed();

    let ilp = solver.solve(&integer.model);
    let ilp_objective = ilp.objective().ok_or_else(|| RelaxationError::NotOptimal {
        which: "ILP",
        status: ilp.status.clone(),
    })?;
    let lp = solver.solve(&relaxed.model);
    let lp_objective = lp.objective().ok_or_else(|| RelaxationError::NotOptimal {
        which: "LP",
        status: lp.status.clone(),
    })?;

    let measurement = GapMeasurement {
        ilp_objective,
        ilp_ms: ilp.elapsed_ms(),
        lp_objective,
        lp_ms: lp.elapsed_ms(),
        ratio: integrality_gap(ilp_objective, lp_objective),
    };
    info!(
        ilp = ilp_objective,
        lp = lp_objective,
        ratio = ?measurement.ratio,
        "integrality gap measured"
    );
    Ok(measurement)
}

/// One gap-table row; a failure is kept in the row instead of aborting.
pub fn gap_row(instance: impl Into<String>, graph: &Graph, solver: &dyn Solver) -> GapRow {
    GapRow {
        instance: instance.into(),
        outcome: compare_relaxation(graph, solver).map_err(|e| e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use combopt_model::{GoodLpSolver, VariableKind};

    fn triangle() -> Graph {
        Graph::from_weights(&[1.0, 1.0, 1.0], &[(0, 1, 1.0), (1, 2, 1.0), (0, 2, 1.0)]).unwrap()
    }

    fn five_cycle() -> Graph {
        let edges: Vec<(usize, usize, f64)> = (0..5).map(|i| (i, (i + 1) % 5, 1.0)).collect();
        Graph::from_weights(&[1.0; 5], &edges).unwrap()
    }

    #[test]
    fn test_closed_neighbourhood_rows() {
        let ds = build_dominating_set_model(&five_cycle()).unwrap();
        assert_eq!(ds.model.num_constraints(), 5);
        let row = &ds.model.constraints()[0];
        assert_eq!(row.expr().len(), 3);
        for j in [0, 1, 4] {
            assert_eq!(row.expr().coefficient(ds.selected.at(j)), Some(1.0));
        }
        assert_eq!(row.rhs(), 1.0);
    }

    #[test]
    fn test_relaxation_drops_integrality() {
        let ds = build_dominating_set_model(&triangle()).unwrap();
        assert_eq!(ds.model.num_integer_variables(), 3);
        let lp = ds.relaxed();
        assert_eq!(lp.model.num_integer_variables(), 0);
        let v = lp.model.variable(lp.selected.at(0)).unwrap();
        assert_eq!(v.kind, VariableKind::Continuous);
        assert_eq!((v.lower, v.upper), (0.0, 1.0));
    }

    #[test]
    fn test_triangle_has_no_gap() {
        let gap = compare_relaxation(&triangle(), &GoodLpSolver::new()).unwrap();
        assert!((gap.ilp_objective - 1.0).abs() < 1e-6);
        assert!((gap.lp_objective - 1.0).abs() < 1e-6);
        assert!((gap.ratio.unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_five_cycle_gap() {
        let gap = compare_relaxation(&five_cycle(), &GoodLpSolver::new()).unwrap();
        assert!((gap.ilp_objective - 2.0).abs() < 1e-6, "ilp = {}", gap.ilp_objective);
        assert!((gap.lp_objective - 5.0 / 3.0).abs() < 1e-6, "lp = {}", gap.lp_objective);
        assert!((gap.ratio.unwrap() - 1.2).abs() < 1e-6);
    }

    #[test]
    fn test_isolated_node_selects_itself() {
        let g = Graph::from_weights(&[3.0, 1.0, 1.0], &[(1, 2, 1.0)]).unwrap();
        let ds = build_dominating_set_model(&g).unwrap();
        let result = GoodLpSolver::new().solve(&ds.model);
        let chosen = ds.chosen_nodes(&result).unwrap();
        assert!(chosen.contains(&0));
        assert_eq!(chosen.len(), 2);
        assert!((result.objective_value - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_graph() {
        let g = Graph::from_weights(&[], &[]).unwrap();
        let gap = compare_relaxation(&g, &GoodLpSolver::new()).unwrap();
        assert_eq!(gap.ratio, Some(1.0));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let g = Graph::from_weights(&[1.0, -2.0], &[(0, 1, 1.0)]).unwrap();
        let row = gap_row("bad", &g, &GoodLpSolver::new());
        assert!(row.outcome.unwrap_err().contains("node weights"));
    }
}
