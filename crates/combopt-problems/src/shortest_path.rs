//! Shortest path through the LP dual.
//!
//! Every node carries a potential, the source is pinned to zero and each arc
//! `(i, j, w)` contributes `p[j] - p[i] <= w`. Maximising the destination
//! potential yields the shortest distance when all weights are non-negative.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use combopt_model::{
    LinearExpr, Model, ModelBuilder, SolutionStatus, SolveResult, UNBOUNDED, VarGroup, VarId, VariableKind,
};
use tracing::debug;

use crate::error::InvalidInstanceError;
use crate::graph::Graph;
use crate::report::Report;

/// How listed edges are turned into arcs.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EdgeOrientation {
    /// Only `from -> to`
    #[default]
    Directed,
    /// Both `from -> to` and `to -> from`
    Undirected,
}

#[derive(Debug, Clone)]
pub struct ShortestPathModel {
    pub model: Model,
    pub potentials: VarGroup,
    pub source: usize,
    pub destination: usize,
}

fn check_node(what: &str, node: usize, graph: &Graph) -> Result<(), InvalidInstanceError> {
    if node >= graph.num_nodes() {
        return Err(InvalidInstanceError::index(what, node, graph.num_nodes()));
    }
    Ok(())
}

fn check_weights(graph: &Graph) -> Result<(), InvalidInstanceError> {
    match graph.edges().iter().position(|e| e.weight < 0.0) {
        Some(i) => {
            let e = graph.edges()[i];
            Err(InvalidInstanceError::parameter(
                "edge weight",
                format!("edge {} ({} - {}) has negative weight {}", i, e.from, e.to, e.weight),
            ))
        }
        None => Ok(()),
    }
}

/// Arcs of `graph` under `orientation`, self-loops left out.
fn arcs(graph: &Graph, orientation: EdgeOrientation) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
    graph
        .edges()
        .iter()
        .filter(|e| e.from != e.to)
        .flat_map(move |e| {
            let reverse = (orientation == EdgeOrientation::Undirected).then_some((e.to, e.from, e.weight));
            std::iter::once((e.from, e.to, e.weight)).chain(reverse)
        })
}

pub fn build_shortest_path_model(
    graph: &Graph,
    source: usize,
    destination: usize,
    orientation: EdgeOrientation,
) -> Result<ShortestPathModel, InvalidInstanceError> {
    check_node("source node", source, graph)?;
    check_node("destination node", destination, graph)?;
    check_weights(graph)?;

    let mut builder = ModelBuilder::new("shortest path (LP dual)");
    let potentials = builder.add_group("potential", graph.num_nodes(), VariableKind::Continuous, 0.0, UNBOUNDED)?;

    builder.add_eq("source", LinearExpr::var(potentials.at(source)), 0.0)?;
    for (k, (from, to, weight)) in arcs(graph, orientation).enumerate() {
        let slack = LinearExpr::var(potentials.at(to)).with_term(-1.0, potentials.at(from));
        builder.add_le(format!("arc[{}] {}->{}", k, from, to), slack, weight)?;
    }
    builder.maximize(LinearExpr::var(potentials.at(destination)))?;

    debug!(
        nodes = graph.num_nodes(),
        arcs = builder.num_constraints() - 1,
        source,
        destination,
        "shortest path model assembled"
    );
    Ok(ShortestPathModel {
        model: builder.build()?,
        potentials,
        source,
        destination,
    })
}

impl ShortestPathModel {
    pub fn label(&self, var: VarId) -> String {
        match self.potentials.position(var) {
            Some(node) => format!("node {} potential", node),
            None => var.to_string(),
        }
    }

    /// Shortest distance from source to destination, when the solve was optimal.
    pub fn distance(&self, result: &SolveResult) -> Option<f64> {
        result.value(self.potentials.at(self.destination))
    }

    pub fn report(&self, result: &SolveResult) -> Report {
        let report = Report::from_solve(&self.model, result, |v| self.label(v))
            .with_parameter("source", self.source)
            .with_parameter("destination", self.destination);
        if result.status == SolutionStatus::Unbounded {
            report.with_note(format!(
                "destination unreachable: node {} has no path from node {}",
                self.destination, self.source
            ))
        } else {
            report
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Visit {
    node: usize,
    distance: f64,
}

impl PartialEq for Visit {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance && self.node == other.node
    }
}

impl Eq for Visit {}

impl PartialOrd for Visit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Visit {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap
        other
            .distance
            .partial_cmp(&self.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Dijkstra distances from `source`; `None` for unreachable nodes.
///
/// Independent of the LP model and used to check it. Weights are assumed
/// non-negative.
pub fn shortest_distances(graph: &Graph, source: usize, orientation: EdgeOrientation) -> Vec<Option<f64>> {
    let n = graph.num_nodes();
    let mut outgoing: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
    for (from, to, weight) in arcs(graph, orientation) {
        outgoing[from].push((to, weight));
    }

    let mut distances: Vec<Option<f64>> = vec![None; n];
    if source >= n {
        return distances;
    }
    let mut settled = vec![false; n];
    let mut heap = BinaryHeap::new();
    distances[source] = Some(0.0);
    heap.push(Visit {
        node: source,
        distance: 0.0,
    });

    while let Some(Visit { node, distance }) = heap.pop() {
        if settled[node] {
            continue;
        }
        settled[node] = true;
        for &(next, weight) in &outgoing[node] {
            let candidate = distance + weight;
            if distances[next].is_none_or(|d| candidate < d) {
                distances[next] = Some(candidate);
                heap.push(Visit {
                    node: next,
                    distance: candidate,
                });
            }
        }
    }
    distances
}

#[cfg(test)]
mod tests {
    use super::*;
    use combopt_model::{GoodLpSolver, Solver};

    fn three_nodes() -> Graph {
        Graph::from_weights(&[1.0, 1.0, 1.0], &[(0, 1, 5.0), (1, 2, 3.0)]).unwrap()
    }

    #[test]
    fn test_three_node_path() {
        let sp = build_shortest_path_model(&three_nodes(), 0, 2, EdgeOrientation::Directed).unwrap();
        assert_eq!(sp.model.num_variables(), 3);
        assert_eq!(sp.model.num_constraints(), 3);

        let result = GoodLpSolver::new().solve(&sp.model);
        assert!(result.is_optimal(), "status {}", result.status);
        let d = sp.distance(&result).unwrap();
        assert!((d - 8.0).abs() < 1e-6, "distance = {}", d);
        assert!((result.objective_value - 8.0).abs() < 1e-6);
        assert_eq!(sp.label(sp.potentials.at(1)), "node 1 potential");
    }

    #[test]
    fn test_shortcut_is_taken() {
        let g = Graph::from_weights(&[0.0; 4], &[(0, 1, 1.0), (1, 3, 1.0), (0, 2, 1.0), (2, 3, 5.0), (0, 3, 4.0)])
            .unwrap();
        let sp = build_shortest_path_model(&g, 0, 3, EdgeOrientation::Directed).unwrap();
        let d = sp.distance(&GoodLpSolver::new().solve(&sp.model)).unwrap();
        assert!((d - 2.0).abs() < 1e-6, "distance = {}", d);
        assert_eq!(shortest_distances(&g, 0, EdgeOrientation::Directed)[3], Some(2.0));
    }

    #[test]
    fn test_orientation() {
        let g = three_nodes();
        // Arcs only lead away from node 0
        let directed = build_shortest_path_model(&g, 2, 0, EdgeOrientation::Directed).unwrap();
        let result = GoodLpSolver::new().solve(&directed.model);
        assert_eq!(result.status, SolutionStatus::Unbounded);
        assert!(directed.report(&result).to_string().contains("destination unreachable"));

        let undirected = build_shortest_path_model(&g, 2, 0, EdgeOrientation::Undirected).unwrap();
        let d = undirected.distance(&GoodLpSolver::new().solve(&undirected.model)).unwrap();
        assert!((d - 8.0).abs() < 1e-6, "distance = {}", d);
    }

    #[test]
    fn test_zero_weight_edge() {
        let g = Graph::from_weights(&[0.0; 3], &[(0, 1, 0.0), (1, 2, 2.0)]).unwrap();
        let sp = build_shortest_path_model(&g, 0, 1, EdgeOrientation::Directed).unwrap();
        let d = sp.distance(&GoodLpSolver::new().solve(&sp.model)).unwrap();
        assert!(d.abs() < 1e-6, "distance = {}", d);
    }

    #[test]
    fn test_source_is_destination() {
        let sp = build_shortest_path_model(&three_nodes(), 1, 1, EdgeOrientation::Directed).unwrap();
        let d = sp.distance(&GoodLpSolver::new().solve(&sp.model)).unwrap();
        assert!(d.abs() < 1e-6);
    }

    #[test]
    fn test_invalid_instances() {
        assert!(matches!(
            build_shortest_path_model(&three_nodes(), 0, 7, EdgeOrientation::Directed),
            Err(InvalidInstanceError::IndexOutOfRange { index: 7, len: 3, .. })
        ));

        let g = Graph::from_weights(&[0.0; 2], &[(0, 1, -1.0)]).unwrap();
        assert!(matches!(
            build_shortest_path_model(&g, 0, 1, EdgeOrientation::Directed),
            Err(InvalidInstanceError::InvalidParameter { name: "edge weight", .. })
        ));
    }

    #[test]
    fn test_dijkstra_unreachable() {
        let g = Graph::from_weights(&[0.0; 4], &[(0, 1, 2.0), (1, 2, 2.0)]).unwrap();
        let d = shortest_distances(&g, 0, EdgeOrientation::Directed);
        assert_eq!(d, vec![Some(0.0), Some(2.0), Some(4.0), None]);
    }
}
