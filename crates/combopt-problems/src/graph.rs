//! Weighted graph with node and edge weights.
//!
//! Built once from a [`GraphData`] record and read-only afterwards. Adjacency
//! is undirected; edges keep the orientation they were listed with so the
//! shortest-path model can treat them as directed arcs.

use crate::error::MalformedInputError;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub id: usize,
    pub weight: f64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub from: usize,
    pub to: usize,
    pub weight: f64,
}

impl Edge {
    /// The endpoint opposite `node`, if `node` is an endpoint.
    pub fn other(&self, node: usize) -> Option<usize> {
        if self.from == node {
            Some(self.to)
        } else if self.to == node {
            Some(self.from)
        } else {
            None
        }
    }
}

/// Parsed but unvalidated graph description: declared counts plus the
/// records actually present.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphData {
    pub declared_nodes: usize,
    pub declared_edges: usize,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Graph {
    /// Node weight, indexed by node id
    node_weights: Vec<f64>,
    edges: Vec<Edge>,
    /// Indices into `edges` for every edge touching a node. A self-loop is
    /// listed twice.
    incident: Vec<Vec<usize>>,
}

impl Graph {
    /// Validate `data` and build the graph.
    pub fn load(data: GraphData) -> Result<Self, MalformedInputError> {
        if data.nodes.len() != data.declared_nodes {
            return Err(MalformedInputError::CountMismatch {
                what: "nodes",
                declared: data.declared_nodes,
                found: data.nodes.len(),
            });
        }
        if data.edges.len() != data.declared_edges {
            return Err(MalformedInputError::CountMismatch {
                what: "edges",
                declared: data.declared_edges,
                found: data.edges.len(),
            });
        }

        let n = data.declared_nodes;
        let mut node_weights: Vec<Option<f64>> = vec![None; n];
        for node in &data.nodes {
            if node.id >= n {
                return Err(MalformedInputError::NodeIdOutOfRange { id: node.id, nodes: n });
            }
            if !node.weight.is_finite() {
                return Err(MalformedInputError::NonFiniteWeight(format!("node {}", node.id)));
            }
            if node_weights[node.id].replace(node.weight).is_some() {
                return Err(MalformedInputError::DuplicateNodeId(node.id));
            }
        }

        let mut incident = vec![Vec::new(); n];
        for (i, edge) in data.edges.iter().enumerate() {
            for node in [edge.from, edge.to] {
                if node >= n {
                    return Err(MalformedInputError::EndpointOutOfRange { edge: i, node, nodes: n });
                }
            }
            if !edge.weight.is_finite() {
                return Err(MalformedInputError::NonFiniteWeight(format!(
                    "edge {} ({} - {})",
                    i, edge.from, edge.to
                )));
            }
            incident[edge.from].push(i);
            incident[edge.to].push(i);
        }

        Ok(Self {
            // Every slot is filled: n distinct ids below n.
            node_weights: node_weights.into_iter().map(|w| w.unwrap_or_default()).collect(),
            edges: data.edges,
            incident,
        })
    }

    /// Build from node weights (ids are positions) and `(from, to, weight)` edges.
    pub fn from_weights(node_weights: &[f64], edges: &[(usize, usize, f64)]) -> Result<Self, MalformedInputError> {
        Self::load(GraphData {
            declared_nodes: node_weights.len(),
            declared_edges: edges.len(),
            nodes: node_weights
                .iter()
                .enumerate()
                .map(|(id, &weight)| Node { id, weight })
                .collect(),
            edges: edges
                .iter()
                .map(|&(from, to, weight)| Edge { from, to, weight })
                .collect(),
        })
    }

    pub fn num_nodes(&self) -> usize {
        self.node_weights.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_weights(&self) -> &[f64] {
        &self.node_weights
    }

    pub fn node_weight(&self, i: usize) -> Option<f64> {
        self.node_weights.get(i).copied()
    }

    /// True iff some edge connects `i` and `j`, in either direction.
    pub fn is_adjacent(&self, i: usize, j: usize) -> bool {
        self.incident_edges(i).any(|e| e.other(i) == Some(j))
    }

    /// Weight of the lightest edge between `i` and `j`, or `None` when there is
    /// no such edge. A zero-weight edge is `Some(0.0)`.
    pub fn edge_weight(&self, i: usize, j: usize) -> Option<f64> {
        self.incident_edges(i)
            .filter(|e| e.other(i) == Some(j))
            .map(|e| e.weight)
            .reduce(f64::min)
    }

    /// Number of incident edges; a self-loop counts twice. Zero for unknown nodes.
    pub fn degree(&self, i: usize) -> usize {
        self.incident.get(i).map_or(0, Vec::len)
    }

    /// Distinct nodes adjacent to `i`, in ascending order.
    pub fn neighbors(&self, i: usize) -> Vec<usize> {
        let mut out: Vec<usize> = self.incident_edges(i).filter_map(|e| e.other(i)).collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    fn incident_edges(&self, i: usize) -> impl Iterator<Item = &Edge> + '_ {
        self.incident
            .get(i)
            .into_iter()
            .flatten()
            .map(move |&e| &self.edges[e])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_graph() -> Graph {
        Graph::from_weights(&[1.0, 2.0, 3.0], &[(0, 1, 5.0), (1, 2, 3.0)]).unwrap()
    }

    #[test]
    fn test_adjacency_is_symmetric() {
        let g = path_graph();
        assert!(g.is_adjacent(0, 1));
        assert!(g.is_adjacent(1, 0));
        assert!(!g.is_adjacent(0, 2));
        assert!(!g.is_adjacent(0, 0));
        assert!(!g.is_adjacent(7, 0));
    }

    #[test]
    fn test_zero_weight_edge_is_not_missing() {
        let g = Graph::from_weights(&[1.0, 1.0, 1.0], &[(0, 1, 0.0)]).unwrap();
        assert_eq!(g.edge_weight(0, 1), Some(0.0));
        assert_eq!(g.edge_weight(1, 0), Some(0.0));
        assert_eq!(g.edge_weight(1, 2), None);
    }

    #[test]
    fn test_parallel_edges_report_lightest() {
        let g = Graph::from_weights(&[1.0, 1.0], &[(0, 1, 4.0), (1, 0, 2.5)]).unwrap();
        assert_eq!(g.edge_weight(0, 1), Some(2.5));
        assert_eq!(g.degree(0), 2);
        assert_eq!(g.neighbors(0), vec![1]);
    }

    #[test]
    fn test_degree_and_weights() {
        let g = path_graph();
        assert_eq!(g.degree(0), 1);
        assert_eq!(g.degree(1), 2);
        assert_eq!(g.degree(9), 0);
        assert_eq!(g.node_weight(2), Some(3.0));
        assert_eq!(g.node_weight(3), None);
        assert_eq!(g.neighbors(1), vec![0, 2]);
    }

    #[test]
    fn test_self_loop_counts_twice() {
        let g = Graph::from_weights(&[1.0], &[(0, 0, 1.0)]).unwrap();
        assert_eq!(g.degree(0), 2);
        assert!(g.is_adjacent(0, 0));
    }

    #[test]
    fn test_node_ids_out_of_order() {
        let data = GraphData {
            declared_nodes: 2,
            declared_edges: 0,
            nodes: vec![Node { id: 1, weight: 7.0 }, Node { id: 0, weight: 3.0 }],
            edges: vec![],
        };
        let g = Graph::load(data).unwrap();
        assert_eq!(g.node_weights(), &[3.0, 7.0]);
    }

    #[test]
    fn test_count_mismatch() {
        let data = GraphData {
            declared_nodes: 3,
            declared_edges: 0,
            nodes: vec![Node { id: 0, weight: 1.0 }],
            edges: vec![],
        };
        assert_eq!(
            Graph::load(data).unwrap_err(),
            MalformedInputError::CountMismatch {
                what: "nodes",
                declared: 3,
                found: 1
            }
        );

        let data = GraphData {
            declared_nodes: 1,
            declared_edges: 2,
            nodes: vec![Node { id: 0, weight: 1.0 }],
            edges: vec![Edge { from: 0, to: 0, weight: 1.0 }],
        };
        assert!(matches!(
            Graph::load(data),
            Err(MalformedInputError::CountMismatch { what: "edges", .. })
        ));
    }

    #[test]
    fn test_out_of_range_endpoint() {
        let err = Graph::from_weights(&[1.0, 1.0], &[(0, 2, 1.0)]).unwrap_err();
        assert_eq!(err, MalformedInputError::EndpointOutOfRange { edge: 0, node: 2, nodes: 2 });
    }

    #[test]
    fn test_duplicate_and_out_of_range_ids() {
        let dup = GraphData {
            declared_nodes: 2,
            declared_edges: 0,
            nodes: vec![Node { id: 0, weight: 1.0 }, Node { id: 0, weight: 1.0 }],
            edges: vec![],
        };
        assert_eq!(Graph::load(dup).unwrap_err(), MalformedInputError::DuplicateNodeId(0));

        let far = GraphData {
            declared_nodes: 1,
            declared_edges: 0,
            nodes: vec![Node { id: 4, weight: 1.0 }],
            edges: vec![],
        };
        assert_eq!(
            Graph::load(far).unwrap_err(),
            MalformedInputError::NodeIdOutOfRange { id: 4, nodes: 1 }
        );
    }

    #[test]
    fn test_non_finite_weight() {
        assert!(matches!(
            Graph::from_weights(&[f64::NAN], &[]),
            Err(MalformedInputError::NonFiniteWeight(_))
        ));
        assert!(matches!(
            Graph::from_weights(&[1.0, 1.0], &[(0, 1, f64::INFINITY)]),
            Err(MalformedInputError::NonFiniteWeight(_))
        ));
    }
}
