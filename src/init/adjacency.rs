//! Adjacency index of the rotation graph
//!
//! For each key, the ordered list of incident edge indices, plus a parallel
//! map from edge index to the stored relative-rotation measurement and its
//! weight. Edge indices are the slot indices of the rotation graph, so
//! endpoints receive them in factor-insertion order. The structure is
//! rebuilt fresh per initialization call and discarded afterwards.

use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::error::{InitError, InitResult};
use crate::factors::BetweenFactorSO3;
use crate::graph::{FactorGraph, Key};
use crate::manifold::SO3;

/// One edge of the rotation graph: endpoints, measured relative rotation,
/// scalar weight.
#[derive(Clone, Debug)]
pub struct RotationEdge {
    pub keys: [Key; 2],
    pub rotation: SO3,
    pub weight: f64,
}

/// Adjacency index over a rotation-only graph.
pub struct RotationAdjacency {
    edges_by_key: BTreeMap<Key, Vec<usize>>,
    edges: HashMap<usize, RotationEdge>,
}

/// Build the adjacency index from a rotation-only graph.
///
/// Every non-null factor must be a [`BetweenFactorSO3`]; anything else is a
/// malformed-input error.
pub fn build_adjacency(rotation_graph: &FactorGraph) -> InitResult<RotationAdjacency> {
    let mut edges_by_key: BTreeMap<Key, Vec<usize>> = BTreeMap::new();
    let mut edges: HashMap<usize, RotationEdge> = HashMap::new();

    for (index, factor) in rotation_graph.iter() {
        let edge = factor
            .as_any()
            .downcast_ref::<BetweenFactorSO3>()
            .ok_or_else(|| {
                InitError::MalformedInput(format!(
                    "factor {index} of the rotation graph is not a between-rotation constraint"
                ))
            })?;

        edges_by_key.entry(edge.key1()).or_default().push(index);
        edges_by_key.entry(edge.key2()).or_default().push(index);
        edges.insert(
            index,
            RotationEdge {
                keys: [edge.key1(), edge.key2()],
                rotation: edge.measured,
                weight: edge.weight,
            },
        );
    }

    Ok(RotationAdjacency {
        edges_by_key,
        edges,
    })
}

impl RotationAdjacency {
    /// Edge indices incident to `key`, in factor-insertion order.
    pub fn incident_edges(&self, key: Key) -> &[usize] {
        self.edges_by_key
            .get(&key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The edge stored under `index`.
    pub fn edge(&self, index: usize) -> Option<&RotationEdge> {
        self.edges.get(&index)
    }

    /// All keys of the graph (including the anchor), ascending.
    pub fn keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.edges_by_key.keys().copied()
    }

    /// Number of nodes, including the anchor when present.
    pub fn num_nodes(&self) -> usize {
        self.edges_by_key.len()
    }

    /// Number of edges.
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Largest node degree.
    pub fn max_degree(&self) -> usize {
        self.edges_by_key
            .values()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
    }

    /// Largest edge weight.
    pub fn max_weight(&self) -> f64 {
        self.edges
            .values()
            .map(|edge| edge.weight)
            .fold(0.0, f64::max)
    }

    /// Keys with no path to `root`, ascending.
    ///
    /// When `root` itself is absent from the graph every key is reported:
    /// nothing is reachable. The solver stages use this to reject graphs
    /// whose orientations would otherwise be meaningless.
    pub fn disconnected_from(&self, root: Key) -> Vec<Key> {
        if !self.edges_by_key.contains_key(&root) {
            return self.keys().collect();
        }

        let mut reached: BTreeMap<Key, bool> =
            self.keys().map(|key| (key, key == root)).collect();
        let mut queue = VecDeque::from([root]);
        while let Some(current) = queue.pop_front() {
            for &edge_index in self.incident_edges(current) {
                if let Some(edge) = self.edges.get(&edge_index) {
                    for &neighbor in &edge.keys {
                        if let Some(seen) = reached.get_mut(&neighbor) {
                            if !*seen {
                                *seen = true;
                                queue.push_back(neighbor);
                            }
                        }
                    }
                }
            }
        }

        reached
            .into_iter()
            .filter_map(|(key, seen)| (!seen).then_some(key))
            .collect()
    }
}
