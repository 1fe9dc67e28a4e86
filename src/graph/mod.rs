//! Factor graph container
//!
//! A factor graph is an unordered collection of probabilistic constraints
//! (factors) over a shared set of variables, identified by [`Key`]s. The
//! container stores factors as optional shared handles: a removed factor
//! leaves a null slot behind instead of reindexing the remaining factors,
//! and a factor may be owned by several graphs at once (e.g. after
//! flattening a Bayes tree into a graph).

use std::any::Any;
use std::collections::BTreeSet;
use std::sync::Arc;

pub mod bayes_tree;

pub use bayes_tree::{depth_first_forest, BayesClique};

/// Unique identifier for a variable (pose) in the graph.
pub type Key = u64;

/// Pluggable key-naming function used by diagnostic output.
pub type KeyFormatter = dyn Fn(Key) -> String;

/// Default key naming: `x<key>`.
pub fn default_key_formatter(key: Key) -> String {
    format!("x{key}")
}

/// A probabilistic constraint over a subset of variables.
///
/// Factors are immutable once constructed and shared across graphs through
/// [`SharedFactor`] handles, which eliminates aliasing hazards.
pub trait Factor: Send + Sync {
    /// The ordered set of keys this factor involves.
    fn keys(&self) -> &[Key];

    /// Approximate equality against another factor with the given tolerance.
    ///
    /// Factors of different concrete types are never equal.
    fn approx_equals(&self, other: &dyn Factor, tolerance: f64) -> bool;

    /// Textual form of this factor using the given key formatter.
    fn describe(&self, key_formatter: &KeyFormatter) -> String;

    /// Downcasting support for consumers that need the concrete factor type.
    fn as_any(&self) -> &dyn Any;
}

/// Shared factor handle.
pub type SharedFactor = Arc<dyn Factor>;

/// Ordered container of optional factor handles.
///
/// Iteration order is stable and significant: [`FactorGraph::equals`]
/// compares slot-by-slot, so two graphs holding identical factors in
/// different orders are *not* equal. This order-sensitive contract is
/// intentional; callers relying on set semantics must canonicalize
/// themselves.
#[derive(Default, Clone)]
pub struct FactorGraph {
    factors: Vec<Option<SharedFactor>>,
}

impl FactorGraph {
    /// Creates a new, empty factor graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total slot count, including null slots.
    pub fn size(&self) -> usize {
        self.factors.len()
    }

    /// Number of non-null slots.
    pub fn nr_factors(&self) -> usize {
        self.factors.iter().filter(|slot| slot.is_some()).count()
    }

    /// True when the graph holds no slots at all.
    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    /// Append a factor, taking ownership.
    pub fn add<F: Factor + 'static>(&mut self, factor: F) {
        self.factors.push(Some(Arc::new(factor)));
    }

    /// Append a shared factor handle.
    pub fn add_shared(&mut self, factor: SharedFactor) {
        self.factors.push(Some(factor));
    }

    /// Null out a slot without reindexing; returns the removed handle.
    pub fn remove(&mut self, index: usize) -> Option<SharedFactor> {
        self.factors.get_mut(index).and_then(Option::take)
    }

    /// The factor at `index`, or `None` for out-of-range or null slots.
    pub fn at(&self, index: usize) -> Option<&SharedFactor> {
        self.factors.get(index).and_then(Option::as_ref)
    }

    /// Iterate over non-null factors together with their slot index.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &SharedFactor)> {
        self.factors
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|factor| (index, factor)))
    }

    /// The set of all keys touched by any non-null factor, deduplicated.
    pub fn keys(&self) -> BTreeSet<Key> {
        let mut all_keys = BTreeSet::new();
        for (_, factor) in self.iter() {
            all_keys.extend(factor.keys().iter().copied());
        }
        all_keys
    }

    /// Structural equality with the given tolerance.
    ///
    /// Returns false immediately if the slot counts differ; otherwise
    /// compares slot-by-slot in order (two nulls are equal, null paired with
    /// non-null is not, non-null pairs delegate to the factor's
    /// [`Factor::approx_equals`]). Order-sensitive by contract, see the type
    /// level documentation.
    pub fn equals(&self, other: &FactorGraph, tolerance: f64) -> bool {
        if self.factors.len() != other.factors.len() {
            return false;
        }
        self.factors
            .iter()
            .zip(&other.factors)
            .all(|(a, b)| match (a, b) {
                (None, None) => true,
                (Some(f1), Some(f2)) => f1.approx_equals(f2.as_ref(), tolerance),
                _ => false,
            })
    }

    /// Flatten a clique forest into this graph.
    ///
    /// Walks the forest depth-first and appends every clique's conditional
    /// through an ordinary append, so the resulting order is the
    /// deterministic single-threaded traversal order: each subtree completes
    /// before a sibling starts.
    pub fn push_back_from_tree(&mut self, roots: &[BayesClique]) {
        depth_first_forest(roots, &mut |clique| {
            self.add_shared(clique.conditional().clone());
        });
    }

    /// Render the graph as text: label, slot count, then one line per slot.
    pub fn render(&self, label: &str, key_formatter: &KeyFormatter) -> String {
        let mut out = String::new();
        out.push_str(label);
        out.push('\n');
        out.push_str(&format!("size: {}\n", self.size()));
        for (index, slot) in self.factors.iter().enumerate() {
            match slot {
                Some(factor) => {
                    out.push_str(&format!("factor {index}: {}\n", factor.describe(key_formatter)));
                }
                None => out.push_str(&format!("factor {index}: <removed>\n")),
            }
        }
        out
    }

    /// Diagnostic dump of the graph through the logging layer.
    pub fn print(&self, label: &str, key_formatter: &KeyFormatter) {
        tracing::info!("{}", self.render(label, key_formatter));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal test factor carrying keys and a scalar value.
    #[derive(Debug)]
    struct TestFactor {
        keys: Vec<Key>,
        value: f64,
    }

    impl TestFactor {
        fn new(keys: Vec<Key>, value: f64) -> Self {
            Self { keys, value }
        }
    }

    impl Factor for TestFactor {
        fn keys(&self) -> &[Key] {
            &self.keys
        }

        fn approx_equals(&self, other: &dyn Factor, tolerance: f64) -> bool {
            match other.as_any().downcast_ref::<TestFactor>() {
                Some(other) => {
                    self.keys == other.keys && (self.value - other.value).abs() <= tolerance
                }
                None => false,
            }
        }

        fn describe(&self, key_formatter: &KeyFormatter) -> String {
            let names: Vec<String> = self.keys.iter().map(|&k| key_formatter(k)).collect();
            format!("TestFactor({}) = {}", names.join(", "), self.value)
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn example_graph() -> FactorGraph {
        let mut graph = FactorGraph::new();
        graph.add(TestFactor::new(vec![0, 1], 1.0));
        graph.add(TestFactor::new(vec![1, 2], 2.0));
        graph.add(TestFactor::new(vec![2, 3], 3.0));
        graph.add(TestFactor::new(vec![2, 0], 4.0));
        graph.add(TestFactor::new(vec![0, 3], 5.0));
        graph
    }

    #[test]
    fn test_size_counts_null_slots() {
        let mut graph = example_graph();
        assert_eq!(graph.size(), 5);
        assert_eq!(graph.nr_factors(), 5);

        let removed = graph.remove(2);
        assert!(removed.is_some());
        assert_eq!(graph.size(), 5);
        assert_eq!(graph.nr_factors(), 4);
        assert!(graph.at(2).is_none());
        assert!(graph.at(3).is_some());
    }

    #[test]
    fn test_keys_deduplicated() {
        let graph = example_graph();
        let keys: Vec<Key> = graph.keys().into_iter().collect();
        assert_eq!(keys, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_equals_elementwise() {
        let graph_a = example_graph();
        let graph_b = example_graph();
        assert!(graph_a.equals(&graph_b, 1e-9));
    }

    #[test]
    fn test_equals_is_order_sensitive() {
        let graph_a = example_graph();
        let mut graph_b = FactorGraph::new();
        // Same factors with the first adjacent pair swapped
        graph_b.add(TestFactor::new(vec![1, 2], 2.0));
        graph_b.add(TestFactor::new(vec![0, 1], 1.0));
        graph_b.add(TestFactor::new(vec![2, 3], 3.0));
        graph_b.add(TestFactor::new(vec![2, 0], 4.0));
        graph_b.add(TestFactor::new(vec![0, 3], 5.0));
        assert!(!graph_a.equals(&graph_b, 1e-9));
    }

    #[test]
    fn test_equals_null_pairing() {
        let mut graph_a = example_graph();
        let mut graph_b = example_graph();

        graph_a.remove(1);
        assert!(!graph_a.equals(&graph_b, 1e-9));

        graph_b.remove(1);
        assert!(graph_a.equals(&graph_b, 1e-9));
    }

    #[test]
    fn test_equals_size_mismatch() {
        let graph_a = example_graph();
        let mut graph_b = example_graph();
        graph_b.add(TestFactor::new(vec![3, 0], 6.0));
        assert!(!graph_a.equals(&graph_b, 1e-9));
    }

    #[test]
    fn test_equals_within_tolerance() {
        let mut graph_a = FactorGraph::new();
        let mut graph_b = FactorGraph::new();
        graph_a.add(TestFactor::new(vec![0, 1], 1.0));
        graph_b.add(TestFactor::new(vec![0, 1], 1.0 + 1e-10));
        assert!(graph_a.equals(&graph_b, 1e-9));
        assert!(!graph_a.equals(&graph_b, 1e-12));
    }

    #[test]
    fn test_render_lists_factors() {
        let mut graph = example_graph();
        graph.remove(0);
        let text = graph.render("test graph", &default_key_formatter);
        assert!(text.contains("test graph"));
        assert!(text.contains("size: 5"));
        assert!(text.contains("factor 0: <removed>"));
        assert!(text.contains("factor 1: TestFactor(x1, x2) = 2"));
    }

    #[test]
    fn test_push_back_from_tree_depth_first() {
        // Forest:  a          d
        //         / \
        //        b   c
        let leaf = |keys: Vec<Key>, value: f64| {
            BayesClique::new(Arc::new(TestFactor::new(keys, value)) as SharedFactor)
        };
        let mut root_a = leaf(vec![0], 1.0);
        root_a.add_child(leaf(vec![1], 2.0));
        root_a.add_child(leaf(vec![2], 3.0));
        let root_d = leaf(vec![3], 4.0);

        let mut graph = FactorGraph::new();
        graph.push_back_from_tree(&[root_a, root_d]);

        assert_eq!(graph.size(), 4);
        let values: Vec<Vec<Key>> = graph
            .iter()
            .map(|(_, factor)| factor.keys().to_vec())
            .collect();
        assert_eq!(values, vec![vec![0], vec![1], vec![2], vec![3]]);
    }

    #[test]
    fn test_shared_factor_lives_in_two_graphs() {
        let factor: SharedFactor = Arc::new(TestFactor::new(vec![0, 1], 1.0));
        let mut graph_a = FactorGraph::new();
        let mut graph_b = FactorGraph::new();
        graph_a.add_shared(factor.clone());
        graph_b.add_shared(factor);
        assert!(graph_a.equals(&graph_b, 1e-9));
    }
}
