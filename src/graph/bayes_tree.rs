//! Clique forest (Bayes tree) traversal
//!
//! A Bayes tree is the cluster tree produced by eliminating a factor graph;
//! each clique holds a conditional factor and zero or more child cliques.
//! Tree construction itself is an external concern; this module only models
//! the structure the container needs in order to flatten a tree back into a
//! flat factor list, plus the generic depth-first traversal driver.

use crate::graph::SharedFactor;

/// A node of a clique forest: a conditional factor plus child cliques.
#[derive(Clone)]
pub struct BayesClique {
    conditional: SharedFactor,
    children: Vec<BayesClique>,
}

impl BayesClique {
    /// Create a leaf clique holding the given conditional.
    pub fn new(conditional: SharedFactor) -> Self {
        Self {
            conditional,
            children: Vec::new(),
        }
    }

    /// Create a clique with children.
    pub fn with_children(conditional: SharedFactor, children: Vec<BayesClique>) -> Self {
        Self {
            conditional,
            children,
        }
    }

    /// Attach a child clique.
    pub fn add_child(&mut self, child: BayesClique) {
        self.children.push(child);
    }

    /// The conditional factor of this clique.
    pub fn conditional(&self) -> &SharedFactor {
        &self.conditional
    }

    /// The child cliques.
    pub fn children(&self) -> &[BayesClique] {
        &self.children
    }
}

/// Depth-first traversal of a clique forest.
///
/// Visits every clique exactly once: each root, then its subtrees in order,
/// with a full subtree completing before a sibling starts. The visitor is an
/// ordinary callback, so callers decide what per-clique state to accumulate.
pub fn depth_first_forest<'a, F>(roots: &'a [BayesClique], visit: &mut F)
where
    F: FnMut(&'a BayesClique),
{
    for clique in roots {
        visit(clique);
        depth_first_forest(clique.children(), visit);
    }
}
