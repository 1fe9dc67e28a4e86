//! Rotation-only subgraph extraction
//!
//! Scans a pose graph and produces a reduced graph whose edges carry only
//! the relative-rotation component of each measurement. Prior-pose factors
//! become edges to the synthetic anchor, which is held at identity by the
//! solver stages.

use crate::error::{InitError, InitResult};
use crate::factors::{BetweenFactorSE3, BetweenFactorSO3, PriorFactorSE3};
use crate::graph::{FactorGraph, Key};
use crate::init::ANCHOR_KEY;

fn check_key(key: Key, slot: usize) -> InitResult<()> {
    if key == ANCHOR_KEY {
        return Err(InitError::InvalidInput(format!(
            "factor {slot} uses the reserved anchor key {ANCHOR_KEY}"
        )));
    }
    Ok(())
}

/// Build the rotation-only graph from a pose graph.
///
/// Between-pose factors are replaced by between-rotation factors carrying
/// the rotation component of the measurement and the precision of its noise
/// model; prior-pose factors become between-rotation edges from the anchor
/// to the prior's key, carrying the prior rotation. Null slots are skipped.
///
/// Any other factor type is a hard error: the extractor cannot know how to
/// reduce it.
pub fn build_rotation_graph(graph: &FactorGraph) -> InitResult<FactorGraph> {
    let mut rotation_graph = FactorGraph::new();

    for (slot, factor) in graph.iter() {
        let any = factor.as_any();
        if let Some(between) = any.downcast_ref::<BetweenFactorSE3>() {
            check_key(between.key1(), slot)?;
            check_key(between.key2(), slot)?;
            rotation_graph.add(BetweenFactorSO3::new(
                between.key1(),
                between.key2(),
                *between.measured.rotation(),
                between.noise.precision(),
            ));
        } else if let Some(prior) = any.downcast_ref::<PriorFactorSE3>() {
            check_key(prior.key(), slot)?;
            rotation_graph.add(BetweenFactorSO3::new(
                ANCHOR_KEY,
                prior.key(),
                *prior.prior.rotation(),
                prior.noise.precision(),
            ));
        } else {
            return Err(InitError::MalformedInput(format!(
                "factor {slot} is neither a between-pose nor a prior-pose constraint"
            )));
        }
    }

    Ok(rotation_graph)
}
