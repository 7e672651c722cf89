//! Log-likelihood scoring of networks against a dataset.
//!
//! Every row contributes `ln P(x_i | parents(x_i))` for each scored
//! variable, looked up in the variable's CPT. The CPT epsilon floor keeps
//! every term finite; the only way to obtain `-inf` is the explicit cutoff
//! of [`score_bounded`].

use scirs2_core::ndarray::IxDyn;
use std::collections::BTreeMap;

use crate::dataset::Dataset;
use crate::error::{BnError, Result};
use crate::network::{Network, NodeId};

/// Total log-likelihood of `nodes` (all nodes when `None`).
///
/// The result is stored as the network's score.
pub fn likelihood(network: &mut Network, data: &Dataset, nodes: Option<&[NodeId]>) -> Result<f64> {
    score_bounded(network, data, f64::NEG_INFINITY, nodes)
}

/// Log-likelihood with early termination.
///
/// Variables are accumulated in index order; as soon as the running sum
/// falls below `cutoff` the scan stops and `-inf` is stored and returned.
/// A cutoff of `-inf` never triggers, giving exactly [`likelihood`].
pub fn score_bounded(
    network: &mut Network,
    data: &Dataset,
    cutoff: f64,
    nodes: Option<&[NodeId]>,
) -> Result<f64> {
    data.check_against(network)?;
    let targets: Vec<NodeId> = match nodes {
        Some(ids) => ids.to_vec(),
        None => network.node_ids().collect(),
    };

    let mut total = 0.0;
    for id in targets {
        total += node_log_likelihood(network, data, id)?;
        if total < cutoff {
            total = f64::NEG_INFINITY;
            break;
        }
    }

    network.set_score(total);
    Ok(total)
}

/// Log-likelihood restricted to the two endpoints of `edge` and all of
/// their ancestors. The network's own score is left untouched.
pub fn edge_score(network: &Network, data: &Dataset, edge: (NodeId, NodeId)) -> Result<f64> {
    data.check_against(network)?;
    for id in [edge.0, edge.1] {
        if network.node(id).is_none() {
            return Err(BnError::NodeNotFound(format!("#{}", id)));
        }
    }

    network
        .ancestors(&[edge.0, edge.1])
        .into_iter()
        .map(|id| node_log_likelihood(network, data, id))
        .sum()
}

/// [`edge_score`] for every edge of the network.
pub fn edge_scores(network: &Network, data: &Dataset) -> Result<BTreeMap<(NodeId, NodeId), f64>> {
    network
        .edges()
        .map(|edge| edge_score(network, data, edge).map(|score| (edge, score)))
        .collect()
}

fn node_log_likelihood(network: &Network, data: &Dataset, id: NodeId) -> Result<f64> {
    let node = network
        .node(id)
        .ok_or_else(|| BnError::NodeNotFound(format!("#{}", id)))?;
    let cpt = node
        .cpt()
        .ok_or_else(|| BnError::MissingCpt(node.label().to_string()))?;
    if !network.cpt_is_current(id) {
        return Err(BnError::StaleCpt(node.label().to_string()));
    }

    let mut index = vec![0; cpt.cptdim.len()];
    let mut sum = 0.0;
    for row in data.values().rows() {
        for (slot, dim) in index.iter_mut().zip(&cpt.cptdim) {
            *slot = row[dim.index()];
        }
        sum += cpt.probs[IxDyn(&index)].ln();
    }
    Ok(sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpt::{CptEstimator, EPSILON_FLOOR};
    use approx::assert_abs_diff_eq;

    fn scored_collider(rows: &[Vec<usize>]) -> (Network, Dataset) {
        let mut net =
            Network::from_edges([("A", 2), ("B", 2), ("C", 2)], &[("A", "C"), ("B", "C")])
                .unwrap();
        let data = Dataset::from_rows(rows, &net).unwrap();
        CptEstimator::new().estimate(&mut net, &data, None).unwrap();
        (net, data)
    }

    fn sample_rows() -> Vec<Vec<usize>> {
        vec![
            vec![0, 0, 0],
            vec![0, 1, 1],
            vec![1, 0, 1],
            vec![1, 1, 0],
            vec![0, 0, 0],
            vec![1, 1, 1],
        ]
    }

    #[test]
    fn test_likelihood_matches_hand_computation() {
        let (mut net, data) = scored_collider(&[vec![0, 0, 0], vec![0, 0, 1], vec![1, 1, 1]]);
        let ll = likelihood(&mut net, &data, None).unwrap();

        // A: 2/3, 2/3, 1/3; B: same; C|A,B: 1/2, 1/2, 1.
        let expected = 2.0 * ((2.0f64 / 3.0).ln() * 2.0 + (1.0f64 / 3.0).ln())
            + 2.0 * 0.5f64.ln();
        assert_abs_diff_eq!(ll, expected, epsilon = 1e-12);
        assert_eq!(net.score(), Some(ll));
    }

    #[test]
    fn test_unbounded_cutoff_equals_likelihood() {
        let (mut net, data) = scored_collider(&sample_rows());
        let full = likelihood(&mut net, &data, None).unwrap();
        let bounded = score_bounded(&mut net, &data, f64::NEG_INFINITY, None).unwrap();
        assert_eq!(full, bounded);
    }

    #[test]
    fn test_cutoff_short_circuits() {
        let (mut net, data) = scored_collider(&sample_rows());
        let full = likelihood(&mut net, &data, None).unwrap();

        let cut = score_bounded(&mut net, &data, full + 1.0, None).unwrap();
        assert_eq!(cut, f64::NEG_INFINITY);
        assert_eq!(net.score(), Some(f64::NEG_INFINITY));

        let kept = score_bounded(&mut net, &data, full - 1.0, None).unwrap();
        assert_eq!(kept, full);
    }

    #[test]
    fn test_empty_dataset_is_finite() {
        let (mut net, data) = scored_collider(&[]);
        let ll = likelihood(&mut net, &data, None).unwrap();
        assert!(ll.is_finite());
        assert!(!ll.is_nan());
        assert!(ll <= 0.0);
    }

    #[test]
    fn test_floor_keeps_unseen_states_finite() {
        let (mut net, _) = scored_collider(&[vec![0, 0, 0]]);
        let unseen = Dataset::from_rows(&[vec![1, 1, 1]], &net).unwrap();
        let ll = likelihood(&mut net, &unseen, None).unwrap();
        assert!(ll.is_finite());
        assert_abs_diff_eq!(ll, 3.0 * EPSILON_FLOOR.ln(), epsilon = 1e-9);
    }

    #[test]
    fn test_subset_of_nodes() {
        let (mut net, data) = scored_collider(&sample_rows());
        let a = likelihood(&mut net, &data, Some(&[NodeId(0)])).unwrap();
        let b = likelihood(&mut net, &data, Some(&[NodeId(1)])).unwrap();
        let c = likelihood(&mut net, &data, Some(&[NodeId(2)])).unwrap();
        let all = likelihood(&mut net, &data, None).unwrap();
        assert_abs_diff_eq!(a + b + c, all, epsilon = 1e-12);
    }

    #[test]
    fn test_edge_score_uses_ancestor_closure() {
        let (mut net, data) = scored_collider(&sample_rows());
        let all = likelihood(&mut net, &data, None).unwrap();
        let edge = edge_score(&net, &data, (NodeId(0), NodeId(2))).unwrap();
        // Ancestors of {A, C} are all three nodes.
        assert_abs_diff_eq!(edge, all, epsilon = 1e-12);

        let scores = edge_scores(&net, &data).unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(net.score(), Some(all));
    }

    #[test]
    fn test_stale_cpt_is_rejected() {
        let (mut net, data) = scored_collider(&sample_rows());
        net.add_edge("A", "B").unwrap();
        assert!(matches!(
            likelihood(&mut net, &data, None),
            Err(BnError::StaleCpt(label)) if label == "B"
        ));
    }

    #[test]
    fn test_out_of_range_rows_are_rejected() {
        let (mut net, _) = scored_collider(&sample_rows());
        let wide = Network::with_nodes([("A", 2), ("B", 2), ("C", 4)]).unwrap();
        let data = Dataset::from_rows(&[vec![0, 1, 3]], &wide).unwrap();
        assert!(matches!(
            score_bounded(&mut net, &data, f64::NEG_INFINITY, None),
            Err(BnError::InvalidState { ref node, value: 3, .. }) if node == "C"
        ));
        assert!(matches!(
            edge_score(&net, &data, (NodeId(0), NodeId(2))),
            Err(BnError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_missing_cpt_is_rejected() {
        let mut net = Network::with_nodes([("A", 2)]).unwrap();
        let data = Dataset::from_rows(&[vec![1]], &net).unwrap();
        assert!(matches!(
            likelihood(&mut net, &data, None),
            Err(BnError::MissingCpt(_))
        ));
    }
}
