//! Conditional probability table estimation from count data.
//!
//! For a node with parents `p1..pk` the table axes are `[p1, .., pk, node]`
//! (`cptdim`). Counts are gathered in a single pass over the dataset into a
//! contingency table over those axes:
//!
//! - `numer[s]` counts rows whose joint state over `cptdim` equals `s`;
//! - `denom[s]` counts rows matching only the parent prefix of `s`
//!   (stored broadcast along the node's own axis);
//! - `probs[s] = numer[s] / denom[s]`, or [`EPSILON_FLOOR`] when either is 0.
//!
//! Node tables are independent once the edge relation is fixed, so they are
//! computed with a rayon parallel map and written back afterwards.

use rayon::prelude::*;
use scirs2_core::ndarray::{ArrayD, IxDyn};
use scirs2_core::random::Rng;

use crate::dataset::Dataset;
use crate::error::{BnError, Result};
use crate::network::{Network, NodeId};

/// Smallest positive probability stored in a CPT.
pub const EPSILON_FLOOR: f64 = f64::MIN_POSITIVE;

/// Conditional probability table of one node.
#[derive(Clone, Debug, PartialEq)]
pub struct Cpt {
    /// Axis order: parents in index order, then the node itself.
    pub cptdim: Vec<NodeId>,
    /// Joint counts over `cptdim`.
    pub numer: ArrayD<u64>,
    /// Parent-configuration counts, broadcast along the last axis.
    pub denom: ArrayD<u64>,
    /// `P(node | parents)`, never exactly zero.
    pub probs: ArrayD<f64>,
}

impl Cpt {
    /// Table shape (state counts along `cptdim`).
    pub fn shape(&self) -> &[usize] {
        self.probs.shape()
    }

    /// Probability of a full joint state over `cptdim`.
    pub fn prob(&self, states: &[usize]) -> Option<f64> {
        self.probs.get(IxDyn(states)).copied()
    }
}

/// Maximum-likelihood CPT estimator with optional blending toward the
/// previous estimate.
#[derive(Clone, Debug)]
pub struct CptEstimator {
    bias: f64,
    parallel: bool,
}

impl Default for CptEstimator {
    fn default() -> Self {
        Self {
            bias: 0.0,
            parallel: true,
        }
    }
}

impl CptEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blend factor in `[0, 1]`; values outside are clamped.
    pub fn with_bias(mut self, bias: f64) -> Self {
        self.bias = if bias.is_nan() { 0.0 } else { bias.clamp(0.0, 1.0) };
        self
    }

    /// Compute node tables on the rayon pool.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    /// Estimate CPTs for `nodes` (all nodes when `None`) in place.
    ///
    /// Every target's `cptdim` is refreshed from the current edge relation.
    /// Fails with `InvalidState` if a cell is out of range for its node.
    pub fn estimate(
        &self,
        network: &mut Network,
        data: &Dataset,
        nodes: Option<&[NodeId]>,
    ) -> Result<()> {
        data.check_against(network)?;

        let targets: Vec<NodeId> = match nodes {
            Some(ids) => ids.to_vec(),
            None => network.node_ids().collect(),
        };
        for &id in &targets {
            if network.node(id).is_none() {
                return Err(BnError::NodeNotFound(format!("#{}", id)));
            }
        }

        let net: &Network = network;
        let tables: Vec<(NodeId, Cpt)> = if self.parallel {
            targets
                .par_iter()
                .map(|&id| self.node_table(net, data, id).map(|cpt| (id, cpt)))
                .collect::<Result<_>>()?
        } else {
            targets
                .iter()
                .map(|&id| self.node_table(net, data, id).map(|cpt| (id, cpt)))
                .collect::<Result<_>>()?
        };

        for (id, cpt) in tables {
            network.set_cpt(id, cpt);
        }
        Ok(())
    }

    fn node_table(&self, network: &Network, data: &Dataset, node: NodeId) -> Result<Cpt> {
        let cptdim = network.expected_cptdim(node);
        let shape = state_shape(network, &cptdim)?;
        let total: usize = shape.iter().product();
        let own = shape[shape.len() - 1];

        let mut numer = vec![0u64; total];
        for row in data.values().rows() {
            let flat = cptdim
                .iter()
                .zip(&shape)
                .fold(0, |acc, (d, &card)| acc * card + row[d.index()]);
            numer[flat] += 1;
        }

        let mut denom = vec![0u64; total];
        for (z, y) in numer.chunks(own).zip(denom.chunks_mut(own)) {
            let parent_count: u64 = z.iter().sum();
            y.fill(parent_count);
        }

        let mut probs: Vec<f64> = numer
            .iter()
            .zip(&denom)
            .map(|(&z, &y)| {
                if z == 0 || y == 0 {
                    EPSILON_FLOOR
                } else {
                    z as f64 / y as f64
                }
            })
            .collect();

        if self.bias > 0.0 {
            let previous = network
                .node(node)
                .and_then(|n| n.cpt())
                .filter(|old| old.cptdim == cptdim);
            if let Some(old) = previous {
                for (new, &prev) in probs.iter_mut().zip(old.probs.iter()) {
                    // Move from the old value toward the new one by `bias`.
                    *new = (prev + self.bias * (*new - prev)).max(EPSILON_FLOOR);
                }
            }
        }

        Ok(Cpt {
            cptdim,
            numer: to_array(&shape, numer)?,
            denom: to_array(&shape, denom)?,
            probs: to_array(&shape, probs)?,
        })
    }
}

fn state_shape(network: &Network, dims: &[NodeId]) -> Result<Vec<usize>> {
    dims.iter()
        .map(|&d| {
            network
                .nstates(d)
                .ok_or_else(|| BnError::NodeNotFound(format!("#{}", d)))
        })
        .collect()
}

fn to_array<T>(shape: &[usize], values: Vec<T>) -> Result<ArrayD<T>> {
    let len = values.len();
    ArrayD::from_shape_vec(IxDyn(shape), values).map_err(|_| BnError::DimensionMismatch {
        expected: shape.to_vec(),
        got: vec![len],
    })
}

/// Fill every node with a random normalized CPT for its current parents.
///
/// Count tables are left at zero. Useful for generating synthetic networks
/// to sample data from.
pub fn randomize_cpts<R: Rng>(network: &mut Network, rng: &mut R) -> Result<()> {
    let ids: Vec<NodeId> = network.node_ids().collect();
    for id in ids {
        let cptdim = network.expected_cptdim(id);
        let shape = state_shape(network, &cptdim)?;
        let total: usize = shape.iter().product();
        let own = shape[shape.len() - 1];

        let mut probs: Vec<f64> = (0..total)
            .map(|_| rng.random::<f64>() + EPSILON_FLOOR)
            .collect();
        for slice in probs.chunks_mut(own) {
            let sum: f64 = slice.iter().sum();
            for p in slice.iter_mut() {
                *p /= sum;
            }
        }

        let cpt = Cpt {
            cptdim,
            numer: ArrayD::zeros(IxDyn(&shape)),
            denom: ArrayD::zeros(IxDyn(&shape)),
            probs: to_array(&shape, probs)?,
        };
        network.set_cpt(id, cpt);
    }
    Ok(())
}
