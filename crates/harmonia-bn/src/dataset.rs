//! Integer-coded observational datasets.

use scirs2_core::ndarray::{Array2, ArrayView1, IxDyn};
use scirs2_core::random::Rng;

use crate::error::{BnError, Result};
use crate::network::{Network, NodeId};

/// Immutable matrix of state indices: one row per observation, one column
/// per node in the network's index order.
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    values: Array2<usize>,
}

impl Dataset {
    /// Wrap a matrix after checking it against the network's cardinalities.
    pub fn new(values: Array2<usize>, network: &Network) -> Result<Self> {
        let data = Self { values };
        data.check_against(network)?;
        Ok(data)
    }

    /// Check that there is one column per node and every cell is a valid
    /// state of its node.
    pub fn check_against(&self, network: &Network) -> Result<()> {
        if self.values.ncols() != network.num_nodes() {
            return Err(BnError::DimensionMismatch {
                expected: vec![self.values.nrows(), network.num_nodes()],
                got: self.values.shape().to_vec(),
            });
        }

        for (id, node) in network.nodes() {
            let nstates = node.nstates();
            let column = self.values.column(id.index());
            if let Some((row, &value)) = column.iter().enumerate().find(|(_, &v)| v >= nstates) {
                return Err(BnError::InvalidState {
                    node: node.label().to_string(),
                    row,
                    value,
                    nstates,
                });
            }
        }
        Ok(())
    }

    /// Build from row vectors.
    pub fn from_rows(rows: &[Vec<usize>], network: &Network) -> Result<Self> {
        let ncols = network.num_nodes();
        if let Some(bad) = rows.iter().find(|r| r.len() != ncols) {
            return Err(BnError::DimensionMismatch {
                expected: vec![ncols],
                got: vec![bad.len()],
            });
        }
        let flat: Vec<usize> = rows.iter().flatten().copied().collect();
        let values = Array2::from_shape_vec((rows.len(), ncols), flat).map_err(|_| {
            BnError::DimensionMismatch {
                expected: vec![rows.len(), ncols],
                got: vec![rows.len() * ncols],
            }
        })?;
        Self::new(values, network)
    }

    /// A dataset with no rows and one column per node.
    pub fn empty(network: &Network) -> Self {
        Self {
            values: Array2::zeros((0, network.num_nodes())),
        }
    }

    /// Draw `rows` observations by ancestral sampling from the network's
    /// current CPTs.
    pub fn sample<R: Rng>(network: &Network, rows: usize, rng: &mut R) -> Result<Self> {
        let order = network.topological_order()?;
        let mut cpts = Vec::with_capacity(order.len());
        for &id in &order {
            let label = network.label_of(id).unwrap_or_default().to_string();
            let cpt = network
                .node(id)
                .and_then(|n| n.cpt())
                .ok_or_else(|| BnError::MissingCpt(label.clone()))?;
            if !network.cpt_is_current(id) {
                return Err(BnError::StaleCpt(label));
            }
            cpts.push((id, cpt));
        }

        let ncols = network.num_nodes();
        let mut values: Array2<usize> = Array2::zeros((rows, ncols));
        let mut index: Vec<usize> = Vec::new();
        for r in 0..rows {
            for &(id, cpt) in &cpts {
                index.clear();
                index.extend(cpt.cptdim.iter().map(|d| values[[r, d.index()]]));

                let own = index.len() - 1;
                let nstates = cpt.shape()[own];
                let u: f64 = rng.random();
                let mut cumulative = 0.0;
                let mut state = nstates - 1;
                for s in 0..nstates {
                    index[own] = s;
                    cumulative += cpt.probs[IxDyn(&index)];
                    if u < cumulative {
                        state = s;
                        break;
                    }
                }
                values[[r, id.index()]] = state;
            }
        }

        Ok(Self { values })
    }

    /// Number of observations.
    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    /// Number of variables.
    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.values.nrows() == 0
    }

    /// Underlying matrix.
    pub fn values(&self) -> &Array2<usize> {
        &self.values
    }

    /// One observation.
    pub fn row(&self, index: usize) -> ArrayView1<'_, usize> {
        self.values.row(index)
    }

    /// All observations of one variable.
    pub fn column(&self, id: NodeId) -> ArrayView1<'_, usize> {
        self.values.column(id.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpt::randomize_cpts;
    use scirs2_core::random::{SeedableRng, StdRng};

    fn network() -> Network {
        Network::from_edges([("A", 2), ("B", 3)], &[("A", "B")]).unwrap()
    }

    #[test]
    fn test_from_rows() {
        let net = network();
        let data = Dataset::from_rows(&[vec![0, 2], vec![1, 0]], &net).unwrap();
        assert_eq!(data.nrows(), 2);
        assert_eq!(data.ncols(), 2);
        assert_eq!(data.column(NodeId(1)).to_vec(), vec![2, 0]);
        assert_eq!(data.row(1).to_vec(), vec![1, 0]);
    }

    #[test]
    fn test_out_of_range_state_is_rejected() {
        let net = network();
        let err = Dataset::from_rows(&[vec![0, 1], vec![2, 0]], &net).unwrap_err();
        assert!(matches!(
            err,
            BnError::InvalidState { ref node, row: 1, value: 2, nstates: 2 } if node == "A"
        ));
    }

    #[test]
    fn test_check_against_narrower_network() {
        let wide = Network::with_nodes([("A", 3), ("B", 3)]).unwrap();
        let data = Dataset::from_rows(&[vec![0, 1], vec![2, 0]], &wide).unwrap();
        assert!(data.check_against(&wide).is_ok());

        let narrow = network();
        assert!(matches!(
            data.check_against(&narrow),
            Err(BnError::InvalidState { ref node, row: 1, value: 2, nstates: 2 }) if node == "A"
        ));
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        let net = network();
        assert!(Dataset::from_rows(&[vec![0, 1], vec![0]], &net).is_err());
    }

    #[test]
    fn test_empty() {
        let net = network();
        let data = Dataset::empty(&net);
        assert!(data.is_empty());
        assert_eq!(data.ncols(), 2);
    }

    #[test]
    fn test_sample_respects_cardinalities() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut net = network();
        randomize_cpts(&mut net, &mut rng).unwrap();
        let data = Dataset::sample(&net, 500, &mut rng).unwrap();
        assert_eq!(data.nrows(), 500);
        assert!(data.column(NodeId(0)).iter().all(|&v| v < 2));
        assert!(data.column(NodeId(1)).iter().all(|&v| v < 3));
    }

    #[test]
    fn test_sample_requires_cpts() {
        let mut rng = StdRng::seed_from_u64(1);
        let net = network();
        assert!(matches!(
            Dataset::sample(&net, 10, &mut rng),
            Err(BnError::MissingCpt(_))
        ));
    }
}
