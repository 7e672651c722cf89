//! Random acyclic structures for seeding the harmony memory.

use scirs2_core::random::Rng;
use tracing::warn;

use crate::error::{BnError, Result};
use crate::network::{Network, NodeId};

/// Below this expected number of random edges only required edges remain.
const MIN_EXPECTED_EDGES: f64 = 1e-6;

/// Random acyclic network over the nodes of `template`.
///
/// Every ordered pair gets an edge with probability `density` (1/n when
/// `None`). `required` edges are always present and the template's
/// prohibited edges never are. Each density level gets `max_attempts`
/// tries before the density is halved. Once the expected number of random
/// edges is negligible the required edges alone are returned, failing with
/// [`BnError::InvalidGraph`] if those form a cycle.
///
/// The result keeps the template's nodes and prohibited edges, with no
/// CPTs and no score.
pub fn random_network<R: Rng>(
    template: &Network,
    required: &[(NodeId, NodeId)],
    density: Option<f64>,
    max_attempts: usize,
    rng: &mut R,
) -> Result<Network> {
    let n = template.num_nodes();
    let mut net = template.clone();
    net.clear();
    net.clear_cpts();
    net.reset_score();
    if n == 0 {
        return Ok(net);
    }

    let pairs = (n * (n - 1)) as f64;
    let mut density = density.unwrap_or(1.0 / n as f64).clamp(0.0, 1.0);

    while density * pairs >= MIN_EXPECTED_EDGES {
        for _ in 0..max_attempts.max(1) {
            net.clear();
            net.add_edges(required.iter().copied())?;
            for u in 0..n {
                for v in 0..n {
                    let (u, v) = (NodeId(u), NodeId(v));
                    if u == v || net.is_prohibited(u, v) {
                        continue;
                    }
                    if rng.random::<f64>() < density {
                        net.add_edge(u, v)?;
                    }
                }
            }
            if net.is_acyclic() {
                return Ok(net);
            }
        }
        warn!(density, max_attempts, "No acyclic network found, halving density");
        density /= 2.0;
    }

    net.clear();
    net.add_edges(required.iter().copied())?;
    if !net.is_acyclic() {
        return Err(BnError::InvalidGraph(
            "required edges contain a cycle".to_string(),
        ));
    }
    Ok(net)
}
