//! Fixed-size pool of scored networks ordered by score.

use scirs2_core::random::Rng;

use crate::error::{BnError, Result};
use crate::network::Network;

/// Harmony memory: scored networks kept in ascending score order.
///
/// Slot 0 is the worst harmony, the last slot the best. Entries are owned
/// copies; a stored network changes only by being replaced.
#[derive(Clone, Debug)]
pub struct HarmonyMemory {
    harmonies: Vec<Network>,
}

impl HarmonyMemory {
    /// Build a memory from scored networks. The capacity is the number of
    /// networks given.
    pub fn new(mut harmonies: Vec<Network>) -> Result<Self> {
        if harmonies.is_empty() {
            return Err(BnError::InvalidConfig(
                "harmony memory needs at least one network".to_string(),
            ));
        }
        if harmonies.iter().any(|h| h.score().is_none()) {
            return Err(BnError::UnscoredComparison);
        }
        harmonies.sort_by(|a, b| score_of(a).total_cmp(&score_of(b)));
        Ok(Self { harmonies })
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.harmonies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.harmonies.is_empty()
    }

    /// Highest-scoring harmony.
    pub fn best(&self) -> &Network {
        &self.harmonies[self.harmonies.len() - 1]
    }

    /// Lowest-scoring harmony.
    pub fn worst(&self) -> &Network {
        &self.harmonies[0]
    }

    pub fn best_score(&self) -> f64 {
        score_of(self.best())
    }

    pub fn worst_score(&self) -> f64 {
        score_of(self.worst())
    }

    /// Uniformly chosen harmony.
    pub fn choose<R: Rng>(&self, rng: &mut R) -> &Network {
        &self.harmonies[rng.random_range(0..self.harmonies.len())]
    }

    /// Replace the worst harmony with a copy of `candidate` if the candidate
    /// scores strictly higher. Returns whether the memory changed.
    pub fn try_replace_worst(&mut self, candidate: &Network) -> Result<bool> {
        if candidate.try_cmp_score(self.worst())?.is_le() {
            return Ok(false);
        }
        self.harmonies.remove(0);
        let score = score_of(candidate);
        let slot = self.harmonies.partition_point(|h| score_of(h) <= score);
        self.harmonies.insert(slot, candidate.clone());
        Ok(true)
    }

    /// Harmonies from worst to best.
    pub fn iter(&self) -> impl Iterator<Item = &Network> + '_ {
        self.harmonies.iter()
    }

    /// Scores from worst to best.
    pub fn scores(&self) -> Vec<f64> {
        self.harmonies.iter().map(score_of).collect()
    }

    pub fn into_inner(self) -> Vec<Network> {
        self.harmonies
    }
}

fn score_of(network: &Network) -> f64 {
    network.score().unwrap_or(f64::NEG_INFINITY)
}
