//! Bayesian network structure learning by harmony search.
//!
//! This crate learns the edge set of a discrete Bayesian network from
//! integer-coded observations. Candidate DAGs are scored by their data
//! log-likelihood under maximum-likelihood conditional probability tables.
//!
//! # Core Concepts
//!
//! - **Network**: DAG over stable node ids with cheap incremental
//!   acyclicity checks, required edges (its own edges) and prohibited edges
//! - **CPT estimation**: single-pass contingency tables per node, computed
//!   in parallel with an epsilon floor for unseen configurations
//! - **Scoring**: total, early-terminating and per-edge log-likelihood
//! - **Harmony search**: a memory of elite structures recombined pair by
//!   pair, with pitch adjustment and periodic amnesia
//!
//! # Architecture
//!
//! ```text
//! Network → CptEstimator → score_bounded → HarmonyMemory
//!    ↑                                          │
//!    └────────────── improvise ←────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use harmonia_bn::{randomize_cpts, Dataset, HarmonyConfig, HarmonySearch, Network};
//! use scirs2_core::random::{SeedableRng, StdRng};
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let mut truth = Network::from_edges([("A", 2), ("B", 2), ("C", 2)], &[("A", "B"), ("B", "C")])?;
//! randomize_cpts(&mut truth, &mut rng)?;
//! let data = Dataset::sample(&truth, 200, &mut rng)?;
//!
//! let start = Network::with_nodes([("A", 2), ("B", 2), ("C", 2)])?;
//! let config = HarmonyConfig::new().with_hms(5).with_max_iters(20).with_seed(1);
//! let outcome = HarmonySearch::new(&start, config)?.search(&data)?;
//! assert!(outcome.best.is_acyclic());
//! # Ok::<(), harmonia_bn::BnError>(())
//! ```

mod config;
mod cpt;
mod dataset;
mod error;
mod harmony;
mod memory;
mod network;
mod progress;
mod random;
mod score;

#[cfg(feature = "structured-logging")]
pub mod logging;

pub use config::HarmonyConfig;
pub use cpt::{randomize_cpts, Cpt, CptEstimator, EPSILON_FLOOR};
pub use dataset::Dataset;
pub use error::{BnError, Result};
pub use harmony::{EdgeCase, HarmonySearch, SearchOutcome};
pub use memory::HarmonyMemory;
pub use network::{distance, Network, Node, NodeId, NodeKey};
pub use progress::{
    NoopObserver, ProgressReport, SearchObserver, SearchStats, Termination, TracingObserver,
};
pub use random::random_network;
pub use score::{edge_score, edge_scores, likelihood, score_bounded};
