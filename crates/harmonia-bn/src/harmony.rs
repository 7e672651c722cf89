//! Harmony search over DAG structures.
//!
//! The engine keeps a [`HarmonyMemory`] of `hms` scored networks. Each
//! iteration improvises one candidate, starting from the required edges of
//! the input network and deciding every ordered node pair `(u, v)`
//! independently:
//!
//! - with probability `hmcr` the pair's state is read from a uniformly
//!   chosen harmony, then with probability `par` pitch-adjusted by one step;
//! - otherwise the state is drawn at random, an edge being picked with
//!   probability `random_edge_rate`.
//!
//! Pair states use a cyclic four-valued encoding (see [`EdgeCase`]) so that a
//! pitch adjustment of an existing edge either silences or reverses it.
//! Edge additions that are prohibited are skipped, and those that close a
//! cycle are rolled back immediately, so a candidate is acyclic by
//! construction. The candidate is then scored with the worst harmony's score
//! as cutoff and replaces the worst harmony if it is strictly better.

use scirs2_core::random::{thread_rng, Rng, SeedableRng, StdRng};
use tracing::{debug, trace};

use crate::config::HarmonyConfig;
use crate::cpt::CptEstimator;
use crate::dataset::Dataset;
use crate::error::{BnError, Result};
use crate::memory::HarmonyMemory;
use crate::network::{Network, NodeId};
use crate::progress::{
    ProgressReport, SearchObserver, SearchStats, Termination, TracingObserver,
};
use crate::random::random_network;
use crate::score::{likelihood, score_bounded};

/// State of an ordered node pair during improvisation.
///
/// Pitch adjustment moves one step around the cycle
/// `Silent -> Forward -> SilentAlt -> Reverse -> Silent`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeCase {
    /// No edge.
    Silent,
    /// Edge `u -> v`.
    Forward,
    /// No edge, second phase.
    SilentAlt,
    /// Edge `v -> u`.
    Reverse,
}

impl EdgeCase {
    const CYCLE: [EdgeCase; 4] = [
        EdgeCase::Silent,
        EdgeCase::Forward,
        EdgeCase::SilentAlt,
        EdgeCase::Reverse,
    ];

    fn position(self) -> usize {
        match self {
            EdgeCase::Silent => 0,
            EdgeCase::Forward => 1,
            EdgeCase::SilentAlt => 2,
            EdgeCase::Reverse => 3,
        }
    }

    pub fn up(self) -> Self {
        Self::CYCLE[(self.position() + 1) % 4]
    }

    pub fn down(self) -> Self {
        Self::CYCLE[(self.position() + 3) % 4]
    }

    /// Read the pair's state from a harmony. Absent pairs pick one of the
    /// two silent phases at random.
    pub fn from_harmony<R: Rng>(harmony: &Network, u: NodeId, v: NodeId, rng: &mut R) -> Self {
        if harmony.has_edge(u, v) {
            EdgeCase::Forward
        } else if harmony.has_edge(v, u) {
            EdgeCase::Reverse
        } else if rng.random_bool(0.5) {
            EdgeCase::Silent
        } else {
            EdgeCase::SilentAlt
        }
    }

    /// Random state: an edge with probability `edge_rate`, direction and
    /// silent phase chosen with equal odds.
    pub fn random<R: Rng>(edge_rate: f64, rng: &mut R) -> Self {
        let edge = rng.random::<f64>() < edge_rate;
        match (edge, rng.random_bool(0.5)) {
            (true, true) => EdgeCase::Forward,
            (true, false) => EdgeCase::Reverse,
            (false, true) => EdgeCase::Silent,
            (false, false) => EdgeCase::SilentAlt,
        }
    }

    /// Shift one step up or down with equal odds.
    pub fn adjust<R: Rng>(self, rng: &mut R) -> Self {
        if rng.random_bool(0.5) {
            self.up()
        } else {
            self.down()
        }
    }

    /// The directed edge this state asks for.
    pub fn edge(self, u: NodeId, v: NodeId) -> Option<(NodeId, NodeId)> {
        match self {
            EdgeCase::Forward => Some((u, v)),
            EdgeCase::Reverse => Some((v, u)),
            EdgeCase::Silent | EdgeCase::SilentAlt => None,
        }
    }
}

/// Result of a search run.
#[derive(Clone, Debug)]
pub struct SearchOutcome {
    /// Copy of the highest-scoring harmony.
    pub best: Network,
    /// Final memory, worst to best.
    pub memory: HarmonyMemory,
    pub stats: SearchStats,
}

/// Harmony search engine for one input network.
///
/// The edges of the input network are required in every candidate and its
/// prohibited edges are excluded from every candidate.
#[derive(Clone, Debug)]
pub struct HarmonySearch {
    config: HarmonyConfig,
    baseline: Network,
    required: Vec<(NodeId, NodeId)>,
    estimator: CptEstimator,
}

impl HarmonySearch {
    /// Prepare a search. Fails on an invalid configuration, a cyclic input
    /// network, or an edge that is both required and prohibited.
    pub fn new(network: &Network, config: HarmonyConfig) -> Result<Self> {
        config.validate()?;
        if !network.is_acyclic() {
            return Err(BnError::InvalidGraph(
                "required edges contain a cycle".to_string(),
            ));
        }

        let required: Vec<(NodeId, NodeId)> = network.edges().collect();
        if let Some(&(u, v)) = required.iter().find(|&&(u, v)| network.is_prohibited(u, v)) {
            return Err(BnError::InvalidConfig(format!(
                "edge {} -> {} is both required and prohibited",
                network.label_of(u).unwrap_or_default(),
                network.label_of(v).unwrap_or_default()
            )));
        }

        let mut baseline = network.clone();
        baseline.reset_score();
        let estimator = CptEstimator::new()
            .with_bias(config.bias)
            .with_parallel(config.parallel_cpt);

        Ok(Self {
            config,
            baseline,
            required,
            estimator,
        })
    }

    pub fn config(&self) -> &HarmonyConfig {
        &self.config
    }

    /// Edges present in every candidate.
    pub fn required_edges(&self) -> &[(NodeId, NodeId)] {
        &self.required
    }

    /// Run with the configured seed (a fresh one when unset), reporting
    /// through `tracing`.
    pub fn search(&self, data: &Dataset) -> Result<SearchOutcome> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut thread_rng()),
        };
        self.search_with(data, &mut rng, &mut TracingObserver)
    }

    /// Run with an explicit random source and observer.
    pub fn search_with<R: Rng>(
        &self,
        data: &Dataset,
        rng: &mut R,
        observer: &mut dyn SearchObserver,
    ) -> Result<SearchOutcome> {
        data.check_against(&self.baseline)?;
        debug!(
            nodes = self.baseline.num_nodes(),
            rows = data.nrows(),
            required = self.required.len(),
            prohibited = self.baseline.prohibited_edges().len(),
            hms = self.config.hms,
            max_iters = self.config.max_iters,
            "Starting harmony search"
        );

        let mut stats = SearchStats::default();
        let mut memory = self.initialize_memory(data, rng)?;
        observer.on_memory_initialized(&memory);

        let mut iteration = 0;
        stats.termination = loop {
            if self.target_reached(&memory) {
                break Termination::TargetReached;
            }
            if iteration == self.config.max_iters {
                break Termination::IterationBudget;
            }

            let mut candidate = self.improvise_counting(&memory, rng, &mut stats)?;
            let current = self.evaluate(&mut candidate, data, memory.worst_score(), &mut stats)?;
            if memory.try_replace_worst(&candidate)? {
                stats.replacements += 1;
            }

            if let Some(period) = self.config.amnesia {
                if (iteration + 1) % period == 0 {
                    self.inject_amnesia(&mut memory, data, rng, &mut stats)?;
                }
            }

            if self.config.report_every > 0 && iteration % self.config.report_every == 0 {
                observer.on_progress(&ProgressReport {
                    iteration,
                    best: memory.best_score(),
                    worst: memory.worst_score(),
                    current,
                });
            }
            observer.on_iteration_end(iteration, &memory);

            iteration += 1;
            stats.iterations = iteration;
        };

        let best = memory.best().clone();
        observer.on_finish(&stats, &best);
        Ok(SearchOutcome {
            best,
            memory,
            stats,
        })
    }

    /// Fill a memory with `hms` random networks scored against `data`.
    pub fn initialize_memory<R: Rng>(&self, data: &Dataset, rng: &mut R) -> Result<HarmonyMemory> {
        data.check_against(&self.baseline)?;
        let harmonies = (0..self.config.hms)
            .map(|_| {
                let mut net = self.random_harmony(rng)?;
                self.estimator.estimate(&mut net, data, None)?;
                likelihood(&mut net, data, None)?;
                Ok(net)
            })
            .collect::<Result<Vec<_>>>()?;
        HarmonyMemory::new(harmonies)
    }

    /// Improvise one unscored candidate from `memory`.
    pub fn improvise<R: Rng>(&self, memory: &HarmonyMemory, rng: &mut R) -> Result<Network> {
        self.improvise_counting(memory, rng, &mut SearchStats::default())
    }

    /// A random network that respects the required and prohibited edges.
    pub fn random_harmony<R: Rng>(&self, rng: &mut R) -> Result<Network> {
        random_network(
            &self.baseline,
            &self.required,
            self.config.random_edge_rate,
            self.config.max_attempts,
            rng,
        )
    }

    fn improvise_counting<R: Rng>(
        &self,
        memory: &HarmonyMemory,
        rng: &mut R,
        stats: &mut SearchStats,
    ) -> Result<Network> {
        let mut candidate = self.baseline.clone();
        let n = candidate.num_nodes();
        let edge_rate = self
            .config
            .random_edge_rate
            .unwrap_or(if n > 0 { 1.0 / n as f64 } else { 0.0 });

        for u in 0..n {
            for v in 0..n {
                if u == v {
                    continue;
                }
                let (u, v) = (NodeId(u), NodeId(v));
                let case = if rng.random::<f64>() < self.config.hmcr {
                    let harmony = memory.choose(rng);
                    let seeded = EdgeCase::from_harmony(harmony, u, v, rng);
                    if rng.random::<f64>() < self.config.par {
                        seeded.adjust(rng)
                    } else {
                        seeded
                    }
                } else {
                    EdgeCase::random(edge_rate, rng)
                };

                if let Some((from, to)) = case.edge(u, v) {
                    try_commit(&mut candidate, from, to, stats)?;
                }
            }
        }
        Ok(candidate)
    }

    fn evaluate(
        &self,
        network: &mut Network,
        data: &Dataset,
        cutoff: f64,
        stats: &mut SearchStats,
    ) -> Result<f64> {
        self.estimator.estimate(network, data, None)?;
        let score = score_bounded(network, data, cutoff, None)?;
        if score == f64::NEG_INFINITY {
            stats.cutoffs += 1;
        }
        Ok(score)
    }

    fn inject_amnesia<R: Rng>(
        &self,
        memory: &mut HarmonyMemory,
        data: &Dataset,
        rng: &mut R,
        stats: &mut SearchStats,
    ) -> Result<()> {
        let mut fresh = self.random_harmony(rng)?;
        let score = self.evaluate(&mut fresh, data, memory.worst_score(), stats)?;
        stats.amnesia_injections += 1;
        let replaced = memory.try_replace_worst(&fresh)?;
        if replaced {
            stats.replacements += 1;
        }
        trace!(score, replaced, "Amnesia injection");
        Ok(())
    }

    fn target_reached(&self, memory: &HarmonyMemory) -> bool {
        self.config
            .target_quality
            .is_some_and(|target| memory.best_score() >= target)
    }
}

/// Add `u -> v` unless prohibited or present; roll it back if it closes a
/// cycle.
fn try_commit(
    candidate: &mut Network,
    u: NodeId,
    v: NodeId,
    stats: &mut SearchStats,
) -> Result<()> {
    if candidate.is_prohibited(u, v) || candidate.has_edge(u, v) {
        return Ok(());
    }
    candidate.add_edge(u, v)?;
    if !candidate.is_acyclic() {
        candidate.remove_edge(u, v)?;
        stats.rejected_edges += 1;
        trace!(from = u.index(), to = v.index(), "Rejected cycle-closing edge");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpt::randomize_cpts;
    use crate::progress::NoopObserver;

    fn chain_data(rows: usize, seed: u64) -> (Network, Dataset) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut truth = Network::from_edges(
            [("A", 2), ("B", 2), ("C", 3), ("D", 2)],
            &[("A", "B"), ("B", "C"), ("C", "D")],
        )
        .unwrap();
        randomize_cpts(&mut truth, &mut rng).unwrap();
        let data = Dataset::sample(&truth, rows, &mut rng).unwrap();
        let empty = Network::with_nodes([("A", 2), ("B", 2), ("C", 3), ("D", 2)]).unwrap();
        (empty, data)
    }

    #[derive(Default)]
    struct Recorder {
        worst: Vec<f64>,
        reports: Vec<ProgressReport>,
        initialized: bool,
        finished: bool,
    }

    impl SearchObserver for Recorder {
        fn on_memory_initialized(&mut self, memory: &HarmonyMemory) {
            self.initialized = true;
            self.worst.push(memory.worst_score());
        }

        fn on_progress(&mut self, report: &ProgressReport) {
            self.reports.push(*report);
        }

        fn on_iteration_end(&mut self, _iteration: usize, memory: &HarmonyMemory) {
            self.worst.push(memory.worst_score());
        }

        fn on_finish(&mut self, _stats: &SearchStats, _best: &Network) {
            self.finished = true;
        }
    }

    #[test]
    fn test_edge_case_cycle() {
        assert_eq!(EdgeCase::Silent.up(), EdgeCase::Forward);
        assert_eq!(EdgeCase::Reverse.up(), EdgeCase::Silent);
        assert_eq!(EdgeCase::Silent.down(), EdgeCase::Reverse);
        assert_eq!(EdgeCase::Forward.down(), EdgeCase::Silent);
        for case in EdgeCase::CYCLE {
            assert_eq!(case.up().down(), case);
        }
        let (u, v) = (NodeId(0), NodeId(1));
        assert_eq!(EdgeCase::Forward.edge(u, v), Some((u, v)));
        assert_eq!(EdgeCase::Reverse.edge(u, v), Some((v, u)));
        assert_eq!(EdgeCase::SilentAlt.edge(u, v), None);
    }

    #[test]
    fn test_edge_case_from_harmony() {
        let mut rng = StdRng::seed_from_u64(0);
        let net = Network::from_edges([("A", 2), ("B", 2), ("C", 2)], &[("A", "B")]).unwrap();
        let (a, b, c) = (NodeId(0), NodeId(1), NodeId(2));
        assert_eq!(EdgeCase::from_harmony(&net, a, b, &mut rng), EdgeCase::Forward);
        assert_eq!(EdgeCase::from_harmony(&net, b, a, &mut rng), EdgeCase::Reverse);
        for _ in 0..10 {
            let case = EdgeCase::from_harmony(&net, a, c, &mut rng);
            assert!(matches!(case, EdgeCase::Silent | EdgeCase::SilentAlt));
        }
    }

    #[test]
    fn test_single_harmony_without_iterations() {
        let (net, data) = chain_data(200, 1);
        let config = HarmonyConfig::new().with_hms(1).with_max_iters(0);
        let search = HarmonySearch::new(&net, config).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        let outcome = search.search_with(&data, &mut rng, &mut NoopObserver).unwrap();

        assert_eq!(outcome.memory.len(), 1);
        assert_eq!(outcome.stats.iterations, 0);
        assert_eq!(outcome.stats.termination, Termination::IterationBudget);
        assert_eq!(&outcome.best, outcome.memory.best());
        assert_eq!(outcome.best.score(), Some(outcome.memory.best_score()));
        assert!(outcome.best.is_acyclic());
    }

    #[test]
    fn test_required_and_prohibited_edges_are_respected() {
        let (mut net, data) = chain_data(200, 3);
        net.add_edge("A", "B").unwrap();
        net.prohibit_edge("C", "D").unwrap();
        net.prohibit_edge("D", "C").unwrap();
        let config = HarmonyConfig::new()
            .with_hms(5)
            .with_max_iters(30)
            .with_amnesia(4)
            .with_random_edge_rate(0.5);
        let search = HarmonySearch::new(&net, config).unwrap();
        let mut rng = StdRng::seed_from_u64(4);

        let memory = search.initialize_memory(&data, &mut rng).unwrap();
        let (a, b, c, d) = (NodeId(0), NodeId(1), NodeId(2), NodeId(3));
        for _ in 0..100 {
            let candidate = search.improvise(&memory, &mut rng).unwrap();
            assert!(candidate.is_acyclic());
            assert!(candidate.has_edge(a, b));
            assert!(!candidate.has_edge(c, d));
            assert!(!candidate.has_edge(d, c));
        }

        let outcome = search.search_with(&data, &mut rng, &mut NoopObserver).unwrap();
        for harmony in outcome.memory.iter() {
            assert!(harmony.is_acyclic());
            assert!(harmony.has_edge(a, b));
            assert!(!harmony.has_edge(c, d));
            assert!(!harmony.has_edge(d, c));
        }
    }

    #[test]
    fn test_worst_score_never_decreases() {
        let (net, data) = chain_data(300, 5);
        let config = HarmonyConfig::new()
            .with_hms(6)
            .with_max_iters(60)
            .with_amnesia(5)
            .with_report_every(0);
        let search = HarmonySearch::new(&net, config).unwrap();
        let mut rng = StdRng::seed_from_u64(6);
        let mut recorder = Recorder::default();
        let outcome = search.search_with(&data, &mut rng, &mut recorder).unwrap();

        assert!(recorder.initialized);
        assert!(recorder.finished);
        assert!(recorder.reports.is_empty());
        assert_eq!(recorder.worst.len(), 61);
        assert!(recorder.worst.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(outcome.stats.iterations, 60);
        assert_eq!(outcome.stats.amnesia_injections, 12);
    }

    #[test]
    fn test_progress_reports() {
        let (net, data) = chain_data(100, 7);
        let config = HarmonyConfig::new()
            .with_hms(3)
            .with_max_iters(5)
            .with_report_every(2);
        let search = HarmonySearch::new(&net, config).unwrap();
        let mut rng = StdRng::seed_from_u64(8);
        let mut recorder = Recorder::default();
        search.search_with(&data, &mut rng, &mut recorder).unwrap();

        let iterations: Vec<usize> = recorder.reports.iter().map(|r| r.iteration).collect();
        assert_eq!(iterations, vec![0, 2, 4]);
        for report in &recorder.reports {
            assert!(report.best >= report.worst);
        }
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let (net, data) = chain_data(200, 9);
        let config = HarmonyConfig::new()
            .with_hms(4)
            .with_max_iters(25)
            .with_seed(42)
            .with_parallel_cpt(false);
        let search = HarmonySearch::new(&net, config).unwrap();
        let first = search.search(&data).unwrap();
        let second = search.search(&data).unwrap();

        assert_eq!(first.best, second.best);
        assert_eq!(first.best.score(), second.best.score());
        assert_eq!(first.memory.scores(), second.memory.scores());
        assert_eq!(first.stats, second.stats);
    }

    #[test]
    fn test_target_quality_stops_search() {
        let (net, data) = chain_data(100, 10);
        let config = HarmonyConfig::new()
            .with_hms(3)
            .with_max_iters(50)
            .with_target_quality(-1e12);
        let search = HarmonySearch::new(&net, config).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let outcome = search.search_with(&data, &mut rng, &mut NoopObserver).unwrap();

        assert_eq!(outcome.stats.termination, Termination::TargetReached);
        assert_eq!(outcome.stats.iterations, 0);
    }

    #[test]
    fn test_invalid_setups_are_rejected() {
        let (net, data) = chain_data(50, 12);
        assert!(matches!(
            HarmonySearch::new(&net, HarmonyConfig::new().with_hms(0)),
            Err(BnError::InvalidConfig(_))
        ));

        let mut conflicting = net.clone();
        conflicting.add_edge("A", "B").unwrap();
        conflicting.prohibit_edge("A", "B").unwrap();
        assert!(matches!(
            HarmonySearch::new(&conflicting, HarmonyConfig::new()),
            Err(BnError::InvalidConfig(_))
        ));

        let mut cyclic = net.clone();
        cyclic.add_edges([("A", "B"), ("B", "A")]).unwrap();
        assert!(matches!(
            HarmonySearch::new(&cyclic, HarmonyConfig::new()),
            Err(BnError::InvalidGraph(_))
        ));

        let search = HarmonySearch::new(&net, HarmonyConfig::new().with_hms(2)).unwrap();
        let narrow = Network::with_nodes([("A", 2)]).unwrap();
        let wrong = Dataset::empty(&narrow);
        let mut rng = StdRng::seed_from_u64(13);
        assert!(matches!(
            search.search_with(&wrong, &mut rng, &mut NoopObserver),
            Err(BnError::DimensionMismatch { .. })
        ));

        let wide = Network::with_nodes([("A", 2), ("B", 2), ("C", 3), ("D", 5)]).unwrap();
        let rows = vec![vec![0, 1, 2, 4], vec![1, 0, 0, 1]];
        let out_of_range = Dataset::from_rows(&rows, &wide).unwrap();
        assert!(matches!(
            search.search_with(&out_of_range, &mut rng, &mut NoopObserver),
            Err(BnError::InvalidState { ref node, value: 4, nstates: 2, .. }) if node == "D"
        ));
        assert!(search.search_with(&data, &mut rng, &mut NoopObserver).is_ok());
    }
}
