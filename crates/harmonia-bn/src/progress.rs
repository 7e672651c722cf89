//! Search progress hooks.

use std::fmt;
use tracing::{debug, info};

use crate::memory::HarmonyMemory;
use crate::network::Network;

/// Scores at one reported iteration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProgressReport {
    pub iteration: usize,
    pub best: f64,
    pub worst: f64,
    /// Score of the latest candidate; `-inf` if it was cut off early.
    pub current: f64,
}

/// Why a search run stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// All `max_iters` improvisations were run.
    IterationBudget,
    /// The best score reached the target quality.
    TargetReached,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::IterationBudget => write!(f, "iteration budget exhausted"),
            Termination::TargetReached => write!(f, "target quality reached"),
        }
    }
}

/// Counters collected over one search run.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchStats {
    pub iterations: usize,
    /// Candidates (improvised or amnesia) that replaced the worst harmony.
    pub replacements: usize,
    pub amnesia_injections: usize,
    /// Tentative edges rolled back because they closed a cycle.
    pub rejected_edges: usize,
    /// Candidates whose scoring stopped at the worst-score cutoff.
    pub cutoffs: usize,
    pub termination: Termination,
}

impl Default for SearchStats {
    fn default() -> Self {
        Self {
            iterations: 0,
            replacements: 0,
            amnesia_injections: 0,
            rejected_edges: 0,
            cutoffs: 0,
            termination: Termination::IterationBudget,
        }
    }
}

/// Receives events from a running search. All methods default to no-ops.
pub trait SearchObserver {
    /// Called once after the initial memory has been scored and sorted.
    fn on_memory_initialized(&mut self, _memory: &HarmonyMemory) {}

    /// Called every `report_every` iterations.
    fn on_progress(&mut self, _report: &ProgressReport) {}

    /// Called after every iteration with the current memory.
    fn on_iteration_end(&mut self, _iteration: usize, _memory: &HarmonyMemory) {}

    /// Called once when the run stops.
    fn on_finish(&mut self, _stats: &SearchStats, _best: &Network) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SearchObserver for NoopObserver {}

/// Observer that emits `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl SearchObserver for TracingObserver {
    fn on_memory_initialized(&mut self, memory: &HarmonyMemory) {
        debug!(
            hms = memory.len(),
            best = memory.best_score(),
            worst = memory.worst_score(),
            "Scored harmony memory"
        );
    }

    fn on_progress(&mut self, report: &ProgressReport) {
        info!(
            iteration = report.iteration,
            best = report.best,
            worst = report.worst,
            current = report.current,
            "Harmony search progress"
        );
    }

    fn on_finish(&mut self, stats: &SearchStats, best: &Network) {
        info!(
            iterations = stats.iterations,
            replacements = stats.replacements,
            amnesia = stats.amnesia_injections,
            rejected_edges = stats.rejected_edges,
            cutoffs = stats.cutoffs,
            edges = best.num_edges(),
            score = best.score().unwrap_or(f64::NEG_INFINITY),
            termination = %stats.termination,
            "Harmony search finished"
        );
    }
}
