//! Structure learning on data sampled from a ground-truth network.

use anyhow::{Context, Result};
use harmonia_bn::{
    distance, likelihood, randomize_cpts, CptEstimator, Dataset, HarmonySearch, Network,
    SearchOutcome,
};
use scirs2_core::random::{thread_rng, SeedableRng, StdRng};
use tracing::info;

use crate::config::RunConfig;
use crate::output::{format_edges, format_network_stats, format_search_stats, print_header};

/// Everything a run produced.
pub struct RunReport {
    pub truth: Network,
    pub outcome: SearchOutcome,
    pub rows: usize,
    /// Log-likelihood of the ground-truth structure with CPTs fitted to the
    /// sampled data.
    pub truth_score: f64,
    /// Edge additions and removals separating the learned network from the
    /// ground truth.
    pub distance: usize,
}

/// Sample data from the configured model and learn a structure from it.
pub fn execute(config: &RunConfig) -> Result<RunReport> {
    config.validate()?;
    let mut truth = config.model.truth_network()?;
    let start = config.model.search_network()?;

    let mut rng = match config.data.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut thread_rng()),
    };
    randomize_cpts(&mut truth, &mut rng).context("Failed to generate ground-truth CPTs")?;
    let data = Dataset::sample(&truth, config.data.rows, &mut rng)
        .context("Failed to sample observations")?;
    info!(rows = data.nrows(), nodes = data.ncols(), "Sampled dataset");

    let search =
        HarmonySearch::new(&start, config.search.clone()).context("Invalid search setup")?;
    let outcome = search.search(&data).context("Harmony search failed")?;

    let mut reference = truth.clone();
    CptEstimator::new()
        .with_parallel(config.search.parallel_cpt)
        .estimate(&mut reference, &data, None)?;
    let truth_score = likelihood(&mut reference, &data, None)?;
    let distance = distance(&outcome.best, &truth);

    Ok(RunReport {
        truth,
        outcome,
        rows: data.nrows(),
        truth_score,
        distance,
    })
}

pub fn print_report(report: &RunReport, quiet: bool) {
    let best = &report.outcome.best;
    if quiet {
        println!("{}", best.to_model_string());
        return;
    }

    print_header("Ground truth");
    println!("  {}", report.truth.to_model_string());
    println!("  Sampled rows: {}", report.rows);
    println!("  Log-likelihood: {:.4}", report.truth_score);

    print_header("Learned network");
    println!("  {}", best.to_model_string());
    println!("  {}", format_network_stats(best));
    if best.num_edges() > 0 {
        println!("{}", format_edges(best));
    }
    println!("  Structural distance to truth: {}", report.distance);

    print_header("Search");
    println!("  {}", format_search_stats(&report.outcome.stats));
    let scores = report.outcome.memory.scores();
    println!(
        "  Memory: {} harmonies, scores {:.4} .. {:.4}",
        scores.len(),
        report.outcome.memory.worst_score(),
        report.outcome.memory.best_score()
    );
}
