//! Colored output formatting for the harmonia CLI

use colored::*;
use harmonia_bn::{Network, SearchStats};

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

pub fn print_header(title: &str) {
    println!("\n{}", title.cyan().bold());
    println!("{}", "=".repeat(title.len()).cyan());
}

pub fn format_network_stats(network: &Network) -> String {
    let score = match network.score() {
        Some(score) => format!("{:.4}", score),
        None => "unscored".to_string(),
    };
    format!(
        "Network: {} nodes, {} edges, log-likelihood {}",
        network.num_nodes().to_string().green(),
        network.num_edges().to_string().cyan(),
        score.yellow()
    )
}

pub fn format_search_stats(stats: &SearchStats) -> String {
    format!(
        "Search: {} iterations, {} replacements, {} amnesia, {} cycle rejections, {} cutoffs ({})",
        stats.iterations.to_string().green(),
        stats.replacements.to_string().cyan(),
        stats.amnesia_injections.to_string().magenta(),
        stats.rejected_edges.to_string().yellow(),
        stats.cutoffs.to_string().yellow(),
        stats.termination
    )
}

/// Edge list with labels, one `u -> v` per line.
pub fn format_edges(network: &Network) -> String {
    network
        .edges()
        .map(|(u, v)| {
            format!(
                "  {} {} {}",
                network.label_of(u).unwrap_or_default(),
                "→".dimmed(),
                network.label_of(v).unwrap_or_default()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn enable_colors(enabled: bool) {
    colored::control::set_override(enabled);
}
