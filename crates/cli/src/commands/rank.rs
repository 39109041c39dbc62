//! Node ranking command

use anyhow::{Context, Result};
use colored::Colorize;
use netscore_lib::{
    observability::{Diagnostics, NoopDiagnostics, StructuredLogger},
    run_cycle, CancellationToken, NetworkTraffic, NetworkTrafficArgs, ScorePlugin, PLUGIN_NAME,
};
use serde::Serialize;
use std::sync::Arc;
use tabled::Tabled;

use crate::output::{color_status, format_bytes, print_table, print_warning, OutputFormat};

/// Row for the ranking table
#[derive(Tabled, Serialize)]
struct RankRow {
    #[tabled(rename = "Rank")]
    rank: String,
    #[tabled(rename = "Node")]
    node: String,
    #[tabled(rename = "Received")]
    received: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Status")]
    status: String,
}

#[derive(Serialize)]
struct RankedNode {
    node: String,
    raw_score: Option<i64>,
    score: Option<i64>,
    error: Option<String>,
}

/// Run one scoring cycle over `nodes` and print the ranking
pub async fn rank_nodes(
    args: &NetworkTrafficArgs,
    nodes: &[String],
    verbose: bool,
    format: OutputFormat,
) -> Result<()> {
    let diagnostics: Arc<dyn Diagnostics> = if verbose {
        Arc::new(StructuredLogger::new(PLUGIN_NAME))
    } else {
        Arc::new(NoopDiagnostics)
    };

    let plugin: Arc<dyn ScorePlugin> = Arc::new(
        NetworkTraffic::new(args, diagnostics).context("Failed to initialize scorer")?,
    );

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let outcome = run_cycle(plugin, nodes, &cancel)
        .await
        .context("Failed to normalize scores")?;

    let mut ranked: Vec<RankedNode> = outcome
        .scores
        .iter()
        .zip(&outcome.raw_scores)
        .map(|(node, raw)| RankedNode {
            node: node.node_name.clone(),
            raw_score: Some(*raw),
            score: Some(node.score),
            error: None,
        })
        .collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked.extend(outcome.failures.iter().map(|failure| RankedNode {
        node: failure.node_name.clone(),
        raw_score: None,
        score: None,
        error: Some(failure.error.to_string()),
    }));

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&ranked)?);
        }
        OutputFormat::Table => {
            println!(
                "{} ({} over {}m on {})",
                "Node Ranking".bold(),
                PLUGIN_NAME,
                args.time_range_in_minutes,
                args.network_interface.cyan()
            );

            let rows = rank_rows(&ranked);
            print_table(&rows, format);

            for node in &ranked {
                if let Some(error) = &node.error {
                    print_warning(&format!("{}: {}", node.node, error));
                }
            }
        }
    }

    Ok(())
}

/// Table rows in ranking order; failed nodes carry no rank
fn rank_rows(ranked: &[RankedNode]) -> Vec<RankRow> {
    ranked
        .iter()
        .enumerate()
        .map(|(i, node)| RankRow {
            rank: if node.error.is_some() {
                "-".to_string()
            } else {
                (i + 1).to_string()
            },
            node: node.node.clone(),
            received: node
                .raw_score
                .map(|raw| format_bytes(raw.max(0) as u64))
                .unwrap_or_else(|| "-".to_string()),
            score: node
                .score
                .map(|score| score.to_string())
                .unwrap_or_else(|| "-".to_string()),
            status: color_status(if node.error.is_some() { "failed" } else { "scored" }),
        })
        .collect()
}
