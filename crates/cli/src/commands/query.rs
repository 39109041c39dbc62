//! Query inspection command

use anyhow::{Context, Result};
use colored::Colorize;
use netscore_lib::{query::QueryParameters, NetworkTrafficArgs};
use serde::Serialize;

use crate::output::OutputFormat;

#[derive(Serialize)]
struct QueryOutput<'a> {
    node: &'a str,
    interface: &'a str,
    time_range_minutes: i64,
    query: String,
}

/// Print the bandwidth query for `node`
pub fn show_query(args: &NetworkTrafficArgs, node: &str, format: OutputFormat) -> Result<()> {
    args.validate().context("Invalid scorer arguments")?;
    anyhow::ensure!(!node.is_empty(), "Node name must not be empty");

    let query = QueryParameters::new(node, &args.network_interface, args.time_range()).to_query();

    match format {
        OutputFormat::Json => {
            let output = QueryOutput {
                node,
                interface: &args.network_interface,
                time_range_minutes: args.time_range_in_minutes,
                query,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => {
            println!("{}", "Bandwidth Query".bold());
            println!("{}", "=".repeat(60));
            println!("Node:       {}", node.cyan());
            println!("Interface:  {}", args.network_interface.cyan());
            println!("Window:     {}m", args.time_range_in_minutes);
            println!();
            println!("{}", query);
        }
    }

    Ok(())
}
