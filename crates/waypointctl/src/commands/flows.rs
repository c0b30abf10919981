use anyhow::Result;
use colored::Colorize;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use waypoint_core::{FlowSpec, FlowsConfig};

use super::{compile, load_config};

/// Print the configured flows in routing order
pub fn list(config: &str) -> Result<()> {
    let config = load_config(config)?;
    println!("{}", flows_table(&config));
    println!(
        "{} {}",
        "Default flow:".bold(),
        config.routing.default.to_string().cyan()
    );
    Ok(())
}

/// Load, validate and compile the configuration, then print a summary
pub fn validate(path: &str) -> Result<()> {
    let checked =
        load_config(path).and_then(|config| compile(&config).map(|agent| (config, agent)));
    let (config, agent) = match checked {
        Ok(checked) => checked,
        Err(e) => {
            println!("{}", "❌ Configuration validation failed".red().bold());
            return Err(e);
        }
    };

    println!("{}", "✅ Configuration is valid".green().bold());

    let node_types: Vec<String> = agent.nodes().types().iter().map(|t| t.to_string()).collect();
    let keys = waypoint_nodes::ApiKeys::from_env(&config.nodes);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Component", "Value"]);
    table.add_row(vec!["Flows".to_string(), config.flows.len().to_string()]);
    table.add_row(vec!["Node Types".to_string(), node_types.join(", ")]);
    table.add_row(vec![
        "Chains Compiled".to_string(),
        agent.chains().len().to_string(),
    ]);
    table.add_row(vec![
        "Default Flow".to_string(),
        config.routing.default.to_string(),
    ]);
    table.add_row(vec![
        "Max Steps".to_string(),
        config.engine.max_steps.to_string(),
    ]);
    table.add_row(vec![
        Cell::new(format!("API key ({})", config.nodes.search.api_key_env)),
        key_cell(keys.search.is_some()),
    ]);
    table.add_row(vec![
        Cell::new(format!("API key ({})", config.nodes.llm.api_key_env)),
        key_cell(keys.llm.is_some()),
    ]);
    println!("{}", table);
    Ok(())
}

fn key_cell(present: bool) -> Cell {
    if present {
        Cell::new("set").fg(Color::Green)
    } else {
        Cell::new("missing").fg(Color::Yellow)
    }
}

/// Node names in declaration order
pub fn node_chain(flow: &FlowSpec) -> String {
    flow.nodes
        .iter()
        .map(|n| n.name.as_str())
        .collect::<Vec<_>>()
        .join(" → ")
}

pub fn flows_table(config: &FlowsConfig) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Flow", "Name", "Description", "Tags", "Nodes"]);

    for flow in &config.flows {
        table.add_row(vec![
            Cell::new(flow.id).fg(Color::Cyan),
            Cell::new(&flow.name),
            Cell::new(&flow.description),
            Cell::new(flow.tags.join(", ")),
            Cell::new(node_chain(flow)),
        ]);
    }
    table
}
