//! Terminal rendering for run results

use colored::Colorize;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use waypoint_core::RouteReason;
use waypoint_runtime::ResultEnvelope;

/// Print an envelope; `verbose` adds the execution and per-node tables
pub fn print_envelope(envelope: &ResultEnvelope, verbose: bool) {
    if envelope.success {
        println!(
            "\n{} {}",
            "✅ Result".green().bold(),
            format!("(Flow: {})", envelope.flow_used).dimmed()
        );
        println!("{}", envelope.output);
    } else {
        println!("\n{}", "❌ Error".red().bold());
        println!(
            "{}",
            envelope.error.as_deref().unwrap_or(envelope.output.as_str())
        );
    }

    for (node, validation) in envelope.validation_results.iter() {
        for warning in &validation.warnings {
            println!("{} {}: {}", "⚠".yellow(), node, warning);
        }
    }

    if verbose {
        println!("\n{}", details_table(envelope));
        if !envelope.node_results.is_empty() {
            println!("\n{}", nodes_table(envelope));
        }
    }
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

/// Run-level summary
pub fn details_table(envelope: &ResultEnvelope) -> Table {
    let mut table = new_table(vec!["Metric", "Value"]);
    table.add_row(vec![
        Cell::new("Flow Used"),
        Cell::new(&envelope.flow_used).fg(Color::Cyan),
    ]);
    if let Some(routing) = &envelope.routing {
        table.add_row(vec!["Routed By", route_reason(&routing.reason).as_str()]);
    }
    table.add_row(vec![
        "Total Execution Time".to_string(),
        format!("{:.3}s", envelope.execution_time),
    ]);
    table.add_row(vec![
        "Nodes Executed".to_string(),
        envelope.node_results.len().to_string(),
    ]);
    if let Some(run_id) = envelope.run_id {
        table.add_row(vec!["Run ID".to_string(), run_id.to_string()]);
    }
    table
}

/// One row per executed node, in execution order
pub fn nodes_table(envelope: &ResultEnvelope) -> Table {
    let mut table = new_table(vec!["Node", "Status", "Time"]);
    for (name, summary) in envelope.node_results.iter() {
        let status = if summary.success {
            Cell::new("✅ Success").fg(Color::Green)
        } else {
            Cell::new(format!(
                "❌ Error: {}",
                summary.error.as_deref().unwrap_or("unknown")
            ))
            .fg(Color::Red)
        };
        table.add_row(vec![
            Cell::new(name),
            status,
            Cell::new(format!("{:.3}s", summary.execution_time)),
        ]);
    }
    table
}

pub fn route_reason(reason: &RouteReason) -> String {
    match reason {
        RouteReason::Explicit(flow) => format!("explicit ({})", flow),
        RouteReason::Pattern(pattern) => format!("pattern '{}'", pattern),
        RouteReason::Default => "default".to_string(),
    }
}

/// First `max` characters of `text`, with an ellipsis when cut
pub fn preview(text: &str, max: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= max {
        flat
    } else {
        format!("{}...", flat.chars().take(max).collect::<String>())
    }
}
