use std::sync::Arc;

use anyhow::{bail, Result};
use colored::Colorize;

use super::{build_agent, cancel_on_interrupt, cli_metadata};
use crate::output;

/// Execute a single request
pub async fn execute(
    config: &str,
    input: &str,
    flow: Option<&str>,
    output_format: &str,
    verbose: bool,
) -> Result<()> {
    if !matches!(output_format, "text" | "json") {
        bail!("Unsupported output format: {} (expected text or json)", output_format);
    }

    let agent = Arc::new(build_agent(config)?);
    let interrupt = cancel_on_interrupt(agent.clone());

    if output_format == "text" {
        println!("{} {}", "Processing:".bold().blue(), input);
    }

    let envelope = agent.execute(input, flow, cli_metadata("run")).await;
    interrupt.abort();

    match output_format {
        "json" => println!("{}", serde_json::to_string_pretty(&envelope)?),
        _ => output::print_envelope(&envelope, verbose),
    }

    if !envelope.success {
        bail!(
            "Run failed in flow '{}': {}",
            envelope.flow_used,
            envelope.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}
