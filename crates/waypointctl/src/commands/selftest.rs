use std::sync::Arc;

use anyhow::{bail, Result};
use colored::Colorize;
use futures::future::join_all;

use super::{build_agent, cancel_on_interrupt, cli_metadata};
use crate::output::preview;

/// Canned requests per flow
pub const TEST_CASES: &[(&str, &[&str])] = &[
    (
        "search",
        &[
            "search for latest Python tutorials",
            "find information about climate change",
        ],
    ),
    (
        "llm",
        &[
            "explain quantum computing in simple terms",
            "what is the meaning of life",
        ],
    ),
    ("math", &["calculate 15 + 25", "divide 100 by 4"]),
];

const PREVIEW_CHARS: usize = 100;

/// Requests to run for `flow` ("all" or a flow id), or None if unknown
pub fn cases_for(flow: &str) -> Option<Vec<(&'static str, &'static str)>> {
    let flow = flow.trim().to_lowercase();
    let selected: Vec<_> = TEST_CASES
        .iter()
        .filter(|(id, _)| flow == "all" || *id == flow)
        .flat_map(|(id, inputs)| inputs.iter().map(move |input| (*id, *input)))
        .collect();

    (!selected.is_empty()).then_some(selected)
}

/// Run the canned requests and report each result
pub async fn execute(config: &str, flow: &str) -> Result<()> {
    let Some(cases) = cases_for(flow) else {
        bail!("Unknown flow: {} (expected all, search, llm or math)", flow);
    };

    let agent = Arc::new(build_agent(config)?);
    let interrupt = cancel_on_interrupt(agent.clone());

    let envelopes = join_all(
        cases
            .iter()
            .map(|&(flow, input)| agent.execute(input, Some(flow), cli_metadata("test"))),
    )
    .await;
    interrupt.abort();

    let mut passed = 0;
    let mut current = "";
    for (&(flow, input), envelope) in cases.iter().zip(&envelopes) {
        if flow != current {
            println!("\n{}", format!("🧪 Testing {} flow", flow).bold().cyan());
            current = flow;
        }

        println!("📝 Input: {}", input);
        if envelope.success {
            passed += 1;
            println!("{}", "✅ Success".green());
            println!("Output preview: {}", preview(&envelope.output, PREVIEW_CHARS));
        } else {
            println!(
                "{} {}",
                "❌ Failed:".red(),
                envelope.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    println!("\n{} {}/{}", "Passed:".bold(), passed, envelopes.len());
    Ok(())
}
