use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use waypoint_runtime::{ExecutableChain, Transition};

use super::build_agent;

const END_ID: &str = "__end__";

type Renderer = fn(&ExecutableChain) -> String;

/// Render every compiled chain to stdout, or one file per flow
pub fn execute(config: &str, format: &str, output: Option<&str>) -> Result<()> {
    let (render, extension): (Renderer, &str) = match format {
        "ascii" => (render_ascii as Renderer, "txt"),
        "dot" => (render_dot as Renderer, "dot"),
        other => bail!("Unsupported diagram format: {} (expected ascii or dot)", other),
    };

    let agent = build_agent(config)?;

    let Some(dir) = output else {
        for chain in agent.chains() {
            println!("{}", render(chain));
        }
        return Ok(());
    };

    let dir = Path::new(dir);
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    for chain in agent.chains() {
        let path = dir.join(format!("{}_flow.{}", chain.flow(), extension));
        fs::write(&path, render(chain))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("{} {}", "✅ Wrote".green(), path.display());
    }
    Ok(())
}

/// Vertical chain following the edges from the entry node
pub fn render_ascii(chain: &ExecutableChain) -> String {
    let mut lines = vec![format!("{} flow", chain.flow()), String::new()];

    let order = chain.visit_order();
    for (index, (name, node_type, next)) in chain.edges().into_iter().enumerate() {
        lines.push(format!("○ {} [{}]", name, node_type));
        lines.push("│  ↓".to_string());
        if let Transition::Node(target) = next {
            let loops_back = order.iter().position(|n| *n == target).map_or(true, |i| i <= index);
            if loops_back {
                lines.push(format!("↺ {}", target));
                return lines.join("\n");
            }
        }
    }

    lines.push("● END".to_string());
    lines.join("\n")
}

/// Graphviz digraph with every declared node and its edge
pub fn render_dot(chain: &ExecutableChain) -> String {
    let mut out = format!("digraph {} {{\n    rankdir=TB;\n", chain.flow());

    for name in chain.declared() {
        if let Some(step) = chain.step(name) {
            let shape = if name == chain.entry() { "box, style=bold" } else { "box" };
            out.push_str(&format!(
                "    \"{}\" [label=\"{}\\n{}\", shape={}];\n",
                name, name, step.node_type, shape
            ));
        }
    }
    out.push_str(&format!(
        "    \"{}\" [label=\"END\", shape=doublecircle];\n",
        END_ID
    ));

    for name in chain.declared() {
        if let Some(step) = chain.step(name) {
            let target = match &step.next {
                Transition::Node(next) => next.as_str(),
                Transition::End => END_ID,
            };
            out.push_str(&format!("    \"{}\" -> \"{}\";\n", name, target));
        }
    }

    out.push('}');
    out
}
