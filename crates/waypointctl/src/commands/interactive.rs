use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{build_agent, cancel_on_interrupt, cli_metadata};
use crate::output;

const HELP: &str = "\
Commands:
  help                   Show this help
  quit | exit | q        Leave interactive mode
  flow:<type> <text>     Run <text> on a specific flow (search, llm, math)
  <text>                 Route <text> by pattern

Examples:
  search for latest Rust releases
  explain ownership in simple terms
  calculate 15 + 25
  flow:math divide 100 by 4";

/// One parsed line of interactive input
#[derive(Debug, PartialEq, Eq)]
pub enum Line<'a> {
    Empty,
    Quit,
    Help,
    Request { flow: Option<&'a str>, text: &'a str },
}

pub fn parse_line(line: &str) -> Line<'_> {
    let line = line.trim();
    match line.to_lowercase().as_str() {
        "" => return Line::Empty,
        "quit" | "exit" | "q" => return Line::Quit,
        "help" => return Line::Help,
        _ => {}
    }

    if let Some(rest) = strip_flow_prefix(line) {
        let rest = rest.trim_start();
        let (flow, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        return Line::Request {
            flow: Some(flow).filter(|f| !f.is_empty()),
            text: text.trim(),
        };
    }

    Line::Request {
        flow: None,
        text: line,
    }
}

/// Text after a leading `flow:`, matched case-insensitively
fn strip_flow_prefix(line: &str) -> Option<&str> {
    const PREFIX: &str = "flow:";
    line.get(..PREFIX.len())
        .filter(|head| head.eq_ignore_ascii_case(PREFIX))
        .map(|_| &line[PREFIX.len()..])
}

/// Read requests from stdin until quit or end of input
pub async fn execute(config: &str, verbose: bool) -> Result<()> {
    let agent = Arc::new(build_agent(config)?);
    let interrupt = cancel_on_interrupt(agent.clone());

    println!("{}", "Waypoint interactive mode".bold().cyan());
    println!("Type 'help' for commands, 'quit' to exit.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", "waypoint>".bold().green());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_line(&line) {
            Line::Empty => continue,
            Line::Quit => break,
            Line::Help => println!("{}", HELP),
            Line::Request { text, .. } if text.is_empty() => {
                println!("{}", "Nothing to run. Usage: flow:<type> <text>".yellow());
            }
            Line::Request { flow, text } => {
                let envelope = agent.execute(text, flow, cli_metadata("interactive")).await;
                output::print_envelope(&envelope, verbose);
                println!();
            }
        }
    }

    interrupt.abort();
    println!("Goodbye!");
    Ok(())
}
