use clap::{Parser, Subcommand};

use crate::commands;

/// Waypoint CLI - route requests through search, LLM and math flows
#[derive(Parser, Debug)]
#[command(name = "waypointctl")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Flow configuration file
    #[arg(
        long,
        short = 'c',
        global = true,
        env = "WAYPOINT_CONFIG",
        default_value = "configs/flows.yaml"
    )]
    pub config: String,

    /// Show execution details and debug logs
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a single request
    Run {
        /// Request text
        input: String,

        /// Force a flow (search, llm, math) instead of routing by pattern
        #[arg(short, long)]
        flow: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: String,
    },

    /// Read requests from stdin until quit
    Interactive,

    /// List configured flows
    ListFlows,

    /// Load, validate and compile the configuration
    ValidateConfig,

    /// Run the canned requests for one flow or all of them
    Test {
        /// Flow to exercise (all, search, llm, math)
        #[arg(short, long, default_value = "all")]
        flow: String,
    },

    /// Render the compiled flow chains
    Visualize {
        /// Diagram format (ascii, dot)
        #[arg(short, long, default_value = "ascii")]
        format: String,

        /// Write one file per flow into this directory instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },
}

impl Cli {
    pub async fn execute(self) -> anyhow::Result<()> {
        match self.command {
            Commands::Run {
                input,
                flow,
                output,
            } => {
                commands::run::execute(&self.config, &input, flow.as_deref(), &output, self.verbose)
                    .await
            }
            Commands::Interactive => {
                commands::interactive::execute(&self.config, self.verbose).await
            }
            Commands::ListFlows => commands::flows::list(&self.config),
            Commands::ValidateConfig => commands::flows::validate(&self.config),
            Commands::Test { flow } => commands::selftest::execute(&self.config, &flow).await,
            Commands::Visualize { format, output } => {
                commands::visualize::execute(&self.config, &format, output.as_deref())
            }
        }
    }
}
