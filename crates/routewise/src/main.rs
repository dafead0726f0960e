//! Route a query through the tool catalog or the content pipeline and
//! print the result as JSON.
//!
//! Reads `OPENROUTER_KEY` and `BRAVE_SEARCH_KEY` from the environment.
//!
//! # Examples
//!
//! ```sh
//! # Classify a query and show the tools it would use
//! routewise analyze "What is quantum entanglement?"
//!
//! # Analyze, pick a strategy, and run the tools
//! routewise run "calculate 12*7 and define photosynthesis"
//!
//! # Call one tool directly (with fallbacks)
//! routewise call statistics "1, 2, 3, 4"
//!
//! # Research, write, and review an article
//! routewise pipeline "How do heat pumps work?" --personalization "a homeowner"
//!
//! # List registered tools
//! routewise tools
//! ```

use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand};
use routewise::config::RouterConfig;
use routewise::router::ToolRouter;
use routewise::tools::ToolOutcome;
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Route queries to search, knowledge, and computation tools.
#[derive(Parser)]
#[command(name = "routewise")]
struct Cli {
    /// Completion model (overrides ROUTEWISE_MODEL)
    #[arg(long, global = true)]
    model: Option<String>,

    /// Tool result cache TTL in seconds
    #[arg(long, global = true)]
    cache_ttl: Option<u64>,

    /// Print compact JSON instead of pretty-printed
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify a query without running any tools
    Analyze { query: String },
    /// Analyze a query and execute the chosen strategy
    Run { query: String },
    /// Invoke one tool through the cache and its fallback chain
    Call { tool: String, input: String },
    /// Run the research → write → review pipeline
    Pipeline {
        query: String,
        /// Reader description appended to the writer instruction
        #[arg(long)]
        personalization: Option<String>,
    },
    /// List registered tools and cache statistics
    Tools,
}

fn print_json<T: Serialize>(value: &T, compact: bool) -> Result<(), String> {
    let text = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    }
    .map_err(|e| format!("failed to serialize output: {e}"))?;
    println!("{text}");
    Ok(())
}

async fn run(cli: Cli) -> Result<(), String> {
    let mut config = RouterConfig::from_env().map_err(|e| e.to_string())?;
    if let Some(model) = cli.model {
        config = config.with_model(model);
    }
    if let Some(secs) = cli.cache_ttl {
        config = config.with_cache_ttl(Duration::from_secs(secs));
    }
    let router = ToolRouter::from_config(&config)?;

    match cli.command {
        Command::Analyze { query } => print_json(&router.analyze(&query), cli.compact),
        Command::Run { query } => {
            print_json(&router.execute_optimal_strategy(&query).await, cli.compact)
        }
        Command::Call { tool, input } => {
            let outcome =
                ToolOutcome::from_result(router.engine().execute_with_cache(&tool, &input).await);
            print_json(&outcome, cli.compact)
        }
        Command::Pipeline {
            query,
            personalization,
        } => {
            let output = router
                .run_pipeline(&query, None, personalization.as_deref())
                .await
                .map_err(|e| e.to_string())?;
            print_json(&output, cli.compact)
        }
        Command::Tools => print_json(
            &serde_json::json!({
                "tools": router.list_tools(),
                "cache": router.cache_stats(),
            }),
            cli.compact,
        ),
    }
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
