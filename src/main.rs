use query_forge::config::Config;
use query_forge::engine::{Collaborators, QueryEngine};
use query_forge::executor::StaticExecutor;
use query_forge::tools::{ToolOutcome, ToolSurface};
use query_forge::translator::TranslateOptions;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "query-forge",
    version,
    about = "Translate security questions into structured queries"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON array of rows answered for every query (offline mode)
    #[arg(long)]
    fixture: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Translate a question without running it
    Translate {
        /// Question in plain English
        text: String,
        /// Fields to return
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,
    },
    /// Translate and run a question
    Ask {
        text: String,
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,
    },
    /// List data sources
    Sources {
        /// Substring or `*` glob
        #[arg(long)]
        pattern: Option<String>,
    },
    /// Describe one data source and its fields
    Describe { name: String },
    /// Search data sources by keyword
    Search { text: String },
    /// List every callable tool
    Tools,
    /// Call a tool by name with JSON arguments
    Call {
        name: String,
        /// JSON object of arguments
        #[arg(default_value = "{}")]
        args: String,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries JSON only.
    {
        use tracing_subscriber::layer::SubscriberExt;
        use tracing_subscriber::util::SubscriberInitExt;

        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

        let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    }

    let cli = Cli::parse();
    let config_path = cli
        .config
        .unwrap_or_else(|| PathBuf::from("config.yaml"));
    let config = Config::load(&config_path).await?;

    let executor = match &cli.fixture {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read fixture: {}", path.display()))?;
            StaticExecutor::from_json(&raw)
                .with_context(|| format!("fixture is not a JSON array of rows: {}", path.display()))?
        }
        None => StaticExecutor::empty(),
    };

    let engine = Arc::new(QueryEngine::new(config, Collaborators::offline(executor)));
    engine.init().await;

    match cli.command {
        Command::Translate { text, fields } => {
            let opts = TranslateOptions { fields, now: None };
            print_json(&engine.translate(&text, &opts).await)?;
        }
        Command::Ask { text, fields } => {
            let opts = TranslateOptions { fields, now: None };
            let outcome = engine.ask(&text, &opts).await?;
            print_json(&outcome)?;
        }
        Command::Sources { pattern } => {
            let filter = query_forge::catalog::DiscoveryFilter {
                name_pattern: pattern,
                ..Default::default()
            };
            print_json(&engine.catalog().discover(&filter).await)?;
        }
        Command::Describe { name } => match engine.catalog().describe(&name).await {
            Some(descriptor) => print_json(&descriptor)?,
            None => anyhow::bail!("unknown data source: {name}"),
        },
        Command::Search { text } => {
            print_json(&engine.catalog().search(&text))?;
        }
        Command::Tools => {
            let surface = ToolSurface::new(Arc::clone(&engine));
            print_json(&surface.list_tools())?;
        }
        Command::Call { name, args } => {
            let args: serde_json::Value =
                serde_json::from_str(&args).context("arguments must be a JSON object")?;
            let surface = ToolSurface::new(Arc::clone(&engine));
            let outcome = surface.call_tool(&name, args).await;
            print_json(&outcome)?;
            if let ToolOutcome::Failure { kind, .. } = &outcome {
                tracing::debug!(kind = %kind, "tool call returned a failure");
                std::process::exit(1);
            }
        }
    }

    engine.teardown();
    Ok(())
}
