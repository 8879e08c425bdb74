//! Forska CLI - research assistant for academic literature
//!
//! The application logic is contained in lib.rs, and this file is responsible
//! for parsing arguments and handling top-level errors.

use anyhow::{anyhow, Context};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use forska::{agent::Summarizer, fetch::ContentFetcher, report, search, ui, Config, Summary};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "forska")]
#[command(author, version, about = "Research assistant: search, summarise and export academic papers", long_about = None)]
struct Cli {
    /// Enable debug logging (raw response shapes, extra diagnostics)
    #[arg(short, long, global = true)]
    debug: bool,

    /// Path to a config file (default: forska.toml in cwd or ~/.config/forska)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search literature and print the result list
    Search {
        /// Search query
        query: String,
        /// Search engine: google-scholar, semantic-scholar or arxiv
        #[arg(long, default_value = "google-scholar")]
        engine: String,
    },
    /// Fetch and summarise a paper by URL
    Summarise {
        /// URL to summarise
        url: String,
        /// Document title used in the report (defaults to the URL)
        #[arg(long)]
        title: Option<String>,
        /// Also export the summary as a PDF report
        #[arg(long)]
        pdf: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; debug mode adds diagnostics but never changes flow
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));
    fmt().with_env_filter(filter).with_target(true).init();

    if !atty::is(atty::Stream::Stdout) {
        colored::control::set_override(false);
    }

    let config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::load()?,
    };

    match cli.command {
        Some(Commands::Search { query, engine }) => {
            let engine = search::Engine::parse(&engine)
                .ok_or_else(|| anyhow!("unknown engine: {engine} (expected google-scholar, semantic-scholar or arxiv)"))?;
            let client = search::SearchClient::new(&config)?;
            let results = client.search(&query, engine).await?;
            if results.is_empty() {
                println!("No results found for: {}", query);
            } else {
                ui::print_results(&results);
            }
        }
        Some(Commands::Summarise { url, title, pdf }) => {
            let fetcher = ContentFetcher::new(&config);
            let summarizer = Summarizer::new(&config)?;

            println!("Fetching: {}", url);
            let content = fetcher.fetch(&url).await?;
            println!(
                "Summarising {} characters (fetched via {})...\n",
                content.text.len(),
                content.strategy
            );

            let text = summarizer.summarize(&content.text).await?;
            let title = title.unwrap_or_else(|| url.clone());
            let summary = Summary::new(title, content.source_link, url, text);

            println!("=== {} ===\n", summary.title);
            println!("{}", summary.text);

            if pdf {
                let bytes = report::render(&summary)?;
                let filename = format!("{}.pdf", report::clean_filename(&summary.title));
                let path = config.report.output_dir.join(filename);
                std::fs::write(&path, bytes)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("\nReport written to {}", path.display());
            }
        }
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "forska", &mut std::io::stdout());
        }
        None => {
            // Default: launch the interactive session
            ui::run(config).await?;
        }
    }

    Ok(())
}
