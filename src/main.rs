//! Lemma-Search main entry point
//!
//! This is the command-line interface for crawling, indexing and searching the
//! configured sites.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use lemma_search::config::{load_config_with_hash, Config};
use lemma_search::morph::SnowballAnalyzer;
use lemma_search::output::print_statistics;
use lemma_search::search::SearchQuery;
use lemma_search::service::{Service, ServiceResponse};
use lemma_search::storage::{into_shared, open_storage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Lemma-Search: crawl sites and search them by word lemmas
///
/// Pages of the configured sites are indexed by the dictionary form of their
/// words, so a search for "running" also finds "runs" and "ran".
#[derive(Parser, Debug)]
#[command(name = "lemma-search")]
#[command(version)]
#[command(about = "Lemma-based site crawler and search engine", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG", default_value = "lemma-search.toml", global = true)]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl and index every configured site (Ctrl-C stops the crawl)
    Crawl,

    /// Refetch and reindex a single page of a configured site
    IndexPage {
        /// Absolute URL of the page
        url: String,
    },

    /// Search the index and print the results as JSON
    Search {
        query: String,

        /// Only search this site (its root URL)
        #[arg(long)]
        site: Option<String>,

        /// Number of results to skip
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show index statistics
    Stats {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    let service = build_service(config)?;

    match cli.command {
        Command::Crawl => handle_crawl(&service).await,
        Command::IndexPage { url } => {
            let response = service.index_page(&url).await;
            print_response(&response)
        }
        Command::Search {
            query,
            site,
            offset,
            limit,
        } => {
            let mut request = SearchQuery::new(query).offset(offset);
            request.site = site;
            request.limit = limit;
            print_response(&service.search(&request))
        }
        Command::Stats { json } => handle_stats(&service, json),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("lemma_search=info,warn"),
            1 => EnvFilter::new("lemma_search=debug,info"),
            2 => EnvFilter::new("lemma_search=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn build_service(config: Config) -> anyhow::Result<Service> {
    let storage = open_storage(Path::new(&config.storage.database_path))
        .with_context(|| format!("Failed to open {}", config.storage.database_path))?;
    let service = Service::new(
        config,
        into_shared(storage),
        Arc::new(SnowballAnalyzer::new()),
    )?;
    Ok(service)
}

/// Runs a full crawl until it finishes or Ctrl-C stops it
async fn handle_crawl(service: &Service) -> anyhow::Result<()> {
    let started = service.start_indexing();
    if !started.result {
        bail!(started.error.unwrap_or_default());
    }

    let finished = service.wait_for_indexing();
    tokio::pin!(finished);

    let reports = tokio::select! {
        reports = &mut finished => reports?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupt received, stopping crawl");
            service.stop_indexing();
            finished.await?
        }
    };

    println!("=== Crawl Finished ===\n");
    for report in &reports {
        match &report.error {
            Some(error) => println!("{} ({}): {} - {}", report.name, report.url, report.status, error),
            None => println!("{} ({}): {}", report.name, report.url, report.status),
        }
    }

    Ok(())
}

fn handle_stats(service: &Service, json: bool) -> anyhow::Result<()> {
    let response = service.statistics();
    match response.data {
        Some(stats) if !json => {
            print_statistics(&stats);
            Ok(())
        }
        Some(stats) => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
        None => bail!(response.error.unwrap_or_default()),
    }
}

fn print_response<T: serde::Serialize>(response: &ServiceResponse<T>) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(response)?);
    if !response.result {
        bail!(response.error.clone().unwrap_or_default());
    }
    Ok(())
}
