//! Site Tomograph main entry point
//!
//! This is the command-line interface for the Site Tomograph structural
//! site scanner.

use anyhow::Context;
use clap::Parser;
use site_tomograph::config::load_config;
use site_tomograph::{Config, CrawlSession, EventEmitter, RateGovernor};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Site Tomograph: a bounded structural site scanner
///
/// Site Tomograph crawls a single site from one seed URL, builds a topology
/// graph of pages and links, classifies page health, and prints the scan as
/// a stream of JSON events followed by a final structured report.
#[derive(Parser, Debug)]
#[command(name = "site-tomograph")]
#[command(version = "1.0.0")]
#[command(about = "A bounded structural site scanner", long_about = None)]
struct Cli {
    /// Seed URL to scan (scheme optional, https assumed)
    #[arg(value_name = "URL")]
    url: String,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Print only the final report instead of the full event stream
    #[arg(long)]
    report_only: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => Config::default(),
    };

    // The CLI is its own single client; admission still runs so a scripted
    // loop around the binary observes the same limits a service would apply.
    let governor = RateGovernor::new(&config.limits);
    let permit = governor
        .admit("local")
        .context("scan admission refused")?;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let session = CrawlSession::new(&cli.url, config, EventEmitter::new(tx), Some(permit))
        .await
        .context("seed rejected")?;

    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if cli.report_only {
                if let site_tomograph::ScanEvent::ScanComplete { report } = &event {
                    match serde_json::to_string_pretty(report) {
                        Ok(json) => println!("{}", json),
                        Err(e) => tracing::error!("Failed to serialize report: {}", e),
                    }
                }
            } else {
                match serde_json::to_string(&event) {
                    Ok(json) => println!("{}", json),
                    Err(e) => tracing::error!("Failed to serialize event: {}", e),
                }
            }
        }
    });

    let outcome = session.run().await;
    // Session dropped above; the channel closes and the printer drains
    printer.await.ok();

    let (termination, report) = outcome.context("scan failed")?;
    tracing::info!(
        "Scan terminated ({:?}): {} pages, {} dead links",
        termination,
        report.summary.total_pages,
        report.summary.dead_links
    );

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_tomograph=warn,error"),
            1 => EnvFilter::new("site_tomograph=info,warn"),
            2 => EnvFilter::new("site_tomograph=debug,info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}
