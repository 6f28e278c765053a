//! linkscout main entry point
//!
//! This is the command-line interface for the linkscout link auditor.

use anyhow::{bail, Context};
use clap::Parser;
use linkscout::config::{load_config_with_hash, validate_crawl_config, Config};
use linkscout::output::{build_report, format_markdown_report, print_statistics, write_markdown_report};
use linkscout::storage::{open_store, session_id, SessionStore};
use linkscout::{CrawlEngine, CrawlEvent, CrawlResult};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// linkscout: a website link auditor
///
/// linkscout crawls one site in the background while respecting robots.txt
/// and crawl-delay, then reports broken links, orphaned pages and pages
/// without content.
#[derive(Parser, Debug)]
#[command(name = "linkscout")]
#[command(version)]
#[command(about = "A website link auditor", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Override the seed URL
    #[arg(long, value_name = "URL")]
    seed: Option<String>,

    /// Override the maximum number of pages
    #[arg(long)]
    max_pages: Option<usize>,

    /// Override the maximum depth below the seed
    #[arg(long)]
    max_depth: Option<usize>,

    /// Override the number of simultaneous fetches
    #[arg(long)]
    concurrency: Option<usize>,

    /// Stream every crawl event to stdout as one JSON object per line
    #[arg(long)]
    json_events: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["show", "list"])]
    dry_run: bool,

    /// Print the report of a stored session and exit
    #[arg(long, value_name = "ID", conflicts_with_all = ["dry_run", "list"])]
    show: Option<String>,

    /// List stored sessions and exit
    #[arg(long, conflicts_with_all = ["dry_run", "show"])]
    list: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    apply_overrides(&mut config, &cli);

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config)
    } else if let Some(id) = &cli.show {
        handle_show(&config, id)
    } else if cli.list {
        handle_list(&config)
    } else {
        handle_crawl(config, cli.json_events).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr so that `--json-events` output stays parseable.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("linkscout=info,warn"),
            1 => EnvFilter::new("linkscout=debug,info"),
            2 => EnvFilter::new("linkscout=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(seed) = &cli.seed {
        config.crawl.seed_url = Some(seed.clone());
    }
    if let Some(max_pages) = cli.max_pages {
        config.crawl.max_pages = max_pages;
    }
    if let Some(max_depth) = cli.max_depth {
        config.crawl.max_depth = max_depth;
    }
    if let Some(concurrency) = cli.concurrency {
        config.crawl.concurrency = concurrency;
    }
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    validate_crawl_config(&config.crawl)?;
    let crawl = &config.crawl;

    println!("=== linkscout Dry Run ===\n");

    println!("Crawl Configuration:");
    println!("  Seed: {}", crawl.seed_url.as_deref().unwrap_or("(none)"));
    println!("  Max depth: {}", crawl.max_depth);
    println!("  Max pages: {}", crawl.max_pages);
    println!("  Concurrency: {}", crawl.concurrency);
    println!("  Timeout: {}ms", crawl.timeout_ms);
    println!("  Respect robots.txt: {}", crawl.respect_robots);
    println!("  Empty threshold: {} chars", crawl.empty_threshold);
    println!("  Store content: {}", crawl.store_content);

    println!("\nUser Agent:");
    println!("  Header: {}", crawl.user_agent);
    println!("  Robots token: {}", crawl.product_token());

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Summary: {}", config.output.summary_path);

    println!("\nManual Pages ({}):", crawl.manual_pages.len());
    for page in &crawl.manual_pages {
        println!("  - {}", page);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling with {} seed URLs", crawl.seeds().count());

    Ok(())
}

/// Handles the --show mode: prints a stored session's statistics and report
fn handle_show(config: &Config, id: &str) -> anyhow::Result<()> {
    let store = open_store(Path::new(&config.output.database_path))?;

    let Some(result) = store.load(id)? else {
        bail!(
            "No session '{}' in {}",
            id,
            config.output.database_path
        );
    };

    print_statistics(&result);
    let report = build_report(&result);
    println!("{}", format_markdown_report(&result, &report));

    Ok(())
}

/// Handles the --list mode: lists stored sessions
fn handle_list(config: &Config) -> anyhow::Result<()> {
    let store = open_store(Path::new(&config.output.database_path))?;
    let sessions = store.list()?;

    println!("Database: {}\n", config.output.database_path);
    if sessions.is_empty() {
        println!("No stored sessions");
        return Ok(());
    }

    for session in sessions {
        println!(
            "{}  {:<10} {:>6} pages {:>5} errors  {}  {}",
            session.id,
            session.status.as_str(),
            session.crawled_pages,
            session.error_count,
            session.finished_at,
            session.seed.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, json_events: bool) -> anyhow::Result<()> {
    tracing::info!(
        "Max depth: {}, max pages: {}, concurrency: {}",
        config.crawl.max_depth,
        config.crawl.max_pages,
        config.crawl.concurrency
    );

    let (mut engine, mut events) = CrawlEngine::new();
    engine.start(config.crawl.clone())?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    loop {
        tokio::select! {
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                tracing::warn!("Interrupted, cancelling crawl");
                if let Err(e) = engine.cancel() {
                    tracing::debug!("Cancel ignored: {}", e);
                }
            }
            event = events.recv() => {
                let Some(event) = event else {
                    bail!("Event stream closed before the crawl finished");
                };

                if json_events {
                    println!("{}", event.to_json_line()?);
                } else {
                    log_event(&event);
                }

                match event {
                    CrawlEvent::Completed(result) => {
                        return finish(&config, &result, json_events);
                    }
                    CrawlEvent::Cancelled(_) => {
                        tracing::warn!("Crawl cancelled; nothing was saved");
                        return Ok(());
                    }
                    CrawlEvent::Error { message } => bail!("Crawl failed: {}", message),
                    _ => {}
                }
            }
        }
    }
}

fn log_event(event: &CrawlEvent) {
    match event {
        CrawlEvent::Log(log) => {
            if log.success {
                tracing::debug!("{} {} ({}ms)", log.status, log.url, log.duration_ms);
            } else {
                tracing::warn!(
                    "Failed {}: {}",
                    log.url,
                    log.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
        CrawlEvent::Progress(snapshot) => {
            tracing::info!(
                "Progress: {}/{} pages ({:.0}%), {} errors, {} queued",
                snapshot.crawled_pages,
                snapshot.total_pages,
                snapshot.percent_complete,
                snapshot.error_count,
                snapshot.queue_size
            );
        }
        CrawlEvent::Paused(_) => tracing::info!("Crawl paused"),
        CrawlEvent::Resumed(_) => tracing::info!("Crawl resumed"),
        _ => {}
    }
}

/// Persists a completed crawl and writes its markdown report
fn finish(config: &Config, result: &CrawlResult, json_events: bool) -> anyhow::Result<()> {
    let id = session_id(result)?;
    let mut store = open_store(Path::new(&config.output.database_path))
        .context("Failed to open session database")?;
    store.save(&id, result)?;
    tracing::info!("Saved session {} to {}", id, config.output.database_path);

    let report = build_report(result);
    let summary_path = Path::new(&config.output.summary_path);
    write_markdown_report(result, &report, summary_path)
        .with_context(|| format!("Failed to write report to {}", summary_path.display()))?;
    tracing::info!(
        "Report written to {} ({} broken, {} orphaned, {} empty)",
        summary_path.display(),
        report.broken.len(),
        report.orphaned.len(),
        report.empty.len()
    );

    if !json_events {
        print_statistics(result);
    }

    Ok(())
}
