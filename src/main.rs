//! Sanctions-Sweep main entry point
//!
//! This is the command-line interface for the Sanctions-Sweep collector.

use clap::Parser;
use sanctions_sweep::collector::{collect_now, CancelToken};
use sanctions_sweep::config::{load_config_with_hash, Config};
use sanctions_sweep::output::report::{print_country_rows, print_run_record, print_run_summary};
use sanctions_sweep::output::{dataset_exists, read_dataset};
use sanctions_sweep::storage::{RunHistory, SqliteRunHistory};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Sanctions-Sweep: a concurrent sanctions-list collector
///
/// Sanctions-Sweep searches a public sanctions registry country by country,
/// follows every match to its detail page, and writes one deduplicated
/// dataset of entities with their attributes, aliases and addresses.
#[derive(Parser, Debug)]
#[command(name = "sanctions-sweep")]
#[command(version)]
#[command(about = "A concurrent sanctions-list collector", long_about = None)]
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

    /// Validate config and show what would be collected without collecting
    #[arg(long, conflicts_with_all = ["stats", "show", "has_data"])]
    dry_run: bool,

    /// Show the latest run from the history database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "show", "has_data"])]
    stats: bool,

    /// Print the collected rows of one country and exit
    #[arg(long, value_name = "COUNTRY", conflicts_with_all = ["dry_run", "stats", "has_data"])]
    show: Option<String>,

    /// Exit with status 0 if a dataset exists, 1 otherwise
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "show"])]
    has_data: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(country) = &cli.show {
        handle_show(&config, country)?;
    } else if cli.has_data {
        let present = dataset_exists(Path::new(&config.output.dataset_path));
        std::process::exit(if present { 0 } else { 1 });
    } else {
        handle_collect(&config, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sanctions_sweep=info,warn"),
            1 => EnvFilter::new("sanctions_sweep=debug,info"),
            2 => EnvFilter::new("sanctions_sweep=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the validated settings
fn handle_dry_run(config: &Config) {
    println!("=== Sanctions-Sweep Dry Run ===\n");

    println!("Registry:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Search path: {:?}", config.site.search_path);
    println!("  Entity type: {}", config.site.entity_type);
    println!("  Request timeout: {}s", config.site.request_timeout_secs);

    println!("\nCollector:");
    println!("  Max attempts per row: {}", config.collector.max_attempts);
    println!("  Retry backoff: {}ms", config.collector.retry_backoff_ms);
    println!("  Settle delay: {}ms", config.collector.settle_delay_ms);
    println!(
        "  Readiness: poll every {}ms, give up after {}ms",
        config.collector.ready_poll_ms, config.collector.ready_timeout_ms
    );

    println!("\nCoordinator:");
    println!("  Max workers: {}", config.coordinator.max_workers);
    println!("  Grace period: {}ms", config.coordinator.grace_period_ms);

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Dataset: {}", config.output.dataset_path);
    println!("  History: {}", config.output.history_path);

    if config.countries.is_empty() {
        println!("\nCountries: discovered from the registry's country dropdown");
    } else {
        println!("\nCountries ({}):", config.countries.len());
        for country in &config.countries {
            println!("  - {}", country);
        }
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows the latest run from the history
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("History: {}\n", config.output.history_path);

    let history = SqliteRunHistory::new(Path::new(&config.output.history_path))?;
    match history.latest_run()? {
        Some(run) => {
            let countries = history.country_results(run.id)?;
            print_run_record(&run, &countries);
        }
        None => println!("No runs recorded yet"),
    }

    Ok(())
}

/// Handles the --show mode: prints one country's rows from the dataset
fn handle_show(config: &Config, country: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(&config.output.dataset_path);
    if !dataset_exists(path) {
        tracing::error!("No dataset at {}; run a collection first", path.display());
        return Err(format!("no dataset at {}", path.display()).into());
    }

    let dataset = read_dataset(path)?;
    let rows = dataset.rows_for_country(country);
    if rows.is_empty() {
        println!("No entities for {}", country);
        println!("Countries with data: {}", dataset.countries().join(", "));
        return Ok(());
    }

    print_country_rows(country, &rows);
    Ok(())
}

/// Handles the main collection run
async fn handle_collect(
    config: &Config,
    config_hash: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight countries");
            on_interrupt.cancel();
        }
    });

    match collect_now(config, config_hash, &cancel).await {
        Ok(summary) => {
            print_run_summary(&summary);
            if summary.outcome.is_success() {
                Ok(())
            } else {
                Err("every country failed; no data collected".into())
            }
        }
        Err(e) => {
            tracing::error!("Collection failed: {}", e);
            Err(e.into())
        }
    }
}
