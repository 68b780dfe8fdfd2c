//! One complete collection run
//!
//! Resolves the country list, sweeps it, builds the dataset, replaces the
//! persisted file and records the run in the history database.

use super::{CancelToken, CollectionCoordinator, EntityCollector};
use crate::config::Config;
use crate::extract::{dropdown_options, DropdownOption};
use crate::model::{CountryOutcome, RunOutcome, RunTally};
use crate::navigation::{wait_until_ready, HttpSessionFactory, SessionFactory};
use crate::output::{write_dataset, DatasetBuilder};
use crate::storage::{RunCompletion, RunHistory, SqliteRunHistory};
use crate::{Result, SweepError};
use std::collections::HashSet;
use std::path::Path;

/// What a finished run reports to its caller
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: i64,
    pub outcome: RunOutcome,
    pub tally: RunTally,
    pub countries: Vec<CountryOutcome>,
    /// Rows in the built dataset, after deduplication
    pub entity_count: usize,
    pub dataset_written: bool,
    pub cancelled: bool,
}

/// Runs a full collection against the live registry and blocks until it is done
///
/// Calling this again after it returns starts a fresh run.
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `config_hash` - Hash of the configuration file, recorded with the run
/// * `cancel` - Run-level cancellation signal
///
/// # Returns
///
/// * `Ok(RunSummary)` - The run finished, possibly with failed countries
/// * `Err(SweepError)` - The history database, country discovery or the dataset write failed
///
/// # Example
///
/// ```no_run
/// use sanctions_sweep::collector::{collect_now, CancelToken};
/// use sanctions_sweep::config::load_config_with_hash;
/// use std::path::Path;
///
/// # async fn run() -> sanctions_sweep::Result<()> {
/// let (config, hash) = load_config_with_hash(Path::new("sweep.toml"))?;
/// let summary = collect_now(&config, &hash, &CancelToken::new()).await?;
/// println!("{} rows", summary.entity_count);
/// # Ok(())
/// # }
/// ```
pub async fn collect_now(
    config: &Config,
    config_hash: &str,
    cancel: &CancelToken,
) -> Result<RunSummary> {
    let mut history = SqliteRunHistory::new(Path::new(&config.output.history_path))?;
    let factory = HttpSessionFactory::new(config);
    collect_with(config, factory, &mut history, config_hash, cancel).await
}

/// Runs a full collection with the given sessions and history
///
/// The dataset is replaced only when the run was not cancelled and at least
/// one country did not fail. The run is recorded in `history` either way.
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `factory` - Creates one navigation session per worker
/// * `history` - Where the run and its per-country results are recorded
/// * `config_hash` - Hash of the configuration file
/// * `cancel` - Run-level cancellation signal
///
/// # Returns
///
/// A `RunSummary` with the outcome, tally and per-country results
pub async fn collect_with<F: SessionFactory + 'static>(
    config: &Config,
    factory: F,
    history: &mut dyn RunHistory,
    config_hash: &str,
    cancel: &CancelToken,
) -> Result<RunSummary> {
    let collector = EntityCollector::new(config)?;
    let builder = DatasetBuilder::new(&config.site.base_url)?;

    let run_id = history.begin_run(config_hash)?;
    tracing::info!("Run {} started", run_id);

    let countries = if config.countries.is_empty() {
        match discover_countries(&factory, &collector, config).await {
            Ok(countries) => countries,
            Err(e) => {
                tracing::error!("Run {}: {}", run_id, e);
                history.finish_run(
                    run_id,
                    &RunCompletion {
                        outcome: RunOutcome::Failed,
                        tally: RunTally::default(),
                        entity_count: 0,
                        cancelled: cancel.is_cancelled(),
                        dataset_written: false,
                    },
                )?;
                return Err(e);
            }
        }
    } else {
        config.countries.clone()
    };

    let coordinator = CollectionCoordinator::with_collector(
        collector,
        factory,
        config.coordinator.max_workers as usize,
        config.coordinator.grace_period(),
    );
    let report = coordinator.run(&countries, cancel).await;

    let tally = report.tally();
    let cancelled = report.cancelled;
    let dataset = builder.build(report.entities);
    let outcome = RunOutcome::classify(&tally, dataset.len());

    // A cancelled or fully failed run leaves the previous dataset in place
    let write_result = if cancelled {
        tracing::warn!("Run {} cancelled, keeping the existing dataset", run_id);
        Ok(false)
    } else if !outcome.is_success() {
        tracing::error!("Run {}: every country failed, keeping the existing dataset", run_id);
        Ok(false)
    } else {
        write_dataset(Path::new(&config.output.dataset_path), &dataset).map(|_| true)
    };
    let dataset_written = matches!(write_result, Ok(true));

    history.record_countries(run_id, &report.outcomes)?;
    history.finish_run(
        run_id,
        &RunCompletion {
            outcome,
            tally,
            entity_count: dataset.len(),
            cancelled,
            dataset_written,
        },
    )?;
    write_result?;

    tracing::info!(
        "Run {} {}: {}, {} dataset rows",
        run_id,
        outcome.to_db_string(),
        tally,
        dataset.len()
    );

    Ok(RunSummary {
        run_id,
        outcome,
        tally,
        countries: report.outcomes,
        entity_count: dataset.len(),
        dataset_written,
        cancelled,
    })
}

/// Reads the country list from the search page's country dropdown
pub async fn discover_countries<F: SessionFactory + ?Sized>(
    factory: &F,
    collector: &EntityCollector,
    config: &Config,
) -> Result<Vec<String>> {
    let mut session = factory
        .create()
        .await
        .map_err(|e| SweepError::Discovery(e.to_string()))?;

    let loaded = async {
        session.open(collector.search_url().as_str()).await?;
        wait_until_ready(
            session.as_ref(),
            &config.selectors.country_dropdown,
            config.collector.ready_timeout(),
            config.collector.ready_poll(),
        )
        .await
    }
    .await;

    if let Err(e) = session.close().await {
        tracing::debug!("Closing discovery session failed: {}", e);
    }

    let content = loaded.map_err(|e| SweepError::Discovery(e.to_string()))?;
    let options = dropdown_options(&content, &config.selectors.country_dropdown)
        .ok_or_else(|| SweepError::Discovery("country dropdown not found".to_string()))?;

    let countries = country_names(options, &config.site.all_countries_label);
    if countries.is_empty() {
        return Err(SweepError::Discovery(
            "country dropdown lists no countries".to_string(),
        ));
    }

    tracing::info!("Discovered {} countries", countries.len());
    Ok(countries)
}

/// Country labels of the dropdown, without the placeholder, blanks and repeats
fn country_names(options: Vec<DropdownOption>, all_label: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    options
        .into_iter()
        .filter(|o| !o.value.trim().is_empty() && !o.label.is_empty())
        .filter(|o| !o.label.eq_ignore_ascii_case(all_label.trim()))
        .filter(|o| seen.insert(o.label.clone()))
        .map(|o| o.label)
        .collect()
}
