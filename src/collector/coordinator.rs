//! Concurrent per-country collection
//!
//! The coordinator owns the worker pool for one run:
//! - At most `max-workers` countries are collected at once
//! - Every worker gets its own session from the factory
//! - Results fan in through a `JoinSet`; a failed worker never affects siblings
//! - Cancellation stops dispatch and gives in-flight countries a grace period

use super::{CancelToken, EntityCollector};
use crate::config::Config;
use crate::model::{CountryOutcome, CountryReport, Entity, RunTally};
use crate::navigation::SessionFactory;
use crate::output::report::status_line;
use crate::ConfigResult;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;

/// Merged result of one sweep over all countries
#[derive(Debug, Clone)]
pub struct RunReport {
    /// One outcome per requested country, in request order
    pub outcomes: Vec<CountryOutcome>,
    /// All entities, concatenated in country order
    pub entities: Vec<Entity>,
    pub cancelled: bool,
}

impl RunReport {
    pub fn tally(&self) -> RunTally {
        RunTally::from_outcomes(&self.outcomes)
    }
}

/// Runs one `EntityCollector` per country under a bounded worker pool
pub struct CollectionCoordinator<F: SessionFactory> {
    factory: Arc<F>,
    collector: Arc<EntityCollector>,
    max_workers: usize,
    grace_period: Duration,
}

impl<F: SessionFactory + 'static> CollectionCoordinator<F> {
    pub fn new(config: &Config, factory: F) -> ConfigResult<Self> {
        Ok(Self::with_collector(
            EntityCollector::new(config)?,
            factory,
            config.coordinator.max_workers as usize,
            config.coordinator.grace_period(),
        ))
    }

    pub fn with_collector(
        collector: EntityCollector,
        factory: F,
        max_workers: usize,
        grace_period: Duration,
    ) -> Self {
        Self {
            factory: Arc::new(factory),
            collector: Arc::new(collector),
            max_workers: max_workers.max(1),
            grace_period,
        }
    }

    /// Collects every country and blocks until each has a terminal status
    ///
    /// # Arguments
    ///
    /// * `countries` - Countries to collect, in the order results are reported
    /// * `cancel` - Stops dispatch when triggered; in-flight workers get the grace period
    ///
    /// # Returns
    ///
    /// A `RunReport` with exactly one outcome per requested country. Countries
    /// never started report `cancelled before start`, and workers aborted after
    /// the grace period report `worker did not finish`.
    pub async fn run(&self, countries: &[String], cancel: &CancelToken) -> RunReport {
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut join_set = JoinSet::new();
        let mut in_flight: HashSet<String> = HashSet::new();
        let mut reports: Vec<CountryReport> = Vec::with_capacity(countries.len());

        tracing::info!(
            "Collecting {} countries with up to {} workers",
            countries.len(),
            self.max_workers
        );

        for country in countries {
            let permit = tokio::select! {
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                _ = cancel.cancelled() => break,
            };
            if cancel.is_cancelled() {
                break;
            }

            in_flight.insert(country.clone());
            let factory = Arc::clone(&self.factory);
            let collector = Arc::clone(&self.collector);
            let cancel = cancel.clone();
            let country = country.clone();

            join_set.spawn(async move {
                let _permit = permit;
                collect_country(factory.as_ref(), &collector, &country, &cancel).await
            });
        }

        let dispatched = in_flight.len();
        if dispatched < countries.len() {
            tracing::warn!(
                "Cancelled: {} countries were never started",
                countries.len() - dispatched
            );
        }

        let mut deadline: Option<Instant> = None;
        loop {
            if deadline.is_none() && cancel.is_cancelled() {
                tracing::warn!(
                    "Cancellation requested, waiting up to {:?} for {} workers",
                    self.grace_period,
                    join_set.len()
                );
                deadline = Some(Instant::now() + self.grace_period);
            }

            let next = match deadline {
                None => tokio::select! {
                    next = join_set.join_next() => next,
                    _ = cancel.cancelled() => continue,
                },
                Some(deadline) => {
                    match tokio::time::timeout_at(deadline, join_set.join_next()).await {
                        Ok(next) => next,
                        Err(_) => {
                            tracing::warn!(
                                "Grace period over, aborting {} workers",
                                join_set.len()
                            );
                            join_set.abort_all();
                            while let Some(result) = join_set.join_next().await {
                                accept(result, &mut in_flight, &mut reports);
                            }
                            break;
                        }
                    }
                }
            };

            match next {
                Some(result) => accept(result, &mut in_flight, &mut reports),
                None => break,
            }
        }

        // Workers that panicked or were aborted never reported
        for country in in_flight.drain() {
            reports.push(CountryReport::failed(country, "worker did not finish"));
        }

        let started: HashSet<&str> = reports.iter().map(|r| r.country.as_str()).collect();
        let never_started: Vec<CountryReport> = countries
            .iter()
            .filter(|c| !started.contains(c.as_str()))
            .map(|c| CountryReport::failed(c.as_str(), "cancelled before start"))
            .collect();
        reports.extend(never_started);

        let order = |country: &str| countries.iter().position(|c| c == country);
        reports.sort_by_key(|r| order(&r.country));

        let mut outcomes = Vec::with_capacity(reports.len());
        let mut entities = Vec::new();
        for report in reports {
            let (outcome, mut collected) = report.into_parts();
            outcomes.push(outcome);
            entities.append(&mut collected);
        }

        let report = RunReport {
            outcomes,
            entities,
            cancelled: cancel.is_cancelled(),
        };
        tracing::info!(
            "Sweep finished: {}, {} entities",
            report.tally(),
            report.entities.len()
        );
        report
    }
}

/// Handles one finished worker
fn accept(
    result: Result<CountryReport, JoinError>,
    in_flight: &mut HashSet<String>,
    reports: &mut Vec<CountryReport>,
) {
    match result {
        Ok(report) => {
            tracing::info!(
                "{}",
                status_line(&report.country, &report.status, report.entities.len())
            );
            in_flight.remove(&report.country);
            reports.push(report);
        }
        Err(e) if e.is_cancelled() => tracing::warn!("Worker aborted: {}", e),
        Err(e) => tracing::error!("Worker panicked: {}", e),
    }
}

/// Body of one worker: a fresh session, one country, then close
async fn collect_country<F: SessionFactory + ?Sized>(
    factory: &F,
    collector: &EntityCollector,
    country: &str,
    cancel: &CancelToken,
) -> CountryReport {
    let mut session = match factory.create().await {
        Ok(session) => session,
        Err(e) => {
            tracing::error!("{}: could not open a session: {}", country, e);
            return CountryReport::failed(country, format!("session unavailable: {}", e));
        }
    };

    let report = collector.collect(session.as_mut(), country, cancel).await;

    if let Err(e) = session.close().await {
        tracing::debug!("{}: closing session failed: {}", country, e);
    }
    report
}
