//! Per-country collection pipeline
//!
//! One `EntityCollector::collect` call drives a single navigation session
//! through search, listing, detail page and back for every listing row of one
//! country, sequentially and in listing order.

use super::{CancelToken, RetryPolicy};
use crate::config::{Config, SelectorConfig};
use crate::extract::{link_selector, page_contains, PageRecordExtractor};
use crate::model::{CountryReport, CountryStatus, Entity, SearchRow};
use crate::navigation::{wait_until_ready, NavigationSession};
use crate::{ConfigError, ConfigResult, ExtractionError, NavigationError, NavigationResult};
use std::time::Duration;
use url::Url;

/// Why one listing row did not produce an entity
#[derive(Debug)]
enum RowError {
    Navigation(NavigationError),
    Extraction(ExtractionError),
}

impl From<NavigationError> for RowError {
    fn from(e: NavigationError) -> Self {
        Self::Navigation(e)
    }
}

impl From<ExtractionError> for RowError {
    fn from(e: ExtractionError) -> Self {
        Self::Extraction(e)
    }
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Navigation(e) => write!(f, "{}", e),
            Self::Extraction(e) => write!(f, "{}", e),
        }
    }
}

/// Terminal result of one row after retries
enum RowFailure {
    /// The row is skipped; the country continues
    Lost(String),
    /// The session is unusable; the country stops here
    Fatal(NavigationError),
}

/// Collects the entities of one country through a navigation session
#[derive(Debug, Clone)]
pub struct EntityCollector {
    extractor: PageRecordExtractor,
    selectors: SelectorConfig,
    search_url: Url,
    entity_type: String,
    retry: RetryPolicy,
    settle_delay: Duration,
    ready_timeout: Duration,
    ready_poll: Duration,
}

impl EntityCollector {
    pub fn new(config: &Config) -> ConfigResult<Self> {
        let search_url = Url::parse(&config.site.base_url)
            .and_then(|base| base.join(&config.site.search_path))
            .map_err(|e| ConfigError::InvalidUrl(format!("search page: {}", e)))?;

        Ok(Self {
            extractor: PageRecordExtractor::new(&config.selectors)?,
            selectors: config.selectors.clone(),
            search_url,
            entity_type: config.site.entity_type.clone(),
            retry: RetryPolicy::from_config(&config.collector),
            settle_delay: config.collector.settle_delay(),
            ready_timeout: config.collector.ready_timeout(),
            ready_poll: config.collector.ready_poll(),
        })
    }

    /// URL of the search/listing page
    pub fn search_url(&self) -> &Url {
        &self.search_url
    }

    /// Collects every entity listed for `country`
    ///
    /// Never fails: per-row problems are counted as lost rows and a listing
    /// page that cannot be reached yields a `Failed` report.
    ///
    /// # Arguments
    ///
    /// * `session` - A session owned by this country for the whole call
    /// * `country` - Country label to select in the search form
    /// * `cancel` - Checked between rows and during retry backoff
    ///
    /// # Returns
    ///
    /// A `CountryReport` holding the collected entities and the terminal status
    pub async fn collect(
        &self,
        session: &mut dyn NavigationSession,
        country: &str,
        cancel: &CancelToken,
    ) -> CountryReport {
        tracing::info!("{}: searching", country);

        let rows = match self.search_listing(session, country, cancel).await {
            Ok(Some(rows)) => rows,
            Ok(None) => {
                tracing::info!("{}: no results table, 0 entities", country);
                return CountryReport {
                    country: country.to_string(),
                    status: CountryStatus::Ok,
                    rows_seen: 0,
                    entities: Vec::new(),
                };
            }
            Err(e) => {
                tracing::error!("{}: listing page unreachable: {}", country, e);
                return CountryReport::failed(country, e.to_string());
            }
        };

        let rows_seen = rows.len();
        tracing::info!("{}: {} listing rows", country, rows_seen);

        let mut entities = Vec::with_capacity(rows_seen);
        let mut rows_lost = 0;

        for (index, row) in rows.iter().enumerate() {
            if cancel.is_cancelled() {
                let remaining = rows_seen - index;
                tracing::warn!("{}: cancelled, {} rows not collected", country, remaining);
                rows_lost += remaining;
                break;
            }

            let result = match row.detail_link {
                Some(_) => self.collect_row(session, row, country, cancel).await,
                None => Entity::bare(row.clone(), country)
                    .map_err(|e| RowFailure::Lost(e.to_string())),
            };

            match result {
                Ok(entity) => entities.push(entity),
                Err(RowFailure::Lost(reason)) => {
                    tracing::warn!("{}: row `{}` lost: {}", country, row.name, reason);
                    rows_lost += 1;
                }
                Err(RowFailure::Fatal(e)) => {
                    let remaining = rows_seen - index;
                    tracing::error!(
                        "{}: session failed at row `{}`, {} rows not collected: {}",
                        country,
                        row.name,
                        remaining,
                        e
                    );
                    rows_lost += remaining;
                    break;
                }
            }
        }

        let status = if rows_lost == 0 {
            CountryStatus::Ok
        } else {
            CountryStatus::Partial { rows_lost }
        };
        tracing::info!(
            "{}: {} entities from {} rows ({})",
            country,
            entities.len(),
            rows_seen,
            status
        );

        CountryReport {
            country: country.to_string(),
            status,
            rows_seen,
            entities,
        }
    }

    /// Runs the search with the retry budget
    async fn search_listing(
        &self,
        session: &mut dyn NavigationSession,
        country: &str,
        cancel: &CancelToken,
    ) -> NavigationResult<Option<Vec<SearchRow>>> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.search(session, country).await {
                Err(e) if self.retry.should_retry(&e, attempt) => {
                    tracing::warn!(
                        "{}: search attempt {}/{} failed: {}",
                        country,
                        attempt,
                        self.retry.max_attempts,
                        e
                    );
                    if !self.retry.backoff(cancel).await {
                        return Err(NavigationError::fatal("run cancelled"));
                    }
                }
                result => return result,
            }
        }
    }

    /// Submits the search form for `country`
    ///
    /// Returns `None` when the results page has no results table.
    async fn search(
        &self,
        session: &mut dyn NavigationSession,
        country: &str,
    ) -> NavigationResult<Option<Vec<SearchRow>>> {
        session.open(self.search_url.as_str()).await?;
        self.wait_ready(session, &self.selectors.listing_ready).await?;

        session
            .select_option(&self.selectors.type_dropdown, &self.entity_type)
            .await?;
        session
            .select_option(&self.selectors.country_dropdown, country)
            .await?;
        session.find_and_activate(&self.selectors.search_button).await?;
        self.settle().await;

        let content = self.wait_ready(session, &self.selectors.listing_ready).await?;
        Ok(self.extractor.search_rows(&content))
    }

    /// Builds one row's entity, retrying transient failures
    async fn collect_row(
        &self,
        session: &mut dyn NavigationSession,
        row: &SearchRow,
        country: &str,
        cancel: &CancelToken,
    ) -> Result<Entity, RowFailure> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let error = match self.enrich_row(session, row, country).await {
                Ok(entity) => return Ok(entity),
                Err(error) => error,
            };

            match error {
                RowError::Navigation(e) if self.retry.should_retry(&e, attempt) => {
                    tracing::warn!(
                        "{}: row `{}` attempt {}/{} failed, retrying in {:?}: {}",
                        country,
                        row.name,
                        attempt,
                        self.retry.max_attempts,
                        self.retry.backoff,
                        e
                    );
                    if !self.retry.backoff(cancel).await {
                        return Err(RowFailure::Lost("run cancelled during retry".to_string()));
                    }
                }
                RowError::Navigation(e) if e.is_fatal() => return Err(RowFailure::Fatal(e)),
                other => {
                    if let Err(e) = self.restore_listing(session, country).await {
                        if !e.is_transient() {
                            return Err(RowFailure::Fatal(e));
                        }
                    }
                    let reason = match &other {
                        RowError::Navigation(e) if e.is_transient() => {
                            format!("gave up after {} attempts: {}", attempt, e)
                        }
                        _ => other.to_string(),
                    };
                    return Err(RowFailure::Lost(reason));
                }
            }
        }
    }

    /// One attempt at listing → detail page → listing for `row`
    async fn enrich_row(
        &self,
        session: &mut dyn NavigationSession,
        row: &SearchRow,
        country: &str,
    ) -> Result<Entity, RowError> {
        let link = row
            .detail_link
            .as_deref()
            .ok_or_else(|| ExtractionError::Mismatch("row has no detail link".to_string()))?;

        self.restore_listing(session, country).await?;

        tracing::debug!("{}: opening detail page of `{}`", country, row.name);
        session.find_and_activate(&link_selector(link)).await?;
        let content = self.wait_ready(session, &self.selectors.detail_ready).await?;

        let records = self.extractor.detail_records(&content);
        let entity = Entity::assemble(
            row.clone(),
            country,
            records.attributes,
            records.aliases,
            records.addresses,
        )?;

        // The entity is complete; a failed return is repaired before the next row
        if let Err(e) = session.go_back().await {
            tracing::debug!("{}: going back after `{}` failed: {}", country, row.name, e);
        }
        self.settle().await;

        Ok(entity)
    }

    /// Makes sure the results table is showing, going back or searching again
    async fn restore_listing(
        &self,
        session: &mut dyn NavigationSession,
        country: &str,
    ) -> NavigationResult<()> {
        if self.listing_visible(session).await? {
            return Ok(());
        }

        tracing::debug!("{}: listing not showing, going back", country);
        if session.go_back().await.is_ok() && self.listing_visible(session).await? {
            return Ok(());
        }

        tracing::debug!("{}: re-submitting search to restore listing", country);
        match self.search(session, country).await? {
            Some(_) => Ok(()),
            None => Err(NavigationError::fatal(
                "results table vanished after searching again",
            )),
        }
    }

    async fn listing_visible(&self, session: &dyn NavigationSession) -> NavigationResult<bool> {
        let content = session.current_content().await?;
        Ok(page_contains(&content, &self.selectors.results_table))
    }

    async fn wait_ready(
        &self,
        session: &dyn NavigationSession,
        selector: &str,
    ) -> NavigationResult<String> {
        wait_until_ready(session, selector, self.ready_timeout, self.ready_poll).await
    }

    async fn settle(&self) {
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }
    }
}
