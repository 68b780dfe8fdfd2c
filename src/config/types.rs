use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Sanctions-Sweep
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Countries to collect; empty means "discover from the search page"
    #[serde(default)]
    pub countries: Vec<String>,

    #[serde(default)]
    pub site: SiteConfig,

    #[serde(default)]
    pub selectors: SelectorConfig,

    #[serde(default)]
    pub collector: CollectorConfig,

    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Target registry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Base URL used for the search page and for absolute detail links
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path of the search/listing page relative to the base URL
    #[serde(rename = "search-path", default)]
    pub search_path: String,

    /// Fixed entity-type filter submitted with every search
    #[serde(rename = "entity-type", default = "default_entity_type")]
    pub entity_type: String,

    /// Placeholder option of the country dropdown that is never collected
    #[serde(rename = "all-countries-label", default = "default_all_label")]
    pub all_countries_label: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://sanctionssearch.ofac.treas.gov/".to_string(),
            search_path: String::new(),
            entity_type: default_entity_type(),
            all_countries_label: default_all_label(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_entity_type() -> String {
    "Entity".to_string()
}

fn default_all_label() -> String {
    "All".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

/// CSS selectors locating the controls and tables of the registry pages
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    #[serde(rename = "country-dropdown")]
    pub country_dropdown: String,

    #[serde(rename = "type-dropdown")]
    pub type_dropdown: String,

    #[serde(rename = "search-button")]
    pub search_button: String,

    #[serde(rename = "results-table")]
    pub results_table: String,

    #[serde(rename = "detail-table")]
    pub detail_table: String,

    #[serde(rename = "alias-table")]
    pub alias_table: String,

    #[serde(rename = "address-table")]
    pub address_table: String,

    /// Element whose presence marks the listing page as loaded
    #[serde(rename = "listing-ready")]
    pub listing_ready: String,

    /// Element whose presence marks a detail page as loaded
    #[serde(rename = "detail-ready")]
    pub detail_ready: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            country_dropdown: "#ctl00_MainContent_ddlCountry".to_string(),
            type_dropdown: r#"select[name="ctl00$MainContent$ddlType"]"#.to_string(),
            search_button: "#ctl00_MainContent_btnSearch".to_string(),
            results_table: "#gvSearchResults".to_string(),
            detail_table: "table.MainTable".to_string(),
            alias_table: "#ctl00_MainContent_gvAliases".to_string(),
            address_table: "#ctl00_MainContent_pnlAddress table".to_string(),
            listing_ready: "#ctl00_MainContent_btnSearch".to_string(),
            detail_ready: "body".to_string(),
        }
    }
}

impl SelectorConfig {
    /// Returns every selector with its configuration key, for validation
    pub fn named(&self) -> [(&'static str, &str); 9] {
        [
            ("country-dropdown", &self.country_dropdown),
            ("type-dropdown", &self.type_dropdown),
            ("search-button", &self.search_button),
            ("results-table", &self.results_table),
            ("detail-table", &self.detail_table),
            ("alias-table", &self.alias_table),
            ("address-table", &self.address_table),
            ("listing-ready", &self.listing_ready),
            ("detail-ready", &self.detail_ready),
        ]
    }
}

/// Per-country collection behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Attempts per row (and per search) before a transient failure is final
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Fixed delay before retrying after a transient failure (milliseconds)
    #[serde(rename = "retry-backoff-ms")]
    pub retry_backoff_ms: u64,

    /// Fixed pause after each navigation step (milliseconds)
    #[serde(rename = "settle-delay-ms")]
    pub settle_delay_ms: u64,

    /// Maximum time to wait for a page to become ready (milliseconds)
    #[serde(rename = "ready-timeout-ms")]
    pub ready_timeout_ms: u64,

    /// Interval between readiness checks (milliseconds)
    #[serde(rename = "ready-poll-ms")]
    pub ready_poll_ms: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_backoff_ms: 5000,
            settle_delay_ms: 500,
            ready_timeout_ms: 15_000,
            ready_poll_ms: 250,
        }
    }
}

impl CollectorConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn ready_poll(&self) -> Duration {
        Duration::from_millis(self.ready_poll_ms)
    }
}

/// Worker pool configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Number of countries collected concurrently
    #[serde(rename = "max-workers")]
    pub max_workers: u32,

    /// Time in-flight countries get to finish after cancellation (milliseconds)
    #[serde(rename = "grace-period-ms")]
    pub grace_period_ms: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_workers: 10,
            grace_period_ms: 30_000,
        }
    }
}

impl CoordinatorConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the collector
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the collector
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the collector
    #[serde(rename = "contact-url", default)]
    pub contact_url: Option<String>,

    /// Email address for collector-related contact
    #[serde(rename = "contact-email", default)]
    pub contact_email: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "SanctionsSweep".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
            contact_email: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        let contact: Vec<String> = self
            .contact_url
            .iter()
            .map(|u| format!("+{}", u))
            .chain(self.contact_email.iter().cloned())
            .collect();

        if contact.is_empty() {
            format!("{}/{}", self.crawler_name, self.crawler_version)
        } else {
            format!(
                "{}/{} ({})",
                self.crawler_name,
                self.crawler_version,
                contact.join("; ")
            )
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Well-known path of the persisted dataset (CSV)
    #[serde(rename = "dataset-path")]
    pub dataset_path: String,

    /// Path to the SQLite run history
    #[serde(rename = "history-path")]
    pub history_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dataset_path: "data/sanctions_data.csv".to_string(),
            history_path: "data/history.db".to_string(),
        }
    }
}
