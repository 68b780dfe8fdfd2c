//! Scripted in-memory registry for driving the collector without a network

use async_trait::async_trait;
use sanctions_sweep::config::{Config, SelectorConfig};
use sanctions_sweep::navigation::{NavigationSession, SessionFactory};
use sanctions_sweep::{NavigationError, NavigationResult};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Search page markup, with `extra` placed inside the form
pub fn search_page(countries: &[&str], extra: &str) -> String {
    let options: String = countries
        .iter()
        .map(|c| format!(r#"<option value="{0}">{0}</option>"#, c))
        .collect();
    format!(
        r#"<html><body>
        <form method="post" action="/" id="aspnetForm">
          <input type="hidden" name="__VIEWSTATE" value="state" />
          <select name="ctl00$MainContent$ddlType" id="ctl00_MainContent_ddlType">
            <option value="">All</option>
            <option value="Entity">Entity</option>
            <option value="Individual">Individual</option>
          </select>
          <select name="ctl00$MainContent$ddlCountry" id="ctl00_MainContent_ddlCountry">
            <option value="">All</option>
            {}
          </select>
          <input type="submit" name="ctl00$MainContent$btnSearch" id="ctl00_MainContent_btnSearch" value="Search" />
          {}
        </form>
        </body></html>"#,
        options, extra
    )
}

/// Results table with one row per `(name, detail link)`
pub fn results_table(rows: &[(&str, Option<&str>)]) -> String {
    let body: String = rows
        .iter()
        .map(|(name, link)| {
            let first = match link {
                Some(href) => format!(r#"<a href="{}">{}</a>"#, href, name),
                None => name.to_string(),
            };
            format!(
                "<tr><td>{}</td><td></td><td>Entity</td><td>SDGT</td><td>SDN</td><td>100</td></tr>",
                first
            )
        })
        .collect();
    format!(
        r#"<table id="gvSearchResults">
          <tr><th>Name</th><th>Address</th><th>Type</th><th>Program(s)</th><th>List</th><th>Score</th></tr>
          {}
        </table>"#,
        body
    )
}

/// Detail page with the given aliases `(category, alias)` and address rows
pub fn detail_page(aliases: &[(&str, &str)], addresses: &[[&str; 5]]) -> String {
    let alias_rows: String = aliases
        .iter()
        .map(|(category, alias)| {
            format!(
                "<tr><td>a.k.a.</td><td>{}</td><td>{}</td></tr>",
                category, alias
            )
        })
        .collect();
    let address_rows: String = addresses
        .iter()
        .map(|cells| {
            let tds: String = cells.iter().map(|c| format!("<td>{}</td>", c)).collect();
            format!("<tr>{}</tr>", tds)
        })
        .collect();

    format!(
        r#"<html><body>
        <table class="MainTable">
          <tr><td>Type:</td><td>Entity</td></tr>
          <tr><td>Remarks:</td><td>Front company</td></tr>
        </table>
        <table id="ctl00_MainContent_gvAliases">
          <tr><th>Type</th><th>Category</th><th>Name</th></tr>
          {}
        </table>
        <div id="ctl00_MainContent_pnlAddress">
          <table>
            <tr><th>Address</th><th>City</th><th>State/Province</th><th>Postal Code</th><th>Country</th></tr>
            {}
          </table>
        </div>
        </body></html>"#,
        alias_rows, address_rows
    )
}

/// Fast settings for tests, writing into `dir`
pub fn test_config(dir: &Path, countries: &[&str]) -> Config {
    let mut config = Config::default();
    config.countries = countries.iter().map(|c| c.to_string()).collect();
    config.site.base_url = "https://registry.example.com/".to_string();
    config.collector.max_attempts = 3;
    config.collector.retry_backoff_ms = 1;
    config.collector.settle_delay_ms = 0;
    config.collector.ready_timeout_ms = 100;
    config.collector.ready_poll_ms = 1;
    config.coordinator.max_workers = 4;
    config.coordinator.grace_period_ms = 200;
    config.output.dataset_path = dir.join("sanctions.csv").display().to_string();
    config.output.history_path = dir.join("history.db").display().to_string();
    config
}

/// Everything the fake registry knows, shared by all its sessions
#[derive(Default)]
pub struct Registry {
    /// Listing rows per country; `None` means no results table
    listings: HashMap<String, Option<Vec<(String, Option<String>)>>>,
    details: HashMap<String, String>,
    fatal_searches: HashSet<String>,
    transient_links: HashSet<String>,
    fatal_links: HashSet<String>,
    hang_on_open: bool,
    activations: Mutex<HashMap<String, usize>>,
    open_sessions: AtomicUsize,
    max_open_sessions: AtomicUsize,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listing(mut self, country: &str, rows: &[(&str, Option<&str>)]) -> Self {
        let rows = rows
            .iter()
            .map(|(name, link)| (name.to_string(), link.map(str::to_string)))
            .collect();
        self.listings.insert(country.to_string(), Some(rows));
        self
    }

    pub fn with_no_results(mut self, country: &str) -> Self {
        self.listings.insert(country.to_string(), None);
        self
    }

    pub fn with_detail(mut self, link: &str, html: String) -> Self {
        self.details.insert(link.to_string(), html);
        self
    }

    pub fn with_fatal_search(mut self, country: &str) -> Self {
        self.fatal_searches.insert(country.to_string());
        self
    }

    pub fn with_transient_link(mut self, link: &str) -> Self {
        self.transient_links.insert(link.to_string());
        self
    }

    pub fn with_fatal_link(mut self, link: &str) -> Self {
        self.fatal_links.insert(link.to_string());
        self
    }

    /// Makes every `open` wait forever, like a page that never loads
    pub fn with_hanging_open(mut self) -> Self {
        self.hang_on_open = true;
        self
    }

    /// How many times the detail link `link` was activated
    pub fn activations(&self, link: &str) -> usize {
        self.activations
            .lock()
            .unwrap()
            .get(link)
            .copied()
            .unwrap_or(0)
    }

    pub fn max_open_sessions(&self) -> usize {
        self.max_open_sessions.load(Ordering::SeqCst)
    }

    fn countries(&self) -> Vec<&str> {
        let mut countries: Vec<&str> = self.listings.keys().map(String::as_str).collect();
        countries.sort();
        countries
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Page {
    Search,
    Listing(String),
    Detail(String),
}

/// A browsing session over the fake registry
pub struct ScriptedSession {
    registry: Arc<Registry>,
    history: Vec<Page>,
    country: Option<String>,
    selectors: SelectorConfig,
}

impl ScriptedSession {
    fn current(&self) -> NavigationResult<&Page> {
        self.history
            .last()
            .ok_or_else(|| NavigationError::fatal("nothing loaded"))
    }
}

#[async_trait]
impl NavigationSession for ScriptedSession {
    async fn open(&mut self, _url: &str) -> NavigationResult<()> {
        if self.registry.hang_on_open {
            std::future::pending::<()>().await;
        }
        self.history.push(Page::Search);
        self.country = None;
        Ok(())
    }

    async fn current_content(&self) -> NavigationResult<String> {
        let countries = self.registry.countries();
        let html = match self.current()? {
            Page::Search => search_page(&countries, ""),
            Page::Listing(country) => match self.registry.listings.get(country) {
                Some(Some(rows)) => {
                    let rows: Vec<(&str, Option<&str>)> = rows
                        .iter()
                        .map(|(name, link)| (name.as_str(), link.as_deref()))
                        .collect();
                    search_page(&countries, &results_table(&rows))
                }
                _ => search_page(&countries, "<p>Your search has not returned any results.</p>"),
            },
            Page::Detail(link) => self
                .registry
                .details
                .get(link)
                .cloned()
                .unwrap_or_else(|| "<html><body></body></html>".to_string()),
        };
        Ok(html)
    }

    async fn find_and_activate(&mut self, selector: &str) -> NavigationResult<()> {
        if selector == self.selectors.search_button {
            let country = self
                .country
                .clone()
                .ok_or_else(|| NavigationError::fatal("no country selected"))?;
            if self.registry.fatal_searches.contains(&country) {
                return Err(NavigationError::fatal("registry refused the search"));
            }
            self.history.push(Page::Listing(country));
            return Ok(());
        }

        let link = selector
            .strip_prefix("a[href=\"")
            .and_then(|s| s.strip_suffix("\"]"))
            .ok_or_else(|| NavigationError::not_found(selector))?
            .to_string();

        *self
            .registry
            .activations
            .lock()
            .unwrap()
            .entry(link.clone())
            .or_insert(0) += 1;

        if self.registry.transient_links.contains(&link) {
            return Err(NavigationError::transient("navigation timeout"));
        }
        if self.registry.fatal_links.contains(&link) {
            return Err(NavigationError::fatal("browser crashed"));
        }

        match self.current()? {
            Page::Listing(_) => {
                self.history.push(Page::Detail(link));
                Ok(())
            }
            _ => Err(NavigationError::not_found(selector)),
        }
    }

    async fn select_option(&mut self, selector: &str, value: &str) -> NavigationResult<()> {
        if matches!(self.current()?, Page::Detail(_)) {
            return Err(NavigationError::not_found(selector));
        }
        if selector == self.selectors.country_dropdown {
            self.country = Some(value.to_string());
        }
        Ok(())
    }

    async fn go_back(&mut self) -> NavigationResult<()> {
        if self.history.len() < 2 {
            return Err(NavigationError::fatal("no previous page"));
        }
        self.history.pop();
        Ok(())
    }

    async fn close(&mut self) -> NavigationResult<()> {
        self.history.clear();
        self.registry.open_sessions.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out sessions over one shared registry
pub struct ScriptedFactory {
    registry: Arc<Registry>,
}

impl ScriptedFactory {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl SessionFactory for ScriptedFactory {
    async fn create(&self) -> NavigationResult<Box<dyn NavigationSession>> {
        let open = self.registry.open_sessions.fetch_add(1, Ordering::SeqCst) + 1;
        self.registry
            .max_open_sessions
            .fetch_max(open, Ordering::SeqCst);

        Ok(Box::new(ScriptedSession {
            registry: Arc::clone(&self.registry),
            history: Vec::new(),
            country: None,
            selectors: SelectorConfig::default(),
        }))
    }
}
