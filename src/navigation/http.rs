//! HTTP navigation session
//!
//! Drives the registry with plain HTTP requests:
//! - Building HTTP clients with the configured user agent and a cookie jar
//! - Following links and submitting forms (including ASP.NET postbacks)
//! - Keeping a page history so `go_back` returns to the cached previous page
//! - Classifying failures as transient or fatal

use super::form::{plan_activation, resolve_selection, Activation};
use super::{NavigationSession, SessionFactory};
use crate::config::{Config, UserAgentConfig};
use crate::{NavigationError, NavigationResult};
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client, RequestBuilder, StatusCode};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Builds an HTTP client for one navigation session
///
/// Each client carries its own cookie store, so sessions never share
/// server-side state.
///
/// # Example
///
/// ```no_run
/// use sanctions_sweep::config::UserAgentConfig;
/// use sanctions_sweep::navigation::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .build()
}

/// A page that was loaded into the session
#[derive(Debug, Clone)]
struct LoadedPage {
    url: Url,
    body: String,
}

/// Navigation session backed by reqwest
#[derive(Debug)]
pub struct HttpSession {
    client: Client,
    history: Vec<LoadedPage>,
    /// Pending dropdown choices for the current page, keyed by field name
    selections: HashMap<String, String>,
}

impl HttpSession {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            history: Vec::new(),
            selections: HashMap::new(),
        }
    }

    fn current_page(&self) -> NavigationResult<&LoadedPage> {
        self.history
            .last()
            .ok_or_else(|| NavigationError::fatal("no page loaded"))
    }

    /// Sends `request` and makes the response the current page
    async fn load(&mut self, request: RequestBuilder) -> NavigationResult<()> {
        let response = request.send().await.map_err(classify_request_error)?;

        let status = response.status();
        let url = response.url().clone();
        if !status.is_success() {
            return Err(classify_status(status, &url));
        }

        let body = response.text().await.map_err(|e| {
            NavigationError::transient(format!("failed to read body of {}: {}", url, e))
        })?;

        tracing::trace!("Loaded {} ({} bytes)", url, body.len());
        self.history.push(LoadedPage { url, body });
        self.selections.clear();
        Ok(())
    }
}

#[async_trait]
impl NavigationSession for HttpSession {
    async fn open(&mut self, url: &str) -> NavigationResult<()> {
        let url = Url::parse(url)
            .map_err(|e| NavigationError::fatal(format!("invalid URL `{}`: {}", url, e)))?;
        let request = self.client.get(url);
        self.load(request).await
    }

    async fn current_content(&self) -> NavigationResult<String> {
        Ok(self.current_page()?.body.clone())
    }

    async fn find_and_activate(&mut self, selector: &str) -> NavigationResult<()> {
        let activation = {
            let page = self.current_page()?;
            plan_activation(&page.body, &page.url, selector, &self.selections)?
        };

        let request = match activation {
            Activation::Get(url) => self.client.get(url),
            Activation::Submit {
                post: true,
                action,
                fields,
            } => self.client.post(action).form(&fields),
            Activation::Submit {
                post: false,
                action,
                fields,
            } => self.client.get(action).query(&fields),
        };
        self.load(request).await
    }

    async fn select_option(&mut self, selector: &str, value: &str) -> NavigationResult<()> {
        let (name, option) = resolve_selection(&self.current_page()?.body, selector, value)?;
        self.selections.insert(name, option);
        Ok(())
    }

    async fn go_back(&mut self) -> NavigationResult<()> {
        if self.history.len() < 2 {
            return Err(NavigationError::fatal("no previous page to return to"));
        }
        self.history.pop();
        self.selections.clear();
        Ok(())
    }

    async fn close(&mut self) -> NavigationResult<()> {
        self.history.clear();
        self.selections.clear();
        Ok(())
    }
}

/// Creates an `HttpSession` with a fresh client per worker
#[derive(Debug, Clone)]
pub struct HttpSessionFactory {
    user_agent: UserAgentConfig,
    timeout: Duration,
}

impl HttpSessionFactory {
    pub fn new(config: &Config) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: Duration::from_secs(config.site.request_timeout_secs),
        }
    }
}

#[async_trait]
impl SessionFactory for HttpSessionFactory {
    async fn create(&self) -> NavigationResult<Box<dyn NavigationSession>> {
        let client = build_http_client(&self.user_agent, self.timeout).map_err(|e| {
            NavigationError::fatal(format!("failed to build HTTP client: {}", e))
        })?;
        Ok(Box::new(HttpSession::new(client)))
    }
}

/// Classifies a request that produced no response
fn classify_request_error(e: reqwest::Error) -> NavigationError {
    if e.is_timeout() {
        NavigationError::transient("request timeout")
    } else if e.is_connect() {
        NavigationError::transient(format!("connection failed: {}", e))
    } else if e.is_builder() || e.is_redirect() {
        NavigationError::fatal(e.to_string())
    } else {
        NavigationError::transient(e.to_string())
    }
}

/// Classifies a non-success response status
fn classify_status(status: StatusCode, url: &Url) -> NavigationError {
    let message = format!("HTTP {} from {}", status.as_u16(), url);
    if status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
    {
        NavigationError::transient(message)
    } else {
        NavigationError::fatal(message)
    }
}
