//! Navigation sessions over the registry
//!
//! This module defines the page-navigation capability the collectors drive:
//! - `NavigationSession`: load pages, use controls, move back through history
//! - `SessionFactory`: hands every worker its own isolated session
//! - `HttpSession`: the reqwest/scraper backed implementation
//! - Readiness polling in place of fixed page-load sleeps

mod form;
mod http;

pub use http::{build_http_client, HttpSession, HttpSessionFactory};

use crate::extract::page_contains;
use crate::NavigationResult;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

/// A single-threaded browsing context
///
/// A session holds navigation state (current page, cookies, history) and is
/// never shared between workers. Every operation may fail with a transient
/// or fatal [`NavigationError`](crate::NavigationError).
#[async_trait]
pub trait NavigationSession: Send + Sync {
    /// Loads `url`, replacing the current page
    async fn open(&mut self, url: &str) -> NavigationResult<()>;

    /// Returns the markup of the current page
    async fn current_content(&self) -> NavigationResult<String>;

    /// Activates (clicks) the first element matching `selector`
    ///
    /// Fails with `NotFound` when nothing matches.
    async fn find_and_activate(&mut self, selector: &str) -> NavigationResult<()>;

    /// Chooses `value` (option value or visible label) in the dropdown matching `selector`
    async fn select_option(&mut self, selector: &str, value: &str) -> NavigationResult<()>;

    /// Returns to the previously visited page
    async fn go_back(&mut self) -> NavigationResult<()>;

    /// Releases the session's resources
    async fn close(&mut self) -> NavigationResult<()>;
}

/// Creates one isolated navigation session per worker
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn create(&self) -> NavigationResult<Box<dyn NavigationSession>>;
}

/// Polls the current page until `selector` matches, returning its content
///
/// A page that never becomes ready within `timeout` is a transient failure.
pub async fn wait_until_ready(
    session: &dyn NavigationSession,
    selector: &str,
    timeout: Duration,
    poll: Duration,
) -> NavigationResult<String> {
    let deadline = Instant::now() + timeout;

    loop {
        let content = session.current_content().await?;
        if page_contains(&content, selector) {
            return Ok(content);
        }

        if Instant::now() >= deadline {
            return Err(crate::NavigationError::transient(format!(
                "page not ready: `{}` did not appear within {:?}",
                selector, timeout
            )));
        }

        tokio::time::sleep(poll).await;
    }
}
