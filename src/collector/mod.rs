//! Collection engine
//!
//! This module contains the concurrent collection logic, including:
//! - The per-country pipeline (search, listing, detail page, back)
//! - Bounded retry with fixed backoff
//! - The bounded worker pool and fan-in of per-country results
//! - Run-level cancellation and the complete "collect now" run

mod cancel;
mod coordinator;
mod entity_collector;
mod retry;
mod run;

pub use cancel::CancelToken;
pub use coordinator::{CollectionCoordinator, RunReport};
pub use entity_collector::EntityCollector;
pub use retry::RetryPolicy;
pub use run::{collect_now, collect_with, discover_countries, RunSummary};
