//! Configuration module for Sanctions-Sweep
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sanctions_sweep::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sweep.toml")).unwrap();
//! println!("Workers: {}", config.coordinator.max_workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CollectorConfig, Config, CoordinatorConfig, OutputConfig, SelectorConfig, SiteConfig,
    UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
