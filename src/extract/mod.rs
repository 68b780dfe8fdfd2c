//! Page record extraction
//!
//! This module turns rendered registry pages into typed records:
//! - search-result rows from a country's listing page
//! - detail attributes, aliases and addresses from a detail page
//! - dropdown options and control presence for navigation

mod controls;
mod tables;

pub use controls::{dropdown_options, link_selector, page_contains, DropdownOption};
pub use tables::{DetailRecords, PageRecordExtractor, SEARCH_ROW_MIN_CELLS};
