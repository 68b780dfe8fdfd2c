//! Data model for collected sanctions records
//!
//! # Components
//!
//! - `SearchRow`, `AliasEntry`, `AddressEntry`: records extracted from single pages
//! - `Entity`: one sanctioned party for one country, merged from listing and detail pages
//! - `CountryStatus`, `CountryReport`, `RunTally`, `RunOutcome`: collection outcomes

mod entity;
mod status;

pub use entity::{
    join_addresses, join_aliases, parse_address_field, parse_alias_field, AddressEntry,
    AliasEntry, DetailAttributes, Entity, SearchRow, ENTRY_SEPARATOR,
};
pub use status::{CountryOutcome, CountryReport, CountryStatus, RunOutcome, RunTally};
