//! Record types extracted from the registry pages
//!
//! Aliases and addresses stay structured lists inside an [`Entity`]; they are
//! flattened to `"; "`-joined strings only when a dataset is materialized.

use crate::ExtractionError;
use std::collections::BTreeMap;

/// Separator between entries of a compound alias/address field
pub const ENTRY_SEPARATOR: &str = "; ";

/// Label/value pairs from a detail page's key/value table
pub type DetailAttributes = BTreeMap<String, String>;

/// One row of a country's search-results table
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchRow {
    pub name: String,
    /// Link to the detail page, as found on the listing (usually relative)
    pub detail_link: Option<String>,
    pub category: String,
    pub programs: String,
    pub list_name: String,
    pub match_score: String,
}

/// One alias from a detail page's alias table
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AliasEntry {
    pub category: String,
    pub alias: String,
}

impl AliasEntry {
    pub fn new(category: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            alias: alias.into(),
        }
    }

    /// Formats as `Category: Alias`
    pub fn to_display(&self) -> String {
        format!("{}: {}", self.category, self.alias)
    }

    /// Parses the `Category: Alias` form
    ///
    /// Entries without a category separator keep the whole text as the alias.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        match text.split_once(": ") {
            Some((category, alias)) => Some(Self::new(category.trim(), alias.trim())),
            None => Some(Self::new("", text)),
        }
    }
}

/// One address from a detail page's address table
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AddressEntry {
    pub street: String,
    pub city: String,
    pub state_or_province: String,
    pub postal_code: String,
    pub country: String,
}

impl AddressEntry {
    /// Builds an address from the five table columns, in page order
    pub fn from_columns(
        street: &str,
        city: &str,
        state_or_province: &str,
        postal_code: &str,
        country: &str,
    ) -> Self {
        Self {
            street: street.trim().to_string(),
            city: city.trim().to_string(),
            state_or_province: state_or_province.trim().to_string(),
            postal_code: postal_code.trim().to_string(),
            country: country.trim().to_string(),
        }
    }

    fn fields(&self) -> [&str; 5] {
        [
            &self.street,
            &self.city,
            &self.state_or_province,
            &self.postal_code,
            &self.country,
        ]
    }

    /// Formats the non-empty fields as comma-separated fragments
    pub fn to_display(&self) -> String {
        self.fields()
            .iter()
            .filter(|f| !f.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Rebuilds an address from comma-separated fragments
    ///
    /// Fragments are assigned right-aligned: the last fragment is always the
    /// country, the one before it the postal code, and so on. Omitted leading
    /// fields stay empty. More than five fragments fold the surplus into the
    /// street.
    pub fn from_fragments(text: &str) -> Option<Self> {
        let fragments: Vec<&str> = text.split(',').map(str::trim).collect();
        if fragments.iter().all(|f| f.is_empty()) {
            return None;
        }

        let mut columns: [String; 5] = Default::default();
        let surplus = fragments.len().saturating_sub(5);
        let (leading, tail) = fragments.split_at(surplus);

        let offset = 5 - tail.len();
        for (i, fragment) in tail.iter().enumerate() {
            columns[offset + i] = fragment.to_string();
        }
        if !leading.is_empty() {
            let mut street: Vec<&str> = leading.to_vec();
            street.push(tail[0]);
            columns[0] = street.join(", ");
        }

        let [street, city, state_or_province, postal_code, country] = columns;
        Some(Self {
            street,
            city,
            state_or_province,
            postal_code,
            country,
        })
    }
}

/// Joins aliases into the compound `Category: Alias; ...` field
pub fn join_aliases(aliases: &[AliasEntry]) -> String {
    aliases
        .iter()
        .map(AliasEntry::to_display)
        .collect::<Vec<_>>()
        .join(ENTRY_SEPARATOR)
}

/// Joins addresses into the compound `a, b, c; ...` field
pub fn join_addresses(addresses: &[AddressEntry]) -> String {
    addresses
        .iter()
        .map(AddressEntry::to_display)
        .filter(|a| !a.is_empty())
        .collect::<Vec<_>>()
        .join(ENTRY_SEPARATOR)
}

/// Splits a compound alias field back into entries
pub fn parse_alias_field(field: &str) -> Vec<AliasEntry> {
    field.split(';').filter_map(AliasEntry::parse).collect()
}

/// Splits a compound address field back into entries
pub fn parse_address_field(field: &str) -> Vec<AddressEntry> {
    field
        .split(';')
        .filter_map(AddressEntry::from_fragments)
        .collect()
}

/// One sanctioned party as found under one country
///
/// The same party listed under two countries yields two entities.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entity {
    pub name: String,
    pub link: Option<String>,
    pub category: String,
    pub programs: String,
    pub list_name: String,
    pub match_score: String,
    pub country: String,
    pub attributes: DetailAttributes,
    pub aliases: Vec<AliasEntry>,
    pub addresses: Vec<AddressEntry>,
}

impl Entity {
    /// Merges a listing row with its detail page records
    pub fn assemble(
        row: SearchRow,
        country: &str,
        attributes: DetailAttributes,
        aliases: Vec<AliasEntry>,
        addresses: Vec<AddressEntry>,
    ) -> Result<Self, ExtractionError> {
        let name = row.name.trim();
        if name.is_empty() {
            return Err(ExtractionError::Assembly {
                row: row.detail_link.clone().unwrap_or_default(),
                reason: "listing row has an empty name".to_string(),
            });
        }

        let country = country.trim();
        if country.is_empty() {
            return Err(ExtractionError::Assembly {
                row: name.to_string(),
                reason: "entity has no country".to_string(),
            });
        }

        Ok(Self {
            name: name.to_string(),
            link: row.detail_link,
            category: row.category,
            programs: row.programs,
            list_name: row.list_name,
            match_score: row.match_score,
            country: country.to_string(),
            attributes,
            aliases,
            addresses,
        })
    }

    /// Records a listing row that has no detail page
    pub fn bare(row: SearchRow, country: &str) -> Result<Self, ExtractionError> {
        Self::assemble(row, country, DetailAttributes::new(), Vec::new(), Vec::new())
    }

    pub fn aliases_field(&self) -> String {
        join_aliases(&self.aliases)
    }

    pub fn addresses_field(&self) -> String {
        join_addresses(&self.addresses)
    }
}
