//! Table extraction for listing and detail pages
//!
//! Every function here is pure: it takes rendered markup and returns typed
//! records. A missing table yields `None`; malformed rows are dropped silently.

use crate::config::SelectorConfig;
use crate::model::{AddressEntry, AliasEntry, DetailAttributes, SearchRow};
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};

/// Minimum number of cells for a listing row to be a match
pub const SEARCH_ROW_MIN_CELLS: usize = 6;

/// Compiled selectors for the tables of the registry pages
#[derive(Debug, Clone)]
pub struct PageRecordExtractor {
    results_table: Selector,
    detail_table: Selector,
    alias_table: Selector,
    address_table: Selector,
    row: Selector,
    cell: Selector,
    anchor: Selector,
}

/// All records of one detail page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailRecords {
    pub attributes: DetailAttributes,
    pub aliases: Vec<AliasEntry>,
    pub addresses: Vec<AddressEntry>,
}

impl PageRecordExtractor {
    /// Compiles the table selectors from configuration
    pub fn new(selectors: &SelectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            results_table: compile("results-table", &selectors.results_table)?,
            detail_table: compile("detail-table", &selectors.detail_table)?,
            alias_table: compile("alias-table", &selectors.alias_table)?,
            address_table: compile("address-table", &selectors.address_table)?,
            row: compile("row", "tr")?,
            cell: compile("cell", "td")?,
            anchor: compile("anchor", "a[href]")?,
        })
    }

    /// Extracts the rows of a search-results page
    ///
    /// Returns `None` when the page has no results table, which is how the
    /// registry reports a country without matches.
    pub fn search_rows(&self, html: &str) -> Option<Vec<SearchRow>> {
        let document = Html::parse_document(html);
        let table = document.select(&self.results_table).next()?;

        let rows = table
            .select(&self.row)
            .filter_map(|row| self.search_row(row))
            .collect();
        Some(rows)
    }

    fn search_row(&self, row: ElementRef<'_>) -> Option<SearchRow> {
        let cells: Vec<ElementRef<'_>> = row.select(&self.cell).collect();
        if cells.len() < SEARCH_ROW_MIN_CELLS {
            return None;
        }

        let detail_link = cells[0]
            .select(&self.anchor)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .map(str::to_string);

        Some(SearchRow {
            name: cell_text(cells[0]),
            detail_link,
            category: cell_text(cells[2]),
            programs: cell_text(cells[3]),
            list_name: cell_text(cells[4]),
            match_score: cell_text(cells[5]),
        })
    }

    /// Extracts the label/value table of a detail page
    pub fn detail_attributes(&self, html: &str) -> Option<DetailAttributes> {
        let document = Html::parse_document(html);
        self.detail_attributes_in(&document)
    }

    fn detail_attributes_in(&self, document: &Html) -> Option<DetailAttributes> {
        let table = document.select(&self.detail_table).next()?;
        let mut attributes = DetailAttributes::new();

        for row in table.select(&self.row) {
            let cells: Vec<ElementRef<'_>> = row.select(&self.cell).collect();
            if cells.len() != 2 {
                continue;
            }
            let label = cell_text(cells[0]);
            let label = label.trim_end_matches(':').trim_end();
            if label.is_empty() {
                continue;
            }
            attributes.insert(label.to_string(), cell_text(cells[1]));
        }

        Some(attributes)
    }

    /// Extracts the alias table of a detail page (header row skipped)
    pub fn aliases(&self, html: &str) -> Option<Vec<AliasEntry>> {
        let document = Html::parse_document(html);
        self.aliases_in(&document)
    }

    fn aliases_in(&self, document: &Html) -> Option<Vec<AliasEntry>> {
        let table = document.select(&self.alias_table).next()?;

        let aliases = table
            .select(&self.row)
            .skip(1)
            .filter_map(|row| {
                let cells: Vec<ElementRef<'_>> = row.select(&self.cell).collect();
                if cells.len() != 3 {
                    return None;
                }
                Some(AliasEntry::new(cell_text(cells[1]), cell_text(cells[2])))
            })
            .collect();
        Some(aliases)
    }

    /// Extracts the address table of a detail page (header row skipped)
    pub fn addresses(&self, html: &str) -> Option<Vec<AddressEntry>> {
        let document = Html::parse_document(html);
        self.addresses_in(&document)
    }

    fn addresses_in(&self, document: &Html) -> Option<Vec<AddressEntry>> {
        let table = document.select(&self.address_table).next()?;

        let addresses = table
            .select(&self.row)
            .skip(1)
            .filter_map(|row| {
                let cells: Vec<String> = row.select(&self.cell).map(cell_text).collect();
                match cells.as_slice() {
                    [street, city, state, postal, country] => Some(AddressEntry::from_columns(
                        street, city, state, postal, country,
                    )),
                    _ => None,
                }
            })
            .collect();
        Some(addresses)
    }

    /// Extracts every section of a detail page in one parse
    ///
    /// Missing sections come back empty.
    pub fn detail_records(&self, html: &str) -> DetailRecords {
        let document = Html::parse_document(html);

        let attributes = self.detail_attributes_in(&document).unwrap_or_else(|| {
            tracing::debug!("Details table not found, continuing with empty attributes");
            DetailAttributes::new()
        });
        let aliases = self.aliases_in(&document).unwrap_or_else(|| {
            tracing::debug!("Alias table not found, continuing with no aliases");
            Vec::new()
        });
        let addresses = self.addresses_in(&document).unwrap_or_else(|| {
            tracing::debug!("Address table not found, continuing with no addresses");
            Vec::new()
        });

        DetailRecords {
            attributes,
            aliases,
            addresses,
        }
    }
}

fn compile(name: &str, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|_| ConfigError::InvalidSelector {
        name: name.to_string(),
        selector: selector.to_string(),
    })
}

/// Visible text of a cell with whitespace runs collapsed
fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
