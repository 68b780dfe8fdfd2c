//! Dataset materialization
//!
//! `DatasetBuilder::build` is pure and idempotent. It keeps input order,
//! drops exact duplicates and rewrites links and address fragments into a
//! canonical form that is a fixed point of the same rewrite. Detail labels
//! naming a fixed column are folded into that column before duplicates are
//! compared, so every field that tells two rows apart is written out.

use crate::model::{AddressEntry, Entity};
use crate::output::OutputError;
use std::collections::{BTreeSet, HashSet};
use url::Url;

/// Columns present in every dataset, in order
pub const FIXED_COLUMNS: [&str; 7] = [
    "Name",
    "Link",
    "Type",
    "Program(s)",
    "List",
    "Score",
    "Country",
];

pub const ALIASES_COLUMN: &str = "Aliases";
pub const ADDRESSES_COLUMN: &str = "Addresses";

/// Turns the merged entity list into the final dataset
#[derive(Debug, Clone)]
pub struct DatasetBuilder {
    base_url: Url,
}

impl DatasetBuilder {
    /// Creates a builder resolving relative links against `base_url`
    pub fn new(base_url: &str) -> Result<Self, OutputError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| OutputError::InvalidBaseUrl(format!("{}: {}", base_url, e)))?;
        Ok(Self { base_url })
    }

    /// Normalizes every entity and removes exact duplicates, keeping first occurrences
    pub fn build(&self, entities: impl IntoIterator<Item = Entity>) -> Dataset {
        let mut seen = HashSet::new();
        let mut rows = Vec::new();

        for entity in entities {
            let entity = self.normalize(entity);
            if seen.insert(entity.clone()) {
                rows.push(entity);
            }
        }

        Dataset::new(rows)
    }

    fn normalize(&self, mut entity: Entity) -> Entity {
        settle_collisions(&mut entity);
        entity.link = entity.link.map(|link| self.absolute_link(&link));
        entity.addresses = entity
            .addresses
            .into_iter()
            .map(normalize_address)
            .filter(|address| !address.to_display().is_empty())
            .collect();
        entity
    }

    fn absolute_link(&self, link: &str) -> String {
        let link = link.trim();
        if Url::parse(link).is_ok() {
            return link.to_string();
        }
        match self.base_url.join(link) {
            Ok(url) => url.to_string(),
            Err(e) => {
                tracing::warn!("Keeping unresolvable link `{}`: {}", link, e);
                link.to_string()
            }
        }
    }
}

/// Whether a detail label names one of the dataset's own columns
fn is_reserved_column(label: &str) -> bool {
    FIXED_COLUMNS
        .iter()
        .chain([ALIASES_COLUMN, ADDRESSES_COLUMN].iter())
        .any(|column| column.eq_ignore_ascii_case(label.trim()))
}

/// Moves detail values whose label names a fixed column out of `attributes`
///
/// A non-empty detail value replaces the listing's `Type`, `Program(s)`,
/// `List` or `Score`. Labels naming an identity column (name, link, country)
/// or a compound column are dropped.
fn settle_collisions(entity: &mut Entity) {
    let colliding: Vec<String> = entity
        .attributes
        .keys()
        .filter(|label| is_reserved_column(label))
        .cloned()
        .collect();

    for label in colliding {
        let Some(value) = entity.attributes.remove(&label) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        if let Some(field) = descriptive_field(entity, label.trim()) {
            *field = value;
        }
    }
}

fn descriptive_field<'a>(entity: &'a mut Entity, label: &str) -> Option<&'a mut String> {
    if label.eq_ignore_ascii_case("Type") {
        Some(&mut entity.category)
    } else if label.eq_ignore_ascii_case("Program(s)") {
        Some(&mut entity.programs)
    } else if label.eq_ignore_ascii_case("List") {
        Some(&mut entity.list_name)
    } else if label.eq_ignore_ascii_case("Score") {
        Some(&mut entity.match_score)
    } else {
        None
    }
}

fn normalize_address(address: AddressEntry) -> AddressEntry {
    AddressEntry {
        street: normalize_fragment(&address.street),
        city: normalize_fragment(&address.city),
        state_or_province: normalize_fragment(&address.state_or_province),
        postal_code: normalize_fragment(&address.postal_code),
        country: normalize_fragment(&address.country),
    }
}

/// Collapses whitespace and `" ,"`/`" ;"` artifacts, then trims separators
fn normalize_fragment(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .replace(" ,", ",")
        .replace(" ;", ";")
        .trim_matches(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .to_string()
}

/// The final, deduplicated table of entities
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    columns: Vec<String>,
    attribute_labels: Vec<String>,
    rows: Vec<Entity>,
}

impl Dataset {
    fn new(rows: Vec<Entity>) -> Self {
        let attribute_labels: Vec<String> = rows
            .iter()
            .flat_map(|entity| entity.attributes.keys())
            .filter(|label| !is_reserved_column(label))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let columns = FIXED_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(attribute_labels.iter().cloned())
            .chain([ALIASES_COLUMN.to_string(), ADDRESSES_COLUMN.to_string()])
            .collect();

        Self {
            columns,
            attribute_labels,
            rows,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Entity] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell values of every row, aligned with `columns`
    pub fn records(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.rows.iter().map(move |entity| {
            let mut record = vec![
                entity.name.clone(),
                entity.link.clone().unwrap_or_default(),
                entity.category.clone(),
                entity.programs.clone(),
                entity.list_name.clone(),
                entity.match_score.clone(),
                entity.country.clone(),
            ];
            record.extend(
                self.attribute_labels
                    .iter()
                    .map(|label| entity.attributes.get(label).cloned().unwrap_or_default()),
            );
            record.push(entity.aliases_field());
            record.push(entity.addresses_field());
            record
        })
    }
}
