//! The persisted dataset file
//!
//! The dataset is replaced atomically: rows are written to a temporary file
//! in the destination directory, which is then renamed over the old file.

use crate::model::{parse_address_field, parse_alias_field, AddressEntry, AliasEntry};
use crate::output::builder::{ADDRESSES_COLUMN, ALIASES_COLUMN};
use crate::output::{Dataset, OutputError, OutputResult};
use std::collections::BTreeSet;
use std::path::Path;
use tempfile::NamedTempFile;

/// Returns true if a dataset has been written at `path`
pub fn dataset_exists(path: &Path) -> bool {
    path.is_file()
}

/// Writes `dataset` as CSV to `path`, replacing any previous file atomically
///
/// The rows go to a temporary file in the destination directory, which is
/// then renamed over `path`. Readers see either the old file or the new one.
///
/// # Arguments
///
/// * `path` - The well-known dataset path; missing parent directories are created
/// * `dataset` - The built dataset to write
///
/// # Returns
///
/// * `Ok(())` - The file at `path` now holds exactly `dataset`
/// * `Err(OutputError)` - Writing or renaming failed; any previous file is untouched
pub fn write_dataset(path: &Path, dataset: &Dataset) -> OutputResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let temp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = csv::Writer::from_writer(temp.as_file());
        writer.write_record(dataset.columns())?;
        for record in dataset.records() {
            writer.write_record(&record)?;
        }
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path)?;

    tracing::info!("Wrote {} rows to {}", dataset.len(), path.display());
    Ok(())
}

/// Loads a dataset file written by [`write_dataset`]
pub fn read_dataset(path: &Path) -> OutputResult<LoadedDataset> {
    let mut reader = csv::Reader::from_path(path)?;
    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    for required in ["Name", "Country"] {
        if !columns.iter().any(|c| c == required) {
            return Err(OutputError::MissingColumn(required.to_string()));
        }
    }

    let mut records: Vec<Vec<String>> = Vec::new();
    for result in reader.records() {
        let record = result?;
        records.push(record.iter().map(str::to_string).collect());
    }

    Ok(LoadedDataset { columns, records })
}

/// A dataset read back from disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedDataset {
    columns: Vec<String>,
    records: Vec<Vec<String>>,
}

impl LoadedDataset {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = LoadedRow<'_>> {
        self.records.iter().map(move |values| LoadedRow {
            columns: &self.columns,
            values,
        })
    }

    /// Distinct countries present, sorted
    pub fn countries(&self) -> Vec<String> {
        self.rows()
            .filter_map(|row| row.get("Country"))
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Rows collected under `country` (case-insensitive)
    pub fn rows_for_country(&self, country: &str) -> Vec<LoadedRow<'_>> {
        self.rows()
            .filter(|row| {
                row.get("Country")
                    .map(|c| c.eq_ignore_ascii_case(country.trim()))
                    .unwrap_or(false)
            })
            .collect()
    }
}

/// One row of a loaded dataset
#[derive(Debug, Clone, Copy)]
pub struct LoadedRow<'a> {
    columns: &'a [String],
    values: &'a [String],
}

impl<'a> LoadedRow<'a> {
    /// Value of `column`; `None` when the column is absent
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.values.get(index).map(String::as_str)
    }

    /// Non-empty cells other than the compound alias/address fields
    pub fn fields(&self) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.columns
            .iter()
            .zip(self.values.iter())
            .filter(|(column, value)| {
                !value.is_empty() && *column != ALIASES_COLUMN && *column != ADDRESSES_COLUMN
            })
            .map(|(column, value)| (column.as_str(), value.as_str()))
    }

    pub fn aliases(&self) -> Vec<AliasEntry> {
        parse_alias_field(self.get(ALIASES_COLUMN).unwrap_or_default())
    }

    pub fn addresses(&self) -> Vec<AddressEntry> {
        parse_address_field(self.get(ADDRESSES_COLUMN).unwrap_or_default())
    }
}
