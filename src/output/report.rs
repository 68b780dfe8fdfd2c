//! Human-readable run and dataset reports for the terminal

use crate::collector::RunSummary;
use crate::model::CountryStatus;
use crate::output::LoadedRow;
use crate::storage::{CountryResultRecord, RunRecord};
use std::fmt::Write;

/// Formats the result of a collection run that just finished
pub fn format_run_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Collection Run {} ===\n", summary.run_id);
    let _ = writeln!(out, "Outcome: {}", summary.outcome.to_db_string());
    let _ = writeln!(out, "Countries: {}", summary.tally);
    let _ = writeln!(out, "Dataset rows: {}", summary.entity_count);
    if summary.cancelled {
        let _ = writeln!(out, "Run was cancelled before every country finished");
    }
    if !summary.dataset_written {
        let _ = writeln!(out, "Dataset was not replaced");
    }

    let problems: Vec<_> = summary
        .countries
        .iter()
        .filter(|c| !c.status.is_ok())
        .collect();
    if !problems.is_empty() {
        let _ = writeln!(out, "\nIncomplete countries:");
        for country in problems {
            let _ = writeln!(out, "  {}: {}", country.country, country.status);
        }
    }
    out
}

pub fn print_run_summary(summary: &RunSummary) {
    print!("{}", format_run_summary(summary));
}

/// Formats a stored run and its per-country results
pub fn format_run_record(run: &RunRecord, countries: &[CountryResultRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Latest Run ===\n");
    let _ = writeln!(out, "Run ID: {}", run.id);
    let _ = writeln!(out, "Started: {}", run.started_at);
    if let Some(finished) = &run.finished_at {
        let _ = writeln!(out, "Finished: {}", finished);
    }
    if let Some(seconds) = duration_seconds(&run.started_at, run.finished_at.as_deref()) {
        let _ = writeln!(out, "Duration: {} seconds", seconds);
    }
    let _ = writeln!(out, "Status: {}", run.status);
    let _ = writeln!(out, "Config hash: {}", run.config_hash);
    let _ = writeln!(out, "Entities: {}", run.entity_count);
    let _ = writeln!(out, "Countries: {}", run.tally);
    let _ = writeln!(out, "Cancelled: {}", if run.cancelled { "yes" } else { "no" });
    let _ = writeln!(
        out,
        "Dataset written: {}",
        if run.dataset_written { "yes" } else { "no" }
    );

    if !countries.is_empty() {
        let _ = writeln!(out, "\nCountries:");
        for c in countries {
            let _ = write!(
                out,
                "  {:<32} {:<8} {:>5} entities",
                c.country, c.status, c.entities
            );
            if c.rows_lost > 0 {
                let _ = write!(out, ", {} rows lost", c.rows_lost);
            }
            if let Some(reason) = &c.failure_reason {
                let _ = write!(out, " ({})", reason);
            }
            out.push('\n');
        }
    }
    out
}

pub fn print_run_record(run: &RunRecord, countries: &[CountryResultRecord]) {
    print!("{}", format_run_record(run, countries));
}

fn duration_seconds(started: &str, finished: Option<&str>) -> Option<i64> {
    let started = started.parse::<chrono::DateTime<chrono::Utc>>().ok()?;
    let finished = finished?.parse::<chrono::DateTime<chrono::Utc>>().ok()?;
    Some((finished - started).num_seconds())
}

/// Formats every row of one country with its aliases and addresses itemized
pub fn format_country_rows(country: &str, rows: &[LoadedRow<'_>]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} ({} entities) ===", country, rows.len());

    for row in rows {
        out.push('\n');
        for (column, value) in row.fields() {
            let _ = writeln!(out, "{}: {}", column, value);
        }

        let aliases = row.aliases();
        if !aliases.is_empty() {
            let _ = writeln!(out, "Aliases:");
            for alias in aliases {
                let _ = writeln!(out, "  - {}", alias.to_display());
            }
        }

        let addresses = row.addresses();
        if !addresses.is_empty() {
            let _ = writeln!(out, "Addresses:");
            for address in addresses {
                let _ = writeln!(out, "  - {}", address.to_display());
            }
        }
    }
    out
}

pub fn print_country_rows(country: &str, rows: &[LoadedRow<'_>]) {
    print!("{}", format_country_rows(country, rows));
}

/// One-line status used in logs
pub fn status_line(country: &str, status: &CountryStatus, entities: usize) -> String {
    format!("{}: {} ({} entities)", country, status, entities)
}
