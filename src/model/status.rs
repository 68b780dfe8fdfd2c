//! Per-country and per-run collection outcomes
use crate::model::Entity;
use std::fmt;

/// Terminal status of one country's collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountryStatus {
    /// Every listing row was collected (including a country with no results)
    Ok,

    /// Some rows were lost after exhausting retries or on extraction errors
    Partial { rows_lost: usize },

    /// The listing page could not be reached; nothing was collected
    Failed { reason: String },
}

impl CountryStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn rows_lost(&self) -> usize {
        match self {
            Self::Partial { rows_lost } => *rows_lost,
            _ => 0,
        }
    }

    /// Converts the status to its history database representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Partial { .. } => "partial",
            Self::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for CountryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Partial { rows_lost } => write!(f, "partial ({} rows lost)", rows_lost),
            Self::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// Everything one country's collector produced
#[derive(Debug, Clone)]
pub struct CountryReport {
    pub country: String,
    pub status: CountryStatus,
    /// Listing rows seen on the search-results page
    pub rows_seen: usize,
    pub entities: Vec<Entity>,
}

impl CountryReport {
    pub fn failed(country: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            status: CountryStatus::Failed {
                reason: reason.into(),
            },
            rows_seen: 0,
            entities: Vec::new(),
        }
    }

    /// Splits off the entities, keeping the summary line
    pub fn into_parts(self) -> (CountryOutcome, Vec<Entity>) {
        let outcome = CountryOutcome {
            country: self.country,
            status: self.status,
            rows_seen: self.rows_seen,
            entities: self.entities.len(),
        };
        (outcome, self.entities)
    }
}

/// Summary line of one country's collection, without the records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryOutcome {
    pub country: String,
    pub status: CountryStatus,
    pub rows_seen: usize,
    pub entities: usize,
}

/// Counts of countries per terminal status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTally {
    pub ok: usize,
    pub partial: usize,
    pub failed: usize,
}

impl RunTally {
    pub fn from_outcomes(outcomes: &[CountryOutcome]) -> Self {
        outcomes.iter().fold(Self::default(), |mut tally, o| {
            match o.status {
                CountryStatus::Ok => tally.ok += 1,
                CountryStatus::Partial { .. } => tally.partial += 1,
                CountryStatus::Failed { .. } => tally.failed += 1,
            }
            tally
        })
    }

    pub fn total(&self) -> usize {
        self.ok + self.partial + self.failed
    }
}

impl fmt::Display for RunTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ok, {} partial, {} failed",
            self.ok, self.partial, self.failed
        )
    }
}

/// Terminal status of a whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The sweep finished and found entities
    Succeeded,

    /// The sweep finished and legitimately found nothing
    SucceededEmpty,

    /// Every country failed; no data was produced
    Failed,
}

impl RunOutcome {
    /// Classifies a finished sweep
    ///
    /// Zero entities is only a failure when no country got past its listing page.
    pub fn classify(tally: &RunTally, entities: usize) -> Self {
        if tally.total() > 0 && tally.failed == tally.total() {
            Self::Failed
        } else if entities == 0 {
            Self::SucceededEmpty
        } else {
            Self::Succeeded
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed)
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::SucceededEmpty => "succeeded_empty",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "succeeded" => Some(Self::Succeeded),
            "succeeded_empty" => Some(Self::SucceededEmpty),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
