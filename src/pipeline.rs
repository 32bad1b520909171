//! One diff run: load, fetch, persist, parse, diff, report.
//!
//! The remote bytes are persisted before they are parsed or diffed so the
//! stored snapshot always reflects the latest fetch, even if a later stage
//! fails. The comparison uses the previous snapshot loaded at the start.

use crate::diff::{diff, ChangeKind, DiffError, MissingDatePolicy};
use crate::feed::{parse_feed, FeedEntry, FetchError, Fetcher, ParseError};
use crate::report::{build_report, Report, ReportSettings};
use crate::storage::{SnapshotError, SnapshotStore};
use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

/// Which snapshot failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Previous,
    Current,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Previous => f.write_str("local snapshot"),
            Origin::Current => f.write_str("remote feed"),
        }
    }
}

/// A failed run, tagged with the stage that failed.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Unable to read local feed: {0}")]
    Load(#[source] SnapshotError),
    #[error("Unable to get remote feed: {0}")]
    Fetch(#[from] FetchError),
    #[error("Unable to save remote feed: {0}")]
    Persist(#[source] SnapshotError),
    #[error("Unable to parse {origin}: {source}")]
    Parse {
        origin: Origin,
        #[source]
        source: ParseError,
    },
    #[error("Unable to compare feeds: {0}")]
    Diff(#[from] DiffError),
}

impl RunError {
    pub fn stage(&self) -> &'static str {
        match self {
            RunError::Load(_) => "load",
            RunError::Fetch(_) => "fetch",
            RunError::Persist(_) => "persist",
            RunError::Parse { .. } => "parse",
            RunError::Diff(_) => "diff",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub missing_dates: MissingDatePolicy,
    pub report: ReportSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    NoChanges,
    Report(Report),
}

/// Counters describing a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub previous_entries: usize,
    pub current_entries: usize,
    pub new_entries: usize,
    pub changed_entries: usize,
    /// Changes that survived the link filter.
    pub reported: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub outcome: Outcome,
    pub stats: RunStats,
}

/// Parses a stored snapshot. Absent and blank snapshots are both empty.
pub fn parse_previous(bytes: Option<&[u8]>) -> Result<Vec<FeedEntry>, ParseError> {
    match bytes {
        None => Ok(Vec::new()),
        Some(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => {
            tracing::warn!("Local snapshot is empty, treating as no prior snapshot");
            Ok(Vec::new())
        }
        Some(bytes) => parse_feed(bytes),
    }
}

pub async fn run<S: SnapshotStore>(
    store: &S,
    fetcher: &Fetcher,
    options: &RunOptions,
) -> Result<RunSummary, RunError> {
    run_at(store, fetcher, options, Utc::now()).await
}

/// [`run`] with an explicit report generation time.
pub async fn run_at<S: SnapshotStore>(
    store: &S,
    fetcher: &Fetcher,
    options: &RunOptions,
    generated_at: DateTime<Utc>,
) -> Result<RunSummary, RunError> {
    let stored = store.load().map_err(RunError::Load)?;
    let previous = parse_previous(stored.as_deref()).map_err(|source| RunError::Parse {
        origin: Origin::Previous,
        source,
    })?;
    tracing::debug!(stage = "load", entries = previous.len(), "Loaded local snapshot");

    let bytes = fetcher.fetch().await?;
    tracing::debug!(stage = "fetch", url = %fetcher.url(), bytes = bytes.len(), "Fetched remote feed");

    store.save(&bytes).map_err(RunError::Persist)?;

    let current = parse_feed(&bytes).map_err(|source| RunError::Parse {
        origin: Origin::Current,
        source,
    })?;

    let result = diff(&previous, &current, options.missing_dates)?;
    let report = build_report(&result, &options.report, generated_at);

    let stats = RunStats {
        previous_entries: previous.len(),
        current_entries: current.len(),
        new_entries: result.count(ChangeKind::New),
        changed_entries: result.count(ChangeKind::Changed),
        reported: report.as_ref().map_or(0, |r| r.changes.len()),
    };
    tracing::info!(
        stage = "diff",
        previous = stats.previous_entries,
        current = stats.current_entries,
        new = stats.new_entries,
        changed = stats.changed_entries,
        reported = stats.reported,
        "Feed compared"
    );

    let outcome = match report {
        Some(report) => Outcome::Report(report),
        None => Outcome::NoChanges,
    };

    Ok(RunSummary { outcome, stats })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_previous_absent_is_empty() {
        assert!(parse_previous(None).unwrap().is_empty());
    }

    #[test]
    fn test_parse_previous_blank_is_empty() {
        assert!(parse_previous(Some(b"".as_slice())).unwrap().is_empty());
        assert!(parse_previous(Some(b"\n\t ".as_slice())).unwrap().is_empty());
    }

    #[test]
    fn test_parse_previous_corrupt_is_error() {
        assert!(parse_previous(Some(b"<not valid xml".as_slice())).is_err());
    }

    #[test]
    fn test_stage_names() {
        let err = RunError::Fetch(FetchError::HttpStatus(503));
        assert_eq!(err.stage(), "fetch");
        let err = RunError::Parse {
            origin: Origin::Current,
            source: ParseError::Empty,
        };
        assert_eq!(err.stage(), "parse");
        assert_eq!(err.to_string(), "Unable to parse remote feed: Feed is empty");
    }
}
