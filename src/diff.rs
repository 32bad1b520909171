//! Feed diff engine.
//!
//! Decides which entries of the current feed are new or changed compared to
//! the previous snapshot. Entries are identified by title only; two entries
//! with the same title are "the same entry" and are compared by publish time.
//!
//! This module is pure: no clock, network or filesystem access.

use crate::feed::FeedEntry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// How to classify a title match where one side has no publish date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MissingDatePolicy {
    /// Report the entry as changed.
    #[default]
    Changed,
    /// Treat the entry as unchanged.
    Unchanged,
    /// Fail the diff with [`DiffError::MissingTimestamp`].
    Strict,
}

/// Which snapshot an entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Previous,
    Current,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Previous => f.write_str("previous"),
            Side::Current => f.write_str("current"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DiffError {
    #[error("Entry '{title}' has no publish date in the {side} snapshot")]
    MissingTimestamp { title: String, side: Side },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Title not present in the previous snapshot.
    New,
    /// Title present, publish date differs.
    Changed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub kind: ChangeKind,
    pub entry: FeedEntry,
}

/// New and changed entries, in the current feed's order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    pub changes: Vec<Change>,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn entries(&self) -> impl Iterator<Item = &FeedEntry> {
        self.changes.iter().map(|c| &c.entry)
    }

    pub fn count(&self, kind: ChangeKind) -> usize {
        self.changes.iter().filter(|c| c.kind == kind).count()
    }
}

/// Canonical form used for timestamp equality: whole seconds since the Unix
/// epoch. Sub-second precision and UTC offset representation are discarded.
pub fn canonical_timestamp(dt: &DateTime<Utc>) -> i64 {
    dt.timestamp()
}

/// Title to canonical publish time lookup built from the previous snapshot.
///
/// Duplicate titles are last-write-wins: the entry appearing latest in the
/// snapshot determines the recorded timestamp.
#[derive(Debug, Default)]
pub struct TitleIndex<'a> {
    entries: HashMap<&'a str, Option<i64>>,
}

impl<'a> TitleIndex<'a> {
    pub fn build(entries: &'a [FeedEntry]) -> Self {
        let mut map = HashMap::with_capacity(entries.len());
        for entry in entries {
            let previous = map.insert(
                entry.title.as_str(),
                entry.published_at.as_ref().map(canonical_timestamp),
            );
            if previous.is_some() {
                tracing::debug!(title = %entry.title, "Duplicate title in snapshot, keeping last");
            }
        }
        Self { entries: map }
    }

    /// `None` if the title is unknown, `Some(None)` if known without a date.
    pub fn get(&self, title: &str) -> Option<Option<i64>> {
        self.entries.get(title).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Computes the entries of `current` that are new or changed relative to
/// `previous`.
///
/// # Errors
///
/// Only with [`MissingDatePolicy::Strict`], when a title matches and either
/// side lacks a publish date.
pub fn diff(
    previous: &[FeedEntry],
    current: &[FeedEntry],
    policy: MissingDatePolicy,
) -> Result<DiffResult, DiffError> {
    let index = TitleIndex::build(previous);
    let mut changes = Vec::new();

    for entry in current {
        let kind = match index.get(&entry.title) {
            None => Some(ChangeKind::New),
            Some(recorded) => {
                let now = entry.published_at.as_ref().map(canonical_timestamp);
                classify_match(&entry.title, recorded, now, policy)?
            }
        };

        if let Some(kind) = kind {
            changes.push(Change {
                kind,
                entry: entry.clone(),
            });
        }
    }

    Ok(DiffResult { changes })
}

fn classify_match(
    title: &str,
    recorded: Option<i64>,
    now: Option<i64>,
    policy: MissingDatePolicy,
) -> Result<Option<ChangeKind>, DiffError> {
    match (recorded, now) {
        (Some(before), Some(after)) => Ok((before != after).then_some(ChangeKind::Changed)),
        (before, _) => match policy {
            MissingDatePolicy::Changed => Ok(Some(ChangeKind::Changed)),
            MissingDatePolicy::Unchanged => Ok(None),
            MissingDatePolicy::Strict => Err(DiffError::MissingTimestamp {
                title: title.to_string(),
                side: if before.is_none() {
                    Side::Previous
                } else {
                    Side::Current
                },
            }),
        },
    }
}
