//! Change report rendering.
//!
//! Filtering by link suffix happens here, after the diff, so the diff engine
//! stays unaware of what ends up in the output.

use crate::diff::DiffResult;
use crate::feed::FeedEntry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Printed instead of a report when nothing qualifies.
pub const NO_CHANGES: &str = "no changes found";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to serialize report as JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to serialize report as TOML: {0}")]
    Toml(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Toml,
}

/// Fixed descriptive fields of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Report title; `{date}` is replaced with the generation date.
    pub title: String,
    pub author: String,
    pub categories: Vec<String>,
    /// Only entries whose link ends with this suffix are reported.
    pub link_suffix: Option<String>,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            title: "Open Data updates for {date}".to_string(),
            author: "feedwatch".to_string(),
            categories: vec!["open-data".to_string()],
            link_suffix: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRecord {
    pub name: String,
    pub link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

impl From<&FeedEntry> for ChangeRecord {
    fn from(entry: &FeedEntry) -> Self {
        Self {
            name: entry.title.clone(),
            link: entry.link.clone(),
            date: entry.published_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub author: String,
    pub categories: Vec<String>,
    pub changes: Vec<ChangeRecord>,
}

/// Keeps changed entries whose link ends with `suffix` (ASCII
/// case-insensitive). `None` keeps everything.
pub fn filter_changes<'a>(result: &'a DiffResult, suffix: Option<&str>) -> Vec<&'a FeedEntry> {
    result
        .entries()
        .filter(|entry| match suffix {
            Some(suffix) => link_has_suffix(&entry.link, suffix),
            None => true,
        })
        .collect()
}

fn link_has_suffix(link: &str, suffix: &str) -> bool {
    link.len() >= suffix.len()
        && link
            .get(link.len() - suffix.len()..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(suffix))
}

/// Builds the report, or `None` when no change survives the link filter.
pub fn build_report(
    result: &DiffResult,
    settings: &ReportSettings,
    generated_at: DateTime<Utc>,
) -> Option<Report> {
    let changes: Vec<ChangeRecord> = filter_changes(result, settings.link_suffix.as_deref())
        .into_iter()
        .map(ChangeRecord::from)
        .collect();

    if changes.is_empty() {
        return None;
    }

    Some(Report {
        title: settings
            .title
            .replace("{date}", &generated_at.format("%Y-%m-%d").to_string()),
        generated_at,
        author: settings.author.clone(),
        categories: settings.categories.clone(),
        changes,
    })
}

pub fn render(report: &Report, format: OutputFormat) -> Result<String, RenderError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Toml => Ok(toml::to_string_pretty(report)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{Change, ChangeKind};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn generated() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 2, 8, 30, 0).unwrap()
    }

    fn result_with(links: &[(&str, &str)]) -> DiffResult {
        DiffResult {
            changes: links
                .iter()
                .map(|(title, link)| Change {
                    kind: ChangeKind::New,
                    entry: FeedEntry::new(
                        *title,
                        *link,
                        Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()),
                    ),
                })
                .collect(),
        }
    }

    #[test]
    fn test_filter_by_suffix_case_insensitive() {
        let result = result_with(&[
            ("Parking", "https://example.com/parking.CSV"),
            ("Map", "https://example.com/map.zip"),
            ("Trees", "https://example.com/trees.csv"),
        ]);
        let kept: Vec<&str> = filter_changes(&result, Some(".csv"))
            .into_iter()
            .map(|e| e.title.as_str())
            .collect();
        assert_eq!(kept, vec!["Parking", "Trees"]);
    }

    #[test]
    fn test_filter_without_suffix_keeps_all() {
        let result = result_with(&[("A", "https://example.com/a"), ("B", "")]);
        assert_eq!(filter_changes(&result, None).len(), 2);
    }

    #[test]
    fn test_filter_handles_short_and_multibyte_links() {
        let result = result_with(&[("A", "é"), ("B", ""), ("C", "ééa")]);
        assert!(filter_changes(&result, Some(".csv")).is_empty());
    }

    #[test]
    fn test_build_report_fills_metadata() {
        let result = result_with(&[("Parking", "https://example.com/parking.csv")]);
        let report = build_report(&result, &ReportSettings::default(), generated()).unwrap();

        assert_eq!(report.title, "Open Data updates for 2024-06-02");
        assert_eq!(report.generated_at, generated());
        assert_eq!(report.author, "feedwatch");
        assert_eq!(report.categories, vec!["open-data".to_string()]);
        assert_eq!(
            report.changes,
            vec![ChangeRecord {
                name: "Parking".to_string(),
                link: "https://example.com/parking.csv".to_string(),
                date: Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()),
            }]
        );
    }

    #[test]
    fn test_build_report_empty_diff_is_none() {
        let report = build_report(&DiffResult::default(), &ReportSettings::default(), generated());
        assert!(report.is_none());
    }

    #[test]
    fn test_build_report_everything_filtered_is_none() {
        let result = result_with(&[("Map", "https://example.com/map.zip")]);
        let settings = ReportSettings {
            link_suffix: Some(".csv".to_string()),
            ..ReportSettings::default()
        };
        assert!(build_report(&result, &settings, generated()).is_none());
    }

    #[test]
    fn test_render_json() {
        let result = result_with(&[("Parking", "https://example.com/parking.csv")]);
        let report = build_report(&result, &ReportSettings::default(), generated()).unwrap();
        let rendered = render(&report, OutputFormat::Json).unwrap();

        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["title"], "Open Data updates for 2024-06-02");
        assert_eq!(value["changes"][0]["name"], "Parking");
        assert_eq!(value["changes"][0]["link"], "https://example.com/parking.csv");
        assert_eq!(value["changes"][0]["date"], "2024-06-01T00:00:00Z");
    }

    #[test]
    fn test_render_toml() {
        let result = result_with(&[("Parking", "https://example.com/parking.csv")]);
        let report = build_report(&result, &ReportSettings::default(), generated()).unwrap();
        let rendered = render(&report, OutputFormat::Toml).unwrap();

        let value: toml::Table = rendered.parse().unwrap();
        assert_eq!(value.get("author").and_then(|v| v.as_str()), Some("feedwatch"));
        let first = value
            .get("changes")
            .and_then(|v| v.as_array())
            .and_then(|changes| changes.first())
            .unwrap();
        assert_eq!(first.get("name").and_then(|v| v.as_str()), Some("Parking"));
    }
}
