use chrono::{DateTime, Utc};
use feed_rs::parser;
use thiserror::Error;

/// One item of a syndication feed, reduced to the fields the diff needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    /// Identity key for diffing. Empty when the item has no title.
    pub title: String,
    /// First link of the item, empty when the item has none.
    pub link: String,
    /// Publish date, falling back to the updated date.
    pub published_at: Option<DateTime<Utc>>,
}

impl FeedEntry {
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        published_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            published_at,
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Feed is empty")]
    Empty,
    #[error("Malformed feed: {0}")]
    Malformed(#[from] feed_rs::parser::ParseFeedError),
}

/// Parses RSS, Atom or JSON Feed bytes into entries, in document order.
///
/// Empty input is rejected here; callers that want "no content" to mean
/// "no entries" must decide that before calling.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<FeedEntry>, ParseError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ParseError::Empty);
    }

    let feed = parser::parse(bytes)?;

    let entries: Vec<FeedEntry> = feed
        .entries
        .into_iter()
        .map(|entry| {
            let link = entry
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_default();
            let published_at = entry.published.or(entry.updated);
            let title = entry.title.map(|t| t.content).unwrap_or_default();

            FeedEntry {
                title,
                link,
                published_at,
            }
        })
        .collect();

    Ok(entries)
}
