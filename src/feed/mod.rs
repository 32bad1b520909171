//! Remote feed access: transport trust, fetching and parsing.
//!
//! - [`trust`] - Builds the HTTP client, adding an extra certificate authority
//! - [`fetcher`] - Downloads the raw feed bytes with a size limit, no retries
//! - [`parser`] - Turns RSS/Atom/JSON Feed bytes into [`FeedEntry`] values
//!   using the `feed-rs` crate
//!
//! # Example
//!
//! ```ignore
//! use feedwatch::feed::{build_client, parse_feed, Fetcher, TrustConfig};
//!
//! let client = build_client(&trust)?;
//! let bytes = Fetcher::new(client, "https://opendata.citywindsor.ca/RSS").fetch().await?;
//! let entries = parse_feed(&bytes)?;
//! ```

mod fetcher;
mod parser;
mod trust;

pub use fetcher::{FetchError, Fetcher, MAX_FEED_SIZE};
pub use parser::{parse_feed, FeedEntry, ParseError};
pub use trust::{build_client, load_certificates, TrustConfig, TrustError};
