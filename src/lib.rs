//! feedwatch compares a remote syndication feed against the copy saved by the
//! previous run and reports which entries are new or have a different
//! publish date.
//!
//! - [`feed`] - HTTP client with extra trust anchors, fetcher and parser
//! - [`storage`] - Local snapshot persistence
//! - [`diff`] - Title-keyed diff engine
//! - [`report`] - Link filtering and report rendering
//! - [`pipeline`] - Runs the stages in order
//! - [`config`] - TOML configuration and command-line overrides

pub mod config;
pub mod diff;
pub mod feed;
pub mod pipeline;
pub mod report;
pub mod storage;
