//! Report screener: allowlist filtering, deduplication, and ranking.
//!
//! Takes heterogeneous [`Candidate`](crate::types::Candidate) records pulled
//! from several upstreams and returns a ranked top-N of
//! [`ReportItem`](crate::types::ReportItem)s:
//!
//! - Only hosts on the institutional allowlist survive ([`allowlist`])
//! - Exact-URL and normalised-title duplicates are dropped
//! - Items older than the age cutoff are dropped ([`dates`])
//! - Scores add domain authority, recency, keyword hits, and a PDF bonus,
//!   then subtract short-title and tracking-URL penalties ([`scoring`])
//!
//! The screener is synchronous and pure apart from reading the clock.

pub mod allowlist;
pub mod dates;
pub mod scoring;
mod screen;

pub use screen::{screen, screen_at, DEFAULT_MAX_AGE_DAYS, DEFAULT_MAX_ITEMS};
