//! AC-research: filings, videos, papers, screened reports, and news for one query.
//!
//! This crate is the service half of the workspace. The collectors and the
//! report screener live in [`ac_search`].
//!
//! # Architecture
//!
//! - **Config**: TOML file plus environment overrides ([`config`])
//! - **Research**: concurrent fan-out over every source, normalisation,
//!   report screening, and a response cache ([`research`])
//! - **Export**: cached results as an `.xlsx` workbook ([`export`])
//! - **Server**: axum routes with CORS and request tracing ([`server`])

pub mod config;
pub mod error;
pub mod export;
pub mod research;
pub mod schema;
pub mod server;
pub mod util;

pub use config::ResearchConfig;
pub use error::{ResearchError, Result};
pub use research::{Limits, ResearchService};
pub use server::ResearchServer;
