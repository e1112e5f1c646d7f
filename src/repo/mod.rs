//! Munki repository access.
//!
//! - [`urls`] - repository URL layout and percent encoding
//! - [`fetch`] - the [`Fetcher`] interface
//! - [`http`] - `reqwest` implementation with conditional requests and resume
//! - [`state`] - persisted HTTP validators
//! - [`client`] - manifests and catalogs with stale-cache fallback

pub mod client;
pub mod fetch;
pub mod http;
pub mod state;
pub mod urls;

pub use client::Repository;
pub use fetch::{FetchOutcome, FetchRequest, Fetcher};
pub use http::HttpFetcher;
pub use state::ValidatorStore;
pub use urls::RepoUrls;
