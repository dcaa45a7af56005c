//! Console Insights Networking
//!
//! The fetch primitive a host page uses, and which the overlay wraps.
//!
//! Features:
//! - `Request` / `FetchOptions` mirroring `fetch(input, init)`
//! - `Response` with a single-read body and a non-consuming duplicate
//! - `HttpFetcher` backed by a blocking reqwest client on smol's thread pool

mod client;
pub mod fetch;
pub mod request;

pub use client::{ClientConfig, HttpFetcher, HttpFetcherBuilder};
pub use fetch::Response;
pub use request::{FetchOptions, Method, Request};

/// Network error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Body has already been consumed")]
    BodyUsed,

    #[error("Failed to decode body: {0}")]
    Decode(String),
}
