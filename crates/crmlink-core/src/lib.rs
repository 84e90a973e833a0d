//! Resilient access layer for CRM incoming-webhook REST APIs.
//!
//! The pieces, leaves first: [`error`] (failure taxonomy), [`rate_limit`]
//! (request pacing), [`cache`] (TTL response cache), [`retry`] (bounded
//! backoff) and [`client`] (the orchestrator callers use).

pub mod config;
pub mod logging;

pub mod cache;
pub mod client;
pub mod error;
pub mod rate_limit;
pub mod retry;

pub use client::{ApiClient, ClientConfig, ItemsOutcome, Request, Response};
pub use error::{ApiError, ErrorKind};
