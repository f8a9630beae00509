//! HTTP client module with retry logic for reachability and existence probes.

mod client;
mod retry;

pub use client::{DEFAULT_TIMEOUT, HttpClient, USER_AGENT};
