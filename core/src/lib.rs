//! Synchronous client for the Plaid financial-data API.
//!
//! # Overview
//! Links bank accounts, answers MFA challenges, refreshes transactions,
//! updates or removes credentials, and looks up entities, institutions and
//! categories. Responses are returned as decoded JSON.
//!
//! # Design
//! - `ClientConfig` is resolved once (Test or Live) and never changes.
//! - Each operation is split into a pure `build_*` method and a sending
//!   method, so callers can run the HTTP round-trip themselves and feed the
//!   result to `parse_response`.
//! - The network sits behind the `Transport` trait; `UreqTransport` is the
//!   default blocking implementation.
//! - Every failure is a typed `PlaidError`; nothing panics on bad input.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod retry;
pub mod transport;
pub mod types;

pub use client::PlaidClient;
pub use config::{ClientConfig, Mode, Settings};
pub use error::PlaidError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use retry::RetryConfig;
pub use transport::{Transport, UreqTransport};
pub use types::{Credentials, RequestPayload, Response};
