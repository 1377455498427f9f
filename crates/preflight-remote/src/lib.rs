//! Adapters connecting preflight probes to real services.
//!
//! [`PostgresConnector`] implements
//! [`DatabaseConnector`](preflight_core::DatabaseConnector) with the
//! synchronous `postgres` client, and [`GoogleSheetsAuthorizer`] implements
//! [`SheetsAuthorizer`](preflight_core::SheetsAuthorizer) over the Sheets API
//! v4 using a service-account JWT grant. Failures are converted to
//! [`OpaqueError`](preflight_model::OpaqueError) with network-style
//! identifiers so the classifier can categorize them.

pub mod error;
pub mod oauth;
pub mod postgres;
pub mod sheets;

pub use error::RemoteError;
pub use postgres::{PostgresConnector, PostgresSession};
pub use sheets::{GoogleSheetsAuthorizer, GoogleSheetsClient};
