//! Catalog HTTP client
//!
//! Authenticated access to the product catalog API: bearer tokens from a
//! pluggable credential store, a retry-once refresh on 401, and a login
//! redirect hook when the session cannot be renewed.

pub mod client;
pub mod types;

pub use client::{CatalogClient, ClientConfig, ClientError};
