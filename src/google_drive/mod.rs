//! Google Drive v3 access under a service account.
//!
//! Layout:
//! - `credentials.rs`: the service identity and its signed JWT assertion
//! - `endpoints.rs`: stateless token and Drive HTTP calls
//! - `client.rs`: the lazily authorized, shared client implementing `DriveStore`

pub mod client;
pub mod credentials;
mod endpoints;

pub use client::GoogleDriveClient;
pub use credentials::ServiceCredential;
