pub mod auth;
pub mod config;
pub mod error;
pub mod google_drive;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod service;
pub mod types;

pub use error::{GatewayError, RemoteError};
pub use google_drive::GoogleDriveClient;
pub use service::DriveGateway;
