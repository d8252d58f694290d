use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::time::Duration;
use thiserror::Error as ThisError;

use crate::config::Environment;
use crate::types::drive::UploadedFile;

/// A required service-account setting is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
#[error("missing Google service account setting `{0}`")]
pub struct MissingCredential(pub &'static str);

/// Failures talking to Google (token endpoint or Drive API).
#[derive(Debug, ThisError)]
pub enum RemoteError {
    #[error(transparent)]
    Unconfigured(#[from] MissingCredential),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JWT signing error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("OAuth2 server error: {error}")]
    Oauth2Server { error: String },

    #[error("Drive API error {code} {status}: {message}")]
    Api {
        code: u16,
        status: String,
        message: String,
    },

    #[error("{0}")]
    Unexpected(String),
}

impl RemoteError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RemoteError::Reqwest(e) if e.is_timeout())
    }
}

/// Errors surfaced by the Drive gateway to its callers.
#[derive(Debug, ThisError)]
pub enum GatewayError {
    #[error(transparent)]
    Configuration(#[from] MissingCredential),

    #[error("missing required field `{0}`")]
    Validation(&'static str),

    #[error("Drive request failed: {0}")]
    RemoteOperation(#[source] RemoteError),

    #[error("could not find or create folder `{folder}`: {source}")]
    FolderResolution {
        folder: String,
        #[source]
        source: RemoteError,
    },

    #[error("could not upload `{file_name}`: {source}")]
    Upload {
        file_name: String,
        #[source]
        source: RemoteError,
    },

    #[error("{operation} timed out after {}s", .after.as_secs())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

impl GatewayError {
    /// Classify a store failure, keeping configuration and timeout kinds distinct
    /// from the wrapped remote failure.
    pub fn from_remote(
        operation: &'static str,
        after: Duration,
        err: RemoteError,
        wrap: impl FnOnce(RemoteError) -> GatewayError,
    ) -> Self {
        match err {
            RemoteError::Unconfigured(missing) => GatewayError::Configuration(missing),
            err if err.is_timeout() => GatewayError::Timeout { operation, after },
            err => wrap(err),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Configuration(_)
            | GatewayError::RemoteOperation(_)
            | GatewayError::FolderResolution { .. }
            | GatewayError::Upload { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Configuration(_) => "CONFIGURATION",
            GatewayError::Validation(_) => "VALIDATION",
            GatewayError::RemoteOperation(_) => "REMOTE_OPERATION",
            GatewayError::FolderResolution { .. } => "FOLDER_RESOLUTION",
            GatewayError::Upload { .. } => "UPLOAD",
            GatewayError::Timeout { .. } => "TIMEOUT",
        }
    }

    fn summary(&self) -> String {
        match self {
            GatewayError::Configuration(_) => "Google Drive is not configured".to_string(),
            GatewayError::Validation(field) => {
                format!("Missing required upload data: `{field}`")
            }
            GatewayError::RemoteOperation(_) => "Google Drive request failed".to_string(),
            GatewayError::FolderResolution { .. } => {
                "Could not find or create the session folder".to_string()
            }
            GatewayError::Upload { .. } => "Failed to upload file to Google Drive".to_string(),
            GatewayError::Timeout { .. } => "Google Drive did not respond in time".to_string(),
        }
    }

    /// Build the JSON body. Validation errors carry only `error`.
    pub fn body(&self, environment: Environment) -> ApiErrorBody {
        if let GatewayError::Validation(_) = self {
            return ApiErrorBody {
                error: self.summary(),
                kind: self.kind(),
                details: None,
                stack: None,
            };
        }
        ApiErrorBody {
            error: self.summary(),
            kind: self.kind(),
            details: Some(self.to_string()),
            stack: (environment == Environment::Development).then(|| source_chain(self)),
        }
    }

    pub fn report(self, environment: Environment) -> ErrorReport {
        ErrorReport {
            error: self,
            environment,
        }
    }
}

fn source_chain(err: &dyn StdError) -> Vec<String> {
    let mut chain = vec![format!("{err:?}")];
    let mut current = err.source();
    while let Some(cause) = current {
        chain.push(format!("{cause:?}"));
        current = cause.source();
    }
    chain
}

/// A gateway error bound to the operating mode that decides whether `stack` is emitted.
#[derive(Debug)]
pub struct ErrorReport {
    pub error: GatewayError,
    pub environment: Environment,
}

impl IntoResponse for ErrorReport {
    fn into_response(self) -> axum::response::Response {
        let status = self.error.status();
        (status, Json(self.error.body(self.environment))).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<Vec<String>>,
}

/// A sequential batch stopped at `index`; everything in `uploaded` stays remote.
#[derive(Debug, ThisError)]
#[error("file #{} (`{file_name}`) failed: {source}", .index + 1)]
pub struct BatchUploadError {
    pub index: usize,
    pub file_name: String,
    pub uploaded: Vec<UploadedFile>,
    #[source]
    pub source: GatewayError,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchErrorBody {
    #[serde(flatten)]
    body: ApiErrorBody,
    failed_index: usize,
    failed_file_name: String,
    uploaded: Vec<UploadedFile>,
}

#[derive(Debug)]
pub struct BatchErrorReport {
    pub error: BatchUploadError,
    pub environment: Environment,
}

impl IntoResponse for BatchErrorReport {
    fn into_response(self) -> axum::response::Response {
        let BatchUploadError {
            index,
            file_name,
            uploaded,
            source,
        } = self.error;
        let body = BatchErrorBody {
            body: source.body(self.environment),
            failed_index: index,
            failed_file_name: file_name,
            uploaded,
        };
        (source.status(), Json(body)).into_response()
    }
}

/// Google-style error envelope returned by the Drive API.
#[derive(Deserialize, Debug)]
pub struct DriveApiError {
    pub error: DriveApiErrorBody,
}

#[derive(Deserialize, Debug)]
pub struct DriveApiErrorBody {
    pub code: u16,
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl From<DriveApiError> for RemoteError {
    fn from(e: DriveApiError) -> Self {
        RemoteError::Api {
            code: e.error.code,
            status: e.error.status.unwrap_or_default(),
            message: e.error.message,
        }
    }
}

/// Failures talking to the external auth service. The guard treats all of them as
/// "no session"; only `Rejected` clears the session cookies.
#[derive(Debug, ThisError)]
pub enum AuthError {
    #[error("auth service rejected the session ({0})")]
    Rejected(reqwest::StatusCode),

    #[error("auth service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("auth service returned unexpected status {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed auth service response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("auth service response has no refresh token")]
    MissingRefreshToken,

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl AuthError {
    pub fn is_rejection(&self) -> bool {
        matches!(self, AuthError::Rejected(_))
    }
}

/// Startup configuration problems.
#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("HTTP client setup failed: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError::Figment(Box::new(e))
    }
}
