use axum::body::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
pub const SESSION_FOLDER_PREFIX: &str = "Sesión de Fotos ";

/// Name of the folder grouping every upload of one photo session.
pub fn session_folder_name(date: &str) -> String {
    format!("{SESSION_FOLDER_PREFIX}{date}")
}

/// File summary as returned by a listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_content_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFolder {
    pub id: String,
    pub name: String,
    pub parent_id: String,
}

/// Result of a successful upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub web_content_link: Option<String>,
    #[serde(default)]
    pub web_view_link: Option<String>,
}

/// Custom properties attached to every uploaded file; never null.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileProperties {
    pub location: String,
    pub title: String,
    pub tags: String,
}

/// A file ready to be created under `parent_id`.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub name: String,
    pub mime_type: String,
    pub parent_id: String,
    pub properties: FileProperties,
    pub content: Bytes,
}

/// Listing filter. Rendered queries always exclude trashed items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileQuery {
    pub parent_id: String,
    pub name: Option<String>,
    pub mime_type: Option<String>,
}

impl FileQuery {
    pub fn children_of(parent_id: impl Into<String>) -> Self {
        Self {
            parent_id: parent_id.into(),
            name: None,
            mime_type: None,
        }
    }

    pub fn folder_named(parent_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            parent_id: parent_id.into(),
            name: Some(name.into()),
            mime_type: Some(FOLDER_MIME_TYPE.to_string()),
        }
    }

    /// Drive query language rendering with every caller value escaped.
    pub fn to_query_string(&self) -> String {
        let mut clauses = vec![format!("'{}' in parents", escape_literal(&self.parent_id))];
        if let Some(name) = &self.name {
            clauses.push(format!("name = '{}'", escape_literal(name)));
        }
        if let Some(mime) = &self.mime_type {
            clauses.push(format!("mimeType = '{}'", escape_literal(mime)));
        }
        clauses.push("trashed = false".to_string());
        clauses.join(" and ")
    }
}

/// Escape a value for use inside a single-quoted Drive query literal.
pub fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '\'') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Upload input as received from a caller, before validation.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub content: Option<Bytes>,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub date: Option<String>,
    pub location: Option<String>,
    pub title: Option<String>,
    pub tags: Option<String>,
}

/// An upload whose required fields are all present.
#[derive(Debug, Clone)]
pub struct ValidUpload {
    pub content: Bytes,
    pub file_name: String,
    pub mime_type: String,
    pub date: String,
    pub properties: FileProperties,
}

impl UploadRequest {
    pub fn validate(self) -> Result<ValidUpload, GatewayError> {
        let content = self.content.ok_or(GatewayError::Validation("file"))?;
        let file_name = required(self.file_name, "fileName")?;
        let mime_type = required(self.mime_type, "mimeType")?;
        let date = required(self.date, "date")?;
        Ok(ValidUpload {
            content,
            file_name,
            mime_type,
            date,
            properties: FileProperties {
                location: self.location.unwrap_or_default(),
                title: self.title.unwrap_or_default(),
                tags: self.tags.unwrap_or_default(),
            },
        })
    }

    /// Display name used when reporting on this request, even if invalid.
    pub fn display_name(&self) -> String {
        self.file_name.clone().unwrap_or_default()
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, GatewayError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(GatewayError::Validation(field))
}

/// One part of a multi-file upload.
#[derive(Debug, Clone, Default)]
pub struct BatchFile {
    pub content: Bytes,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
}

/// Several files sharing one session date and metadata.
#[derive(Debug, Clone, Default)]
pub struct UploadBatch {
    pub files: Vec<BatchFile>,
    pub date: Option<String>,
    pub location: Option<String>,
    pub title: Option<String>,
    pub tags: Option<String>,
}

impl UploadBatch {
    /// Expand into per-file requests; with several files each title is suffixed
    /// with its 1-based position.
    pub fn into_requests(self) -> Vec<UploadRequest> {
        let numbered = self.files.len() > 1;
        self.files
            .into_iter()
            .enumerate()
            .map(|(i, file)| UploadRequest {
                content: Some(file.content),
                file_name: file.file_name,
                mime_type: file.mime_type,
                date: self.date.clone(),
                location: self.location.clone(),
                title: match (&self.title, numbered) {
                    (Some(title), true) => Some(format!("{title} {}", i + 1)),
                    (title, _) => title.clone(),
                },
                tags: self.tags.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct FileListResponse {
    pub files: Vec<RemoteFile>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub file: UploadedFile,
}

#[derive(Debug, Serialize)]
pub struct BatchUploadResponse {
    pub message: String,
    pub files: Vec<UploadedFile>,
}
