use axum::{
    Json,
    extract::{FromRequest, Multipart, Request, multipart::MultipartError},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::debug;

use crate::types::drive::{BatchFile, UploadBatch, UploadRequest};

/// Multipart body of `POST /drive`.
pub struct UploadForm(pub UploadRequest);

impl<S> FromRequest<S> for UploadForm
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let mut upload = UploadRequest::default();
        while let Some(field) = multipart.next_field().await.map_err(reject)? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            match name.as_str() {
                "file" => upload.content = Some(field.bytes().await.map_err(reject)?),
                "fileName" => upload.file_name = Some(field.text().await.map_err(reject)?),
                "mimeType" => upload.mime_type = Some(field.text().await.map_err(reject)?),
                "date" => upload.date = Some(field.text().await.map_err(reject)?),
                "location" => upload.location = Some(field.text().await.map_err(reject)?),
                "title" => upload.title = Some(field.text().await.map_err(reject)?),
                "tags" => upload.tags = Some(field.text().await.map_err(reject)?),
                other => debug!(field = other, "ignoring unknown upload field"),
            }
        }
        Ok(Self(upload))
    }
}

/// Multipart body of `POST /drive/batch`: repeated `file` parts plus shared metadata.
pub struct BatchUploadForm(pub UploadBatch);

impl<S> FromRequest<S> for BatchUploadForm
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let mut batch = UploadBatch::default();
        while let Some(field) = multipart.next_field().await.map_err(reject)? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            match name.as_str() {
                "file" => {
                    let file_name = field.file_name().map(str::to_owned);
                    let mime_type = field.content_type().map(str::to_owned);
                    let content = field.bytes().await.map_err(reject)?;
                    batch.files.push(BatchFile {
                        content,
                        file_name,
                        mime_type,
                    });
                }
                "date" => batch.date = Some(field.text().await.map_err(reject)?),
                "location" => batch.location = Some(field.text().await.map_err(reject)?),
                "title" => batch.title = Some(field.text().await.map_err(reject)?),
                "tags" => batch.tags = Some(field.text().await.map_err(reject)?),
                other => debug!(field = other, "ignoring unknown batch field"),
            }
        }
        Ok(Self(batch))
    }
}

/// Oversized bodies keep their 413 from the body limit.
fn reject(err: MultipartError) -> Response {
    (err.status(), Json(json!({ "error": err.body_text() }))).into_response()
}
