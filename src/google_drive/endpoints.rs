use axum::body::Bytes;
use oauth2::{
    EmptyExtraTokenFields, StandardTokenResponse,
    basic::{BasicErrorResponse, BasicTokenType},
};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DriveApiError, RemoteError};
use crate::types::drive::{FOLDER_MIME_TYPE, FileProperties, NewFile, RemoteFile, UploadedFile};

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType, webContentLink, webViewLink)";
const UPLOAD_FIELDS: &str = "id, name, webContentLink, webViewLink";
const PAGE_SIZE: &str = "100";

pub(super) type ServiceTokenResponse = StandardTokenResponse<EmptyExtraTokenFields, BasicTokenType>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct FileListPage {
    #[serde(default)]
    pub files: Vec<RemoteFile>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreatedFolder {
    pub id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileMetadata<'a> {
    name: &'a str,
    mime_type: &'a str,
    parents: [&'a str; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    app_properties: Option<&'a FileProperties>,
}

/// Stateless Drive v3 and token endpoint calls.
pub(super) struct DriveEndpoints;

impl DriveEndpoints {
    /// Exchange a signed JWT assertion for a bearer token.
    pub(super) async fn exchange_assertion(
        http: &reqwest::Client,
        token_uri: &str,
        assertion: &str,
    ) -> Result<ServiceTokenResponse, RemoteError> {
        let resp = http
            .post(token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion)])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.bytes().await?;
            let error = match serde_json::from_slice::<BasicErrorResponse>(&body) {
                Ok(err) => err.to_string(),
                Err(_) => format!("{status}: {}", String::from_utf8_lossy(&body)),
            };
            return Err(RemoteError::Oauth2Server { error });
        }
        Ok(resp.json::<ServiceTokenResponse>().await?)
    }

    pub(super) async fn list_page(
        http: &reqwest::Client,
        api_base: &str,
        token: &str,
        query: &str,
        page_token: Option<&str>,
    ) -> Result<FileListPage, RemoteError> {
        let mut params = vec![
            ("q", query),
            ("fields", LIST_FIELDS),
            ("spaces", "drive"),
            ("pageSize", PAGE_SIZE),
        ];
        if let Some(page_token) = page_token {
            params.push(("pageToken", page_token));
        }

        let resp = http
            .get(format!("{api_base}/files"))
            .bearer_auth(token)
            .query(&params)
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    pub(super) async fn create_folder(
        http: &reqwest::Client,
        api_base: &str,
        token: &str,
        name: &str,
        parent_id: &str,
    ) -> Result<CreatedFolder, RemoteError> {
        let metadata = FileMetadata {
            name,
            mime_type: FOLDER_MIME_TYPE,
            parents: [parent_id],
            app_properties: None,
        };
        let resp = http
            .post(format!("{api_base}/files"))
            .bearer_auth(token)
            .query(&[("fields", "id")])
            .json(&metadata)
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    /// Multipart (`multipart/related`) upload of metadata plus content.
    pub(super) async fn create_file(
        http: &reqwest::Client,
        upload_base: &str,
        token: &str,
        file: &NewFile,
    ) -> Result<UploadedFile, RemoteError> {
        let metadata = FileMetadata {
            name: &file.name,
            mime_type: &file.mime_type,
            parents: [file.parent_id.as_str()],
            app_properties: Some(&file.properties),
        };
        let metadata = serde_json::to_vec(&metadata)?;
        let (boundary, body) = related_body(&metadata, &file.mime_type, &file.content);
        let content_type = HeaderValue::from_str(&format!("multipart/related; boundary={boundary}"))
            .map_err(|e| RemoteError::Unexpected(format!("invalid boundary: {e}")))?;
        debug!(name = %file.name, bytes = file.content.len(), "uploading file to Drive");

        let resp = http
            .post(format!("{upload_base}/files"))
            .bearer_auth(token)
            .query(&[("uploadType", "multipart"), ("fields", UPLOAD_FIELDS)])
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }
}

/// Turn non-2xx Drive responses into `RemoteError::Api`.
async fn check(resp: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.bytes().await?;
    match serde_json::from_slice::<DriveApiError>(&body) {
        Ok(api_err) => Err(api_err.into()),
        Err(_) => Err(RemoteError::Api {
            code: status.as_u16(),
            status: status.canonical_reason().unwrap_or_default().to_string(),
            message: String::from_utf8_lossy(&body).into_owned(),
        }),
    }
}

/// Build a two-part `multipart/related` body whose boundary does not occur in
/// either part.
fn related_body(metadata: &[u8], mime_type: &str, content: &Bytes) -> (String, Vec<u8>) {
    let seed = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let mut attempt = 0u32;
    let boundary = loop {
        let candidate = format!("bandhub-{seed:x}-{attempt}");
        let needle = candidate.as_bytes();
        let clashes = |part: &[u8]| part.windows(needle.len()).any(|w| w == needle);
        if !clashes(metadata) && !clashes(&content[..]) {
            break candidate;
        }
        attempt += 1;
    };

    let mut body = Vec::with_capacity(metadata.len() + content.len() + 256);
    body.extend_from_slice(
        format!("--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n").as_bytes(),
    );
    body.extend_from_slice(metadata);
    body.extend_from_slice(format!("\r\n--{boundary}\r\nContent-Type: {mime_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(&content[..]);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (boundary, body)
}
