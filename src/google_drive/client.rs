use async_trait::async_trait;
use chrono::{DateTime, Utc};
use oauth2::{AccessToken, TokenResponse};
use std::time::Duration;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info};

use super::credentials::ServiceCredential;
use super::endpoints::DriveEndpoints;
use crate::config::DriveConfig;
use crate::error::{MissingCredential, RemoteError};
use crate::service::store::DriveStore;
use crate::types::drive::{FileQuery, NewFile, RemoteFile, RemoteFolder, UploadedFile};

/// Renew the bearer token this long before Google says it expires.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Drive v3 client authorized as a service account.
///
/// Authorization is lazy: the first call signs an assertion and exchanges it,
/// and the resulting handle is shared by every later request. A failed
/// authorization leaves the cell empty so the next call retries it.
pub struct GoogleDriveClient {
    http: reqwest::Client,
    credential: Result<ServiceCredential, MissingCredential>,
    token_uri: String,
    api_base: String,
    upload_base: String,
    authorized: OnceCell<AuthorizedHandle>,
}

struct AuthorizedHandle {
    token: RwLock<CachedToken>,
}

struct CachedToken {
    access_token: AccessToken,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_expiring(&self, now: DateTime<Utc>) -> bool {
        now + chrono::Duration::seconds(EXPIRY_MARGIN_SECS) >= self.expires_at
    }
}

impl GoogleDriveClient {
    pub fn new(cfg: &DriveConfig) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("bandhub/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(cfg.request_timeout())
            .build()?;
        Ok(Self::with_http(http, cfg))
    }

    pub fn with_http(http: reqwest::Client, cfg: &DriveConfig) -> Self {
        Self {
            http,
            credential: cfg.service_credential(),
            token_uri: cfg.token_uri.clone(),
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            upload_base: cfg.upload_base.trim_end_matches('/').to_string(),
            authorized: OnceCell::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credential.is_ok()
    }

    /// Current bearer token, authorizing on first use.
    async fn bearer(&self) -> Result<String, RemoteError> {
        let credential = self.credential.as_ref().map_err(|missing| *missing)?;
        let handle = self
            .authorized
            .get_or_try_init(|| async {
                let token = self.fetch_token(credential).await?;
                info!(principal = %credential.client_email, "Drive client authorized");
                Ok::<_, RemoteError>(AuthorizedHandle {
                    token: RwLock::new(token),
                })
            })
            .await?;

        {
            let token = handle.token.read().await;
            if !token.is_expiring(Utc::now()) {
                return Ok(token.access_token.secret().clone());
            }
        }
        let mut token = handle.token.write().await;
        if token.is_expiring(Utc::now()) {
            debug!("renewing Drive access token");
            *token = self.fetch_token(credential).await?;
        }
        Ok(token.access_token.secret().clone())
    }

    async fn fetch_token(&self, credential: &ServiceCredential) -> Result<CachedToken, RemoteError> {
        let now = Utc::now();
        let assertion = credential.assertion(&self.token_uri, now)?;
        let resp = DriveEndpoints::exchange_assertion(&self.http, &self.token_uri, &assertion).await?;
        let lifetime = resp
            .expires_in()
            .and_then(|d| chrono::Duration::from_std(d).ok())
            .unwrap_or_else(|| chrono::Duration::seconds(3600));
        Ok(CachedToken {
            access_token: resp.access_token().clone(),
            expires_at: now + lifetime,
        })
    }
}

#[async_trait]
impl DriveStore for GoogleDriveClient {
    async fn list_files(&self, query: &FileQuery) -> Result<Vec<RemoteFile>, RemoteError> {
        let token = self.bearer().await?;
        let q = query.to_query_string();
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = DriveEndpoints::list_page(
                &self.http,
                &self.api_base,
                &token,
                &q,
                page_token.as_deref(),
            )
            .await?;
            files.extend(page.files);
            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }
        Ok(files)
    }

    async fn create_folder(
        &self,
        name: &str,
        parent_id: &str,
    ) -> Result<RemoteFolder, RemoteError> {
        let token = self.bearer().await?;
        let created =
            DriveEndpoints::create_folder(&self.http, &self.api_base, &token, name, parent_id)
                .await?;
        Ok(RemoteFolder {
            id: created.id,
            name: name.to_string(),
            parent_id: parent_id.to_string(),
        })
    }

    async fn create_file(&self, file: NewFile) -> Result<UploadedFile, RemoteError> {
        let token = self.bearer().await?;
        DriveEndpoints::create_file(&self.http, &self.upload_base, &token, &file).await
    }
}
