#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::StatusCode;
use bandhub::auth::{AuthProvider, AuthSession, AuthUser};
use bandhub::config::Config;
use bandhub::error::{AuthError, RemoteError};
use bandhub::router::{AppState, app_router};
use bandhub::service::DriveStore;
use bandhub::types::drive::{
    FOLDER_MIME_TYPE, FileQuery, NewFile, RemoteFile, RemoteFolder, UploadedFile,
};
use oauth2::{AccessToken, RefreshToken};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ROOT: &str = "root-folder";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    List(FileQuery),
    CreateFolder(String),
    CreateFile(String),
}

#[derive(Debug, Clone)]
struct StoredItem {
    file: RemoteFile,
    parent_id: String,
    trashed: bool,
}

#[derive(Default)]
struct StoreState {
    items: Vec<StoredItem>,
    uploads: Vec<NewFile>,
    calls: Vec<StoreCall>,
    next_id: u64,
}

/// In-memory Drive that evaluates `FileQuery` the way the remote service does.
#[derive(Default)]
pub struct MockStore {
    state: Mutex<StoreState>,
    list_delay: Option<Duration>,
    upload_delay: Option<Duration>,
    fail_lists: bool,
    fail_uploads: HashSet<String>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listing answers are computed, then delivered after `delay`.
    pub fn with_list_delay(mut self, delay: Duration) -> Self {
        self.list_delay = Some(delay);
        self
    }

    pub fn with_upload_delay(mut self, delay: Duration) -> Self {
        self.upload_delay = Some(delay);
        self
    }

    pub fn failing_lists(mut self) -> Self {
        self.fail_lists = true;
        self
    }

    pub fn failing_upload_of(mut self, name: &str) -> Self {
        self.fail_uploads.insert(name.to_string());
        self
    }

    pub fn with_file(self, parent_id: &str, name: &str, trashed: bool) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let id = next_id(&mut state, "file");
            state.items.push(StoredItem {
                file: RemoteFile {
                    id,
                    name: name.to_string(),
                    mime_type: "image/jpeg".to_string(),
                    web_content_link: None,
                    web_view_link: None,
                },
                parent_id: parent_id.to_string(),
                trashed,
            });
        }
        self
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn folders_named(&self, name: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .items
            .iter()
            .filter(|i| i.file.mime_type == FOLDER_MIME_TYPE && i.file.name == name)
            .count()
    }

    pub fn uploads(&self) -> Vec<NewFile> {
        self.state.lock().unwrap().uploads.clone()
    }
}

fn next_id(state: &mut StoreState, prefix: &str) -> String {
    state.next_id += 1;
    format!("{prefix}-{}", state.next_id)
}

#[async_trait]
impl DriveStore for MockStore {
    async fn list_files(&self, query: &FileQuery) -> Result<Vec<RemoteFile>, RemoteError> {
        let result = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(StoreCall::List(query.clone()));
            assert!(
                query.to_query_string().ends_with("trashed = false"),
                "trashed filter missing from {query:?}"
            );
            state
                .items
                .iter()
                .filter(|i| !i.trashed && i.parent_id == query.parent_id)
                .filter(|i| query.name.as_ref().is_none_or(|n| &i.file.name == n))
                .filter(|i| query.mime_type.as_ref().is_none_or(|m| &i.file.mime_type == m))
                .map(|i| i.file.clone())
                .collect::<Vec<_>>()
        };
        if let Some(delay) = self.list_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_lists {
            return Err(RemoteError::Api {
                code: 500,
                status: "INTERNAL".into(),
                message: "backend error".into(),
            });
        }
        Ok(result)
    }

    async fn create_folder(
        &self,
        name: &str,
        parent_id: &str,
    ) -> Result<RemoteFolder, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(StoreCall::CreateFolder(name.to_string()));
        let id = next_id(&mut state, "folder");
        state.items.push(StoredItem {
            file: RemoteFile {
                id: id.clone(),
                name: name.to_string(),
                mime_type: FOLDER_MIME_TYPE.to_string(),
                web_content_link: None,
                web_view_link: None,
            },
            parent_id: parent_id.to_string(),
            trashed: false,
        });
        Ok(RemoteFolder {
            id,
            name: name.to_string(),
            parent_id: parent_id.to_string(),
        })
    }

    async fn create_file(&self, file: NewFile) -> Result<UploadedFile, RemoteError> {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(StoreCall::CreateFile(file.name.clone()));
        if let Some(delay) = self.upload_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_uploads.contains(&file.name) {
            return Err(RemoteError::Api {
                code: 403,
                status: "PERMISSION_DENIED".into(),
                message: "storage quota exceeded".into(),
            });
        }

        let mut state = self.state.lock().unwrap();
        let id = next_id(&mut state, "file");
        state.items.push(StoredItem {
            file: RemoteFile {
                id: id.clone(),
                name: file.name.clone(),
                mime_type: file.mime_type.clone(),
                web_content_link: Some(format!("https://drive.test/uc?id={id}")),
                web_view_link: Some(format!("https://drive.test/file/d/{id}/view")),
            },
            parent_id: file.parent_id.clone(),
            trashed: false,
        });
        let uploaded = UploadedFile {
            id: id.clone(),
            name: file.name.clone(),
            web_content_link: Some(format!("https://drive.test/uc?id={id}")),
            web_view_link: Some(format!("https://drive.test/file/d/{id}/view")),
        };
        state.uploads.push(file);
        Ok(uploaded)
    }
}

/// Auth service stand-in: knows a set of valid access tokens and refresh rotations.
#[derive(Default)]
pub struct MockAuth {
    valid_access: HashSet<String>,
    rotations: HashMap<String, (String, String)>,
    unavailable: bool,
    calls: Mutex<Vec<String>>,
}

impl MockAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accepting(mut self, access: &str) -> Self {
        self.valid_access.insert(access.to_string());
        self
    }

    pub fn rotating(mut self, refresh: &str, new_access: &str, new_refresh: &str) -> Self {
        self.rotations.insert(
            refresh.to_string(),
            (new_access.to_string(), new_refresh.to_string()),
        );
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> Result<(), AuthError> {
        self.calls.lock().unwrap().push(call);
        if self.unavailable {
            return Err(AuthError::Status(StatusCode::SERVICE_UNAVAILABLE));
        }
        Ok(())
    }

    fn user() -> AuthUser {
        AuthUser {
            id: "user-1".to_string(),
            email: Some("bateria@banda.test".to_string()),
        }
    }
}

#[async_trait]
impl AuthProvider for MockAuth {
    async fn get_user(&self, access_token: &AccessToken) -> Result<AuthUser, AuthError> {
        self.record(format!("get_user:{}", access_token.secret()))?;
        if self.valid_access.contains(access_token.secret()) {
            Ok(Self::user())
        } else {
            Err(AuthError::Rejected(StatusCode::UNAUTHORIZED))
        }
    }

    async fn refresh_session(
        &self,
        refresh_token: &RefreshToken,
    ) -> Result<AuthSession, AuthError> {
        self.record(format!("refresh:{}", refresh_token.secret()))?;
        let (access, refresh) = self
            .rotations
            .get(refresh_token.secret())
            .cloned()
            .ok_or(AuthError::Rejected(StatusCode::BAD_REQUEST))?;
        Ok(AuthSession {
            user: Self::user(),
            access_token: AccessToken::new(access),
            refresh_token: RefreshToken::new(refresh),
            expires_in: Some(Duration::from_secs(3600)),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        self.record(format!("sign_in:{email}"))?;
        if password != "correcta" {
            return Err(AuthError::Rejected(StatusCode::BAD_REQUEST));
        }
        Ok(AuthSession {
            user: Self::user(),
            access_token: AccessToken::new("signed-in-access".to_string()),
            refresh_token: RefreshToken::new("signed-in-refresh".to_string()),
            expires_in: Some(Duration::from_secs(3600)),
        })
    }

    async fn sign_out(&self, access_token: &AccessToken) -> Result<(), AuthError> {
        self.record(format!("sign_out:{}", access_token.secret()))
    }
}

pub fn test_config() -> Config {
    let mut cfg = Config::default();
    cfg.drive.root_folder_id = ROOT.to_string();
    cfg
}

pub fn test_app(store: Arc<MockStore>, auth: Arc<MockAuth>, cfg: &Config) -> axum::Router {
    app_router(AppState::new(store, auth, cfg))
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        content: &'a [u8],
    },
}

pub const BOUNDARY: &str = "bandhub-test-boundary";

/// `multipart/form-data` body as a browser would send it.
pub fn multipart_body(parts: &[Part<'_>]) -> Bytes {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                content_type,
                content,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(content);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    Bytes::from(body)
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}
