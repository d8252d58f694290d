use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::{BatchUploadError, GatewayError, RemoteError};
use crate::service::store::DriveStore;
use crate::types::drive::{
    FileQuery, NewFile, RemoteFile, UploadRequest, UploadedFile, ValidUpload,
    session_folder_name,
};

/// Lists and uploads files under one service identity, grouping uploads into
/// one folder per session date below `root_folder_id`.
pub struct DriveGateway {
    store: Arc<dyn DriveStore>,
    root_folder_id: String,
    timeout: Duration,
    folder_locks: Option<FolderLocks>,
}

impl DriveGateway {
    pub fn new(store: Arc<dyn DriveStore>, root_folder_id: impl Into<String>) -> Self {
        Self {
            store,
            root_folder_id: root_folder_id.into(),
            timeout: Duration::from_secs(15),
            folder_locks: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Serialize session-folder resolution per date within this process.
    pub fn with_folder_lock(mut self, enabled: bool) -> Self {
        self.folder_locks = enabled.then(FolderLocks::default);
        self
    }

    /// Non-trashed children of `folder_id`, or of the root when absent or blank.
    pub async fn list_files(&self, folder_id: Option<&str>) -> Result<Vec<RemoteFile>, GatewayError> {
        let folder_id = folder_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(&self.root_folder_id);
        let query = FileQuery::children_of(folder_id);

        let files = self
            .bounded("list files", self.store.list_files(&query), GatewayError::RemoteOperation)
            .await
            .inspect_err(|e| error!(folder_id, error = %e, "listing Drive files failed"))?;
        debug!(folder_id, count = files.len(), "listed Drive files");
        Ok(files)
    }

    pub async fn upload_file(&self, request: UploadRequest) -> Result<UploadedFile, GatewayError> {
        let upload = request.validate()?;
        self.upload_valid(upload).await
    }

    /// Upload strictly in input order, stopping at the first failure. Files already
    /// uploaded stay in place. An empty batch is a missing `file`.
    pub async fn upload_batch(
        &self,
        requests: Vec<UploadRequest>,
    ) -> Result<Vec<UploadedFile>, BatchUploadError> {
        if requests.is_empty() {
            return Err(BatchUploadError {
                index: 0,
                file_name: String::new(),
                uploaded: Vec::new(),
                source: GatewayError::Validation("file"),
            });
        }

        let mut valid = Vec::with_capacity(requests.len());
        for (index, request) in requests.into_iter().enumerate() {
            let file_name = request.display_name();
            match request.validate() {
                Ok(upload) => valid.push(upload),
                Err(source) => {
                    return Err(BatchUploadError {
                        index,
                        file_name,
                        uploaded: Vec::new(),
                        source,
                    });
                }
            }
        }

        let total = valid.len();
        let mut uploaded = Vec::with_capacity(total);
        for (index, upload) in valid.into_iter().enumerate() {
            let file_name = upload.file_name.clone();
            match self.upload_valid(upload).await {
                Ok(file) => {
                    debug!(position = index + 1, total, file_id = %file.id, "batch item uploaded");
                    uploaded.push(file);
                }
                Err(source) => {
                    warn!(
                        position = index + 1,
                        total,
                        kept = uploaded.len(),
                        "batch upload stopped"
                    );
                    return Err(BatchUploadError {
                        index,
                        file_name,
                        uploaded,
                        source,
                    });
                }
            }
        }
        Ok(uploaded)
    }

    async fn upload_valid(&self, upload: ValidUpload) -> Result<UploadedFile, GatewayError> {
        let folder_id = self.resolve_session_folder(&upload.date).await?;

        let file_name = upload.file_name.clone();
        let new_file = NewFile {
            name: upload.file_name,
            mime_type: upload.mime_type,
            parent_id: folder_id,
            properties: upload.properties,
            content: upload.content,
        };
        let created = self
            .bounded("upload file", self.store.create_file(new_file), |source| {
                GatewayError::Upload {
                    file_name: file_name.clone(),
                    source,
                }
            })
            .await
            .inspect_err(|e| error!(file_name = %file_name, error = %e, "Drive upload failed"))?;

        info!(file_id = %created.id, name = %created.name, "file uploaded to Drive");
        Ok(created)
    }

    /// Find the non-trashed folder for `date` under the root, creating it when absent.
    /// Without the folder lock this is check-then-act: concurrent first uploads for
    /// one date can each create a folder.
    async fn resolve_session_folder(&self, date: &str) -> Result<String, GatewayError> {
        let folder_name = session_folder_name(date);

        let Some(locks) = &self.folder_locks else {
            return self.find_or_create_folder(&folder_name).await;
        };
        let lock = locks.acquire(&folder_name);
        let result = {
            let _guard = lock.lock().await;
            self.find_or_create_folder(&folder_name).await
        };
        locks.release(&folder_name, lock);
        result
    }

    async fn find_or_create_folder(&self, folder_name: &str) -> Result<String, GatewayError> {
        let wrap = |source| GatewayError::FolderResolution {
            folder: folder_name.to_string(),
            source,
        };

        let query = FileQuery::folder_named(&self.root_folder_id, folder_name);
        let existing = self
            .bounded("find session folder", self.store.list_files(&query), wrap)
            .await?;
        if let Some(folder) = existing.into_iter().next() {
            debug!(folder = folder_name, folder_id = %folder.id, "reusing session folder");
            return Ok(folder.id);
        }

        let created = self
            .bounded(
                "create session folder",
                self.store.create_folder(folder_name, &self.root_folder_id),
                wrap,
            )
            .await?;
        if created.id.is_empty() {
            return Err(wrap(RemoteError::Unexpected(
                "folder creation returned no id".to_string(),
            )));
        }
        info!(folder = folder_name, folder_id = %created.id, "created session folder");
        Ok(created.id)
    }

    /// Run one store call under the configured timeout.
    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, RemoteError>>,
        wrap: impl FnOnce(RemoteError) -> GatewayError,
    ) -> Result<T, GatewayError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(GatewayError::from_remote(operation, self.timeout, err, wrap)),
            Err(_elapsed) => Err(GatewayError::Timeout {
                operation,
                after: self.timeout,
            }),
        }
    }
}

/// Per-folder-name async locks; entries are dropped once nobody holds them.
#[derive(Default)]
struct FolderLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl FolderLocks {
    fn acquire(&self, name: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(name.to_string()).or_default().clone()
    }

    fn release(&self, name: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        // One reference in the map plus ours means no other waiter.
        if Arc::strong_count(&lock) == 2 {
            map.remove(name);
        }
    }
}
