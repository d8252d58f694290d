use async_trait::async_trait;

use crate::error::RemoteError;
use crate::types::drive::{FileQuery, NewFile, RemoteFile, RemoteFolder, UploadedFile};

/// Remote file store the gateway talks to. Each call is one network round trip
/// from the caller's point of view.
#[async_trait]
pub trait DriveStore: Send + Sync {
    /// Files matching `query`, in the store's own order.
    async fn list_files(&self, query: &FileQuery) -> Result<Vec<RemoteFile>, RemoteError>;

    async fn create_folder(&self, name: &str, parent_id: &str)
    -> Result<RemoteFolder, RemoteError>;

    async fn create_file(&self, file: NewFile) -> Result<UploadedFile, RemoteError>;
}
