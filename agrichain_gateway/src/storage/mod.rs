//! Storage gateway client
//!
//! Two error tiers live here. Uploads fail closed: any transport failure or
//! non-2xx reply becomes [`StorageError::Upload`] and reaches the caller.
//! Account statistics fail open: [`BlobStore::usage_stats`] returns
//! [`UsageStats::default`] instead of an error.

pub mod content_id;
pub mod lighthouse;
pub mod memory;
pub mod migration;

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use thiserror::Error;

pub use content_id::{parse_content_id, raw_content_id, ContentId, ContentIdError};
pub use lighthouse::LighthouseStorage;
pub use memory::MemoryBlobStore;
pub use migration::{migrate_batch, MigrationReport, MigrationResult, MigrationSummary, PendingFile};

/// Opaque key-value metadata attached to an upload
pub type Metadata = serde_json::Map<String, serde_json::Value>;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Upstream rejected or never answered an upload
    #[error("Storage upload failed: {0}")]
    Upload(String),

    /// Content id unknown to the gateway; carries the upstream status
    #[error("Content {content_id} not found (upstream status {status})")]
    NotFound { content_id: String, status: u16 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result of a single upload. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub content_id: String,
    pub size_bytes: u64,
    pub source_name: String,
    pub access_url: String,
    pub created_at: i64,
    pub metadata: Metadata,
}

/// Header-only view of a stored blob
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BlobInfo {
    pub content_id: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub last_modified: Option<String>,
}

/// One entry of the account file listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub content_id: String,
    pub file_name: String,
    pub size_bytes: u64,
    pub mime_type: Option<String>,
    pub created_at: Option<i64>,
}

/// Account statistics. The zero value doubles as the fail-open fallback.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    pub total_bytes: u64,
    pub data_limit_bytes: u64,
    pub file_count: u64,
    pub files: Vec<UploadedFile>,
}

/// Content-addressed blob store reachable by the gateway
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload the bytes at `source`. Fails closed.
    ///
    /// The file at `source` belongs to the caller, who removes it on every
    /// exit path.
    async fn upload_blob(
        &self,
        source: &Path,
        source_name: &str,
        metadata: Metadata,
    ) -> Result<UploadResult>;

    /// Metadata-only lookup; [`StorageError::NotFound`] when the gateway
    /// does not answer with success.
    async fn get_blob_info(&self, content_id: &str) -> Result<BlobInfo>;

    /// Account usage and file listing. Fails open.
    async fn usage_stats(&self) -> UsageStats;

    /// Whether the store answers at all
    async fn ping(&self) -> bool;

    /// Public URL for a content id
    fn access_url(&self, content_id: &str) -> String;
}

/// Serialize `document` to JSON, stage it in a temporary file and upload it.
///
/// The temporary file is removed before this returns, whether the upload
/// succeeded or not.
pub async fn upload_json<S, T>(store: &S, document: &T, filename: &str) -> Result<UploadResult>
where
    S: BlobStore + ?Sized,
    T: Serialize + ?Sized,
{
    let bytes = serde_json::to_vec_pretty(document)?;

    let mut staged = tempfile::Builder::new()
        .prefix("agrichain-")
        .suffix(".json")
        .tempfile()?;
    staged.write_all(&bytes)?;
    staged.flush()?;

    let mut metadata = Metadata::new();
    metadata.insert("contentType".into(), "application/json".into());
    metadata.insert("filename".into(), filename.into());

    let outcome = store.upload_blob(staged.path(), filename, metadata).await;

    let staged_path = staged.path().to_path_buf();
    if let Err(e) = staged.close() {
        debug!("Failed to remove staged file {}: {}", staged_path.display(), e);
    }

    outcome
}

/// Milliseconds since the Unix epoch
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_upload_json_removes_staged_file_on_success() {
        let store = MemoryBlobStore::new("https://gw.test/ipfs");
        let result = upload_json(&store, &json!({"kind": "farmer"}), "farmer.json")
            .await
            .unwrap();

        assert_eq!(result.source_name, "farmer.json");
        let staged = store.last_source_path().expect("store saw a path");
        assert!(!staged.exists(), "staged file should be gone");
    }

    #[tokio::test]
    async fn test_upload_json_removes_staged_file_on_failure() {
        let store = MemoryBlobStore::new("https://gw.test/ipfs").failing_on(["broken.json"]);
        let err = upload_json(&store, &json!({"kind": "crop"}), "broken.json")
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Upload(_)));
        let staged = store.last_source_path().expect("store saw a path");
        assert!(!staged.exists(), "staged file should be gone after failure");
    }

    #[tokio::test]
    async fn test_identical_documents_share_content_id() {
        let store = MemoryBlobStore::new("https://gw.test/ipfs");
        let doc = json!({"id": "crop_1"});
        let a = upload_json(&store, &doc, "a.json").await.unwrap();
        let b = upload_json(&store, &doc, "b.json").await.unwrap();
        assert_eq!(a.content_id, b.content_id);
        assert_eq!(a.access_url, format!("https://gw.test/ipfs/{}", a.content_id));
    }
}
