use super::{
    now_millis, BlobInfo, BlobStore, Metadata, Result, StorageError, UploadResult, UploadedFile,
    UsageStats,
};
use super::content_id::raw_content_id;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
struct StoredBlob {
    bytes: Vec<u8>,
    file_name: String,
    mime_type: String,
    created_at: i64,
}

/// Which uploads the store refuses
#[derive(Debug, Clone, Default)]
enum Rejection {
    #[default]
    Nothing,
    Named(HashSet<String>),
    Everything,
}

impl Rejection {
    fn rejects(&self, source_name: &str) -> bool {
        match self {
            Rejection::Nothing => false,
            Rejection::Named(names) => names.contains(source_name),
            Rejection::Everything => true,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    blobs: HashMap<String, StoredBlob>,
    last_source: Option<PathBuf>,
}

/// In-process content-addressed store, used for tests and offline runs.
///
/// Content ids are CIDv1 over the raw bytes, so identical payloads always
/// share an id.
#[derive(Debug, Clone)]
pub struct MemoryBlobStore {
    gateway_url: String,
    reject: Arc<Rejection>,
    inner: Arc<Mutex<Inner>>,
}

impl MemoryBlobStore {
    pub fn new(gateway_url: &str) -> Self {
        Self {
            gateway_url: gateway_url.trim_end_matches('/').to_string(),
            reject: Arc::new(Rejection::Nothing),
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Reject uploads whose source name is in `names`
    pub fn failing_on<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reject = Arc::new(Rejection::Named(names.into_iter().map(Into::into).collect()));
        self
    }

    /// Reject every upload, as an unreachable gateway would
    pub fn failing_all(mut self) -> Self {
        self.reject = Arc::new(Rejection::Everything);
        self
    }

    /// Path handed to the most recent upload
    pub fn last_source_path(&self) -> Option<PathBuf> {
        self.lock().last_source.clone()
    }

    /// Raw bytes stored under `content_id`
    pub fn get_bytes(&self, content_id: &str) -> Option<Vec<u8>> {
        self.lock().blobs.get(content_id).map(|b| b.bytes.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload_blob(
        &self,
        source: &Path,
        source_name: &str,
        metadata: Metadata,
    ) -> Result<UploadResult> {
        self.lock().last_source = Some(source.to_path_buf());

        if self.reject.rejects(source_name) {
            return Err(StorageError::Upload(format!(
                "upstream rejected {}",
                source_name
            )));
        }

        let bytes = tokio::fs::read(source).await?;
        let content_id = raw_content_id(&bytes);
        let size_bytes = bytes.len() as u64;
        let created_at = now_millis();
        let mime_type = metadata
            .get("contentType")
            .and_then(|v| v.as_str())
            .unwrap_or("application/octet-stream")
            .to_string();

        self.lock().blobs.insert(
            content_id.clone(),
            StoredBlob {
                bytes,
                file_name: source_name.to_string(),
                mime_type,
                created_at,
            },
        );

        Ok(UploadResult {
            access_url: self.access_url(&content_id),
            content_id,
            size_bytes,
            source_name: source_name.to_string(),
            created_at,
            metadata,
        })
    }

    async fn get_blob_info(&self, content_id: &str) -> Result<BlobInfo> {
        let inner = self.lock();
        let blob = inner.blobs.get(content_id).ok_or_else(|| StorageError::NotFound {
            content_id: content_id.to_string(),
            status: 404,
        })?;

        Ok(BlobInfo {
            content_id: content_id.to_string(),
            size_bytes: blob.bytes.len() as u64,
            mime_type: blob.mime_type.clone(),
            last_modified: chrono::DateTime::from_timestamp_millis(blob.created_at)
                .map(|t| t.to_rfc2822()),
        })
    }

    async fn usage_stats(&self) -> UsageStats {
        let inner = self.lock();
        let mut files: Vec<UploadedFile> = inner
            .blobs
            .iter()
            .map(|(cid, blob)| UploadedFile {
                content_id: cid.clone(),
                file_name: blob.file_name.clone(),
                size_bytes: blob.bytes.len() as u64,
                mime_type: Some(blob.mime_type.clone()),
                created_at: Some(blob.created_at),
            })
            .collect();
        files.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        UsageStats {
            total_bytes: files.iter().map(|f| f.size_bytes).sum(),
            data_limit_bytes: 0,
            file_count: files.len() as u64,
            files,
        }
    }

    async fn ping(&self) -> bool {
        true
    }

    fn access_url(&self, content_id: &str) -> String {
        format!("{}/{}", self.gateway_url, content_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn staged(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file
    }

    #[tokio::test]
    async fn test_upload_then_lookup() {
        let store = MemoryBlobStore::new("https://gw.test/ipfs/");
        let file = staged(b"soil report");
        let result = store
            .upload_blob(file.path(), "report.txt", Metadata::new())
            .await
            .unwrap();

        assert!(result.content_id.starts_with("bafk"));
        assert_eq!(result.size_bytes, 11);
        assert_eq!(store.get_bytes(&result.content_id).unwrap(), b"soil report");

        let info = store.get_blob_info(&result.content_id).await.unwrap();
        assert_eq!(info.size_bytes, 11);
        assert_eq!(info.mime_type, "application/octet-stream");
    }

    #[tokio::test]
    async fn test_unknown_content_is_not_found() {
        let store = MemoryBlobStore::new("https://gw.test/ipfs");
        let err = store.get_blob_info("bafkmissing").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_failing_all_rejects_any_name() {
        let store = MemoryBlobStore::new("https://gw.test/ipfs").failing_all();
        let file = staged(b"anything");
        let err = store
            .upload_blob(file.path(), "prediction_1.json", Metadata::new())
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Upload(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_usage_stats_totals() {
        let store = MemoryBlobStore::new("https://gw.test/ipfs");
        for (name, body) in [("a.txt", &b"aaaa"[..]), ("b.txt", &b"bb"[..])] {
            let file = staged(body);
            store.upload_blob(file.path(), name, Metadata::new()).await.unwrap();
        }

        let stats = store.usage_stats().await;
        assert_eq!(stats.file_count, 2);
        assert_eq!(stats.total_bytes, 6);
    }
}
