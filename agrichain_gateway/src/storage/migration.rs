//! Bulk migration of many files into the blob store.
//!
//! Every file gets its own result; one failure never stops the batch.

use super::{BlobStore, Metadata};
use log::{info, warn};
use serde::Serialize;
use std::io::Write;

/// Upper bound on files accepted by a single migration request
pub const MAX_MIGRATION_FILES: usize = 20;

/// A file received from the caller, not yet uploaded
#[derive(Debug, Clone)]
pub struct PendingFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationResult {
    pub file_name: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct MigrationSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub results: Vec<MigrationResult>,
    pub summary: MigrationSummary,
}

/// Upload `files` one after another, collecting a result per file.
///
/// `shared` metadata is attached to every upload alongside the per-file
/// content type.
pub async fn migrate_batch<S>(store: &S, files: Vec<PendingFile>, shared: &Metadata) -> MigrationReport
where
    S: BlobStore + ?Sized,
{
    let mut results = Vec::with_capacity(files.len());

    for file in files {
        let result = migrate_one(store, &file, shared).await;
        match &result.error {
            None => info!("Migrated {} -> {:?}", result.file_name, result.cid),
            Some(e) => warn!("Migration of {} failed: {}", result.file_name, e),
        }
        results.push(result);
    }

    let successful = results.iter().filter(|r| r.success).count();
    let summary = MigrationSummary {
        total: results.len(),
        successful,
        failed: results.len() - successful,
    };

    MigrationReport { results, summary }
}

async fn migrate_one<S>(store: &S, file: &PendingFile, shared: &Metadata) -> MigrationResult
where
    S: BlobStore + ?Sized,
{
    let failed = |error: String| MigrationResult {
        file_name: file.file_name.clone(),
        success: false,
        cid: None,
        size: None,
        url: None,
        error: Some(error),
    };

    // Dropping `staged` removes the file, on every path out of here.
    let mut staged = match tempfile::NamedTempFile::new() {
        Ok(f) => f,
        Err(e) => return failed(e.to_string()),
    };
    if let Err(e) = staged.write_all(&file.bytes).and_then(|_| staged.flush()) {
        return failed(e.to_string());
    }

    let mut metadata = shared.clone();
    metadata.insert("migrated".into(), true.into());
    if let Some(content_type) = &file.content_type {
        metadata.insert("contentType".into(), content_type.clone().into());
    }

    match store.upload_blob(staged.path(), &file.file_name, metadata).await {
        Ok(uploaded) => MigrationResult {
            file_name: file.file_name.clone(),
            success: true,
            cid: Some(uploaded.content_id),
            size: Some(uploaded.size_bytes),
            url: Some(uploaded.access_url),
            error: None,
        },
        Err(e) => failed(e.to_string()),
    }
}
