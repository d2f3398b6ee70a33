use crate::api::errors::{ApiError, ApiResponse, ApiResult};
use crate::api::validation::{
    optional_wallet_address, parse_tags, validate_content_id, validate_migration_count,
};
use crate::api::AppState;
use crate::storage::migration::MAX_MIGRATION_FILES;
use crate::storage::{
    migrate_batch, now_millis, BlobInfo, Metadata, MigrationReport, PendingFile, UsageStats,
};
use axum::extract::{multipart::MultipartRejection, Multipart, Path, State};
use axum::Json;
use log::{debug, info};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

const DEFAULT_DATA_TYPE: &str = "general";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub cid: String,
    /// Hex SHA-256 of the bytes received
    pub hash: String,
    pub size: u64,
    pub url: String,
    pub metadata: Metadata,
}

/// File part streamed to disk while the request is read
struct StagedUpload {
    file: NamedTempFile,
    file_name: String,
    content_type: String,
    size: u64,
    sha256: String,
}

/// Single file upload. The staged copy on disk is removed on every path.
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<ApiResponse<UploadResponse>>> {
    let mut multipart = multipart?;

    let mut staged: Option<StagedUpload> = None;
    let mut wallet_address = None;
    let mut data_type = None;
    let mut description = None;
    let mut tags = Vec::new();

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| format!("upload_{}", now_millis()));
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();

                let file = tempfile::Builder::new().prefix("agrichain-upload-").tempfile()?;
                let mut writer = tokio::fs::File::from_std(file.reopen()?);
                let mut hasher = Sha256::new();
                let mut size = 0u64;
                while let Some(chunk) = field.chunk().await? {
                    writer.write_all(&chunk).await?;
                    hasher.update(&chunk);
                    size += chunk.len() as u64;
                }
                writer.flush().await?;

                staged = Some(StagedUpload {
                    file,
                    file_name,
                    content_type,
                    size,
                    sha256: hex::encode(hasher.finalize()),
                });
            }
            "walletAddress" => wallet_address = Some(field.text().await?),
            "dataType" => data_type = Some(field.text().await?),
            "description" => description = Some(field.text().await?),
            "tags" => tags = parse_tags(&field.text().await?),
            other => debug!("Ignoring multipart field {:?}", other),
        }
    }

    let staged = staged.ok_or_else(|| ApiError::bad_request("No file uploaded"))?;
    if staged.size == 0 {
        return Err(ApiError::bad_request("Uploaded file is empty"));
    }
    let wallet_address = optional_wallet_address(wallet_address.as_deref())?;

    let mut metadata = Metadata::new();
    metadata.insert("originalName".into(), staged.file_name.clone().into());
    metadata.insert("contentType".into(), staged.content_type.clone().into());
    metadata.insert("size".into(), staged.size.into());
    metadata.insert("sha256".into(), staged.sha256.clone().into());
    metadata.insert(
        "dataType".into(),
        data_type
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| DEFAULT_DATA_TYPE.to_string())
            .into(),
    );
    if let Some(description) = description.filter(|d| !d.trim().is_empty()) {
        metadata.insert("description".into(), description.into());
    }
    metadata.insert("tags".into(), tags.into());
    if let Some(address) = wallet_address {
        metadata.insert("walletAddress".into(), address.into());
    }
    metadata.insert("uploadedAt".into(), now_millis().into());

    let outcome = state
        .store
        .upload_blob(staged.file.path(), &staged.file_name, metadata)
        .await;

    let staged_path = staged.file.path().to_path_buf();
    if let Err(e) = staged.file.close() {
        debug!("Failed to remove staged upload {}: {}", staged_path.display(), e);
    }

    let uploaded = outcome?;
    info!(
        "Uploaded {} ({} bytes) as {}",
        uploaded.source_name, uploaded.size_bytes, uploaded.content_id
    );

    Ok(ApiResponse::ok(UploadResponse {
        hash: staged.sha256,
        cid: uploaded.content_id,
        size: uploaded.size_bytes,
        url: uploaded.access_url,
        metadata: uploaded.metadata,
    }))
}

/// Bulk upload of up to [`MAX_MIGRATION_FILES`] files. The batch is
/// rejected as a whole before any upload when it is too large.
pub async fn migrate_bulk(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<ApiResponse<MigrationReport>>> {
    let mut multipart = multipart?;

    let mut files = Vec::new();
    let mut wallet_address = None;
    let mut data_type = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "files" | "file" => {
                validate_migration_count(files.len() + 1)?;
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| format!("file_{}", files.len() + 1));
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                files.push(PendingFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            "walletAddress" => wallet_address = Some(field.text().await?),
            "dataType" => data_type = Some(field.text().await?),
            other => debug!("Ignoring multipart field {:?}", other),
        }
    }

    validate_migration_count(files.len())?;
    let wallet_address = optional_wallet_address(wallet_address.as_deref())?;

    let mut shared = Metadata::new();
    shared.insert("migratedAt".into(), now_millis().into());
    if let Some(data_type) = data_type.filter(|d| !d.trim().is_empty()) {
        shared.insert("dataType".into(), data_type.trim().into());
    }
    if let Some(address) = wallet_address {
        shared.insert("walletAddress".into(), address.into());
    }

    let report = migrate_batch(state.store.as_ref(), files, &shared).await;
    info!(
        "Bulk migration finished: {}/{} succeeded (limit {})",
        report.summary.successful, report.summary.total, MAX_MIGRATION_FILES
    );

    Ok(ApiResponse::ok(report))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveResponse {
    pub content_id: String,
    pub url: String,
    pub info: BlobInfo,
}

pub async fn retrieve(
    State(state): State<AppState>,
    Path(content_id): Path<String>,
) -> ApiResult<Json<ApiResponse<RetrieveResponse>>> {
    validate_content_id(&content_id)?;

    let info = state.store.get_blob_info(&content_id).await?;
    Ok(ApiResponse::ok(RetrieveResponse {
        url: state.store.access_url(&content_id),
        content_id,
        info,
    }))
}

/// Fails open: an unreachable account API yields zeroed statistics
pub async fn lighthouse_stats(State(state): State<AppState>) -> Json<ApiResponse<UsageStats>> {
    ApiResponse::ok(state.store.usage_stats().await)
}
