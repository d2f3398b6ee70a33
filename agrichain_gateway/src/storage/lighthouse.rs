//! Lighthouse storage gateway client
//!
//! Uploads go to the node's add-endpoint as multipart with a bearer
//! credential. Blob lookups are `HEAD` requests against the public gateway,
//! and account statistics come from the account API.

use super::{
    now_millis, BlobInfo, BlobStore, Metadata, Result, StorageError, UploadResult, UploadedFile,
    UsageStats,
};
use crate::config::StorageConfig;
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, LAST_MODIFIED};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use serde_json::Value;
use std::path::Path;
use tokio_util::io::ReaderStream;

/// HTTP client for the Lighthouse storage network
#[derive(Debug, Clone)]
pub struct LighthouseStorage {
    client: Client,
    config: StorageConfig,
}

impl LighthouseStorage {
    pub fn new(config: StorageConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {e}"))?;

        Ok(Self { client, config })
    }

    async fn fetch_usage(&self) -> std::result::Result<(u64, u64), reqwest::Error> {
        let body: Value = self
            .client
            .get(format!("{}/api/user/user_data_usage", self.api_base()))
            .bearer_auth(&self.config.api_key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let data = body.get("data").unwrap_or(&body);
        Ok((
            number_field(data, "dataUsed"),
            number_field(data, "dataLimit"),
        ))
    }

    async fn fetch_files(&self) -> std::result::Result<(u64, Vec<UploadedFile>), reqwest::Error> {
        let body: Value = self
            .client
            .get(format!("{}/api/user/files_uploaded", self.api_base()))
            .query(&[("lastKey", "null")])
            .bearer_auth(&self.config.api_key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let data = body.get("data").unwrap_or(&body);
        let files: Vec<UploadedFile> = data
            .get("fileList")
            .and_then(Value::as_array)
            .map(|list| list.iter().filter_map(parse_listed_file).collect())
            .unwrap_or_default();
        let total = data
            .get("totalFiles")
            .and_then(Value::as_u64)
            .unwrap_or(files.len() as u64);

        Ok((total, files))
    }

    fn api_base(&self) -> &str {
        self.config.api_url.trim_end_matches('/')
    }
}

#[async_trait]
impl BlobStore for LighthouseStorage {
    async fn upload_blob(
        &self,
        source: &Path,
        source_name: &str,
        metadata: Metadata,
    ) -> Result<UploadResult> {
        let file = tokio::fs::File::open(source).await?;
        let length = file.metadata().await?.len();

        let part = Part::stream_with_length(Body::wrap_stream(ReaderStream::new(file)), length)
            .file_name(source_name.to_string());
        let form = Form::new().part("file", part);

        debug!("Uploading {} ({} bytes) to {}", source_name, length, self.config.upload_url);

        let response = self
            .client
            .post(&self.config.upload_url)
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| StorageError::Upload(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StorageError::Upload(e.to_string()))?;

        if !status.is_success() {
            return Err(StorageError::Upload(format!("{}: {}", status, body.trim())));
        }

        let (content_id, reported_size) = parse_add_response(&body)?;
        let size_bytes = reported_size.unwrap_or(length);

        info!("Uploaded {} as {} ({} bytes)", source_name, content_id, size_bytes);

        Ok(UploadResult {
            access_url: self.access_url(&content_id),
            content_id,
            size_bytes,
            source_name: source_name.to_string(),
            created_at: now_millis(),
            metadata,
        })
    }

    async fn get_blob_info(&self, content_id: &str) -> Result<BlobInfo> {
        let url = self.access_url(content_id);
        let response = self.client.head(&url).send().await.map_err(|e| {
            warn!("Blob lookup for {} failed: {}", content_id, e);
            StorageError::NotFound {
                content_id: content_id.to_string(),
                status: e.status().map(|s| s.as_u16()).unwrap_or(502),
            }
        })?;

        if !response.status().is_success() {
            return Err(StorageError::NotFound {
                content_id: content_id.to_string(),
                status: response.status().as_u16(),
            });
        }

        let headers = response.headers();
        let header_str = |name| headers.get(name).and_then(|v| v.to_str().ok());

        Ok(BlobInfo {
            content_id: content_id.to_string(),
            size_bytes: header_str(CONTENT_LENGTH)
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            mime_type: header_str(CONTENT_TYPE)
                .unwrap_or("application/octet-stream")
                .to_string(),
            last_modified: header_str(LAST_MODIFIED).map(str::to_string),
        })
    }

    async fn usage_stats(&self) -> UsageStats {
        let (total_bytes, data_limit_bytes) = match self.fetch_usage().await {
            Ok(usage) => usage,
            Err(e) => {
                warn!("Storage usage unavailable, reporting zero: {}", e);
                return UsageStats::default();
            }
        };

        let (file_count, files) = match self.fetch_files().await {
            Ok(listing) => listing,
            Err(e) => {
                warn!("Storage file listing unavailable, reporting zero: {}", e);
                return UsageStats::default();
            }
        };

        UsageStats {
            total_bytes,
            data_limit_bytes,
            file_count,
            files,
        }
    }

    async fn ping(&self) -> bool {
        match self.client.head(self.api_base()).send().await {
            Ok(_) => true,
            Err(e) => {
                debug!("Storage ping failed: {}", e);
                false
            }
        }
    }

    fn access_url(&self, content_id: &str) -> String {
        self.config.access_url(content_id)
    }
}

/// Pull `(Hash, Size)` out of an add-endpoint reply.
///
/// `Size` arrives as a decimal string from some nodes and as a number from
/// others.
fn parse_add_response(body: &str) -> Result<(String, Option<u64>)> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| StorageError::Upload(format!("unreadable upload response: {}", e)))?;
    let data = value.get("data").unwrap_or(&value);

    let content_id = data
        .get("Hash")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| StorageError::Upload("upload response carried no content id".into()))?
        .to_string();

    let size = data.get("Size").and_then(|s| match s {
        Value::String(text) => text.parse().ok(),
        other => other.as_u64(),
    });

    Ok((content_id, size))
}

fn number_field(value: &Value, key: &str) -> u64 {
    match value.get(key) {
        Some(Value::String(text)) => text.parse().unwrap_or(0),
        Some(other) => other.as_u64().unwrap_or(0),
        None => 0,
    }
}

fn parse_listed_file(entry: &Value) -> Option<UploadedFile> {
    let content_id = entry.get("cid").and_then(Value::as_str)?.to_string();
    Some(UploadedFile {
        file_name: entry
            .get("fileName")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        size_bytes: number_field(entry, "fileSizeInBytes"),
        mime_type: entry.get("mimeType").and_then(Value::as_str).map(str::to_string),
        created_at: entry.get("createdAt").and_then(Value::as_i64),
        content_id,
    })
}
