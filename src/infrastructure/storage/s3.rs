use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::config::Builder;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::{config::BehaviorVersion, config::Credentials, config::Region, Client};
use bytes::Bytes;
use tempfile::TempPath;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use super::ObjectStore;
use crate::common::error::{AppError, AppResult};
use crate::common::upload::suffix_for;
use crate::config::settings::StorageConfig;

/// Files above this size go up as a multipart upload, one part per chunk.
/// S3 rejects parts smaller than 5 MiB except the last.
const PART_SIZE: usize = 8 * 1024 * 1024;

#[derive(Clone)]
pub struct StorageService {
    pub client: Client,
    pub bucket: String,
    public_base: String,
}

impl StorageService {
    pub fn new(config: &StorageConfig) -> Self {
        let credentials = Credentials::new(&config.access_key, &config.secret_key, None, None, "static");

        let s3_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint)
            .credentials_provider(credentials)
            .force_path_style(true) // Required for MinIO and most S3-compatible hosts
            .build();

        let client = Client::from_conf(s3_config);

        info!("✅ Object storage configured (bucket {})", config.bucket);

        Self {
            client,
            bucket: config.bucket.clone(),
            public_base: public_base(config),
        }
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base, key.trim_start_matches('/'))
    }

    async fn create_multipart_upload(&self, key: &str, content_type: &str) -> AppResult<String> {
        let result = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to start upload of {}: {}", key, e)))?;

        result
            .upload_id
            .ok_or_else(|| AppError::Storage(format!("No upload id returned for {}", key)))
    }

    async fn upload_part(&self, key: &str, upload_id: &str, part_number: i32, body: Bytes) -> AppResult<CompletedPart> {
        let result = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to upload part {} of {}: {}", part_number, key, e)))?;

        Ok(CompletedPart::builder()
            .set_e_tag(result.e_tag)
            .part_number(part_number)
            .build())
    }

    async fn complete_multipart_upload(&self, key: &str, upload_id: &str, parts: Vec<CompletedPart>) -> AppResult<()> {
        let completed = CompletedMultipartUpload::builder().set_parts(Some(parts)).build();

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(completed)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to complete upload of {}: {}", key, e)))?;

        Ok(())
    }

    async fn abort_multipart_upload(&self, key: &str, upload_id: &str) {
        if let Err(e) = self
            .client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
        {
            warn!("Failed to abort upload of {}: {}", key, e);
        }
    }

    /// Reads `path` in `PART_SIZE` chunks; only one chunk is held in memory.
    async fn upload_parts(&self, key: &str, upload_id: &str, path: &Path) -> AppResult<Vec<CompletedPart>> {
        let mut file = tokio::fs::File::open(path).await?;
        let mut parts = Vec::new();
        let mut part_number = 1;

        loop {
            let chunk = read_chunk(&mut file, PART_SIZE).await?;
            if chunk.is_empty() {
                break;
            }
            parts.push(self.upload_part(key, upload_id, part_number, chunk).await?);
            part_number += 1;
        }

        Ok(parts)
    }
}

/// Fills up to `limit` bytes; shorter only at end of file.
async fn read_chunk(file: &mut tokio::fs::File, limit: usize) -> AppResult<Bytes> {
    let mut buf = Vec::with_capacity(limit);
    let mut reader = file.take(limit as u64);
    reader.read_to_end(&mut buf).await?;
    Ok(Bytes::from(buf))
}

/// Base that object keys are appended to when building public URLs.
fn public_base(config: &StorageConfig) -> String {
    match &config.public_url {
        Some(url) => url.as_str().trim_end_matches('/').to_string(),
        None => format!("{}/{}", config.endpoint.trim_end_matches('/'), config.bucket),
    }
}

#[async_trait]
impl ObjectStore for StorageService {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> AppResult<String> {
        let size = body.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to upload {}: {}", key, e)))?;

        debug!("Uploaded {} ({} bytes) to bucket {}", key, size, self.bucket);
        Ok(self.public_url(key))
    }

    async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> AppResult<String> {
        let size = tokio::fs::metadata(path).await?.len();

        if size <= PART_SIZE as u64 {
            let body = ByteStream::from_path(path)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to read {}: {}", path.display(), e)))?;

            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .body(body)
                .content_type(content_type)
                .send()
                .await
                .map_err(|e| AppError::Storage(format!("Failed to upload {}: {}", key, e)))?;
        } else {
            let upload_id = self.create_multipart_upload(key, content_type).await?;

            let parts = match self.upload_parts(key, &upload_id, path).await {
                Ok(parts) => parts,
                Err(e) => {
                    self.abort_multipart_upload(key, &upload_id).await;
                    return Err(e);
                }
            };
            let count = parts.len();

            if let Err(e) = self.complete_multipart_upload(key, &upload_id, parts).await {
                self.abort_multipart_upload(key, &upload_id).await;
                return Err(e);
            }
            debug!("Multipart upload of {} finished in {} parts", key, count);
        }

        info!("⬆️ Uploaded {} ({} bytes) to bucket {}", key, size, self.bucket);
        Ok(self.public_url(key))
    }

    async fn get_file(&self, key: &str, dir: &Path) -> AppResult<TempPath> {
        let mut body = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to download {}: {}", key, e)))?
            .body;

        let named = tempfile::Builder::new()
            .prefix("dub-source-")
            .suffix(&suffix_for(key))
            .tempfile_in(dir)?;
        let (std_file, path) = named.into_parts();
        let mut file = tokio::fs::File::from_std(std_file);

        let mut size: u64 = 0;
        while let Some(chunk) = body
            .try_next()
            .await
            .map_err(|e| AppError::Storage(format!("Download of {} interrupted: {}", key, e)))?
        {
            file.write_all(&chunk).await?;
            size += chunk.len() as u64;
        }
        file.flush().await?;

        debug!("⬇️ Downloaded {} ({} bytes) from bucket {}", key, size, self.bucket);
        Ok(path)
    }
}
