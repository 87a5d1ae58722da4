use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::TempPath;

use crate::common::error::AppResult;

pub mod s3;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores a small in-memory object under `key` and returns its public URL.
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> AppResult<String>;

    /// Streams a file on disk to `key` and returns its public URL.
    async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> AppResult<String>;

    /// Downloads `key` into a fresh temp file under `dir`.
    async fn get_file(&self, key: &str, dir: &Path) -> AppResult<TempPath>;
}
