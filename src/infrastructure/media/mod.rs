use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;

use crate::common::error::AppResult;

pub mod ffmpeg;

#[async_trait]
pub trait MediaProcessor: Send + Sync {
    /// Derives a still frame (JPEG) from a video file.
    async fn thumbnail(&self, video: &Path) -> AppResult<Bytes>;

    /// Writes `video`'s picture with `audio` as its only soundtrack to `output`.
    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> AppResult<()>;
}
