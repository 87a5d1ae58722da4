use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tempfile::TempPath;

use crate::common::error::AppResult;

pub mod elevenlabs;

/// Everything the provider needs to start a dubbing job.
#[derive(Debug, Clone)]
pub struct DubbingRequest<'a> {
    pub file_path: &'a Path,
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub name: &'a str,
    pub source_lang: &'a str,
    pub target_lang: &'a str,
    pub num_speakers: Option<u32>,
    pub start_time: Option<u32>,
    pub end_time: Option<u32>,
    pub voice_cloning: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedDubbing {
    pub dubbing_id: String,
    #[serde(default)]
    pub expected_duration_sec: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DubbingMetadata {
    pub dubbing_id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub status: String,
    #[serde(default)]
    pub target_languages: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl DubbingMetadata {
    pub fn phase(&self) -> ProviderStatus {
        ProviderStatus::parse(&self.status)
    }
}

/// How a provider status string is interpreted.
///
/// `dubbed` is the only success value; `failed` and `error` are terminal
/// failures; anything else (`dubbing`, `cloning`, unknown values) is still
/// in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderStatus {
    InProgress,
    Dubbed,
    Failed,
}

impl ProviderStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "dubbed" => ProviderStatus::Dubbed,
            "failed" | "error" => ProviderStatus::Failed,
            _ => ProviderStatus::InProgress,
        }
    }
}

/// A downloaded artifact spooled to local disk, removed on drop.
#[derive(Debug)]
pub struct DubbedFile {
    pub path: TempPath,
    pub content_type: String,
    pub size: u64,
}

impl DubbedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug)]
pub enum FetchOutcome {
    Ready(DubbedFile),
    /// The provider answered 425 or 404: the artifact lags job completion.
    NotReady { status: u16 },
}

#[async_trait]
pub trait DubbingProvider: Send + Sync {
    async fn create_dubbing(&self, request: DubbingRequest<'_>) -> AppResult<CreatedDubbing>;

    async fn get_dubbing(&self, dubbing_id: &str) -> AppResult<DubbingMetadata>;

    /// Streams the dubbed artifact into a temp file under `dir`.
    async fn fetch_dubbed_file(&self, dubbing_id: &str, language_code: &str, dir: &Path) -> AppResult<FetchOutcome>;
}
