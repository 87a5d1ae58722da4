use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::common::error::AppError;
use crate::config::env::{self, EnvKey};

const DEFAULT_PROVIDER_URL: &str = "https://api.elevenlabs.io";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_port: u16,
    pub database_url: String,
    pub provider: ProviderConfig,
    pub storage: StorageConfig,
    pub media: MediaConfig,
    pub jobs: JobConfig,
    pub max_upload_bytes: usize,
    pub upload_dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct ProviderConfig {
    pub api_key: String,
    pub base_url: Url,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    pub public_url: Option<Url>,
}

#[derive(Clone, Debug)]
pub struct MediaConfig {
    pub ffmpeg_path: String,
    pub thumbnails_enabled: bool,
}

/// Bounds for turning a finished provider job into a stored artifact.
#[derive(Clone, Debug)]
pub struct JobConfig {
    pub download_attempts: u32,
    pub download_delay: Duration,
    pub finalize_timeout: Duration,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            download_attempts: 5,
            download_delay: Duration::from_secs(3),
            finalize_timeout: Duration::from_secs(300),
        }
    }
}

impl AppConfig {
    pub fn new() -> Result<Self, AppError> {
        let base_url = env::get_or(EnvKey::ElevenLabsBaseUrl, DEFAULT_PROVIDER_URL);
        let public_url = env::get_opt(EnvKey::StoragePublicUrl)
            .map(|raw| parse_url(EnvKey::StoragePublicUrl, &raw))
            .transpose()?;

        let download_attempts: u32 = env::get_parsed(EnvKey::DownloadRetryAttempts, 5)?;
        if download_attempts == 0 {
            return Err(AppError::Config(format!(
                "{} must be at least 1",
                EnvKey::DownloadRetryAttempts.as_str()
            )));
        }

        let max_upload_mb: usize = env::get_parsed(EnvKey::MaxUploadMb, 500)?;

        Ok(Self {
            server_port: env::get_parsed(EnvKey::ServerPort, 3000)?,
            database_url: env::get(EnvKey::DatabaseUrl)?,
            provider: ProviderConfig {
                api_key: env::get(EnvKey::ElevenLabsApiKey)?,
                base_url: parse_url(EnvKey::ElevenLabsBaseUrl, &base_url)?,
                timeout: Duration::from_secs(env::get_parsed(EnvKey::ProviderTimeoutSecs, 120)?),
            },
            storage: StorageConfig {
                endpoint: env::get(EnvKey::S3Endpoint)?,
                bucket: env::get(EnvKey::S3Bucket)?,
                region: env::get_or(EnvKey::S3Region, "us-east-1"),
                access_key: env::get(EnvKey::S3AccessKey)?,
                secret_key: env::get(EnvKey::S3SecretKey)?,
                public_url,
            },
            media: MediaConfig {
                ffmpeg_path: env::get_or(EnvKey::FfmpegPath, "ffmpeg"),
                thumbnails_enabled: env::get_flag(EnvKey::ThumbnailsEnabled, true)?,
            },
            jobs: JobConfig {
                download_attempts,
                download_delay: Duration::from_secs(env::get_parsed(EnvKey::DownloadRetryDelaySecs, 3)?),
                finalize_timeout: Duration::from_secs(env::get_parsed(EnvKey::FinalizeTimeoutSecs, 300)?),
            },
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            upload_dir: env::get_opt(EnvKey::UploadDir)
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
        })
    }
}

fn parse_url(key: EnvKey, raw: &str) -> Result<Url, AppError> {
    Url::parse(raw.trim())
        .map_err(|e| AppError::Config(format!("{} is not a valid URL ({}): {}", key.as_str(), raw, e)))
}
