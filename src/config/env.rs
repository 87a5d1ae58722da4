use std::env;
use std::str::FromStr;

use crate::common::error::AppError;

#[derive(Debug, Clone, Copy)]
pub enum EnvKey {
    ServerPort,
    DatabaseUrl,
    ElevenLabsApiKey,
    ElevenLabsBaseUrl,
    ProviderTimeoutSecs,
    S3Endpoint,
    S3Bucket,
    S3Region,
    S3AccessKey,
    S3SecretKey,
    StoragePublicUrl,
    FfmpegPath,
    ThumbnailsEnabled,
    DownloadRetryAttempts,
    DownloadRetryDelaySecs,
    FinalizeTimeoutSecs,
    MaxUploadMb,
    UploadDir,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerPort => "APP_PORT",
            EnvKey::DatabaseUrl => "DATABASE_URL",
            EnvKey::ElevenLabsApiKey => "ELEVENLABS_API_KEY",
            EnvKey::ElevenLabsBaseUrl => "ELEVENLABS_BASE_URL",
            EnvKey::ProviderTimeoutSecs => "PROVIDER_TIMEOUT_SECS",
            EnvKey::S3Endpoint => "S3_ENDPOINT",
            EnvKey::S3Bucket => "S3_BUCKET",
            EnvKey::S3Region => "S3_REGION",
            EnvKey::S3AccessKey => "AWS_ACCESS_KEY_ID",
            EnvKey::S3SecretKey => "AWS_SECRET_ACCESS_KEY",
            EnvKey::StoragePublicUrl => "STORAGE_PUBLIC_URL",
            EnvKey::FfmpegPath => "FFMPEG_PATH",
            EnvKey::ThumbnailsEnabled => "THUMBNAILS_ENABLED",
            EnvKey::DownloadRetryAttempts => "DOWNLOAD_RETRY_ATTEMPTS",
            EnvKey::DownloadRetryDelaySecs => "DOWNLOAD_RETRY_DELAY_SECS",
            EnvKey::FinalizeTimeoutSecs => "FINALIZE_TIMEOUT_SECS",
            EnvKey::MaxUploadMb => "MAX_UPLOAD_MB",
            EnvKey::UploadDir => "UPLOAD_DIR",
        }
    }
}

/// Required value. Empty strings count as missing.
pub fn get(key: EnvKey) -> Result<String, AppError> {
    match env::var(key.as_str()) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(AppError::Config(format!("{} is not set", key.as_str()))),
    }
}

pub fn get_opt(key: EnvKey) -> Option<String> {
    env::var(key.as_str()).ok().filter(|v| !v.trim().is_empty())
}

pub fn get_or(key: EnvKey, default: &str) -> String {
    get_opt(key).unwrap_or_else(|| default.to_string())
}

/// Unset falls back to `default`; a value that is set but unparsable is an error.
pub fn get_parsed<T: FromStr>(key: EnvKey, default: T) -> Result<T, AppError> {
    match get_opt(key) {
        Some(val) => val.trim().parse::<T>().map_err(|_| {
            AppError::Config(format!("{} has an invalid value: {}", key.as_str(), val))
        }),
        None => Ok(default),
    }
}

pub fn get_flag(key: EnvKey, default: bool) -> Result<bool, AppError> {
    match get_opt(key) {
        Some(val) => parse_flag(&val).ok_or_else(|| {
            AppError::Config(format!("{} must be a boolean, got {}", key.as_str(), val))
        }),
        None => Ok(default),
    }
}

pub(crate) fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
