use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use time::OffsetDateTime;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Complete,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Complete => "complete",
            JobStatus::Failed => "failed",
        }
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Processing)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown job status: {0}")]
pub struct UnknownStatus(pub String);

impl TryFrom<String> for JobStatus {
    type Error = UnknownStatus;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "processing" => Ok(JobStatus::Processing),
            "complete" => Ok(JobStatus::Complete),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(UnknownStatus(s)),
        }
    }
}

/// One row of the `projects` table.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq, ToSchema)]
pub struct DubbingJob {
    pub dubbing_id: String,
    pub user_id: String,
    pub project_name: String,
    pub source_lang: String,
    pub target_lang: String,
    #[sqlx(try_from = "String")]
    pub status: JobStatus,
    /// Object key of the retained upload, muxed with audio-only results.
    #[serde(skip)]
    pub source_key: String,
    /// Always a video: the provider's own video output, or the dubbed audio
    /// muxed onto the upload.
    pub video_url: Option<String>,
    /// The dubbed soundtrack, when the provider returned audio only.
    pub audio_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub error: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: OffsetDateTime,
}

/// Values needed to insert a freshly submitted job.
#[derive(Debug, Clone)]
pub struct NewDubbingJob {
    pub dubbing_id: String,
    pub user_id: String,
    pub project_name: String,
    pub source_lang: String,
    pub target_lang: String,
    pub source_key: String,
}

/// Public URLs recorded when a job completes.
#[derive(Debug, Clone)]
pub struct StoredArtifacts {
    pub video_url: String,
    pub audio_url: Option<String>,
    pub thumbnail_url: Option<String>,
}
