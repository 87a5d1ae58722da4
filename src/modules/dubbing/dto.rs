use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use super::model::{DubbingJob, JobStatus};
use crate::common::error::{AppError, AppResult};

pub const DEFAULT_SOURCE_LANG: &str = "auto";
pub const DEFAULT_OWNER: &str = "anonymous";

/// Form fields of `POST /dub`, minus the file itself.
#[derive(Debug, Clone, Validate)]
#[validate(schema(function = "validate_time_range"))]
pub struct SubmitDubbingRequest {
    pub user_id: String,
    pub project_name: Option<String>,
    pub source_lang: String,
    #[validate(length(min = 1, message = "target_lang is required"))]
    pub target_lang: String,
    #[validate(range(min = 1, max = 32, message = "num_speakers must be between 1 and 32"))]
    pub num_speakers: Option<u32>,
    pub start_time: Option<u32>,
    pub end_time: Option<u32>,
    pub voice_cloning: bool,
}

impl Default for SubmitDubbingRequest {
    fn default() -> Self {
        Self {
            user_id: DEFAULT_OWNER.to_string(),
            project_name: None,
            source_lang: DEFAULT_SOURCE_LANG.to_string(),
            target_lang: String::new(),
            num_speakers: None,
            start_time: None,
            end_time: None,
            voice_cloning: true,
        }
    }
}

impl SubmitDubbingRequest {
    /// Applies one text form field. Unknown fields are ignored, blank values
    /// leave the default in place.
    pub fn apply_field(&mut self, name: &str, raw: &str) -> AppResult<()> {
        let value = raw.trim();
        if value.is_empty() {
            return Ok(());
        }

        match name {
            "user_id" => self.user_id = value.to_string(),
            "project_name" | "name" => self.project_name = Some(value.to_string()),
            "source_lang" => self.source_lang = value.to_string(),
            // `language` is the field name older clients send.
            "target_lang" | "language" => self.target_lang = value.to_string(),
            "num_speakers" => self.num_speakers = Some(parse_number(name, value)?),
            "start_time" => self.start_time = Some(parse_number(name, value)?),
            "end_time" => self.end_time = Some(parse_number(name, value)?),
            "voice_cloning" => self.voice_cloning = parse_bool(name, value)?,
            "disable_voice_cloning" => self.voice_cloning = !parse_bool(name, value)?,
            _ => {}
        }
        Ok(())
    }
}

fn parse_number(name: &str, value: &str) -> AppResult<u32> {
    value
        .parse::<u32>()
        .map_err(|_| AppError::Validation(format!("{} must be a non-negative integer", name)))
}

fn parse_bool(name: &str, value: &str) -> AppResult<bool> {
    crate::config::env::parse_flag(value)
        .ok_or_else(|| AppError::Validation(format!("{} must be true or false", name)))
}

fn validate_time_range(req: &SubmitDubbingRequest) -> Result<(), ValidationError> {
    match (req.start_time, req.end_time) {
        (Some(start), Some(end)) if start >= end => Err(ValidationError::new("time_range")
            .with_message(Cow::Borrowed("start_time must be before end_time"))),
        _ => Ok(()),
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitDubbingResponse {
    pub dubbing_id: String,
    pub status: JobStatus,
    pub expected_duration_sec: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OutputResponse {
    pub dubbing_id: String,
    pub status: JobStatus,
    pub video_url: Option<String>,
    pub audio_url: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl From<DubbingJob> for OutputResponse {
    fn from(job: DubbingJob) -> Self {
        Self {
            dubbing_id: job.dubbing_id,
            status: job.status,
            video_url: job.video_url,
            audio_url: job.audio_url,
            thumbnail_url: job.thumbnail_url,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OwnerQuery {
    /// Restricts the lookup to jobs owned by this user.
    pub user_id: Option<String>,
}
