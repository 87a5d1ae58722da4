use std::path::Path;

use bytes::Bytes;
use mime::Mime;
use tempfile::TempPath;
use tracing::{error, info, warn};
use validator::Validate;

use super::dto::{OutputResponse, SubmitDubbingRequest, SubmitDubbingResponse};
use super::model::{DubbingJob, JobStatus, NewDubbingJob, StoredArtifacts};
use crate::common::error::{AppError, AppResult};
use crate::common::upload::{suffix_for, TempUpload};
use crate::infrastructure::dubbing::{DubbedFile, DubbingRequest, FetchOutcome, ProviderStatus};
use crate::state::AppState;

pub struct DubbingService;

impl DubbingService {
    /// Forwards an upload to the provider and records the job as `processing`.
    ///
    /// `upload` is consumed here so the spooled file is removed whichever way
    /// this returns.
    pub async fn submit(
        state: AppState,
        req: SubmitDubbingRequest,
        upload: Option<TempUpload>,
    ) -> AppResult<SubmitDubbingResponse> {
        req.validate()?;
        let upload = upload.ok_or_else(|| AppError::Validation("file is required".to_string()))?;

        let project_name = req
            .project_name
            .clone()
            .unwrap_or_else(|| upload.file_name.clone());

        let created = state
            .provider
            .create_dubbing(DubbingRequest {
                file_path: upload.path(),
                file_name: &upload.file_name,
                content_type: &upload.content_type,
                name: &project_name,
                source_lang: &req.source_lang,
                target_lang: &req.target_lang,
                num_speakers: req.num_speakers,
                start_time: req.start_time,
                end_time: req.end_time,
                voice_cloning: req.voice_cloning,
            })
            .await?;

        // Kept for muxing when the provider only returns the dubbed audio.
        let source_ext = match suffix_for(&upload.file_name).trim_start_matches('.') {
            "" => extension_for(&upload.content_type).to_string(),
            ext => ext.to_ascii_lowercase(),
        };
        let source_key = object_key("sources", &req.user_id, &created.dubbing_id, &source_ext);
        if let Err(e) = state
            .storage
            .put_file(&source_key, upload.path(), &upload.content_type)
            .await
        {
            error!(
                "Provider job {} created but its source could not be stored: {}",
                created.dubbing_id, e
            );
            return Err(e);
        }

        let job = state
            .jobs
            .insert(NewDubbingJob {
                dubbing_id: created.dubbing_id,
                user_id: req.user_id,
                project_name,
                source_lang: req.source_lang,
                target_lang: req.target_lang,
                source_key,
            })
            .await?;

        info!(
            "📦 Dubbing job {} submitted for {} ({} -> {})",
            job.dubbing_id, job.user_id, job.source_lang, job.target_lang
        );

        Ok(SubmitDubbingResponse {
            dubbing_id: job.dubbing_id,
            status: job.status,
            expected_duration_sec: created.expected_duration_sec,
        })
    }

    /// Reconciles the stored record with the provider.
    ///
    /// Terminal records are returned as stored without touching the provider.
    pub async fn status(state: AppState, dubbing_id: &str, user_id: Option<&str>) -> AppResult<DubbingJob> {
        let job = Self::find_job(&state, dubbing_id, user_id).await?;
        if job.status.is_terminal() {
            return Ok(job);
        }

        let meta = state.provider.get_dubbing(dubbing_id).await?;
        match meta.phase() {
            ProviderStatus::InProgress => Ok(job),
            ProviderStatus::Failed => Self::fail(&state, job, meta.error.as_deref()).await,
            ProviderStatus::Dubbed => Self::finalize_with_deadline(&state, job).await,
        }
    }

    /// Returns the artifact, fetching it straight away if the job is still open.
    pub async fn output(state: AppState, dubbing_id: &str, user_id: Option<&str>) -> AppResult<OutputResponse> {
        let job = Self::find_job(&state, dubbing_id, user_id).await?;
        match job.status {
            JobStatus::Complete => Ok(job.into()),
            JobStatus::Failed => Err(AppError::JobFailed(job.dubbing_id)),
            JobStatus::Processing => Ok(Self::finalize_with_deadline(&state, job).await?.into()),
        }
    }

    async fn find_job(state: &AppState, dubbing_id: &str, user_id: Option<&str>) -> AppResult<DubbingJob> {
        state
            .jobs
            .find(dubbing_id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Dubbing job {} not found", dubbing_id)))
    }

    async fn fail(state: &AppState, job: DubbingJob, reason: Option<&str>) -> AppResult<DubbingJob> {
        match state.jobs.mark_failed(&job.dubbing_id, reason).await? {
            Some(updated) => {
                warn!(
                    "❌ Dubbing job {} failed: {}",
                    updated.dubbing_id,
                    reason.unwrap_or("no reason given")
                );
                Ok(updated)
            }
            // Another request already closed the job.
            None => Self::find_job(state, &job.dubbing_id, None).await,
        }
    }

    async fn finalize_with_deadline(state: &AppState, job: DubbingJob) -> AppResult<DubbingJob> {
        let deadline = state.job_config.finalize_timeout;
        let dubbing_id = job.dubbing_id.clone();

        tokio::time::timeout(deadline, Self::finalize(state, job))
            .await
            .map_err(|_| {
                AppError::Timeout(format!(
                    "storing output of dubbing job {} took longer than {:?}",
                    dubbing_id, deadline
                ))
            })?
    }

    /// Downloads, stores and records the artifact of a finished provider job.
    /// Returns the record unchanged when the artifact is not available yet.
    async fn finalize(state: &AppState, job: DubbingJob) -> AppResult<DubbingJob> {
        let Some(file) = Self::download_with_retry(state, &job).await? else {
            return Ok(job);
        };

        let artifacts = Self::store_artifacts(state, &job, file).await?;

        match state.jobs.mark_complete(&job.dubbing_id, &artifacts).await? {
            Some(updated) => {
                info!("✅ Dubbing job {} complete: {}", updated.dubbing_id, artifacts.video_url);
                Ok(updated)
            }
            // Another request already closed the job.
            None => Self::find_job(state, &job.dubbing_id, None).await,
        }
    }

    /// Uploads the dubbed video (muxing audio-only output onto the retained
    /// source first) plus its thumbnail.
    async fn store_artifacts(state: &AppState, job: &DubbingJob, file: DubbedFile) -> AppResult<StoredArtifacts> {
        let (video, video_type, audio_url) = if is_video(&file.content_type) {
            (file.path, file.content_type, None)
        } else {
            let audio_key = object_key("audio", &job.user_id, &job.dubbing_id, extension_for(&file.content_type));
            let audio_url = state
                .storage
                .put_file(&audio_key, file.path(), &file.content_type)
                .await?;

            let (muxed, muxed_type) = Self::mux_onto_source(state, job, file.path()).await?;
            (muxed, muxed_type, Some(audio_url))
        };

        let thumbnail = Self::thumbnail(state, &video).await;

        let video_key = object_key("dubbed", &job.user_id, &job.dubbing_id, extension_for(&video_type));
        let video_url = state.storage.put_file(&video_key, &video, &video_type).await?;

        let thumbnail_url = match thumbnail {
            Some(frame) => {
                let key = object_key("thumbnails", &job.user_id, &job.dubbing_id, "jpg");
                match state.storage.put_object(&key, frame, "image/jpeg").await {
                    Ok(url) => Some(url),
                    Err(e) => {
                        warn!("Thumbnail upload for {} failed: {}", job.dubbing_id, e);
                        None
                    }
                }
            }
            None => None,
        };

        Ok(StoredArtifacts {
            video_url,
            audio_url,
            thumbnail_url,
        })
    }

    /// Puts the dubbed soundtrack under the picture of the original upload.
    /// The output keeps the upload's container so the video stream can be copied.
    async fn mux_onto_source(state: &AppState, job: &DubbingJob, audio: &Path) -> AppResult<(TempPath, String)> {
        let source = state.storage.get_file(&job.source_key, &state.upload_dir).await?;

        let video_type = mime_guess::from_path(&job.source_key)
            .first()
            .filter(|m| m.type_() == mime::VIDEO)
            .map(|m| m.essence_str().to_string())
            .unwrap_or_else(|| "video/mp4".to_string());
        let suffix = format!(".{}", extension_for(&video_type));

        let output = tempfile::Builder::new()
            .prefix("muxed-")
            .suffix(&suffix)
            .tempfile_in(&state.upload_dir)?
            .into_temp_path();

        state.media.mux(&source, audio, &output).await?;
        info!("🎬 Muxed dubbed audio of {} onto its source video", job.dubbing_id);

        Ok((output, video_type))
    }

    /// Fixed-count, fixed-delay loop: 404 and 425 mean the file lags the job.
    async fn download_with_retry(state: &AppState, job: &DubbingJob) -> AppResult<Option<DubbedFile>> {
        let attempts = state.job_config.download_attempts.max(1);
        let delay = state.job_config.download_delay;

        for attempt in 1..=attempts {
            match state
                .provider
                .fetch_dubbed_file(&job.dubbing_id, &job.target_lang, &state.upload_dir)
                .await?
            {
                FetchOutcome::Ready(file) => return Ok(Some(file)),
                FetchOutcome::NotReady { status } => {
                    warn!(
                        "Output of {} not ready (HTTP {}), attempt {}/{}",
                        job.dubbing_id, status, attempt, attempts
                    );
                    if attempt < attempts {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        info!(
            "Output of {} still unavailable after {} attempts; leaving it processing",
            job.dubbing_id, attempts
        );
        Ok(None)
    }

    /// Best effort: any failure is logged and the job completes without one.
    async fn thumbnail(state: &AppState, video: &Path) -> Option<Bytes> {
        if !state.thumbnails_enabled {
            return None;
        }

        match state.media.thumbnail(video).await {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!("Thumbnail extraction failed: {}", e);
                None
            }
        }
    }
}

fn essence(content_type: &str) -> Option<String> {
    content_type
        .parse::<Mime>()
        .ok()
        .map(|m| m.essence_str().to_ascii_lowercase())
}

fn is_video(content_type: &str) -> bool {
    content_type
        .parse::<Mime>()
        .map(|m| m.type_() == mime::VIDEO)
        .unwrap_or(false)
}

fn extension_for(content_type: &str) -> &'static str {
    let Some(essence) = essence(content_type) else {
        return "mp4";
    };
    match essence.as_str() {
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        "audio/mpeg" => "mp3",
        "audio/mp4" => "m4a",
        "audio/aac" => "aac",
        "audio/wav" | "audio/x-wav" => "wav",
        other => mime_guess::get_mime_extensions_str(other)
            .and_then(|exts| exts.first().copied())
            .unwrap_or("bin"),
    }
}

/// `{prefix}/{owner}/{dubbing_id}.{ext}` with path-hostile characters replaced.
fn object_key(prefix: &str, user_id: &str, dubbing_id: &str, ext: &str) -> String {
    format!("{}/{}/{}.{}", prefix, key_segment(user_id), key_segment(dubbing_id), ext)
}

fn key_segment(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
