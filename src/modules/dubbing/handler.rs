use axum::extract::{Multipart, Path, Query, State};
use tracing::info;

use super::dto::{OutputResponse, OwnerQuery, SubmitDubbingRequest, SubmitDubbingResponse};
use super::model::DubbingJob;
use super::service::DubbingService;
use crate::common::error::{AppError, AppResult};
use crate::common::response::{ApiResponse, ApiResult, ApiSuccess};
use crate::common::upload::{spool_to_temp, TempUpload};
use crate::state::AppState;

/// Submit a dubbing job
///
/// Multipart form: `file` plus `user_id`, `project_name`, `source_lang`,
/// `target_lang`, `num_speakers`, `start_time`, `end_time`, `voice_cloning`.
#[utoipa::path(
    post,
    path = "/dub",
    request_body(content = String, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Job submitted", body = ApiResponse<SubmitDubbingResponse>),
        (status = 400, description = "Missing file or target language"),
        (status = 500, description = "Provider or database error")
    ),
    tag = "Dubbing"
)]
pub async fn submit_dubbing(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<SubmitDubbingResponse> {
    let (req, upload) = read_submission(&state, multipart).await?;

    if let Some(upload) = &upload {
        info!("Received {} ({} bytes) for dubbing", upload.file_name, upload.size);
    }

    let res = DubbingService::submit(state, req, upload).await?;
    Ok(ApiSuccess::created(res, "Dubbing job submitted"))
}

async fn read_submission(
    state: &AppState,
    mut multipart: Multipart,
) -> AppResult<(SubmitDubbingRequest, Option<TempUpload>)> {
    let mut req = SubmitDubbingRequest::default();
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == "file" {
            upload = Some(spool_to_temp(field, &state.upload_dir).await?);
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::Validation(format!("Unreadable field {}: {}", name, e)))?;
            req.apply_field(&name, &value)?;
        }
    }

    Ok((req, upload))
}

/// Poll a dubbing job
#[utoipa::path(
    get,
    path = "/status/{dubbing_id}",
    params(
        ("dubbing_id" = String, Path, description = "Job id assigned by the provider"),
        OwnerQuery
    ),
    responses(
        (status = 200, description = "Current job record", body = ApiResponse<DubbingJob>),
        (status = 404, description = "Unknown job"),
        (status = 500, description = "Provider or storage error")
    ),
    tag = "Dubbing"
)]
pub async fn get_status(
    State(state): State<AppState>,
    Path(dubbing_id): Path<String>,
    Query(query): Query<OwnerQuery>,
) -> ApiResult<DubbingJob> {
    let job = DubbingService::status(state, &dubbing_id, query.user_id.as_deref()).await?;
    let message = format!("Job is {}", job.status);
    Ok(ApiSuccess::ok(job, &message))
}

/// Fetch the dubbed output
///
/// Downloads and stores the artifact if that has not happened yet.
#[utoipa::path(
    get,
    path = "/output/{dubbing_id}",
    params(
        ("dubbing_id" = String, Path, description = "Job id assigned by the provider"),
        OwnerQuery
    ),
    responses(
        (status = 200, description = "Artifact URL, or processing", body = ApiResponse<OutputResponse>),
        (status = 404, description = "Unknown job"),
        (status = 409, description = "Job failed"),
        (status = 500, description = "Provider or storage error")
    ),
    tag = "Dubbing"
)]
pub async fn get_output(
    State(state): State<AppState>,
    Path(dubbing_id): Path<String>,
    Query(query): Query<OwnerQuery>,
) -> ApiResult<OutputResponse> {
    let output = DubbingService::output(state, &dubbing_id, query.user_id.as_deref()).await?;
    let message = match output.video_url {
        Some(_) => "Output ready",
        None => "Output not ready yet",
    };
    Ok(ApiSuccess::ok(output, message))
}
