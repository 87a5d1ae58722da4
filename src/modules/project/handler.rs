use axum::extract::{Path, State};

use super::service::ProjectService;
use crate::common::response::{ApiResponse, ApiResult, ApiSuccess};
use crate::modules::dubbing::model::DubbingJob;
use crate::state::AppState;

/// List a user's dubbing projects
#[utoipa::path(
    get,
    path = "/projects/{user_id}",
    params(
        ("user_id" = String, Path, description = "Owner id")
    ),
    responses(
        (status = 200, description = "Projects owned by the user", body = ApiResponse<Vec<DubbingJob>>),
        (status = 500, description = "Database error")
    ),
    tag = "Projects"
)]
pub async fn list_projects(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<DubbingJob>> {
    let projects = ProjectService::list_for_owner(state, &user_id).await?;
    Ok(ApiSuccess::ok(projects, "Projects retrieved successfully"))
}
