use crate::common::error::AppResult;
use crate::modules::dubbing::model::DubbingJob;
use crate::state::AppState;

pub struct ProjectService;

impl ProjectService {
    /// Every job owned by `user_id`, newest first. Unknown owners get an empty list.
    pub async fn list_for_owner(state: AppState, user_id: &str) -> AppResult<Vec<DubbingJob>> {
        state.jobs.list_by_owner(user_id).await
    }
}
