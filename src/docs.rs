use utoipa::OpenApi;

use crate::modules::dubbing::dto::{OutputResponse, SubmitDubbingResponse};
use crate::modules::dubbing::model::{DubbingJob, JobStatus};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::dubbing::handler::submit_dubbing,
        crate::modules::dubbing::handler::get_status,
        crate::modules::dubbing::handler::get_output,
        crate::modules::project::handler::list_projects,
    ),
    components(
        schemas(
            DubbingJob,
            JobStatus,
            SubmitDubbingResponse,
            OutputResponse,
        )
    ),
    tags(
        (name = "Dubbing", description = "Submit and poll dubbing jobs"),
        (name = "Projects", description = "Per-user job history")
    )
)]
pub struct ApiDoc;
