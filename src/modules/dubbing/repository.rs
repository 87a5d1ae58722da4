use async_trait::async_trait;
use sqlx::PgPool;

use super::model::{DubbingJob, JobStatus, NewDubbingJob, StoredArtifacts};
use crate::common::error::AppResult;

/// Row store for dubbing jobs.
///
/// Transitions only ever move a row out of `processing`; a call against a row
/// that is already terminal (or missing) returns `None` and changes nothing.
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn insert(&self, job: NewDubbingJob) -> AppResult<DubbingJob>;

    /// Looks a job up by id, optionally scoped to its owner.
    async fn find(&self, dubbing_id: &str, user_id: Option<&str>) -> AppResult<Option<DubbingJob>>;

    async fn mark_complete(&self, dubbing_id: &str, artifacts: &StoredArtifacts) -> AppResult<Option<DubbingJob>>;

    async fn mark_failed(&self, dubbing_id: &str, reason: Option<&str>) -> AppResult<Option<DubbingJob>>;

    async fn list_by_owner(&self, user_id: &str) -> AppResult<Vec<DubbingJob>>;
}

const COLUMNS: &str = "dubbing_id, user_id, project_name, source_lang, target_lang, status, \
                       source_key, video_url, audio_url, thumbnail_url, error, created_at, updated_at";

#[derive(Clone)]
pub struct PgJobRepository {
    pool: PgPool,
}

impl PgJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    async fn insert(&self, job: NewDubbingJob) -> AppResult<DubbingJob> {
        let sql = format!(
            r#"
            INSERT INTO projects (dubbing_id, user_id, project_name, source_lang, target_lang, status, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, DubbingJob>(&sql)
            .bind(&job.dubbing_id)
            .bind(&job.user_id)
            .bind(&job.project_name)
            .bind(&job.source_lang)
            .bind(&job.target_lang)
            .bind(JobStatus::Processing.as_str())
            .bind(&job.source_key)
            .fetch_one(&self.pool)
            .await?;

        Ok(row)
    }

    async fn find(&self, dubbing_id: &str, user_id: Option<&str>) -> AppResult<Option<DubbingJob>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM projects WHERE dubbing_id = $1 AND ($2::text IS NULL OR user_id = $2)"
        );

        let row = sqlx::query_as::<_, DubbingJob>(&sql)
            .bind(dubbing_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn mark_complete(&self, dubbing_id: &str, artifacts: &StoredArtifacts) -> AppResult<Option<DubbingJob>> {
        let sql = format!(
            r#"
            UPDATE projects
            SET status = $2, video_url = $3, audio_url = $4, thumbnail_url = $5, updated_at = NOW()
            WHERE dubbing_id = $1 AND status = $6
            RETURNING {COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, DubbingJob>(&sql)
            .bind(dubbing_id)
            .bind(JobStatus::Complete.as_str())
            .bind(&artifacts.video_url)
            .bind(&artifacts.audio_url)
            .bind(&artifacts.thumbnail_url)
            .bind(JobStatus::Processing.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn mark_failed(&self, dubbing_id: &str, reason: Option<&str>) -> AppResult<Option<DubbingJob>> {
        let sql = format!(
            r#"
            UPDATE projects
            SET status = $2, error = $3, updated_at = NOW()
            WHERE dubbing_id = $1 AND status = $4
            RETURNING {COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, DubbingJob>(&sql)
            .bind(dubbing_id)
            .bind(JobStatus::Failed.as_str())
            .bind(reason)
            .bind(JobStatus::Processing.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn list_by_owner(&self, user_id: &str) -> AppResult<Vec<DubbingJob>> {
        let sql = format!("SELECT {COLUMNS} FROM projects WHERE user_id = $1 ORDER BY created_at DESC");

        let rows = sqlx::query_as::<_, DubbingJob>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }
}
