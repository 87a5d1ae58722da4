use std::path::PathBuf;
use std::sync::Arc;

use crate::config::settings::JobConfig;
use crate::infrastructure::dubbing::DubbingProvider;
use crate::infrastructure::media::MediaProcessor;
use crate::infrastructure::storage::ObjectStore;
use crate::modules::dubbing::repository::JobRepository;

#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<dyn JobRepository>,
    pub provider: Arc<dyn DubbingProvider>,
    pub storage: Arc<dyn ObjectStore>,
    pub media: Arc<dyn MediaProcessor>,
    pub thumbnails_enabled: bool,
    pub job_config: JobConfig,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        provider: Arc<dyn DubbingProvider>,
        storage: Arc<dyn ObjectStore>,
        media: Arc<dyn MediaProcessor>,
    ) -> Self {
        Self {
            jobs,
            provider,
            storage,
            media,
            thumbnails_enabled: true,
            job_config: JobConfig::default(),
            upload_dir: std::env::temp_dir(),
            max_upload_bytes: 500 * 1024 * 1024,
        }
    }

    pub fn with_job_config(mut self, job_config: JobConfig) -> Self {
        self.job_config = job_config;
        self
    }

    pub fn with_thumbnails(mut self, enabled: bool) -> Self {
        self.thumbnails_enabled = enabled;
        self
    }

    pub fn with_upload_dir(mut self, upload_dir: PathBuf) -> Self {
        self.upload_dir = upload_dir;
        self
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}
