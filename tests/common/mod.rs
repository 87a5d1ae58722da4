//! Shared fixtures: in-memory stand-ins for the database, the dubbing
//! provider, object storage and ffmpeg, plus request helpers.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, Response, StatusCode};
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use tempfile::{TempDir, TempPath};
use time::OffsetDateTime;
use tower::ServiceExt;

use dubbing_backend::app::create_app;
use dubbing_backend::common::error::{AppError, AppResult};
use dubbing_backend::config::settings::JobConfig;
use dubbing_backend::infrastructure::dubbing::{
    CreatedDubbing, DubbedFile, DubbingMetadata, DubbingProvider, DubbingRequest, FetchOutcome,
};
use dubbing_backend::infrastructure::media::MediaProcessor;
use dubbing_backend::infrastructure::storage::ObjectStore;
use dubbing_backend::modules::dubbing::model::{DubbingJob, JobStatus, NewDubbingJob, StoredArtifacts};
use dubbing_backend::modules::dubbing::repository::JobRepository;
use dubbing_backend::state::AppState;

// ---------------------------------------------------------------------------
// Job repository
// ---------------------------------------------------------------------------

type RowEdit = Box<dyn FnOnce(&mut DubbingJob) + Send>;

#[derive(Default)]
pub struct InMemoryJobs {
    rows: Mutex<Vec<DubbingJob>>,
    /// Applied to the row right before the next transition, standing in for
    /// a concurrent request that got there first.
    concurrent_edit: Mutex<Option<RowEdit>>,
}

impl InMemoryJobs {
    pub fn before_next_transition(&self, edit: impl FnOnce(&mut DubbingJob) + Send + 'static) {
        *self.concurrent_edit.lock().unwrap() = Some(Box::new(edit));
    }

    pub fn all(&self) -> Vec<DubbingJob> {
        self.rows.lock().unwrap().clone()
    }

    pub fn seed(&self, job: DubbingJob) {
        self.rows.lock().unwrap().push(job);
    }

    fn transition(
        &self,
        dubbing_id: &str,
        apply: impl FnOnce(&mut DubbingJob),
    ) -> Option<DubbingJob> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(edit) = self.concurrent_edit.lock().unwrap().take() {
            if let Some(row) = rows.iter_mut().find(|r| r.dubbing_id == dubbing_id) {
                edit(row);
            }
        }
        let row = rows
            .iter_mut()
            .find(|r| r.dubbing_id == dubbing_id && r.status == JobStatus::Processing)?;
        apply(row);
        row.updated_at = OffsetDateTime::now_utc();
        Some(row.clone())
    }
}

#[async_trait]
impl JobRepository for InMemoryJobs {
    async fn insert(&self, job: NewDubbingJob) -> AppResult<DubbingJob> {
        let now = OffsetDateTime::now_utc();
        let row = DubbingJob {
            dubbing_id: job.dubbing_id,
            user_id: job.user_id,
            project_name: job.project_name,
            source_lang: job.source_lang,
            target_lang: job.target_lang,
            status: JobStatus::Processing,
            source_key: job.source_key,
            video_url: None,
            audio_url: None,
            thumbnail_url: None,
            error: None,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn find(&self, dubbing_id: &str, user_id: Option<&str>) -> AppResult<Option<DubbingJob>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.dubbing_id == dubbing_id && user_id.is_none_or(|u| r.user_id == u))
            .cloned())
    }

    async fn mark_complete(&self, dubbing_id: &str, artifacts: &StoredArtifacts) -> AppResult<Option<DubbingJob>> {
        Ok(self.transition(dubbing_id, |row| {
            row.status = JobStatus::Complete;
            row.video_url = Some(artifacts.video_url.clone());
            row.audio_url = artifacts.audio_url.clone();
            row.thumbnail_url = artifacts.thumbnail_url.clone();
        }))
    }

    async fn mark_failed(&self, dubbing_id: &str, reason: Option<&str>) -> AppResult<Option<DubbingJob>> {
        Ok(self.transition(dubbing_id, |row| {
            row.status = JobStatus::Failed;
            row.error = reason.map(str::to_string);
        }))
    }

    async fn list_by_owner(&self, user_id: &str) -> AppResult<Vec<DubbingJob>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Dubbing provider
// ---------------------------------------------------------------------------

/// What the provider saw when a job was submitted.
#[derive(Debug, Clone)]
pub struct SeenSubmission {
    pub file_path: PathBuf,
    pub file_bytes: Vec<u8>,
    pub file_name: String,
    pub name: String,
    pub source_lang: String,
    pub target_lang: String,
    pub num_speakers: Option<u32>,
    pub voice_cloning: bool,
}

pub struct FakeProvider {
    pub next_id: String,
    pub status: Mutex<String>,
    pub failure_reason: Mutex<Option<String>>,
    pub create_error: Mutex<Option<(u16, String)>>,
    pub status_error: Mutex<Option<(u16, String)>>,
    pub fetch_script: Mutex<VecDeque<ScriptedFetch>>,
    /// Every fetch waits this long before answering.
    pub fetch_delay: Mutex<Duration>,
    pub submissions: Mutex<Vec<SeenSubmission>>,
    pub create_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
}

impl FakeProvider {
    pub fn new(next_id: &str) -> Self {
        Self {
            next_id: next_id.to_string(),
            status: Mutex::new("dubbing".to_string()),
            failure_reason: Mutex::new(None),
            create_error: Mutex::new(None),
            status_error: Mutex::new(None),
            fetch_script: Mutex::new(VecDeque::new()),
            fetch_delay: Mutex::new(Duration::ZERO),
            submissions: Mutex::new(Vec::new()),
            create_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_status(&self, status: &str) {
        *self.status.lock().unwrap() = status.to_string();
    }

    pub fn fail_with(&self, reason: &str) {
        self.set_status("failed");
        *self.failure_reason.lock().unwrap() = Some(reason.to_string());
    }

    /// Queues fetch results; once drained every fetch answers 425.
    pub fn script_fetches(&self, outcomes: impl IntoIterator<Item = ScriptedFetch>) {
        self.fetch_script.lock().unwrap().extend(outcomes);
    }

    pub fn creates(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn status_polls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DubbingProvider for FakeProvider {
    async fn create_dubbing(&self, request: DubbingRequest<'_>) -> AppResult<CreatedDubbing> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        self.submissions.lock().unwrap().push(SeenSubmission {
            file_path: request.file_path.to_path_buf(),
            file_bytes: std::fs::read(request.file_path)?,
            file_name: request.file_name.to_string(),
            name: request.name.to_string(),
            source_lang: request.source_lang.to_string(),
            target_lang: request.target_lang.to_string(),
            num_speakers: request.num_speakers,
            voice_cloning: request.voice_cloning,
        });

        if let Some((status, body)) = self.create_error.lock().unwrap().clone() {
            return Err(AppError::Upstream { status, body });
        }

        Ok(CreatedDubbing {
            dubbing_id: self.next_id.clone(),
            expected_duration_sec: Some(42.0),
        })
    }

    async fn get_dubbing(&self, dubbing_id: &str) -> AppResult<DubbingMetadata> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);

        if let Some((status, body)) = self.status_error.lock().unwrap().clone() {
            return Err(AppError::Upstream { status, body });
        }

        Ok(DubbingMetadata {
            dubbing_id: dubbing_id.to_string(),
            name: None,
            status: self.status.lock().unwrap().clone(),
            target_languages: vec!["es".to_string()],
            error: self.failure_reason.lock().unwrap().clone(),
        })
    }

    async fn fetch_dubbed_file(&self, _dubbing_id: &str, _language_code: &str, dir: &Path) -> AppResult<FetchOutcome> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.fetch_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let next = self.fetch_script.lock().unwrap().pop_front();
        match next.unwrap_or(ScriptedFetch::NotReady(425)) {
            ScriptedFetch::NotReady(status) => Ok(FetchOutcome::NotReady { status }),
            ScriptedFetch::Ready { bytes, content_type } => {
                let path = write_temp(dir, "dubbed-", bytes)?;
                Ok(FetchOutcome::Ready(DubbedFile {
                    path,
                    content_type: content_type.to_string(),
                    size: bytes.len() as u64,
                }))
            }
        }
    }
}

/// One canned answer of the fake provider's download endpoint.
#[derive(Debug, Clone)]
pub enum ScriptedFetch {
    Ready { bytes: &'static [u8], content_type: &'static str },
    NotReady(u16),
}

pub fn ready_video(bytes: &'static [u8]) -> ScriptedFetch {
    ScriptedFetch::Ready {
        bytes,
        content_type: "video/mp4",
    }
}

pub fn ready_audio(bytes: &'static [u8]) -> ScriptedFetch {
    ScriptedFetch::Ready {
        bytes,
        content_type: "audio/mpeg",
    }
}

pub fn not_ready(status: u16) -> ScriptedFetch {
    ScriptedFetch::NotReady(status)
}

fn write_temp(dir: &Path, prefix: &str, bytes: &[u8]) -> AppResult<TempPath> {
    let mut named = tempfile::Builder::new().prefix(prefix).tempfile_in(dir)?;
    named.write_all(bytes)?;
    Ok(named.into_temp_path())
}

// ---------------------------------------------------------------------------
// Object storage
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    pub objects: Mutex<HashMap<String, (Bytes, String)>>,
    pub put_calls: AtomicUsize,
    /// Uploads to keys starting with this prefix fail.
    pub failing_prefix: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn puts(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn object(&self, key: &str) -> Option<(Bytes, String)> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    /// Places an object without counting it as an upload.
    pub fn preload(&self, key: &str, body: &'static [u8], content_type: &str) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (Bytes::from_static(body), content_type.to_string()));
    }

    pub fn fail_uploads_under(&self, prefix: &str) {
        *self.failing_prefix.lock().unwrap() = Some(prefix.to_string());
    }

    fn store(&self, key: &str, body: Bytes, content_type: &str) -> AppResult<String> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(prefix) = self.failing_prefix.lock().unwrap().as_deref() {
            if key.starts_with(prefix) {
                return Err(AppError::Storage(format!("bucket rejected {}", key)));
            }
        }
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (body, content_type.to_string()));
        Ok(format!("https://cdn.test/{}", key))
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> AppResult<String> {
        self.store(key, body, content_type)
    }

    async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> AppResult<String> {
        let body = Bytes::from(std::fs::read(path)?);
        self.store(key, body, content_type)
    }

    async fn get_file(&self, key: &str, dir: &Path) -> AppResult<TempPath> {
        let (body, _) = self
            .object(key)
            .ok_or_else(|| AppError::Storage(format!("no such key {}", key)))?;
        write_temp(dir, "dub-source-", &body)
    }
}

// ---------------------------------------------------------------------------
// Media tool
// ---------------------------------------------------------------------------

pub struct FakeMedia {
    pub broken_thumbnails: bool,
    pub broken_mux: bool,
    pub thumbnail_calls: AtomicUsize,
    pub mux_calls: AtomicUsize,
}

impl FakeMedia {
    pub fn working() -> Self {
        Self {
            broken_thumbnails: false,
            broken_mux: false,
            thumbnail_calls: AtomicUsize::new(0),
            mux_calls: AtomicUsize::new(0),
        }
    }

    pub fn broken_thumbnails() -> Self {
        Self {
            broken_thumbnails: true,
            ..Self::working()
        }
    }

    pub fn broken_mux() -> Self {
        Self {
            broken_mux: true,
            ..Self::working()
        }
    }

    pub fn thumbnails(&self) -> usize {
        self.thumbnail_calls.load(Ordering::SeqCst)
    }

    pub fn muxes(&self) -> usize {
        self.mux_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaProcessor for FakeMedia {
    async fn thumbnail(&self, video: &Path) -> AppResult<Bytes> {
        self.thumbnail_calls.fetch_add(1, Ordering::SeqCst);
        assert!(video.exists(), "video must be on disk while extracting");
        if self.broken_thumbnails {
            return Err(AppError::Media("ffmpeg exited with 1".to_string()));
        }
        Ok(Bytes::from_static(b"jpeg-frame"))
    }

    /// Output is `video|audio` so tests can see both inputs were used.
    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> AppResult<()> {
        self.mux_calls.fetch_add(1, Ordering::SeqCst);
        if self.broken_mux {
            return Err(AppError::Media("ffmpeg exited with 1".to_string()));
        }
        let mut muxed = std::fs::read(video)?;
        muxed.push(b'|');
        muxed.extend(std::fs::read(audio)?);
        std::fs::write(output, muxed)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub jobs: Arc<InMemoryJobs>,
    pub provider: Arc<FakeProvider>,
    pub storage: Arc<MemoryStore>,
    pub media: Arc<FakeMedia>,
    pub upload_dir: TempDir,
    pub app: Router,
}

pub const DOWNLOAD_ATTEMPTS: u32 = 3;

pub const SOURCE_VIDEO: &[u8] = b"source-video";

pub struct Options {
    pub media: FakeMedia,
    pub thumbnails: bool,
    pub finalize_timeout: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            media: FakeMedia::working(),
            thumbnails: true,
            finalize_timeout: Duration::from_secs(5),
        }
    }
}

impl Harness {
    pub fn new() -> Self {
        Self::with(Options::default())
    }

    pub fn with(options: Options) -> Self {
        let jobs = Arc::new(InMemoryJobs::default());
        let provider = Arc::new(FakeProvider::new("dub_123"));
        let storage = Arc::new(MemoryStore::default());
        let media = Arc::new(options.media);
        let upload_dir = tempfile::tempdir().unwrap();

        let state = AppState::new(jobs.clone(), provider.clone(), storage.clone(), media.clone())
            .with_thumbnails(options.thumbnails)
            .with_job_config(JobConfig {
                download_attempts: DOWNLOAD_ATTEMPTS,
                download_delay: Duration::ZERO,
                finalize_timeout: options.finalize_timeout,
            })
            .with_upload_dir(upload_dir.path().to_path_buf())
            .with_max_upload_bytes(10 * 1024 * 1024);

        let app = create_app(state);

        Self {
            jobs,
            provider,
            storage,
            media,
            upload_dir,
            app,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap()).await
    }

    /// Number of files left behind in the upload directory.
    pub fn leftover_uploads(&self) -> usize {
        std::fs::read_dir(self.upload_dir.path()).unwrap().count()
    }

    /// A `processing` job whose source upload is already in storage.
    pub fn seed_job(&self, dubbing_id: &str, user_id: &str) {
        let now = OffsetDateTime::now_utc();
        let source_key = format!("sources/{}/{}.mp4", user_id, dubbing_id);
        self.storage.preload(&source_key, SOURCE_VIDEO, "video/mp4");
        self.jobs.seed(DubbingJob {
            dubbing_id: dubbing_id.to_string(),
            user_id: user_id.to_string(),
            project_name: format!("{} project", user_id),
            source_lang: "auto".to_string(),
            target_lang: "es".to_string(),
            status: JobStatus::Processing,
            source_key,
            video_url: None,
            audio_url: None,
            thumbnail_url: None,
            error: None,
            created_at: now,
            updated_at: now,
        });
    }
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn expect_json(response: Response<Body>, status: StatusCode) -> serde_json::Value {
    assert_eq!(response.status(), status);
    body_json(response).await
}

// ---------------------------------------------------------------------------
// Multipart
// ---------------------------------------------------------------------------

const BOUNDARY: &str = "dubbing-test-boundary";

#[derive(Default)]
pub struct MultipartBody {
    buf: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.buf.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.buf.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.buf.extend_from_slice(bytes);
        self.buf.extend_from_slice(b"\r\n");
        self
    }

    pub fn into_request(mut self, uri: &str) -> Request<Body> {
        self.buf.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(self.buf))
            .unwrap()
    }
}
