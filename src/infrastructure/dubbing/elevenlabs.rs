use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{header, Client, Response, StatusCode};
use tokio_util::io::ReaderStream;
use tracing::{debug, info};
use url::Url;

use super::{CreatedDubbing, DubbedFile, DubbingMetadata, DubbingProvider, DubbingRequest, FetchOutcome};
use crate::common::error::{AppError, AppResult};
use crate::common::upload::spool_stream;
use crate::config::settings::ProviderConfig;

const API_KEY_HEADER: &str = "xi-api-key";

/// REST client for the ElevenLabs dubbing API.
#[derive(Clone)]
pub struct ElevenLabsClient {
    http: Client,
    base_url: Url,
    api_key: String,
}

impl ElevenLabsClient {
    pub fn new(config: &ProviderConfig) -> AppResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;

        info!("✅ Dubbing provider client ready ({})", config.base_url);

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// `{base}/v1/dubbing/{segments...}`, each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> AppResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Config(format!("{} cannot be used as a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(["v1", "dubbing"])
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, segments: &[&str]) -> AppResult<Response> {
        let url = self.endpoint(segments)?;
        let resp = self
            .http
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        Ok(resp)
    }
}

async fn ensure_success(resp: Response) -> AppResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(AppError::Upstream {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl DubbingProvider for ElevenLabsClient {
    async fn create_dubbing(&self, request: DubbingRequest<'_>) -> AppResult<CreatedDubbing> {
        let file = tokio::fs::File::open(request.file_path).await?;
        let len = file.metadata().await?.len();
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));

        let part = Part::stream_with_length(body, len)
            .file_name(request.file_name.to_string())
            .mime_str(request.content_type)?;

        let mut form = Form::new()
            .part("file", part)
            .text("name", request.name.to_string())
            .text("source_lang", request.source_lang.to_string())
            .text("target_lang", request.target_lang.to_string())
            .text("mode", "automatic");

        if let Some(n) = request.num_speakers {
            form = form.text("num_speakers", n.to_string());
        }
        if let Some(start) = request.start_time {
            form = form.text("start_time", start.to_string());
        }
        if let Some(end) = request.end_time {
            form = form.text("end_time", end.to_string());
        }
        if !request.voice_cloning {
            form = form.text("disable_voice_cloning", "true");
        }

        let url = self.endpoint(&[])?;
        info!(
            "Submitting {} ({} bytes) for dubbing {} -> {}",
            request.file_name, len, request.source_lang, request.target_lang
        );

        let resp = self
            .http
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .multipart(form)
            .send()
            .await?;

        let created: CreatedDubbing = ensure_success(resp).await?.json().await?;
        Ok(created)
    }

    async fn get_dubbing(&self, dubbing_id: &str) -> AppResult<DubbingMetadata> {
        let resp = self.get(&[dubbing_id]).await?;
        let meta: DubbingMetadata = ensure_success(resp).await?.json().await?;
        debug!("Provider status for {}: {}", dubbing_id, meta.status);
        Ok(meta)
    }

    async fn fetch_dubbed_file(&self, dubbing_id: &str, language_code: &str, dir: &Path) -> AppResult<FetchOutcome> {
        let resp = self.get(&[dubbing_id, "audio", language_code]).await?;
        let resp = if is_not_ready(resp.status()) {
            // The generic output endpoint sometimes has the file before the
            // per-language one does.
            debug!("Per-language output of {} not ready, trying generic output", dubbing_id);
            self.get(&[dubbing_id, "output"]).await?
        } else {
            resp
        };

        let status = resp.status();
        if is_not_ready(status) {
            return Ok(FetchOutcome::NotReady {
                status: status.as_u16(),
            });
        }

        let resp = ensure_success(resp).await?;
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("video/mp4")
            .to_string();

        let (path, size) = spool_stream(resp.bytes_stream(), dir, "dubbed-", "", AppError::Provider).await?;
        info!("⬇️ Downloaded output of {} ({} bytes, {})", dubbing_id, size, content_type);

        Ok(FetchOutcome::Ready(DubbedFile {
            path,
            content_type,
            size,
        }))
    }
}

fn is_not_ready(status: StatusCode) -> bool {
    matches!(status.as_u16(), 404 | 425)
}
