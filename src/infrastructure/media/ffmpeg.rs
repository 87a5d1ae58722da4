use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::process::Command;
use tracing::debug;

use super::MediaProcessor;
use crate::common::error::{AppError, AppResult};

/// Seek position of the extracted frame. Skips black lead-in frames.
const FRAME_OFFSET: &str = "00:00:01";

#[derive(Clone, Debug)]
pub struct Ffmpeg {
    binary: String,
}

impl Ffmpeg {
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }

    fn thumbnail_args(input: &Path, output: &Path) -> Vec<String> {
        let mut args = quiet();
        args.extend([
            "-ss".into(),
            FRAME_OFFSET.into(),
            "-i".into(),
            path_arg(input),
            "-frames:v".into(),
            "1".into(),
            "-q:v".into(),
            "2".into(),
            "-y".into(),
            path_arg(output),
        ]);
        args
    }

    /// Video stream copied as is, audio taken from the second input, cut to
    /// the shorter of the two.
    fn mux_args(video: &Path, audio: &Path, output: &Path) -> Vec<String> {
        let mut args = quiet();
        args.extend([
            "-i".into(),
            path_arg(video),
            "-i".into(),
            path_arg(audio),
            "-c:v".into(),
            "copy".into(),
            "-map".into(),
            "0:v:0".into(),
            "-map".into(),
            "1:a:0".into(),
            "-shortest".into(),
            "-y".into(),
            path_arg(output),
        ]);
        args
    }

    async fn run(&self, args: Vec<String>) -> AppResult<()> {
        let result = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| AppError::Media(format!("Failed to run {}: {}", self.binary, e)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(AppError::Media(format!(
                "{} exited with {}: {}",
                self.binary,
                result.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

fn quiet() -> Vec<String> {
    vec!["-hide_banner".into(), "-loglevel".into(), "error".into()]
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[async_trait]
impl MediaProcessor for Ffmpeg {
    async fn thumbnail(&self, video: &Path) -> AppResult<Bytes> {
        let dir = video.parent().unwrap_or_else(|| Path::new("."));
        let output = tempfile::Builder::new()
            .prefix("thumb-")
            .suffix(".jpg")
            .tempfile_in(dir)?
            .into_temp_path();

        self.run(Self::thumbnail_args(video, &output)).await?;

        let frame = tokio::fs::read(&output).await?;
        if frame.is_empty() {
            return Err(AppError::Media("ffmpeg produced an empty thumbnail".to_string()));
        }

        debug!("Extracted {} byte thumbnail from {}", frame.len(), video.display());
        Ok(Bytes::from(frame))
    }

    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> AppResult<()> {
        self.run(Self::mux_args(video, audio, output)).await?;
        debug!("Muxed {} onto {}", audio.display(), video.display());
        Ok(())
    }
}
