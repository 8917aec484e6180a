//! Materializer - turns a remote video URL into a uniquely named local file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::{AsyncWriteExt, BufWriter};

use super::job::GeneratedFile;
use crate::config::ConfigError;
use crate::error::{Error, Result};

/// Maximum length of the prompt-derived part of a filename, in characters.
pub const MAX_BASE_NAME_CHARS: usize = 50;

/// Size of the buffered writes made while streaming a download to disk.
pub const DOWNLOAD_CHUNK_SIZE: usize = 8192;

const VIDEO_EXTENSION: &str = "mp4";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on a single video transfer.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Derive a filesystem-safe base name from a prompt.
///
/// Alphanumerics, spaces, hyphens and underscores are kept; every other
/// character becomes `_`. The result is cut to the first
/// [`MAX_BASE_NAME_CHARS`] characters.
pub fn sanitize_filename(prompt: &str) -> String {
    prompt
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == ' ' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_BASE_NAME_CHARS)
        .collect()
}

/// `<dir>/<base>.mp4` for `n == 0`, `<dir>/<base>_<n>.mp4` otherwise.
pub fn candidate_path(dir: &Path, base: &str, n: u32) -> PathBuf {
    if n == 0 {
        dir.join(format!("{}.{}", base, VIDEO_EXTENSION))
    } else {
        dir.join(format!("{}_{}.{}", base, n, VIDEO_EXTENSION))
    }
}

/// Writes downloaded videos into a flat output directory without ever
/// replacing an existing file.
#[derive(Debug, Clone)]
pub struct Materializer {
    output_dir: PathBuf,
    http_client: reqwest::Client,
}

impl Materializer {
    pub fn new(output_dir: impl Into<PathBuf>) -> std::result::Result<Self, ConfigError> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self::with_client(output_dir, http_client))
    }

    /// Reuse an existing HTTP client (connection pool shared with the adapter).
    pub fn with_client(output_dir: impl Into<PathBuf>, http_client: reqwest::Client) -> Self {
        Self {
            output_dir: output_dir.into(),
            http_client,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Download `url` into a fresh file named after `prompt`.
    ///
    /// The request is checked before any file is created, so an HTTP error
    /// leaves the directory untouched. A transfer that breaks midway leaves
    /// the partial file in place.
    pub async fn materialize(&self, url: &str, prompt: &str) -> Result<GeneratedFile> {
        let response = self
            .http_client
            .get(url)
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await
            .map_err(|e| Error::download(format!("request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Error::download(format!(
                "server returned {} for {}",
                status, url
            )));
        }

        let base = sanitize_filename(prompt);
        let (path, file) = self.reserve_path(&base).await?;
        log::info!("Downloading video to: {}", path.display());

        let mut writer = BufWriter::with_capacity(DOWNLOAD_CHUNK_SIZE, file);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                Error::download(format!(
                    "transfer interrupted while writing {}: {}",
                    path.display(),
                    e
                ))
            })?;
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| io_error(&path, e))?;
        }
        writer.flush().await.map_err(|e| io_error(&path, e))?;

        log::info!("Video saved: {}", path.display());
        Ok(GeneratedFile {
            path,
            source_prompt: prompt.to_string(),
        })
    }

    /// Find the first unused candidate path and create it exclusively.
    ///
    /// The scan restarts from the bare name on every call. `create_new` makes
    /// claiming a name atomic, so two writers racing for the same candidate
    /// cannot both win; the loser moves on to the next suffix.
    async fn reserve_path(&self, base: &str) -> Result<(PathBuf, tokio::fs::File)> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| io_error(&self.output_dir, e))?;

        let mut n = 0u32;
        loop {
            let path = candidate_path(&self.output_dir, base, n);
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    n = n.checked_add(1).ok_or_else(|| {
                        Error::download(format!("no free filename left for '{}'", base))
                    })?;
                }
                Err(e) => return Err(io_error(&path, e)),
            }
        }
    }
}

fn io_error(path: &Path, e: std::io::Error) -> Error {
    Error::download(format!("{}: {}", path.display(), e))
}
