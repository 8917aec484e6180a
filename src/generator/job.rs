//! Job - read-only projection of a remote asynchronous generation task.

use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

/// Lifecycle state of a remote job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Accepted by the remote service, not started yet (`starting`).
    Pending,
    /// Being generated (`processing`).
    Running,
    /// Finished with output (`succeeded`).
    Succeeded,
    /// Finished without output (`failed`, `canceled`).
    Failed,
}

impl JobStatus {
    /// Map the remote service's status vocabulary.
    /// Returns `None` for values this crate does not know; adapters decide
    /// how to project those.
    pub fn from_remote(status: &str) -> Option<Self> {
        match status.to_ascii_lowercase().as_str() {
            "starting" => Some(JobStatus::Pending),
            "processing" => Some(JobStatus::Running),
            "succeeded" => Some(JobStatus::Succeeded),
            "failed" | "canceled" | "cancelled" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JobStatus::Pending => "starting",
            JobStatus::Running => "processing",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        })
    }
}

/// Output of a job: one URL or a list of URLs, depending on the model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum JobOutput {
    Single(String),
    Many(Vec<String>),
}

impl JobOutput {
    pub fn urls(&self) -> Vec<&str> {
        match self {
            JobOutput::Single(url) => vec![url.as_str()],
            JobOutput::Many(urls) => urls.iter().map(String::as_str).collect(),
        }
    }

    pub fn first(&self) -> Option<&str> {
        match self {
            JobOutput::Single(url) => Some(url.as_str()),
            JobOutput::Many(urls) => urls.first().map(String::as_str),
        }
    }
}

/// Snapshot of a remote job as of the last poll. Never written back.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    /// Status word exactly as the remote service reported it.
    pub remote_status: String,
    pub output: Option<JobOutput>,
    pub error: Option<String>,
    pub logs: Option<String>,
}

impl Job {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn output_urls(&self) -> Vec<&str> {
        self.output.as_ref().map(JobOutput::urls).unwrap_or_default()
    }

    pub fn first_output_url(&self) -> Option<&str> {
        self.output.as_ref().and_then(JobOutput::first)
    }
}

/// A video written to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub source_prompt: String,
}
