//! ReplicateProvider - text-to-video generation through the Replicate predictions API.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::job::{GeneratedFile, Job, JobOutput, JobStatus};
use super::materializer::Materializer;
use super::provider::VideoProvider;
use crate::config::{Config, ConfigError, REPLICATE_API_TOKEN_ENV};
use crate::error::{Error, Result};
use crate::params::{ParamValue, Params};

/// Short model names and the Replicate versions they resolve to.
pub const MODELS: &[(&str, &str)] = &[
    (
        "stable-video-diffusion",
        "stability-ai/stable-video-diffusion:3f0457e4619daac51203dedb472816fd4af51f3149fa7a9e0b5ffcf1b8172438",
    ),
    (
        "zeroscope",
        "anotherjesse/zeroscope-v2-xl:9f747673945c62801b13b84701c783929c0ee784e4748ec062204894dda1a351",
    ),
];

/// Default timeout for API requests (30 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connection timeout (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Request body for prediction creation.
#[derive(Debug, Serialize)]
struct PredictionRequest<'a> {
    version: &'a str,
    input: Params,
}

/// Prediction as returned by both the create and get endpoints.
#[derive(Debug, Deserialize)]
struct PredictionResponse {
    id: String,
    status: String,
    #[serde(default)]
    output: Option<JobOutput>,
    /// A string for most models, occasionally a structured object.
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    logs: Option<String>,
}

impl PredictionResponse {
    fn into_job(self) -> Job {
        let status = JobStatus::from_remote(&self.status).unwrap_or_else(|| {
            log::warn!(
                "Job {} reported unrecognized status '{}', treating it as failed",
                self.id,
                self.status
            );
            JobStatus::Failed
        });

        let mut error = self.error.and_then(|value| match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) if s.trim().is_empty() => None,
            serde_json::Value::String(s) => Some(s),
            other => Some(other.to_string()),
        });
        if status == JobStatus::Failed && error.is_none() {
            let remote = self.status.to_ascii_lowercase();
            error = Some(match remote.as_str() {
                "failed" => "Unknown error occurred during generation".to_string(),
                "canceled" | "cancelled" => format!("Job was {}", self.status),
                _ => format!("Job ended with unrecognized status '{}'", self.status),
            });
        }

        Job {
            id: self.id,
            status,
            remote_status: self.status,
            output: self.output,
            error,
            logs: self.logs.filter(|l| !l.is_empty()),
        }
    }
}

/// Look up the version reference for a short model name.
pub fn resolve_model(name: &str) -> std::result::Result<&'static str, ConfigError> {
    MODELS
        .iter()
        .find(|(short, _)| *short == name)
        .map(|(_, version)| *version)
        .ok_or_else(|| ConfigError::UnknownModel {
            name: name.to_string(),
            available: available_models(),
        })
}

/// Recognized short model names, sorted.
pub fn available_models() -> Vec<String> {
    let mut names: Vec<String> = MODELS.iter().map(|(name, _)| name.to_string()).collect();
    names.sort();
    names
}

/// Client for one Replicate video model.
pub struct ReplicateProvider {
    api_token: String,
    base_url: String,
    model_name: String,
    model_version: &'static str,
    http_client: reqwest::Client,
    materializer: Materializer,
    poll_interval: Duration,
    timeout: Duration,
}

impl ReplicateProvider {
    /// Build a provider for `model_name` from process configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownModel` if the model is not recognized and
    /// `ConfigError::MissingCredential` if no Replicate token is configured.
    /// No network call is made.
    pub fn from_config(config: &Config, model_name: &str) -> std::result::Result<Self, ConfigError> {
        let model_version = resolve_model(model_name)?;

        let api_token = config
            .replicate_api_token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingCredential {
                var: REPLICATE_API_TOKEN_ENV,
            })?;

        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            api_token,
            base_url: config.generation.api_base_url.trim_end_matches('/').to_string(),
            model_name: model_name.to_string(),
            model_version,
            http_client,
            materializer: Materializer::new(config.generation.output_dir.clone())?,
            poll_interval: config.poll_interval(),
            timeout: config.generation_timeout(),
        })
    }

    /// Override how often and how long `generate_sync` polls.
    pub fn with_polling(mut self, poll_interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full `owner/name:version` reference of the selected model.
    pub fn model_version(&self) -> &str {
        self.model_version
    }

    /// The bare version id sent to the predictions endpoint.
    fn version_id(&self) -> &str {
        self.model_version
            .split_once(':')
            .map(|(_, id)| id)
            .unwrap_or(self.model_version)
    }

    /// `base_url` with `segments` appended, each percent-encoded as one path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url> {
        let invalid = |reason: String| {
            Error::generation(format!("Invalid API base URL {}: {}", self.base_url, reason))
        };
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn build_input(prompt: &str, options: &Params) -> Params {
        let mut input = Params::with_capacity(options.len() + 1);
        input.insert("prompt".to_string(), ParamValue::Text(prompt.to_string()));
        for (key, value) in options {
            if key == "prompt" {
                log::warn!("Ignoring 'prompt' option; the generation prompt takes precedence");
                continue;
            }
            input.insert(key.clone(), value.clone());
        }
        input
    }

    async fn create_prediction(&self, prompt: &str, options: &Params) -> Result<Job> {
        let url = self.endpoint(&["v1", "predictions"])?;
        let body = PredictionRequest {
            version: self.version_id(),
            input: Self::build_input(prompt, options),
        };

        let response = self
            .http_client
            .post(url.clone())
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::generation(format!("Request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::generation(format!(
                "API request failed with status {}: {}",
                status, error_text
            )));
        }

        let prediction: PredictionResponse = response
            .json()
            .await
            .map_err(|e| Error::generation(format!("Invalid prediction response: {}", e)))?;
        Ok(prediction.into_job())
    }

    async fn fetch_prediction(&self, job_id: &str) -> Result<Job> {
        // Empty, "." and ".." would not name a single prediction
        if matches!(job_id, "" | "." | "..") {
            return Err(Error::generation(format!("Unknown job id: '{}'", job_id)));
        }
        let url = self.endpoint(&["v1", "predictions", job_id])?;

        let response = self
            .http_client
            .get(url.clone())
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| Error::generation(format!("Request to {} failed: {}", url, e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::generation(format!("Unknown job id: {}", job_id)));
        }
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::generation(format!(
                "Status check failed with status {}: {}",
                status, error_text
            )));
        }

        let prediction: PredictionResponse = response
            .json()
            .await
            .map_err(|e| Error::generation(format!("Invalid prediction response: {}", e)))?;
        Ok(prediction.into_job())
    }
}

#[async_trait]
impl VideoProvider for ReplicateProvider {
    fn name(&self) -> &'static str {
        "replicate"
    }

    fn model(&self) -> &str {
        &self.model_name
    }

    async fn generate_sync(&self, prompt: &str, options: &Params) -> Result<GeneratedFile> {
        log::info!("Generating video with prompt: '{}'", prompt);
        log::info!("Using model: {}", self.model_name);

        let mut job = self.create_prediction(prompt, options).await?;
        log::info!("Prediction submitted, id: {}", job.id);

        let start_time = Instant::now();
        while !job.is_terminal() {
            if start_time.elapsed() > self.timeout {
                log::error!("Generation timed out after {:?}", self.timeout);
                return Err(Error::generation(format!(
                    "Job {} did not finish within {:?}",
                    job.id, self.timeout
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
            job = self.fetch_prediction(&job.id).await?;
            log::debug!("Job {} status: {}", job.id, job.status);
        }

        if job.status == JobStatus::Failed {
            let message = job.error.unwrap_or_default();
            log::error!("Generation failed: {}", message);
            return Err(Error::generation(message));
        }

        let video_url = job.first_output_url().ok_or_else(|| {
            Error::generation(format!("Job {} succeeded but returned no output", job.id))
        })?;
        self.materializer.materialize(video_url, prompt).await
    }

    async fn generate_async(&self, prompt: &str, options: &Params) -> Result<String> {
        let job = self.create_prediction(prompt, options).await?;
        log::info!("Started job {} with model {}", job.id, self.model_name);
        Ok(job.id)
    }

    async fn get_status(&self, job_id: &str) -> Result<Job> {
        self.fetch_prediction(job_id).await
    }

    async fn materialize(&self, url: &str, prompt: &str) -> Result<GeneratedFile> {
        self.materializer.materialize(url, prompt).await
    }
}
