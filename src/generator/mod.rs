//! Video generation: provider adapters, job projection, and the facade callers use.
//!
//! Control flow: [`VideoGenerator`] personalizes the prompt, delegates to the
//! single [`VideoProvider`] it was built with, and the provider's
//! [`Materializer`] writes the finished video into the output directory.

mod job;
mod materializer;
mod provider;
mod replicate;

use std::time::Duration;

use tokio::time::Instant;

pub use job::{GeneratedFile, Job, JobOutput, JobStatus};
pub use materializer::{
    candidate_path, sanitize_filename, Materializer, DOWNLOAD_CHUNK_SIZE, MAX_BASE_NAME_CHARS,
};
pub use provider::{ProviderKind, VideoProvider};
pub use replicate::{available_models, resolve_model, ReplicateProvider, MODELS};

use crate::config::{Config, ConfigError};
use crate::error::{Error, Result};
use crate::params::Params;
use crate::personalization::PromptBuilder;

/// Single entry point for generating videos.
///
/// Holds exactly one provider for its whole lifetime.
pub struct VideoGenerator {
    provider: Box<dyn VideoProvider>,
    prompt_builder: PromptBuilder,
}

impl VideoGenerator {
    /// Build a generator for `provider`/`model`.
    ///
    /// # Errors
    ///
    /// `ConfigError::UnknownProvider`, `ConfigError::UnknownModel` or
    /// `ConfigError::MissingCredential`, all before any network call.
    pub fn new(config: &Config, provider: &str, model: &str) -> std::result::Result<Self, ConfigError> {
        let provider: Box<dyn VideoProvider> = match provider.parse::<ProviderKind>()? {
            ProviderKind::Replicate => Box::new(ReplicateProvider::from_config(config, model)?),
        };
        let prompt_builder = PromptBuilder::from_config(config)?;
        Ok(Self::with_provider(provider, prompt_builder))
    }

    /// Build a generator for the provider and model named in `config`.
    pub fn from_config(config: &Config) -> std::result::Result<Self, ConfigError> {
        Self::new(config, &config.generation.provider, &config.generation.model)
    }

    pub fn with_provider(provider: Box<dyn VideoProvider>, prompt_builder: PromptBuilder) -> Self {
        Self {
            provider,
            prompt_builder,
        }
    }

    pub fn provider(&self) -> &dyn VideoProvider {
        self.provider.as_ref()
    }

    pub fn prompt_builder(&self) -> &PromptBuilder {
        &self.prompt_builder
    }

    /// Apply personalization to `prompt`. With no data the prompt is returned
    /// unchanged and no remote call is made.
    pub async fn personalize(
        &self,
        prompt: &str,
        personalization_data: &Params,
        context: Option<&str>,
    ) -> Result<String> {
        self.prompt_builder
            .personalize(prompt, personalization_data, context)
            .await
    }

    /// Personalize, then generate synchronously.
    pub async fn generate(
        &self,
        prompt: &str,
        personalization_data: &Params,
        options: &Params,
    ) -> Result<GeneratedFile> {
        let prompt = self.personalize(prompt, personalization_data, None).await?;
        self.provider.generate_sync(&prompt, options).await
    }

    /// Personalize, then start an asynchronous job.
    pub async fn generate_async(
        &self,
        prompt: &str,
        personalization_data: &Params,
        options: &Params,
    ) -> Result<String> {
        let prompt = self.personalize(prompt, personalization_data, None).await?;
        self.provider.generate_async(&prompt, options).await
    }

    pub async fn get_status(&self, job_id: &str) -> Result<Job> {
        self.provider.get_status(job_id).await
    }

    /// Poll `job_id` until it reaches a terminal status.
    ///
    /// A failed job is returned, not raised; check `status`. Only exceeding
    /// `timeout` or a failing poll is an error.
    pub async fn wait_for_completion(
        &self,
        job_id: &str,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<Job> {
        let start_time = Instant::now();
        loop {
            let job = self.get_status(job_id).await?;
            log::debug!("Job {} status: {}", job.id, job.status);
            if job.is_terminal() {
                return Ok(job);
            }
            if start_time.elapsed() > timeout {
                return Err(Error::generation(format!(
                    "Job {} still {} after {:?}",
                    job_id, job.status, timeout
                )));
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Download the first output of a succeeded job.
    pub async fn materialize_job(&self, job: &Job, prompt: &str) -> Result<GeneratedFile> {
        if job.status != JobStatus::Succeeded {
            return Err(Error::generation(format!(
                "Job {} is {}, nothing to download",
                job.id, job.status
            )));
        }
        let url = job
            .first_output_url()
            .ok_or_else(|| Error::generation(format!("Job {} has no output", job.id)))?;
        self.provider.materialize(url, prompt).await
    }
}
