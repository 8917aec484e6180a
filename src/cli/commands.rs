//! Subcommand handlers.

use std::time::Duration;

use super::args::{Args, Command, PromptArgs};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::generator::{available_models, JobStatus, VideoGenerator, MODELS};
use crate::params::Params;
use crate::personalization::PromptBuilder;

/// Longest prompt accepted from the user, in characters.
pub const MAX_PROMPT_CHARS: usize = 500;

/// Validate a prompt before it reaches the generation core.
///
/// The prompt is trimmed, must not be empty, and must be at most
/// [`MAX_PROMPT_CHARS`] characters.
pub fn validate_prompt(prompt: &str) -> Result<&str> {
    let trimmed = prompt.trim();

    if trimmed.is_empty() {
        return Err(Error::InvalidPrompt {
            reason: "Please provide a video prompt".to_string(),
        });
    }

    if trimmed.chars().count() > MAX_PROMPT_CHARS {
        return Err(Error::InvalidPrompt {
            reason: format!("Prompt too long (max {} characters)", MAX_PROMPT_CHARS),
        });
    }

    Ok(trimmed)
}

/// Run one parsed command line.
pub async fn run(args: Args) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;

    match args.command {
        Command::Generate(prompt_args) => generate(&config, &prompt_args).await,
        Command::Submit(prompt_args) => submit(&config, &prompt_args).await,
        Command::Status { job_id } => status(&config, &job_id).await,
        Command::Wait {
            job_id,
            interval,
            timeout,
            download,
            prompt,
        } => {
            let timeout = timeout
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.generation_timeout());
            let prompt = if download { prompt } else { None };
            wait(&config, &job_id, Duration::from_secs(interval), timeout, prompt).await
        }
        Command::Personalize {
            template,
            data,
            context,
        } => {
            let builder = PromptBuilder::from_config(&config)?;
            let data: Params = data.into_iter().collect();
            let prompt = builder
                .personalize(&template, &data, context.as_deref())
                .await?;
            println!("{}", prompt);
            Ok(())
        }
        Command::Models => {
            list_models();
            Ok(())
        }
    }
}

fn build_generator(config: &Config, prompt_args: &PromptArgs) -> Result<VideoGenerator> {
    let provider = prompt_args
        .provider
        .as_deref()
        .unwrap_or(config.generation.provider.as_str());
    let model = prompt_args
        .model
        .as_deref()
        .unwrap_or(config.generation.model.as_str());
    Ok(VideoGenerator::new(config, provider, model)?)
}

/// Personalize the user's prompt and validate the result.
///
/// Both the template and the personalized prompt must pass
/// [`validate_prompt`], so substitution or a rewrite cannot push the
/// submitted prompt past the length limit.
async fn final_prompt(generator: &VideoGenerator, prompt_args: &PromptArgs) -> Result<String> {
    let template = validate_prompt(&prompt_args.prompt)?;
    let data = prompt_args.personalization_data();
    let personalized = generator
        .personalize(template, &data, prompt_args.context.as_deref())
        .await?;

    match validate_prompt(&personalized) {
        Ok(prompt) => Ok(prompt.to_string()),
        Err(Error::InvalidPrompt { reason }) => Err(Error::InvalidPrompt {
            reason: format!("Personalized prompt rejected: {}", reason),
        }),
        Err(e) => Err(e),
    }
}

async fn generate(config: &Config, prompt_args: &PromptArgs) -> Result<()> {
    config.ensure_output_dir()?;
    let generator = build_generator(config, prompt_args)?;
    let prompt = final_prompt(&generator, prompt_args).await?;
    let options = prompt_args.generation_options(config);

    println!("Generating video for: \"{}\"", prompt);
    let file = generator.generate(&prompt, &Params::new(), &options).await?;
    println!("Video generated successfully: {}", file.path.display());
    Ok(())
}

async fn submit(config: &Config, prompt_args: &PromptArgs) -> Result<()> {
    let generator = build_generator(config, prompt_args)?;
    let prompt = final_prompt(&generator, prompt_args).await?;
    let options = prompt_args.generation_options(config);

    let job_id = generator.generate_async(&prompt, &Params::new(), &options).await?;
    println!("{}", job_id);
    Ok(())
}

async fn status(config: &Config, job_id: &str) -> Result<()> {
    let generator = VideoGenerator::from_config(config)?;
    let job = generator.get_status(job_id).await?;

    println!("Job:    {}", job.id);
    if job.remote_status.eq_ignore_ascii_case(&job.status.to_string()) {
        println!("Status: {}", job.status);
    } else {
        println!("Status: {} (remote: {})", job.status, job.remote_status);
    }
    for url in job.output_urls() {
        println!("Output: {}", url);
    }
    if let Some(error) = &job.error {
        println!("Error:  {}", error);
    }
    if let Some(logs) = &job.logs {
        println!("Logs:\n{}", logs);
    }
    Ok(())
}

async fn wait(
    config: &Config,
    job_id: &str,
    interval: Duration,
    timeout: Duration,
    download_prompt: Option<String>,
) -> Result<()> {
    let generator = VideoGenerator::from_config(config)?;
    log::info!("Waiting for job {} (polling every {:?})", job_id, interval);

    let job = generator
        .wait_for_completion(job_id, interval, timeout)
        .await?;

    if job.status == JobStatus::Failed {
        return Err(Error::Generation {
            message: job.error.unwrap_or_default(),
        });
    }

    println!("Video generation complete!");
    for url in job.output_urls() {
        println!("Output: {}", url);
    }

    if let Some(prompt) = download_prompt {
        config.ensure_output_dir()?;
        let file = generator.materialize_job(&job, &prompt).await?;
        println!("Saved to: {}", file.path.display());
    }
    Ok(())
}

fn list_models() {
    println!("Available models (provider: replicate):");
    for name in available_models() {
        let version = MODELS
            .iter()
            .find(|(short, _)| *short == name)
            .map(|(_, version)| *version)
            .unwrap_or_default();
        println!("  {:<24} {}", name, version);
    }
}
