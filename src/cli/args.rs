//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;
use crate::params::{ParamValue, Params};

/// Generate short videos from text prompts with hosted text-to-video models
#[derive(Parser, Debug)]
#[command(name = "reelgen")]
#[command(version, about = "Text-to-video generation from the command line", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a video and wait for the file
    Generate(PromptArgs),

    /// Start a generation job and print its id
    Submit(PromptArgs),

    /// Show the current state of a job
    Status {
        /// Job id printed by `submit`
        job_id: String,
    },

    /// Poll a job until it finishes
    Wait {
        /// Job id printed by `submit`
        job_id: String,

        /// Seconds between polls
        #[arg(long, default_value = "5")]
        interval: u64,

        /// Give up after this many seconds (default: from config)
        #[arg(long)]
        timeout: Option<u64>,

        /// Download the output when the job succeeds
        #[arg(long, requires = "prompt")]
        download: bool,

        /// Prompt used to name the downloaded file
        #[arg(long)]
        prompt: Option<String>,
    },

    /// Print the personalized prompt without generating anything
    Personalize {
        /// Prompt template with {key} placeholders
        template: String,

        /// Personalization value (repeatable), e.g. --data name=Sarah
        #[arg(long = "data", value_name = "KEY=VALUE", value_parser = parse_param)]
        data: Vec<(String, ParamValue)>,

        /// Extra context for AI-assisted rewriting
        #[arg(long)]
        context: Option<String>,
    },

    /// List recognized models
    Models,
}

#[derive(clap::Args, Debug)]
pub struct PromptArgs {
    /// Video prompt, or a template when --data is given
    pub prompt: String,

    /// Provider to use (default: from config)
    #[arg(long)]
    pub provider: Option<String>,

    /// Model to use (default: from config)
    #[arg(long, short)]
    pub model: Option<String>,

    /// Personalization value (repeatable), e.g. --data name=Sarah
    #[arg(long = "data", value_name = "KEY=VALUE", value_parser = parse_param)]
    pub data: Vec<(String, ParamValue)>,

    /// Model option forwarded verbatim (repeatable), e.g. --opt fps=24
    #[arg(long = "opt", value_name = "KEY=VALUE", value_parser = parse_param)]
    pub options: Vec<(String, ParamValue)>,

    /// Extra context for AI-assisted rewriting
    #[arg(long)]
    pub context: Option<String>,
}

impl PromptArgs {
    pub fn personalization_data(&self) -> Params {
        self.data.iter().cloned().collect()
    }

    /// Config defaults overlaid with the user's `--opt` values.
    pub fn generation_options(&self, config: &Config) -> Params {
        let mut options = config.default_options();
        options.extend(self.options.iter().cloned());
        options
    }
}

fn parse_param(s: &str) -> Result<(String, ParamValue), String> {
    ParamValue::parse_assignment(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generate_with_data_and_options() {
        let args = Args::try_parse_from([
            "reelgen",
            "generate",
            "Hello {name}",
            "--data",
            "name=Sarah",
            "--opt",
            "fps=24",
            "--opt",
            "duration=3",
            "-m",
            "stable-video-diffusion",
        ])
        .unwrap();

        let Command::Generate(prompt_args) = args.command else {
            panic!("expected generate");
        };
        assert_eq!(prompt_args.prompt, "Hello {name}");
        assert_eq!(prompt_args.model.as_deref(), Some("stable-video-diffusion"));

        let data = prompt_args.personalization_data();
        assert_eq!(data.get("name"), Some(&ParamValue::from("Sarah")));

        let options = prompt_args.generation_options(&Config::default());
        assert_eq!(options.get("fps"), Some(&ParamValue::Integer(24)));
        // --opt overrides the configured default
        assert_eq!(options.get("duration"), Some(&ParamValue::Integer(3)));
        assert_eq!(
            options.get("resolution"),
            Some(&ParamValue::Text("1024x576".to_string()))
        );
    }

    #[test]
    fn test_parse_rejects_malformed_data() {
        let result = Args::try_parse_from(["reelgen", "generate", "x", "--data", "oops"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_wait_download_requires_prompt() {
        let result = Args::try_parse_from(["reelgen", "wait", "abc", "--download"]);
        assert!(result.is_err());

        let args =
            Args::try_parse_from(["reelgen", "wait", "abc", "--download", "--prompt", "A cat"])
                .unwrap();
        assert!(matches!(args.command, Command::Wait { download: true, .. }));
    }

    #[test]
    fn test_global_config_flag() {
        let args = Args::try_parse_from(["reelgen", "models", "--config", "/tmp/r.toml"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("/tmp/r.toml")));
    }
}
