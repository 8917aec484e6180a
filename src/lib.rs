//! reelgen library crate.
//!
//! Provider-agnostic text-to-video generation: submit a prompt to a hosted
//! model, poll the resulting job, and download the video under a
//! collision-free name.

pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod params;
pub mod personalization;

pub use config::{Config, ConfigError};
pub use error::{Error, Result};
pub use generator::{GeneratedFile, Job, JobStatus, VideoGenerator, VideoProvider};
pub use params::{ParamValue, Params};
pub use personalization::PromptBuilder;
