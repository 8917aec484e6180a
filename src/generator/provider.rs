//! Provider contract shared by every remote generation backend.

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

use super::job::{GeneratedFile, Job};
use crate::config::ConfigError;
use crate::error::Result;
use crate::params::Params;

/// Uniform contract over one remote video-generation backend.
#[async_trait]
pub trait VideoProvider: Send + Sync {
    /// Name of the backend (for logging)
    fn name(&self) -> &'static str;

    /// Short model name this instance was built for.
    fn model(&self) -> &str;

    /// Run a generation to completion and download the result.
    async fn generate_sync(&self, prompt: &str, options: &Params) -> Result<GeneratedFile>;

    /// Start a generation and return its job id without waiting.
    async fn generate_async(&self, prompt: &str, options: &Params) -> Result<String>;

    /// Poll a job once. Does not change remote state.
    async fn get_status(&self, job_id: &str) -> Result<Job>;

    /// Download a finished output URL into the output directory.
    async fn materialize(&self, url: &str, prompt: &str) -> Result<GeneratedFile>;
}

/// Backends the facade can be built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Replicate,
}

impl ProviderKind {
    pub const ALL: &'static [ProviderKind] = &[ProviderKind::Replicate];

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Replicate => "replicate",
        }
    }

    pub fn available() -> Vec<String> {
        Self::ALL.iter().map(|p| p.as_str().to_string()).collect()
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownProvider {
                name: s.to_string(),
                available: Self::available(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_provider() {
        assert_eq!("replicate".parse::<ProviderKind>().unwrap(), ProviderKind::Replicate);
        assert_eq!(ProviderKind::Replicate.to_string(), "replicate");
    }

    #[test]
    fn test_parse_unknown_provider_lists_available() {
        for name in ["runway", "", "Replicate", "replicate "] {
            match name.parse::<ProviderKind>() {
                Err(ConfigError::UnknownProvider { name: got, available }) => {
                    assert_eq!(got, name);
                    assert_eq!(available, vec!["replicate".to_string()]);
                }
                other => panic!("expected UnknownProvider for {:?}, got {:?}", name, other),
            }
        }
    }
}
