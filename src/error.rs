//! Error taxonomy shared by the generation core.

use crate::config::ConfigError;

/// Errors that can occur while generating, polling or downloading videos.
///
/// Nothing here is retried internally: every variant propagates unchanged to
/// the caller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing credential, unknown provider/model, or unusable settings.
    /// Raised at construction time, never mid-generation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The remote generation call failed or reported an error status.
    #[error("Generation failed: {message}")]
    Generation { message: String },

    /// Transferring the generated video to disk failed.
    #[error("Download failed: {message}")]
    Download { message: String },

    /// The remote language-model call used for prompt rewriting failed.
    #[error("Personalization failed: {message}")]
    Personalization { message: String },

    /// Rejected at the front-end boundary before reaching the core.
    #[error("Invalid prompt: {reason}")]
    InvalidPrompt { reason: String },
}

impl Error {
    pub(crate) fn generation(message: impl Into<String>) -> Self {
        Error::Generation {
            message: message.into(),
        }
    }

    pub(crate) fn download(message: impl Into<String>) -> Self {
        Error::Download {
            message: message.into(),
        }
    }

    pub(crate) fn personalization(message: impl Into<String>) -> Self {
        Error::Personalization {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
