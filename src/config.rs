//! Configuration handling for reelgen.
//!
//! Settings come from built-in defaults, then an optional TOML file
//! (`~/.config/reelgen/config.toml` or a custom path), then environment
//! variables. Credentials are only ever read from the environment.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::params::{ParamValue, Params};

/// Environment variable holding the Replicate API token.
pub const REPLICATE_API_TOKEN_ENV: &str = "REPLICATE_API_TOKEN";

/// Legacy name accepted for the Replicate API token.
pub const REPLICATE_API_KEY_ENV: &str = "REPLICATE_API_KEY";

/// Environment variable holding the Anthropic API key (optional).
pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

pub const DEFAULT_OUTPUT_DIR: &str = "./output";
pub const DEFAULT_PROVIDER: &str = "replicate";
pub const DEFAULT_MODEL: &str = "zeroscope";
pub const DEFAULT_VIDEO_DURATION: u32 = 5;
pub const DEFAULT_VIDEO_RESOLUTION: &str = "1024x576";
pub const REPLICATE_API_BASE_URL: &str = "https://api.replicate.com";
pub const ANTHROPIC_API_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_PERSONALIZATION_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const DEFAULT_PERSONALIZATION_MAX_TOKENS: u32 = 200;

/// Process configuration, built once at startup and passed into constructors.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Credential for the generation service. Required by the Replicate adapter.
    pub replicate_api_token: Option<String>,
    /// Credential for AI-assisted personalization. Absent means template-only.
    pub anthropic_api_key: Option<String>,
    pub generation: GenerationConfig,
    pub personalization: PersonalizationConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub provider: String,
    pub model: String,
    pub output_dir: PathBuf,
    /// Advisory, forwarded as the `duration` option.
    pub default_duration: u32,
    /// Advisory, forwarded as the `resolution` option.
    pub default_resolution: String,
    pub api_base_url: String,
    pub poll_interval_secs: u64,
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
            model: DEFAULT_MODEL.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            default_duration: DEFAULT_VIDEO_DURATION,
            default_resolution: DEFAULT_VIDEO_RESOLUTION.to_string(),
            api_base_url: REPLICATE_API_BASE_URL.to_string(),
            poll_interval_secs: 2,
            timeout_secs: 600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PersonalizationConfig {
    pub model: String,
    pub api_base_url: String,
    pub max_tokens: u32,
}

impl Default for PersonalizationConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_PERSONALIZATION_MODEL.to_string(),
            api_base_url: ANTHROPIC_API_BASE_URL.to_string(),
            max_tokens: DEFAULT_PERSONALIZATION_MAX_TOKENS,
        }
    }
}

/// On-disk layout of the TOML settings file.
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    generation: GenerationConfig,
    #[serde(default)]
    personalization: PersonalizationConfig,
}

impl Config {
    /// Load configuration from a file path and the process environment.
    /// A missing file yields the defaults; an unreadable or malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load only the TOML layer, without consulting the environment.
    pub fn from_file(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            path: path.clone(),
            source: e,
        })?;
        let file: FileConfig = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.clone(),
            source: e,
        })?;

        Ok(Config {
            generation: file.generation,
            personalization: file.personalization,
            ..Config::default()
        })
    }

    /// Overlay environment variables onto this configuration.
    ///
    /// `lookup` abstracts over `std::env::var` so tests can supply their own
    /// environment. Empty values are treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        self.replicate_api_token = get(REPLICATE_API_TOKEN_ENV).or_else(|| get(REPLICATE_API_KEY_ENV));
        self.anthropic_api_key = get(ANTHROPIC_API_KEY_ENV);

        if let Some(dir) = get("OUTPUT_DIR") {
            self.generation.output_dir = PathBuf::from(dir);
        }
        if let Some(duration) = get("DEFAULT_VIDEO_DURATION") {
            self.generation.default_duration =
                duration.trim().parse().map_err(|_| ConfigError::Invalid {
                    key: "DEFAULT_VIDEO_DURATION",
                    reason: format!("'{}' is not a whole number of seconds", duration),
                })?;
        }
        if let Some(resolution) = get("DEFAULT_VIDEO_RESOLUTION") {
            self.generation.default_resolution = resolution;
        }
        if let Some(provider) = get("REELGEN_PROVIDER") {
            self.generation.provider = provider;
        }
        if let Some(model) = get("REELGEN_MODEL") {
            self.generation.model = model;
        }
        if let Some(url) = get("REPLICATE_API_BASE_URL") {
            self.generation.api_base_url = url;
        }
        if let Some(model) = get("ANTHROPIC_MODEL") {
            self.personalization.model = model;
        }
        if let Some(url) = get("ANTHROPIC_API_BASE_URL") {
            self.personalization.api_base_url = url;
        }

        Ok(())
    }

    /// Create the output directory if it does not exist yet.
    pub fn ensure_output_dir(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.generation.output_dir).map_err(|e| ConfigError::IoError {
            path: self.generation.output_dir.clone(),
            source: e,
        })
    }

    /// Advisory defaults forwarded to the remote model unless overridden.
    pub fn default_options(&self) -> Params {
        let mut options = Params::new();
        options.insert(
            "duration".to_string(),
            ParamValue::Integer(i64::from(self.generation.default_duration)),
        );
        options.insert(
            "resolution".to_string(),
            ParamValue::Text(self.generation.default_resolution.clone()),
        );
        options
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.generation.poll_interval_secs)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation.timeout_secs)
    }
}

/// Errors raised while building configuration or configured components.
#[derive(Debug)]
pub enum ConfigError {
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// A required credential is not set.
    MissingCredential { var: &'static str },
    UnknownModel {
        name: String,
        available: Vec<String>,
    },
    UnknownProvider {
        name: String,
        available: Vec<String>,
    },
    Invalid {
        key: &'static str,
        reason: String,
    },
    /// The HTTP client could not be built.
    Http(reqwest::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError { path, source } => {
                write!(f, "Failed to access '{}': {}", path.display(), source)
            }
            ConfigError::ParseError { path, source } => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::MissingCredential { var } => {
                write!(f, "{} not set in environment", var)
            }
            ConfigError::UnknownModel { name, available } => {
                write!(
                    f,
                    "Unknown model: {}. Available: {}",
                    name,
                    available.join(", ")
                )
            }
            ConfigError::UnknownProvider { name, available } => {
                write!(
                    f,
                    "Unknown provider: {}. Available: {}",
                    name,
                    available.join(", ")
                )
            }
            ConfigError::Invalid { key, reason } => write!(f, "Invalid {}: {}", key, reason),
            ConfigError::Http(e) => write!(f, "Failed to build HTTP client: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ConfigError {
    fn from(e: reqwest::Error) -> Self {
        ConfigError::Http(e)
    }
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("reelgen").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/reelgen/config.toml")
        })
}
