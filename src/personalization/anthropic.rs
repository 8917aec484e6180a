//! Anthropic Messages API client used for AI-assisted prompt rewriting.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{Config, ConfigError};
use crate::error::{Error, Result};
use crate::params::Params;

/// API version header value expected by the Messages endpoint.
const ANTHROPIC_VERSION: &str = "2023-06-01";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Fixed instruction sent as the system prompt.
pub const SYSTEM_PROMPT: &str = "You are a video prompt generator. Create detailed, \
visually descriptive prompts for AI video generation based on user data. \
Keep prompts concise but vivid (2-3 sentences max). Focus on visual \
elements, mood, and style.";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Build the user turn sent to the model.
pub fn build_user_message(template: &str, data: &Params, context: Option<&str>) -> String {
    let user_data = serde_json::to_string(data).unwrap_or_else(|_| "{}".to_string());
    let context_line = match context.map(str::trim).filter(|c| !c.is_empty()) {
        Some(c) => format!("Context: {}\n", c),
        None => String::new(),
    };
    format!(
        "Template: {}\n\nUser Data: {}\n{}\nGenerate a personalized video prompt:",
        template, user_data, context_line
    )
}

/// Client for the Anthropic Messages endpoint.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    http_client: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(api_key: String, config: &Config) -> std::result::Result<Self, ConfigError> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            api_key,
            base_url: config
                .personalization
                .api_base_url
                .trim_end_matches('/')
                .to_string(),
            model: config.personalization.model.clone(),
            max_tokens: config.personalization.max_tokens,
            http_client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Ask the model for a personalized video prompt and return its trimmed text.
    pub async fn rewrite(
        &self,
        template: &str,
        data: &Params,
        context: Option<&str>,
    ) -> Result<String> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: SYSTEM_PROMPT,
            messages: vec![Message {
                role: "user",
                content: build_user_message(template, data, context),
            }],
        };

        let response = self
            .http_client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::personalization(format!("Request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::personalization(format!(
                "API request failed with status {}: {}",
                status, error_text
            )));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| Error::personalization(format!("Invalid response: {}", e)))?;

        let text = parsed
            .content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .map(|t| t.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(Error::personalization("Model returned no text"));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamValue;

    #[test]
    fn test_user_message_with_context() {
        let mut data = Params::new();
        data.insert("name".to_string(), ParamValue::from("Sarah"));
        data.insert("hobby".to_string(), ParamValue::from("hiking"));

        let message = build_user_message("A video for {name}", &data, Some("birthday"));
        assert_eq!(
            message,
            "Template: A video for {name}\n\n\
             User Data: {\"name\":\"Sarah\",\"hobby\":\"hiking\"}\n\
             Context: birthday\n\n\
             Generate a personalized video prompt:"
        );
    }

    #[test]
    fn test_user_message_without_context() {
        let message = build_user_message("Waves", &Params::new(), None);
        assert_eq!(
            message,
            "Template: Waves\n\nUser Data: {}\n\nGenerate a personalized video prompt:"
        );
    }

    #[test]
    fn test_request_serialization() {
        let body = MessagesRequest {
            model: "claude-3-5-sonnet-20241022",
            max_tokens: 200,
            system: SYSTEM_PROMPT,
            messages: vec![Message {
                role: "user",
                content: "hi".to_string(),
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["max_tokens"], 200);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hi");
        assert!(json["system"].as_str().unwrap().contains("video prompt"));
    }

    #[test]
    fn test_client_takes_settings_from_config() {
        let config = Config::default();
        let client = AnthropicClient::new("sk-test".to_string(), &config).unwrap();
        assert_eq!(client.model(), "claude-3-5-sonnet-20241022");
        assert_eq!(client.base_url, "https://api.anthropic.com");
        assert_eq!(client.max_tokens, 200);
    }
}
