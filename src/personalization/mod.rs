//! Prompt personalization.
//!
//! A template is specialized with per-user data either by literal
//! `{key}` substitution or by asking a language model to rewrite it. Which
//! strategy runs is fixed when the [`PromptBuilder`] is constructed: it is
//! AI-assisted exactly when an Anthropic key is configured.

mod anthropic;

pub use anthropic::{build_user_message, AnthropicClient, SYSTEM_PROMPT};

use crate::config::{Config, ConfigError, ANTHROPIC_API_KEY_ENV};
use crate::error::Result;
use crate::params::Params;

/// Replace every `{key}` in `template` with the string form of its value.
///
/// Keys are applied in the map's insertion order. Placeholders without a
/// matching key are left as they are.
pub fn substitute(template: &str, data: &Params) -> String {
    let mut result = template.to_string();
    for (key, value) in data {
        let placeholder = format!("{{{}}}", key);
        if result.contains(&placeholder) {
            result = result.replace(&placeholder, &value.to_string());
        }
    }
    result
}

/// Personalization strategy, chosen once at construction.
#[derive(Debug, Clone)]
pub enum PromptBuilder {
    /// Literal `{key}` substitution.
    Template,
    /// Rewrite through a remote language model.
    Assisted(AnthropicClient),
}

impl PromptBuilder {
    pub fn from_config(config: &Config) -> std::result::Result<Self, ConfigError> {
        match config.anthropic_api_key.clone() {
            Some(key) => Ok(PromptBuilder::Assisted(AnthropicClient::new(key, config)?)),
            None => {
                log::warn!(
                    "{} not set. AI prompt building disabled, using template substitution.",
                    ANTHROPIC_API_KEY_ENV
                );
                Ok(PromptBuilder::Template)
            }
        }
    }

    pub fn is_ai_assisted(&self) -> bool {
        matches!(self, PromptBuilder::Assisted(_))
    }

    /// Produce the final prompt for `template` and `data`.
    ///
    /// `context` is free text passed to the language model; template
    /// substitution ignores it.
    pub async fn build(&self, template: &str, data: &Params, context: Option<&str>) -> Result<String> {
        match self {
            PromptBuilder::Template => Ok(substitute(template, data)),
            PromptBuilder::Assisted(client) => {
                log::info!("Rewriting prompt with {}", client.model());
                client.rewrite(template, data, context).await
            }
        }
    }

    /// Like [`build`](Self::build), but a prompt with no personalization
    /// data is returned unchanged and no remote call is made. A `context`
    /// given without data is dropped with a warning.
    pub async fn personalize(
        &self,
        prompt: &str,
        data: &Params,
        context: Option<&str>,
    ) -> Result<String> {
        if data.is_empty() {
            if context.is_some_and(|c| !c.trim().is_empty()) {
                log::warn!("Context ignored: no personalization data was given");
            }
            return Ok(prompt.to_string());
        }
        self.build(prompt, data, context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamValue;

    fn data(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), ParamValue::from(*v)))
            .collect()
    }

    #[test]
    fn test_substitute_replaces_placeholder() {
        assert_eq!(substitute("Hello {name}", &data(&[("name", "Sarah")])), "Hello Sarah");
    }

    #[test]
    fn test_substitute_replaces_every_occurrence() {
        assert_eq!(
            substitute("{x} and {x}", &data(&[("x", "y")])),
            "y and y"
        );
    }

    #[test]
    fn test_substitute_leaves_unmatched_placeholders() {
        let template = "A {color} sky over {place}";
        assert_eq!(
            substitute(template, &data(&[("color", "purple")])),
            "A purple sky over {place}"
        );
    }

    #[test]
    fn test_substitute_without_matches_is_identity() {
        let template = "Waves at {time} near name";
        assert_eq!(substitute(template, &data(&[("name", "Sarah"), ("tim", "x")])), template);
        assert_eq!(substitute(template, &Params::new()), template);
    }

    #[test]
    fn test_substitute_uses_value_string_form() {
        let mut params = Params::new();
        params.insert("age".to_string(), ParamValue::Integer(30));
        params.insert("happy".to_string(), ParamValue::Bool(true));
        assert_eq!(substitute("{age} {happy}", &params), "30 true");
    }

    #[test]
    fn test_from_config_without_key_is_template() {
        let builder = PromptBuilder::from_config(&Config::default()).unwrap();
        assert!(!builder.is_ai_assisted());
    }

    #[test]
    fn test_from_config_with_key_is_assisted() {
        let config = Config {
            anthropic_api_key: Some("sk-ant".to_string()),
            ..Config::default()
        };
        let builder = PromptBuilder::from_config(&config).unwrap();
        assert!(builder.is_ai_assisted());
    }

    #[tokio::test]
    async fn test_personalize_without_data_is_verbatim() {
        let builder = PromptBuilder::Template;
        let prompt = builder
            .personalize("Hello {name}", &Params::new(), Some("birthday"))
            .await
            .unwrap();
        assert_eq!(prompt, "Hello {name}");

        let prompt = builder
            .personalize("Hello {name}", &data(&[("name", "Ada")]), None)
            .await
            .unwrap();
        assert_eq!(prompt, "Hello Ada");
    }

    #[tokio::test]
    async fn test_template_build_ignores_context() {
        let builder = PromptBuilder::Template;
        let prompt = builder
            .build("Hello {name}", &data(&[("name", "Sarah")]), Some("birthday"))
            .await
            .unwrap();
        assert_eq!(prompt, "Hello Sarah");
    }
}
