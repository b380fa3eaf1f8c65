//! Suggestion generation.
//!
//! An LLM is asked first when one is configured; any failure (transport,
//! non-2xx status, unparseable reply) falls back to the rule-based path.

mod llm;
mod prompt;
mod rules;

pub use prompt::{build_user_prompt, extract_json, parse_suggestions, SYSTEM_PROMPT};
pub use rules::rule_based_suggestions;

use crate::analysis::Analysis;
use crate::config::{AiConfig, AiProvider};
use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// Maximum entries kept per suggestion list.
pub const MAX_SUGGESTIONS: usize = 4;

/// Categorized, human-readable suggestions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestions {
    #[serde(default)]
    pub urgent: Vec<String>,
    #[serde(default)]
    pub recommended: Vec<String>,
    #[serde(default)]
    pub optional: Vec<String>,
}

impl Suggestions {
    /// Truncate every list to `MAX_SUGGESTIONS`.
    pub fn capped(mut self) -> Self {
        self.urgent.truncate(MAX_SUGGESTIONS);
        self.recommended.truncate(MAX_SUGGESTIONS);
        self.optional.truncate(MAX_SUGGESTIONS);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.urgent.is_empty() && self.recommended.is_empty() && self.optional.is_empty()
    }
}

/// Produces suggestions for an analysis snapshot.
#[derive(Debug, Clone)]
pub struct Advisor {
    http: Client,
    config: AiConfig,
    provider: Option<AiProvider>,
}

impl Advisor {
    pub fn new(config: &AiConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        let provider = config.resolve_provider();
        match provider {
            Some(p) => info!("{} configured - AI analysis enabled", p),
            None => info!("No AI provider configured - using rule-based analysis"),
        }

        Ok(Self {
            http,
            config: config.clone(),
            provider,
        })
    }

    /// Provider used for suggestions, if any.
    pub fn provider(&self) -> Option<AiProvider> {
        self.provider
    }

    /// Suggestions from the configured LLM, or the rule-based fallback.
    pub async fn suggest(&self, analysis: &Analysis) -> Suggestions {
        let Some(provider) = self.provider else {
            return rule_based_suggestions(analysis);
        };

        match self.ask_model(provider, analysis).await {
            Ok(suggestions) => suggestions,
            Err(e) => {
                warn!("{} analysis failed ({:#}), using fallback", provider, e);
                rule_based_suggestions(analysis)
            }
        }
    }

    async fn ask_model(&self, provider: AiProvider, analysis: &Analysis) -> Result<Suggestions> {
        let prompt = build_user_prompt(analysis)?;
        let reply = llm::complete(&self.http, &self.config, provider, SYSTEM_PROMPT, &prompt).await?;
        parse_suggestions(&reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze_positions;
    use crate::exchange::RawPosition;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_analysis() -> Analysis {
        analyze_positions(
            &[RawPosition {
                symbol: "BTCUSDT".to_string(),
                side: "Buy".to_string(),
                size: "0.5".to_string(),
                mark_price: "43200".to_string(),
                liq_price: "40000".to_string(),
                leverage: "12.5".to_string(),
                unrealised_pnl: "525".to_string(),
                ..RawPosition::default()
            }],
            &[],
        )
    }

    fn openai_config(base_url: &str) -> AiConfig {
        AiConfig {
            provider: "openai".to_string(),
            openai_api_key: "sk-test".to_string(),
            openai_base_url: base_url.to_string(),
            ..AiConfig::default()
        }
    }

    fn chat_reply(content: &str) -> serde_json::Value {
        json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
    }

    #[test]
    fn test_without_provider_uses_rules() {
        let advisor = Advisor::new(&AiConfig::default()).unwrap();
        assert_eq!(advisor.provider(), None);

        let analysis = sample_analysis();
        let suggestions = tokio_test::block_on(advisor.suggest(&analysis));
        assert_eq!(suggestions, rule_based_suggestions(&analysis));
    }

    #[tokio::test]
    async fn test_openai_reply_is_used() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(
                "```json\n{\"urgent\": [\"Cut BTC leverage\"], \"recommended\": [], \"optional\": []}\n```",
            )))
            .expect(1)
            .mount(&server)
            .await;

        let advisor = Advisor::new(&openai_config(&server.uri())).unwrap();
        let suggestions = advisor.suggest(&sample_analysis()).await;
        assert_eq!(suggestions.urgent, vec!["Cut BTC leverage".to_string()]);
    }

    #[tokio::test]
    async fn test_error_status_falls_back() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let analysis = sample_analysis();
        let advisor = Advisor::new(&openai_config(&server.uri())).unwrap();
        assert_eq!(
            advisor.suggest(&analysis).await,
            rule_based_suggestions(&analysis)
        );
    }

    #[tokio::test]
    async fn test_malformed_reply_falls_back() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(chat_reply("Reduce your leverage.")),
            )
            .mount(&server)
            .await;

        let analysis = sample_analysis();
        let advisor = Advisor::new(&openai_config(&server.uri())).unwrap();
        assert_eq!(
            advisor.suggest(&analysis).await,
            rule_based_suggestions(&analysis)
        );
    }

    #[tokio::test]
    async fn test_anthropic_reply_is_used() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "sk-ant"))
            .and(header("anthropic-version", "2023-06-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "{\"recommended\": [\"Hedge with ETH shorts\"]}"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = AiConfig {
            anthropic_api_key: "sk-ant".to_string(),
            anthropic_base_url: server.uri(),
            ..AiConfig::default()
        };
        let advisor = Advisor::new(&config).unwrap();
        assert_eq!(advisor.provider(), Some(AiProvider::Anthropic));

        let suggestions = advisor.suggest(&sample_analysis()).await;
        assert_eq!(
            suggestions.recommended,
            vec!["Hedge with ETH shorts".to_string()]
        );
        assert!(suggestions.urgent.is_empty());
    }
}
