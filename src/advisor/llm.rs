//! Chat-completion calls to OpenAI and Anthropic.

use crate::config::{AiConfig, AiProvider};
use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const MAX_TOKENS: u32 = 1000;
const TEMPERATURE: f32 = 0.7;
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Send the prompt to `provider` and return the raw reply text.
pub async fn complete(
    http: &Client,
    config: &AiConfig,
    provider: AiProvider,
    system: &str,
    prompt: &str,
) -> Result<String> {
    match provider {
        AiProvider::OpenAi => call_openai(http, config, system, prompt).await,
        AiProvider::Anthropic => call_anthropic(http, config, system, prompt).await,
    }
}

// ==================== OpenAI ====================

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
}

#[derive(Deserialize)]
struct OpenAiChoiceMessage {
    content: Option<String>,
}

async fn call_openai(http: &Client, config: &AiConfig, system: &str, prompt: &str) -> Result<String> {
    let body = OpenAiRequest {
        model: &config.openai_model,
        messages: vec![
            ChatMessage {
                role: "system",
                content: system,
            },
            ChatMessage {
                role: "user",
                content: prompt,
            },
        ],
        temperature: TEMPERATURE,
        max_tokens: MAX_TOKENS,
    };

    debug!(model = %config.openai_model, "Calling OpenAI API");

    let resp = http
        .post(format!(
            "{}/v1/chat/completions",
            config.openai_base_url.trim_end_matches('/')
        ))
        .bearer_auth(&config.openai_api_key)
        .json(&body)
        .send()
        .await
        .context("OpenAI API request failed")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        anyhow::bail!("OpenAI API error {status}: {text}");
    }

    let data: OpenAiResponse = resp.json().await.context("OpenAI response parse error")?;

    data.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .context("OpenAI returned empty content")
}

// ==================== Anthropic ====================

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    #[serde(default)]
    text: Option<String>,
}

async fn call_anthropic(
    http: &Client,
    config: &AiConfig,
    system: &str,
    prompt: &str,
) -> Result<String> {
    let body = AnthropicRequest {
        model: &config.anthropic_model,
        max_tokens: MAX_TOKENS,
        temperature: TEMPERATURE,
        system,
        messages: vec![ChatMessage {
            role: "user",
            content: prompt,
        }],
    };

    debug!(model = %config.anthropic_model, "Calling Anthropic API");

    let resp = http
        .post(format!(
            "{}/v1/messages",
            config.anthropic_base_url.trim_end_matches('/')
        ))
        .header("x-api-key", &config.anthropic_api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
        .json(&body)
        .send()
        .await
        .context("Anthropic API request failed")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        anyhow::bail!("Anthropic API error {status}: {text}");
    }

    let data: AnthropicResponse = resp
        .json()
        .await
        .context("Anthropic response parse error")?;

    data.content
        .into_iter()
        .find_map(|c| c.text)
        .context("Anthropic returned empty content")
}
