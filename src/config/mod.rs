//! Configuration management for the risk analyzer.
//!
//! Loads settings from `.env`, an optional `config.toml`, `BRA__SECTION__KEY`
//! environment overrides, and finally the flat variable names the tool has
//! always used (`BYBIT_API_KEY`, `OPENAI_API_KEY`, `TELEGRAM_BOT_TOKEN`, ...).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Flat environment variables mapped onto configuration keys.
const LEGACY_ENV_KEYS: &[(&str, &str)] = &[
    ("BYBIT_API_KEY", "bybit.api_key"),
    ("BYBIT_API_SECRET", "bybit.api_secret"),
    ("BYBIT_BASE_URL", "bybit.base_url"),
    ("BYBIT_WS_URL", "bybit.ws_url"),
    ("OPENAI_API_KEY", "ai.openai_api_key"),
    ("ANTHROPIC_API_KEY", "ai.anthropic_api_key"),
    ("AI_PROVIDER", "ai.provider"),
    ("TELEGRAM_BOT_TOKEN", "telegram.bot_token"),
    ("TELEGRAM_CHAT_ID", "telegram.chat_id"),
    ("WEB_APP_URL", "telegram.web_app_url"),
    ("BIND_ADDR", "server.bind_addr"),
];

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Bybit API credentials and endpoints
    #[serde(default)]
    pub bybit: BybitConfig,
    /// LLM suggestion settings
    #[serde(default)]
    pub ai: AiConfig,
    /// Telegram bot settings
    #[serde(default)]
    pub telegram: TelegramConfig,
    /// Dashboard HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BybitConfig {
    /// API key for authentication
    #[serde(default)]
    pub api_key: String,
    /// Secret key for signing requests
    #[serde(default)]
    pub api_secret: String,
    /// REST base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Private WebSocket URL (order stream)
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// Signature validity window in milliseconds
    #[serde(default = "default_recv_window")]
    pub recv_window_ms: u64,
    /// Product category (`linear` = USDT perpetuals)
    #[serde(default = "default_category")]
    pub category: String,
    /// Settlement coin used to list positions and orders
    #[serde(default = "default_settle_coin")]
    pub settle_coin: String,
    /// Wallet account type
    #[serde(default = "default_account_type")]
    pub account_type: String,
    /// REST request timeout in seconds
    #[serde(default = "default_exchange_timeout")]
    pub timeout_secs: u64,
}

/// Supported LLM providers for suggestions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiProvider {
    OpenAi,
    Anthropic,
}

impl fmt::Display for AiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AiProvider::OpenAi => write!(f, "OpenAI"),
            AiProvider::Anthropic => write!(f, "Anthropic"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Explicit provider choice ("openai", "anthropic"/"claude", "none").
    /// Empty means: use whichever key is configured, OpenAI first.
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub openai_api_key: String,
    #[serde(default)]
    pub anthropic_api_key: String,
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_anthropic_base_url")]
    pub anthropic_base_url: String,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,
    /// LLM request timeout in seconds
    #[serde(default = "default_ai_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Token from @BotFather
    #[serde(default)]
    pub bot_token: String,
    /// Chat that receives order notifications before anyone talks to the bot
    #[serde(default)]
    pub chat_id: String,
    /// Dashboard URL opened by the "Open Dashboard" web-app button
    #[serde(default)]
    pub web_app_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address for the dashboard server
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Directory holding `index.html`, `css/` and `js/`
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

// Default value functions
fn default_base_url() -> String {
    "https://api.bybit.com".to_string()
}

fn default_ws_url() -> String {
    "wss://stream.bybit.com/v5/private".to_string()
}

fn default_recv_window() -> u64 {
    5000
}

fn default_category() -> String {
    "linear".to_string()
}

fn default_settle_coin() -> String {
    "USDT".to_string()
}

fn default_account_type() -> String {
    "UNIFIED".to_string()
}

fn default_exchange_timeout() -> u64 {
    10
}

fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}

fn default_ai_timeout() -> u64 {
    30
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_static_dir() -> String {
    "webapp".to_string()
}

impl Config {
    /// Load configuration from `.env`, `config.toml` and environment variables.
    pub fn load() -> Result<Self> {
        Self::load_from("config")
    }

    /// Load configuration using a specific config file basename (extension optional).
    pub fn load_from(path: &str) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("BRA").separator("__"));

        for (var, key) in LEGACY_ENV_KEYS {
            let value = std::env::var(var).ok().filter(|v| !v.trim().is_empty());
            builder = builder
                .set_override_option(*key, value)
                .with_context(|| format!("Failed to apply {var}"))?;
        }

        builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Validate that the exchange credentials are present.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.bybit.api_key.trim().is_empty(),
            "BYBIT_API_KEY environment variable is not set"
        );

        anyhow::ensure!(
            !self.bybit.api_secret.trim().is_empty(),
            "BYBIT_API_SECRET environment variable is not set"
        );

        anyhow::ensure!(
            self.bybit.recv_window_ms > 0,
            "recv_window_ms must be greater than zero"
        );

        Ok(())
    }

    /// Whether LLM-backed suggestions are available.
    pub fn has_ai(&self) -> bool {
        self.ai_provider().is_some()
    }

    /// Provider used for suggestions, if any.
    pub fn ai_provider(&self) -> Option<AiProvider> {
        self.ai.resolve_provider()
    }
}

impl AiConfig {
    /// Resolve which provider to call, if any.
    ///
    /// An explicit provider wins only when its key is present; an unknown or
    /// `none` value disables the LLM path.
    pub fn resolve_provider(&self) -> Option<AiProvider> {
        let has_openai = !self.openai_api_key.trim().is_empty();
        let has_anthropic = !self.anthropic_api_key.trim().is_empty();

        match self.provider.trim().to_lowercase().as_str() {
            "" => {
                if has_openai {
                    Some(AiProvider::OpenAi)
                } else if has_anthropic {
                    Some(AiProvider::Anthropic)
                } else {
                    None
                }
            }
            "openai" => has_openai.then_some(AiProvider::OpenAi),
            "anthropic" | "claude" => has_anthropic.then_some(AiProvider::Anthropic),
            _ => None,
        }
    }

    /// API key for the given provider.
    pub fn api_key(&self, provider: AiProvider) -> &str {
        match provider {
            AiProvider::OpenAi => &self.openai_api_key,
            AiProvider::Anthropic => &self.anthropic_api_key,
        }
    }
}

impl Default for BybitConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_secret: String::new(),
            base_url: default_base_url(),
            ws_url: default_ws_url(),
            recv_window_ms: default_recv_window(),
            category: default_category(),
            settle_coin: default_settle_coin(),
            account_type: default_account_type(),
            timeout_secs: default_exchange_timeout(),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: String::new(),
            openai_api_key: String::new(),
            anthropic_api_key: String::new(),
            openai_base_url: default_openai_base_url(),
            anthropic_base_url: default_anthropic_base_url(),
            openai_model: default_openai_model(),
            anthropic_model: default_anthropic_model(),
            timeout_secs: default_ai_timeout(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            static_dir: default_static_dir(),
        }
    }
}
