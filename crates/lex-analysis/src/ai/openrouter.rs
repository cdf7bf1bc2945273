//! OpenRouter text generator.
//!
//! This module provides the [`OpenRouterGenerator`] which implements the
//! [`TextGenerator`] trait for the OpenRouter chat completions API
//! (<https://openrouter.ai/>).

use super::provider::{EnhancementFailure, TextGenerator};
use anyhow::{Result, anyhow};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Default OpenRouter API endpoint.
const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model used for report narratives.
const DEFAULT_MODEL: &str = "deepseek/deepseek-chat";

/// Default timeout for API requests in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default temperature (low, so narratives stay close to the numbers).
const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Default max tokens for one section narrative.
const DEFAULT_MAX_TOKENS: u32 = 600;

const SYSTEM_PROMPT: &str = "You are a careful statistician writing report sections. \
Report only the statistics you are given, in plain prose, without inventing numbers.";

#[derive(Debug, Serialize)]
struct OpenRouterRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenRouterResponse {
    choices: Option<Vec<Choice>>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<Message>,
}

/// Configuration for the OpenRouter generator.
#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    /// The model to use (e.g., "deepseek/deepseek-chat", "openai/gpt-4").
    pub model: String,
    /// Temperature for response generation (0.0 - 2.0).
    pub temperature: f32,
    /// Maximum tokens in the response.
    pub max_tokens: u32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Base URL for the API (useful for proxies or custom endpoints).
    pub base_url: String,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl OpenRouterConfig {
    /// Create a new configuration builder.
    pub fn builder() -> OpenRouterConfigBuilder {
        OpenRouterConfigBuilder::default()
    }
}

/// Builder for [`OpenRouterConfig`].
#[derive(Default)]
pub struct OpenRouterConfigBuilder {
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
    base_url: Option<String>,
}

impl OpenRouterConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Build the configuration.
    pub fn build(self) -> OpenRouterConfig {
        OpenRouterConfig {
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            base_url: self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }
}

/// OpenRouter client producing section narratives.
///
/// # Example
///
/// ```rust,ignore
/// use lex_analysis::ai::{OpenRouterConfig, OpenRouterGenerator};
///
/// let generator = OpenRouterGenerator::new(std::env::var("OPENROUTER_API_KEY")?)?;
///
/// let config = OpenRouterConfig::builder()
///     .model("openai/gpt-4")
///     .timeout_secs(20)
///     .build();
/// let generator = OpenRouterGenerator::with_config("your-api-key", config)?;
/// ```
pub struct OpenRouterGenerator {
    api_key: String,
    config: OpenRouterConfig,
    client: Client,
}

impl OpenRouterGenerator {
    /// Create a generator with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(api_key, OpenRouterConfig::default())
    }

    /// Create a generator with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is empty or the HTTP client cannot be created.
    pub fn with_config(api_key: impl Into<String>, config: OpenRouterConfig) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(anyhow!("OpenRouter API key is empty"));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            api_key,
            config,
            client,
        })
    }

    fn call_api(&self, prompt: &str) -> Result<OpenRouterResponse> {
        let request = OpenRouterRequest {
            model: self.config.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .client
            .post(&self.config.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("X-Title", "lex-analysis")
            .json(&request)
            .send()?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "OpenRouter API Error {}: {}",
                response.status(),
                response.text()?
            ));
        }

        Ok(response.json()?)
    }

    fn classify(&self, error: anyhow::Error) -> EnhancementFailure {
        match error.downcast_ref::<reqwest::Error>() {
            Some(e) if e.is_timeout() => {
                EnhancementFailure::Timeout(Duration::from_secs(self.config.timeout_secs))
            }
            Some(e) if e.is_decode() => EnhancementFailure::MalformedResponse(e.to_string()),
            _ => EnhancementFailure::Provider(error.to_string()),
        }
    }
}

/// Text of the first choice, if it has any.
fn extract_text(response: &OpenRouterResponse) -> Result<String, EnhancementFailure> {
    response
        .choices
        .as_ref()
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.message.as_ref())
        .map(|msg| msg.content.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or_else(|| {
            EnhancementFailure::MalformedResponse("no content in OpenRouter response".to_string())
        })
}

impl TextGenerator for OpenRouterGenerator {
    fn generate(&self, prompt: &str) -> Result<String, EnhancementFailure> {
        let response = self.call_api(prompt).map_err(|e| {
            warn!("OpenRouter request failed: {}", e);
            self.classify(e)
        })?;
        extract_text(&response)
    }

    fn name(&self) -> &str {
        "OpenRouter"
    }

    fn model(&self) -> Option<&str> {
        Some(&self.config.model)
    }
}

// ============================================================================
// Tests
// ============================================================================
