//! Configuration for clauseguard-runtime.

use chrono::{DateTime, Utc};
use clauseguard_core::{AnalysisConfig, AnalysisError, ConfigError, Language};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuntimeConfig {
    /// Core analysis settings (contract type, segmentation, health)
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Language service settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// Retry configuration
    #[serde(default)]
    pub retry: RetryConfig,

    /// Maximum LLM requests in flight
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Timeout configuration
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Determinism configuration
    #[serde(default)]
    pub determinism: DeterminismConfig,
}

fn default_concurrency() -> usize {
    4
}

/// Longest accepted `timeouts.overall`.
pub const MAX_OVERALL_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            analysis: AnalysisConfig::default(),
            llm: LlmConfig::default(),
            retry: RetryConfig::default(),
            concurrency: 4,
            timeouts: TimeoutConfig::default(),
            determinism: DeterminismConfig::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.json` file, or YAML for any other extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        }
    }

    /// Reject settings the orchestrator cannot run with.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        self.analysis.validate()?;

        if self.concurrency == 0 {
            return Err(AnalysisError::InvalidConfig("concurrency must be at least 1".to_string()));
        }
        if self.timeouts.overall.is_zero() {
            return Err(AnalysisError::InvalidConfig("timeouts.overall must be positive".to_string()));
        }
        if self.timeouts.overall > MAX_OVERALL_TIMEOUT {
            return Err(AnalysisError::InvalidConfig(format!(
                "timeouts.overall must not exceed {}, got {}",
                humantime::format_duration(MAX_OVERALL_TIMEOUT),
                humantime::format_duration(self.timeouts.overall)
            )));
        }

        self.llm.validate()?;
        self.retry.validate()
    }
}

/// Language service configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Output languages for explanations. Risk labels are always English.
    #[serde(default = "default_languages")]
    pub languages: Vec<Language>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-request timeout
    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub request_timeout: Duration,

    /// Request a contract-level business summary after the clause judgments
    #[serde(default = "default_summarize")]
    pub summarize: bool,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_languages() -> Vec<Language> {
    vec![Language::English]
}

fn default_temperature() -> f32 {
    0.15
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_summarize() -> bool {
    true
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            languages: default_languages(),
            temperature: 0.15,
            max_tokens: 2000,
            request_timeout: Duration::from_secs(60),
            summarize: true,
        }
    }
}

impl LlmConfig {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.languages.is_empty() {
            return Err(AnalysisError::InvalidConfig("llm.languages must not be empty".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AnalysisError::InvalidConfig(format!(
                "llm.temperature must be within 0..=2, got {}",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(AnalysisError::InvalidConfig("llm.max_tokens must be positive".to_string()));
        }
        Ok(())
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry
    #[serde(with = "humantime_serde", default = "default_retry_delay")]
    pub retry_delay: Duration,

    /// Upper bound for any single delay
    #[serde(with = "humantime_serde", default = "default_max_delay")]
    pub max_delay: Duration,

    /// Backoff multiplier
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Relative jitter, 0..=1
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_jitter() -> f64 {
    0.25
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: 0.25,
        }
    }
}

impl RetryConfig {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(AnalysisError::InvalidConfig(format!(
                "retry.jitter must be within 0..=1, got {}",
                self.jitter
            )));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "retry.multiplier must be at least 1, got {}",
                self.multiplier
            )));
        }
        Ok(())
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeoutConfig {
    /// Deadline for all LLM judgments of one analysis
    #[serde(with = "humantime_serde", default = "default_overall_timeout")]
    pub overall: Duration,
}

fn default_overall_timeout() -> Duration {
    Duration::from_secs(300)
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            overall: Duration::from_secs(300),
        }
    }
}

/// Determinism configuration for reproducible reports.
///
/// For golden tests and audits, pin `analyzed_at`:
///
/// ```yaml
/// determinism:
///   analyzed_at: "2025-01-15T12:00:00Z"
/// ```
///
/// When `analyzed_at` is None (default), the current system time is used.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DeterminismConfig {
    #[serde(default)]
    pub analyzed_at: Option<DateTime<Utc>>,
}

// Custom serialization for Duration using humantime format
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
