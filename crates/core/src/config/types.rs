use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use crate::events::LogLevel;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub drafter: DrafterConfig,
    #[serde(default)]
    pub inbound: InboundConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8000
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("helpdesk.db")
}

/// Log event pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventsConfig {
    /// Bounded queue capacity; events beyond it are dropped.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Minimum level forwarded from `tracing` into the queue.
    #[serde(default = "default_min_level")]
    pub min_level: LogLevel,
    /// How long shutdown waits for the sink to drain.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

impl EventsConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            min_level: default_min_level(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

fn default_queue_capacity() -> usize {
    1000
}

fn default_min_level() -> LogLevel {
    LogLevel::Warn
}

fn default_shutdown_timeout() -> u64 {
    5
}

/// Available classifier backends
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierBackend {
    /// Deterministic keyword table, no external calls.
    #[default]
    Keyword,
    /// Zero-shot classification through an LLM.
    Llm,
}

/// Classifier configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub backend: ClassifierBackend,
    /// Upper bound for a single classification call before falling back.
    #[serde(default = "default_classify_timeout")]
    pub timeout_secs: u64,
    /// Required when backend = "llm"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmConfig>,
}

impl ClassifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            backend: ClassifierBackend::default(),
            timeout_secs: default_classify_timeout(),
            llm: None,
        }
    }
}

fn default_classify_timeout() -> u64 {
    30
}

/// How responses are drafted
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DrafterMode {
    /// Deterministic text without any external call.
    #[default]
    Fallback,
    /// Generate replies with an LLM.
    Llm,
}

/// Drafter configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DrafterConfig {
    #[serde(default)]
    pub mode: DrafterMode,
    /// Required when mode = "llm"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmConfig>,
}

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LlmProvider {
    /// OpenAI chat completions API.
    #[serde(rename = "openai")]
    OpenAi,
    /// Local Ollama instance.
    #[serde(rename = "ollama")]
    Ollama,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "openai",
            LlmProvider::Ollama => "ollama",
        }
    }
}

/// LLM client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    /// Model name/identifier.
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Custom API base URL (for proxies or self-hosted).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_llm_timeout() -> u64 {
    30
}

fn default_max_tokens() -> u32 {
    1024
}

/// Inbound email webhook configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InboundConfig {
    /// Shared secret used to verify the `X-Signature` HMAC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_secret: Option<String>,
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub events: EventsConfig,
    pub classifier: SanitizedClassifierConfig,
    pub drafter: SanitizedDrafterConfig,
    pub inbound: SanitizedInboundConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedClassifierConfig {
    pub backend: ClassifierBackend,
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm: Option<SanitizedLlmConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedDrafterConfig {
    pub mode: DrafterMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm: Option<SanitizedLlmConfig>,
}

/// Sanitized LLM config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedLlmConfig {
    pub provider: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    pub api_key_configured: bool,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedInboundConfig {
    pub shared_secret_configured: bool,
}

impl From<&LlmConfig> for SanitizedLlmConfig {
    fn from(llm: &LlmConfig) -> Self {
        Self {
            provider: llm.provider.as_str().to_string(),
            model: llm.model.clone(),
            api_base: llm.api_base.clone(),
            api_key_configured: llm.api_key.as_deref().is_some_and(|k| !k.is_empty()),
            timeout_secs: llm.timeout_secs,
        }
    }
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            events: config.events.clone(),
            classifier: SanitizedClassifierConfig {
                backend: config.classifier.backend,
                timeout_secs: config.classifier.timeout_secs,
                llm: config.classifier.llm.as_ref().map(SanitizedLlmConfig::from),
            },
            drafter: SanitizedDrafterConfig {
                mode: config.drafter.mode,
                llm: config.drafter.llm.as_ref().map(SanitizedLlmConfig::from),
            },
            inbound: SanitizedInboundConfig {
                shared_secret_configured: config
                    .inbound
                    .shared_secret
                    .as_deref()
                    .is_some_and(|s| !s.is_empty()),
            },
        }
    }
}
