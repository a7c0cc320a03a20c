use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::Path;

use tokio::fs;

use serde::Deserialize;
use thiserror::Error;

use crate::llm::ProviderKind;

// ============================================================================
// Config (root)
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Upstream providers in priority order.
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            dispatch: DispatchConfig::default(),
            providers: default_providers(),
        }
    }
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::Io(e)),
        };
        let config: Self = serde_saphyr::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for provider in &self.providers {
            if provider.id.is_empty() {
                return Err(ConfigError::Invalid("provider id must not be empty".to_string()));
            }
            if !seen.insert(provider.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate provider id '{}'",
                    provider.id
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// ServerConfig
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    300
}

// ============================================================================
// DispatchConfig
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct DispatchConfig {
    /// Pause between synthesized chunks. Zero disables pacing.
    #[serde(default = "default_chunk_delay")]
    pub chunk_delay_ms: u64,
    /// Upstream error bodies are cut to this many characters in logs.
    #[serde(default = "default_error_excerpt")]
    pub error_excerpt_chars: usize,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    /// Give up on a provider that has not replied within this many seconds.
    #[serde(default = "default_attempt_timeout")]
    pub attempt_timeout_seconds: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            chunk_delay_ms: default_chunk_delay(),
            error_excerpt_chars: default_error_excerpt(),
            connect_timeout_seconds: default_connect_timeout(),
            attempt_timeout_seconds: default_attempt_timeout(),
        }
    }
}

fn default_chunk_delay() -> u64 {
    30
}

fn default_error_excerpt() -> usize {
    200
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_attempt_timeout() -> u64 {
    30
}

// ============================================================================
// ProviderConfig
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    pub kind: ProviderKind,
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the credential.
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Call the provider even when no credential is present.
    #[serde(default)]
    pub anonymous: bool,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

/// Groq, Google, Cohere, Hugging Face, then OpenAI.
pub fn default_providers() -> Vec<ProviderConfig> {
    let provider = |id: &str, kind, base_url: &str, model: &str, env: &str| ProviderConfig {
        id: id.to_string(),
        kind,
        base_url: base_url.to_string(),
        model: model.to_string(),
        api_key_env: Some(env.to_string()),
        anonymous: false,
        temperature: Some(0.7),
        max_tokens: Some(1000),
    };

    vec![
        provider(
            "groq",
            ProviderKind::OpenAI,
            "https://api.groq.com/openai/v1",
            "llama-3.1-8b-instant",
            "GROQ_API_KEY",
        ),
        provider(
            "google",
            ProviderKind::Gemini,
            "https://generativelanguage.googleapis.com/v1beta",
            "gemini-pro",
            "GOOGLE_API_KEY",
        ),
        ProviderConfig {
            temperature: None,
            max_tokens: None,
            ..provider(
                "cohere",
                ProviderKind::Cohere,
                "https://api.cohere.ai/v1",
                "command-light",
                "COHERE_API_KEY",
            )
        },
        ProviderConfig {
            anonymous: true,
            max_tokens: Some(500),
            ..provider(
                "huggingface",
                ProviderKind::HuggingFace,
                "https://api-inference.huggingface.co/models",
                "microsoft/DialoGPT-medium",
                "HUGGINGFACE_API_KEY",
            )
        },
        provider(
            "openai",
            ProviderKind::OpenAI,
            "https://api.openai.com/v1",
            "gpt-3.5-turbo",
            "OPENAI_API_KEY",
        ),
    ]
}

// ============================================================================
// Credentials
// ============================================================================

/// Provider credentials resolved once at startup, keyed by variable name.
#[derive(Clone, Default)]
pub struct Credentials {
    values: HashMap<String, String>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every variable named by `providers` from the process environment.
    /// Empty values count as absent.
    pub fn from_env(providers: &[ProviderConfig]) -> Self {
        let mut credentials = Self::new();
        for name in providers.iter().filter_map(|p| p.api_key_env.as_deref()) {
            if let Ok(value) = std::env::var(name) {
                credentials.insert(name, value);
            }
        }
        credentials
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        if !value.trim().is_empty() {
            self.values.insert(name.into(), value);
        }
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

// ============================================================================
// ConfigError
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_saphyr::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.request_timeout_seconds, 300);
        assert_eq!(config.dispatch.chunk_delay_ms, 30);
        assert_eq!(config.dispatch.error_excerpt_chars, 200);
        assert_eq!(config.dispatch.connect_timeout_seconds, 10);
        assert_eq!(config.dispatch.attempt_timeout_seconds, 30);
    }

    #[test]
    fn test_default_provider_order() {
        let ids: Vec<_> = default_providers().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, ["groq", "google", "cohere", "huggingface", "openai"]);

        let hf = default_providers()
            .into_iter()
            .find(|p| p.id == "huggingface")
            .unwrap();
        assert!(hf.anonymous);
        assert_eq!(hf.kind, ProviderKind::HuggingFace);
        assert_eq!(hf.max_tokens, Some(500));
    }

    #[tokio::test]
    async fn test_load_missing_file_returns_defaults() {
        let tmp_dir = TempDir::new().unwrap();
        let missing_path = tmp_dir.path().join("missing-config.yaml");
        let config = Config::load(&missing_path).await.unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.providers.len(), 5);
    }

    #[tokio::test]
    async fn test_load_valid_yaml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
server:
  host: "127.0.0.1"
  port: 3000
  request_timeout_seconds: 60
dispatch:
  chunk_delay_ms: 0
  attempt_timeout_seconds: 5
providers:
  - id: local
    kind: openai
    base_url: "http://localhost:11434/v1"
    model: "llama3"
    anonymous: true
  - id: gemini
    kind: gemini
    base_url: "https://generativelanguage.googleapis.com/v1beta"
    model: "gemini-1.5-pro"
    api_key_env: GOOGLE_API_KEY
    temperature: 0.2
"#
        )
        .unwrap();

        let config = Config::load(file.path()).await.unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.request_timeout_seconds, 60);
        assert_eq!(config.dispatch.chunk_delay_ms, 0);
        assert_eq!(config.dispatch.error_excerpt_chars, 200); // default
        assert_eq!(config.dispatch.attempt_timeout_seconds, 5);

        assert_eq!(config.providers.len(), 2);
        assert_eq!(config.providers[0].id, "local");
        assert!(config.providers[0].anonymous);
        assert!(config.providers[0].api_key_env.is_none());
        assert_eq!(config.providers[1].kind, ProviderKind::Gemini);
        assert_eq!(config.providers[1].temperature, Some(0.2));
        assert_eq!(config.providers[1].max_tokens, None);
    }

    #[tokio::test]
    async fn test_load_partial_yaml_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
server:
  port: 9000
"#
        )
        .unwrap();

        let config = Config::load(file.path()).await.unwrap();
        assert_eq!(config.server.host, "0.0.0.0"); // default
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.dispatch.chunk_delay_ms, 30); // default
        assert_eq!(config.providers.len(), 5); // default
    }

    #[tokio::test]
    async fn test_load_empty_provider_list() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "providers: []").unwrap();

        let config = Config::load(file.path()).await.unwrap();
        assert!(config.providers.is_empty());
    }

    #[tokio::test]
    async fn test_load_duplicate_provider_ids() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
providers:
  - {{ id: a, kind: openai, base_url: "http://x", model: m }}
  - {{ id: a, kind: cohere, base_url: "http://y", model: m }}
"#
        )
        .unwrap();

        let err = Config::load(file.path()).await.unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("duplicate provider id 'a'"));
    }

    #[tokio::test]
    async fn test_load_unknown_provider_kind() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
providers:
  - {{ id: a, kind: mistral, base_url: "http://x", model: m }}
"#
        )
        .unwrap();

        assert!(Config::load(file.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_load_invalid_yaml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "invalid: yaml: content: [").unwrap();

        let result = Config::load(file.path()).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_credentials_ignore_blank_values() {
        let credentials = Credentials::new()
            .with("GROQ_API_KEY", "gsk")
            .with("OPENAI_API_KEY", "   ");
        assert_eq!(credentials.get("GROQ_API_KEY"), Some("gsk"));
        assert_eq!(credentials.get("OPENAI_API_KEY"), None);
        assert_eq!(credentials.get("COHERE_API_KEY"), None);
    }

    #[test]
    fn test_credentials_debug_hides_values() {
        let credentials = Credentials::new().with("GROQ_API_KEY", "gsk-secret");
        let debug = format!("{credentials:?}");
        assert!(debug.contains("GROQ_API_KEY"));
        assert!(!debug.contains("gsk-secret"));
    }

    #[test]
    fn test_config_error_display() {
        let io_error = ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "test",
        ));
        assert!(io_error.to_string().contains("failed to read config file"));
    }
}
