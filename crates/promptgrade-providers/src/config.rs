//! Provider configuration and factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use promptgrade_core::grading::GradingConfig;
use promptgrade_core::traits::CompletionService;

use crate::mock::MockCompletion;
use crate::ollama::OllamaCompletion;
use crate::openai::OpenAiCompletion;

/// Configuration for a single completion backend.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in
/// logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    OpenAI {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        org_id: Option<String>,
    },
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
    },
    /// Deterministic mock backend; every call returns an empty object.
    Mock,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::OpenAI {
                api_key: _,
                base_url,
                org_id,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("org_id", org_id)
                .finish(),
            ProviderConfig::Ollama { base_url } => f
                .debug_struct("Ollama")
                .field("base_url", base_url)
                .finish(),
            ProviderConfig::Mock => f.debug_struct("Mock").finish(),
        }
    }
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

/// Top-level promptgrade configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptgradeConfig {
    /// Provider configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Default provider to use.
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Model used for grading completions.
    #[serde(default = "default_grading_model")]
    pub grading_model: String,
    /// Max simultaneous in-flight gradings per batch.
    #[serde(default = "default_parallelism")]
    pub grading_parallelism: usize,
    /// Per-request timeout for grading completions, in seconds.
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    /// Directory the file store keeps owner aggregates in.
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,
    /// Owner key the CLI operates on.
    #[serde(default = "default_owner")]
    pub owner: String,
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_grading_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_parallelism() -> usize {
    3
}
fn default_timeout() -> u64 {
    60
}
fn default_store_dir() -> PathBuf {
    PathBuf::from("./promptgrade-data")
}
fn default_owner() -> String {
    "default".to_string()
}

impl Default for PromptgradeConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider(),
            grading_model: default_grading_model(),
            grading_parallelism: default_parallelism(),
            request_timeout_secs: default_timeout(),
            store_dir: default_store_dir(),
            owner: default_owner(),
        }
    }
}

impl PromptgradeConfig {
    /// The grading-engine configuration this config describes.
    pub fn grading_config(&self) -> GradingConfig {
        GradingConfig {
            model: self.grading_model.clone(),
            parallelism: self.grading_parallelism,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Resolve env vars in a provider config.
fn resolve_provider_config(config: &ProviderConfig) -> ProviderConfig {
    match config {
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => ProviderConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
            org_id: org_id.as_ref().map(|o| resolve_env_vars(o)),
        },
        ProviderConfig::Ollama { base_url } => ProviderConfig::Ollama {
            base_url: resolve_env_vars(base_url),
        },
        ProviderConfig::Mock => ProviderConfig::Mock,
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `promptgrade.toml` in the current directory
/// 2. `~/.config/promptgrade/config.toml`
///
/// Environment variable override: `PROMPTGRADE_OPENAI_KEY`.
pub fn load_config() -> Result<PromptgradeConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<PromptgradeConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("promptgrade.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            if global.exists() {
                Some(global)
            } else {
                None
            }
        } else {
            None
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<PromptgradeConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => PromptgradeConfig::default(),
    };

    // Apply env var overrides
    if let Ok(key) = std::env::var("PROMPTGRADE_OPENAI_KEY") {
        config
            .providers
            .entry("openai".into())
            .or_insert(ProviderConfig::OpenAI {
                api_key: String::new(),
                base_url: None,
                org_id: None,
            });
        if let Some(ProviderConfig::OpenAI { api_key, .. }) = config.providers.get_mut("openai") {
            *api_key = key;
        }
    }

    // Resolve env vars in all provider configs
    let resolved: HashMap<String, ProviderConfig> = config
        .providers
        .iter()
        .map(|(k, v)| (k.clone(), resolve_provider_config(v)))
        .collect();
    config.providers = resolved;

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("promptgrade"))
}

/// Create a completion service from its configuration.
pub fn create_completion(
    name: &str,
    config: &ProviderConfig,
) -> Result<Box<dyn CompletionService>> {
    match config {
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => Ok(Box::new(OpenAiCompletion::new(
            api_key,
            base_url.clone(),
            org_id.clone(),
        ))),
        ProviderConfig::Ollama { base_url } => {
            let _ = name;
            Ok(Box::new(OllamaCompletion::new(base_url)))
        }
        ProviderConfig::Mock => Ok(Box::new(MockCompletion::with_fixed_response(
            serde_json::json!({}),
        ))),
    }
}
