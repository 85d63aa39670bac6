//! Configuration management for strudel-ai
//!
//! Values resolve from the process environment first, then from
//! ~/.config/strudel-ai/config.json. API keys are read from the environment only.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use strudel_ai_core::Provider;
use url::Url;

pub const DEFAULT_BIND: &str = "127.0.0.1:4321";
pub const DEFAULT_BASE_PATH: &str = "/";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";

/// Variables that may come from either source. API keys are never read from the file.
const OVERRIDABLE_VARS: [&str; 10] = [
    "ANTHROPIC_MODEL",
    "ANTHROPIC_MAX_TOKENS",
    "ANTHROPIC_SUGGESTIONS_MODEL",
    "ANTHROPIC_SUGGESTIONS_MAX_TOKENS",
    "ANTHROPIC_BASE_URL",
    "OPENAI_MODEL",
    "OPENAI_MAX_TOKENS",
    "OPENAI_SUGGESTIONS_MODEL",
    "OPENAI_SUGGESTIONS_MAX_TOKENS",
    "OPENAI_BASE_URL",
];

/// What a request asks the model to do. Each task has its own defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    Edit,
    Suggestions,
    Compose,
}

impl Task {
    pub fn label(self) -> &'static str {
        match self {
            Task::Edit => "edit",
            Task::Suggestions => "suggestions",
            Task::Compose => "compose",
        }
    }
}

/// Resolved model parameters for one upstream call.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

struct TaskDefaults {
    model_var: &'static str,
    max_tokens_var: &'static str,
    model: &'static str,
    max_tokens: u32,
    temperature: f64,
}

fn task_defaults(task: Task, provider: Provider) -> TaskDefaults {
    match (task, provider) {
        (Task::Edit, Provider::Claude) => TaskDefaults {
            model_var: "ANTHROPIC_MODEL",
            max_tokens_var: "ANTHROPIC_MAX_TOKENS",
            model: "claude-3-5-sonnet-20240620",
            max_tokens: 2048,
            temperature: 0.2,
        },
        (Task::Edit, Provider::OpenAi) => TaskDefaults {
            model_var: "OPENAI_MODEL",
            max_tokens_var: "OPENAI_MAX_TOKENS",
            model: "gpt-5-mini",
            max_tokens: 2048,
            temperature: 0.2,
        },
        (Task::Suggestions, Provider::Claude) => TaskDefaults {
            model_var: "ANTHROPIC_SUGGESTIONS_MODEL",
            max_tokens_var: "ANTHROPIC_SUGGESTIONS_MAX_TOKENS",
            model: "claude-3-5-haiku-20241022",
            max_tokens: 512,
            temperature: 0.4,
        },
        (Task::Suggestions, Provider::OpenAi) => TaskDefaults {
            model_var: "OPENAI_SUGGESTIONS_MODEL",
            max_tokens_var: "OPENAI_SUGGESTIONS_MAX_TOKENS",
            model: "gpt-5-mini",
            max_tokens: 512,
            temperature: 0.4,
        },
        (Task::Compose, Provider::Claude) => TaskDefaults {
            model_var: "ANTHROPIC_MODEL",
            max_tokens_var: "ANTHROPIC_MAX_TOKENS",
            model: "claude-sonnet-4-5-20250929",
            max_tokens: 2048,
            temperature: 0.7,
        },
        (Task::Compose, Provider::OpenAi) => TaskDefaults {
            model_var: "OPENAI_MODEL",
            max_tokens_var: "OPENAI_MAX_TOKENS",
            model: "gpt-5-mini",
            max_tokens: 2048,
            temperature: 0.7,
        },
    }
}

/// Numeric token limit, or `None` for anything that is not a positive finite number.
fn parse_max_tokens(value: &str) -> Option<u32> {
    let parsed = value.trim().parse::<f64>().ok()?;
    if !parsed.is_finite() || parsed < 1.0 {
        return None;
    }
    Some(parsed.min(u32::MAX as f64) as u32)
}

pub fn api_key_var(provider: Provider) -> &'static str {
    match provider {
        Provider::Claude => ANTHROPIC_API_KEY,
        Provider::OpenAi => OPENAI_API_KEY,
    }
}

/// On-disk settings. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub bind: Option<String>,
    pub base_path: Option<String>,
    pub request_timeout_secs: Option<u64>,
    /// Fallbacks for model, token and base URL variables, keyed by variable name.
    pub env: BTreeMap<String, String>,
}

impl FileConfig {
    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("strudel-ai"))
    }

    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.json"))
    }

    /// Load the config file, or return defaults when it is missing.
    ///
    /// A file that fails to parse is moved aside to `config.json.corrupt`.
    pub fn load(path: &Path) -> Self {
        let Ok(content) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str::<FileConfig>(&content) {
            Ok(config) => config,
            Err(err) => {
                preserve_corrupt_config(path, &content);
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "config file was corrupted; a backup was saved and defaults were loaded"
                );
                Self::default()
            }
        }
    }

    /// Get the config file location for display
    pub fn config_location() -> String {
        Self::default_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "~/.config/strudel-ai/config.json".to_string())
    }
}

fn preserve_corrupt_config(path: &Path, content: &str) {
    let corrupt_path = path.with_extension("json.corrupt");
    if fs::rename(path, &corrupt_path).is_err() {
        let _ = fs::write(&corrupt_path, content);
    }
}

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub base_path: String,
    pub request_timeout: Duration,
    pub anthropic_base_url: Url,
    pub openai_base_url: Url,
    vars: BTreeMap<&'static str, String>,
    api_keys: BTreeMap<Provider, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_sources(|_| None, &FileConfig::default())
            .expect("default base URLs should parse")
    }
}

fn parse_base_url(name: &str, value: &str) -> anyhow::Result<Url> {
    let mut url = Url::parse(value).with_context(|| format!("{name} is not a valid URL: {value}"))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

impl Config {
    /// Build from an environment lookup and a parsed config file. Empty
    /// values count as unset in both sources.
    pub fn from_sources<F>(lookup: F, file: &FileConfig) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());

        let mut vars = BTreeMap::new();
        for name in OVERRIDABLE_VARS {
            let value = non_empty(lookup(name)).or_else(|| non_empty(file.env.get(name).cloned()));
            if let Some(value) = value {
                vars.insert(name, value);
            }
        }

        let mut api_keys = BTreeMap::new();
        for provider in Provider::ALL {
            if let Some(key) = non_empty(lookup(api_key_var(provider))) {
                api_keys.insert(provider, key);
            }
        }

        let anthropic_base_url = parse_base_url(
            "ANTHROPIC_BASE_URL",
            vars.get("ANTHROPIC_BASE_URL")
                .map(String::as_str)
                .unwrap_or(DEFAULT_ANTHROPIC_BASE_URL),
        )?;
        let openai_base_url = parse_base_url(
            "OPENAI_BASE_URL",
            vars.get("OPENAI_BASE_URL")
                .map(String::as_str)
                .unwrap_or(DEFAULT_OPENAI_BASE_URL),
        )?;

        Ok(Self {
            bind: file.bind.clone().unwrap_or_else(|| DEFAULT_BIND.to_string()),
            base_path: file
                .base_path
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_PATH.to_string()),
            request_timeout: Duration::from_secs(
                file.request_timeout_secs
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            anthropic_base_url,
            openai_base_url,
            vars,
            api_keys,
        })
    }

    /// Load from the process environment and the config file at `path`
    /// (or the default location).
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let file = match path {
            Some(path) => FileConfig::load(path),
            None => FileConfig::default_path()
                .map(|path| FileConfig::load(&path))
                .unwrap_or_default(),
        };
        Self::from_sources(|name| std::env::var(name).ok(), &file)
    }

    pub fn api_key(&self, provider: Provider) -> Option<&str> {
        self.api_keys.get(&provider).map(String::as_str)
    }

    pub fn has_api_key(&self, provider: Provider) -> bool {
        self.api_keys.contains_key(&provider)
    }

    pub fn base_url(&self, provider: Provider) -> &Url {
        match provider {
            Provider::Claude => &self.anthropic_base_url,
            Provider::OpenAi => &self.openai_base_url,
        }
    }

    /// Model, token limit and temperature for `task` on `provider`.
    pub fn model_settings(&self, task: Task, provider: Provider) -> ModelSettings {
        let defaults = task_defaults(task, provider);
        let model = self
            .vars
            .get(defaults.model_var)
            .cloned()
            .unwrap_or_else(|| defaults.model.to_string());
        let max_tokens = self
            .vars
            .get(defaults.max_tokens_var)
            .and_then(|value| parse_max_tokens(value))
            .unwrap_or(defaults.max_tokens);
        ModelSettings {
            model,
            max_tokens,
            temperature: defaults.temperature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(env: &[(&str, &str)], file: &FileConfig) -> Config {
        let env: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_sources(|name| env.get(name).cloned(), file).unwrap()
    }

    #[test]
    fn test_defaults_per_task() {
        let config = Config::default();
        assert_eq!(
            config.model_settings(Task::Edit, Provider::Claude),
            ModelSettings {
                model: "claude-3-5-sonnet-20240620".into(),
                max_tokens: 2048,
                temperature: 0.2,
            }
        );
        assert_eq!(
            config.model_settings(Task::Suggestions, Provider::Claude),
            ModelSettings {
                model: "claude-3-5-haiku-20241022".into(),
                max_tokens: 512,
                temperature: 0.4,
            }
        );
        assert_eq!(
            config
                .model_settings(Task::Compose, Provider::Claude)
                .model,
            "claude-sonnet-4-5-20250929"
        );
        assert_eq!(
            config.model_settings(Task::Compose, Provider::OpenAi),
            ModelSettings {
                model: "gpt-5-mini".into(),
                max_tokens: 2048,
                temperature: 0.7,
            }
        );
        assert_eq!(config.bind, DEFAULT_BIND);
        assert_eq!(config.base_path, "/");
        assert_eq!(config.request_timeout, Duration::from_secs(120));
        assert_eq!(config.anthropic_base_url.as_str(), "https://api.anthropic.com/");
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = FileConfig {
            env: BTreeMap::from([
                ("ANTHROPIC_MODEL".to_string(), "from-file".to_string()),
                ("OPENAI_MODEL".to_string(), "file-openai".to_string()),
            ]),
            ..FileConfig::default()
        };
        let config = config_from(&[("ANTHROPIC_MODEL", "from-env"), ("OPENAI_MODEL", "")], &file);
        assert_eq!(
            config.model_settings(Task::Edit, Provider::Claude).model,
            "from-env"
        );
        assert_eq!(
            config.model_settings(Task::Compose, Provider::OpenAi).model,
            "file-openai"
        );
    }

    #[test]
    fn test_non_numeric_max_tokens_falls_back() {
        let config = config_from(
            &[
                ("ANTHROPIC_MAX_TOKENS", "lots"),
                ("ANTHROPIC_SUGGESTIONS_MAX_TOKENS", " 256 "),
                ("OPENAI_MAX_TOKENS", "-5"),
            ],
            &FileConfig::default(),
        );
        assert_eq!(config.model_settings(Task::Edit, Provider::Claude).max_tokens, 2048);
        assert_eq!(
            config
                .model_settings(Task::Suggestions, Provider::Claude)
                .max_tokens,
            256
        );
        assert_eq!(config.model_settings(Task::Compose, Provider::OpenAi).max_tokens, 2048);
    }

    #[test]
    fn test_api_keys_come_from_environment_only() {
        let file = FileConfig {
            env: BTreeMap::from([("OPENAI_API_KEY".to_string(), "sk-file".to_string())]),
            ..FileConfig::default()
        };
        let config = config_from(&[("ANTHROPIC_API_KEY", "sk-ant")], &file);
        assert_eq!(config.api_key(Provider::Claude), Some("sk-ant"));
        assert_eq!(config.api_key(Provider::OpenAi), None);
        assert!(!config.has_api_key(Provider::OpenAi));
    }

    #[test]
    fn test_empty_api_key_counts_as_unset() {
        let config = config_from(&[("ANTHROPIC_API_KEY", "")], &FileConfig::default());
        assert!(!config.has_api_key(Provider::Claude));
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let config = config_from(
            &[("OPENAI_BASE_URL", "http://127.0.0.1:9000/proxy")],
            &FileConfig::default(),
        );
        assert_eq!(
            config.base_url(Provider::OpenAi).as_str(),
            "http://127.0.0.1:9000/proxy/"
        );
    }

    #[test]
    fn test_invalid_base_url_is_an_error() {
        let err = Config::from_sources(
            |name| (name == "ANTHROPIC_BASE_URL").then(|| "not a url".to_string()),
            &FileConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("ANTHROPIC_BASE_URL"));
    }

    #[test]
    fn test_file_config_server_settings() {
        let file: FileConfig = serde_json::from_str(
            r#"{"bind": "0.0.0.0:8080", "base_path": "/strudel/", "request_timeout_secs": 30}"#,
        )
        .unwrap();
        let config = config_from(&[], &file);
        assert_eq!(config.bind, "0.0.0.0:8080");
        assert_eq!(config.base_path, "/strudel/");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_corrupt_config_is_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();

        let loaded = FileConfig::load(&path);

        assert_eq!(loaded, FileConfig::default());
        assert!(!path.exists());
        let backup = fs::read_to_string(dir.path().join("config.json.corrupt")).unwrap();
        assert_eq!(backup, "{not json");
    }

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = FileConfig::load(&dir.path().join("absent.json"));
        assert_eq!(loaded, FileConfig::default());
    }
}
