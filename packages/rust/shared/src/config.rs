//! Application configuration for TenderPilot.
//!
//! User config lives at `~/.tenderpilot/tenderpilot.toml`.
//! CLI flags override config file values, which override defaults.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TenderPilotError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "tenderpilot.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".tenderpilot";

/// Default database file name inside the config directory.
const DB_FILE_NAME: &str = "tenderpilot.db";

/// The open.canada.ca "new tender notices" resource.
pub const DEFAULT_DATASET_URL: &str = "https://open.canada.ca/data/dataset/6abd20d4-7a1c-4b38-baa2-9525d0bb2fd2/resource/05b804dd-11ec-4271-8d69-d6044e1a5481/download/f-new_tender_notices.csv";

/// Desktop browser user-agent sent when `spoof_user_agent` is enabled.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

// ---------------------------------------------------------------------------
// Config structs (matching tenderpilot.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where and how to download the tender dataset.
    #[serde(default)]
    pub dataset: DatasetConfig,

    /// Result rendering.
    #[serde(default)]
    pub display: DisplayConfig,

    /// LLM provider settings.
    #[serde(default)]
    pub ai: AiConfig,

    /// The bidder's profile, woven into AI prompts.
    #[serde(default)]
    pub profile: ProfileConfig,

    /// Local database settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// `[dataset]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// CSV download URL.
    #[serde(default = "default_dataset_url")]
    pub url: String,

    /// Send a desktop-browser user-agent instead of the TenderPilot one.
    #[serde(default)]
    pub spoof_user_agent: bool,

    /// Explicit user-agent; wins over `spoof_user_agent`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// HTTP timeout for the download, in seconds.
    #[serde(default = "default_dataset_timeout")]
    pub timeout_secs: u64,

    /// How long a stored snapshot is served before re-downloading.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_minutes: u64,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            url: default_dataset_url(),
            spoof_user_agent: false,
            user_agent: None,
            timeout_secs: default_dataset_timeout(),
            cache_ttl_minutes: default_cache_ttl(),
        }
    }
}

fn default_dataset_url() -> String {
    DEFAULT_DATASET_URL.into()
}
fn default_dataset_timeout() -> u64 {
    60
}
fn default_cache_ttl() -> u64 {
    60
}

/// `[display]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Rows shown when no limit is given.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> usize {
    10
}

/// Supported hosted LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    /// OpenAI chat completions (or any compatible endpoint).
    #[default]
    OpenAi,
    /// Google Gemini `generateContent`.
    Gemini,
}

impl AiProvider {
    /// Env var consulted when `api_key_env` is not configured.
    pub fn default_api_key_env(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
        }
    }

    /// API root used when `base_url` is not configured.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        }
    }

    /// Model used when `model` is not configured.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o-mini",
            Self::Gemini => "gemini-1.5-flash",
        }
    }
}

impl fmt::Display for AiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Gemini => write!(f, "gemini"),
        }
    }
}

impl std::str::FromStr for AiProvider {
    type Err = TenderPilotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "gemini" | "google" => Ok(Self::Gemini),
            other => Err(TenderPilotError::config(format!(
                "unknown AI provider '{other}': expected 'openai' or 'gemini'"
            ))),
        }
    }
}

/// `[ai]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Which provider to call.
    #[serde(default)]
    pub provider: AiProvider,

    /// Model ID; provider default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// API root; provider default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Completion token cap.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// HTTP timeout for completion calls, in seconds.
    #[serde(default = "default_ai_timeout")]
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: AiProvider::default(),
            model: None,
            base_url: None,
            api_key_env: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_ai_timeout(),
        }
    }
}

impl AiConfig {
    /// Effective model ID.
    pub fn model_id(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    /// Effective API root, without a trailing slash.
    pub fn endpoint(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
            .trim_end_matches('/')
    }

    /// Effective env var name for the API key.
    pub fn key_env(&self) -> &str {
        self.api_key_env
            .as_deref()
            .unwrap_or_else(|| self.provider.default_api_key_env())
    }
}

fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_ai_timeout() -> u64 {
    60
}

/// `[profile]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Bidding company name.
    #[serde(default = "default_company_name")]
    pub company_name: String,

    /// Free-text capabilities statement.
    #[serde(default)]
    pub capabilities: String,

    /// Person signing outreach emails.
    #[serde(default)]
    pub contact_name: String,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            company_name: default_company_name(),
            capabilities: String::new(),
            contact_name: String::new(),
        }
    }
}

fn default_company_name() -> String {
    "Our company".into()
}

/// `[storage]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database path; `~/.tenderpilot/tenderpilot.db` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.tenderpilot/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| TenderPilotError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.tenderpilot/tenderpilot.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Resolve the database path from config, defaulting under the config dir.
pub fn db_path(config: &AppConfig) -> Result<PathBuf> {
    match &config.storage.db_path {
        Some(p) => Ok(PathBuf::from(p)),
        None => Ok(config_dir()?.join(DB_FILE_NAME)),
    }
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| TenderPilotError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        TenderPilotError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| TenderPilotError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| TenderPilotError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| TenderPilotError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the API key for the configured provider from its env var.
pub fn resolve_api_key(config: &AiConfig) -> Result<String> {
    let var_name = config.key_env();
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val.trim().to_string()),
        _ => Err(TenderPilotError::config(format!(
            "{} API key not found. Set the {var_name} environment variable.",
            config.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("open.canada.ca"));
        assert!(toml_str.contains("provider = \"openai\""));
        assert!(toml_str.contains("page_size = 10"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[ai]
provider = "gemini"

[profile]
company_name = "Northwind Consulting"
capabilities = "Cloud migration, GC security clearance"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.ai.provider, AiProvider::Gemini);
        assert_eq!(config.ai.model_id(), "gemini-1.5-flash");
        assert_eq!(config.ai.key_env(), "GEMINI_API_KEY");
        assert_eq!(config.dataset.cache_ttl_minutes, 60);
        assert_eq!(config.profile.company_name, "Northwind Consulting");
        assert!(config.profile.contact_name.is_empty());
    }

    #[test]
    fn explicit_ai_settings_win() {
        let toml_str = r#"
[ai]
provider = "openai"
model = "gpt-4o"
base_url = "https://openrouter.ai/api/v1/"
api_key_env = "OPENROUTER_API_KEY"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.ai.model_id(), "gpt-4o");
        assert_eq!(config.ai.endpoint(), "https://openrouter.ai/api/v1");
        assert_eq!(config.ai.key_env(), "OPENROUTER_API_KEY");
    }

    #[test]
    fn provider_from_str() {
        assert_eq!("OpenAI".parse::<AiProvider>().unwrap(), AiProvider::OpenAi);
        assert_eq!("google".parse::<AiProvider>().unwrap(), AiProvider::Gemini);
        assert!("claude".parse::<AiProvider>().is_err());
    }

    #[test]
    fn db_path_override() {
        let mut config = AppConfig::default();
        config.storage.db_path = Some("/tmp/tp.db".into());
        assert_eq!(db_path(&config).unwrap(), PathBuf::from("/tmp/tp.db"));
    }

    #[test]
    fn api_key_missing() {
        let config = AiConfig {
            api_key_env: Some("TP_TEST_NONEXISTENT_KEY_12345".into()),
            ..AiConfig::default()
        };
        let result = resolve_api_key(&config);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("TP_TEST_NONEXISTENT_KEY_12345")
        );
    }
}
