use crate::error::{BridgeError, Result};
use crate::translate::request::{TranslationPolicy, DEFAULT_MAX_TOKENS, DEFAULT_THINKING_BUDGET};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub vendor: VendorConfig,
    #[serde(default)]
    pub translation: TranslationConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub models: CatalogConfig,
}

/// The Claude Messages API endpoint the bridge talks to directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorConfig {
    #[serde(default = "default_vendor_base_url")]
    pub base_url: String,
    #[serde(default = "default_vendor_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_vendor_version")]
    pub version: String,
    /// Case-insensitive token a model id must contain to be routed here.
    #[serde(default = "default_brand")]
    pub brand: String,
    /// Whole-request deadline for unary calls.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Connection establishment deadline; for streams it bounds time-to-headers only.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    #[serde(default = "default_thinking_budget")]
    pub thinking_budget: u64,
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u64,
    #[serde(default)]
    pub hoist_system: bool,
}

/// OpenAI-compatible upstream used when the vendor API is not an option.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub catalog: Vec<String>,
}

fn default_port() -> u16 {
    8317
}

fn default_vendor_base_url() -> String {
    "https://api.anthropic.com/v1".to_string()
}

fn default_vendor_api_key_env() -> String {
    "CLAUDE_API_KEY".to_string()
}

fn default_vendor_version() -> String {
    "2023-06-01".to_string()
}

fn default_brand() -> String {
    "claude".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_thinking_budget() -> u64 {
    DEFAULT_THINKING_BUDGET
}

fn default_max_tokens() -> u64 {
    DEFAULT_MAX_TOKENS
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            vendor: VendorConfig::default(),
            translation: TranslationConfig::default(),
            gateway: GatewayConfig::default(),
            models: CatalogConfig::default(),
        }
    }
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            base_url: default_vendor_base_url(),
            api_key_env: default_vendor_api_key_env(),
            version: default_vendor_version(),
            brand: default_brand(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            thinking_budget: default_thinking_budget(),
            default_max_tokens: default_max_tokens(),
            hoist_system: false,
        }
    }
}

impl ProxyConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Search standard locations for a config file, falling back to defaults.
    /// Priority: CLI arg > CWD > XDG config > home dir
    pub fn find_and_load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::load(path);
        }

        for candidate in &config_search_paths() {
            if candidate.exists() {
                tracing::info!(path = %candidate.display(), "Loading config");
                return Self::load(candidate);
            }
        }

        tracing::info!("No config file found, using built-in defaults");
        Ok(Self::default())
    }

    fn validate(&self) -> Result<()> {
        if self.vendor.brand.trim().is_empty() {
            return Err(BridgeError::config("vendor.brand must not be empty"));
        }
        if self.translation.default_max_tokens <= self.translation.thinking_budget {
            return Err(BridgeError::config(format!(
                "translation.default_max_tokens ({}) must exceed translation.thinking_budget ({})",
                self.translation.default_max_tokens, self.translation.thinking_budget
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn translation_policy(&self) -> TranslationPolicy {
        TranslationPolicy {
            thinking_budget: self.translation.thinking_budget,
            default_max_tokens: self.translation.default_max_tokens,
            hoist_system: self.translation.hoist_system,
        }
    }

    /// Bearer token for the fallback gateway, if one is configured and set.
    #[must_use]
    pub fn gateway_api_key(&self) -> Option<String> {
        self.gateway
            .api_key_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok())
            .filter(|key| !key.is_empty())
    }
}

pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("claude-bridge.toml")];

    if cfg!(target_os = "macos") {
        if let Some(home) = home_dir() {
            paths.push(
                home.join("Library")
                    .join("Application Support")
                    .join("claude-bridge")
                    .join("config.toml"),
            );
        }
    } else {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg).join("claude-bridge").join("config.toml"));
        }
        if let Some(home) = home_dir() {
            paths.push(home.join(".config").join("claude-bridge").join("config.toml"));
        }
    }

    if let Some(home) = home_dir() {
        paths.push(home.join(".claude-bridge.toml"));
    }

    paths
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(
            f,
            r#"
port = 5000

[vendor]
api_key_env = "MY_CLAUDE_KEY"
timeout_secs = 30

[translation]
thinking_budget = 2048
default_max_tokens = 8192

[gateway]
base_url = "http://localhost:9000/v1"

[models]
catalog = ["claude-sonnet-4-6", "gemini-3.1-pro"]
"#
        )
        .unwrap();

        let config = ProxyConfig::load(f.path()).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.vendor.api_key_env, "MY_CLAUDE_KEY");
        assert_eq!(config.vendor.timeout_secs, 30);
        assert_eq!(config.vendor.version, "2023-06-01");
        assert_eq!(config.vendor.base_url, "https://api.anthropic.com/v1");
        assert_eq!(config.translation.thinking_budget, 2048);
        assert_eq!(
            config.gateway.base_url.as_deref(),
            Some("http://localhost:9000/v1")
        );
        assert_eq!(config.models.catalog.len(), 2);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let f = NamedTempFile::new().unwrap();
        let config = ProxyConfig::load(f.path()).unwrap();

        assert_eq!(config.port, 8317);
        assert_eq!(config.vendor.api_key_env, "CLAUDE_API_KEY");
        assert_eq!(config.vendor.brand, "claude");
        assert_eq!(config.vendor.timeout_secs, 60);

        let policy = config.translation_policy();
        assert_eq!(policy.thinking_budget, 10_000);
        assert!(!policy.hoist_system);
    }

    #[test]
    fn test_budget_must_fit_in_max_tokens() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(
            f,
            r#"
[translation]
thinking_budget = 20000
default_max_tokens = 16000
"#
        )
        .unwrap();

        let err = ProxyConfig::load(f.path()).unwrap_err();
        assert!(matches!(err, BridgeError::Config { .. }));
    }

    #[test]
    fn test_explicit_missing_path_is_an_error() {
        let err = ProxyConfig::find_and_load(Some(Path::new("/nonexistent/bridge.toml")))
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
