use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::TryOnError;

pub const DEFAULT_ARK_BASE_URL: &str = "https://ark.cn-beijing.volces.com/api/v3";
pub const DEFAULT_ARK_MODEL: &str = "doubao-seedream-4-0-250828";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_INLINE_LIMIT_BYTES: usize = 1024 * 1024;
pub const DEFAULT_MEMORY_LIMIT_BYTES: usize = 256 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Volcengine,
    Gemini,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Volcengine => "volcengine",
            ProviderKind::Gemini => "gemini",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = TryOnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "volcengine" | "ark" | "seedream" => Ok(ProviderKind::Volcengine),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            other => Err(TryOnError::ConfigError(format!(
                "Unsupported image provider: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VolcengineConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

/// Per-call transport deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub garment: Duration,
    pub try_on: Duration,
    pub fetch: Duration,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub root_dir: Option<PathBuf>,
    /// Base URL the server is reachable on; stored blobs are linked under `/blobs`.
    pub public_base_url: Option<String>,
    /// Byte budget of the in-memory backend.
    pub memory_limit_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: Option<u16>,
    /// Raw provider name; parsed when the selector resolves it.
    pub provider: String,
    pub volcengine: VolcengineConfig,
    pub gemini: GeminiConfig,
    pub timeouts: Timeouts,
    pub storage: StorageConfig,
    /// Longest base64 result the proxy returns inline.
    pub inline_limit_bytes: usize,
}

impl Default for VolcengineConfig {
    fn default() -> Self {
        VolcengineConfig {
            api_key: None,
            base_url: DEFAULT_ARK_BASE_URL.to_string(),
            model: DEFAULT_ARK_MODEL.to_string(),
        }
    }
}

impl VolcengineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        VolcengineConfig {
            api_key: non_empty_var("ARK_API_KEY"),
            base_url: non_empty_var("ARK_BASE_URL").unwrap_or(defaults.base_url),
            model: non_empty_var("ARK_MODEL").unwrap_or(defaults.model),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            api_key: None,
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
        }
    }
}

impl GeminiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        GeminiConfig {
            api_key: non_empty_var("GEMINI_API_KEY"),
            base_url: non_empty_var("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            model: non_empty_var("GEMINI_MODEL").unwrap_or(defaults.model),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts {
            garment: Duration::from_secs(60),
            try_on: Duration::from_secs(120),
            fetch: Duration::from_secs(30),
        }
    }
}

impl Timeouts {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Timeouts {
            garment: secs_var("GARMENT_TIMEOUT_SECS").unwrap_or(defaults.garment),
            try_on: secs_var("TRY_ON_TIMEOUT_SECS").unwrap_or(defaults.try_on),
            fetch: secs_var("FETCH_TIMEOUT_SECS").unwrap_or(defaults.fetch),
        }
    }

    pub fn uniform(timeout: Duration) -> Self {
        Timeouts {
            garment: timeout,
            try_on: timeout,
            fetch: timeout,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            root_dir: None,
            public_base_url: None,
            memory_limit_bytes: DEFAULT_MEMORY_LIMIT_BYTES,
        }
    }
}

impl StorageConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        StorageConfig {
            root_dir: non_empty_var("TRYON_STORAGE_DIR").map(PathBuf::from),
            public_base_url: non_empty_var("TRYON_PUBLIC_URL"),
            memory_limit_bytes: env::var("TRYON_MEMORY_LIMIT_BYTES")
                .ok()
                .and_then(|val| val.parse().ok())
                .unwrap_or(DEFAULT_MEMORY_LIMIT_BYTES),
        }
    }

    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit_bytes = bytes;
        self
    }

    pub fn with_root_dir(mut self, root_dir: impl Into<PathBuf>) -> Self {
        self.root_dir = Some(root_dir.into());
        self
    }

    pub fn with_public_base_url(mut self, url: impl Into<String>) -> Self {
        self.public_base_url = Some(url.into());
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: None,
            provider: ProviderKind::Volcengine.as_str().to_string(),
            volcengine: VolcengineConfig::default(),
            gemini: GeminiConfig::default(),
            timeouts: Timeouts::default(),
            storage: StorageConfig::default(),
            inline_limit_bytes: DEFAULT_INLINE_LIMIT_BYTES,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let port = env::var("PORT").ok().and_then(|port| port.parse().ok());
        let provider = non_empty_var("IMAGE_PROVIDER")
            .unwrap_or_else(|| ProviderKind::Volcengine.as_str().to_string());
        let inline_limit_bytes = env::var("PROXY_INLINE_LIMIT_BYTES")
            .ok()
            .and_then(|val| val.parse().ok())
            .unwrap_or(DEFAULT_INLINE_LIMIT_BYTES);

        Config {
            port,
            provider,
            volcengine: VolcengineConfig::from_env(),
            gemini: GeminiConfig::from_env(),
            timeouts: Timeouts::from_env(),
            storage: StorageConfig::from_env(),
            inline_limit_bytes,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    pub fn with_volcengine(mut self, config: VolcengineConfig) -> Self {
        self.volcengine = config;
        self
    }

    pub fn with_gemini(mut self, config: GeminiConfig) -> Self {
        self.gemini = config;
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_inline_limit(mut self, bytes: usize) -> Self {
        self.inline_limit_bytes = bytes;
        self
    }

    pub fn provider_kind(&self) -> Result<ProviderKind, TryOnError> {
        self.provider.parse()
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|val| !val.trim().is_empty())
}

fn secs_var(key: &str) -> Option<Duration> {
    env::var(key)
        .ok()
        .and_then(|val| val.parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_names_parse_case_insensitively() {
        assert_eq!(
            "Gemini".parse::<ProviderKind>().unwrap(),
            ProviderKind::Gemini
        );
        assert_eq!(
            " volcengine ".parse::<ProviderKind>().unwrap(),
            ProviderKind::Volcengine
        );
    }

    #[test]
    fn unknown_provider_is_a_config_error() {
        let err = "dalle".parse::<ProviderKind>().unwrap_err();
        assert!(matches!(err, TryOnError::ConfigError(_)));
        assert!(err.to_string().contains("dalle"));
    }

    #[test]
    fn defaults_match_reference_deployment() {
        let config = Config::new();
        assert_eq!(config.provider_kind().unwrap(), ProviderKind::Volcengine);
        assert_eq!(config.timeouts.garment, Duration::from_secs(60));
        assert_eq!(config.timeouts.try_on, Duration::from_secs(120));
        assert_eq!(config.volcengine.model, DEFAULT_ARK_MODEL);
        assert!(config.volcengine.api_key.is_none());
        assert!(config.gemini.api_key.is_none());
        assert_eq!(config.inline_limit_bytes, 1024 * 1024);
        assert_eq!(config.storage.memory_limit_bytes, DEFAULT_MEMORY_LIMIT_BYTES);
        assert!(config.storage.public_base_url.is_none());
    }

    #[test]
    fn builders_override_defaults() {
        let config = Config::new()
            .with_provider("gemini")
            .with_gemini(GeminiConfig::new().with_api_key("g-key").with_model("m"))
            .with_inline_limit(10);
        assert_eq!(config.provider_kind().unwrap(), ProviderKind::Gemini);
        assert_eq!(config.gemini.api_key.as_deref(), Some("g-key"));
        assert_eq!(config.gemini.model, "m");
        assert_eq!(config.inline_limit_bytes, 10);
    }
}
