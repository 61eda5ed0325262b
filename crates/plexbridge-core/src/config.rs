//! Configuration loading and validation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default port of the bridge server.
pub const DEFAULT_PORT: u16 = 7890;

/// Default deadline for a submitted query, in milliseconds (10 minutes).
pub const DEFAULT_ASK_TIMEOUT_MS: u64 = 600_000;

/// Top-level PlexBridge configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeouts: Option<TimeoutsConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    /// Default deadline for `/ask` submissions, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ask_ms: Option<u64>,

    /// Upper bound for per-request `timeoutMs` overrides, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_ask_ms: Option<u64>,
}

impl Config {
    /// Load config from a JSON5 file. A missing file yields defaults.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(crate::error::BridgeError::Io)?;

        // Substitute ${ENV_VAR} references before parsing
        let substituted = substitute_env_vars(&raw);

        let config: Config = json5::from_str(&substituted)
            .map_err(|e| crate::error::BridgeError::Config(e.to_string()))?;

        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Resolve the default config file path.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("plexbridge")
            .join("config.json")
    }

    /// Server port.
    pub fn server_port(&self) -> u16 {
        self.server
            .as_ref()
            .and_then(|s| s.port)
            .unwrap_or(DEFAULT_PORT)
    }

    /// Server bind address.
    pub fn server_bind(&self) -> String {
        self.server
            .as_ref()
            .and_then(|s| s.bind.clone())
            .unwrap_or_else(|| "0.0.0.0".to_string())
    }

    /// Default `/ask` deadline in milliseconds.
    pub fn ask_timeout_ms(&self) -> u64 {
        self.timeouts
            .as_ref()
            .and_then(|t| t.ask_ms)
            .unwrap_or(DEFAULT_ASK_TIMEOUT_MS)
    }

    /// Upper bound for per-request deadline overrides. Defaults to the
    /// configured default deadline.
    pub fn max_ask_timeout_ms(&self) -> u64 {
        self.timeouts
            .as_ref()
            .and_then(|t| t.max_ask_ms)
            .unwrap_or_else(|| self.ask_timeout_ms())
    }
}

fn substitute_env_vars(input: &str) -> String {
    let re = regex::Regex::new(r"\$\{([^}]+)\}").unwrap();
    re.replace_all(input, |caps: &regex::Captures<'_>| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_default()
    })
    .into_owned()
}
