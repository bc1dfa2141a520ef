//! Client configuration.
//!
//! # Design
//! The mode is resolved exactly once, when a `ClientConfig` is built. After
//! that the config is immutable: fields are private and only exposed through
//! accessors. `Settings` is the loose, partially-filled form read from a JSON
//! file and environment variables; `Settings::into_config` validates it.
//!
//! ```json
//! { "mode": "Live", "client_id": "...", "secret": "...", "timeout_secs": 30 }
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::PlaidError;

pub const TEST_BASE_URL: &str = "https://tartan.plaid.com/";
pub const LIVE_BASE_URL: &str = "https://api.plaid.com/";
pub const TEST_CLIENT_ID: &str = "test_id";
pub const TEST_SECRET: &str = "test_secret";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Which Plaid environment to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Test,
    Live,
}

impl FromStr for Mode {
    type Err = PlaidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "test" => Ok(Mode::Test),
            "live" => Ok(Mode::Live),
            other => Err(PlaidError::Configuration(format!(
                "unknown Plaid mode '{other}', expected Test or Live"
            ))),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Test => write!(f, "Test"),
            Mode::Live => write!(f, "Live"),
        }
    }
}

/// Resolved, validated client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    mode: Mode,
    base_url: String,
    client_id: String,
    secret: String,
    timeout: Duration,
}

impl ClientConfig {
    /// Sandbox configuration with Plaid's public test credentials.
    pub fn test() -> Self {
        Self {
            mode: Mode::Test,
            base_url: TEST_BASE_URL.to_string(),
            client_id: TEST_CLIENT_ID.to_string(),
            secret: TEST_SECRET.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Production configuration. Both credentials must be non-empty.
    pub fn live(client_id: &str, secret: &str) -> Result<Self, PlaidError> {
        if client_id.trim().is_empty() {
            return Err(PlaidError::Configuration(
                "Plaid API client id is not set".to_string(),
            ));
        }
        if secret.trim().is_empty() {
            return Err(PlaidError::Configuration(
                "Plaid API secret is not set".to_string(),
            ));
        }
        Ok(Self {
            mode: Mode::Live,
            base_url: LIVE_BASE_URL.to_string(),
            client_id: client_id.to_string(),
            secret: secret.to_string(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Test mode ignores the supplied credentials.
    pub fn resolve(mode: Mode, client_id: &str, secret: &str) -> Result<Self, PlaidError> {
        match mode {
            Mode::Test => Ok(Self::test()),
            Mode::Live => Self::live(client_id, secret),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        let mut base_url = base_url.trim().to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        self.base_url = base_url;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Unvalidated settings from a file and/or the environment.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Settings {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Settings {
    /// Read settings from a JSON file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, PlaidError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no Plaid settings file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            PlaidError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            PlaidError::Configuration(format!("invalid settings in {}: {e}", path.display()))
        })
    }

    /// Override fields from `PLAID_*` environment variables.
    pub fn apply_env(self) -> Result<Self, PlaidError> {
        self.apply_lookup(|key| std::env::var(key).ok())
    }

    /// Override fields from an arbitrary variable lookup.
    pub fn apply_lookup<F>(mut self, lookup: F) -> Result<Self, PlaidError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(mode) = lookup("PLAID_MODE") {
            self.mode = Some(mode);
        }
        if let Some(client_id) = lookup("PLAID_CLIENT_ID") {
            self.client_id = Some(client_id);
        }
        if let Some(secret) = lookup("PLAID_SECRET") {
            self.secret = Some(secret);
        }
        if let Some(base_url) = lookup("PLAID_BASE_URL") {
            self.base_url = Some(base_url);
        }
        if let Some(timeout) = lookup("PLAID_TIMEOUT_SECS") {
            let secs = timeout.trim().parse().map_err(|_| {
                PlaidError::Configuration(format!("PLAID_TIMEOUT_SECS is not a number: '{timeout}'"))
            })?;
            self.timeout_secs = Some(secs);
        }
        Ok(self)
    }

    pub fn into_config(self) -> Result<ClientConfig, PlaidError> {
        let mode = match self.mode.as_deref() {
            Some(mode) => mode.parse()?,
            None => Mode::default(),
        };
        let mut config = ClientConfig::resolve(
            mode,
            self.client_id.as_deref().unwrap_or(""),
            self.secret.as_deref().unwrap_or(""),
        )?;
        if let Some(base_url) = self.base_url.as_deref() {
            if base_url.trim().is_empty() {
                return Err(PlaidError::Configuration("Plaid base url is empty".to_string()));
            }
            config = config.with_base_url(base_url);
        }
        if let Some(secs) = self.timeout_secs {
            if secs == 0 {
                return Err(PlaidError::Configuration(
                    "Plaid request timeout must be at least one second".to_string(),
                ));
            }
            config = config.with_timeout(Duration::from_secs(secs));
        }
        tracing::debug!(mode = %config.mode(), base_url = config.base_url(), "resolved Plaid config");
        Ok(config)
    }
}
