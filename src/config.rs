//! Relay configuration
//!
//! Values come from an optional TOML file layered under environment variables
//! prefixed with `MILESTONE_RELAY`, using `__` between nested keys:
//!
//! ```toml
//! [server]
//! bind_address = "0.0.0.0"
//! port = 8080
//!
//! [github]
//! secret = "..."            # MILESTONE_RELAY__GITHUB__SECRET
//!
//! [slack]
//! oauth_token = "xoxb-..."  # MILESTONE_RELAY__SLACK__OAUTH_TOKEN
//! channel_id = "C0123456"   # MILESTONE_RELAY__SLACK__CHANNEL_ID
//! ```

use std::path::Path;

use config::{Config, Environment, File, FileFormat, Map};
use serde::Deserialize;
use thiserror::Error;

use crate::webhooks::body::DEFAULT_BODY_LIMIT;

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "MILESTONE_RELAY";

/// Default Slack Web API base URL
pub const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api/";

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// The configuration could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(#[from] config::ConfigError),

    /// The configuration file path is invalid.
    #[error("invalid configuration path: {0}")]
    InvalidPath(String),

    /// A required value is missing or empty.
    #[error("missing required configuration value `{0}`")]
    Missing(&'static str),
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub bind_address: String,
    /// Port to listen on
    pub port: u16,
    /// Largest webhook body accepted, in bytes
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8080,
            max_body_bytes: DEFAULT_BODY_LIMIT,
        }
    }
}

impl ServerConfig {
    /// Get the full bind address (ip:port)
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

#[derive(Clone, Default, Deserialize)]
pub struct GitHubConfig {
    /// Shared secret configured on the GitHub webhook
    #[serde(default)]
    pub secret: String,
}

#[derive(Clone, Deserialize)]
pub struct SlackConfig {
    /// Bot token sent as a bearer credential
    #[serde(default)]
    pub oauth_token: String,
    /// Channel the summaries are posted to
    #[serde(default)]
    pub channel_id: String,
    #[serde(default = "default_slack_api_url")]
    pub base_api_url: String,
}

fn default_slack_api_url() -> String {
    DEFAULT_SLACK_API_URL.to_string()
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            oauth_token: String::new(),
            channel_id: String::new(),
            base_api_url: default_slack_api_url(),
        }
    }
}

impl SlackConfig {
    /// Settings for a bot token and channel against the public Slack API
    pub fn new(oauth_token: impl Into<String>, channel_id: impl Into<String>) -> Self {
        Self {
            oauth_token: oauth_token.into(),
            channel_id: channel_id.into(),
            base_api_url: default_slack_api_url(),
        }
    }

    /// Point the notifier at a different API host (tests, proxies)
    pub fn with_base_api_url(mut self, url: impl Into<String>) -> Self {
        self.base_api_url = url.into();
        self
    }
}

impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("oauth_token", &"<redacted>")
            .field("channel_id", &self.channel_id)
            .field("base_api_url", &self.base_api_url)
            .finish()
    }
}

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub slack: SlackConfig,
}

impl RelayConfig {
    /// Load configuration from a TOML file plus environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or cannot be parsed, or
    /// if a required value is still missing after all sources are merged.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let path_str = path
            .to_str()
            .ok_or_else(|| ConfigError::InvalidPath(format!("{:?}", path)))?;

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path_str.to_string()));
        }

        Self::build(Some(path_str), None)
    }

    /// Load configuration from environment variables only.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::build(None, None)
    }

    /// Merge the sources. `env` replaces the process environment when given.
    ///
    /// Environment values stay strings until deserialization so secrets such
    /// as `007` are not rewritten as numbers.
    fn build(path: Option<&str>, env: Option<Map<String, String>>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .source(env),
            )
            .build()?;

        let relay: RelayConfig = config.try_deserialize()?;
        relay.validate()?;
        Ok(relay)
    }

    /// Reject configurations that cannot authenticate or deliver anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.github.secret.is_empty() {
            return Err(ConfigError::Missing("github.secret"));
        }
        if self.slack.oauth_token.is_empty() {
            return Err(ConfigError::Missing("slack.oauth_token"));
        }
        if self.slack.channel_id.is_empty() {
            return Err(ConfigError::Missing("slack.channel_id"));
        }
        if self.slack.base_api_url.is_empty() {
            return Err(ConfigError::Missing("slack.base_api_url"));
        }
        Ok(())
    }
}
