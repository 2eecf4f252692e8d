//! Client configuration loaded from TOML and the environment

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::trace;

const ENV_BASE_URL: &str = "TERMINGA_BASE_URL";
const ENV_USERNAME: &str = "TERMINGA_USERNAME";
const ENV_PASSWORD: &str = "TERMINGA_PASSWORD";
const ENV_TOKEN: &str = "TERMINGA_TOKEN";

const DEFAULT_AUTHOR: &str = "terminga";

/// Credentials sent with every API request
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Auth {
    /// HTTP basic authentication against an Icinga API user
    Basic {
        username: String,
        #[serde(default)]
        password: Option<String>,
    },

    /// Bearer token, used by API translation proxies
    Token { token: String },
}

impl Auth {
    pub fn username(&self) -> Option<&str> {
        match self {
            Auth::Basic { username, .. } => Some(username),
            Auth::Token { .. } => None,
        }
    }
}

/// Group restrictions applied when fetching state
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GroupFilters {
    pub host_groups: Option<Vec<String>>,
    pub service_groups: Option<Vec<String>>,
}

/// Everything the client needs, resolved before it is constructed
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// API root, e.g. `https://icinga.example.com:5665`
    pub base_url: String,

    pub auth: Option<Auth>,

    /// Validate the server's TLS certificate (default: true)
    #[serde(default = "default_ssl_verify")]
    pub ssl_verify: bool,

    #[serde(default)]
    pub use_group_filters: bool,

    #[serde(default)]
    pub group_filters: GroupFilters,

    /// Name recorded on acknowledgements and downtimes
    pub author: Option<String>,

    /// Per-request timeout in seconds (default: 5)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_ssl_verify() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    5
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, auth: Option<Auth>) -> Self {
        Self {
            base_url: base_url.into(),
            auth,
            ssl_verify: default_ssl_verify(),
            use_group_filters: false,
            group_filters: GroupFilters::default(),
            author: None,
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Explicit author, else the API user, else the program name
    pub fn author(&self) -> &str {
        self.author
            .as_deref()
            .or_else(|| self.auth.as_ref().and_then(Auth::username))
            .unwrap_or(DEFAULT_AUTHOR)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Override connection settings from `TERMINGA_*` environment variables
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            self.base_url = base_url;
        }

        if let Some(token) = lookup(ENV_TOKEN) {
            self.auth = Some(Auth::Token { token });
            return;
        }

        let file_password = match &self.auth {
            Some(Auth::Basic { password, .. }) => password.clone(),
            _ => None,
        };
        let password = lookup(ENV_PASSWORD).or(file_password);
        let username = lookup(ENV_USERNAME)
            .or_else(|| self.auth.as_ref().and_then(Auth::username).map(str::to_string));

        if let Some(username) = username {
            self.auth = Some(Auth::Basic { username, password });
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            anyhow::bail!("base_url must not be empty");
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be greater than zero");
        }
        Ok(())
    }

    /// Load configuration from `path`, or from `~/.config/terminga/config.toml`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => default_config_path()
                .context("no configuration file given and no home directory found")?,
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.apply_env();
        config.validate()?;

        trace!(base_url = %config.base_url, "loaded config");
        Ok(config)
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config/terminga/config.toml"))
}
