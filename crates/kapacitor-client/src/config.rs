use serde::{Deserialize, Serialize};

use crate::client::parse_host;
use crate::stats::DEFAULT_ALERT_NODE_PREFIX;

pub const DEFAULT_HOST: &str = "http://localhost:9092";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the Kapacitor service
    #[serde(default = "default_host")]
    pub host: String,

    /// Per-request timeout applied by the HTTP transport
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Task stats nodes whose name starts with this prefix are alert nodes
    #[serde(default = "default_alert_node_prefix")]
    pub alert_node_prefix: String,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_alert_node_prefix() -> String {
    DEFAULT_ALERT_NODE_PREFIX.to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            timeout_secs: default_timeout_secs(),
            alert_node_prefix: default_alert_node_prefix(),
        }
    }
}

impl ClientConfig {
    pub fn load() -> crate::Result<Self> {
        // Load environment variables from .env file if it exists
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from `KAPACITOR_*` variables resolved through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout_secs = match lookup("KAPACITOR_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                crate::Error::Config(format!("KAPACITOR_TIMEOUT_SECS is not a number: {:?}", raw))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let config = ClientConfig {
            host: lookup("KAPACITOR_URL").unwrap_or_else(default_host),
            timeout_secs,
            alert_node_prefix: lookup("KAPACITOR_ALERT_NODE_PREFIX")
                .unwrap_or_else(default_alert_node_prefix),
        };

        if config.host == DEFAULT_HOST {
            tracing::debug!("KAPACITOR_URL is not set, using {}", DEFAULT_HOST);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> crate::Result<()> {
        parse_host(&self.host)?;
        if self.timeout_secs == 0 {
            return Err(crate::Error::Config("Timeout must be at least one second".to_string()));
        }
        if self.alert_node_prefix.is_empty() {
            return Err(crate::Error::Config("Alert node prefix must not be empty".to_string()));
        }
        Ok(())
    }
}
