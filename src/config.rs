use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::request::DEFAULT_SCANNER_CACHING;

pub const ENV_QUORUM: &str = "CFTABLE_QUORUM";
pub const ENV_CLIENT_PORT: &str = "CFTABLE_CLIENT_PORT";
pub const ENV_ZNODE_PARENT: &str = "CFTABLE_ZNODE_PARENT";
pub const ENV_SCANNER_CACHING: &str = "CFTABLE_SCANNER_CACHING";

/// Connection settings, built once at startup and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Hosts of the coordination service (default: localhost)
    pub quorum: Vec<String>,

    /// Coordination service client port (default: 2181)
    pub client_port: u16,

    /// Root node under which the cluster registers itself (default: /hbase)
    pub znode_parent: String,

    /// Rows fetched per scanner round trip when a Scan does not say (default: 100)
    pub scanner_caching: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            quorum: vec!["localhost".to_string()],
            client_port: 2181,
            znode_parent: "/hbase".to_string(),
            scanner_caching: DEFAULT_SCANNER_CACHING,
        }
    }
}

impl ClientConfig {
    /// Create a new config pointing at the given coordination hosts
    pub fn new<I, S>(quorum: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            quorum: quorum.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Set the coordination client port
    pub fn client_port(mut self, port: u16) -> Self {
        self.client_port = port;
        self
    }

    /// Set the cluster root node
    pub fn znode_parent(mut self, parent: impl Into<String>) -> Self {
        self.znode_parent = parent.into();
        self
    }

    /// Set default scanner caching
    pub fn scanner_caching(mut self, rows: usize) -> Self {
        self.scanner_caching = rows;
        self
    }

    /// Loads a YAML site file. Keys left out keep their defaults.
    pub fn from_site_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml_ng::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Builds a config from `CFTABLE_*` environment variables on top of the
    /// defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(quorum) = lookup(ENV_QUORUM) {
            config.quorum = quorum
                .split(',')
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(port) = lookup(ENV_CLIENT_PORT) {
            config.client_port = port
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("{}={}: {}", ENV_CLIENT_PORT, port, e)))?;
        }
        if let Some(parent) = lookup(ENV_ZNODE_PARENT) {
            config.znode_parent = parent;
        }
        if let Some(caching) = lookup(ENV_SCANNER_CACHING) {
            config.scanner_caching = caching.trim().parse().map_err(|e| {
                Error::Config(format!("{}={}: {}", ENV_SCANNER_CACHING, caching, e))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.quorum.is_empty() {
            return Err(Error::Config("coordination quorum is empty".to_string()));
        }
        if self.quorum.iter().any(|h| h.trim().is_empty()) {
            return Err(Error::Config("coordination quorum has a blank host".to_string()));
        }
        if self.client_port == 0 {
            return Err(Error::Config("client port must be non-zero".to_string()));
        }
        if !self.znode_parent.starts_with('/') {
            return Err(Error::Config(format!(
                "znode parent {} must be an absolute path",
                self.znode_parent
            )));
        }
        if self.scanner_caching == 0 {
            return Err(Error::Config("scanner caching must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Renders the coordination address as `host:port,host:port,...`.
    /// Hosts that already name a port keep it.
    pub fn coordination_address(&self) -> String {
        self.quorum
            .iter()
            .map(|host| {
                if host.contains(':') {
                    host.clone()
                } else {
                    format!("{}:{}", host, self.client_port)
                }
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}
