//! Host configuration file for the `resthost` binary.
//!
//! ```yaml
//! service:
//!   name: calculator
//!   instancing: singleton     # or per_call
//! endpoints:
//!   - base_uri: http://+:8080/calc
//! throttling:
//!   max_concurrency: 64
//!   retry_after_secs: 1200
//! auth:
//!   basic:
//!     realm: resthost
//!     users:
//!       alice: wonderland
//! log:
//!   level: info
//!   trace_requests: true
//! ```
//!
//! Every section except `service` is optional. Files ending in `.json` are
//! parsed as JSON, anything else as YAML.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::description::{BaseUri, InstanceMode};
use crate::policy::DEFAULT_RETRY_AFTER_SECS;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    pub service: ServiceSection,
    #[serde(default)]
    pub endpoints: Vec<EndpointSection>,
    #[serde(default)]
    pub throttling: Option<ThrottlingSection>,
    #[serde(default)]
    pub auth: Option<AuthSection>,
    #[serde(default)]
    pub log: LogSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceSection {
    pub name: String,
    #[serde(default)]
    pub instancing: InstanceMode,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            name: "resthost".to_string(),
            instancing: InstanceMode::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointSection {
    pub base_uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThrottlingSection {
    /// Defaults to twice the available cores.
    #[serde(default)]
    pub max_concurrency: Option<usize>,
    #[serde(default = "default_retry_after")]
    pub retry_after_secs: u64,
}

fn default_retry_after() -> u64 {
    DEFAULT_RETRY_AFTER_SECS
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthSection {
    #[serde(default)]
    pub basic: Option<BasicAuthSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BasicAuthSection {
    pub realm: String,
    #[serde(default)]
    pub users: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogSection {
    /// Overrides `RESTHOST_LOG_LEVEL` when set.
    #[serde(default)]
    pub level: Option<String>,
    /// Install the request tracing inspector on every endpoint.
    #[serde(default = "default_true")]
    pub trace_requests: bool,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: None,
            trace_requests: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl HostConfig {
    /// Read, parse and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config = if path.extension().is_some_and(|ext| ext == "json") {
            let config: Self = serde_json::from_str(&content)
                .with_context(|| format!("parsing JSON config {}", path.display()))?;
            config.validate()?;
            config
        } else {
            Self::from_yaml_str(&content)
                .with_context(|| format!("parsing YAML config {}", path.display()))?
        };
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check fields that serde cannot: base URI syntax and uniqueness.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.service.name.trim().is_empty() {
            bail!("service.name must not be empty");
        }
        let mut seen: Vec<String> = Vec::with_capacity(self.endpoints.len());
        for endpoint in &self.endpoints {
            let base = BaseUri::parse(&endpoint.base_uri)?.to_string().to_ascii_lowercase();
            if seen.contains(&base) {
                bail!("duplicate endpoint base_uri '{}'", endpoint.base_uri);
            }
            seen.push(base);
        }
        if let Some(throttling) = &self.throttling {
            if throttling.max_concurrency == Some(0) {
                bail!("throttling.max_concurrency must be greater than zero");
            }
        }
        Ok(())
    }
}
