use std::fmt;
use std::sync::Arc;

use super::contract::ContractDescriptor;
use crate::fault::ConfigurationError;
use crate::policy::EndpointBehavior;
use crate::server::EndpointBinding;

/// Host spellings that mean "every interface".
const WILDCARD_HOSTS: [&str; 4] = ["+", "*", "0.0.0.0", "[::]"];

/// A parsed endpoint base URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUri {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
    /// Path prefix without a trailing slash; empty for the root.
    pub path: String,
}

impl BaseUri {
    pub fn parse(uri: &str) -> Result<Self, ConfigurationError> {
        let invalid = |reason: &str| ConfigurationError::InvalidBaseUri {
            uri: uri.to_string(),
            reason: reason.to_string(),
        };

        let (scheme, rest) = uri
            .split_once("://")
            .ok_or_else(|| invalid("missing scheme"))?;
        let scheme = scheme.to_ascii_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(invalid("scheme must be http or https"));
        }

        let (authority, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, ""),
        };
        if path.contains(['?', '#']) {
            return Err(invalid("query and fragment are not allowed"));
        }

        let (host, port) = match authority.rfind(':') {
            Some(i) if !authority[i..].contains(']') => {
                let port = authority[i + 1..]
                    .parse::<u16>()
                    .map_err(|_| invalid("port is not a number"))?;
                (&authority[..i], Some(port))
            }
            _ => (authority, None),
        };
        if host.is_empty() {
            return Err(invalid("missing host"));
        }

        Ok(Self {
            scheme,
            host: host.to_ascii_lowercase(),
            port,
            path: path.trim_end_matches('/').to_string(),
        })
    }

    pub fn is_wildcard_host(&self) -> bool {
        WILDCARD_HOSTS.contains(&self.host.as_str())
    }

    pub fn effective_port(&self) -> u16 {
        self.port
            .unwrap_or(if self.scheme == "https" { 443 } else { 80 })
    }

    /// Socket address a listener for this endpoint binds to.
    pub fn listen_addr(&self) -> String {
        let host = if self.is_wildcard_host() {
            "0.0.0.0"
        } else {
            self.host.as_str()
        };
        format!("{host}:{}", self.effective_port())
    }
}

impl fmt::Display for BaseUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        f.write_str(&self.path)
    }
}

/// A contract exposed at a base URI.
#[derive(Clone)]
pub struct EndpointDescriptor {
    base_uri: Arc<str>,
    contract: ContractDescriptor,
    behaviors: Vec<Arc<dyn EndpointBehavior>>,
    binding: Option<Arc<dyn EndpointBinding>>,
}

impl EndpointDescriptor {
    pub fn new(base_uri: &str, contract: ContractDescriptor) -> Self {
        Self {
            base_uri: Arc::from(base_uri),
            contract,
            behaviors: Vec::new(),
            binding: None,
        }
    }

    pub fn with_behavior(mut self, behavior: Arc<dyn EndpointBehavior>) -> Self {
        self.behaviors.push(behavior);
        self
    }

    pub fn with_binding(mut self, binding: Arc<dyn EndpointBinding>) -> Self {
        self.binding = Some(binding);
        self
    }

    pub fn base_uri(&self) -> &Arc<str> {
        &self.base_uri
    }

    pub fn parsed_base_uri(&self) -> Result<BaseUri, ConfigurationError> {
        BaseUri::parse(&self.base_uri)
    }

    pub fn contract(&self) -> &ContractDescriptor {
        &self.contract
    }

    pub fn behaviors(&self) -> &[Arc<dyn EndpointBehavior>] {
        &self.behaviors
    }

    pub fn binding(&self) -> Option<&Arc<dyn EndpointBinding>> {
        self.binding.as_ref()
    }
}

impl fmt::Debug for EndpointDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointDescriptor")
            .field("base_uri", &self.base_uri)
            .field("contract", &self.contract.name())
            .field("behaviors", &self.behaviors.len())
            .field("bound", &self.binding.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wildcard_base() {
        let base = BaseUri::parse("http://+:9200/fhir/").unwrap();
        assert!(base.is_wildcard_host());
        assert_eq!(base.port, Some(9200));
        assert_eq!(base.path, "/fhir");
        assert_eq!(base.listen_addr(), "0.0.0.0:9200");
        assert_eq!(base.to_string(), "http://+:9200/fhir");
    }

    #[test]
    fn default_ports() {
        assert_eq!(BaseUri::parse("http://example.com").unwrap().effective_port(), 80);
        assert_eq!(BaseUri::parse("https://Example.com/api").unwrap().effective_port(), 443);
    }

    #[test]
    fn ipv6_literal_without_port() {
        let base = BaseUri::parse("http://[::1]/api").unwrap();
        assert_eq!(base.host, "[::1]");
        assert_eq!(base.port, None);
    }

    #[test]
    fn rejects_bad_uris() {
        for uri in ["localhost:80/api", "ftp://h/x", "http://:80/", "http://h:port/", "http://h/x?y=1"] {
            assert!(
                matches!(BaseUri::parse(uri), Err(ConfigurationError::InvalidBaseUri { .. })),
                "{uri}"
            );
        }
    }
}
