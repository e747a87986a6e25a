use http::Method;
use regex::{Regex, RegexBuilder};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::operation::{catch_panic, OperationDispatcher};
use super::service::ServiceDispatcher;
use crate::description::{BaseUri, EndpointDescriptor};
use crate::fault::{ConfigurationError, ServiceError};
use crate::message::{RequestContext, ResponseContext};
use crate::policy::MessageInspector;

/// Selects an operation of one endpoint and brackets it with inspectors.
#[derive(Clone)]
pub struct EndpointDispatcher {
    base_uri: Arc<str>,
    contract: Arc<str>,
    prefix: Regex,
    operations: Vec<OperationDispatcher>,
    inspectors: Vec<Arc<dyn MessageInspector>>,
}

impl EndpointDispatcher {
    /// Compile the base-URI matcher and every operation route.
    pub fn new(endpoint: &EndpointDescriptor) -> Result<Self, ConfigurationError> {
        let base = endpoint.parsed_base_uri()?;
        let prefix = prefix_regex(&base).map_err(|e| ConfigurationError::InvalidBaseUri {
            uri: endpoint.base_uri().to_string(),
            reason: e.to_string(),
        })?;
        let operations = endpoint
            .contract()
            .operations()
            .iter()
            .cloned()
            .map(OperationDispatcher::new)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            base_uri = %endpoint.base_uri(),
            contract = %endpoint.contract().name(),
            operations = operations.len(),
            prefix = %prefix.as_str(),
            "Endpoint compiled"
        );

        Ok(Self {
            base_uri: Arc::clone(endpoint.base_uri()),
            contract: Arc::from(endpoint.contract().name()),
            prefix,
            operations,
            inspectors: Vec::new(),
        })
    }

    pub fn base_uri(&self) -> &Arc<str> {
        &self.base_uri
    }

    pub fn contract_name(&self) -> &str {
        &self.contract
    }

    pub fn operations(&self) -> &[OperationDispatcher] {
        &self.operations
    }

    pub fn operations_mut(&mut self) -> &mut [OperationDispatcher] {
        &mut self.operations
    }

    pub fn inspectors(&self) -> &[Arc<dyn MessageInspector>] {
        &self.inspectors
    }

    pub fn add_inspector(&mut self, inspector: Arc<dyn MessageInspector>) {
        self.inspectors.push(inspector);
    }

    /// Pure prefix test of the request URL against the base URI.
    pub fn can_dispatch(&self, request: &RequestContext) -> bool {
        self.prefix.is_match(request.url())
    }

    /// URL remainder after the base URI, without query or fragment.
    pub fn operation_path(&self, url: &str) -> Option<String> {
        let end_of_base = self.prefix.captures(url)?.get(1)?.end();
        let rest = &url[end_of_base..];
        let end = rest.find(['?', '#']).unwrap_or(rest.len());
        Some(rest[..end].to_string())
    }

    /// Route to an operation. Inspector before-send hooks run whatever the outcome.
    pub fn dispatch(
        &self,
        service: &ServiceDispatcher,
        request: &mut RequestContext,
        response: &mut ResponseContext,
    ) {
        let mut received = 0;
        if let Err(err) = catch_panic(|| self.route(service, request, response, &mut received)) {
            service.handle_fault(&err, request, response);
        }
        for inspector in &self.inspectors[..received] {
            let sent = catch_panic(|| {
                inspector.before_send_response(request, response);
                Ok(())
            });
            if let Err(err) = sent {
                service.handle_fault(&err, request, response);
            }
        }
    }

    fn route(
        &self,
        service: &ServiceDispatcher,
        request: &mut RequestContext,
        response: &mut ResponseContext,
        received: &mut usize,
    ) -> Result<(), ServiceError> {
        let path = self.operation_path(request.url()).ok_or_else(|| {
            ServiceError::not_found(format!("Resource not Found - {}", request.url()))
        })?;
        request.set_operation_path(path.clone());

        for inspector in &self.inspectors {
            *received += 1;
            inspector.after_receive_request(request, response)?;
        }

        let candidates: Vec<&OperationDispatcher> = self
            .operations
            .iter()
            .filter(|op| op.can_dispatch(&path))
            .collect();

        if candidates.is_empty() {
            let mismatch = self
                .operations
                .iter()
                .filter(|op| op.method() == request.method())
                .find_map(|op| op.route().diagnose(&path));
            return Err(mismatch.unwrap_or_else(|| {
                ServiceError::not_found(format!("Resource not Found - {path}"))
            }));
        }

        let selected = candidates
            .iter()
            .find(|op| op.method() == request.method())
            .or_else(|| {
                (*request.method() == Method::HEAD)
                    .then(|| candidates.iter().find(|op| *op.method() == Method::GET))
                    .flatten()
            });

        let Some(operation) = selected else {
            let allow = candidates
                .iter()
                .map(|op| op.method().as_str())
                .collect::<Vec<_>>()
                .join(", ");
            response.set_header("Allow", allow);
            return Err(ServiceError::MethodNotAllowed(format!(
                "Method not permitted - {} {path}",
                request.method()
            )));
        };

        request.set_operation(Arc::clone(operation.name()));
        operation.dispatch(service, request, response);
        Ok(())
    }
}

impl fmt::Debug for EndpointDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointDispatcher")
            .field("base_uri", &self.base_uri)
            .field("contract", &self.contract)
            .field("prefix", &self.prefix.as_str())
            .field("operations", &self.operations)
            .field("inspectors", &self.inspectors.len())
            .finish()
    }
}

/// `^(<base>)(?:[/?#].*)?$`, with an any-host pattern for wildcard binds.
fn prefix_regex(base: &BaseUri) -> Result<Regex, regex::Error> {
    let host = if base.is_wildcard_host() {
        r"[^/:?#]+".to_string()
    } else {
        regex::escape(&base.host)
    };
    let default_port = if base.scheme == "https" { 443 } else { 80 };
    let port = match base.port {
        Some(p) if p == default_port => format!("(?::{p})?"),
        Some(p) => format!(":{p}"),
        None => format!("(?::{default_port})?"),
    };
    let pattern = format!(
        r"^({}://{}{}{})(?:[/?#].*)?$",
        regex::escape(&base.scheme),
        host,
        port,
        regex::escape(&base.path)
    );
    RegexBuilder::new(&pattern).case_insensitive(true).build()
}
