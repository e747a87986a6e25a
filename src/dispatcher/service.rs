use http::Method;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, info_span};

use super::endpoint::EndpointDispatcher;
use super::operation::catch_panic;
use crate::description::InstanceProvider;
use crate::fault::{ErrorHandler, ErrorHandlerChain, ServiceError};
use crate::ids::REQUEST_ID_HEADER;
use crate::message::{FlushedResponse, RequestContext, ResponseContext};
use crate::policy::ServicePolicy;

/// Entry point of dispatch for one running service.
pub struct ServiceDispatcher {
    name: Arc<str>,
    instance: InstanceProvider,
    endpoints: Vec<EndpointDispatcher>,
    policies: Vec<Arc<dyn ServicePolicy>>,
    error_handlers: ErrorHandlerChain,
}

impl ServiceDispatcher {
    pub fn new(
        name: Arc<str>,
        instance: InstanceProvider,
        endpoints: Vec<EndpointDispatcher>,
        expose_diagnostics: bool,
    ) -> Self {
        Self {
            name,
            instance,
            endpoints,
            policies: Vec::new(),
            error_handlers: ErrorHandlerChain::new(expose_diagnostics),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instance(&self) -> &InstanceProvider {
        &self.instance
    }

    pub fn endpoints(&self) -> &[EndpointDispatcher] {
        &self.endpoints
    }

    pub fn endpoints_mut(&mut self) -> &mut [EndpointDispatcher] {
        &mut self.endpoints
    }

    pub fn policies(&self) -> &[Arc<dyn ServicePolicy>] {
        &self.policies
    }

    pub fn add_policy(&mut self, policy: Arc<dyn ServicePolicy>) {
        self.policies.push(policy);
    }

    /// Register an error handler ahead of the default one.
    pub fn add_error_handler(&mut self, handler: Arc<dyn ErrorHandler>) {
        self.error_handlers.push(handler);
    }

    /// Whether any endpoint claims the request URL.
    pub fn can_dispatch(&self, request: &RequestContext) -> bool {
        self.endpoints.iter().any(|e| e.can_dispatch(request))
    }

    /// Dispatch a request. Every outcome, including faults, ends up in `response`.
    pub fn dispatch(&self, request: &mut RequestContext, response: &mut ResponseContext) {
        let span = info_span!(
            "request",
            service = %self.name,
            request_id = %request.request_id(),
            method = %request.method(),
            url = %request.url(),
        );
        let _entered = span.enter();

        if let Err(err) = catch_panic(|| self.route(request, response)) {
            self.handle_fault(&err, request, response);
        }
    }

    /// Dispatch and flush in one step. Echoes the request id header.
    pub fn process(&self, mut request: RequestContext) -> FlushedResponse {
        let head = *request.method() == Method::HEAD;
        let mut response = ResponseContext::new();
        self.dispatch(&mut request, &mut response);
        response.set_header(REQUEST_ID_HEADER, request.request_id().to_string());
        response.into_flushed(head)
    }

    /// Log `error` and let the error handler chain write the response.
    pub fn handle_fault(
        &self,
        error: &ServiceError,
        request: &RequestContext,
        response: &mut ResponseContext,
    ) {
        let status = error.status();
        if status.is_server_error() {
            error!(
                request_id = %request.request_id(),
                operation = ?request.operation(),
                kind = error.kind(),
                status = status.as_u16(),
                error = %error,
                "Request faulted"
            );
        } else {
            info!(
                request_id = %request.request_id(),
                operation = ?request.operation(),
                kind = error.kind(),
                status = status.as_u16(),
                error = %error,
                "Request rejected"
            );
        }
        self.error_handlers.handle(error, request, response);
    }

    fn route(
        &self,
        request: &mut RequestContext,
        response: &mut ResponseContext,
    ) -> Result<(), ServiceError> {
        let endpoint = self
            .endpoints
            .iter()
            .find(|e| e.can_dispatch(request))
            .ok_or_else(|| {
                ServiceError::not_found(format!("Resource not Found - {}", request.url()))
            })?;
        request.set_endpoint(Arc::clone(endpoint.base_uri()));

        for policy in &self.policies {
            request.record_applied_policy(Arc::clone(policy));
            policy.apply(request)?;
        }

        endpoint.dispatch(self, request, response);
        Ok(())
    }
}

impl fmt::Debug for ServiceDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDispatcher")
            .field("name", &self.name)
            .field("instancing", &self.instance.mode())
            .field("endpoints", &self.endpoints)
            .field("policies", &self.policies.iter().map(|p| p.name()).collect::<Vec<_>>())
            .field("error_handlers", &self.error_handlers)
            .finish()
    }
}
