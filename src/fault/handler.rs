use http::StatusCode;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, warn};

use super::diagnostic::render_diagnostic_page;
use super::error::ServiceError;
use crate::dispatcher::panic_message;
use crate::message::{RequestContext, ResponseContext};
use crate::negotiate::{media, serialize_document};

/// Turns a request-time error into a response.
pub trait ErrorHandler: Send + Sync {
    /// Whether this handler claims `error`.
    fn handle_error(&self, error: &ServiceError) -> bool;

    fn provide_fault(
        &self,
        error: &ServiceError,
        request: &RequestContext,
        response: &mut ResponseContext,
    );
}

/// Catch-all handler: status from the error's classification, then the
/// fault's typed body or an HTML diagnostic page.
#[derive(Debug, Clone)]
pub struct DefaultErrorHandler {
    expose_diagnostics: bool,
}

impl DefaultErrorHandler {
    pub fn new(expose_diagnostics: bool) -> Self {
        Self { expose_diagnostics }
    }
}

impl ErrorHandler for DefaultErrorHandler {
    fn handle_error(&self, _error: &ServiceError) -> bool {
        true
    }

    fn provide_fault(
        &self,
        error: &ServiceError,
        request: &RequestContext,
        response: &mut ResponseContext,
    ) {
        let status = error.status();
        response.clear_payload();
        response.set_status(status);

        if let ServiceError::Fault(fault) = error {
            for (name, value) in fault.headers() {
                response.set_header(name, value.as_str());
            }
        }

        if status == StatusCode::UNAUTHORIZED {
            for policy in request.applied_policies() {
                if let Some(auth) = policy.as_authorization() {
                    auth.add_challenge_header(response, error);
                }
            }
        }

        if let Some(body) = match error {
            ServiceError::Fault(fault) => fault.body(),
            _ => None,
        } {
            match serialize_document(body, request, response) {
                Ok(()) => return,
                Err(e) => warn!(
                    request_id = %request.request_id(),
                    body_type = body.type_name(),
                    error = %e,
                    "Fault body could not be serialised; falling back to HTML"
                ),
            }
        }

        response.set_content_type(media::TEXT_HTML);
        response.set_body(render_diagnostic_page(error, self.expose_diagnostics));
    }
}

/// Ordered error handlers ending in a [`DefaultErrorHandler`].
#[derive(Clone)]
pub struct ErrorHandlerChain {
    handlers: Vec<Arc<dyn ErrorHandler>>,
    fallback: DefaultErrorHandler,
}

impl ErrorHandlerChain {
    pub fn new(expose_diagnostics: bool) -> Self {
        Self {
            handlers: Vec::new(),
            fallback: DefaultErrorHandler::new(expose_diagnostics),
        }
    }

    /// Register a handler ahead of the default one.
    pub fn push(&mut self, handler: Arc<dyn ErrorHandler>) {
        self.handlers.push(handler);
    }

    /// Registered handlers, not counting the default.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Let the first claiming handler write the fault response.
    pub fn handle(&self, error: &ServiceError, request: &RequestContext, response: &mut ResponseContext) {
        let provided = panic::catch_unwind(AssertUnwindSafe(|| {
            let handler: &dyn ErrorHandler = self
                .handlers
                .iter()
                .find(|h| h.handle_error(error))
                .map(|h| h.as_ref())
                .unwrap_or(&self.fallback);
            handler.provide_fault(error, request, response);
        }));
        if let Err(payload) = provided {
            error!(
                request_id = %request.request_id(),
                panic_message = %panic_message(payload.as_ref()),
                "Error handler panicked"
            );
            response.clear_payload();
            response.set_status(StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}

impl std::fmt::Debug for ErrorHandlerChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorHandlerChain")
            .field("handlers", &self.handlers.len())
            .field("fallback", &self.fallback)
            .finish()
    }
}
