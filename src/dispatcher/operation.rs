use http::Method;
use std::any::Any;
use std::backtrace::Backtrace;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

use super::service::ServiceDispatcher;
use crate::description::{Handler, Invocation, OperationDescriptor};
use crate::fault::{ConfigurationError, ServiceError};
use crate::message::{Args, Reply, RequestContext, ResponseContext};
use crate::negotiate::{deserialize_request, serialize_response};
use crate::policy::OperationPolicy;
use crate::route::CompiledRoute;

/// Runs one operation: bind, check, decode, invoke, serialise.
#[derive(Clone)]
pub struct OperationDispatcher {
    descriptor: Arc<OperationDescriptor>,
    handler: Handler,
    route: Arc<CompiledRoute>,
    policies: Vec<Arc<dyn OperationPolicy>>,
}

impl OperationDispatcher {
    /// Compile the operation's route. Fails fast on template or handler problems.
    pub fn new(descriptor: OperationDescriptor) -> Result<Self, ConfigurationError> {
        let handler = descriptor
            .handler_ref()
            .cloned()
            .ok_or_else(|| ConfigurationError::MissingHandler {
                operation: descriptor.name().to_string(),
            })?;
        let route = CompiledRoute::compile(descriptor.template(), descriptor.params())?;
        Ok(Self {
            descriptor: Arc::new(descriptor),
            handler,
            route: Arc::new(route),
            policies: Vec::new(),
        })
    }

    pub fn name(&self) -> &Arc<str> {
        self.descriptor.name()
    }

    pub fn method(&self) -> &Method {
        self.descriptor.method()
    }

    pub fn descriptor(&self) -> &OperationDescriptor {
        &self.descriptor
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub fn route(&self) -> &CompiledRoute {
        &self.route
    }

    pub fn policies(&self) -> &[Arc<dyn OperationPolicy>] {
        &self.policies
    }

    pub fn add_policy(&mut self, policy: Arc<dyn OperationPolicy>) {
        self.policies.push(policy);
    }

    /// Pure match test of an operation-relative path.
    pub fn can_dispatch(&self, path: &str) -> bool {
        self.route.is_match(path)
    }

    /// Run the operation. Failures are handed to the service's fault chain.
    pub fn dispatch(
        &self,
        service: &ServiceDispatcher,
        request: &RequestContext,
        response: &mut ResponseContext,
    ) {
        let start = Instant::now();
        match catch_panic(|| self.execute(service, request, response)) {
            Ok(()) => debug!(
                request_id = %request.request_id(),
                operation = %self.descriptor.name(),
                status = response.effective_status().as_u16(),
                duration_us = start.elapsed().as_micros() as u64,
                "Operation complete"
            ),
            Err(err) => service.handle_fault(&err, request, response),
        }
    }

    fn execute(
        &self,
        service: &ServiceDispatcher,
        request: &RequestContext,
        response: &mut ResponseContext,
    ) -> Result<(), ServiceError> {
        let path = request.operation_path().unwrap_or_default();
        let mut slots = self.route.bind(path)?;

        for policy in &self.policies {
            policy.apply(&self.descriptor, request)?;
        }

        let params = self.descriptor.params();
        deserialize_request(params, request, &mut slots)?;

        for (param, slot) in params.iter().zip(&slots) {
            if let Some(value) = slot {
                if !value.fits(&param.kind) {
                    return Err(ServiceError::bad_request(format!(
                        "parameter '{}' expects {} but received {}",
                        param.name,
                        param.kind.name(),
                        value.kind_name()
                    )));
                }
            }
        }

        if let Some(format) = self.descriptor.format() {
            response.set_format(format);
        }

        let instance = service.instance().resolve();
        let names = params.iter().map(|p| Arc::clone(&p.name)).collect();
        let mut call = Invocation {
            args: Args::new(names, slots),
            request,
            response: &mut *response,
        };
        let reply = self.invoke(instance.as_any(), &mut call)?;

        serialize_response(reply, request, response)
    }

    fn invoke(
        &self,
        instance: &(dyn Any + Send + Sync),
        call: &mut Invocation<'_>,
    ) -> Result<Reply, ServiceError> {
        let outcome = catch_panic(|| self.handler.invoke(instance, call));
        if let Err(ServiceError::Panicked { message, .. }) = &outcome {
            error!(
                request_id = %call.request.request_id(),
                operation = %self.descriptor.name(),
                panic_message = %message,
                "Handler panicked - CRITICAL"
            );
        }
        outcome
    }
}

impl fmt::Debug for OperationDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationDispatcher")
            .field("name", self.descriptor.name())
            .field("method", self.descriptor.method())
            .field("route", &self.route)
            .field("policies", &self.policies.len())
            .finish()
    }
}

/// Run `f`, turning a panic into [`ServiceError::Panicked`].
pub(crate) fn catch_panic<T>(
    f: impl FnOnce() -> Result<T, ServiceError>,
) -> Result<T, ServiceError> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        Err(ServiceError::Panicked {
            message: panic_message(payload.as_ref()),
            backtrace: Backtrace::capture().to_string(),
        })
    })
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
