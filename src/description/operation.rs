use http::Method;
use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

use super::param::{ParamKind, ParamSpec};
use crate::fault::ServiceError;
use crate::message::{Args, Reply, RequestContext, ResponseContext};
use crate::negotiate::MessageFormat;
use crate::policy::OperationBehavior;

/// Everything a handler sees for one call.
pub struct Invocation<'a> {
    /// Bound arguments, one slot per declared parameter.
    pub args: Args,
    pub request: &'a RequestContext,
    pub response: &'a mut ResponseContext,
}

type HandlerFn = dyn Fn(&(dyn Any + Send + Sync), &mut Invocation<'_>) -> Result<Reply, ServiceError>
    + Send
    + Sync;

/// A type-erased handler bound to the service type it expects.
#[derive(Clone)]
pub struct Handler {
    service_type: TypeId,
    service_type_name: &'static str,
    func: Arc<HandlerFn>,
}

impl Handler {
    pub fn new<S, F, R>(f: F) -> Self
    where
        S: Any + Send + Sync,
        F: Fn(&S, &mut Invocation<'_>) -> Result<R, ServiceError> + Send + Sync + 'static,
        R: Into<Reply>,
    {
        let func = move |instance: &(dyn Any + Send + Sync),
                         call: &mut Invocation<'_>|
              -> Result<Reply, ServiceError> {
            let service = instance.downcast_ref::<S>().ok_or_else(|| {
                ServiceError::invalid_operation(format!(
                    "service instance is not a {}",
                    type_name::<S>()
                ))
            })?;
            f(service, call).map(Into::into)
        };
        Self {
            service_type: TypeId::of::<S>(),
            service_type_name: type_name::<S>(),
            func: Arc::new(func),
        }
    }

    pub fn service_type(&self) -> TypeId {
        self.service_type
    }

    pub fn service_type_name(&self) -> &'static str {
        self.service_type_name
    }

    pub(crate) fn invoke(
        &self,
        instance: &(dyn Any + Send + Sync),
        call: &mut Invocation<'_>,
    ) -> Result<Reply, ServiceError> {
        (self.func)(instance, call)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("service_type", &self.service_type_name)
            .finish()
    }
}

/// One operation of a contract.
#[derive(Clone)]
pub struct OperationDescriptor {
    name: Arc<str>,
    method: Method,
    template: String,
    params: Vec<ParamSpec>,
    format: Option<MessageFormat>,
    handler: Option<Handler>,
    behaviors: Vec<Arc<dyn OperationBehavior>>,
}

impl OperationDescriptor {
    /// Describe an operation. The name defaults to `"<METHOD> <template>"`.
    pub fn new(method: Method, template: impl Into<String>) -> Self {
        let template = template.into();
        Self {
            name: Arc::from(format!("{method} {template}")),
            method,
            template,
            params: Vec::new(),
            format: None,
            handler: None,
            behaviors: Vec::new(),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Arc::from(name);
        self
    }

    /// Declare the next positional parameter.
    pub fn param(mut self, name: &str, kind: ParamKind) -> Self {
        self.params.push(ParamSpec::new(name, kind));
        self
    }

    /// Pin the response format, bypassing negotiation.
    pub fn with_format(mut self, format: MessageFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_behavior(mut self, behavior: Arc<dyn OperationBehavior>) -> Self {
        self.behaviors.push(behavior);
        self
    }

    /// Attach the handler. `S` is the service type the handler runs against.
    pub fn handler<S, F, R>(mut self, f: F) -> Self
    where
        S: Any + Send + Sync,
        F: Fn(&S, &mut Invocation<'_>) -> Result<R, ServiceError> + Send + Sync + 'static,
        R: Into<Reply>,
    {
        self.handler = Some(Handler::new(f));
        self
    }

    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn format(&self) -> Option<MessageFormat> {
        self.format
    }

    pub fn handler_ref(&self) -> Option<&Handler> {
        self.handler.as_ref()
    }

    pub fn behaviors(&self) -> &[Arc<dyn OperationBehavior>] {
        &self.behaviors
    }
}

impl fmt::Debug for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationDescriptor")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("template", &self.template)
            .field("params", &self.params)
            .field("format", &self.format)
            .field("handler", &self.handler)
            .field("behaviors", &self.behaviors.len())
            .finish()
    }
}
