use crate::description::{EndpointDescriptor, OperationDescriptor};
use crate::dispatcher::{EndpointDispatcher, OperationDispatcher, ServiceDispatcher};
use crate::fault::ServiceError;
use crate::message::{RequestContext, ResponseContext};

/// Service-wide check applied to every request before endpoint dispatch.
pub trait ServicePolicy: Send + Sync {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn apply(&self, request: &mut RequestContext) -> Result<(), ServiceError>;

    /// Downcast hook for policies that issue authentication challenges.
    fn as_authorization(&self) -> Option<&dyn AuthorizationPolicy> {
        None
    }
}

/// A service policy that can challenge the client on `401`.
pub trait AuthorizationPolicy: ServicePolicy {
    fn add_challenge_header(&self, response: &mut ResponseContext, error: &ServiceError);
}

/// Per-operation check applied after route binding.
pub trait OperationPolicy: Send + Sync {
    fn apply(
        &self,
        operation: &OperationDescriptor,
        request: &RequestContext,
    ) -> Result<(), ServiceError>;
}

/// Endpoint-level request/response observer.
pub trait MessageInspector: Send + Sync {
    fn after_receive_request(
        &self,
        _request: &mut RequestContext,
        _response: &mut ResponseContext,
    ) -> Result<(), ServiceError> {
        Ok(())
    }

    fn before_send_response(&self, _request: &RequestContext, _response: &mut ResponseContext) {}
}

pub trait ServiceBehavior: Send + Sync {
    fn apply_service_behavior(&self, dispatcher: &mut ServiceDispatcher);
}

pub trait EndpointBehavior: Send + Sync {
    fn apply_endpoint_behavior(
        &self,
        endpoint: &EndpointDescriptor,
        dispatcher: &mut EndpointDispatcher,
    );
}

pub trait OperationBehavior: Send + Sync {
    fn apply_operation_behavior(
        &self,
        operation: &OperationDescriptor,
        dispatcher: &mut OperationDispatcher,
    );
}
