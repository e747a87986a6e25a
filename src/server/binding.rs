use std::sync::Arc;

use crate::description::EndpointDescriptor;
use crate::dispatcher::ServiceDispatcher;
use crate::fault::ConfigurationError;

/// Transport that feeds requests for one endpoint into a service dispatcher.
///
/// Implementations accept connections, build a
/// [`RequestContext`](crate::message::RequestContext) with an absolute URL,
/// call [`ServiceDispatcher::process`] and write the flushed response back
/// exactly once.
pub trait EndpointBinding: Send + Sync {
    /// Start serving `endpoint` through `dispatcher`.
    fn attach_endpoint(
        &self,
        dispatcher: Arc<ServiceDispatcher>,
        endpoint: &EndpointDescriptor,
    ) -> Result<(), ConfigurationError>;

    /// Stop serving `endpoint`. Unknown endpoints are ignored.
    fn detach_endpoint(&self, endpoint: &EndpointDescriptor);
}
