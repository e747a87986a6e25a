use std::sync::Arc;
use std::time::Instant;

use ::tracing::{info, warn};

use super::core::{EndpointBehavior, MessageInspector};
use crate::description::EndpointDescriptor;
use crate::dispatcher::EndpointDispatcher;
use crate::fault::ServiceError;
use crate::message::{RequestContext, ResponseContext};

const RECEIVED_AT_EXTENSION: &str = "tracing.received_at_us";

/// Logs each request on receipt and its outcome before send.
#[derive(Debug)]
pub struct TracingInspector {
    started: Instant,
}

impl Default for TracingInspector {
    fn default() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl MessageInspector for TracingInspector {
    fn after_receive_request(
        &self,
        request: &mut RequestContext,
        _response: &mut ResponseContext,
    ) -> Result<(), ServiceError> {
        info!(
            request_id = %request.request_id(),
            method = %request.method(),
            url = %request.url(),
            remote_addr = ?request.remote_addr(),
            "Request received"
        );
        let now_us = self.started.elapsed().as_micros() as u64;
        request.set_extension(RECEIVED_AT_EXTENSION, now_us.into());
        Ok(())
    }

    fn before_send_response(&self, request: &RequestContext, response: &mut ResponseContext) {
        let latency_us = request
            .extension(RECEIVED_AT_EXTENSION)
            .and_then(|v| v.as_u64())
            .map(|at| (self.started.elapsed().as_micros() as u64).saturating_sub(at));
        let status = response.effective_status();
        if status.is_server_error() {
            warn!(
                request_id = %request.request_id(),
                operation = ?request.operation(),
                status = status.as_u16(),
                latency_us = ?latency_us,
                "Response sent"
            );
        } else {
            info!(
                request_id = %request.request_id(),
                operation = ?request.operation(),
                status = status.as_u16(),
                latency_us = ?latency_us,
                "Response sent"
            );
        }
    }
}

/// Installs a [`TracingInspector`] on an endpoint.
#[derive(Debug, Default, Clone)]
pub struct TracingBehavior;

impl EndpointBehavior for TracingBehavior {
    fn apply_endpoint_behavior(
        &self,
        _endpoint: &EndpointDescriptor,
        dispatcher: &mut EndpointDispatcher,
    ) {
        dispatcher.add_inspector(Arc::new(TracingInspector::default()));
    }
}
