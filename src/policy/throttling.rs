use http::StatusCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use super::core::{EndpointBehavior, MessageInspector, ServiceBehavior};
use crate::description::EndpointDescriptor;
use crate::dispatcher::{EndpointDispatcher, ServiceDispatcher};
use crate::fault::{Fault, ServiceError};
use crate::message::{RequestContext, ResponseContext};

/// `Retry-After` advertised on `429` responses, in seconds.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 1200;

/// Counts in-flight requests and rejects those above the limit.
#[derive(Debug)]
pub struct ThrottlingInspector {
    in_flight: AtomicUsize,
    max_concurrency: usize,
    retry_after_secs: u64,
}

impl ThrottlingInspector {
    pub fn new(max_concurrency: usize, retry_after_secs: u64) -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            max_concurrency: max_concurrency.max(1),
            retry_after_secs,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }
}

impl MessageInspector for ThrottlingInspector {
    fn after_receive_request(
        &self,
        request: &mut RequestContext,
        response: &mut ResponseContext,
    ) -> Result<(), ServiceError> {
        let load = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        if load > self.max_concurrency {
            warn!(
                request_id = %request.request_id(),
                in_flight = load,
                max_concurrency = self.max_concurrency,
                "Request throttled"
            );
            response.set_header("Retry-After", self.retry_after_secs.to_string());
            return Err(Fault::new(StatusCode::TOO_MANY_REQUESTS, "Too Many Requests").into());
        }
        Ok(())
    }

    fn before_send_response(&self, _request: &RequestContext, _response: &mut ResponseContext) {
        if self
            .in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_err()
        {
            debug!("Throttling counter already at zero");
        }
    }
}

/// Installs a [`ThrottlingInspector`].
///
/// As a service behavior one counter is shared by every endpoint; as an
/// endpoint behavior each endpoint it is attached to shares this
/// behavior's counter.
#[derive(Debug, Clone)]
pub struct ServiceThrottlingBehavior {
    inspector: Arc<ThrottlingInspector>,
}

impl ServiceThrottlingBehavior {
    pub fn new(max_concurrency: usize) -> Self {
        Self::with_retry_after(max_concurrency, DEFAULT_RETRY_AFTER_SECS)
    }

    pub fn with_retry_after(max_concurrency: usize, retry_after_secs: u64) -> Self {
        Self {
            inspector: Arc::new(ThrottlingInspector::new(max_concurrency, retry_after_secs)),
        }
    }

    /// Twice the available cores.
    pub fn for_available_cores() -> Self {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::new(cores * 2)
    }

    pub fn inspector(&self) -> &Arc<ThrottlingInspector> {
        &self.inspector
    }
}

impl ServiceBehavior for ServiceThrottlingBehavior {
    fn apply_service_behavior(&self, dispatcher: &mut ServiceDispatcher) {
        for endpoint in dispatcher.endpoints_mut() {
            endpoint.add_inspector(Arc::clone(&self.inspector) as Arc<dyn MessageInspector>);
        }
        debug!(
            service = %dispatcher.name(),
            max_concurrency = self.inspector.max_concurrency,
            "Throttling installed"
        );
    }
}

impl EndpointBehavior for ServiceThrottlingBehavior {
    fn apply_endpoint_behavior(
        &self,
        endpoint: &EndpointDescriptor,
        dispatcher: &mut EndpointDispatcher,
    ) {
        dispatcher.add_inspector(Arc::clone(&self.inspector) as Arc<dyn MessageInspector>);
        debug!(
            endpoint = %endpoint.base_uri(),
            max_concurrency = self.inspector.max_concurrency,
            "Throttling installed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn rejects_above_limit_and_recovers() {
        let inspector = ThrottlingInspector::new(1, 30);
        let mut req = RequestContext::new(Method::GET, "http://h/");
        let mut first = ResponseContext::new();
        inspector.after_receive_request(&mut req, &mut first).unwrap();

        let mut second = ResponseContext::new();
        let err = inspector
            .after_receive_request(&mut req, &mut second)
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(second.header("retry-after"), Some("30"));

        inspector.before_send_response(&req, &mut second);
        inspector.before_send_response(&req, &mut first);
        assert_eq!(inspector.in_flight(), 0);

        let mut third = ResponseContext::new();
        inspector.after_receive_request(&mut req, &mut third).unwrap();
    }

    #[test]
    fn never_underflows() {
        let inspector = ThrottlingInspector::new(4, 1);
        let req = RequestContext::new(Method::GET, "http://h/");
        inspector.before_send_response(&req, &mut ResponseContext::new());
        assert_eq!(inspector.in_flight(), 0);
    }
}
