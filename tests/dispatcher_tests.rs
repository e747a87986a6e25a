#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::dispatch::{get, request, sample_per_call, sample_singleton, send, start_with, url};
use http::{Method, StatusCode};
use parking_lot::Mutex;
use resthost::description::{
    ContractDescriptor, EndpointDescriptor, InstanceProvider, OperationDescriptor, ParamKind,
};
use resthost::dispatcher::{EndpointDispatcher, OperationDispatcher, ServiceDispatcher};
use resthost::message::{RequestContext, ResponseContext};
use resthost::policy::{EndpointBehavior, MessageInspector, OperationBehavior, OperationPolicy};
use resthost::sample::SampleStore;
use resthost::{RequestId, RestService, ServiceError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

#[derive(Default)]
struct Tally {
    calls: AtomicUsize,
}

fn tally_contract() -> ContractDescriptor {
    ContractDescriptor::new("Tally")
        .operation(
            OperationDescriptor::new(Method::GET, "/count")
                .named("Count")
                .handler(|svc: &Tally, _| Ok(svc.calls.fetch_add(1, Ordering::SeqCst) as u64 + 1)),
        )
        .operation(
            OperationDescriptor::new(Method::GET, "/explode")
                .named("Explode")
                .handler(|_: &Tally, _| -> Result<(), ServiceError> { panic!("handler exploded") }),
        )
        .operation(
            OperationDescriptor::new(Method::GET, "/item/{id}")
                .named("Item")
                .param("id", ParamKind::Uuid)
                .handler(|_: &Tally, call| Ok(call.args.uuid("id").unwrap_or_default().to_string())),
        )
        .operation(
            OperationDescriptor::new(Method::GET, "/guarded")
                .named("Guarded")
                .with_behavior(Arc::new(RequireHeaderBehavior))
                .handler(|_: &Tally, _| Ok("in")),
        )
}

struct RequireHeader;

impl OperationPolicy for RequireHeader {
    fn apply(
        &self,
        _operation: &OperationDescriptor,
        request: &RequestContext,
    ) -> Result<(), ServiceError> {
        request
            .header("x-api-key")
            .map(|_| ())
            .ok_or_else(|| ServiceError::bad_request("x-api-key header is required"))
    }
}

struct RequireHeaderBehavior;

impl OperationBehavior for RequireHeaderBehavior {
    fn apply_operation_behavior(
        &self,
        _operation: &OperationDescriptor,
        dispatcher: &mut OperationDispatcher,
    ) {
        dispatcher.add_policy(Arc::new(RequireHeader));
    }
}

#[test]
fn test_add_returns_plain_text_sum() {
    let (_service, dispatcher) = sample_singleton();
    let resp = get(&dispatcher, "/add/3/4");
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.header("content-type"), Some("text/plain"));
    assert_eq!(resp.body_str(), "7");
}

#[test]
fn test_non_numeric_segment_is_bad_request() {
    let (_service, dispatcher) = sample_singleton();
    let resp = get(&dispatcher, "/add/x/4");
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.header("content-type"), Some("text/html"));
}

#[test]
fn test_handler_error_maps_to_status() {
    let (_service, dispatcher) = sample_singleton();
    let resp = get(&dispatcher, "/add/2147483647/1");
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert!(resp.body_str().contains("overflows"), "{}", resp.body_str());
}

#[test]
fn test_empty_reply_is_no_content() {
    let (_service, dispatcher) = sample_singleton();
    let resp = get(&dispatcher, "/a");
    assert_eq!(resp.status, StatusCode::NO_CONTENT);
    assert!(resp.body.is_empty());
}

#[test]
fn test_wrong_verb_is_method_not_allowed_with_allow_header() {
    let (_service, dispatcher) = sample_singleton();

    let resp = send(&dispatcher, request(Method::POST, "/add/3/4"));
    assert_eq!(resp.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(resp.header("allow"), Some("GET"));

    let resp = send(&dispatcher, request(Method::PATCH, "/widgets"));
    assert_eq!(resp.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(resp.header("allow"), Some("GET, POST"));
}

#[test]
fn test_head_falls_back_to_get_without_body() {
    let (_service, dispatcher) = sample_singleton();
    let resp = send(&dispatcher, request(Method::HEAD, "/b"));
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.header("content-type"), Some("text/plain"));
    assert!(resp.body.is_empty());
}

#[test]
fn test_request_id_is_echoed() {
    let (_service, dispatcher) = sample_singleton();
    let id = RequestId::new().to_string();
    let resp = send(&dispatcher, request(Method::GET, "/b").with_header("X-Request-Id", &id));
    assert_eq!(resp.header("x-request-id"), Some(id.as_str()));

    let resp = get(&dispatcher, "/b");
    let minted = resp.header("x-request-id").unwrap();
    assert!(minted.parse::<RequestId>().is_ok());
    assert_ne!(minted, id);
}

#[test]
fn test_panicking_handler_is_internal_error() {
    let (_service, dispatcher) = start_with(RestService::singleton("tally", Tally::default()), tally_contract());
    let resp = get(&dispatcher, "/explode");
    assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(resp.body_str().contains("handler exploded"), "{}", resp.body_str());

    // The dispatcher keeps serving after a panic.
    assert_eq!(get(&dispatcher, "/count").status, StatusCode::OK);
}

#[test]
fn test_uuid_segments() {
    let (_service, dispatcher) = start_with(RestService::singleton("tally", Tally::default()), tally_contract());
    let id = "0b6f1c7e-9d7a-4b8e-a8a5-6c1f3e0d2b11";
    let resp = get(&dispatcher, &format!("/item/{id}"));
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body_str(), id);

    assert_eq!(get(&dispatcher, "/item/not-a-uuid").status, StatusCode::BAD_REQUEST);
}

#[test]
fn test_operation_policy_runs_before_handler() {
    let (_service, dispatcher) = start_with(RestService::singleton("tally", Tally::default()), tally_contract());
    assert_eq!(get(&dispatcher, "/guarded").status, StatusCode::BAD_REQUEST);

    let resp = send(&dispatcher, request(Method::GET, "/guarded").with_header("X-Api-Key", "k"));
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body_str(), "in");
}

#[test]
fn test_singleton_shares_one_instance() {
    let (_service, dispatcher) = start_with(RestService::singleton("tally", Tally::default()), tally_contract());
    assert_eq!(get(&dispatcher, "/count").body_str(), "1");
    assert_eq!(get(&dispatcher, "/count").body_str(), "2");
    assert_eq!(get(&dispatcher, "/count").body_str(), "3");
}

#[test]
fn test_per_call_builds_an_instance_per_request() {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&built);
    let service = RestService::per_call("tally", move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Tally::default()
    });
    let (_service, dispatcher) = start_with(service, tally_contract());

    assert_eq!(get(&dispatcher, "/count").body_str(), "1");
    assert_eq!(get(&dispatcher, "/count").body_str(), "1");
    assert_eq!(built.load(Ordering::SeqCst), 2);
}

/// Handler instance that holds every caller until a second one arrives.
struct Rendezvous {
    barrier: Arc<Barrier>,
}

fn rendezvous_contract() -> ContractDescriptor {
    ContractDescriptor::new("Rendezvous").operation(
        OperationDescriptor::new(Method::GET, "/meet").handler(|svc: &Rendezvous, _| {
            svc.barrier.wait();
            Ok(svc as *const Rendezvous as usize as u64)
        }),
    )
}

fn meet_concurrently(dispatcher: &ServiceDispatcher) -> Vec<String> {
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..2)
            .map(|_| scope.spawn(|| get(dispatcher, "/meet")))
            .collect();
        handles
            .into_iter()
            .map(|h| {
                let resp = h.join().unwrap();
                assert_eq!(resp.status, StatusCode::OK);
                resp.body_str().to_string()
            })
            .collect()
    })
}

#[test]
fn test_concurrent_requests_share_the_singleton() {
    let service = RestService::singleton("meet", Rendezvous { barrier: Arc::new(Barrier::new(2)) });
    let (_service, dispatcher) = start_with(service, rendezvous_contract());
    let seen = meet_concurrently(&dispatcher);
    assert_eq!(seen[0], seen[1]);
}

#[test]
fn test_concurrent_per_call_requests_get_distinct_instances() {
    let barrier = Arc::new(Barrier::new(2));
    let built = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&built);
    let service = RestService::per_call("meet", move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Rendezvous { barrier: Arc::clone(&barrier) }
    });
    let (_service, dispatcher) = start_with(service, rendezvous_contract());
    let seen = meet_concurrently(&dispatcher);
    assert_ne!(seen[0], seen[1]);
    assert_eq!(built.load(Ordering::SeqCst), 2);
}

#[test]
fn test_singleton_counts_every_parallel_request() {
    const REQUESTS: usize = 32;
    let (_service, dispatcher) = start_with(RestService::singleton("tally", Tally::default()), tally_contract());

    let mut results: Vec<u64> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..REQUESTS)
            .map(|_| scope.spawn(|| get(&dispatcher, "/count").body_str().parse::<u64>().unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    results.sort_unstable();
    assert_eq!(results, (1..=REQUESTS as u64).collect::<Vec<_>>());

    let resolved = match dispatcher.instance() {
        InstanceProvider::Singleton(instance) => instance.downcast_ref::<Tally>().unwrap().calls.load(Ordering::SeqCst),
        InstanceProvider::PerCall(_) => panic!("hosted as a singleton"),
    };
    assert_eq!(resolved, REQUESTS);
}

#[test]
fn test_per_call_builds_one_instance_per_parallel_request() {
    const REQUESTS: usize = 32;
    let built = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&built);
    let service = RestService::per_call("tally", move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Tally::default()
    });
    let (_service, dispatcher) = start_with(service, tally_contract());

    std::thread::scope(|scope| {
        for _ in 0..REQUESTS {
            scope.spawn(|| assert_eq!(get(&dispatcher, "/count").body_str(), "1"));
        }
    });
    assert_eq!(built.load(Ordering::SeqCst), REQUESTS);
}

#[test]
fn test_per_call_instances_share_an_external_store() {
    let store = Arc::new(SampleStore::new());
    let (_service, dispatcher) = sample_per_call(Arc::clone(&store));

    let created = send(
        &dispatcher,
        request(Method::POST, "/widgets")
            .with_header("Content-Type", "application/json")
            .with_body(r#"{"name":"w1","value":5}"#),
    );
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(store.len(), 1);
    assert_eq!(store.get("widgets", "w1").map(|s| s.value), Some(5));
}

#[test]
fn test_crud_flow() {
    let (_service, dispatcher) = sample_singleton();
    let json = |method: Method, path: &str, body: &str| {
        request(method, path)
            .with_header("Content-Type", "application/json")
            .with_header("Accept", "application/json")
            .with_body(body.to_string())
    };

    let created = send(&dispatcher, json(Method::POST, "/widgets", r#"{"name":"w1","value":1}"#));
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.header("location"), Some("/widgets/w1"));

    let updated = send(&dispatcher, json(Method::PUT, "/widgets/w1", r#"{"name":"renamed","value":9}"#));
    assert_eq!(updated.status, StatusCode::OK);
    let body: serde_json::Value = serde_json::from_slice(&updated.body).unwrap();
    assert_eq!(body["name"], "w1");
    assert_eq!(body["value"], 9);

    let missing = send(&dispatcher, json(Method::PUT, "/widgets/nope", r#"{"name":"nope","value":0}"#));
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    assert_eq!(send(&dispatcher, request(Method::DELETE, "/widgets/w1")).status, StatusCode::NO_CONTENT);
    assert_eq!(send(&dispatcher, request(Method::DELETE, "/widgets/w1")).status, StatusCode::NOT_FOUND);
    assert_eq!(get(&dispatcher, "/widgets/w1").status, StatusCode::NOT_FOUND);
}

#[derive(Clone)]
struct Recorder {
    label: &'static str,
    events: Arc<Mutex<Vec<String>>>,
    reject: bool,
}

impl MessageInspector for Recorder {
    fn after_receive_request(
        &self,
        _request: &mut RequestContext,
        _response: &mut ResponseContext,
    ) -> Result<(), ServiceError> {
        self.events.lock().push(format!("{}:receive", self.label));
        if self.reject {
            return Err(ServiceError::unauthorized("rejected by inspector"));
        }
        Ok(())
    }

    fn before_send_response(&self, _request: &RequestContext, response: &mut ResponseContext) {
        self.events
            .lock()
            .push(format!("{}:send:{}", self.label, response.effective_status().as_u16()));
    }
}

struct Inspectors(Vec<Recorder>);

impl EndpointBehavior for Inspectors {
    fn apply_endpoint_behavior(&self, _endpoint: &EndpointDescriptor, dispatcher: &mut EndpointDispatcher) {
        for recorder in &self.0 {
            dispatcher.add_inspector(Arc::new(recorder.clone()));
        }
    }
}

fn inspected_service(reject_second: bool) -> (RestService, Arc<Mutex<Vec<String>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let recorder = |label, reject| Recorder {
        label,
        events: Arc::clone(&events),
        reject,
    };
    let behavior = Inspectors(vec![recorder("first", false), recorder("second", reject_second)]);
    let mut service = RestService::singleton("tally", Tally::default());
    service
        .add_service_endpoint(
            EndpointDescriptor::new(common::dispatch::BASE, tally_contract()).with_behavior(Arc::new(behavior)),
        )
        .unwrap();
    (service, events)
}

#[test]
fn test_inspectors_bracket_the_operation() {
    let (mut service, events) = inspected_service(false);
    let dispatcher = service.start().unwrap();
    assert_eq!(get(&dispatcher, "/count").status, StatusCode::OK);
    assert_eq!(
        *events.lock(),
        ["first:receive", "second:receive", "first:send:200", "second:send:200"]
    );
}

#[test]
fn test_rejecting_inspector_still_sees_the_response() {
    let (mut service, events) = inspected_service(true);
    let dispatcher = service.start().unwrap();
    let resp = send(&dispatcher, RequestContext::new(Method::GET, url("/count")));
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        *events.lock(),
        ["first:receive", "second:receive", "first:send:401", "second:send:401"]
    );
    // No authorization policy ran, so no challenge is issued.
    assert_eq!(resp.header("www-authenticate"), None);
}
