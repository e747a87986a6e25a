#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use common::dispatch::{request, send, start_with};
use http::{Method, StatusCode};
use parking_lot::{Condvar, Mutex};
use resthost::description::{ContractDescriptor, InstanceProvider, OperationDescriptor};
use resthost::dispatcher::ServiceDispatcher;
use resthost::policy::{BasicAuthPolicy, ServiceBehavior, ServicePolicy, ServiceThrottlingBehavior, PRINCIPAL_EXTENSION};
use resthost::{Reply, RequestContext, RestService, ServiceError};
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Default)]
struct Guarded {
    gate: Mutex<bool>,
    opened: Condvar,
    entered: AtomicBool,
}

impl Guarded {
    fn open(&self) {
        *self.gate.lock() = true;
        self.opened.notify_all();
    }

    fn wait_for_gate(&self) {
        self.entered.store(true, Ordering::SeqCst);
        let mut open = self.gate.lock();
        while !*open {
            self.opened.wait(&mut open);
        }
    }
}

fn guarded_contract() -> ContractDescriptor {
    ContractDescriptor::new("Guarded")
        .operation(
            OperationDescriptor::new(Method::GET, "/whoami")
                .named("WhoAmI")
                .handler(|_: &Guarded, call| {
                    Ok(call
                        .request
                        .extension(PRINCIPAL_EXTENSION)
                        .and_then(|v| v.as_str())
                        .unwrap_or("anonymous")
                        .to_string())
                }),
        )
        .operation(
            OperationDescriptor::new(Method::GET, "/forbidden-fruit")
                .named("ForbiddenFruit")
                .handler(|_: &Guarded, _| -> Result<(), ServiceError> {
                    Err(ServiceError::unauthorized("not for you"))
                }),
        )
        .operation(
            OperationDescriptor::new(Method::GET, "/slow")
                .named("Slow")
                .handler(|svc: &Guarded, _| {
                    svc.wait_for_gate();
                    Ok("done")
                }),
        )
}

fn basic(user: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{user}:{password}")))
}

fn with_basic_auth() -> (RestService, Arc<ServiceDispatcher>) {
    let mut service = RestService::singleton("guarded", Guarded::default());
    let users = HashMap::from([("admin".to_string(), "s3cret".to_string())]);
    service
        .add_service_behavior(Arc::new(BasicAuthPolicy::new("resthost", users)))
        .unwrap();
    start_with(service, guarded_contract())
}

#[test]
fn test_missing_credentials_are_challenged() {
    let (_service, dispatcher) = with_basic_auth();
    let resp = send(&dispatcher, request(Method::GET, "/whoami"));
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.header("www-authenticate"), Some("Basic realm=\"resthost\""));
}

#[test]
fn test_wrong_password_is_challenged() {
    let (_service, dispatcher) = with_basic_auth();
    let resp = send(
        &dispatcher,
        request(Method::GET, "/whoami").with_header("Authorization", basic("admin", "guess")),
    );
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert!(resp.header("www-authenticate").is_some());
}

#[test]
fn test_non_basic_scheme_is_rejected() {
    let (_service, dispatcher) = with_basic_auth();
    let resp = send(
        &dispatcher,
        request(Method::GET, "/whoami").with_header("Authorization", "Bearer abc.def.ghi"),
    );
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[test]
fn test_valid_credentials_set_the_principal() {
    let (_service, dispatcher) = with_basic_auth();
    let resp = send(
        &dispatcher,
        request(Method::GET, "/whoami").with_header("Authorization", basic("admin", "s3cret")),
    );
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body_str(), "admin");
    assert_eq!(resp.header("www-authenticate"), None);
}

#[test]
fn test_handler_unauthorized_is_challenged_once_policy_ran() {
    let (_service, dispatcher) = with_basic_auth();
    let resp = send(
        &dispatcher,
        request(Method::GET, "/forbidden-fruit").with_header("Authorization", basic("admin", "s3cret")),
    );
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.header("www-authenticate"), Some("Basic realm=\"resthost\""));
}

#[test]
fn test_no_challenge_without_authorization_policy() {
    let (_service, dispatcher) = start_with(RestService::singleton("guarded", Guarded::default()), guarded_contract());
    let resp = send(&dispatcher, request(Method::GET, "/forbidden-fruit"));
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.header("www-authenticate"), None);

    assert_eq!(send(&dispatcher, request(Method::GET, "/whoami")).body_str(), "anonymous");
}

#[test]
fn test_unmatched_url_is_not_found_before_authentication() {
    let (_service, dispatcher) = with_basic_auth();
    let resp = dispatcher.process(RequestContext::new(Method::GET, "http://localhost:9999/elsewhere"));
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.header("www-authenticate"), None);
}

#[test]
fn test_throttling_rejects_over_limit_with_retry_after() {
    let guarded = Guarded::default();
    let throttle = ServiceThrottlingBehavior::new(1);
    let inspector = Arc::clone(throttle.inspector());

    let mut service = RestService::singleton("guarded", guarded);
    service.add_service_behavior(Arc::new(throttle)).unwrap();
    let (_service, dispatcher) = start_with(service, guarded_contract());

    let slow = {
        let dispatcher = Arc::clone(&dispatcher);
        std::thread::spawn(move || send(&dispatcher, request(Method::GET, "/slow")))
    };

    let InstanceProvider::Singleton(instance) = dispatcher.instance() else {
        panic!("hosted as a singleton");
    };
    let guarded = instance.downcast_ref::<Guarded>().unwrap();
    let deadline = Instant::now() + Duration::from_secs(10);
    while !guarded.entered.load(Ordering::SeqCst) {
        assert!(Instant::now() < deadline, "slow request never reached its handler");
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(inspector.in_flight(), 1);

    let rejected = send(&dispatcher, request(Method::GET, "/whoami"));
    assert_eq!(rejected.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(rejected.header("retry-after"), Some("1200"));

    guarded.open();
    let finished = slow.join().unwrap();
    assert_eq!(finished.status, StatusCode::OK);
    assert_eq!(finished.body_str(), "done");

    assert_eq!(inspector.in_flight(), 0);
    assert_eq!(send(&dispatcher, request(Method::GET, "/whoami")).status, StatusCode::OK);
}

struct Unserializable;

impl Serialize for Unserializable {
    fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        panic!("serializer bug")
    }
}

struct PanicOnHeader;

impl ServicePolicy for PanicOnHeader {
    fn apply(&self, request: &mut RequestContext) -> Result<(), ServiceError> {
        if request.header("x-boom").is_some() {
            panic!("policy bug");
        }
        Ok(())
    }
}

struct InstallPanicOnHeader;

impl ServiceBehavior for InstallPanicOnHeader {
    fn apply_service_behavior(&self, dispatcher: &mut ServiceDispatcher) {
        dispatcher.add_policy(Arc::new(PanicOnHeader));
    }
}

fn fragile_contract() -> ContractDescriptor {
    ContractDescriptor::new("Fragile")
        .operation(
            OperationDescriptor::new(Method::GET, "/bad")
                .handler(|_: &(), _| Ok(Reply::document(Unserializable))),
        )
        .operation(OperationDescriptor::new(Method::GET, "/ok").handler(|_: &(), _| Ok("fine")))
}

#[test]
fn test_panic_outside_handler_releases_throttle_slot() {
    let throttle = ServiceThrottlingBehavior::new(1);
    let inspector = Arc::clone(throttle.inspector());

    let mut service = RestService::singleton("fragile", ());
    service.add_service_behavior(Arc::new(throttle)).unwrap();
    service.add_service_behavior(Arc::new(InstallPanicOnHeader)).unwrap();
    let (_service, dispatcher) = start_with(service, fragile_contract());

    for _ in 0..3 {
        let resp = send(&dispatcher, request(Method::GET, "/bad").with_header("Accept", "application/json"));
        assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(inspector.in_flight(), 0);
    }

    let resp = send(&dispatcher, request(Method::GET, "/ok").with_header("X-Boom", "1"));
    assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);

    let resp = send(&dispatcher, request(Method::GET, "/ok"));
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body_str(), "fine");
}
