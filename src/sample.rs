//! A small calculator and object-store service.
//!
//! The binary's `serve` command hosts it, and the integration tests use it
//! as a realistic contract. Objects are kept in memory keyed by
//! `(object type, name)`.
//!
//! | Verb | Template | Result |
//! |---|---|---|
//! | GET | `/a` | `204 No Content` |
//! | GET | `/b` | plain text |
//! | GET | `/add/{a}/{b}` | integer sum |
//! | GET | `/somewhere/*` | byte stream echoing the path |
//! | GET | `/stats` | dynamic record with store counts |
//! | GET | `/{objectType}` | every stored object of that type |
//! | GET | `/{objectType}/{id}` | one object, or `404` |
//! | POST | `/{objectType}` | stores the body, `201 Created` |
//! | PUT | `/{objectType}/{name}` | replaces an object, or `404` |
//! | DELETE | `/{objectType}/{name}` | removes an object, `204` or `404` |

use http::{Method, StatusCode};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::description::{ContractDescriptor, Invocation, OperationDescriptor, ParamKind};
use crate::fault::ServiceError;
use crate::message::Reply;
use crate::negotiate::DynamicRecord;

/// Name of the sample contract.
pub const SAMPLE_CONTRACT: &str = "SampleContract";

/// A stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub name: String,
    pub value: i32,
}

/// Object storage shared by every instance of [`SampleService`].
#[derive(Debug, Default)]
pub struct SampleStore {
    objects: RwLock<BTreeMap<(String, String), Sample>>,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, object_type: &str, name: &str) -> Option<Sample> {
        self.objects
            .read()
            .get(&(object_type.to_string(), name.to_string()))
            .cloned()
    }

    pub fn list(&self, object_type: &str) -> Vec<Sample> {
        self.objects
            .read()
            .iter()
            .filter(|((kind, _), _)| kind == object_type)
            .map(|(_, sample)| sample.clone())
            .collect()
    }

    /// Insert or replace; returns the previous object.
    pub fn put(&self, object_type: &str, sample: Sample) -> Option<Sample> {
        self.objects
            .write()
            .insert((object_type.to_string(), sample.name.clone()), sample)
    }

    pub fn remove(&self, object_type: &str, name: &str) -> Option<Sample> {
        self.objects
            .write()
            .remove(&(object_type.to_string(), name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    fn type_count(&self) -> usize {
        let objects = self.objects.read();
        let mut kinds: Vec<&str> = objects.keys().map(|(kind, _)| kind.as_str()).collect();
        kinds.dedup();
        kinds.len()
    }
}

/// The sample service implementation.
#[derive(Debug, Clone)]
pub struct SampleService {
    store: Arc<SampleStore>,
    calls: Arc<AtomicU64>,
}

impl SampleService {
    pub fn new() -> Self {
        Self::with_store(Arc::new(SampleStore::new()))
    }

    /// An instance over an existing store, for per-call hosting.
    pub fn with_store(store: Arc<SampleStore>) -> Self {
        Self {
            store,
            calls: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn store(&self) -> &Arc<SampleStore> {
        &self.store
    }

    /// Operations handled by this instance.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    fn get_a(&self, _call: &mut Invocation<'_>) -> Result<Reply, ServiceError> {
        self.touch();
        Ok(Reply::Empty)
    }

    fn get_b(&self, _call: &mut Invocation<'_>) -> Result<Reply, ServiceError> {
        self.touch();
        Ok(Reply::text("b"))
    }

    fn add(&self, call: &mut Invocation<'_>) -> Result<i32, ServiceError> {
        self.touch();
        let a = call.args.integer("a").unwrap_or_default();
        let b = call.args.integer("b").unwrap_or_default();
        a.checked_add(b)
            .ok_or_else(|| ServiceError::bad_request(format!("{a} + {b} overflows")))
    }

    fn somewhere(&self, call: &mut Invocation<'_>) -> Result<Reply, ServiceError> {
        self.touch();
        let path = call.request.operation_path().unwrap_or_default();
        Ok(Reply::stream(path.as_bytes().to_vec()))
    }

    fn stats(&self, _call: &mut Invocation<'_>) -> Result<DynamicRecord, ServiceError> {
        self.touch();
        Ok(DynamicRecord::new()
            .field("types", self.store.type_count() as i64)
            .field("objects", self.store.len() as i64)
            .field("calls", self.calls() as i64))
    }

    fn list(&self, call: &mut Invocation<'_>) -> Result<Reply, ServiceError> {
        self.touch();
        let object_type = object_type(call)?;
        Ok(Reply::document(self.store.list(&object_type)))
    }

    fn get(&self, call: &mut Invocation<'_>) -> Result<Reply, ServiceError> {
        self.touch();
        let object_type = object_type(call)?;
        let id = call.args.text("id").unwrap_or_default();
        self.store
            .get(&object_type, id)
            .map(Reply::document)
            .ok_or_else(|| ServiceError::not_found(format!("{object_type}/{id} does not exist")))
    }

    fn create(&self, call: &mut Invocation<'_>) -> Result<Reply, ServiceError> {
        self.touch();
        let object_type = object_type(call)?;
        let sample = body(call)?;
        let location = format!("/{object_type}/{}", sample.name);
        self.store.put(&object_type, sample.clone());
        call.response.set_status(StatusCode::CREATED);
        call.response.set_header("Location", location);
        Ok(Reply::document(sample))
    }

    fn update(&self, call: &mut Invocation<'_>) -> Result<Reply, ServiceError> {
        self.touch();
        let object_type = object_type(call)?;
        let name = call.args.text("name").unwrap_or_default().to_string();
        let mut sample = body(call)?;
        if self.store.get(&object_type, &name).is_none() {
            return Err(ServiceError::not_found(format!(
                "{object_type}/{name} does not exist"
            )));
        }
        if sample.name != name {
            self.store.remove(&object_type, &name);
            sample.name.clone_from(&name);
        }
        self.store.put(&object_type, sample.clone());
        Ok(Reply::document(sample))
    }

    fn delete(&self, call: &mut Invocation<'_>) -> Result<Reply, ServiceError> {
        self.touch();
        let object_type = object_type(call)?;
        let name = call.args.text("name").unwrap_or_default();
        self.store
            .remove(&object_type, name)
            .map(|_| Reply::Empty)
            .ok_or_else(|| ServiceError::not_found(format!("{object_type}/{name} does not exist")))
    }
}

impl Default for SampleService {
    fn default() -> Self {
        Self::new()
    }
}

fn object_type(call: &Invocation<'_>) -> Result<String, ServiceError> {
    match call.args.text("objectType") {
        Some(kind) if !kind.is_empty() => Ok(kind.to_string()),
        _ => Err(ServiceError::bad_request("object type is required")),
    }
}

fn body(call: &mut Invocation<'_>) -> Result<Sample, ServiceError> {
    call.args
        .take_body::<Sample>("data")
        .ok_or_else(|| ServiceError::bad_request("a sample document body is required"))
}

/// The sample contract, with handlers bound to [`SampleService`].
pub fn sample_contract() -> ContractDescriptor {
    ContractDescriptor::new(SAMPLE_CONTRACT)
        .operation(
            OperationDescriptor::new(Method::GET, "/a")
                .named("GetA")
                .handler(|svc: &SampleService, call| svc.get_a(call)),
        )
        .operation(
            OperationDescriptor::new(Method::GET, "/b")
                .named("GetB")
                .handler(|svc: &SampleService, call| svc.get_b(call)),
        )
        .operation(
            OperationDescriptor::new(Method::GET, "/add/{a}/{b}")
                .named("Add")
                .param("a", ParamKind::Integer)
                .param("b", ParamKind::Integer)
                .handler(|svc: &SampleService, call| svc.add(call)),
        )
        .operation(
            OperationDescriptor::new(Method::GET, "/somewhere/*")
                .named("GetStream")
                .handler(|svc: &SampleService, call| svc.somewhere(call)),
        )
        .operation(
            OperationDescriptor::new(Method::GET, "/stats")
                .named("GetStats")
                .handler(|svc: &SampleService, call| svc.stats(call)),
        )
        .operation(
            OperationDescriptor::new(Method::GET, "/{objectType}")
                .named("ListC")
                .param("objectType", ParamKind::String)
                .handler(|svc: &SampleService, call| svc.list(call)),
        )
        .operation(
            OperationDescriptor::new(Method::GET, "/{objectType}/{id}")
                .named("GetC")
                .param("objectType", ParamKind::String)
                .param("id", ParamKind::String)
                .handler(|svc: &SampleService, call| svc.get(call)),
        )
        .operation(
            OperationDescriptor::new(Method::POST, "/{objectType}")
                .named("CreateC")
                .param("objectType", ParamKind::String)
                .param("data", ParamKind::body::<Sample>())
                .handler(|svc: &SampleService, call| svc.create(call)),
        )
        .operation(
            OperationDescriptor::new(Method::PUT, "/{objectType}/{name}")
                .named("UpdateC")
                .param("objectType", ParamKind::String)
                .param("name", ParamKind::String)
                .param("data", ParamKind::body::<Sample>())
                .handler(|svc: &SampleService, call| svc.update(call)),
        )
        .operation(
            OperationDescriptor::new(Method::DELETE, "/{objectType}/{name}")
                .named("DeleteC")
                .param("objectType", ParamKind::String)
                .param("name", ParamKind::String)
                .handler(|svc: &SampleService, call| svc.delete(call)),
        )
}
