//! # resthost
//!
//! **resthost** is an embeddable REST service host: it exposes explicitly
//! registered operations as HTTP endpoints without an external web server.
//!
//! ## Overview
//!
//! A service is a plain Rust value plus a description of its operations:
//! verb, URL template, typed parameters and a handler closure. The host
//! compiles every URL template into a matcher when the endpoint is
//! registered, dispatches requests through three tiers of routing, binds
//! path captures and request bodies to handler parameters, negotiates the
//! response format, and turns every failure into a structured fault.
//!
//! ## Architecture
//!
//! - **[`route`]** - URL template tokenizer and the route compiler
//! - **[`message`]** - request and response contexts, bound arguments, replies
//! - **[`negotiate`]** - JSON/XML content negotiation in both directions
//! - **[`fault`]** - error taxonomy, error handler chain, diagnostic page
//! - **[`description`]** - service, endpoint, contract and operation descriptors
//! - **[`policy`]** - policies, inspectors and the behaviors that install them
//! - **[`dispatcher`]** - service, endpoint and operation dispatchers
//! - **[`worker_pool`]** - the adaptive worker pool that runs requests
//! - **[`server`]** - service lifecycle and the HTTP binding
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Binding as HttpBinding<br/>(tiny_http)
//!     participant Pool as AdaptiveWorkerPool
//!     participant Service as ServiceDispatcher
//!     participant Endpoint as EndpointDispatcher
//!     participant Operation as OperationDispatcher
//!     participant Handler
//!
//!     Client->>Binding: GET /calc/add/3/4
//!     Binding->>Pool: submit(work item)
//!     Pool->>Service: process(request)
//!     Service->>Service: first endpoint whose base URI matches
//!     Service->>Service: service policies (auth, ...)
//!     Service->>Endpoint: dispatch
//!     Endpoint->>Endpoint: inspectors: after receive
//!     Endpoint->>Endpoint: path match, then verb match
//!     Endpoint->>Operation: dispatch
//!     Operation->>Operation: bind captures, operation policies,<br/>deserialize body
//!     Operation->>Handler: invoke
//!     Handler-->>Operation: Reply
//!     Operation->>Operation: serialize reply (JSON/XML/text/stream)
//!     Endpoint->>Endpoint: inspectors: before send
//!     Service-->>Binding: FlushedResponse
//!     Binding-->>Client: 200 OK
//! ```
//!
//! Faults raised anywhere in the chain are caught at the layer that raised
//! them and rendered by the service's error handler chain, so a bad request
//! never takes down a worker thread.
//!
//! ## Quick Start
//!
//! ```no_run
//! use http::Method;
//! use resthost::description::{ContractDescriptor, EndpointDescriptor, OperationDescriptor, ParamKind};
//! use resthost::server::{HttpBinding, RestService};
//! use std::sync::Arc;
//!
//! struct Calculator;
//!
//! let contract = ContractDescriptor::new("calculator").operation(
//!     OperationDescriptor::new(Method::GET, "/add/{a}/{b}")
//!         .param("a", ParamKind::Integer)
//!         .param("b", ParamKind::Integer)
//!         .handler(|_calc: &Calculator, call| {
//!             Ok(call.args.integer("a").unwrap_or_default() + call.args.integer("b").unwrap_or_default())
//!         }),
//! );
//!
//! let mut service = RestService::singleton("calculator", Calculator);
//! service
//!     .add_service_endpoint(
//!         EndpointDescriptor::new("http://127.0.0.1:9200/calc", contract)
//!             .with_binding(Arc::new(HttpBinding::new())),
//!     )
//!     .unwrap();
//! service.start().unwrap();
//! ```
//!
//! ## Runtime Configuration
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `RESTHOST_MAX_THREADS_PER_CPU` | `8` | worker pool ceiling per core |
//! | `RESTHOST_POOL_IDLE_MS` | `30000` | idle time before a surplus worker retires |
//! | `RESTHOST_EXPOSE_DIAGNOSTICS` | `true` | include details and trace in fault pages |
//!
//! Logging variables are listed in [`logging`].

pub mod cli;
pub mod config;
pub mod description;
pub mod dispatcher;
pub mod fault;
pub mod ids;
pub mod logging;
pub mod message;
pub mod negotiate;
pub mod policy;
pub mod route;
pub mod runtime_config;
pub mod sample;
pub mod server;
pub mod worker_pool;

pub use description::{
    ContractDescriptor, EndpointDescriptor, InstanceMode, Invocation, OperationDescriptor,
    ParamKind, ServiceDescriptor,
};
pub use dispatcher::ServiceDispatcher;
pub use fault::{ConfigurationError, Fault, ServiceError};
pub use ids::RequestId;
pub use message::{Reply, RequestContext, ResponseContext};
pub use negotiate::MessageFormat;
pub use server::{EndpointBinding, HttpBinding, RestService};
pub use worker_pool::AdaptiveWorkerPool;
