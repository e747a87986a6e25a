//! # Description Module
//!
//! The static, declarative model of a hosted service.
//!
//! ## Overview
//!
//! A service is described bottom-up:
//!
//! - [`ParamSpec`] - one handler parameter: its name and [`ParamKind`]
//! - [`OperationDescriptor`] - an HTTP verb, a URL template, the ordered
//!   parameters, an optional response format override, and the handler
//! - [`ContractDescriptor`] - a named set of operations
//! - [`EndpointDescriptor`] - a base URI, the contract served there, and
//!   an optional binding that connects it to a listener
//! - [`ServiceDescriptor`] - the service name, how instances are provided
//!   ([`InstanceMode`]), service-wide behaviors, and the endpoints
//!
//! Descriptors are built before the service starts and are never mutated by
//! dispatch. Handlers are type-erased at the description boundary: each one
//! records the concrete service type it expects, and registering an endpoint
//! whose contract expects a different type than the service provides fails
//! with [`ConfigurationError::ContractMismatch`](crate::fault::ConfigurationError).
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use resthost::description::{ContractDescriptor, OperationDescriptor, ParamKind};
//!
//! struct Calculator;
//!
//! let contract = ContractDescriptor::new("calculator").operation(
//!     OperationDescriptor::new(Method::GET, "/add/{a}/{b}")
//!         .named("add")
//!         .param("a", ParamKind::Integer)
//!         .param("b", ParamKind::Integer)
//!         .handler(|_calc: &Calculator, call| {
//!             let a = call.args.integer("a").unwrap_or_default();
//!             let b = call.args.integer("b").unwrap_or_default();
//!             Ok(a + b)
//!         }),
//! );
//! assert_eq!(contract.operations().len(), 1);
//! ```

mod contract;
mod endpoint;
mod operation;
mod param;
mod service;

pub use contract::ContractDescriptor;
pub use endpoint::{BaseUri, EndpointDescriptor};
pub use operation::{Handler, Invocation, OperationDescriptor};
pub use param::{BodyDecoder, ParamKind, ParamSpec};
pub use service::{InstanceMode, InstanceProvider, ServiceDescriptor, ServiceInstance};
