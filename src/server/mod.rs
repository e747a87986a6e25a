//! # Server Module
//!
//! Hosting lifecycle and transport bindings.
//!
//! [`RestService`] owns a [`ServiceDescriptor`](crate::description::ServiceDescriptor)
//! while it is being configured. Registration compiles every endpoint
//! immediately, so malformed templates and duplicate base URIs fail at the
//! call site rather than at request time. [`RestService::start`] then:
//!
//! 1. clones the compiled endpoint dispatchers,
//! 2. applies service behaviors, then each endpoint's behaviors, then each
//!    operation's behaviors,
//! 3. freezes the result in an `Arc<ServiceDispatcher>`,
//! 4. attaches every endpoint that carries an [`EndpointBinding`].
//!
//! Behaviors are applied to fresh clones on every start, so a service can be
//! stopped and started again without policies piling up.
//!
//! [`HttpBinding`] is the shipped binding. It runs one accept thread per
//! listening address on `tiny_http` and hands each accepted request to the
//! [`AdaptiveWorkerPool`](crate::worker_pool::AdaptiveWorkerPool).

mod binding;
mod http_binding;
mod service;

pub use binding::EndpointBinding;
pub use http_binding::HttpBinding;
pub use service::RestService;
