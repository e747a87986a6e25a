//! # Dispatcher Module
//!
//! The three-level dispatch pipeline that turns a
//! [`RequestContext`](crate::message::RequestContext) into a
//! [`ResponseContext`](crate::message::ResponseContext).
//!
//! ## Request Flow
//!
//! 1. [`ServiceDispatcher`] picks the first endpoint whose base URI prefixes
//!    the request URL (`404` when none does), records and applies every
//!    service policy, then delegates.
//! 2. [`EndpointDispatcher`] stores the operation-relative path on the
//!    request, runs each inspector's after-receive hook, selects the
//!    operations whose route matches (`404` when none), then the first of
//!    those whose verb matches (`405` when none), and delegates. Inspector
//!    before-send hooks run afterwards whatever the outcome.
//! 3. [`OperationDispatcher`] binds route captures, applies operation
//!    policies, decodes the body into the remaining slots, checks slot
//!    types, resolves the service instance, invokes the handler and
//!    serialises its reply.
//!
//! ## Error Handling
//!
//! Any error raised at any level is routed through
//! [`ServiceDispatcher::handle_fault`], which logs it and hands it to the
//! error handler chain. A panic at any level, whether in a handler, a
//! policy, an inspector or a reply serialiser, is caught and reported as
//! `500 Internal Server Error`. Inspector before-send hooks still run and the
//! worker thread survives.
//!
//! ## Concurrency
//!
//! Dispatchers are immutable once the service starts and are shared across
//! worker threads behind an `Arc`. All per-request state lives in the
//! request and response contexts.

mod endpoint;
mod operation;
mod service;

pub use endpoint::EndpointDispatcher;
pub use operation::OperationDispatcher;
pub(crate) use operation::panic_message;
pub use service::ServiceDispatcher;
