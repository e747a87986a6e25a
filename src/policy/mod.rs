//! # Policy Module
//!
//! Extension points that run around dispatch, and the behaviors that
//! install them.
//!
//! ## Hooks
//!
//! | Trait | Runs | May fault |
//! |---|---|---|
//! | [`ServicePolicy`] | once per request, before endpoint dispatch | yes |
//! | [`MessageInspector`] | after receive, and before send | after receive only |
//! | [`OperationPolicy`] | after route binding, before body decoding | yes |
//!
//! Every applied service policy is recorded on the
//! [`RequestContext`](crate::message::RequestContext) before it runs. When
//! dispatch ends in `401 Unauthorized`, the default error handler walks
//! that list and lets each [`AuthorizationPolicy`] add its challenge header.
//!
//! A message inspector's before-send hook runs once a response exists,
//! whether dispatch succeeded or faulted, for every inspector whose
//! after-receive hook was invoked.
//!
//! ## Behaviors
//!
//! Behaviors are applied once, at start, to freshly built dispatchers:
//! [`ServiceBehavior`] to the service dispatcher, then each endpoint's
//! [`EndpointBehavior`]s to its endpoint dispatcher, then each operation's
//! [`OperationBehavior`]s to its operation dispatcher.
//!
//! ## Provided implementations
//!
//! - [`ServiceThrottlingBehavior`] - bounds in-flight requests per endpoint
//!   and answers `429` with `Retry-After`
//! - [`BasicAuthPolicy`] - HTTP Basic credentials with a `WWW-Authenticate`
//!   challenge
//! - [`TracingBehavior`] - structured request/response logging

mod basic_auth;
mod core;
mod throttling;
mod tracing;

pub use self::core::{
    AuthorizationPolicy, EndpointBehavior, MessageInspector, OperationBehavior, OperationPolicy,
    ServiceBehavior, ServicePolicy,
};
pub use basic_auth::{BasicAuthPolicy, PRINCIPAL_EXTENSION};
pub use throttling::{ServiceThrottlingBehavior, ThrottlingInspector, DEFAULT_RETRY_AFTER_SECS};
pub use self::tracing::{TracingBehavior, TracingInspector};
