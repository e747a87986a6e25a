//! # Fault Module
//!
//! Error taxonomy and the chain of handlers that turns request-time errors
//! into HTTP responses.
//!
//! ## Errors
//!
//! - [`ConfigurationError`] - detected while describing, starting or
//!   stopping a service; never sent to a client
//! - [`ServiceError`] - raised while dispatching a request; classified to an
//!   HTTP status by [`ServiceError::status`]
//! - [`Fault`] - an explicit status, message, headers and optional typed
//!   body raised by a handler or policy
//! - [`PoolError`] - worker pool misuse
//!
//! ## Classification
//!
//! | Error | Status |
//! |---|---|
//! | `NotFound` | 404 |
//! | `BadRequest`, `Decode` | 400 |
//! | `Unauthorized` | 401 |
//! | `MethodNotAllowed` | 405 |
//! | `NotImplemented` | 501 |
//! | `Fault` | its own status |
//! | `InvalidOperation`, `Panicked`, `Internal` | 500 |
//!
//! ## Handler chain
//!
//! [`ErrorHandlerChain`] asks each registered [`ErrorHandler`] in order
//! whether it claims an error; the first that does provides the response.
//! The [`DefaultErrorHandler`] sits at the end, claims everything, and
//! renders either the fault's typed body (negotiated like any reply) or an
//! HTML diagnostic page.

mod diagnostic;
mod error;
mod handler;

pub use diagnostic::render_diagnostic_page;
pub use error::{ConfigurationError, Fault, PoolError, ServiceError};
pub use handler::{DefaultErrorHandler, ErrorHandler, ErrorHandlerChain};
