use http::StatusCode;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

use crate::message::{Document, HeaderVec};

/// Construction-time failures.
///
/// Everything that can be detected while describing a service (bad
/// templates, parameter mismatches, duplicate endpoints) or while starting
/// and stopping it surfaces here. None of these ever reach a client.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("malformed URL template '{template}': {reason}")]
    MalformedTemplate { template: String, reason: String },

    #[error(
        "parameter '{parameter}' of kind {kind} cannot be bound from URL template '{template}'"
    )]
    UnsupportedRouteParameterType {
        template: String,
        parameter: String,
        kind: &'static str,
    },

    #[error(
        "URL template '{template}' has {placeholders} placeholders but the operation declares {parameters} parameters"
    )]
    TooManyPlaceholders {
        template: String,
        placeholders: usize,
        parameters: usize,
    },

    #[error("placeholder '{placeholder}' in URL template '{template}' names no declared parameter")]
    UnknownRouteParameter {
        template: String,
        placeholder: String,
    },

    #[error("operation '{operation}' has no handler")]
    MissingHandler { operation: String },

    #[error("endpoint with base URI '{0}' is already registered")]
    DuplicateBaseUri(String),

    #[error("invalid base URI '{uri}': {reason}")]
    InvalidBaseUri { uri: String, reason: String },

    #[error("contract '{contract}' operation '{operation}' is implemented by {expected}, but the service instance is {actual}")]
    ContractMismatch {
        contract: String,
        operation: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("service '{0}' is already running")]
    AlreadyRunning(String),

    #[error("service '{0}' has no endpoints to start")]
    NoEndpoints(String),

    #[error("binding for '{base_uri}' failed: {reason}")]
    Binding { base_uri: String, reason: String },
}

/// Request-time failures.
///
/// The variant decides the HTTP status the default error handler renders;
/// see [`ServiceError::status`].
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("malformed {format} payload: {message}")]
    Decode {
        format: &'static str,
        message: String,
    },

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("method not permitted: {0}")]
    MethodNotAllowed(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error(transparent)]
    Fault(#[from] Fault),

    #[error("handler panicked: {message}")]
    Panicked { message: String, backtrace: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::NotImplemented(message.into())
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation(message.into())
    }

    /// HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::BadRequest(_) | ServiceError::Decode { .. } => StatusCode::BAD_REQUEST,
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ServiceError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            ServiceError::Fault(fault) => fault.status(),
            ServiceError::InvalidOperation(_)
            | ServiceError::Panicked { .. }
            | ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short kind name shown on the diagnostic page and in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => "NotFound",
            ServiceError::BadRequest(_) => "BadRequest",
            ServiceError::Decode { .. } => "Decode",
            ServiceError::Unauthorized(_) => "Unauthorized",
            ServiceError::MethodNotAllowed(_) => "MethodNotAllowed",
            ServiceError::NotImplemented(_) => "NotImplemented",
            ServiceError::InvalidOperation(_) => "InvalidOperation",
            ServiceError::Fault(_) => "Fault",
            ServiceError::Panicked { .. } => "Panicked",
            ServiceError::Internal(_) => "Internal",
        }
    }

    /// Captured stack trace, when one exists.
    pub fn trace(&self) -> Option<String> {
        match self {
            ServiceError::Panicked { backtrace, .. } => Some(backtrace.clone()),
            ServiceError::Internal(err) => Some(err.backtrace().to_string()),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Decode {
            format: "JSON",
            message: err.to_string(),
        }
    }
}

impl From<quick_xml::DeError> for ServiceError {
    fn from(err: quick_xml::DeError) -> Self {
        ServiceError::Decode {
            format: "XML",
            message: err.to_string(),
        }
    }
}

/// An explicit fault raised by a handler or policy.
///
/// Carries its own status, optional response headers, and optionally a
/// typed body that is negotiated like any other reply.
pub struct Fault {
    status: StatusCode,
    message: String,
    headers: HeaderVec,
    body: Option<Arc<dyn Document>>,
}

impl Fault {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            headers: SmallVec::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((Arc::from(name), value.into()));
        self
    }

    /// Attach a typed body serialised with the negotiated format.
    pub fn with_body<T: Document + 'static>(mut self, body: T) -> Self {
        self.body = Some(Arc::new(body));
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn headers(&self) -> &[(Arc<str>, String)] {
        &self.headers
    }

    pub fn body(&self) -> Option<&dyn Document> {
        self.body.as_deref()
    }
}

impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fault")
            .field("status", &self.status)
            .field("message", &self.message)
            .field("headers", &self.headers)
            .field("body", &self.body.as_ref().map(|b| b.type_name()))
            .finish()
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for Fault {}

/// Worker pool failures.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("worker pool has been disposed")]
    Disposed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ServiceError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(ServiceError::bad_request("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ServiceError::Decode {
                format: "JSON",
                message: "eof".into()
            }
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ServiceError::unauthorized("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ServiceError::MethodNotAllowed("x".into()).status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            ServiceError::not_implemented("x").status(),
            StatusCode::NOT_IMPLEMENTED
        );
        assert_eq!(
            ServiceError::invalid_operation("x").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServiceError::from(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn fault_carries_its_status() {
        let err: ServiceError = Fault::new(StatusCode::IM_A_TEAPOT, "short and stout")
            .with_header("X-Brew", "earl grey")
            .into();
        assert_eq!(err.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(err.kind(), "Fault");
        assert_eq!(err.to_string(), "418 short and stout");
    }

    #[test]
    fn json_errors_classify_as_decode() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ServiceError::from(parse);
        assert_eq!(err.kind(), "Decode");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
