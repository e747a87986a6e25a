use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::HashMap;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use super::core::{AuthorizationPolicy, ServiceBehavior, ServicePolicy};
use crate::dispatcher::ServiceDispatcher;
use crate::fault::ServiceError;
use crate::message::{RequestContext, ResponseContext};

/// Extension key under which the authenticated user name is recorded.
pub const PRINCIPAL_EXTENSION: &str = "principal";

/// HTTP Basic authentication against a fixed credential table.
///
/// On success the user name is stored in the request's extensions under
/// [`PRINCIPAL_EXTENSION`]. On failure the request faults with
/// `401 Unauthorized` and the default error handler adds
/// `WWW-Authenticate: Basic realm="…"`.
#[derive(Debug, Clone)]
pub struct BasicAuthPolicy {
    realm: Arc<str>,
    credentials: Arc<HashMap<String, String>>,
}

impl BasicAuthPolicy {
    pub fn new(realm: &str, credentials: HashMap<String, String>) -> Self {
        Self {
            realm: Arc::from(realm),
            credentials: Arc::new(credentials),
        }
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    fn authenticate(&self, header: Option<&str>) -> Result<String, &'static str> {
        let header = header.ok_or("missing Authorization header")?;
        let (scheme, encoded) = header
            .trim()
            .split_once(' ')
            .ok_or("malformed Authorization header")?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return Err("unsupported authorization scheme");
        }
        let decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|_| "credentials are not valid base64")?;
        let decoded = String::from_utf8(decoded).map_err(|_| "credentials are not UTF-8")?;
        let (user, password) = decoded
            .split_once(':')
            .ok_or("credentials lack a ':' separator")?;
        match self.credentials.get(user) {
            Some(expected) if passwords_match(expected, password) => Ok(user.to_string()),
            _ => Err("invalid user name or password"),
        }
    }
}

/// Compare in time independent of where the inputs first differ.
fn passwords_match(expected: &str, supplied: &str) -> bool {
    expected.as_bytes().ct_eq(supplied.as_bytes()).into()
}

impl ServicePolicy for BasicAuthPolicy {
    fn name(&self) -> &str {
        "basic_auth"
    }

    fn apply(&self, request: &mut RequestContext) -> Result<(), ServiceError> {
        match self.authenticate(request.header("authorization")) {
            Ok(user) => {
                debug!(request_id = %request.request_id(), user = %user, "Basic authentication succeeded");
                request.set_extension(PRINCIPAL_EXTENSION, serde_json::Value::String(user));
                Ok(())
            }
            Err(reason) => {
                warn!(request_id = %request.request_id(), reason, "Basic authentication failed");
                Err(ServiceError::unauthorized(reason))
            }
        }
    }

    fn as_authorization(&self) -> Option<&dyn AuthorizationPolicy> {
        Some(self)
    }
}

impl AuthorizationPolicy for BasicAuthPolicy {
    fn add_challenge_header(&self, response: &mut ResponseContext, _error: &ServiceError) {
        response.set_header("WWW-Authenticate", format!("Basic realm=\"{}\"", self.realm));
    }
}

impl ServiceBehavior for BasicAuthPolicy {
    fn apply_service_behavior(&self, dispatcher: &mut ServiceDispatcher) {
        dispatcher.add_policy(Arc::new(self.clone()));
    }
}
