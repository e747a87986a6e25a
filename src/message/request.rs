use http::Method;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use super::{find_header, HeaderVec};
use crate::ids::{RequestId, REQUEST_ID_HEADER};
use crate::policy::ServicePolicy;

/// An inbound request and the state accumulated while dispatching it.
pub struct RequestContext {
    request_id: RequestId,
    method: Method,
    url: String,
    headers: HeaderVec,
    body: Vec<u8>,
    remote_addr: Option<SocketAddr>,
    operation_path: Option<String>,
    endpoint: Option<Arc<str>>,
    operation: Option<Arc<str>>,
    applied_policies: Vec<Arc<dyn ServicePolicy>>,
    extensions: HashMap<String, Value>,
}

impl RequestContext {
    /// Create a request for an absolute URL (`http://host:port/path?query`).
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::new(),
            method,
            url: url.into(),
            headers: HeaderVec::new(),
            body: Vec::new(),
            remote_addr: None,
            operation_path: None,
            endpoint: None,
            operation: None,
            applied_policies: Vec::new(),
            extensions: HashMap::new(),
        }
    }

    /// Append a header. An `X-Request-Id` header is adopted as the request id
    /// when it holds a valid ULID.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        if name.eq_ignore_ascii_case(REQUEST_ID_HEADER) {
            self.request_id = RequestId::from_header_or_new(Some(&value));
        }
        self.headers.push((Arc::from(name), value));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The absolute request URL as received.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Path portion of the URL, without scheme, authority, query or fragment.
    pub fn path(&self) -> &str {
        let rest = match self.url.find("://") {
            Some(i) => {
                let after = &self.url[i + 3..];
                match after.find('/') {
                    Some(slash) => &after[slash..],
                    None => "",
                }
            }
            None => self.url.as_str(),
        };
        let end = rest.find(['?', '#']).unwrap_or(rest.len());
        &rest[..end]
    }

    pub fn query_string(&self) -> Option<&str> {
        let start = self.url.find('?')? + 1;
        let rest = &self.url[start..];
        Some(rest.split('#').next().unwrap_or(rest))
    }

    /// Decoded query parameters in arrival order.
    pub fn query_params(&self) -> Vec<(String, String)> {
        self.query_string()
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Case-insensitive header lookup (first match).
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn headers(&self) -> &HeaderVec {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Lower-cased media type of the `Content-Type` header, parameters stripped.
    pub fn content_type(&self) -> Option<String> {
        self.header("content-type")
            .and_then(media_type)
            .map(str::to_ascii_lowercase)
    }

    /// Lower-cased media type of the first entry of the `Accept` header.
    pub fn preferred_media_type(&self) -> Option<String> {
        self.header("accept")
            .and_then(|accept| accept.split(',').next())
            .and_then(media_type)
            .map(str::to_ascii_lowercase)
    }

    /// Cookies from the `Cookie` header.
    pub fn cookies(&self) -> HashMap<String, String> {
        self.header("cookie")
            .map(|c| {
                c.split(';')
                    .filter_map(|pair| {
                        let mut parts = pair.trim().splitn(2, '=');
                        let name = parts.next()?.trim();
                        if name.is_empty() {
                            return None;
                        }
                        let value = parts.next().unwrap_or("").trim();
                        Some((name.to_string(), value.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookies().remove(name)
    }

    /// URL remainder after the endpoint base, set once an endpoint claims the request.
    pub fn operation_path(&self) -> Option<&str> {
        self.operation_path.as_deref()
    }

    pub(crate) fn set_operation_path(&mut self, path: String) {
        self.operation_path = Some(path);
    }

    /// Base URI of the endpoint that claimed the request.
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub(crate) fn set_endpoint(&mut self, base_uri: Arc<str>) {
        self.endpoint = Some(base_uri);
    }

    /// Name of the operation selected for the request.
    pub fn operation(&self) -> Option<&str> {
        self.operation.as_deref()
    }

    pub(crate) fn set_operation(&mut self, name: Arc<str>) {
        self.operation = Some(name);
    }

    /// Service policies applied so far, in application order.
    pub fn applied_policies(&self) -> &[Arc<dyn ServicePolicy>] {
        &self.applied_policies
    }

    pub(crate) fn record_applied_policy(&mut self, policy: Arc<dyn ServicePolicy>) {
        self.applied_policies.push(policy);
    }

    pub fn extension(&self, key: &str) -> Option<&Value> {
        self.extensions.get(key)
    }

    pub fn set_extension(&mut self, key: impl Into<String>, value: Value) {
        self.extensions.insert(key.into(), value);
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .field("operation_path", &self.operation_path)
            .field("endpoint", &self.endpoint)
            .field("operation", &self.operation)
            .field(
                "applied_policies",
                &self
                    .applied_policies
                    .iter()
                    .map(|p| p.name())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

fn media_type(value: &str) -> Option<&str> {
    let media = value.split(';').next()?.trim();
    (!media.is_empty()).then_some(media)
}
