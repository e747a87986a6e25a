use http::StatusCode;
use std::sync::Arc;

use super::{find_header, HeaderVec};
use crate::negotiate::MessageFormat;

/// The response under construction.
///
/// A status that was never set reads as `200 OK` when flushed. Consuming the
/// context with [`ResponseContext::into_flushed`] is the only way to produce
/// wire output, so a response is flushed exactly once.
#[derive(Debug, Default)]
pub struct ResponseContext {
    status: Option<StatusCode>,
    headers: HeaderVec,
    cookies: Vec<String>,
    content_type: Option<String>,
    body: Vec<u8>,
    format: Option<MessageFormat>,
}

impl ResponseContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Explicitly assigned status, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn effective_status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    /// Replace any existing value for `name`.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value.into()));
    }

    /// Append a value, keeping earlier ones.
    pub fn add_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.push((Arc::from(name), value.into()));
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn headers(&self) -> &HeaderVec {
        &self.headers
    }

    /// Queue a `Set-Cookie` with a root path.
    pub fn add_cookie(&mut self, name: &str, value: &str) {
        self.cookies.push(format!("{name}={value}; Path=/"));
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.content_type = Some(content_type.into());
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = body.into();
    }

    /// Serialisation format chosen for this response, if decided yet.
    pub fn format(&self) -> Option<MessageFormat> {
        self.format
    }

    pub fn set_format(&mut self, format: MessageFormat) {
        self.format = Some(format);
    }

    /// Drop any partially written payload before a fault is rendered.
    /// Headers survive so that policies can contribute to error responses.
    pub(crate) fn clear_payload(&mut self) {
        self.body.clear();
        self.content_type = None;
    }

    /// Consume the context into wire form. `HEAD` responses carry no body.
    pub fn into_flushed(self, head: bool) -> FlushedResponse {
        let mut headers: Vec<(String, String)> = self
            .headers
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        if let Some(ct) = self.content_type {
            headers.push(("Content-Type".to_string(), ct));
        }
        for cookie in self.cookies {
            headers.push(("Set-Cookie".to_string(), cookie));
        }
        FlushedResponse {
            status: self.status.unwrap_or(StatusCode::OK),
            headers,
            body: if head { Vec::new() } else { self.body },
        }
    }
}

/// A response ready to be written by a binding.
#[derive(Debug, Clone, PartialEq)]
pub struct FlushedResponse {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl FlushedResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_str(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap_or("")
    }
}
