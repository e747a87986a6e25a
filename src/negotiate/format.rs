use serde::{Deserialize, Serialize};

use crate::message::{RequestContext, ResponseContext};

/// Media type constants.
pub mod media {
    pub const APPLICATION_JSON: &str = "application/json";
    pub const APPLICATION_XML: &str = "application/xml";
    pub const TEXT_XML: &str = "text/xml";
    pub const OCTET_STREAM: &str = "application/octet-stream";
    pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
    pub const TEXT_PLAIN: &str = "text/plain";
    pub const TEXT_HTML: &str = "text/html";
}

/// Structured serialisation formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageFormat {
    Json,
    Xml,
}

impl MessageFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            MessageFormat::Json => media::APPLICATION_JSON,
            MessageFormat::Xml => media::APPLICATION_XML,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MessageFormat::Json => "JSON",
            MessageFormat::Xml => "XML",
        }
    }

    /// Format for a lower-cased media type, when it names one.
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        match media_type {
            media::APPLICATION_JSON => Some(MessageFormat::Json),
            media::APPLICATION_XML | media::TEXT_XML => Some(MessageFormat::Xml),
            _ => None,
        }
    }
}

/// Choose the structured format for a response.
pub fn negotiate_format(request: &RequestContext, response: &ResponseContext) -> MessageFormat {
    if let Some(format) = response.format() {
        return format;
    }
    if let Some(format) = request
        .preferred_media_type()
        .as_deref()
        .and_then(MessageFormat::from_media_type)
    {
        return format;
    }
    let path = request.path().to_ascii_lowercase();
    if path.ends_with(".json") {
        MessageFormat::Json
    } else {
        MessageFormat::Xml
    }
}
