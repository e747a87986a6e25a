use serde::de::DeserializeOwned;
use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

use crate::fault::ServiceError;
use crate::negotiate::MessageFormat;

type DecodeFn =
    dyn Fn(&[u8], MessageFormat) -> Result<Box<dyn Any + Send>, ServiceError> + Send + Sync;

/// Deserialises a request body into one concrete type.
#[derive(Clone)]
pub struct BodyDecoder {
    type_name: &'static str,
    decode: Arc<DecodeFn>,
}

impl BodyDecoder {
    pub fn of<T: DeserializeOwned + Send + 'static>() -> Self {
        Self {
            type_name: type_name::<T>(),
            decode: Arc::new(|body: &[u8], format: MessageFormat| {
                let value: T = match format {
                    MessageFormat::Json => serde_json::from_slice(body)?,
                    MessageFormat::Xml => {
                        let text = std::str::from_utf8(body).map_err(|e| ServiceError::Decode {
                            format: "XML",
                            message: e.to_string(),
                        })?;
                        quick_xml::de::from_str(text)?
                    }
                };
                Ok(Box::new(value) as Box<dyn Any + Send>)
            }),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn decode(&self, body: &[u8], format: MessageFormat) -> Result<Box<dyn Any + Send>, ServiceError> {
        (self.decode)(body, format)
    }
}

impl fmt::Debug for BodyDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BodyDecoder").field(&self.type_name).finish()
    }
}

/// Declared type of a handler parameter.
///
/// Only `String`, `Integer` and `Uuid` may be bound from a URL template.
/// `Stream`, `Form` and `Body` are filled from the request body by content
/// negotiation.
#[derive(Debug, Clone)]
pub enum ParamKind {
    String,
    Integer,
    Uuid,
    Stream,
    Form,
    Body(BodyDecoder),
}

impl ParamKind {
    /// A body parameter deserialised into `T`.
    pub fn body<T: DeserializeOwned + Send + 'static>() -> Self {
        ParamKind::Body(BodyDecoder::of::<T>())
    }

    pub fn name(&self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Uuid => "uuid",
            ParamKind::Stream => "stream",
            ParamKind::Form => "form",
            ParamKind::Body(_) => "body",
        }
    }

    pub fn is_route_bindable(&self) -> bool {
        matches!(self, ParamKind::String | ParamKind::Integer | ParamKind::Uuid)
    }

    pub fn is_negotiated(&self) -> bool {
        !self.is_route_bindable()
    }
}

/// A named, typed handler parameter.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: Arc<str>,
    pub kind: ParamKind,
}

impl ParamSpec {
    pub fn new(name: &str, kind: ParamKind) -> Self {
        Self {
            name: Arc::from(name),
            kind,
        }
    }
}
