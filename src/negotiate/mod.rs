//! # Content Negotiation Module
//!
//! Converts request bodies into handler arguments and handler replies into
//! response bodies.
//!
//! ## Request side
//!
//! [`deserialize_request`] fills argument slots that routing left empty,
//! keyed on the request's `Content-Type`:
//!
//! | Content type | Produces |
//! |---|---|
//! | `application/json` | the slot's body type, via `serde_json` |
//! | `application/xml`, `text/xml` | the slot's body type, via `quick-xml` |
//! | `application/octet-stream` | the raw bytes |
//! | `application/x-www-form-urlencoded` | decoded name/value pairs |
//! | absent | nothing; the slot stays empty |
//! | anything else | `400 Bad Request` |
//!
//! ## Response side
//!
//! [`serialize_response`] picks a representation per [`Reply`](crate::message::Reply)
//! variant. Typed documents and dynamic records go through
//! [`negotiate_format`], whose priority is:
//!
//! 1. the operation's explicit format override
//! 2. the first media type in `Accept`
//! 3. a `.json` / `.xml` suffix on the request path
//! 4. XML
//!
//! Dynamic records render as JSON objects, or in XML as
//! `<ArrayOfDynamic xmlns="http://tempuri.org"><item>…</item></ArrayOfDynamic>`.

mod decode;
mod dynamic;
mod encode;
mod format;

pub use decode::deserialize_request;
pub use dynamic::{DynamicRecord, DynamicValue, DYNAMIC_NAMESPACE};
pub use encode::{serialize_document, serialize_response};
pub use format::{negotiate_format, media, MessageFormat};
