//! # Message Module
//!
//! The per-request state that flows through the dispatcher stack.
//!
//! ## Overview
//!
//! - [`RequestContext`] - the inbound request plus everything the dispatchers
//!   learn about it on the way down (operation-relative path, the endpoint
//!   and operation that took it, the policies applied, a free-form
//!   extension map for policies and inspectors)
//! - [`ResponseContext`] - the mutable response under construction; status,
//!   headers, cookies, content type and body are written by handlers,
//!   negotiation and fault handling, then flushed exactly once
//! - [`Args`] - the positional argument slots bound for a handler
//! - [`Reply`] - what a handler hands back for negotiation
//!
//! ## Header storage
//!
//! Headers are kept in a [`HeaderVec`]: a `SmallVec` that stays on the stack
//! for the common case of at most sixteen headers. Names are `Arc<str>` so
//! repeated names are shared rather than copied.

mod args;
mod reply;
mod request;
mod response;

pub use args::{ArgValue, Args, FormData};
pub use reply::{Document, Reply};
pub use request::RequestContext;
pub use response::{FlushedResponse, ResponseContext};

pub(crate) use reply::xml_root_name;

use smallvec::SmallVec;
use std::sync::Arc;

/// Maximum inline headers before heap allocation.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

pub(crate) fn find_header<'a>(headers: &'a HeaderVec, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
