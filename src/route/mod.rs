//! # Route Module
//!
//! Compiles URL templates into case-insensitive, anchored regular
//! expressions and binds the captured segments to handler parameters.
//!
//! ## Template grammar
//!
//! | Fragment | Meaning |
//! |---|---|
//! | literal text | matched verbatim (regex metacharacters are escaped) |
//! | `{name}` | one captured segment, typed by the positional parameter |
//! | `{*name}` | a greedy capture spanning segments; string parameters only |
//! | `*` | an uncaptured wildcard |
//!
//! The pattern generated for a `{name}` placeholder depends on the declared
//! kind of the parameter in the same position:
//!
//! | Kind | Pattern |
//! |---|---|
//! | string | `([A-Za-z0-9_\-%.~\\]*?)` |
//! | integer | `(\d*?)` |
//! | uuid | `([a-f0-9]{8}-(?:[a-f0-9]{4}-){3}[a-f0-9]{12})` |
//!
//! Other kinds cannot be bound from a URL. A leading `/` is always
//! optional, so `/add/{a}/{b}` matches `add/1/2` but not `/add/1/2/`. The
//! trailing `/` is optional only when the template itself ends in `/`:
//! `/files/` matches both `/files` and `/files/`.
//!
//! ## Binding
//!
//! Patterns are generated positionally but captures are bound by name: the
//! value captured for `{b}` lands in the slot of the parameter named `b`,
//! wherever it is declared. A capture that fails to convert (an integer that
//! overflows, an empty integer segment) is a `400 Bad Request`.
//!
//! Every compiled route also carries a *shape* pattern in which typed
//! placeholders accept any segment. When a path has the right shape but
//! the wrong segment types (`/add/x/4` against `/add/{a}/{b}` with integer
//! parameters), [`CompiledRoute::diagnose`] turns it into a conversion
//! error instead of a `404`.
//!
//! ## Example
//!
//! ```rust
//! use resthost::description::{ParamKind, ParamSpec};
//! use resthost::route::CompiledRoute;
//!
//! let params = [
//!     ParamSpec::new("a", ParamKind::Integer),
//!     ParamSpec::new("b", ParamKind::Integer),
//! ];
//! let route = CompiledRoute::compile("/add/{a}/{b}", &params).unwrap();
//! assert!(route.is_match("/ADD/3/4"));
//! assert_eq!(route.slots().len(), 2);
//! ```

mod compiler;
mod template;

pub use compiler::{CompiledRoute, SlotPlan};
pub use template::{tokenize, Token};
