use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::any::type_name;
use std::fmt;
use uuid::Uuid;

use crate::negotiate::DynamicRecord;

/// A typed value the negotiator can render as JSON or XML.
///
/// Implemented for every `Serialize` type, so handlers and faults can hand
/// back their own structs without further ceremony.
pub trait Document: Send + Sync {
    /// Rust type name, used for diagnostics and to derive the XML root.
    fn type_name(&self) -> &'static str;

    fn to_json(&self) -> Result<Vec<u8>, serde_json::Error>;

    fn to_xml(&self) -> Result<String, String>;
}

impl<T: Serialize + Send + Sync> Document for T {
    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    fn to_xml(&self) -> Result<String, String> {
        let name = type_name::<T>();
        let root = xml_root_name(name);
        let written = match xml_item_name(name) {
            Some(tag) => quick_xml::se::to_string_with_root(&root, &Items { tag: &tag, items: self }),
            None => quick_xml::se::to_string_with_root(&root, self),
        };
        written.map_err(|e| e.to_string())
    }
}

/// Collection wrapper: one `<tag>` element per item under the root.
struct Items<'a, T: ?Sized> {
    tag: &'a str,
    items: &'a T,
}

impl<T: Serialize + ?Sized> Serialize for Items<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.tag, self.items)?;
        map.end()
    }
}

/// Element name of one item when `type_name` is a collection.
fn xml_item_name(type_name: &str) -> Option<String> {
    let open = type_name.find('<')?;
    let outer = type_name[..open].rsplit("::").next()?;
    let inner = type_name[open + 1..].strip_suffix('>')?;
    matches!(outer, "Vec" | "VecDeque" | "HashSet" | "BTreeSet").then(|| xml_root_name(inner))
}

/// Root element name for a Rust type name.
///
/// `crate::model::Pet` becomes `Pet`, `Vec<crate::model::Pet>` becomes
/// `ArrayOfPet`.
pub(crate) fn xml_root_name(type_name: &str) -> String {
    let (outer, inner) = match type_name.find('<') {
        Some(open) => (
            &type_name[..open],
            type_name[open + 1..].strip_suffix('>'),
        ),
        None => (type_name, None),
    };
    let outer = outer.rsplit("::").next().unwrap_or(outer);
    match inner {
        Some(inner) if matches!(outer, "Vec" | "VecDeque" | "HashSet" | "BTreeSet") => {
            format!("ArrayOf{}", xml_root_name(inner))
        }
        _ if outer.is_empty() || !outer.starts_with(|c: char| c.is_ascii_alphabetic()) => {
            "Document".to_string()
        }
        _ => outer.to_string(),
    }
}

/// What a handler returns.
pub enum Reply {
    /// No content. Becomes `204 No Content` unless a status was set.
    Empty,
    /// A primitive rendered as `text/plain`.
    Text(String),
    /// Raw bytes rendered as `application/octet-stream`.
    Stream(Vec<u8>),
    /// A typed value rendered in the negotiated format.
    Document(Box<dyn Document>),
    /// One dynamic record.
    Record(DynamicRecord),
    /// A list of dynamic records.
    Records(Vec<DynamicRecord>),
}

impl Reply {
    pub fn document<T: Serialize + Send + Sync + 'static>(value: T) -> Self {
        Reply::Document(Box::new(value))
    }

    pub fn text(value: impl fmt::Display) -> Self {
        Reply::Text(value.to_string())
    }

    pub fn stream(bytes: impl Into<Vec<u8>>) -> Self {
        Reply::Stream(bytes.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Reply::Empty)
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Empty => f.write_str("Empty"),
            Reply::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Reply::Stream(b) => write!(f, "Stream({} bytes)", b.len()),
            Reply::Document(d) => write!(f, "Document({})", d.type_name()),
            Reply::Record(r) => f.debug_tuple("Record").field(r).finish(),
            Reply::Records(r) => write!(f, "Records({})", r.len()),
        }
    }
}

impl From<()> for Reply {
    fn from(_: ()) -> Self {
        Reply::Empty
    }
}

impl From<String> for Reply {
    fn from(value: String) -> Self {
        Reply::Text(value)
    }
}

impl From<&str> for Reply {
    fn from(value: &str) -> Self {
        Reply::Text(value.to_string())
    }
}

macro_rules! text_reply {
    ($($t:ty),*) => {
        $(impl From<$t> for Reply {
            fn from(value: $t) -> Self {
                Reply::Text(value.to_string())
            }
        })*
    };
}

text_reply!(bool, i32, i64, u32, u64, f64, Uuid);

impl From<DynamicRecord> for Reply {
    fn from(value: DynamicRecord) -> Self {
        Reply::Record(value)
    }
}

impl From<Vec<DynamicRecord>> for Reply {
    fn from(value: Vec<DynamicRecord>) -> Self {
        Reply::Records(value)
    }
}

impl<T: Into<Reply>> From<Option<T>> for Reply {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Reply::Empty)
    }
}
