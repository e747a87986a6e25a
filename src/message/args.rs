use std::any::Any;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::description::ParamKind;

/// A bound argument value.
pub enum ArgValue {
    Text(String),
    Integer(i32),
    Uuid(Uuid),
    Stream(Vec<u8>),
    Form(FormData),
    Body(Box<dyn Any + Send>),
}

impl ArgValue {
    /// Whether this value may occupy a slot declared with `kind`.
    pub fn fits(&self, kind: &ParamKind) -> bool {
        matches!(
            (self, kind),
            (ArgValue::Text(_), ParamKind::String)
                | (ArgValue::Integer(_), ParamKind::Integer)
                | (ArgValue::Uuid(_), ParamKind::Uuid)
                | (ArgValue::Stream(_), ParamKind::Stream)
                | (ArgValue::Form(_), ParamKind::Form)
                | (ArgValue::Body(_), ParamKind::Body(_))
        )
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            ArgValue::Text(_) => "string",
            ArgValue::Integer(_) => "integer",
            ArgValue::Uuid(_) => "uuid",
            ArgValue::Stream(_) => "stream",
            ArgValue::Form(_) => "form",
            ArgValue::Body(_) => "body",
        }
    }
}

impl fmt::Debug for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Text(s) => f.debug_tuple("Text").field(s).finish(),
            ArgValue::Integer(i) => f.debug_tuple("Integer").field(i).finish(),
            ArgValue::Uuid(u) => f.debug_tuple("Uuid").field(u).finish(),
            ArgValue::Stream(b) => write!(f, "Stream({} bytes)", b.len()),
            ArgValue::Form(form) => f.debug_tuple("Form").field(form).finish(),
            ArgValue::Body(_) => f.write_str("Body(..)"),
        }
    }
}

/// Decoded `application/x-www-form-urlencoded` pairs, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData(Vec<(String, String)>);

impl FormData {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The argument slots handed to a handler, one per declared parameter.
///
/// Slots are addressed by parameter name. A slot nothing could fill is
/// `None`; the accessors return `None` both for empty slots and for a value
/// of a different kind.
#[derive(Debug)]
pub struct Args {
    names: Vec<Arc<str>>,
    slots: Vec<Option<ArgValue>>,
}

impl Args {
    pub(crate) fn new(names: Vec<Arc<str>>, slots: Vec<Option<ArgValue>>) -> Self {
        debug_assert_eq!(names.len(), slots.len());
        Self { names, slots }
    }

    fn slot(&self, name: &str) -> Option<&ArgValue> {
        let index = self.names.iter().position(|n| &**n == name)?;
        self.slots.get(index)?.as_ref()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.slot(name).is_some()
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.slot(name)? {
            ArgValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn integer(&self, name: &str) -> Option<i32> {
        match self.slot(name)? {
            ArgValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn uuid(&self, name: &str) -> Option<Uuid> {
        match self.slot(name)? {
            ArgValue::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    pub fn stream(&self, name: &str) -> Option<&[u8]> {
        match self.slot(name)? {
            ArgValue::Stream(b) => Some(b),
            _ => None,
        }
    }

    pub fn form(&self, name: &str) -> Option<&FormData> {
        match self.slot(name)? {
            ArgValue::Form(form) => Some(form),
            _ => None,
        }
    }

    /// Move a decoded body out of its slot.
    ///
    /// Returns `None` when the slot is empty or holds a different type; the
    /// slot is left untouched in that case.
    pub fn take_body<T: 'static>(&mut self, name: &str) -> Option<T> {
        let index = self.names.iter().position(|n| &**n == name)?;
        let slot = self.slots.get_mut(index)?;
        match slot.take() {
            Some(ArgValue::Body(boxed)) => match boxed.downcast::<T>() {
                Ok(value) => Some(*value),
                Err(original) => {
                    *slot = Some(ArgValue::Body(original));
                    None
                }
            },
            other => {
                *slot = other;
                None
            }
        }
    }
}
