use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use uuid::Uuid;

use crate::fault::ServiceError;

/// Namespace of the XML envelope used for dynamic records.
pub const DYNAMIC_NAMESPACE: &str = "http://tempuri.org";

/// A scalar field value of a [`DynamicRecord`].
#[derive(Debug, Clone, PartialEq)]
pub enum DynamicValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Uuid(Uuid),
}

impl DynamicValue {
    fn xml_text(&self) -> Option<String> {
        match self {
            DynamicValue::Null => None,
            DynamicValue::Bool(b) => Some(b.to_string()),
            DynamicValue::Integer(i) => Some(i.to_string()),
            DynamicValue::Float(f) => Some(f.to_string()),
            DynamicValue::Text(s) => Some(s.clone()),
            DynamicValue::Uuid(u) => Some(u.to_string()),
        }
    }
}

impl Serialize for DynamicValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DynamicValue::Null => serializer.serialize_none(),
            DynamicValue::Bool(b) => serializer.serialize_bool(*b),
            DynamicValue::Integer(i) => serializer.serialize_i64(*i),
            DynamicValue::Float(f) => serializer.serialize_f64(*f),
            DynamicValue::Text(s) => serializer.serialize_str(s),
            DynamicValue::Uuid(u) => serializer.collect_str(u),
        }
    }
}

macro_rules! dynamic_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(impl From<$t> for DynamicValue {
            fn from(value: $t) -> Self {
                DynamicValue::$variant(value.into())
            }
        })*
    };
}

dynamic_from!(
    bool => Bool,
    i32 => Integer,
    i64 => Integer,
    u32 => Integer,
    f64 => Float,
    String => Text,
    &str => Text,
    Uuid => Uuid,
);

impl<T: Into<DynamicValue>> From<Option<T>> for DynamicValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(DynamicValue::Null)
    }
}

/// An ad-hoc record with ordered, named fields.
///
/// Handlers use it when the shape of a reply is only known at runtime.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicRecord {
    fields: Vec<(String, DynamicValue)>,
}

impl DynamicRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing an existing one of the same name in place.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<DynamicValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<DynamicValue>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&DynamicValue> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &DynamicValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for DynamicRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Flatten records into the `ArrayOfDynamic` XML envelope.
pub(crate) fn write_xml(records: &[DynamicRecord]) -> Result<Vec<u8>, ServiceError> {
    let mut writer = Writer::new(Vec::new());

    let mut root = BytesStart::new("ArrayOfDynamic");
    root.push_attribute(("xmlns", DYNAMIC_NAMESPACE));
    emit(&mut writer, Event::Start(root))?;

    for record in records {
        emit(&mut writer, Event::Start(BytesStart::new("item")))?;
        for (name, value) in &record.fields {
            if !is_xml_name(name) {
                return Err(ServiceError::invalid_operation(format!(
                    "dynamic field '{name}' is not a valid XML element name"
                )));
            }
            match value.xml_text() {
                Some(text) => {
                    emit(&mut writer, Event::Start(BytesStart::new(name.as_str())))?;
                    emit(&mut writer, Event::Text(BytesText::new(&text)))?;
                    emit(&mut writer, Event::End(BytesEnd::new(name.as_str())))?;
                }
                None => emit(&mut writer, Event::Empty(BytesStart::new(name.as_str())))?,
            }
        }
        emit(&mut writer, Event::End(BytesEnd::new("item")))?;
    }

    emit(&mut writer, Event::End(BytesEnd::new("ArrayOfDynamic")))?;
    Ok(writer.into_inner())
}

/// XML `NCName`: a `Name` without colons, since prefixes are never bound here.
fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(is_name_start_char) && chars.all(is_name_char)
}

fn is_name_start_char(c: char) -> bool {
    matches!(c,
        'A'..='Z' | '_' | 'a'..='z'
        | '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}' | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}' | '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}' | '\u{10000}'..='\u{EFFFF}')
}

fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}' | '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}')
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), ServiceError> {
    writer
        .write_event(event)
        .map_err(|e| ServiceError::invalid_operation(format!("failed to write XML: {e}")))
}
