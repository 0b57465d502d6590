//! Conversions from this crate's types into template [`Value`]s.
//!
//! Directive values are unescaped when they are extracted, but the templates
//! splice strings into markup verbatim, so every string handed to a template
//! is escaped again here.

use crate::metadata::Metadata;
use gtmpl::Value;
use quick_xml::escape::escape;
use std::collections::HashMap;

impl From<&Metadata> for Value {
    /// Converts every directive into an escaped string field.
    fn from(metadata: &Metadata) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        for (name, value) in metadata.iter() {
            m.insert(name.to_owned(), text(value));
        }
        Value::Object(m)
    }
}

/// Escapes `s` for use as markup text or an attribute value.
pub fn markup(s: &str) -> String {
    escape(s).into_owned()
}

/// Converts `s` into an escaped string value.
pub fn text(s: &str) -> Value {
    Value::String(markup(s))
}

/// Converts an optional string, mapping `None` to [`Value::Nil`].
pub fn optional(s: Option<&str>) -> Value {
    match s {
        Some(s) => text(s),
        None => Value::Nil,
    }
}
