//! Normalized identities and the extra data persisted next to them.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::UserResponse;

/// The provider-agnostic user record every provider maps its profile into.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserDetails {
    pub username: Option<String>,
    pub email: String,
    pub fullname: String,
    pub first_name: String,
    pub last_name: String,
}

impl UserDetails {
    /// Fills the three name fields from a single display name.
    pub fn with_full_name(mut self, name: Option<&str>) -> Self {
        let (fullname, first_name, last_name) = split_full_name(name);
        self.fullname = fullname;
        self.first_name = first_name;
        self.last_name = last_name;
        self
    }
}

/// Splits a display name into `(fullname, first_name, last_name)`.
///
/// The first whitespace-separated token is the first name and everything
/// after it is the last name. `None` and blank names yield three empty
/// strings.
pub fn split_full_name(name: Option<&str>) -> (String, String, String) {
    let fullname = name.unwrap_or_default().trim();
    let (first_name, last_name) = fullname
        .split_once(char::is_whitespace)
        .map(|(first, last)| (first, last.trim()))
        .unwrap_or((fullname, ""));

    (
        fullname.to_string(),
        first_name.to_string(),
        last_name.to_string(),
    )
}

/// One entry of a provider's extra-data list: copy `name` from the response
/// and store it under `alias`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtraDataField {
    pub name: &'static str,
    pub alias: &'static str,
    /// Leave the field out entirely when the response has no value for it.
    pub discard_empty: bool,
}

impl ExtraDataField {
    pub const fn new(name: &'static str, alias: &'static str) -> Self {
        Self {
            name,
            alias,
            discard_empty: false,
        }
    }

    pub const fn same(name: &'static str) -> Self {
        Self::new(name, name)
    }

    pub const fn discard_empty(mut self) -> Self {
        self.discard_empty = true;
        self
    }
}

/// Applies `fields` to `response`. Values are copied verbatim; absent ones
/// are stored as `null` unless the field discards empties.
pub fn extra_data(response: &UserResponse, fields: &[ExtraDataField]) -> Map<String, Value> {
    let mut data = Map::new();
    for field in fields {
        match response.get(field.name) {
            Some(value) if !(field.discard_empty && is_empty(value)) => {
                data.insert(field.alias.to_string(), value.clone());
            }
            None if !field.discard_empty => {
                data.insert(field.alias.to_string(), Value::Null);
            }
            _ => {}
        }
    }
    data
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        Value::Number(number) => number.as_f64() == Some(0.0),
    }
}
