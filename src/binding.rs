//! Form binding driven by an explicit per-type schema.
//!
//! A type that wants to be bound from form values implements [`FormSchema`] once, describing
//! the fields it expects. The [`Binder`] owned by the engine caches that description per type
//! and converts raw form values through it into a JSON object that `serde` then deserializes.

use crate::error::Error;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

/// Raw form values, every key may repeat.
pub type FormValues = HashMap<String, Vec<String>>;

/// Target type of a form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Str,
    Int,
    Uint,
    Float,
    Bool,
    /// Every value of a repeated key, each converted with the inner kind.
    List(Box<FieldKind>),
}

/// Description of one bindable field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl Field {
    pub fn required(name: &'static str, kind: FieldKind) -> Field {
        Field {
            name,
            kind,
            required: true,
        }
    }

    pub fn optional(name: &'static str, kind: FieldKind) -> Field {
        Field {
            name,
            kind,
            required: false,
        }
    }
}

/// Implemented by types that can be bound from form values.
///
/// Optional fields that are absent are left out of the intermediate object, so the target type
/// must tolerate them being missing (`Option<T>` or `#[serde(default)]`).
///
/// # Examples
///
/// ```
/// use gee::{Field, FieldKind, FormSchema};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Login {
///     user: String,
///     age: Option<u32>,
/// }
///
/// impl FormSchema for Login {
///     fn fields() -> Vec<Field> {
///         vec![Field::required("user", FieldKind::Str), Field::optional("age", FieldKind::Uint)]
///     }
/// }
/// ```
pub trait FormSchema: DeserializeOwned + 'static {
    fn fields() -> Vec<Field>;
}

/// Binds raw values to typed targets, caching each target's schema by type.
#[derive(Default)]
pub struct Binder {
    schemas: RwLock<HashMap<TypeId, Arc<Vec<Field>>>>,
}

impl Binder {
    pub fn new() -> Binder {
        Binder::default()
    }

    pub fn bind_form<T: FormSchema>(&self, raw: &FormValues) -> crate::Result<T> {
        let fields = self.schema::<T>();

        let mut object = Map::with_capacity(fields.len());
        for field in fields.iter() {
            let values = match raw.get(field.name) {
                Some(values) if !values.is_empty() => values,
                _ if field.required => {
                    return Err(Error::bind(format!("missing form parameter: {}", field.name)).into());
                }
                _ => continue,
            };

            let value = match &field.kind {
                FieldKind::List(inner) => values
                    .iter()
                    .map(|v| convert_value(v, inner))
                    .collect::<Option<Vec<_>>>()
                    .map(Value::Array),
                kind => convert_value(&values[0], kind),
            }
            .ok_or_else(|| Error::bind(format!("invalid form parameter: {}", field.name)))?;

            object.insert(field.name.to_owned(), value);
        }

        serde_json::from_value(Value::Object(object))
            .map_err(|e| Error::bind(format!("could not bind form: {}", e)).into())
    }

    pub fn bind_json<T: DeserializeOwned>(&self, body: &[u8]) -> crate::Result<T> {
        if body.is_empty() {
            return Err(Error::bind("request body is empty").into());
        }

        serde_json::from_slice(body).map_err(|e| Error::bind(format!("could not bind json: {}", e)).into())
    }

    fn schema<T: FormSchema>(&self) -> Arc<Vec<Field>> {
        let type_id = TypeId::of::<T>();
        if let Some(fields) = self.schemas.read().get(&type_id) {
            return fields.clone();
        }

        self.schemas
            .write()
            .entry(type_id)
            .or_insert_with(|| Arc::new(T::fields()))
            .clone()
    }
}

impl Debug for Binder {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Binder {{ cached_schemas: {} }}", self.schemas.read().len())
    }
}

fn convert_value(raw: &str, kind: &FieldKind) -> Option<Value> {
    match kind {
        FieldKind::Str => Some(Value::String(raw.to_owned())),
        FieldKind::Int => raw.parse::<i64>().ok().map(Value::from),
        FieldKind::Uint => raw.parse::<u64>().ok().map(Value::from),
        FieldKind::Float => raw.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number),
        FieldKind::Bool => parse_bool(raw).map(Value::Bool),
        // Nested lists have no form representation.
        FieldKind::List(_) => None,
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

pub(crate) fn parse_form_values(input: &[u8], values: &mut FormValues) {
    for (key, val) in url::form_urlencoded::parse(input) {
        values.entry(key.into_owned()).or_default().push(val.into_owned());
    }
}
