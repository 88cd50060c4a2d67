//! Bound parameters and typed extraction.

use crate::convert::{ConversionError, FromValue, TypeRegistry, Value};
use crate::matcher::{RawBinding, RawValue};
use crate::{CliError, CliResult, SystemError, UserError};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::any::Any;
use std::fmt;

// ============================================================================
// Params
// ============================================================================

/// Values bound for the selected route, keyed by logical name.
///
/// Positional parameters are stored under their name, value options under
/// their placeholder name and flags under their long form:
///
/// | pattern              | key       | value                     |
/// |----------------------|-----------|---------------------------|
/// | `{env}`              | `env`     | `Value::String`           |
/// | `{n:int?}` (absent)  | `n`       | `Value::Null`             |
/// | `{*rest}`            | `rest`    | `Value::List`             |
/// | `--dry-run?`         | `dry-run` | `Value::Bool`             |
/// | `--tag {t}*`         | `t`       | `Value::List`             |
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: Vec<(String, Value)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Typed lookup. `None` when missing, absent, or of another type.
    ///
    /// Use `Option<T>` to distinguish an absent optional value from a type
    /// mismatch.
    pub fn get<T: FromValue>(&self, name: &str) -> Option<T> {
        self.value(name).and_then(T::from_value)
    }

    /// Raw value lookup.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    /// Whether `name` is bound to a non-null value.
    pub fn contains(&self, name: &str) -> bool {
        self.value(name).is_some_and(|value| !value.is_null())
    }

    /// Flag state; `false` when not bound.
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.value(name), Some(Value::Bool(true)))
    }

    /// Catch-all or repeated values; empty when not bound.
    pub fn list<T: FromValue>(&self, name: &str) -> Vec<T> {
        self.get::<Vec<T>>(name).unwrap_or_default()
    }

    /// Payload of a custom converter.
    pub fn custom<T: Any + Clone>(&self, name: &str) -> Option<T> {
        self.value(name).and_then(Value::downcast::<T>)
    }

    /// Typed lookup for values the handler cannot do without.
    ///
    /// A missing or absent value is a user error; a type mismatch means the
    /// handler disagrees with its route pattern and is reported as a system
    /// error.
    pub fn require<T: FromValue>(&self, name: &str) -> CliResult<T> {
        match self.value(name) {
            None | Some(Value::Null) => Err(UserError::MissingArgument(name.to_string()).into()),
            Some(value) => T::from_value(value).ok_or_else(|| {
                SystemError::Internal(format!(
                    "parameter '{}' cannot be read as {}",
                    name,
                    std::any::type_name::<T>()
                ))
                .into()
            }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Params {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Build a typed argument struct from bound params.
///
/// ```
/// use ruta::{CliResult, FromParams, Params};
///
/// struct CopyArgs {
///     src: String,
///     rest: Vec<String>,
/// }
///
/// impl FromParams for CopyArgs {
///     fn from_params(params: &Params) -> CliResult<Self> {
///         Ok(Self {
///             src: params.require("src")?,
///             rest: params.list("rest"),
///         })
///     }
/// }
/// ```
pub trait FromParams: Sized {
    fn from_params(params: &Params) -> CliResult<Self>;
}

impl FromParams for Params {
    fn from_params(params: &Params) -> CliResult<Self> {
        Ok(params.clone())
    }
}

// ============================================================================
// Conversion failures
// ============================================================================

/// A bound token that could not be converted to its declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionFailure {
    /// Parameter or option value name.
    pub name: String,

    /// Offending token.
    pub raw: String,

    /// Declared type alias.
    pub expected: String,

    /// Index of the failing element for catch-all and repeated values.
    pub element: Option<usize>,

    /// Extra guidance, e.g. the valid enum members.
    pub hint: Option<String>,

    /// The alias did not name any known type.
    pub unknown_type: bool,
}

impl ConversionFailure {
    pub(crate) fn new(name: &str, raw: &str, element: Option<usize>, error: ConversionError) -> Self {
        let (expected, hint, unknown_type) = match error {
            ConversionError::Invalid { expected, hint } => (expected, hint, false),
            ConversionError::UnknownType(unknown) => (unknown, None, true),
        };
        Self {
            name: name.to_string(),
            raw: raw.to_string(),
            expected,
            element,
            hint,
            unknown_type,
        }
    }

    /// Message body without the argument name.
    pub fn reason(&self) -> String {
        let mut reason = if self.unknown_type {
            format!("unknown type '{}' for value '{}'", self.expected, self.raw)
        } else {
            format!("cannot convert '{}' to {}", self.raw, self.expected)
        };
        if let Some(index) = self.element {
            reason.push_str(&format!(" (element {})", index));
        }
        if let Some(hint) = &self.hint {
            reason.push_str("\n\n");
            reason.push_str(hint);
        }
        reason
    }
}

impl fmt::Display for ConversionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid argument '{}': {}", self.name, self.reason())
    }
}

impl std::error::Error for ConversionFailure {}

impl From<ConversionFailure> for CliError {
    fn from(failure: ConversionFailure) -> Self {
        CliError::User(UserError::InvalidArgument {
            reason: failure.reason(),
            arg: failure.name,
        })
    }
}

// ============================================================================
// Raw -> typed
// ============================================================================

/// Convert every raw capture. The first failure wins.
pub(crate) fn bind(raw: &RawBinding, types: &TypeRegistry) -> Result<Params, ConversionFailure> {
    let mut params = Params::new();

    for entry in raw.entries() {
        let alias = entry.type_alias.as_str();
        let value = match &entry.value {
            RawValue::Flag(present) => Value::Bool(*present),
            RawValue::Absent => Value::Null,
            RawValue::Single(token) => types
                .try_convert(token, alias)
                .map_err(|e| ConversionFailure::new(&entry.name, token, None, e))?,
            RawValue::Many(tokens) => {
                let mut items = Vec::with_capacity(tokens.len());
                for (index, token) in tokens.iter().enumerate() {
                    let item = types
                        .try_convert(token, alias)
                        .map_err(|e| ConversionFailure::new(&entry.name, token, Some(index), e))?;
                    items.push(item);
                }
                Value::List(items)
            }
        };
        params.insert(entry.name.clone(), value);
    }

    Ok(params)
}
