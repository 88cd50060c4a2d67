//! User-registered converters.

use super::value::Value;
use std::any::Any;
use std::fmt::Display;
use std::marker::PhantomData;
use std::str::FromStr;

/// A user-supplied conversion strategy.
///
/// The registry finds a converter for a type alias by, in order: exact
/// [`target_type`](TypeConverter::target_type), the simple target-type name
/// (module path and generics stripped, case-insensitive), the declared
/// [`alias`](TypeConverter::alias), and finally the converter's own name with
/// a trailing `Converter` removed.
///
/// Returning `None` reports a failure. A panic inside `try_convert` is caught
/// and reported the same way.
///
/// # Example
///
/// ```
/// use ruta::{TypeConverter, Value};
///
/// #[derive(Debug, Clone)]
/// struct Email(String);
///
/// struct EmailConverter;
///
/// impl TypeConverter for EmailConverter {
///     fn target_type(&self) -> &str {
///         "myapp::Email"
///     }
///
///     fn converter_name(&self) -> &str {
///         "EmailConverter"
///     }
///
///     fn try_convert(&self, raw: &str) -> Option<Value> {
///         raw.contains('@').then(|| Value::custom(Email(raw.to_string()), raw))
///     }
/// }
/// ```
pub trait TypeConverter: Send + Sync + 'static {
    /// Full name of the produced type.
    fn target_type(&self) -> &str;

    /// Alias usable in patterns, e.g. `{to:email}`.
    fn alias(&self) -> Option<&str> {
        None
    }

    /// Name of the converter itself.
    fn converter_name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn try_convert(&self, raw: &str) -> Option<Value>;
}

/// Adapts any [`FromStr`] type into a converter.
///
/// The parsed value is stored as [`Value::Custom`] and can be read back with
/// `Params::custom::<T>()`.
pub struct FromStrConverter<T> {
    alias: Option<String>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> FromStrConverter<T>
where
    T: FromStr + Any + Send + Sync,
{
    pub fn new() -> Self {
        Self {
            alias: None,
            _marker: PhantomData,
        }
    }

    /// Also answer to `alias` in patterns.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

impl<T> Default for FromStrConverter<T>
where
    T: FromStr + Any + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TypeConverter for FromStrConverter<T>
where
    T: FromStr + Any + Send + Sync,
    T::Err: Display,
{
    fn target_type(&self) -> &str {
        std::any::type_name::<T>()
    }

    fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    fn try_convert(&self, raw: &str) -> Option<Value> {
        match raw.parse::<T>() {
            Ok(value) => Some(Value::custom(value, raw)),
            Err(e) => {
                tracing::trace!(target_type = self.target_type(), error = %e, "FromStr conversion failed");
                None
            }
        }
    }
}

/// Simple name of a type path: `a::b::Foo<T>` becomes `Foo`.
pub(crate) fn simple_name(type_name: &str) -> &str {
    let base = type_name.split('<').next().unwrap_or(type_name);
    base.rsplit("::").next().unwrap_or(base)
}

/// Converter name with any module path and a trailing `Converter` removed.
pub(crate) fn convention_name(converter_name: &str) -> &str {
    let name = simple_name(converter_name);
    name.strip_suffix("Converter").unwrap_or(name)
}
