//! Type conversion registry.
//!
//! Maps the type alias written in a pattern (`{n:int}`, `{at:datetime}`,
//! `{env:Environment}`) to a conversion strategy. Conversion never panics:
//! built-ins use `parse` primitives, and custom converters run under
//! `catch_unwind`.

mod builtin;
mod custom;
mod enums;
mod value;

pub use builtin::{format_duration, parse_duration, BuiltinType};
pub use custom::{FromStrConverter, TypeConverter};
pub use enums::RouteEnum;
pub use value::{CustomValue, EnumValue, FromValue, Value};

pub(crate) use value::DATETIME_FORMAT;

use custom::{convention_name, simple_name};
use enums::EnumConverter;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Why a raw token could not be converted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    /// The alias is known but the token does not parse.
    #[error("cannot convert to {expected}")]
    Invalid {
        expected: String,
        hint: Option<String>,
    },

    /// No strategy answers to the alias.
    #[error("unknown type '{0}'")]
    UnknownType(String),
}

/// A resolved strategy for one alias.
enum Strategy<'a> {
    Builtin(BuiltinType),
    Enum(&'a EnumConverter),
    Custom(&'a dyn TypeConverter),
}

/// Alias → strategy table.
///
/// Lookup order: built-ins, registered enums, then custom converters.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    converters: Vec<Arc<dyn TypeConverter>>,
    enums: Vec<EnumConverter>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom converter. Earlier registrations win ties.
    pub fn register<C: TypeConverter>(&mut self, converter: C) {
        self.converters.push(Arc::new(converter));
    }

    /// Register an enum for case-insensitive member lookup.
    pub fn register_enum<E: RouteEnum>(&mut self) {
        self.enums.push(EnumConverter::of::<E>());
    }

    /// Whether some strategy answers to `alias`.
    pub fn knows(&self, alias: &str) -> bool {
        self.resolve(&normalize(alias)).is_some()
    }

    /// Convert a present token.
    pub fn try_convert(&self, raw: &str, alias: &str) -> Result<Value, ConversionError> {
        let alias = normalize(alias);
        match self.resolve(&alias) {
            Some(Strategy::Builtin(ty)) => ty.parse(raw).ok_or_else(|| ConversionError::Invalid {
                expected: ty.name().to_string(),
                hint: None,
            }),
            Some(Strategy::Enum(converter)) => {
                converter
                    .convert(raw)
                    .ok_or_else(|| ConversionError::Invalid {
                        expected: converter.type_name().to_string(),
                        hint: Some(converter.hint()),
                    })
            }
            Some(Strategy::Custom(converter)) => {
                let outcome = catch_unwind(AssertUnwindSafe(|| converter.try_convert(raw)));
                match outcome {
                    Ok(Some(value)) => Ok(value),
                    Ok(None) => Err(ConversionError::Invalid {
                        expected: alias,
                        hint: None,
                    }),
                    Err(_) => {
                        tracing::warn!(
                            converter = converter.converter_name(),
                            "Custom converter panicked"
                        );
                        Err(ConversionError::Invalid {
                            expected: alias,
                            hint: None,
                        })
                    }
                }
            }
            None => Err(ConversionError::UnknownType(alias)),
        }
    }

    /// Convert a token that may be absent.
    ///
    /// Absence yields [`Value::Null`] without invoking any parser. A trailing
    /// `?` on the alias is accepted and ignored.
    pub fn try_convert_optional(
        &self,
        raw: Option<&str>,
        alias: &str,
    ) -> Result<Value, ConversionError> {
        match raw {
            Some(raw) => self.try_convert(raw, alias),
            None => Ok(Value::Null),
        }
    }

    fn resolve(&self, alias: &str) -> Option<Strategy<'_>> {
        if let Some(ty) = BuiltinType::from_alias(alias) {
            return Some(Strategy::Builtin(ty));
        }

        if let Some(converter) = self.enums.iter().find(|e| e.answers_to(alias)) {
            return Some(Strategy::Enum(converter));
        }

        self.find_custom(alias).map(Strategy::Custom)
    }

    fn find_custom(&self, alias: &str) -> Option<&dyn TypeConverter> {
        LookupPass::ORDER.iter().find_map(|pass| {
            self.converters
                .iter()
                .map(|c| c.as_ref())
                .find(|c| pass.matches(*c, alias))
        })
    }
}

/// Custom converter lookup, tried in declaration order.
#[derive(Debug, Clone, Copy)]
enum LookupPass {
    TargetType,
    SimpleName,
    Alias,
    ConventionName,
}

impl LookupPass {
    const ORDER: [LookupPass; 4] = [
        LookupPass::TargetType,
        LookupPass::SimpleName,
        LookupPass::Alias,
        LookupPass::ConventionName,
    ];

    fn matches(self, converter: &dyn TypeConverter, alias: &str) -> bool {
        match self {
            LookupPass::TargetType => converter.target_type().eq_ignore_ascii_case(alias),
            LookupPass::SimpleName => simple_name(converter.target_type()).eq_ignore_ascii_case(alias),
            LookupPass::Alias => converter
                .alias()
                .is_some_and(|a| a.eq_ignore_ascii_case(alias)),
            LookupPass::ConventionName => {
                convention_name(converter.converter_name()).eq_ignore_ascii_case(alias)
            }
        }
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let converters: Vec<&str> = self.converters.iter().map(|c| c.converter_name()).collect();
        f.debug_struct("TypeRegistry")
            .field("converters", &converters)
            .field("enums", &self.enums)
            .finish()
    }
}

/// Lowercase and strip the optionality marker.
fn normalize(alias: &str) -> String {
    alias.trim().trim_end_matches('?').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[derive(Debug, Clone, PartialEq)]
    struct Email(String);

    struct EmailConverter;

    impl TypeConverter for EmailConverter {
        fn target_type(&self) -> &str {
            "app::model::Email"
        }

        fn alias(&self) -> Option<&str> {
            Some("mail")
        }

        fn try_convert(&self, raw: &str) -> Option<Value> {
            raw.contains('@')
                .then(|| Value::custom(Email(raw.to_string()), raw))
        }
    }

    struct ColorConverter;

    impl TypeConverter for ColorConverter {
        fn target_type(&self) -> &str {
            "app::Rgb"
        }

        fn try_convert(&self, raw: &str) -> Option<Value> {
            if raw == "boom" {
                panic!("converter bug");
            }
            (raw.len() == 7 && raw.starts_with('#')).then(|| Value::custom(raw.to_string(), raw))
        }
    }

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry.register(EmailConverter);
        registry.register(ColorConverter);
        registry
    }

    #[test]
    fn test_builtin_lookup_is_case_insensitive() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.try_convert("42", "Int"), Ok(Value::I32(42)));
        assert_eq!(registry.try_convert("42", "int?"), Ok(Value::I32(42)));
    }

    #[test]
    fn test_builtin_failure_names_type() {
        let registry = TypeRegistry::new();
        assert_matches!(
            registry.try_convert("abc", "int"),
            Err(ConversionError::Invalid { expected, hint: None }) if expected == "int"
        );
    }

    #[test]
    fn test_optional_absent_is_null() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.try_convert_optional(None, "int?"), Ok(Value::Null));
        assert!(registry.try_convert_optional(Some("x"), "int?").is_err());
    }

    #[test]
    fn test_custom_lookup_passes() {
        let registry = registry();
        // exact target type
        assert!(registry.try_convert("a@b.c", "app::model::Email").is_ok());
        // simple name
        assert!(registry.try_convert("a@b.c", "email").is_ok());
        assert!(registry.try_convert("#00ff00", "Rgb").is_ok());
        // declared alias
        assert!(registry.try_convert("a@b.c", "mail").is_ok());
        // converter name minus suffix
        assert!(registry.try_convert("#00ff00", "color").is_ok());
    }

    #[test]
    fn test_custom_failure_and_panic() {
        let registry = registry();
        assert_matches!(
            registry.try_convert("nobody", "email"),
            Err(ConversionError::Invalid { .. })
        );
        assert_matches!(
            registry.try_convert("boom", "color"),
            Err(ConversionError::Invalid { .. })
        );
    }

    #[test]
    fn test_unknown_alias() {
        let registry = TypeRegistry::new();
        assert!(!registry.knows("frobnicator"));
        assert_eq!(
            registry.try_convert("x", "frobnicator"),
            Err(ConversionError::UnknownType("frobnicator".to_string()))
        );
    }

    #[test]
    fn test_builtins_shadow_custom() {
        struct IntConverter;
        impl TypeConverter for IntConverter {
            fn target_type(&self) -> &str {
                "int"
            }
            fn try_convert(&self, _raw: &str) -> Option<Value> {
                Some(Value::String("custom".into()))
            }
        }

        let mut registry = TypeRegistry::new();
        registry.register(IntConverter);
        assert_eq!(registry.try_convert("5", "int"), Ok(Value::I32(5)));
    }
}
