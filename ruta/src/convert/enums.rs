//! Enum conversion by case-insensitive member name.

use super::value::{EnumValue, Value};

/// An enum usable as a type constraint.
///
/// Usually derived:
///
/// ```
/// use ruta::RouteEnum;
///
/// #[derive(Debug, Clone, Copy, PartialEq, RouteEnum)]
/// #[ruta(alias = "env")]
/// enum Environment {
///     Dev,
///     Staging,
///     #[ruta(name = "prod")]
///     Production,
/// }
///
/// assert_eq!(Environment::variants(), &["Dev", "Staging", "prod"]);
/// assert_eq!(Environment::from_variant("prod"), Some(Environment::Production));
/// ```
pub trait RouteEnum: Sized + Send + Sync + 'static {
    /// Type name used to match `{x:TypeName}` constraints.
    const TYPE_NAME: &'static str;

    /// Additional alias, e.g. `{x:env}`.
    const ALIAS: Option<&'static str> = None;

    /// Canonical member names in declaration order.
    fn variants() -> &'static [&'static str];

    /// Exact lookup by canonical member name.
    fn from_variant(name: &str) -> Option<Self>;

    /// Canonical name of this member.
    fn variant(&self) -> &'static str;
}

/// Registry entry for one [`RouteEnum`].
#[derive(Debug, Clone)]
pub(crate) struct EnumConverter {
    type_name: &'static str,
    alias: Option<&'static str>,
    variants: &'static [&'static str],
}

impl EnumConverter {
    pub(crate) fn of<E: RouteEnum>() -> Self {
        Self {
            type_name: E::TYPE_NAME,
            alias: E::ALIAS,
            variants: E::variants(),
        }
    }

    pub(crate) fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether `alias` (already lowercased) names this enum.
    pub(crate) fn answers_to(&self, alias: &str) -> bool {
        self.type_name.eq_ignore_ascii_case(alias)
            || self.alias.is_some_and(|a| a.eq_ignore_ascii_case(alias))
    }

    pub(crate) fn convert(&self, raw: &str) -> Option<Value> {
        self.variants
            .iter()
            .find(|member| member.eq_ignore_ascii_case(raw))
            .map(|member| {
                Value::Enum(EnumValue {
                    type_name: self.type_name,
                    member: *member,
                })
            })
    }

    pub(crate) fn hint(&self) -> String {
        format!("Valid values: {}", self.variants.join(", "))
    }
}
