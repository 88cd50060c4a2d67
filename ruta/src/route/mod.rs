//! Route model.
//!
//! A [`RouteDefinition`] is the immutable description of one command shape:
//! an ordered list of [`Segment`]s, an optional group prefix, aliases for the
//! first literal word, and metadata used by behaviors and tooling.
//!
//! Routes are usually built from the textual pattern syntax (see
//! [`pattern`]), e.g. `"deploy {env} --dry-run?"`.

use std::any::TypeId;
use std::cmp::Ordering;
use std::fmt;

pub mod pattern;

pub use pattern::PatternError;

// ============================================================================
// Segments
// ============================================================================

/// One element of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// A literal word that must appear verbatim (case-sensitive).
    Literal(String),

    /// A positional parameter.
    Parameter(ParameterDefinition),

    /// A flag or value option (position independent).
    Option(OptionDefinition),

    /// The explicit `--` end-of-options separator.
    EndOfOptions,
}

/// A positional parameter (or the value placeholder of an option).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDefinition {
    /// Logical name the bound value is stored under.
    pub name: String,

    /// Whether the token may be absent.
    pub is_optional: bool,

    /// Whether this parameter swallows every remaining positional token.
    pub is_catch_all: bool,

    /// Type alias used for conversion (`None` means plain string).
    pub type_constraint: Option<String>,

    /// Human readable description.
    pub description: Option<String>,
}

impl ParameterDefinition {
    /// Create a required, untyped parameter.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_optional: false,
            is_catch_all: false,
            type_constraint: None,
            description: None,
        }
    }

    /// Type alias used for conversion, defaulting to `string`.
    pub fn type_alias(&self) -> &str {
        self.type_constraint.as_deref().unwrap_or("string")
    }

    /// Required parameters need a token and are not catch-all.
    pub fn is_required(&self) -> bool {
        !self.is_optional && !self.is_catch_all
    }
}

/// A flag (`--verbose`) or value option (`--out {file}`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionDefinition {
    /// Long form without the leading `--`.
    pub long_form: Option<String>,

    /// Short form without the leading `-`.
    pub short_form: Option<String>,

    /// Whether the option may be left out entirely. Repeated options and
    /// options with a default are always optional.
    pub is_optional: bool,

    /// Whether the pattern wrote a trailing `?` on the option.
    pub marked_optional: bool,

    /// Whether every occurrence is collected into a list.
    pub is_repeated: bool,

    /// Value placeholder; `None` for flags.
    pub value: Option<ParameterDefinition>,

    /// Literal bound when the option (or its optional value) is omitted.
    pub default_value: Option<String>,

    /// Human readable description.
    pub description: Option<String>,
}

/// How a token refers to an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionToken<'a> {
    /// `--long` or `-s`.
    Bare,

    /// `--long=value` or `-s=value`.
    Inline(&'a str),
}

impl OptionDefinition {
    /// Create a required flag with a long form.
    pub fn flag(long: impl Into<String>) -> Self {
        Self {
            long_form: Some(long.into()),
            short_form: None,
            is_optional: false,
            marked_optional: false,
            is_repeated: false,
            value: None,
            default_value: None,
            description: None,
        }
    }

    /// Flags carry no value and never consume a following token.
    pub fn is_flag(&self) -> bool {
        self.value.is_none()
    }

    /// Value options consume a value token (or an inline `=value`).
    pub fn expects_value(&self) -> bool {
        self.value.is_some()
    }

    /// Whether the option may be present without a value.
    pub fn parameter_is_optional(&self) -> bool {
        self.value.as_ref().is_some_and(|v| v.is_optional)
    }

    /// Type alias of the value, if any.
    pub fn type_constraint(&self) -> Option<&str> {
        self.value.as_ref().and_then(|v| v.type_constraint.as_deref())
    }

    /// Name the bound value is stored under.
    ///
    /// Value options use their placeholder name (`--tag {t}` binds `t`),
    /// flags use the long form, falling back to the short form.
    pub fn binding_name(&self) -> &str {
        if let Some(value) = &self.value {
            return &value.name;
        }
        self.long_form
            .as_deref()
            .or(self.short_form.as_deref())
            .unwrap_or_default()
    }

    /// Display form used in messages, e.g. `--tag` or `-t`.
    pub fn display_name(&self) -> String {
        match (&self.long_form, &self.short_form) {
            (Some(long), _) => format!("--{}", long),
            (None, Some(short)) => format!("-{}", short),
            (None, None) => String::new(),
        }
    }

    /// Check whether `token` names this option.
    pub fn match_token<'a>(&self, token: &'a str) -> Option<OptionToken<'a>> {
        let (head, inline) = match token.split_once('=') {
            Some((head, value)) => (head, Some(value)),
            None => (token, None),
        };

        let named = if let Some(long) = head.strip_prefix("--") {
            self.long_form.as_deref() == Some(long)
        } else if let Some(short) = head.strip_prefix('-') {
            self.short_form.as_deref() == Some(short)
        } else {
            false
        };

        if !named {
            return None;
        }

        Some(match inline {
            Some(value) => OptionToken::Inline(value),
            None => OptionToken::Bare,
        })
    }
}

// ============================================================================
// Capabilities
// ============================================================================

/// Marker type attached to routes so filtered behaviors can select them.
///
/// ```
/// use ruta::Capability;
///
/// struct Destructive;
/// impl Capability for Destructive {}
/// ```
pub trait Capability: 'static {
    /// Name shown in logs and tooling.
    fn name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Runtime identity of a [`Capability`] type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CapabilityId {
    id: TypeId,
    name: &'static str,
}

impl CapabilityId {
    /// Identity of capability `C`.
    pub fn of<C: Capability>() -> Self {
        Self {
            id: TypeId::of::<C>(),
            name: C::name(),
        }
    }

    /// Name of the capability type.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

// ============================================================================
// Specificity
// ============================================================================

/// Ranking key of a route; greater means more specific.
///
/// Ordering: more literals, then more required elements, then fewer optional
/// elements, then routes without a catch-all before routes with one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Specificity {
    /// Literal words, including group prefix words and `--`.
    pub literals: usize,

    /// Required non-catch-all parameters plus required options.
    pub required: usize,

    /// Optional parameters plus optional options.
    pub optional: usize,

    /// Whether the route ends in a catch-all parameter.
    pub catch_all: bool,
}

impl Specificity {
    fn compute(group_prefix: &[String], segments: &[Segment]) -> Self {
        let mut spec = Specificity {
            literals: group_prefix.len(),
            ..Default::default()
        };

        for segment in segments {
            match segment {
                Segment::Literal(_) | Segment::EndOfOptions => spec.literals += 1,
                Segment::Parameter(param) if param.is_catch_all => spec.catch_all = true,
                Segment::Parameter(param) if param.is_optional => spec.optional += 1,
                Segment::Parameter(_) => spec.required += 1,
                Segment::Option(option) if option.is_optional => spec.optional += 1,
                Segment::Option(_) => spec.required += 1,
            }
        }

        spec
    }
}

impl Ord for Specificity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.literals
            .cmp(&other.literals)
            .then(self.required.cmp(&other.required))
            .then(other.optional.cmp(&self.optional))
            .then(other.catch_all.cmp(&self.catch_all))
    }
}

impl PartialOrd for Specificity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ============================================================================
// Route Definition
// ============================================================================

/// Immutable description of one registered route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDefinition {
    pattern: String,
    group_prefix: Vec<String>,
    segments: Vec<Segment>,
    aliases: Vec<String>,
    description: Option<String>,
    capabilities: Vec<CapabilityId>,
    specificity: Specificity,
    order: usize,
}

impl RouteDefinition {
    /// Parse a route pattern.
    ///
    /// # Example
    ///
    /// ```
    /// use ruta::route::RouteDefinition;
    ///
    /// let route = RouteDefinition::parse("copy {src} {*rest}").unwrap();
    /// assert_eq!(route.literal_prefix(), vec!["copy"]);
    /// assert!(route.catch_all().is_some());
    /// ```
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let segments = pattern::parse(pattern)?;
        Ok(Self::from_segments(pattern, segments))
    }

    /// Build a route from already validated segments.
    pub fn from_segments(pattern: impl Into<String>, segments: Vec<Segment>) -> Self {
        let specificity = Specificity::compute(&[], &segments);
        Self {
            pattern: pattern.into(),
            group_prefix: Vec::new(),
            segments,
            aliases: Vec::new(),
            description: None,
            capabilities: Vec::new(),
            specificity,
            order: 0,
        }
    }

    pub(crate) fn with_group_prefix(mut self, prefix: Vec<String>) -> Self {
        self.group_prefix = prefix;
        self.specificity = Specificity::compute(&self.group_prefix, &self.segments);
        self
    }

    pub(crate) fn with_aliases(mut self, aliases: Vec<String>) -> Result<Self, PatternError> {
        if !aliases.is_empty() && self.first_literal_index().is_none() {
            return Err(PatternError::InvalidAlias(aliases.join(", ")));
        }
        for alias in &aliases {
            if alias.is_empty() || alias.starts_with('-') || alias.contains(char::is_whitespace) {
                return Err(PatternError::InvalidAlias(alias.clone()));
            }
        }
        self.aliases = aliases;
        Ok(self)
    }

    pub(crate) fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub(crate) fn with_capabilities(mut self, capabilities: Vec<CapabilityId>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub(crate) fn with_order(mut self, order: usize) -> Self {
        self.order = order;
        self
    }

    /// Pattern text as registered (without the group prefix).
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Group words matched before the pattern's own segments.
    pub fn group_prefix(&self) -> &[String] {
        &self.group_prefix
    }

    /// Segments in declaration order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Alternative spellings of the first pattern literal.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Route description.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Capabilities attached to the route.
    pub fn capabilities(&self) -> &[CapabilityId] {
        &self.capabilities
    }

    /// Whether the route carries `capability`.
    pub fn has_capability(&self, capability: CapabilityId) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Ranking key.
    pub fn specificity(&self) -> Specificity {
        self.specificity
    }

    /// Registration index within the router.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Positional parameters (option values excluded).
    pub fn parameters(&self) -> impl Iterator<Item = &ParameterDefinition> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Parameter(param) => Some(param),
            _ => None,
        })
    }

    /// Declared options.
    pub fn options(&self) -> impl Iterator<Item = &OptionDefinition> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Option(option) => Some(option),
            _ => None,
        })
    }

    /// The catch-all parameter, if any.
    pub fn catch_all(&self) -> Option<&ParameterDefinition> {
        self.parameters().find(|param| param.is_catch_all)
    }

    /// Whether the pattern contains an explicit `--` segment.
    pub fn has_end_of_options(&self) -> bool {
        self.segments
            .iter()
            .any(|segment| matches!(segment, Segment::EndOfOptions))
    }

    /// Group prefix words followed by the leading literal words.
    pub fn literal_prefix(&self) -> Vec<&str> {
        let leading = self
            .segments
            .iter()
            .filter(|segment| !matches!(segment, Segment::Option(_)))
            .map_while(|segment| match segment {
                Segment::Literal(word) => Some(word.as_str()),
                _ => None,
            });

        self.group_prefix
            .iter()
            .map(String::as_str)
            .chain(leading)
            .collect()
    }

    /// Minimum positional tokens: literals plus required parameters.
    pub fn min_positional(&self) -> usize {
        let own = self
            .segments
            .iter()
            .filter(|segment| match segment {
                Segment::Literal(_) | Segment::EndOfOptions => true,
                Segment::Parameter(param) => param.is_required(),
                Segment::Option(_) => false,
            })
            .count();
        self.group_prefix.len() + own
    }

    /// Whether `token` is any form of one of this route's options.
    pub fn is_option_token(&self, token: &str) -> bool {
        self.options().any(|option| option.match_token(token).is_some())
    }

    pub(crate) fn first_literal_index(&self) -> Option<usize> {
        self.segments
            .iter()
            .position(|segment| matches!(segment, Segment::Literal(_)))
    }
}

fn write_placeholder(
    f: &mut fmt::Formatter<'_>,
    param: &ParameterDefinition,
    default: Option<&str>,
) -> fmt::Result {
    write!(f, "{{")?;
    if param.is_catch_all {
        write!(f, "*")?;
    }
    write!(f, "{}", param.name)?;
    if let Some(ty) = &param.type_constraint {
        write!(f, ":{}", ty)?;
    }
    if param.is_optional {
        write!(f, "?")?;
    }
    if let Some(default) = default {
        write!(f, "={}", default)?;
    }
    write!(f, "}}")
}

impl fmt::Display for ParameterDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_placeholder(f, self, None)
    }
}

impl fmt::Display for OptionDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let forms: Vec<String> = self
            .long_form
            .iter()
            .map(|long| format!("--{}", long))
            .chain(self.short_form.iter().map(|short| format!("-{}", short)))
            .collect();
        write!(f, "{}", forms.join(","))?;
        if self.marked_optional {
            write!(f, "?")?;
        }
        if let Some(value) = &self.value {
            write!(f, " ")?;
            write_placeholder(f, value, self.default_value.as_deref())?;
            if self.is_repeated {
                write!(f, "*")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Literal(word) => write!(f, "{}", word),
            Segment::Parameter(param) => write!(f, "{}", param),
            Segment::Option(option) => write!(f, "{}", option),
            Segment::EndOfOptions => write!(f, "--"),
        }
    }
}

/// Canonical pattern text, group prefix included.
impl fmt::Display for RouteDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .group_prefix
            .iter()
            .cloned()
            .chain(self.segments.iter().map(ToString::to_string))
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}
