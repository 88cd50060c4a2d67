//! Route pattern parser.
//!
//! Turns pattern text such as `"build {target?} --tag,-t {t}* --release?"`
//! into validated [`Segment`]s. Syntax summary:
//!
//! - `word` - literal
//! - `{name}`, `{name:type}`, `{name?}`, `{*name}` - positional parameters
//! - `--long`, `-s`, `--long,-s`, optional with a trailing `?`
//! - `--long {value:type=default}` - value option, `*` or `...` after the
//!   closing brace makes it repeated
//! - `|text` - description, inside braces or after an option
//! - `--` - end-of-options separator
//!
//! A placeholder written directly after an option is that option's value, so
//! `deploy --force? {env}` declares `--force` as a value option. Put
//! positional placeholders before the options (`deploy {env} --force?`). A
//! catch-all is the exception: `exec --verbose? {*cmd}` is a flag followed by
//! a positional catch-all.

use super::{OptionDefinition, ParameterDefinition, Segment};
use std::collections::HashSet;
use thiserror::Error;

/// Errors raised while registering a route pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("Unbalanced braces in '{0}'")]
    UnbalancedBraces(String),

    #[error("Missing name in '{0}'")]
    EmptyName(String),

    #[error("Invalid name '{0}'")]
    InvalidName(String),

    #[error("Invalid literal '{0}'")]
    InvalidLiteral(String),

    #[error("Option '{0}' needs a long or short form")]
    MissingOptionForm(String),

    #[error("Only one catch-all parameter is allowed per route")]
    MultipleCatchAll,

    #[error("Catch-all parameter '{0}' must be the last positional element")]
    CatchAllNotLast(String),

    #[error("Required parameter '{0}' cannot follow an optional parameter")]
    RequiredAfterOptional(String),

    #[error("Literal '{0}' cannot follow an optional parameter")]
    LiteralAfterOptional(String),

    #[error("Duplicate name '{0}'")]
    DuplicateName(String),

    #[error("'{0}' is only valid as an option value")]
    OptionOnlySyntax(String),

    #[error("Catch-all '{0}' cannot be an option value")]
    CatchAllOptionValue(String),

    #[error("Only one '--' separator is allowed per route")]
    DuplicateEndOfOptions,

    #[error("Invalid alias '{0}'")]
    InvalidAlias(String),
}

/// Parse pattern text into validated segments.
pub fn parse(pattern: &str) -> Result<Vec<Segment>, PatternError> {
    let tokens = lex(pattern)?;
    let mut segments: Vec<Segment> = Vec::with_capacity(tokens.len());
    // Index of the last option still waiting for a value placeholder.
    let mut pending_option: Option<usize> = None;
    let mut seen_end_of_options = false;

    for token in tokens {
        if token == "--" {
            if seen_end_of_options {
                return Err(PatternError::DuplicateEndOfOptions);
            }
            seen_end_of_options = true;
            segments.push(Segment::EndOfOptions);
            pending_option = None;
        } else if token.starts_with('{') {
            let placeholder = parse_placeholder(&token)?;
            let option_only = placeholder.repeated || placeholder.default.is_some();
            match pending_option.take() {
                Some(index) if !placeholder.param.is_catch_all => {
                    if let Some(Segment::Option(option)) = segments.get_mut(index) {
                        attach_value(option, placeholder);
                    }
                }
                Some(_) if option_only => {
                    return Err(PatternError::CatchAllOptionValue(placeholder.param.name));
                }
                _ => {
                    if option_only {
                        return Err(PatternError::OptionOnlySyntax(token));
                    }
                    segments.push(Segment::Parameter(placeholder.param));
                }
            }
        } else if token.len() > 1 && token.starts_with('-') {
            segments.push(Segment::Option(parse_option(&token)?));
            pending_option = Some(segments.len() - 1);
        } else {
            if token.contains(['{', '}', '|']) {
                return Err(PatternError::InvalidLiteral(token));
            }
            segments.push(Segment::Literal(token));
            pending_option = None;
        }
    }

    validate(&segments)?;
    Ok(segments)
}

// ============================================================================
// Lexing
// ============================================================================

/// Split on whitespace, keeping `{...}` groups (and option descriptions)
/// together even when they contain spaces.
fn lex(pattern: &str) -> Result<Vec<String>, PatternError> {
    let mut tokens: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for ch in pattern.chars() {
        match ch {
            '{' => {
                if depth > 0 {
                    return Err(PatternError::UnbalancedBraces(pattern.to_string()));
                }
                depth += 1;
                current.push(ch);
            }
            '}' => {
                if depth == 0 {
                    return Err(PatternError::UnbalancedBraces(pattern.to_string()));
                }
                depth -= 1;
                current.push(ch);
            }
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }

    if depth != 0 {
        return Err(PatternError::UnbalancedBraces(pattern.to_string()));
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    Ok(merge_descriptions(tokens))
}

/// An option description runs until the next placeholder or option token.
fn merge_descriptions(tokens: Vec<String>) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(tokens.len());
    let mut in_description = false;

    for token in tokens {
        if in_description && !token.starts_with(['{', '-']) {
            if let Some(last) = merged.last_mut() {
                last.push(' ');
                last.push_str(&token);
                continue;
            }
        }
        in_description = token.starts_with('-') && token.contains('|');
        merged.push(token);
    }

    merged
}

// ============================================================================
// Placeholders and options
// ============================================================================

struct Placeholder {
    param: ParameterDefinition,
    default: Option<String>,
    repeated: bool,
}

fn parse_placeholder(token: &str) -> Result<Placeholder, PatternError> {
    let (body, suffix) = token
        .strip_prefix('{')
        .and_then(|rest| rest.rsplit_once('}'))
        .ok_or_else(|| PatternError::UnbalancedBraces(token.to_string()))?;

    let repeated = match suffix {
        "" => false,
        "*" | "..." => true,
        _ => return Err(PatternError::InvalidLiteral(token.to_string())),
    };

    let (spec, description) = split_description(body);

    let (spec, is_catch_all) = match spec.strip_prefix('*') {
        Some(rest) => (rest, true),
        None => (spec, false),
    };

    let (spec, default) = match spec.split_once('=') {
        Some((spec, default)) => (spec, Some(default.to_string())),
        None => (spec, None),
    };

    let (name, type_constraint) = match spec.split_once(':') {
        Some((name, ty)) => (name, Some(ty)),
        None => (spec, None),
    };

    let mut is_optional = false;
    let name = match name.strip_suffix('?') {
        Some(name) => {
            is_optional = true;
            name
        }
        None => name,
    };
    let type_constraint = match type_constraint {
        Some(ty) => match ty.strip_suffix('?') {
            Some(ty) => {
                is_optional = true;
                Some(ty)
            }
            None => Some(ty),
        },
        None => None,
    };

    let name = name.trim();
    if name.is_empty() {
        return Err(PatternError::EmptyName(token.to_string()));
    }
    if !is_valid_name(name) {
        return Err(PatternError::InvalidName(name.to_string()));
    }
    if let Some(ty) = type_constraint {
        if ty.trim().is_empty() {
            return Err(PatternError::EmptyName(token.to_string()));
        }
    }

    Ok(Placeholder {
        param: ParameterDefinition {
            name: name.to_string(),
            is_optional,
            is_catch_all,
            type_constraint: type_constraint.map(|ty| ty.trim().to_string()),
            description,
        },
        default,
        repeated,
    })
}

fn attach_value(option: &mut OptionDefinition, placeholder: Placeholder) {
    option.is_optional |= placeholder.repeated || placeholder.default.is_some();
    option.is_repeated = placeholder.repeated;
    option.default_value = placeholder.default;
    option.value = Some(placeholder.param);
}

fn parse_option(token: &str) -> Result<OptionDefinition, PatternError> {
    let (spec, description) = split_description(token);
    let (spec, is_optional) = match spec.strip_suffix('?') {
        Some(spec) => (spec, true),
        None => (spec, false),
    };

    let mut option = OptionDefinition {
        long_form: None,
        short_form: None,
        is_optional,
        marked_optional: is_optional,
        is_repeated: false,
        value: None,
        default_value: None,
        description,
    };

    for form in spec.split(',') {
        if let Some(long) = form.strip_prefix("--") {
            if long.is_empty() || option.long_form.is_some() || !is_valid_name(long) {
                return Err(PatternError::MissingOptionForm(token.to_string()));
            }
            option.long_form = Some(long.to_string());
        } else if let Some(short) = form.strip_prefix('-') {
            if short.is_empty() || option.short_form.is_some() || !is_valid_name(short) {
                return Err(PatternError::MissingOptionForm(token.to_string()));
            }
            option.short_form = Some(short.to_string());
        } else {
            return Err(PatternError::MissingOptionForm(token.to_string()));
        }
    }

    Ok(option)
}

fn split_description(text: &str) -> (&str, Option<String>) {
    match text.split_once('|') {
        Some((spec, description)) => {
            let description = description.trim();
            let description = (!description.is_empty()).then(|| description.to_string());
            (spec.trim(), description)
        }
        None => (text.trim(), None),
    }
}

fn is_valid_name(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
}

// ============================================================================
// Validation
// ============================================================================

fn validate(segments: &[Segment]) -> Result<(), PatternError> {
    let mut names: HashSet<&str> = HashSet::new();
    let mut forms: HashSet<String> = HashSet::new();
    let mut catch_all: Option<&str> = None;
    let mut seen_optional = false;

    for segment in segments {
        match segment {
            Segment::Literal(word) => {
                if let Some(name) = catch_all {
                    return Err(PatternError::CatchAllNotLast(name.to_string()));
                }
                if seen_optional {
                    return Err(PatternError::LiteralAfterOptional(word.clone()));
                }
            }
            Segment::EndOfOptions => {
                if let Some(name) = catch_all {
                    return Err(PatternError::CatchAllNotLast(name.to_string()));
                }
                if seen_optional {
                    return Err(PatternError::LiteralAfterOptional("--".to_string()));
                }
            }
            Segment::Parameter(param) => {
                if let Some(name) = catch_all {
                    return Err(if param.is_catch_all {
                        PatternError::MultipleCatchAll
                    } else {
                        PatternError::CatchAllNotLast(name.to_string())
                    });
                }
                if param.is_catch_all {
                    catch_all = Some(&param.name);
                } else if param.is_optional {
                    seen_optional = true;
                } else if seen_optional {
                    return Err(PatternError::RequiredAfterOptional(param.name.clone()));
                }
                if !names.insert(&param.name) {
                    return Err(PatternError::DuplicateName(param.name.clone()));
                }
            }
            Segment::Option(option) => {
                if !names.insert(option.binding_name()) {
                    return Err(PatternError::DuplicateName(option.binding_name().to_string()));
                }
                let long = option.long_form.as_ref().map(|l| format!("--{}", l));
                let short = option.short_form.as_ref().map(|s| format!("-{}", s));
                for form in long.into_iter().chain(short) {
                    if !forms.insert(form.clone()) {
                        return Err(PatternError::DuplicateName(form));
                    }
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    fn param(segment: &Segment) -> &ParameterDefinition {
        match segment {
            Segment::Parameter(param) => param,
            other => panic!("expected parameter, got {:?}", other),
        }
    }

    fn option(segment: &Segment) -> &OptionDefinition {
        match segment {
            Segment::Option(option) => option,
            other => panic!("expected option, got {:?}", other),
        }
    }

    #[test]
    fn test_literals_and_parameters() {
        let segments = parse("deploy {env} {region?} {*rest}").unwrap();
        assert_eq!(segments.len(), 4);
        assert_eq!(segments[0], Segment::Literal("deploy".to_string()));

        let env = param(&segments[1]);
        assert_eq!(env.name, "env");
        assert!(env.is_required());

        assert!(param(&segments[2]).is_optional);
        assert!(param(&segments[3]).is_catch_all);
    }

    #[test]
    fn test_typed_parameters() {
        let segments = parse("wait {seconds:int} {until:datetime?}").unwrap();
        assert_eq!(param(&segments[1]).type_constraint.as_deref(), Some("int"));

        let until = param(&segments[2]);
        assert_eq!(until.type_constraint.as_deref(), Some("datetime"));
        assert!(until.is_optional);
    }

    #[test]
    fn test_descriptions_may_contain_spaces() {
        let segments = parse("deploy {env|Target environment} --force,-f?|Skip all checks --tag {t}").unwrap();
        assert_eq!(
            param(&segments[1]).description.as_deref(),
            Some("Target environment")
        );

        let force = option(&segments[2]);
        assert_eq!(force.description.as_deref(), Some("Skip all checks"));
        assert!(force.is_optional);
        assert_eq!(force.short_form.as_deref(), Some("f"));

        assert_eq!(option(&segments[3]).binding_name(), "t");
    }

    #[test]
    fn test_value_options() {
        let segments = parse("serve --port,-p? {port:int=8080} --host {host?}").unwrap();

        let port = option(&segments[1]);
        assert!(port.expects_value());
        assert_eq!(port.type_constraint(), Some("int"));
        assert_eq!(port.default_value.as_deref(), Some("8080"));
        assert!(port.is_optional);
        assert!(!port.parameter_is_optional());

        let host = option(&segments[2]);
        assert!(!host.is_optional);
        assert!(host.parameter_is_optional());
    }

    #[rstest]
    #[case("build --tag {t}*")]
    #[case("build --tag {t}...")]
    fn test_repeated_option_suffixes(#[case] pattern: &str) {
        let segments = parse(pattern).unwrap();
        assert!(option(&segments[1]).is_repeated);
    }

    #[test]
    fn test_end_of_options_segment() {
        let segments = parse("exec {cmd} -- {*args}").unwrap();
        assert_eq!(segments[2], Segment::EndOfOptions);
    }

    #[test]
    fn test_single_dash_is_literal() {
        let segments = parse("cat -").unwrap();
        assert_eq!(segments[1], Segment::Literal("-".to_string()));
    }

    #[test]
    fn test_empty_pattern_is_allowed() {
        assert!(parse("").unwrap().is_empty());
    }

    #[rstest]
    #[case("deploy {env", PatternError::UnbalancedBraces("deploy {env".to_string()))]
    #[case("deploy env}", PatternError::UnbalancedBraces("deploy env}".to_string()))]
    #[case("deploy {}", PatternError::EmptyName("{}".to_string()))]
    #[case("a {*x} {*y}", PatternError::MultipleCatchAll)]
    #[case("a {*x} {y}", PatternError::CatchAllNotLast("x".to_string()))]
    #[case("a {*x} b", PatternError::CatchAllNotLast("x".to_string()))]
    #[case("a {x?} {y}", PatternError::RequiredAfterOptional("y".to_string()))]
    #[case("a {x?} b", PatternError::LiteralAfterOptional("b".to_string()))]
    #[case("a {x} {x}", PatternError::DuplicateName("x".to_string()))]
    #[case("a {x} --x", PatternError::DuplicateName("x".to_string()))]
    #[case("a -- {x} --", PatternError::DuplicateEndOfOptions)]
    #[case("a {x}*", PatternError::OptionOnlySyntax("{x}*".to_string()))]
    #[case("a --tag {*t}*", PatternError::CatchAllOptionValue("t".to_string()))]
    #[case("a {*t=x}", PatternError::OptionOnlySyntax("{*t=x}".to_string()))]
    fn test_invalid_patterns(#[case] pattern: &str, #[case] expected: PatternError) {
        assert_eq!(parse(pattern), Err(expected));
    }

    #[test]
    fn test_option_without_forms() {
        assert_matches!(parse("a --,-"), Err(PatternError::MissingOptionForm(_)));
        assert_matches!(parse("a --verbose,--loud"), Err(PatternError::MissingOptionForm(_)));
    }

    #[test]
    fn test_catch_all_after_option_is_positional() {
        let segments = parse("exec --verbose? {*cmd}").unwrap();
        assert_eq!(segments.len(), 3);

        let verbose = option(&segments[1]);
        assert!(verbose.is_flag());
        assert!(verbose.is_optional);
        assert!(param(&segments[2]).is_catch_all);
    }

    #[test]
    fn test_placeholder_after_option_is_its_value() {
        let segments = parse("deploy --force? {env}").unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(option(&segments[1]).binding_name(), "env");

        let segments = parse("deploy {env} --force?").unwrap();
        assert_eq!(param(&segments[1]).name, "env");
        assert!(option(&segments[2]).is_flag());
    }

    #[test]
    fn test_repeated_and_defaulted_values_make_option_optional() {
        let segments = parse("build --tag {t}* --level {l:int=1} --out {o}").unwrap();
        let tag = option(&segments[1]);
        assert!(tag.is_optional);
        assert!(!tag.marked_optional);
        assert!(option(&segments[2]).is_optional);
        assert!(!option(&segments[3]).is_optional);
    }

    #[test]
    fn test_optional_before_catch_all_is_valid() {
        let segments = parse("copy {src?} {*rest}").unwrap();
        assert!(param(&segments[1]).is_optional);
        assert!(param(&segments[2]).is_catch_all);
    }
}
