//! Option extraction.
//!
//! Each declared option gets one left-to-right pass over the tokens before
//! the first `--`. Consumed indices are shared between passes so a token is
//! never claimed twice.

use super::{Mismatch, RawEntry, RawValue};
use crate::route::{OptionDefinition, OptionToken, RouteDefinition};

/// Result of the option pass.
#[derive(Debug)]
pub(crate) struct OptionScan {
    pub entries: Vec<RawEntry>,

    /// `consumed[i]` is set when token `i` belongs to an option.
    pub consumed: Vec<bool>,
}

pub(crate) fn scan(route: &RouteDefinition, tokens: &[String]) -> Result<OptionScan, Mismatch> {
    let boundary = tokens
        .iter()
        .position(|token| token == "--")
        .unwrap_or(tokens.len());

    let mut consumed = vec![false; tokens.len()];
    let mut entries = Vec::new();

    for option in route.options() {
        let occurrences = collect(route, option, tokens, boundary, &mut consumed);
        entries.push(resolve(option, occurrences)?);
    }

    Ok(OptionScan { entries, consumed })
}

/// One sighting of an option: `None` when written without a value.
type Occurrence = Option<String>;

fn collect(
    route: &RouteDefinition,
    option: &OptionDefinition,
    tokens: &[String],
    boundary: usize,
    consumed: &mut [bool],
) -> Vec<Occurrence> {
    let mut occurrences = Vec::new();
    let mut index = 0;

    while index < boundary {
        if consumed[index] {
            index += 1;
            continue;
        }

        match option.match_token(&tokens[index]) {
            None => {}
            // `--flag=x` is not the flag
            Some(OptionToken::Inline(_)) if option.is_flag() => {}
            Some(OptionToken::Bare) if option.is_flag() => {
                consumed[index] = true;
                occurrences.push(None);
            }
            Some(OptionToken::Inline(value)) => {
                consumed[index] = true;
                occurrences.push(Some(value.to_string()));
            }
            Some(OptionToken::Bare) => {
                consumed[index] = true;
                let next = index + 1;
                if next < boundary && !consumed[next] && !route.is_option_token(&tokens[next]) {
                    consumed[next] = true;
                    occurrences.push(Some(tokens[next].clone()));
                    index = next;
                } else {
                    occurrences.push(None);
                }
            }
        }

        index += 1;
    }

    occurrences
}

fn resolve(option: &OptionDefinition, occurrences: Vec<Occurrence>) -> Result<RawEntry, Mismatch> {
    let name = option.binding_name();

    let Some(value_def) = &option.value else {
        let present = !occurrences.is_empty();
        if !present && !option.is_optional {
            return Err(Mismatch::MissingOption(option.display_name()));
        }
        return Ok(RawEntry::new(name, "bool", RawValue::Flag(present)));
    };

    let alias = value_def.type_alias();

    if occurrences.is_empty() && !option.is_optional {
        return Err(Mismatch::MissingOption(option.display_name()));
    }

    if occurrences.iter().any(Option::is_none) && !value_def.is_optional {
        return Err(Mismatch::OptionValueMissing(option.display_name()));
    }

    let default = option.default_value.clone();

    let value = if option.is_repeated {
        let values: Vec<String> = if occurrences.is_empty() {
            default.into_iter().collect()
        } else {
            occurrences
                .into_iter()
                .filter_map(|occurrence| occurrence.or_else(|| default.clone()))
                .collect()
        };
        RawValue::Many(values)
    } else {
        match occurrences.into_iter().last().flatten().or(default) {
            Some(value) => RawValue::Single(value),
            None => RawValue::Absent,
        }
    };

    Ok(RawEntry::new(name, alias, value))
}
