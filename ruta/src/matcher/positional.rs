//! Positional binding over the tokens left after option extraction.

use super::{Mismatch, RawEntry, RawValue};
use crate::route::{RouteDefinition, Segment};

/// Tokens not consumed by options, minus the first `--` unless the route
/// declares it as a segment.
fn positional_tokens<'a>(route: &RouteDefinition, tokens: &'a [String], consumed: &[bool]) -> Vec<&'a str> {
    let keep_separator = route.has_end_of_options();
    let mut separator_seen = false;

    tokens
        .iter()
        .enumerate()
        .filter(|(index, _)| !consumed[*index])
        .filter_map(|(_, token)| {
            if token == "--" && !separator_seen {
                separator_seen = true;
                if !keep_separator {
                    return None;
                }
            }
            Some(token.as_str())
        })
        .collect()
}

pub(crate) fn bind(
    route: &RouteDefinition,
    tokens: &[String],
    consumed: &[bool],
) -> Result<Vec<RawEntry>, Mismatch> {
    let positional = positional_tokens(route, tokens, consumed);

    let needed = route.min_positional();
    if positional.len() < needed {
        return Err(Mismatch::TooFewTokens {
            needed,
            found: positional.len(),
        });
    }

    let mut cursor = 0;
    let mut entries = Vec::new();

    for word in route.group_prefix() {
        expect_literal(&positional, cursor, word, &[])?;
        cursor += 1;
    }

    let first_literal = route.first_literal_index();

    for (index, segment) in route.segments().iter().enumerate() {
        match segment {
            Segment::Literal(word) => {
                let aliases: &[String] = if Some(index) == first_literal {
                    route.aliases()
                } else {
                    &[]
                };
                expect_literal(&positional, cursor, word, aliases)?;
                cursor += 1;
            }
            Segment::EndOfOptions => {
                if positional.get(cursor) != Some(&"--") {
                    return Err(Mismatch::EndOfOptions);
                }
                cursor += 1;
            }
            Segment::Parameter(param) if param.is_catch_all => {
                let rest = positional[cursor..].iter().map(|t| t.to_string()).collect();
                entries.push(RawEntry::new(&param.name, param.type_alias(), RawValue::Many(rest)));
                cursor = positional.len();
            }
            Segment::Parameter(param) => {
                let value = match positional.get(cursor) {
                    Some(token) => {
                        cursor += 1;
                        RawValue::Single(token.to_string())
                    }
                    None if param.is_optional => RawValue::Absent,
                    None => {
                        return Err(Mismatch::TooFewTokens {
                            needed,
                            found: positional.len(),
                        })
                    }
                };
                entries.push(RawEntry::new(&param.name, param.type_alias(), value));
            }
            Segment::Option(_) => {}
        }
    }

    if cursor < positional.len() {
        let extra = positional[cursor..].iter().map(|t| t.to_string()).collect();
        return Err(Mismatch::ExtraTokens(extra));
    }

    Ok(entries)
}

fn expect_literal(positional: &[&str], cursor: usize, word: &str, aliases: &[String]) -> Result<(), Mismatch> {
    match positional.get(cursor) {
        Some(token) if *token == word || aliases.iter().any(|alias| alias == token) => Ok(()),
        found => Err(Mismatch::Literal {
            expected: word.to_string(),
            found: found.map(|t| t.to_string()),
        }),
    }
}
