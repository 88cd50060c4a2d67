//! Built-in conversion targets.
//!
//! Value types go through non-panicking `parse` primitives. Reference types
//! (URI, paths, IP addresses) are constructed and any construction error is
//! mapped to a plain failure.

use super::value::{Value, DATETIME_FORMAT};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use url::Url;
use uuid::Uuid;

/// A built-in conversion target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinType {
    String,
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Uuid,
    DateTime,
    DateTimeOffset,
    Date,
    Time,
    Duration,
    Uri,
    Path,
    File,
    Directory,
    Ip,
}

impl BuiltinType {
    /// Resolve a lowercase alias.
    pub fn from_alias(alias: &str) -> Option<Self> {
        let ty = match alias {
            "string" | "str" => Self::String,
            "bool" | "boolean" => Self::Bool,
            "char" => Self::Char,
            "sbyte" | "i8" => Self::I8,
            "short" | "i16" => Self::I16,
            "int" | "i32" => Self::I32,
            "long" | "i64" => Self::I64,
            "byte" | "u8" => Self::U8,
            "ushort" | "u16" => Self::U16,
            "uint" | "u32" => Self::U32,
            "ulong" | "u64" => Self::U64,
            "float" | "f32" => Self::F32,
            "double" | "f64" => Self::F64,
            "guid" | "uuid" => Self::Uuid,
            "datetime" => Self::DateTime,
            "datetimeoffset" => Self::DateTimeOffset,
            "dateonly" | "date" => Self::Date,
            "timeonly" | "time" => Self::Time,
            "timespan" | "duration" => Self::Duration,
            "uri" | "url" => Self::Uri,
            "path" => Self::Path,
            "fileinfo" | "file" => Self::File,
            "directoryinfo" | "directory" | "dir" => Self::Directory,
            "ipaddress" | "ip" => Self::Ip,
            _ => return None,
        };
        Some(ty)
    }

    /// Canonical alias used in failure messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Char => "char",
            Self::I8 => "sbyte",
            Self::I16 => "short",
            Self::I32 => "int",
            Self::I64 => "long",
            Self::U8 => "byte",
            Self::U16 => "ushort",
            Self::U32 => "uint",
            Self::U64 => "ulong",
            Self::F32 => "float",
            Self::F64 => "double",
            Self::Uuid => "guid",
            Self::DateTime => "datetime",
            Self::DateTimeOffset => "datetimeoffset",
            Self::Date => "dateonly",
            Self::Time => "timeonly",
            Self::Duration => "timespan",
            Self::Uri => "uri",
            Self::Path => "path",
            Self::File => "fileinfo",
            Self::Directory => "directoryinfo",
            Self::Ip => "ipaddress",
        }
    }

    /// Try to parse `raw`; never panics.
    pub fn parse(self, raw: &str) -> Option<Value> {
        match self {
            Self::String => Some(Value::String(raw.to_string())),
            Self::Bool => parse_bool(raw).map(Value::Bool),
            Self::Char => parse_char(raw).map(Value::Char),
            Self::I8 => parse_num(raw).map(Value::I8),
            Self::I16 => parse_num(raw).map(Value::I16),
            Self::I32 => parse_num(raw).map(Value::I32),
            Self::I64 => parse_num(raw).map(Value::I64),
            Self::U8 => parse_num(raw).map(Value::U8),
            Self::U16 => parse_num(raw).map(Value::U16),
            Self::U32 => parse_num(raw).map(Value::U32),
            Self::U64 => parse_num(raw).map(Value::U64),
            Self::F32 => parse_num(raw).map(Value::F32),
            Self::F64 => parse_num(raw).map(Value::F64),
            Self::Uuid => Uuid::parse_str(raw).ok().map(Value::Uuid),
            Self::DateTime => parse_datetime(raw).map(Value::DateTime),
            Self::DateTimeOffset => DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(Value::DateTimeOffset),
            Self::Date => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(Value::Date),
            Self::Time => parse_time(raw).map(Value::Time),
            Self::Duration => parse_duration(raw).map(Value::Duration),
            Self::Uri => Url::parse(raw).ok().map(Value::Uri),
            Self::Path | Self::File | Self::Directory => parse_path(raw).map(Value::Path),
            Self::Ip => raw.parse::<IpAddr>().ok().map(Value::Ip),
        }
    }
}

fn parse_num<T: FromStr>(raw: &str) -> Option<T> {
    raw.parse().ok()
}

fn parse_bool(raw: &str) -> Option<bool> {
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn parse_char(raw: &str) -> Option<char> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        DATETIME_FORMAT,
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];

    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.naive_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

/// Paths are rejected when empty or containing NUL, the two inputs no
/// platform can open.
fn parse_path(raw: &str) -> Option<PathBuf> {
    if raw.is_empty() || raw.contains('\0') {
        None
    } else {
        Some(PathBuf::from(raw))
    }
}

// ============================================================================
// Durations
// ============================================================================

const SECONDS_PER_DAY: i64 = 86_400;

/// Parse `[-][d.]hh:mm[:ss[.fffffffff]]`, or a bare day count.
pub fn parse_duration(raw: &str) -> Option<TimeDelta> {
    let (negative, body) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };

    if body.is_empty() {
        return None;
    }

    if body.chars().all(|c| c.is_ascii_digit()) {
        let days: i64 = body.parse().ok()?;
        let total = days.checked_mul(SECONDS_PER_DAY)?;
        return signed(TimeDelta::new(total, 0)?, negative);
    }

    let (days, clock) = match body.split_once('.') {
        Some((days, clock)) if clock.contains(':') && !days.contains(':') => {
            (days.parse::<i64>().ok()?, clock)
        }
        _ => (0, body),
    };

    let mut parts = clock.split(':');
    let hours: i64 = parse_field(parts.next()?)?;
    let minutes: i64 = parse_field(parts.next()?)?;
    let (seconds, nanos) = match parts.next() {
        Some(field) => parse_seconds(field)?,
        None => (0, 0),
    };
    if parts.next().is_some() || hours >= 24 || minutes >= 60 || seconds >= 60 {
        return None;
    }

    let total = days
        .checked_mul(SECONDS_PER_DAY)?
        .checked_add(hours * 3600 + minutes * 60 + seconds)?;
    signed(TimeDelta::new(total, nanos)?, negative)
}

fn parse_field(field: &str) -> Option<i64> {
    if field.is_empty() || !field.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

fn parse_seconds(field: &str) -> Option<(i64, u32)> {
    match field.split_once('.') {
        Some((secs, fraction)) => {
            if fraction.is_empty()
                || fraction.len() > 9
                || !fraction.chars().all(|c| c.is_ascii_digit())
            {
                return None;
            }
            let padded = format!("{:0<9}", fraction);
            Some((parse_field(secs)?, padded.parse().ok()?))
        }
        None => Some((parse_field(field)?, 0)),
    }
}

fn signed(delta: TimeDelta, negative: bool) -> Option<TimeDelta> {
    if negative {
        TimeDelta::zero().checked_sub(&delta)
    } else {
        Some(delta)
    }
}

/// Invariant textual form: `[-][d.]hh:mm:ss[.fffffffff]`.
pub fn format_duration(delta: TimeDelta) -> String {
    let negative = delta < TimeDelta::zero();
    let magnitude = delta.abs();
    let total = magnitude.num_seconds();
    let nanos = magnitude.subsec_nanos();

    let days = total / SECONDS_PER_DAY;
    let hours = (total % SECONDS_PER_DAY) / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    if days > 0 {
        out.push_str(&format!("{}.", days));
    }
    out.push_str(&format!("{:02}:{:02}:{:02}", hours, minutes, seconds));
    if nanos > 0 {
        let fraction = format!("{:09}", nanos);
        out.push('.');
        out.push_str(fraction.trim_end_matches('0'));
    }
    out
}
