//! Semantic equivalence of default values.
//!
//! A declared default and its live-database rendering rarely match byte for
//! byte: the server pads fixed-width strings, rescales decimals, rewrites
//! timestamp spellings and appends casts. This module decides, per type
//! family, whether two textual representations denote the same value, so the
//! planner never emits an alter for pure formatting drift. Everything here
//! is pure and deterministic; any family without a rule falls back to exact
//! text equality.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag_no_case},
    character::complete::{char, multispace0, none_of},
    combinator::{map, opt, value},
    multi::separated_list0,
    sequence::{delimited, preceded},
};
use rust_decimal::Decimal;

use crate::schema::{IdentitySpec, SequenceOptions};

/// Type family a default value is compared under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFamily {
    /// `char(n)` / `bpchar`: blank-padded to the declared length.
    FixedChar,
    /// `varchar` / `text`: compared after quote trimming.
    Char,
    /// `numeric` / `decimal`: compared at the declared scale.
    Numeric,
    /// `real` / `double precision`: integral literals gain a trailing `.0`.
    Float,
    Timestamp,
    Time,
    Date,
    /// No semantic rule; exact text equality.
    Other,
}

/// Declared type context for one comparison, extracted from the column's
/// type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnTypeInfo {
    pub family: TypeFamily,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub with_time_zone: bool,
    pub dimensions: u32,
}

impl ColumnTypeInfo {
    /// Parse a Postgres type string such as `character varying(255)`,
    /// `numeric(10,2)` or `timestamp(3) with time zone`. `dimensions` is the
    /// column's declared array depth; trailing `[]` pairs on the type string
    /// add to it.
    pub fn parse(type_name: &str, dimensions: u32) -> Self {
        let mut text = type_name.trim().to_ascii_lowercase();
        let mut dims = dimensions;
        while let Some(stripped) = text.strip_suffix("[]") {
            text = stripped.trim_end().to_string();
            dims += 1;
        }

        let mut args = Vec::new();
        if let (Some(open), Some(close)) = (text.find('('), text.rfind(')')) {
            if open < close {
                args = text[open + 1..close]
                    .split(',')
                    .filter_map(|arg| arg.trim().parse::<u32>().ok())
                    .collect();
                let tail = text[close + 1..].to_string();
                text.truncate(open);
                text.push_str(&tail);
            }
        }
        let base = text.split_whitespace().collect::<Vec<_>>().join(" ");

        let mut info = Self {
            family: TypeFamily::Other,
            length: None,
            precision: None,
            scale: None,
            with_time_zone: false,
            dimensions: dims,
        };
        match base.as_str() {
            "char" | "character" | "bpchar" => {
                info.family = TypeFamily::FixedChar;
                info.length = args.first().copied();
            }
            "varchar" | "character varying" | "text" => {
                info.family = TypeFamily::Char;
                info.length = args.first().copied();
            }
            "numeric" | "decimal" => {
                info.family = TypeFamily::Numeric;
                info.precision = args.first().copied();
                // numeric(p) means scale zero.
                info.scale = args.get(1).copied().or(if args.is_empty() {
                    None
                } else {
                    Some(0)
                });
            }
            "real" | "float4" | "double precision" | "float8" | "float" => {
                info.family = TypeFamily::Float;
            }
            "timestamp" | "timestamp without time zone" => {
                info.family = TypeFamily::Timestamp;
                info.precision = args.first().copied();
            }
            "timestamptz" | "timestamp with time zone" => {
                info.family = TypeFamily::Timestamp;
                info.with_time_zone = true;
                info.precision = args.first().copied();
            }
            "time" | "time without time zone" => {
                info.family = TypeFamily::Time;
                info.precision = args.first().copied();
            }
            "timetz" | "time with time zone" => {
                info.family = TypeFamily::Time;
                info.with_time_zone = true;
                info.precision = args.first().copied();
            }
            "date" => info.family = TypeFamily::Date,
            _ => {}
        }
        info
    }
}

/// Do two textual default representations denote the same value under the
/// declared type?
pub fn defaults_equivalent(info: &ColumnTypeInfo, left: &str, right: &str) -> bool {
    if left == right {
        return true;
    }
    let left = strip_cast(left.trim());
    let right = strip_cast(right.trim());
    if left == right {
        return true;
    }
    if info.dimensions > 0 {
        return match (parse_array(left), parse_array(right)) {
            (Some(a), Some(b)) => arrays_equivalent(info, &a, &b),
            _ => false,
        };
    }
    scalar_equivalent(info, left, right)
}

fn scalar_equivalent(info: &ColumnTypeInfo, left: &str, right: &str) -> bool {
    if left == right {
        return true;
    }
    let l = unquote(left);
    let r = unquote(right);
    match info.family {
        TypeFamily::FixedChar => match info.length {
            Some(length) => fit_width(&l, length as usize) == fit_width(&r, length as usize),
            None => l == r,
        },
        TypeFamily::Char => l == r,
        TypeFamily::Numeric => match (Decimal::from_str(&l), Decimal::from_str(&r)) {
            (Ok(a), Ok(b)) => match info.scale {
                Some(scale) => {
                    let mut a = a;
                    let mut b = b;
                    a.rescale(scale);
                    b.rescale(scale);
                    a == b
                }
                None => a.normalize() == b.normalize(),
            },
            _ => l == r,
        },
        TypeFamily::Float => strip_dot_zero(&l) == strip_dot_zero(&r),
        TypeFamily::Timestamp | TypeFamily::Time | TypeFamily::Date => {
            temporal_equivalent(info, &l, &r)
        }
        TypeFamily::Other => false,
    }
}

/// Pad with blanks or truncate to the declared width, the way the server
/// stores `char(n)` values.
fn fit_width(value: &str, width: usize) -> String {
    let mut out: String = value.chars().take(width).collect();
    while out.chars().count() < width {
        out.push(' ');
    }
    out
}

/// Remove one trailing `.0`, the suffix integral literals gain under float
/// types.
fn strip_dot_zero(value: &str) -> &str {
    value.strip_suffix(".0").unwrap_or(value)
}

/// Strip a trailing `::type` cast that sits outside quotes.
fn strip_cast(value: &str) -> &str {
    let bytes = value.as_bytes();
    let mut in_quotes = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' => in_quotes = !in_quotes,
            b':' if !in_quotes && i + 1 < bytes.len() && bytes[i + 1] == b':' => {
                return value[..i].trim_end();
            }
            _ => {}
        }
        i += 1;
    }
    value
}

/// Trim surrounding single quotes and collapse doubled quotes.
fn unquote(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('\'') && trimmed.ends_with('\'') {
        trimmed[1..trimmed.len() - 1].replace("''", "'")
    } else {
        trimmed.to_string()
    }
}

/// Interchangeable spellings of "the current moment", by family.
fn current_literal_class(family: TypeFamily, value: &str) -> Option<&'static str> {
    let spelling = value.trim().to_ascii_lowercase();
    match family {
        TypeFamily::Timestamp => match spelling.as_str() {
            "now()" | "current_timestamp" | "current_timestamp()" => Some("current_timestamp"),
            "localtimestamp" => Some("localtimestamp"),
            _ => None,
        },
        TypeFamily::Time => match spelling.as_str() {
            "current_time" | "localtime" => Some("current_time"),
            _ => None,
        },
        TypeFamily::Date => match spelling.as_str() {
            "current_date" | "now()" => Some("current_date"),
            _ => None,
        },
        _ => None,
    }
}

fn temporal_equivalent(info: &ColumnTypeInfo, left: &str, right: &str) -> bool {
    if let (Some(a), Some(b)) = (
        current_literal_class(info.family, left),
        current_literal_class(info.family, right),
    ) {
        return a == b;
    }

    let precision = info.precision.unwrap_or(6);
    match info.family {
        TypeFamily::Date => matches!(
            (parse_date(left), parse_date(right)),
            (Some(a), Some(b)) if a == b
        ),
        TypeFamily::Time => match (parse_time(left), parse_time(right)) {
            (Some((a, oa)), Some((b, ob))) => {
                let a = truncate_time(shift_time(a, oa, info.with_time_zone), precision);
                let b = truncate_time(shift_time(b, ob, info.with_time_zone), precision);
                a == b
            }
            _ => left == right,
        },
        TypeFamily::Timestamp => match (parse_timestamp(left), parse_timestamp(right)) {
            (Some((a, oa)), Some((b, ob))) => {
                let a = truncate_datetime(shift_datetime(a, oa, info.with_time_zone), precision);
                let b = truncate_datetime(shift_datetime(b, ob, info.with_time_zone), precision);
                a == b
            }
            _ => left == right,
        },
        _ => left == right,
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Split a trailing UTC-offset suffix (`Z`, `+05`, `-08:30`, `+0130`) off a
/// time string. Returns the remaining text and the offset in minutes.
fn split_offset(value: &str, search_from: usize) -> (&str, Option<i32>) {
    let tail = &value[search_from..];
    if let Some(stripped) = tail.strip_suffix(['Z', 'z']) {
        return (&value[..search_from + stripped.len()], Some(0));
    }
    if let Some(pos) = tail.rfind(['+', '-']) {
        let (head, suffix) = tail.split_at(pos);
        let sign = if suffix.starts_with('-') { -1 } else { 1 };
        let digits: String = suffix[1..].chars().filter(|c| *c != ':').collect();
        let minutes = match digits.len() {
            2 => digits.parse::<i32>().ok().map(|h| h * 60),
            4 => {
                let hours = digits[..2].parse::<i32>().ok();
                let mins = digits[2..].parse::<i32>().ok();
                match (hours, mins) {
                    (Some(h), Some(m)) => Some(h * 60 + m),
                    _ => None,
                }
            }
            _ => None,
        };
        if let Some(minutes) = minutes {
            return (&value[..search_from + head.len()], Some(sign * minutes));
        }
    }
    (value, None)
}

fn parse_time(value: &str) -> Option<(NaiveTime, Option<i32>)> {
    let (text, offset) = split_offset(value.trim(), 0);
    let text = text.trim();
    let time = NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .ok()?;
    Some((time, offset))
}

fn parse_timestamp(value: &str) -> Option<(NaiveDateTime, Option<i32>)> {
    let text = value.trim().replacen('T', " ", 1);
    let search_from = text.find(' ').map_or(text.len(), |pos| pos + 1);
    let (head, offset) = split_offset(&text, search_from);
    let head = head.trim();
    let stamp = NaiveDateTime::parse_from_str(head, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(head, "%Y-%m-%d %H:%M"))
        .ok()?;
    Some((stamp, offset))
}

/// For zone-carrying types, normalize to UTC; for zone-less types the
/// suffix is dropped entirely.
fn shift_datetime(stamp: NaiveDateTime, offset: Option<i32>, with_time_zone: bool) -> NaiveDateTime {
    if with_time_zone {
        stamp - chrono::Duration::minutes(i64::from(offset.unwrap_or(0)))
    } else {
        stamp
    }
}

fn shift_time(time: NaiveTime, offset: Option<i32>, with_time_zone: bool) -> NaiveTime {
    if with_time_zone {
        time - chrono::Duration::minutes(i64::from(offset.unwrap_or(0)))
    } else {
        time
    }
}

fn truncate_nanos(nanos: u32, precision: u32) -> u32 {
    let precision = precision.min(9);
    let factor = 10u32.pow(9 - precision);
    nanos / factor * factor
}

fn truncate_datetime(stamp: NaiveDateTime, precision: u32) -> NaiveDateTime {
    let nanos = stamp.nanosecond() % 1_000_000_000;
    stamp
        .with_nanosecond(truncate_nanos(nanos, precision))
        .unwrap_or(stamp)
}

fn truncate_time(time: NaiveTime, precision: u32) -> NaiveTime {
    let nanos = time.nanosecond() % 1_000_000_000;
    time.with_nanosecond(truncate_nanos(nanos, precision))
        .unwrap_or(time)
}

/// A parsed array default: nested lists of optional (nullable) elements.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayValue {
    List(Vec<ArrayValue>),
    Item(Option<String>),
}

/// Parse either array spelling: the literal form `'{a,"b c",NULL}'` or the
/// constructor form `ARRAY['a','b']`.
fn parse_array(value: &str) -> Option<ArrayValue> {
    let text = unquote(value);
    let text = text.trim();
    let result = if text.starts_with('{') {
        brace_array(text)
    } else {
        constructor_array(text)
    };
    match result {
        Ok((rest, parsed)) if rest.trim().is_empty() => Some(parsed),
        _ => None,
    }
}

fn brace_array(input: &str) -> IResult<&str, ArrayValue> {
    map(
        delimited(
            preceded(multispace0, char('{')),
            separated_list0(preceded(multispace0, char(',')), brace_element),
            preceded(multispace0, char('}')),
        ),
        ArrayValue::List,
    )(input)
}

fn brace_element(input: &str) -> IResult<&str, ArrayValue> {
    preceded(
        multispace0,
        alt((brace_array, quoted_item, bare_item)),
    )(input)
}

fn quoted_item(input: &str) -> IResult<&str, ArrayValue> {
    map(
        delimited(
            char('"'),
            opt(escaped_transform(
                none_of("\\\""),
                '\\',
                alt((value('"', char('"')), value('\\', char('\\')))),
            )),
            char('"'),
        ),
        |text: Option<String>| ArrayValue::Item(Some(text.unwrap_or_default())),
    )(input)
}

fn bare_item(input: &str) -> IResult<&str, ArrayValue> {
    map(is_not(",}{"), |text: &str| {
        let text = text.trim();
        if text.eq_ignore_ascii_case("null") {
            ArrayValue::Item(None)
        } else {
            ArrayValue::Item(Some(text.to_string()))
        }
    })(input)
}

fn constructor_array(input: &str) -> IResult<&str, ArrayValue> {
    map(
        delimited(
            preceded(multispace0, preceded(tag_no_case("array"), preceded(multispace0, char('[')))),
            separated_list0(preceded(multispace0, char(',')), constructor_element),
            preceded(multispace0, char(']')),
        ),
        ArrayValue::List,
    )(input)
}

fn constructor_element(input: &str) -> IResult<&str, ArrayValue> {
    preceded(
        multispace0,
        alt((constructor_array, sql_quoted_item, constructor_bare_item)),
    )(input)
}

// `escaped_transform` cannot express SQL's doubled-quote escaping (the
// escape character is the delimiter), so this one is scanned by hand.
fn sql_quoted_item(input: &str) -> IResult<&str, ArrayValue> {
    let (mut rest, _) = char('\'')(input)?;
    let mut out = String::new();
    loop {
        if let Some(stripped) = rest.strip_prefix("''") {
            out.push('\'');
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix('\'') {
            return Ok((stripped, ArrayValue::Item(Some(out))));
        } else if let Some(ch) = rest.chars().next() {
            out.push(ch);
            rest = &rest[ch.len_utf8()..];
        } else {
            return Err(nom::Err::Error(nom::error::Error::new(
                rest,
                nom::error::ErrorKind::Char,
            )));
        }
    }
}

fn constructor_bare_item(input: &str) -> IResult<&str, ArrayValue> {
    map(is_not(",][ \t"), |text: &str| {
        let text = text.trim();
        if text.eq_ignore_ascii_case("null") {
            ArrayValue::Item(None)
        } else {
            ArrayValue::Item(Some(text.to_string()))
        }
    })(input)
}

/// Element-wise comparison under the scalar rule for the base type.
fn arrays_equivalent(info: &ColumnTypeInfo, left: &ArrayValue, right: &ArrayValue) -> bool {
    let scalar_info = ColumnTypeInfo {
        dimensions: 0,
        ..info.clone()
    };
    fn walk(info: &ColumnTypeInfo, left: &ArrayValue, right: &ArrayValue) -> bool {
        match (left, right) {
            (ArrayValue::List(a), ArrayValue::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| walk(info, x, y))
            }
            (ArrayValue::Item(None), ArrayValue::Item(None)) => true,
            (ArrayValue::Item(Some(a)), ArrayValue::Item(Some(b))) => {
                scalar_equivalent(info, a, b)
            }
            _ => false,
        }
    }
    walk(&scalar_info, left, right)
}

/// Resolve omitted sequence parameters against the server defaults (which
/// depend on the increment's sign) and compare the results. Keeps a
/// declared bare sequence from differing against its fully rendered
/// introspection.
pub fn sequence_options_equivalent(left: &SequenceOptions, right: &SequenceOptions) -> bool {
    resolve_sequence(left) == resolve_sequence(right)
}

fn resolve_sequence(options: &SequenceOptions) -> (i64, i64, i64, i64, i64) {
    let increment = options.increment.unwrap_or(1);
    let (min, max) = if increment >= 0 {
        (options.min.unwrap_or(1), options.max.unwrap_or(i64::MAX))
    } else {
        (options.min.unwrap_or(i64::MIN), options.max.unwrap_or(-1))
    };
    let start = options
        .start
        .unwrap_or(if increment >= 0 { min } else { max });
    let cache = options.cache.unwrap_or(1);
    (increment, min, max, start, cache)
}

/// Identity specs match when the kind agrees and the resolved sequence
/// parameters agree.
pub fn identity_equivalent(left: &IdentitySpec, right: &IdentitySpec) -> bool {
    left.kind == right.kind && sequence_options_equivalent(&left.options, &right.options)
}

/// Order-insensitive list comparison, for policy role and command lists.
pub fn unordered_eq<T: Ord + Clone>(left: &[T], right: &[T]) -> bool {
    let mut a = left.to_vec();
    let mut b = right.to_vec();
    a.sort();
    b.sort();
    a == b
}
