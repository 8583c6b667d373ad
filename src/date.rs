//! Date parsing, formatting and comparison.
//!
//! Dates are local wall-clock `NaiveDateTime`s and an absent date is `None`.
//! Patterns are written in the familiar letter syntax (`dd.MM.yyyy`,
//! `yyyyMMddHHmmss`, `'T'` for a quoted literal) and translated to chrono
//! format strings; translations are cached per thread.
//!
//! | letter | meaning               | letter | meaning            |
//! |--------|-----------------------|--------|--------------------|
//! | `y`    | year                  | `h`    | hour 1-12          |
//! | `M`    | month (`MMM` names)   | `m`    | minute             |
//! | `d`    | day of month          | `s`    | second             |
//! | `D`    | day of year           | `S`    | millisecond        |
//! | `E`    | day name              | `a`    | am/pm marker       |
//! | `H`    | hour 0-23             | `Z`    | zone offset        |
//!
//! Month and day names are English only.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::Write;

use chrono::format::{Parsed, StrftimeItems, parse as parse_items};
use chrono::{DateTime, Datelike, FixedOffset, Local, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, trace};

use crate::error::{Result, ToolchestError};

pub const FR_DATE_FORMAT: &str = "dd.MM.yyyy";
pub const ENDFILE_DATE_FORMAT: &str = "yyyyMMddHHmmss";
pub const ISO_FORMAT: &str = "yyyy-MM-dd'T'HH:mm:ss.SSSZZ";
pub const ISO_FORMAT_NO_TIMEZONE: &str = "yyyy-MM-dd'T'HH:mm:ss";

// translated patterns kept per thread before the cache is reset
const PATTERN_CACHE_LIMIT: usize = 64;

lazy_static! {
    static ref ISO_DATE: Regex = Regex::new(
        r"^([0-9]{4})(?:-([0-9]{2})(?:-([0-9]{2})(?:T([0-9]{2})(?::([0-9]{2})(?::([0-9]{2})(?:[.,]([0-9]{1,9}))?)?)?)?)?)?(Z|[+-][0-9]{2}(?::?[0-9]{2})?)?$"
    )
    .unwrap();
    static ref TIME_OF_DAY: Regex = Regex::new(r"^([0-9]{2})(?::([0-9]{2})(?::([0-9]{2})(?:\.([0-9]{1,3}))?)?)?$").unwrap();
}

thread_local! {
    static PATTERNS: RefCell<HashMap<String, String>> = RefCell::new(HashMap::new());
}

// ------------- Patterns -------------

/// Translates a letter pattern into a chrono format string.
pub fn translate(pattern: &str) -> Result<String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\'' {
            // '' is an escaped quote, otherwise a literal runs up to the next quote
            if chars.get(i + 1) == Some(&'\'') {
                out.push('\'');
                i += 2;
                continue;
            }
            i += 1;
            while i < chars.len() {
                if chars[i] == '\'' {
                    if chars.get(i + 1) == Some(&'\'') {
                        out.push('\'');
                        i += 2;
                        continue;
                    }
                    break;
                }
                push_literal(&mut out, chars[i]);
                i += 1;
            }
            if i >= chars.len() {
                return Err(ToolchestError::InvalidArgument(format!("Unterminated quote in pattern {}", pattern)));
            }
            i += 1;
            continue;
        }
        if !c.is_ascii_alphabetic() {
            push_literal(&mut out, c);
            i += 1;
            continue;
        }
        let mut run = 1;
        while chars.get(i + run) == Some(&c) {
            run += 1;
        }
        let spec = match (c, run) {
            ('y', 2) => "%y",
            ('y', _) => "%Y",
            ('M', 1) => "%-m",
            ('M', 2) => "%m",
            ('M', 3) => "%b",
            ('M', _) => "%B",
            ('d', 1) => "%-d",
            ('d', _) => "%d",
            ('D', _) => "%j",
            ('E', 1..=3) => "%a",
            ('E', _) => "%A",
            ('H', 1) => "%-H",
            ('H', _) => "%H",
            ('h', 1) => "%-I",
            ('h', _) => "%I",
            ('m', 1) => "%-M",
            ('m', _) => "%M",
            ('s', 1) => "%-S",
            ('s', _) => "%S",
            ('S', _) => "%3f",
            ('a', _) => "%p",
            ('Z', 1) => "%z",
            ('Z', _) => "%:z",
            _ => {
                return Err(ToolchestError::InvalidArgument(format!("Illegal pattern character '{}'", c)));
            }
        };
        out.push_str(spec);
        i += run;
    }
    Ok(out)
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

fn with_pattern<T>(pattern: &str, f: impl FnOnce(&str) -> T) -> Result<T> {
    PATTERNS.with(|cache| {
        if let Some(spec) = cache.borrow().get(pattern) {
            return Ok(f(spec));
        }
        let spec = translate(pattern)?;
        debug!(pattern, %spec, "date pattern translated");
        let result = f(&spec);
        let mut cache = cache.borrow_mut();
        if cache.len() >= PATTERN_CACHE_LIMIT {
            cache.clear();
        }
        cache.insert(pattern.to_owned(), spec);
        Ok(result)
    })
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.trim().is_empty())
}

// ------------- Parsing -------------

/// Parses an ISO-8601 date or, failing that, a `dd.MM.yyyy` date.
pub fn parse(text: Option<&str>) -> Option<NaiveDateTime> {
    let text = non_blank(text)?;
    parse_iso(text).or_else(|| parse_with(Some(text), Some(FR_DATE_FORMAT)))
}

/// Parses `text` against `pattern`. Missing fields default to the start of
/// the year or day, any failure gives `None`.
pub fn parse_with(text: Option<&str>, pattern: Option<&str>) -> Option<NaiveDateTime> {
    let text = non_blank(text)?;
    let pattern = non_blank(pattern)?;
    match with_pattern(pattern, |spec| parse_spec(text, spec)) {
        Ok(parsed) => parsed,
        Err(e) => {
            trace!(pattern, error = %e, "unusable date pattern");
            None
        }
    }
}

fn parse_spec(text: &str, spec: &str) -> Option<NaiveDateTime> {
    let mut parsed = Parsed::default();
    parse_items(&mut parsed, text, StrftimeItems::new(spec)).ok()?;
    let date = parsed.to_naive_date().or_else(|_| {
        let _ = parsed.set_month(1);
        let _ = parsed.set_day(1);
        parsed.to_naive_date()
    });
    let time = parsed.to_naive_time().or_else(|_| {
        let _ = parsed.set_hour(0);
        let _ = parsed.set_minute(0);
        parsed.to_naive_time()
    });
    let datetime = date.ok()?.and_time(time.ok()?);
    // an explicit offset is honoured by moving into local time
    match parsed.to_fixed_offset() {
        Ok(offset) => to_local(offset, datetime),
        Err(_) => Some(datetime),
    }
}

fn parse_iso(text: &str) -> Option<NaiveDateTime> {
    let caps = ISO_DATE.captures(text)?;
    let number = |i: usize, default: u32| -> Option<u32> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(default),
        }
    };
    let year: i32 = caps.get(1)?.as_str().parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, number(2, 1)?, number(3, 1)?)?;
    let nanos = match caps.get(7) {
        Some(m) => format!("{:0<9}", m.as_str()).parse().ok()?,
        None => 0,
    };
    let time = NaiveTime::from_hms_nano_opt(number(4, 0)?, number(5, 0)?, number(6, 0)?, nanos)?;
    let datetime = date.and_time(time);
    match caps.get(8).map(|m| m.as_str()) {
        None => Some(datetime),
        Some("Z") => to_local(FixedOffset::east_opt(0)?, datetime),
        Some(zone) => to_local(parse_offset(zone)?, datetime),
    }
}

fn parse_offset(zone: &str) -> Option<FixedOffset> {
    let sign = if zone.starts_with('-') { -1 } else { 1 };
    let digits: String = zone[1..].chars().filter(char::is_ascii_digit).collect();
    let hours: i32 = digits.get(0..2)?.parse().ok()?;
    let minutes: i32 = match digits.get(2..4) {
        Some(m) => m.parse().ok()?,
        None => 0,
    };
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn to_local(offset: FixedOffset, datetime: NaiveDateTime) -> Option<NaiveDateTime> {
    let instant = offset.from_local_datetime(&datetime).single()?;
    Some(instant.with_timezone(&Local).naive_local())
}

fn localize(datetime: NaiveDateTime) -> Option<DateTime<Local>> {
    Local.from_local_datetime(&datetime).earliest()
}

pub fn parse_date_time(text: Option<&str>) -> Option<DateTime<Local>> {
    parse_date_time_with(text, Some(FR_DATE_FORMAT))
}

pub fn parse_date_time_with(text: Option<&str>, pattern: Option<&str>) -> Option<DateTime<Local>> {
    localize(parse_with(text, pattern)?)
}

pub fn is_valid_date(text: &str) -> bool {
    is_valid_date_with(text, FR_DATE_FORMAT)
}

pub fn is_valid_date_with(text: &str, pattern: &str) -> bool {
    parse_with(Some(text), Some(pattern)).is_some()
}

/// Milliseconds since midnight of `HH[:mm[:ss[.SSS]]]`, sub-second part
/// ignored.
pub fn parse_time(text: &str) -> Result<i64> {
    let invalid = || ToolchestError::InvalidArgument(format!("Invalid format: \"{}\"", text));
    let caps = TIME_OF_DAY.captures(text.trim()).ok_or_else(invalid)?;
    let field = |i: usize| -> Result<u32> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().map_err(|_| invalid()),
            None => Ok(0),
        }
    };
    let time = NaiveTime::from_hms_opt(field(1)?, field(2)?, field(3)?).ok_or_else(invalid)?;
    Ok(i64::from(time.num_seconds_from_midnight()) * 1000)
}

// ------------- Formatting -------------

/// Formats with `dd.MM.yyyy`; an absent date is the text `null`.
pub fn format(date: Option<NaiveDateTime>) -> String {
    match format_with(date, FR_DATE_FORMAT) {
        Ok(text) => text,
        Err(e) => {
            trace!(error = %e, "default date pattern failed to format");
            String::from("null")
        }
    }
}

pub fn format_with(date: Option<NaiveDateTime>, pattern: &str) -> Result<String> {
    let Some(date) = date else {
        return Ok(String::from("null"));
    };
    with_pattern(pattern, |spec| {
        let items = StrftimeItems::new(spec);
        let mut out = String::new();
        // offsets only exist once the date is placed in the local zone
        let written = match localize(date) {
            Some(local) => write!(out, "{}", local.format_with_items(items)),
            None => write!(out, "{}", date.format_with_items(items)),
        };
        written
            .map(|_| out)
            .map_err(|_| ToolchestError::InvalidArgument(format!("cannot format {} with {}", date, pattern)))
    })?
}

// ------------- Calendar -------------

pub fn clear_time(date: Option<NaiveDateTime>) -> Option<NaiveDateTime> {
    date.map(|d| d.date().and_time(NaiveTime::MIN))
}

/// Today at midnight.
pub fn today() -> NaiveDateTime {
    Local::now().date_naive().and_time(NaiveTime::MIN)
}

pub fn now() -> NaiveDateTime {
    today()
}

pub fn min_value() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .unwrap_or(NaiveDate::MIN)
        .and_time(NaiveTime::MIN)
}

pub fn max_value() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(9999, 12, 31)
        .unwrap_or(NaiveDate::MAX)
        .and_time(NaiveTime::MIN)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DurationUnit {
    Years,
    Months,
    Weeks,
    Days,
    Hours,
    Minutes,
    Seconds,
    Millis,
}

/// Number of whole `unit`s from `start` to `end`, negative when `end` comes
/// first.
pub fn between(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>, unit: DurationUnit) -> Result<i64> {
    let (Some(start), Some(end)) = (start, end) else {
        return Err(ToolchestError::InvalidArgument(String::from("Date endpoints must not be null")));
    };
    let elapsed = end - start;
    let count = match unit {
        DurationUnit::Years => whole_months(start, end)? / 12,
        DurationUnit::Months => whole_months(start, end)?,
        DurationUnit::Weeks => elapsed.num_weeks(),
        DurationUnit::Days => elapsed.num_days(),
        DurationUnit::Hours => elapsed.num_hours(),
        DurationUnit::Minutes => elapsed.num_minutes(),
        DurationUnit::Seconds => elapsed.num_seconds(),
        DurationUnit::Millis => elapsed.num_milliseconds(),
    };
    Ok(count)
}

fn add_months(date: NaiveDateTime, months: i64) -> Option<NaiveDateTime> {
    let magnitude = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months < 0 {
        date.checked_sub_months(magnitude)
    } else {
        date.checked_add_months(magnitude)
    }
}

// calendar months, with day-of-month clamping done by chrono
fn whole_months(start: NaiveDateTime, end: NaiveDateTime) -> Result<i64> {
    let overflow = || ToolchestError::InvalidArgument(format!("month difference out of range: {} to {}", start, end));
    let mut months = (i64::from(end.year()) - i64::from(start.year())) * 12 + i64::from(end.month())
        - i64::from(start.month());
    if months > 0 && add_months(start, months).ok_or_else(overflow)? > end {
        months -= 1;
    } else if months < 0 && add_months(start, months).ok_or_else(overflow)? < end {
        months += 1;
    }
    Ok(months)
}

/// Later of two dates, an absent date loses.
pub fn max(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>) -> Option<NaiveDateTime> {
    a.max(b)
}

// ------------- Comparison -------------

/// Compares calendar days only. An absent date sorts first.
pub fn compare_to(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>) -> Ordering {
    a.map(|d| d.date()).cmp(&b.map(|d| d.date()))
}

pub fn is_equals(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>) -> bool {
    compare_to(a, b) == Ordering::Equal
}

pub fn is_before(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>) -> bool {
    compare_to(a, b) == Ordering::Less
}

pub fn is_after(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>) -> bool {
    compare_to(a, b) == Ordering::Greater
}

pub fn is_before_or_equals(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>) -> bool {
    compare_to(a, b) != Ordering::Greater
}

pub fn is_after_or_equals(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>) -> bool {
    compare_to(a, b) != Ordering::Less
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_letter_patterns() {
        assert_eq!(translate(FR_DATE_FORMAT).unwrap(), "%d.%m.%Y");
        assert_eq!(translate(ENDFILE_DATE_FORMAT).unwrap(), "%Y%m%d%H%M%S");
        assert_eq!(translate(ISO_FORMAT).unwrap(), "%Y-%m-%dT%H:%M:%S.%3f%:z");
        assert_eq!(translate("hh'h'mm '100%'").unwrap(), "%Ih%M 100%%");
        assert_eq!(translate("'o''clock' H").unwrap(), "o'clock %-H");
    }

    #[test]
    fn rejects_unknown_letters() {
        assert!(translate("dd.MM.yyyy q").is_err());
        assert!(translate("'open").is_err());
    }

    #[test]
    fn reads_offsets() {
        assert_eq!(parse_offset("+02:00"), FixedOffset::east_opt(7200));
        assert_eq!(parse_offset("-0130"), FixedOffset::east_opt(-5400));
        assert_eq!(parse_offset("+05"), FixedOffset::east_opt(18000));
    }
}
