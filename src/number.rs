//! Number formatting and lenient parsing.
//!
//! Formatting follows the `#,###.##` shape: grouped integer digits, at most
//! two fraction digits rounded half-even, no trailing zeros. The separators
//! and digit count come from [`Settings`].

use std::cell::RefCell;
use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, RoundingMode};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, trace};

use crate::config::Settings;

/// Smallest positive double, returned by [`to_f64`] on failure.
pub const DOUBLE_MIN_VALUE: f64 = 5e-324;

lazy_static! {
    // plain numbers: decimal, exponent, hexadecimal and type suffixes
    static ref PLAIN_NUMBER: Regex =
        Regex::new(r"^-?(?:0[xX][0-9a-fA-F]+|(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?[fFdD]?|[0-9]+[lL])$").unwrap();
    static ref DECIMAL: Regex = Regex::new(r"^[+-]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?$").unwrap();
    // double literals: NaN and Infinity spelled out, an optional type suffix
    static ref DOUBLE: Regex =
        Regex::new(r"^[+-]?(?:NaN|Infinity|(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?[fFdD]?)$").unwrap();
}

thread_local! {
    static DEFAULT_FORMAT: RefCell<Option<NumberFormat>> = const { RefCell::new(None) };
}

// ------------- NumberFormat -------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberFormat {
    grouping_separator: String,
    decimal_separator: String,
    max_fraction_digits: u32,
    imaginary_symbol: String,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl NumberFormat {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            grouping_separator: settings.grouping_separator.clone(),
            decimal_separator: settings.decimal_separator.clone(),
            max_fraction_digits: settings.max_fraction_digits,
            imaginary_symbol: settings.imaginary_symbol.clone(),
        }
    }
    pub fn imaginary_symbol(&self) -> &str {
        &self.imaginary_symbol
    }

    /// Formats anything whose `Display` form is a decimal number. Other
    /// values (NaN, infinities) are printed as they are.
    pub fn format<N: fmt::Display>(&self, number: N) -> String {
        let text = number.to_string();
        match BigDecimal::from_str(&text) {
            Ok(decimal) => self.format_decimal(&decimal),
            Err(_) => text,
        }
    }

    pub fn format_decimal(&self, number: &BigDecimal) -> String {
        let rounded = number.with_scale_round(i64::from(self.max_fraction_digits), RoundingMode::HalfEven);
        let plain = rounded.to_string();
        let (negative, digits) = match plain.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, plain.as_str()),
        };
        let (integer, fraction) = digits.split_once('.').unwrap_or((digits, ""));
        let fraction = fraction.trim_end_matches('0');

        let mut out = String::with_capacity(plain.len() + integer.len() / 3);
        // rounding may leave a negative zero behind
        if negative && (integer.bytes().any(|b| b != b'0') || !fraction.is_empty()) {
            out.push('-');
        }
        for (i, digit) in integer.chars().enumerate() {
            if i > 0 && (integer.len() - i) % 3 == 0 {
                out.push_str(&self.grouping_separator);
            }
            out.push(digit);
        }
        if !fraction.is_empty() {
            out.push_str(&self.decimal_separator);
            out.push_str(fraction);
        }
        out
    }

    pub fn format_complex(&self, complex: &Complex) -> String {
        let real = self.format(complex.re);
        if complex.im == 0.0 {
            return real;
        }
        let sign = if complex.im < 0.0 { '-' } else { '+' };
        format!("{} {} {}{}", real, sign, self.format(complex.im.abs()), self.imaginary_symbol)
    }

    /// Reads a decimal written with this format's separators.
    pub fn parse_decimal(&self, text: &str) -> Option<f64> {
        let mut plain = text.trim().to_owned();
        if !self.grouping_separator.is_empty() {
            plain = plain.replace(&self.grouping_separator, "");
        }
        if self.decimal_separator != "." {
            plain = plain.replace(&self.decimal_separator, ".");
        }
        if !DECIMAL.is_match(&plain) {
            return None;
        }
        plain.parse().ok()
    }

    /// Reads `re`, `re + im<symbol>`, `re - im<symbol>` or `im<symbol>`.
    pub fn parse_complex(&self, text: &str) -> Option<Complex> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let Some(body) = text.strip_suffix(self.imaginary_symbol.as_str()).filter(|_| !self.imaginary_symbol.is_empty()) else {
            return Some(Complex::new(self.parse_decimal(text)?, 0.0));
        };
        let body = body.trim_end();
        match split_imaginary(body) {
            Some((re, sign, im)) => {
                let re = self.parse_decimal(re)?;
                let im = self.imaginary_part(im)?;
                Some(Complex::new(re, if sign == '-' { -im } else { im }))
            }
            None => {
                let (negative, im) = match body.strip_prefix('-') {
                    Some(rest) => (true, rest),
                    None => (false, body.strip_prefix('+').unwrap_or(body)),
                };
                let im = self.imaginary_part(im)?;
                Some(Complex::new(0.0, if negative { -im } else { im }))
            }
        }
    }

    // a bare symbol means a coefficient of one
    fn imaginary_part(&self, text: &str) -> Option<f64> {
        let text = text.trim();
        if text.is_empty() { Some(1.0) } else { self.parse_decimal(text) }
    }
}

// Splits at the sign joining the real and imaginary parts, skipping a
// leading sign and exponent signs.
fn split_imaginary(body: &str) -> Option<(&str, char, &str)> {
    let bytes = body.as_bytes();
    (1..bytes.len()).rev().find_map(|i| {
        let c = bytes[i];
        let after_exponent = matches!(bytes[i - 1], b'e' | b'E');
        if (c == b'+' || c == b'-') && !after_exponent && !body[..i].trim().is_empty() {
            Some((&body[..i], c as char, &body[i + 1..]))
        } else {
            None
        }
    })
}

fn with_default_format<T>(f: impl FnOnce(&NumberFormat) -> T) -> T {
    DEFAULT_FORMAT.with(|cell| {
        let mut slot = cell.borrow_mut();
        let format = slot.get_or_insert_with(|| {
            debug!("number formatter initialised for this thread");
            NumberFormat::default()
        });
        f(format)
    })
}

/// Formats with the default per-thread formatter.
pub fn format<N: fmt::Display>(number: N) -> String {
    with_default_format(|f| f.format(number))
}

// ------------- Complex -------------
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }
}
impl fmt::Display for Complex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", with_default_format(|format| format.format_complex(self)))
    }
}

pub fn parse_complex(text: Option<&str>) -> Option<Complex> {
    let text = text?;
    with_default_format(|f| f.parse_complex(text))
}

// ------------- Parsing -------------

pub fn to_i32_or(text: Option<&str>, default: Option<i32>) -> Option<i32> {
    text.and_then(|t| t.parse().ok()).or(default)
}

pub fn to_i32_opt(text: Option<&str>) -> Option<i32> {
    to_i32_or(text, None)
}

/// `i32::MIN` when `text` is not an integer.
pub fn to_i32(text: Option<&str>) -> i32 {
    to_i32_or(text, None).unwrap_or(i32::MIN)
}

pub fn to_i64_or(text: Option<&str>, default: Option<i64>) -> Option<i64> {
    text.and_then(|t| t.parse().ok()).or(default)
}

pub fn to_i64_opt(text: Option<&str>) -> Option<i64> {
    to_i64_or(text, None)
}

/// `i64::MIN` when `text` is not an integer.
pub fn to_i64(text: Option<&str>) -> i64 {
    to_i64_or(text, None).unwrap_or(i64::MIN)
}

/// Surrounding whitespace and a trailing `d`/`f` suffix are accepted, as are
/// `NaN` and `Infinity` in exactly that spelling.
pub fn to_f64_or(text: Option<&str>, default: Option<f64>) -> Option<f64> {
    text.and_then(parse_f64).or(default)
}

fn parse_f64(text: &str) -> Option<f64> {
    let text = text.trim();
    if !DOUBLE.is_match(text) {
        trace!(text, "not a double");
        return None;
    }
    let text = text.strip_suffix(['d', 'D', 'f', 'F']).unwrap_or(text);
    text.parse().ok()
}

pub fn to_f64_opt(text: Option<&str>) -> Option<f64> {
    to_f64_or(text, None)
}

/// [`DOUBLE_MIN_VALUE`] when `text` is not a number.
pub fn to_f64(text: Option<&str>) -> f64 {
    to_f64_or(text, None).unwrap_or(DOUBLE_MIN_VALUE)
}

/// A plain number literal or a complex number.
pub fn is_number(text: Option<&str>) -> bool {
    match text {
        Some(t) if !t.trim().is_empty() => PLAIN_NUMBER.is_match(t) || parse_complex(Some(t)).is_some(),
        _ => false,
    }
}

/// [`DOUBLE_MIN_VALUE`] in its shortest exact form, `5e-324`. JVM
/// formatting prints the same double as `4.9E-324`.
pub fn decimal_min_value() -> String {
    format!("{:e}", DOUBLE_MIN_VALUE)
}
