mod common;

use bigdecimal::BigDecimal;
use toolchest::config::Settings;
use toolchest::number::{self, Complex, DOUBLE_MIN_VALUE, NumberFormat};

#[test]
fn formats_with_grouping_and_two_fraction_digits() {
    common::init_tracing();
    assert_eq!(number::format(1000015687_i64), "1,000,015,687");
    assert_eq!(number::format(148977687.1), "148,977,687.1");
    assert_eq!(number::format(0.110), "0.11");
    assert_eq!(number::format(1.111111_f64), "1.11");
    assert_eq!(number::format(1.151111_f64), "1.15");
    assert_eq!(number::format(1.156111_f64), "1.16");
    assert_eq!(number::format(-1234.5), "-1,234.5");
    assert_eq!(number::format(999), "999");
    assert_eq!(number::format(0), "0");
}

#[test]
fn rounds_half_even() {
    common::init_tracing();
    let format = NumberFormat::default();
    assert_eq!(format.format_decimal(&"0.125".parse::<BigDecimal>().unwrap()), "0.12");
    assert_eq!(format.format_decimal(&"0.135".parse::<BigDecimal>().unwrap()), "0.14");
    assert_eq!(format.format_decimal(&"2.999".parse::<BigDecimal>().unwrap()), "3");
}

#[test]
fn formats_with_custom_symbols() {
    common::init_tracing();
    let settings = Settings {
        grouping_separator: String::from("'"),
        decimal_separator: String::from(","),
        max_fraction_digits: 3,
        imaginary_symbol: String::from("j"),
    };
    let format = NumberFormat::from_settings(&settings);
    assert_eq!(format.format(1234567.12345), "1'234'567,123");
    assert_eq!(format.parse_decimal("1'234,5"), Some(1234.5));
    assert_eq!(format.parse_complex("1,5 + 2j"), Some(Complex::new(1.5, 2.0)));
    assert_eq!(format.format_complex(&Complex::new(1.5, -2.0)), "1,5 - 2j");
}

#[test]
fn leaves_non_finite_values_alone() {
    common::init_tracing();
    assert_eq!(number::format(f64::NAN), "NaN");
    assert_eq!(number::format(f64::INFINITY), "inf");
}

#[test]
fn converts_with_defaults() {
    common::init_tracing();
    assert_eq!(number::to_i32_or(None, Some(1)), Some(1));
    assert_eq!(number::to_i32_or(Some(""), Some(1)), Some(1));
    assert_eq!(number::to_i32_or(Some("1"), Some(0)), Some(1));
    assert_eq!(number::to_i32_opt(Some("x")), None);
    assert_eq!(number::to_i32_opt(Some("-42")), Some(-42));

    assert_eq!(number::to_i64_or(None, Some(1)), Some(1));
    assert_eq!(number::to_i64_or(Some("9000000000"), None), Some(9_000_000_000));
    assert_eq!(number::to_i64_opt(Some("1.5")), None);

    assert_eq!(number::to_f64_or(None, Some(1.0)), Some(1.0));
    assert_eq!(number::to_f64_or(Some(" 2.5 "), None), Some(2.5));
    assert_eq!(number::to_f64_opt(Some("3d")), Some(3.0));
    assert_eq!(number::to_f64_opt(Some("abc")), None);
}

#[test]
fn converts_with_minimum_sentinels() {
    common::init_tracing();
    assert_eq!(number::to_i32(None), i32::MIN);
    assert_eq!(number::to_i32(Some("")), i32::MIN);
    assert_eq!(number::to_i32(Some("1")), 1);
    assert_eq!(number::to_i32(Some("3000000000")), i32::MIN);
    assert_eq!(number::to_i64(None), i64::MIN);
    assert_eq!(number::to_i64(Some("1")), 1);
    assert_eq!(number::to_f64(None), DOUBLE_MIN_VALUE);
    assert_eq!(number::to_f64(Some("")), DOUBLE_MIN_VALUE);
    assert_eq!(number::to_f64(Some("1")), 1.0);
    assert_eq!(number::decimal_min_value(), "5e-324");
}

#[test]
fn recognises_numbers() {
    common::init_tracing();
    for text in ["1", "-1", "1.5", ".5", "1e10", "1.5E-3", "0x1F", "10L", "2.5f", "3d", "1,000", "1 + 2i", "3.5 - 1.25i", "2i"] {
        assert!(number::is_number(Some(text)), "{} should be a number", text);
    }
    for text in ["", "   ", "abc", "1..2", "0x", "1 + 2", "12abc", "--1"] {
        assert!(!number::is_number(Some(text)), "{:?} should not be a number", text);
    }
    assert!(!number::is_number(None));
    // only ASCII digits count
    for text in ["١٢٣", "١٢٣ + 2i", "１２", "1.٥"] {
        assert!(!number::is_number(Some(text)), "{:?} should not be a number", text);
    }
    assert_eq!(number::parse_complex(Some("٣ + 2i")), None);
}

#[test]
fn parses_complex_numbers() {
    common::init_tracing();
    assert_eq!(number::parse_complex(Some("1.5")), Some(Complex::new(1.5, 0.0)));
    assert_eq!(number::parse_complex(Some("1 + 2i")), Some(Complex::new(1.0, 2.0)));
    assert_eq!(number::parse_complex(Some("1 - 2i")), Some(Complex::new(1.0, -2.0)));
    assert_eq!(number::parse_complex(Some("-1e-3 + 4i")), Some(Complex::new(-0.001, 4.0)));
    assert_eq!(number::parse_complex(Some("-2i")), Some(Complex::new(0.0, -2.0)));
    assert_eq!(number::parse_complex(Some("1,000.5 + i")), Some(Complex::new(1000.5, 1.0)));
    assert_eq!(number::parse_complex(Some("one")), None);
    assert_eq!(number::parse_complex(None), None);
    assert_eq!(Complex::new(1234.5, -2.0).to_string(), "1,234.5 - 2i");
    assert_eq!(Complex::new(3.0, 0.0).to_string(), "3");
}

#[test]
fn doubles_follow_literal_spelling() {
    common::init_tracing();
    assert!(number::to_f64_opt(Some("NaN")).is_some_and(f64::is_nan));
    assert_eq!(number::to_f64_opt(Some("Infinity")), Some(f64::INFINITY));
    assert_eq!(number::to_f64_opt(Some("-Infinity")), Some(f64::NEG_INFINITY));
    assert_eq!(number::to_f64_opt(Some("+1.5e3")), Some(1500.0));
    assert_eq!(number::to_f64_opt(Some("2.5F")), Some(2.5));
    for text in ["nan", "inf", "infinity", "-inf", "1_000", "1e", "٣"] {
        assert_eq!(number::to_f64_opt(Some(text)), None, "{:?} should not parse", text);
    }
    assert_eq!(number::to_f64(Some("nan")), DOUBLE_MIN_VALUE);
}
