mod common;

use std::cmp::Ordering;

use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};
use toolchest::date::{self, DurationUnit, ENDFILE_DATE_FORMAT, FR_DATE_FORMAT, ISO_FORMAT_NO_TIMEZONE};

fn create_date(year: i32, month: u32, day: u32) -> NaiveDateTime {
    create_date_time(year, month, day, 0, 0, 0, 0)
}

fn create_date_time(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32, milli: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_milli_opt(hour, minute, second, milli))
        .expect("valid date")
}

#[test]
fn parses_iso_and_default_pattern() {
    common::init_tracing();
    assert_eq!(date::parse(None), None);
    assert_eq!(date::parse(Some("")), None);
    assert_eq!(date::parse(Some("   ")), None);
    assert_eq!(date::parse(Some("as4df5687")), None);
    assert_eq!(date::parse(Some("٢٠٠٠-١٢-٢٥")), None);

    assert_eq!(date::parse(Some("1974-12-12T00:00:00")), Some(create_date(1974, 12, 12)));
    assert_eq!(date::parse(Some("2000-12-25T23:59:15")), Some(create_date_time(2000, 12, 25, 23, 59, 15, 0)));
    assert_eq!(date::parse(Some("2000-12-25T23:59")), Some(create_date_time(2000, 12, 25, 23, 59, 0, 0)));
    assert_eq!(date::parse(Some("2000-12-25T23")), Some(create_date_time(2000, 12, 25, 23, 0, 0, 0)));
    assert_eq!(date::parse(Some("2000-12-25")), Some(create_date(2000, 12, 25)));
    assert_eq!(date::parse(Some("2000-12-25T23:59:15.250")), Some(create_date_time(2000, 12, 25, 23, 59, 15, 250)));
    assert_eq!(date::parse(Some("2000-12")), Some(create_date(2000, 12, 1)));
    assert_eq!(date::parse(Some("31.12.2015")), Some(create_date(2015, 12, 31)));
}

#[test]
fn parses_utc_into_local_time() {
    common::init_tracing();
    let parsed = date::parse(Some("2000-06-15T12:00:00Z")).expect("zoned date");
    let expected = create_date_time(2000, 6, 15, 12, 0, 0, 0).and_utc().with_timezone(&Local).naive_local();
    assert_eq!(parsed, expected);
}

#[test]
fn parses_with_pattern() {
    common::init_tracing();
    assert_eq!(date::parse_with(Some("2012-01-01"), None), None);
    assert_eq!(date::parse_with(Some("2012-01-01"), Some("")), None);
    assert_eq!(date::parse_with(None, Some(FR_DATE_FORMAT)), None);
    assert_eq!(
        date::parse_with(Some("20120225155619"), Some(ENDFILE_DATE_FORMAT)),
        Some(create_date_time(2012, 2, 25, 15, 56, 19, 0))
    );
    assert_eq!(
        date::parse_with(Some("25 December 2015 at 10h20"), Some("dd MMMM yyyy 'at' hh'h'mm")),
        Some(create_date_time(2015, 12, 25, 10, 20, 0, 0))
    );
    assert_eq!(
        date::parse_with(Some("2012-03-01T12:15:45"), Some(ISO_FORMAT_NO_TIMEZONE)),
        Some(create_date_time(2012, 3, 1, 12, 15, 45, 0))
    );
    assert_eq!(date::parse_with(Some("2015"), Some("yyyy")), Some(create_date(2015, 1, 1)));
    assert_eq!(date::parse_with(Some("31.12.2015 trailing"), Some(FR_DATE_FORMAT)), None);
    assert_eq!(date::parse_with(Some("32.12.2015"), Some(FR_DATE_FORMAT)), None);
    assert_eq!(date::parse_with(Some("31.12.2015"), Some("dd.qq.yyyy")), None);
}

#[test]
fn parses_date_time_in_local_zone() {
    common::init_tracing();
    assert!(date::parse_date_time(None).is_none());
    assert!(date::parse_date_time(Some("   ")).is_none());
    assert!(date::parse_date_time(Some("as4df5687")).is_none());
    let parsed = date::parse_date_time_with(Some("31.12.2015"), Some(FR_DATE_FORMAT)).expect("local date");
    assert_eq!(parsed.naive_local(), create_date(2015, 12, 31));
}

#[test]
fn validates_dates() {
    common::init_tracing();
    assert!(date::is_valid_date("31.12.2015"));
    assert!(!date::is_valid_date("2015-12-31"));
    assert!(date::is_valid_date_with("20120225155619", ENDFILE_DATE_FORMAT));
}

#[test]
fn formats_dates() {
    common::init_tracing();
    assert_eq!(date::format(None), "null");
    assert_eq!(date::format(Some(create_date_time(2012, 12, 31, 12, 15, 25, 150))), "31.12.2012");
    assert_eq!(
        date::format_with(Some(create_date_time(2015, 10, 12, 10, 20, 0, 0)), "dd MMMM yyyy 'at' hh'h'mm").unwrap(),
        "12 October 2015 at 10h20"
    );
    assert_eq!(
        date::format_with(Some(create_date_time(2012, 2, 25, 15, 56, 19, 0)), ENDFILE_DATE_FORMAT).unwrap(),
        "20120225155619"
    );
    assert_eq!(date::format_with(None, ENDFILE_DATE_FORMAT).unwrap(), "null");
    assert!(date::format_with(Some(create_date(2012, 1, 1)), "dd.qq").is_err());
}

#[test]
fn clears_time() {
    common::init_tracing();
    assert_eq!(date::clear_time(None), None);
    assert_eq!(
        date::clear_time(Some(create_date_time(2012, 3, 1, 12, 15, 45, 85))),
        Some(create_date(2012, 3, 1))
    );
}

#[test]
fn today_is_midnight() {
    common::init_tracing();
    let today = date::today();
    assert_eq!(today.date(), Local::now().date_naive());
    assert_eq!(today.hour(), 0);
    assert_eq!(date::now(), today);
}

#[test]
fn between_refuses_missing_endpoints() {
    common::init_tracing();
    let start = date::parse(Some("01.01.2000"));
    assert!(date::between(None, None, DurationUnit::Years).is_err());
    assert!(date::between(start, None, DurationUnit::Years).is_err());
    assert!(date::between(None, start, DurationUnit::Years).is_err());
}

#[test]
fn between_counts_whole_units() {
    common::init_tracing();
    let start = date::parse(Some("01.01.2000"));
    let end = date::parse(Some("31.12.2000"));
    assert_eq!(date::between(start, end, DurationUnit::Years).unwrap(), 0);
    assert_eq!(date::between(start, end, DurationUnit::Months).unwrap(), 11);
    assert_eq!(date::between(start, end, DurationUnit::Days).unwrap(), 365);
    assert_eq!(date::between(start, end, DurationUnit::Weeks).unwrap(), 52);
    assert_eq!(date::between(end, start, DurationUnit::Months).unwrap(), -11);
    assert_eq!(date::between(start, date::parse(Some("01.01.2003")), DurationUnit::Years).unwrap(), 3);
    // end of month clamping: 31 January plus one month is 29 February
    assert_eq!(
        date::between(date::parse(Some("31.01.2000")), date::parse(Some("29.02.2000")), DurationUnit::Months).unwrap(),
        1
    );
    assert_eq!(
        date::between(start, date::parse(Some("2000-01-01T01:30")), DurationUnit::Minutes).unwrap(),
        90
    );
}

#[test]
fn max_prefers_present_dates() {
    common::init_tracing();
    let parse = |text: &str| date::parse(Some(text));
    assert_eq!(date::max(None, None), None);
    assert_eq!(date::max(None, parse("01.01.2000")), parse("01.01.2000"));
    assert_eq!(date::max(parse("01.01.2000"), None), parse("01.01.2000"));
    assert_eq!(date::max(parse("01.01.2000"), parse("01.01.2012")), parse("01.01.2012"));
    assert_eq!(date::max(parse("01.01.2230"), parse("01.01.2012")), parse("01.01.2230"));
}

#[test]
fn parses_time_of_day() {
    common::init_tracing();
    assert_eq!(date::parse_time("00:00:00").unwrap(), 0);
    assert_eq!(date::parse_time("00:03:00").unwrap(), 180_000);
    assert_eq!(date::parse_time("00:03").unwrap(), 180_000);
    assert_eq!(date::parse_time("03:10").unwrap(), 11_400_000);
    assert_eq!(date::parse_time("00:00:10").unwrap(), 10_000);
    assert_eq!(date::parse_time("00:03:10").unwrap(), 190_000);
    assert_eq!(date::parse_time("01:00:00").unwrap(), 3_600_000);
    assert_eq!(date::parse_time("01").unwrap(), 3_600_000);
    assert_eq!(date::parse_time("01:00:10").unwrap(), 3_610_000);
    assert_eq!(date::parse_time("01:03:10").unwrap(), 3_790_000);
    assert!(date::parse_time("25:00").is_err());
    assert!(date::parse_time("noon").is_err());
    assert!(date::parse_time("٠١:٠٠").is_err());
}

#[test]
fn compares_calendar_days() {
    common::init_tracing();
    let parse = |text: &str| date::parse(Some(text));
    assert_eq!(date::compare_to(parse("01.01.2012"), parse("01.01.2012")), Ordering::Equal);
    assert_eq!(date::compare_to(parse("01.01.2010"), parse("01.01.2012")), Ordering::Less);
    assert_eq!(date::compare_to(parse("01.01.2012"), parse("01.01.2010")), Ordering::Greater);
    assert_eq!(date::compare_to(None, None), Ordering::Equal);
    assert_eq!(date::compare_to(parse("01.01.2010"), None), Ordering::Greater);
    assert_eq!(date::compare_to(None, parse("01.01.2010")), Ordering::Less);
    // time of day is ignored
    assert_eq!(
        date::compare_to(parse("2012-01-01T08:00"), parse("2012-01-01T20:00")),
        Ordering::Equal
    );

    assert!(date::is_equals(parse("01.01.2012"), parse("01.01.2012")));
    assert!(!date::is_equals(parse("01.01.2010"), parse("01.01.2012")));
    assert!(!date::is_before(parse("01.01.2012"), parse("01.01.2012")));
    assert!(date::is_before(parse("01.01.2010"), parse("01.01.2012")));
    assert!(!date::is_after(parse("01.01.2010"), parse("01.01.2012")));
    assert!(date::is_after(parse("01.01.2012"), parse("01.01.2010")));
    assert!(date::is_before_or_equals(parse("01.01.2012"), parse("01.01.2012")));
    assert!(!date::is_before_or_equals(parse("01.01.2012"), parse("01.01.2010")));
    assert!(date::is_after_or_equals(parse("01.01.2012"), parse("01.01.2012")));
    assert!(!date::is_after_or_equals(parse("01.01.2010"), parse("01.01.2012")));
}

#[test]
fn calendar_bounds() {
    common::init_tracing();
    assert_eq!(date::min_value(), create_date(1, 1, 1));
    assert_eq!(date::max_value(), create_date(9999, 12, 31));
    assert_eq!(date::parse(Some("01.01.0001")), Some(date::min_value()));
}
