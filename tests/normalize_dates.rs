// tests/normalize_dates.rs
//
// Every accepted input format must land on the canonical calendar date;
// partial inputs complete to the first day of their period.

use biosearch_aggregator::normalize::text::standardize_date;
use chrono::NaiveDate;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn representative_literal_per_format_round_trips() {
    let cases = [
        ("2020-01-15", date(2020, 1, 15)),
        ("2020-01", date(2020, 1, 1)),
        ("2020", date(2020, 1, 1)),
        ("January 2020", date(2020, 1, 1)),
        ("January 15, 2020", date(2020, 1, 15)),
        ("Jan 2020", date(2020, 1, 1)),
        ("15 Jan 2020", date(2020, 1, 15)),
        ("2020 Jan 15", date(2020, 1, 15)),
        ("2020 Jan", date(2020, 1, 1)),
        ("01/15/2020", date(2020, 1, 15)),
        ("15/01/2020", date(2020, 1, 15)),
    ];
    for (input, expected) in cases {
        assert_eq!(
            standardize_date(input),
            Some(expected),
            "input {input:?} should normalize to {expected}"
        );
    }
}

#[test]
fn ambiguous_slash_dates_prefer_us_order() {
    // Both readings are valid calendar dates; the US form is tried first.
    assert_eq!(standardize_date("03/04/2021"), Some(date(2021, 3, 4)));
}

#[test]
fn whitespace_is_tolerated_around_the_literal() {
    assert_eq!(standardize_date("  2020-06-30  "), Some(date(2020, 6, 30)));
}

#[test]
fn unparseable_input_is_absent_not_an_error() {
    for input in ["", "unknown", "mid 2020s", "13/13/2020", "Q1 2020"] {
        assert_eq!(standardize_date(input), None, "input {input:?}");
    }
}

#[test]
fn bare_year_requires_exactly_four_digits() {
    assert_eq!(standardize_date("202"), None);
    assert_eq!(standardize_date("20200"), None);
    assert_eq!(standardize_date("1999"), Some(date(1999, 1, 1)));
}
