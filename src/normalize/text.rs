//! Field-level normalization helpers: text cleanup, date standardization,
//! trial status/phase tables, age and number extraction. All pure.

use chrono::NaiveDate;
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::record::{TrialPhase, TrialStatus};

/// Normalize free text: decode HTML entities, collapse whitespace (including
/// newlines/tabs) to single spaces, trim. `None`/empty stays empty.
pub fn clean_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    re_ws.replace_all(decoded.trim(), " ").into_owned()
}

/// List-valued raw fields become comma-joined text; empty entries dropped.
pub fn join_list<S: AsRef<str>>(items: &[S]) -> String {
    let parts: Vec<String> = items
        .iter()
        .map(|s| clean_text(s.as_ref()))
        .filter(|s| !s.is_empty())
        .collect();
    parts.join(", ")
}

/// Substring table for trial status, most specific entries first so e.g.
/// "ACTIVE, NOT RECRUITING" wins over the bare "RECRUITING".
const STATUS_TABLE: &[(&str, TrialStatus)] = &[
    ("ACTIVE, NOT RECRUITING", TrialStatus::Active),
    ("NOT YET RECRUITING", TrialStatus::NotRecruiting),
    ("ENROLLING BY INVITATION", TrialStatus::Enrolling),
    ("UNKNOWN STATUS", TrialStatus::Unknown),
    ("RECRUITING", TrialStatus::Recruiting),
    ("COMPLETED", TrialStatus::Completed),
    ("TERMINATED", TrialStatus::Terminated),
    ("WITHDRAWN", TrialStatus::Withdrawn),
    ("SUSPENDED", TrialStatus::Suspended),
];

/// Case-fold and match against the substring table; unmatched values pass
/// through upper-cased, empty input maps to UNKNOWN.
pub fn standardize_status(raw: &str) -> TrialStatus {
    let upper = raw.trim().to_uppercase();
    if upper.is_empty() {
        return TrialStatus::Unknown;
    }
    for (needle, status) in STATUS_TABLE {
        if upper.contains(needle) {
            return status.clone();
        }
    }
    TrialStatus::Other(upper)
}

/// Canonicalize phase spellings (PHASE1 / PHASE 1 / EARLY PHASE 1 ...) to
/// the underscored forms, then map exact hits to the closed variants.
/// Combined strings like "PHASE_1, PHASE_2" pass through as `Other`.
pub fn standardize_phase(raw: &str) -> TrialPhase {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("N/A") {
        return TrialPhase::Unknown;
    }

    let mut upper = trimmed.to_uppercase();
    // Longest spellings first so "EARLY PHASE 1" is not eaten by "PHASE 1".
    for (old, new) in [
        ("EARLY_PHASE1", "EARLY_PHASE_1"),
        ("EARLY PHASE 1", "EARLY_PHASE_1"),
        ("PHASE1", "PHASE_1"),
        ("PHASE 1", "PHASE_1"),
        ("PHASE2", "PHASE_2"),
        ("PHASE 2", "PHASE_2"),
        ("PHASE3", "PHASE_3"),
        ("PHASE 3", "PHASE_3"),
        ("PHASE4", "PHASE_4"),
        ("PHASE 4", "PHASE_4"),
    ] {
        upper = upper.replace(old, new);
    }

    match upper.as_str() {
        "EARLY_PHASE_1" => TrialPhase::EarlyPhase1,
        "PHASE_1" => TrialPhase::Phase1,
        "PHASE_2" => TrialPhase::Phase2,
        "PHASE_3" => TrialPhase::Phase3,
        "PHASE_4" => TrialPhase::Phase4,
        _ => TrialPhase::Other(upper),
    }
}

enum DateShape {
    Full(&'static str),
    YearMonth(&'static str),
    YearOnly,
}

/// Candidate input formats, tried in order; the first successful parse wins.
const DATE_FORMATS: &[DateShape] = &[
    DateShape::Full("%Y-%m-%d"),
    DateShape::YearMonth("%Y-%m"),
    DateShape::YearOnly,
    DateShape::YearMonth("%B %Y"),
    DateShape::Full("%B %d, %Y"),
    DateShape::YearMonth("%b %Y"),
    DateShape::Full("%d %b %Y"),
    DateShape::Full("%Y %b %d"),
    DateShape::YearMonth("%Y %b"),
    DateShape::Full("%m/%d/%Y"),
    DateShape::Full("%d/%m/%Y"),
];

/// Standardize an arbitrary date string to a calendar date. Partial inputs
/// (year, year-month) complete to the first day. Total failure yields
/// `None`, never an error.
pub fn standardize_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    static RE_YEAR: OnceCell<Regex> = OnceCell::new();
    let re_year = RE_YEAR.get_or_init(|| Regex::new(r"^\d{4}$").unwrap());

    for shape in DATE_FORMATS {
        let parsed = match shape {
            DateShape::Full(fmt) => NaiveDate::parse_from_str(s, fmt).ok(),
            // Append an explicit day so chrono has a complete date to parse.
            DateShape::YearMonth(fmt) => {
                NaiveDate::parse_from_str(&format!("{s} 1"), &format!("{fmt} %d")).ok()
            }
            DateShape::YearOnly => {
                if !re_year.is_match(s) {
                    continue;
                }
                s.parse::<i32>()
                    .ok()
                    .and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1))
            }
        };
        if parsed.is_some() {
            return parsed;
        }
    }
    None
}

/// Extract an age from free text ("6 Months", "18 Years") as fractional
/// years, rounded to two decimals. Unparseable input yields `None`, never
/// zero.
pub fn extract_age_years(raw: &str) -> Option<f64> {
    let lower = raw.trim().to_lowercase();
    if lower.is_empty() || lower == "n/a" {
        return None;
    }

    static RE_AGE: OnceCell<Regex> = OnceCell::new();
    let re = RE_AGE.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)").unwrap());
    let value: f64 = re
        .captures(&lower)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())?;

    let years = if lower.contains("month") {
        value / 12.0
    } else if lower.contains("week") {
        value / 52.0
    } else if lower.contains("day") {
        value / 365.0
    } else {
        value
    };

    Some((years * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_collapses_whitespace_and_entities() {
        assert_eq!(
            clean_text("  A &amp; B\n\tstudy\r\n of   X  "),
            "A & B study of X"
        );
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn join_list_drops_empty_entries() {
        assert_eq!(join_list(&["US", "", "  France "]), "US, France");
        let empty: &[&str] = &[];
        assert_eq!(join_list(empty), "");
    }

    #[test]
    fn status_specific_entries_win_over_generic() {
        assert_eq!(
            standardize_status("Active, not recruiting"),
            TrialStatus::Active
        );
        assert_eq!(
            standardize_status("NOT YET RECRUITING"),
            TrialStatus::NotRecruiting
        );
        assert_eq!(standardize_status("Recruiting"), TrialStatus::Recruiting);
        assert_eq!(standardize_status(""), TrialStatus::Unknown);
        assert_eq!(
            standardize_status("paused"),
            TrialStatus::Other("PAUSED".into())
        );
    }

    #[test]
    fn phase_spellings_canonicalize() {
        assert_eq!(standardize_phase("Phase 2"), TrialPhase::Phase2);
        assert_eq!(standardize_phase("PHASE3"), TrialPhase::Phase3);
        assert_eq!(standardize_phase("Early Phase 1"), TrialPhase::EarlyPhase1);
        assert_eq!(standardize_phase("N/A"), TrialPhase::Unknown);
        assert_eq!(
            standardize_phase("Phase1, Phase2"),
            TrialPhase::Other("PHASE_1, PHASE_2".into())
        );
    }

    #[test]
    fn dates_parse_in_candidate_order() {
        let d = |y, m, dd| NaiveDate::from_ymd_opt(y, m, dd).unwrap();
        assert_eq!(standardize_date("2020-01-15"), Some(d(2020, 1, 15)));
        assert_eq!(standardize_date("2020-01"), Some(d(2020, 1, 1)));
        assert_eq!(standardize_date("2020"), Some(d(2020, 1, 1)));
        assert_eq!(standardize_date("January 2020"), Some(d(2020, 1, 1)));
        assert_eq!(standardize_date("January 15, 2020"), Some(d(2020, 1, 15)));
        assert_eq!(standardize_date("Jan 2020"), Some(d(2020, 1, 1)));
        assert_eq!(standardize_date("15 Jan 2020"), Some(d(2020, 1, 15)));
        // PubMed's native pubdate forms
        assert_eq!(standardize_date("2020 Jan 15"), Some(d(2020, 1, 15)));
        assert_eq!(standardize_date("2020 Jan"), Some(d(2020, 1, 1)));
        // US slash form is preferred; day > 12 falls through to EU.
        assert_eq!(standardize_date("01/15/2020"), Some(d(2020, 1, 15)));
        assert_eq!(standardize_date("15/01/2020"), Some(d(2020, 1, 15)));
        assert_eq!(standardize_date("sometime soon"), None);
        assert_eq!(standardize_date(""), None);
    }

    #[test]
    fn ages_convert_units_to_years() {
        assert_eq!(extract_age_years("18 Years"), Some(18.0));
        assert_eq!(extract_age_years("6 Months"), Some(0.5));
        assert_eq!(extract_age_years("26 Weeks"), Some(0.5));
        assert_eq!(extract_age_years("73 Days"), Some(0.2));
        assert_eq!(extract_age_years("N/A"), None);
        assert_eq!(extract_age_years("adults"), None);
    }
}
