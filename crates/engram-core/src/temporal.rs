//! Temporal Facts and Extraction
//!
//! Scans free text for date expressions - absolute ("2025-03-14",
//! "March 15, 2024"), relative ("yesterday", "last Saturday", "three weeks
//! ago") and vague ("last month", "March") - and resolves each against a
//! reference wall clock into a [`TemporalFact`].
//!
//! The same extractor parses query-side `after`/`before` bounds, which accept
//! either ISO dates or natural language.

use chrono::{Datelike, Duration, Months, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

// ============================================================================
// PRECISION
// ============================================================================

/// How much of the calendar a resolved date expression pins down.
///
/// Precision governs the span a fact covers when matched against a range:
/// a `Month` fact for 2024-03-01 covers all of March 2024.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatePrecision {
    /// A specific day
    #[default]
    Day,
    /// A calendar week (Monday-based)
    Week,
    /// A calendar month
    Month,
    /// A calendar year
    Year,
}

impl DatePrecision {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            DatePrecision::Day => "day",
            DatePrecision::Week => "week",
            DatePrecision::Month => "month",
            DatePrecision::Year => "year",
        }
    }

    /// Parse from string name; unknown values fall back to day precision
    pub fn parse_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "week" => DatePrecision::Week,
            "month" => DatePrecision::Month,
            "year" => DatePrecision::Year,
            _ => DatePrecision::Day,
        }
    }
}

impl std::fmt::Display for DatePrecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// TEMPORAL FACT
// ============================================================================

/// A resolved date expression attached to a memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalFact {
    /// Resolved calendar date (start of the covered span)
    pub date: NaiveDate,
    /// Coarsest unit the original expression determined
    pub precision: DatePrecision,
    /// Explicit end of a spanning expression, overriding the precision span
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_end: Option<NaiveDate>,
}

impl TemporalFact {
    /// Create a fact covering a single point at the given precision
    pub fn new(date: NaiveDate, precision: DatePrecision) -> Self {
        Self {
            date,
            precision,
            span_end: None,
        }
    }

    /// The inclusive `[start, end]` span of calendar days this fact covers
    pub fn span(&self) -> (NaiveDate, NaiveDate) {
        if let Some(end) = self.span_end {
            return (self.date, end.max(self.date));
        }
        match self.precision {
            DatePrecision::Day => (self.date, self.date),
            DatePrecision::Week => {
                let start = week_start(self.date);
                (start, start + Duration::days(6))
            }
            DatePrecision::Month => {
                let start = month_start(self.date);
                (start, month_end(self.date))
            }
            DatePrecision::Year => {
                let start = year_start(self.date);
                (start, year_end(self.date))
            }
        }
    }

    /// Whether this fact's span intersects the inclusive `[after, before]`
    /// range. An unset bound is open on that side.
    pub fn intersects(&self, after: Option<NaiveDate>, before: Option<NaiveDate>) -> bool {
        let (start, end) = self.span();
        let after_ok = after.is_none_or(|a| end >= a);
        let before_ok = before.is_none_or(|b| start <= b);
        after_ok && before_ok
    }
}

/// Apply the range-match rule to a memory's facts.
///
/// A memory matches iff at least one fact intersects the range; a memory with
/// no facts passes through unfiltered (it cannot contradict the range).
pub fn facts_match_range(
    facts: &[TemporalFact],
    after: Option<NaiveDate>,
    before: Option<NaiveDate>,
) -> bool {
    if after.is_none() && before.is_none() {
        return true;
    }
    if facts.is_empty() {
        return true;
    }
    facts.iter().any(|f| f.intersects(after, before))
}

// ============================================================================
// CALENDAR HELPERS
// ============================================================================

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn month_end(date: NaiveDate) -> NaiveDate {
    month_start(date)
        .checked_add_months(Months::new(1))
        .map(|d| d - Duration::days(1))
        .unwrap_or(date)
}

fn year_start(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date)
}

fn year_end(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), 12, 31).unwrap_or(date)
}

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.to_lowercase().chars().take(3).collect();
    let n = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(n)
}

fn weekday_number(name: &str) -> Option<u32> {
    let n = match name.to_lowercase().as_str() {
        "monday" => 0,
        "tuesday" => 1,
        "wednesday" => 2,
        "thursday" => 3,
        "friday" => 4,
        "saturday" => 5,
        "sunday" => 6,
        _ => return None,
    };
    Some(n)
}

fn small_number(word: &str) -> Option<i64> {
    if let Ok(n) = word.parse::<i64>() {
        return (n >= 0).then_some(n);
    }
    let n = match word.to_lowercase().as_str() {
        "a" | "an" | "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        _ => return None,
    };
    Some(n)
}

// ============================================================================
// REGEX TABLE
// ============================================================================

const MONTH: &str = "(?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|jun(?:e)?|jul(?:y)?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)";
const WEEKDAY: &str =
    "(?:monday|tuesday|wednesday|thursday|friday|saturday|sunday)";

struct Patterns {
    iso_date: Regex,
    written_date: Regex,
    month_year: Regex,
    units_ago: Regex,
    relative_day: Regex,
    relative_weekday: Regex,
    relative_period: Regex,
    bare_month: Regex,
    bare_year: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        iso_date: Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").expect("valid regex"),
        written_date: Regex::new(&format!(
            r"(?i)\b({MONTH})\s+(\d{{1,2}})(?:st|nd|rd|th)?(?:,?\s+(\d{{4}}))?\b"
        ))
        .expect("valid regex"),
        month_year: Regex::new(&format!(r"(?i)\b({MONTH})\s+(\d{{4}})\b")).expect("valid regex"),
        units_ago: Regex::new(
            r"(?i)\b(a|an|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve|\d{1,3})\s+(day|week|month|year)s?\s+ago\b",
        )
        .expect("valid regex"),
        relative_day: Regex::new(r"(?i)\b(yesterday|today|tomorrow)\b").expect("valid regex"),
        relative_weekday: Regex::new(&format!(r"(?i)\b(last|this|next)\s+({WEEKDAY})\b"))
            .expect("valid regex"),
        relative_period: Regex::new(r"(?i)\b(last|this|next)\s+(week|month|year)\b")
            .expect("valid regex"),
        bare_month: Regex::new(&format!(r"(?i)\b({MONTH})\b")).expect("valid regex"),
        bare_year: Regex::new(r"\b((?:19|20)\d{2})\b").expect("valid regex"),
    })
}

// ============================================================================
// EXTRACTOR
// ============================================================================

/// Resolves date expressions in text against a reference wall clock.
#[derive(Debug, Clone)]
pub struct TemporalExtractor {
    reference: NaiveDate,
}

impl Default for TemporalExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TemporalExtractor {
    /// Extractor resolving relative expressions against today's date (UTC)
    pub fn new() -> Self {
        Self {
            reference: Utc::now().date_naive(),
        }
    }

    /// Extractor with an explicit reference date
    pub fn with_reference(reference: NaiveDate) -> Self {
        Self { reference }
    }

    /// Extract all temporal facts from the text, most specific pattern first.
    ///
    /// Each character of the input contributes to at most one fact, so the
    /// year inside "March 15, 2024" does not also surface as a bare-year fact.
    pub fn extract(&self, text: &str) -> Vec<TemporalFact> {
        let mut facts: Vec<(usize, TemporalFact)> = Vec::new();
        let mut consumed: Vec<(usize, usize)> = Vec::new();
        let p = patterns();

        let claim = |consumed: &mut Vec<(usize, usize)>, start: usize, end: usize| -> bool {
            if consumed.iter().any(|&(s, e)| start < e && end > s) {
                return false;
            }
            consumed.push((start, end));
            true
        };

        for m in p.iso_date.captures_iter(text) {
            let whole = m.get(0).expect("capture 0");
            let (y, mo, d) = (&m[1], &m[2], &m[3]);
            let date = y
                .parse()
                .ok()
                .zip(mo.parse().ok())
                .zip(d.parse().ok())
                .and_then(|((y, mo), d)| NaiveDate::from_ymd_opt(y, mo, d));
            if let Some(date) = date {
                if claim(&mut consumed, whole.start(), whole.end()) {
                    facts.push((whole.start(), TemporalFact::new(date, DatePrecision::Day)));
                }
            }
        }

        for m in p.written_date.captures_iter(text) {
            let whole = m.get(0).expect("capture 0");
            let month = match month_number(&m[1]) {
                Some(n) => n,
                None => continue,
            };
            let day: u32 = match m[2].parse() {
                Ok(d) => d,
                Err(_) => continue,
            };
            let year: i32 = m
                .get(3)
                .and_then(|y| y.as_str().parse().ok())
                .unwrap_or_else(|| self.reference.year());
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                if claim(&mut consumed, whole.start(), whole.end()) {
                    facts.push((whole.start(), TemporalFact::new(date, DatePrecision::Day)));
                }
            }
        }

        for m in p.month_year.captures_iter(text) {
            let whole = m.get(0).expect("capture 0");
            let month = match month_number(&m[1]) {
                Some(n) => n,
                None => continue,
            };
            let year: i32 = match m[2].parse() {
                Ok(y) => y,
                Err(_) => continue,
            };
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, 1) {
                if claim(&mut consumed, whole.start(), whole.end()) {
                    facts.push((whole.start(), TemporalFact::new(date, DatePrecision::Month)));
                }
            }
        }

        for m in p.units_ago.captures_iter(text) {
            let whole = m.get(0).expect("capture 0");
            let count = match small_number(&m[1]) {
                Some(n) => n,
                None => continue,
            };
            let (date, precision) = match m[2].to_lowercase().as_str() {
                "day" => (self.reference - Duration::days(count), DatePrecision::Day),
                "week" => (self.reference - Duration::weeks(count), DatePrecision::Week),
                "month" => (
                    self.reference
                        .checked_sub_months(Months::new(count.min(1200) as u32))
                        .unwrap_or(self.reference),
                    DatePrecision::Month,
                ),
                _ => (
                    NaiveDate::from_ymd_opt(self.reference.year() - count as i32, 1, 1)
                        .unwrap_or(self.reference),
                    DatePrecision::Year,
                ),
            };
            if claim(&mut consumed, whole.start(), whole.end()) {
                facts.push((whole.start(), TemporalFact::new(date, precision)));
            }
        }

        for m in p.relative_day.captures_iter(text) {
            let whole = m.get(0).expect("capture 0");
            let date = match m[1].to_lowercase().as_str() {
                "yesterday" => self.reference - Duration::days(1),
                "tomorrow" => self.reference + Duration::days(1),
                _ => self.reference,
            };
            if claim(&mut consumed, whole.start(), whole.end()) {
                facts.push((whole.start(), TemporalFact::new(date, DatePrecision::Day)));
            }
        }

        for m in p.relative_weekday.captures_iter(text) {
            let whole = m.get(0).expect("capture 0");
            let target = match weekday_number(&m[2]) {
                Some(n) => n,
                None => continue,
            };
            let today = self.reference.weekday().num_days_from_monday();
            let date = match m[1].to_lowercase().as_str() {
                "last" => {
                    let back = (today as i64 - target as i64).rem_euclid(7);
                    self.reference - Duration::days(if back == 0 { 7 } else { back })
                }
                "next" => {
                    let fwd = (target as i64 - today as i64).rem_euclid(7);
                    self.reference + Duration::days(if fwd == 0 { 7 } else { fwd })
                }
                _ => week_start(self.reference) + Duration::days(i64::from(target)),
            };
            if claim(&mut consumed, whole.start(), whole.end()) {
                facts.push((whole.start(), TemporalFact::new(date, DatePrecision::Day)));
            }
        }

        for m in p.relative_period.captures_iter(text) {
            let whole = m.get(0).expect("capture 0");
            let offset: i64 = match m[1].to_lowercase().as_str() {
                "last" => -1,
                "next" => 1,
                _ => 0,
            };
            let fact = match m[2].to_lowercase().as_str() {
                "week" => TemporalFact::new(
                    week_start(self.reference) + Duration::weeks(offset),
                    DatePrecision::Week,
                ),
                "month" => {
                    let base = month_start(self.reference);
                    let date = if offset < 0 {
                        base.checked_sub_months(Months::new(1))
                    } else if offset > 0 {
                        base.checked_add_months(Months::new(1))
                    } else {
                        Some(base)
                    };
                    TemporalFact::new(date.unwrap_or(base), DatePrecision::Month)
                }
                _ => TemporalFact::new(
                    NaiveDate::from_ymd_opt(self.reference.year() + offset as i32, 1, 1)
                        .unwrap_or(self.reference),
                    DatePrecision::Year,
                ),
            };
            if claim(&mut consumed, whole.start(), whole.end()) {
                facts.push((whole.start(), fact));
            }
        }

        // Vague expressions last: a bare month resolves to the reference year
        for m in p.bare_month.captures_iter(text) {
            let whole = m.get(0).expect("capture 0");
            let month = match month_number(&m[1]) {
                Some(n) => n,
                None => continue,
            };
            if let Some(date) = NaiveDate::from_ymd_opt(self.reference.year(), month, 1) {
                if claim(&mut consumed, whole.start(), whole.end()) {
                    facts.push((whole.start(), TemporalFact::new(date, DatePrecision::Month)));
                }
            }
        }

        for m in p.bare_year.captures_iter(text) {
            let whole = m.get(0).expect("capture 0");
            let year: i32 = match m[1].parse() {
                Ok(y) => y,
                Err(_) => continue,
            };
            if let Some(date) = NaiveDate::from_ymd_opt(year, 1, 1) {
                if claim(&mut consumed, whole.start(), whole.end()) {
                    facts.push((whole.start(), TemporalFact::new(date, DatePrecision::Year)));
                }
            }
        }

        facts.sort_by_key(|(pos, _)| *pos);
        facts.into_iter().map(|(_, f)| f).collect()
    }

    /// Parse a query-side bound: ISO date, or any expression the extractor
    /// recognizes. `start_of_span` selects which edge of the resolved span to
    /// use ("after last month" wants the start, "before last month" the end).
    pub fn parse_point(&self, input: &str, start_of_span: bool) -> Option<NaiveDate> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Ok(date) = trimmed.parse::<NaiveDate>() {
            return Some(date);
        }
        // Datetime inputs keep their date component
        if let Some((date_part, _)) = trimmed.split_once('T') {
            if let Ok(date) = date_part.parse::<NaiveDate>() {
                return Some(date);
            }
        }
        let facts = self.extract(trimmed);
        facts.first().map(|f| {
            let (start, end) = f.span();
            if start_of_span { start } else { end }
        })
    }

    /// Pull a single `[after, before]` range out of a recall query's text.
    /// The first temporal expression wins; queries with none return `None`.
    pub fn extract_query_range(&self, query: &str) -> Option<(NaiveDate, NaiveDate)> {
        self.extract(query).first().map(|f| f.span())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 18).unwrap() // a Wednesday
    }

    fn extractor() -> TemporalExtractor {
        TemporalExtractor::with_reference(reference())
    }

    #[test]
    fn test_iso_date() {
        let facts = extractor().extract("Shipped on 2025-03-14, finally");
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].date, NaiveDate::from_ymd_opt(2025, 3, 14).unwrap());
        assert_eq!(facts[0].precision, DatePrecision::Day);
    }

    #[test]
    fn test_written_date_consumes_year() {
        let facts = extractor().extract("Event on March 15, 2024");
        // The year must not also appear as a bare-year fact
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert_eq!(facts[0].precision, DatePrecision::Day);
    }

    #[test]
    fn test_written_date_ordinal() {
        let facts = extractor().extract("appointment on March 15th");
        assert_eq!(facts[0].date, NaiveDate::from_ymd_opt(2026, 3, 15).unwrap());
    }

    #[test]
    fn test_month_year() {
        let facts = extractor().extract("Started the job in January 2024");
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].precision, DatePrecision::Month);
        assert_eq!(
            facts[0].span(),
            (
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()
            )
        );
    }

    #[test]
    fn test_yesterday() {
        let facts = extractor().extract("What did I do yesterday?");
        assert_eq!(facts[0].date, NaiveDate::from_ymd_opt(2026, 3, 17).unwrap());
        assert_eq!(facts[0].precision, DatePrecision::Day);
    }

    #[test]
    fn test_last_saturday() {
        let facts = extractor().extract("Who did I meet last Saturday?");
        // Reference is Wednesday 2026-03-18; last Saturday is 2026-03-14
        assert_eq!(facts[0].date, NaiveDate::from_ymd_opt(2026, 3, 14).unwrap());
    }

    #[test]
    fn test_last_week_span_is_seven_days() {
        let facts = extractor().extract("meetings last week");
        assert_eq!(facts[0].precision, DatePrecision::Week);
        let (start, end) = facts[0].span();
        assert_eq!((end - start).num_days(), 6);
        assert!(start < reference());
    }

    #[test]
    fn test_three_weeks_ago() {
        let facts = extractor().extract("that bug from three weeks ago");
        assert_eq!(facts[0].precision, DatePrecision::Week);
        assert_eq!(facts[0].date, reference() - Duration::weeks(3));
    }

    #[test]
    fn test_last_month() {
        let facts = extractor().extract("What did I accomplish last month?");
        assert_eq!(facts[0].precision, DatePrecision::Month);
        assert_eq!(facts[0].date, NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());
    }

    #[test]
    fn test_bare_month_resolves_to_reference_year() {
        let facts = extractor().extract("deadline is in May");
        assert_eq!(facts[0].precision, DatePrecision::Month);
        assert_eq!(facts[0].date, NaiveDate::from_ymd_opt(2026, 5, 1).unwrap());
    }

    #[test]
    fn test_bare_year() {
        let facts = extractor().extract("back in 2019 we rewrote it");
        assert_eq!(facts[0].precision, DatePrecision::Year);
        let (start, end) = facts[0].span();
        assert_eq!(start, NaiveDate::from_ymd_opt(2019, 1, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2019, 12, 31).unwrap());
    }

    #[test]
    fn test_no_temporal_signal() {
        assert!(extractor().extract("What is my favorite color?").is_empty());
    }

    #[test]
    fn test_multiple_expressions_ordered_by_position() {
        let facts = extractor().extract("Compare meetings last Monday and next Friday");
        assert_eq!(facts.len(), 2);
        assert!(facts[0].date < facts[1].date);
    }

    #[test]
    fn test_parse_point_iso() {
        let e = extractor();
        assert_eq!(
            e.parse_point("2025-01-01", true),
            NaiveDate::from_ymd_opt(2025, 1, 1)
        );
    }

    #[test]
    fn test_parse_point_natural_language_span_edges() {
        let e = extractor();
        let start = e.parse_point("last month", true).unwrap();
        let end = e.parse_point("last month", false).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());
    }

    #[test]
    fn test_parse_point_garbage() {
        assert_eq!(extractor().parse_point("not-a-date", true), None);
        assert_eq!(extractor().parse_point("", true), None);
    }

    #[test]
    fn test_query_range_first_expression_wins() {
        let range = extractor()
            .extract_query_range("meetings last week or maybe last month")
            .unwrap();
        let week_start = week_start(reference()) - Duration::weeks(1);
        assert_eq!(range.0, week_start);
    }

    #[test]
    fn test_facts_match_range_rules() {
        let march = TemporalFact::new(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(), DatePrecision::Day);
        let after = NaiveDate::from_ymd_opt(2025, 1, 1);
        let before = NaiveDate::from_ymd_opt(2025, 12, 31);

        // Fact outside the range excludes the memory
        assert!(!facts_match_range(&[march.clone()], after, before));
        // No facts always passes
        assert!(facts_match_range(&[], after, before));
        // No bounds always passes
        assert!(facts_match_range(&[march], None, None));
    }

    #[test]
    fn test_month_precision_intersection() {
        // A January 2024 month fact must not match [2024-06-01, ..]
        let jan = TemporalFact::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), DatePrecision::Month);
        assert!(!jan.intersects(NaiveDate::from_ymd_opt(2024, 6, 1), None));
        let aug = TemporalFact::new(NaiveDate::from_ymd_opt(2024, 8, 1).unwrap(), DatePrecision::Month);
        assert!(aug.intersects(NaiveDate::from_ymd_opt(2024, 6, 1), None));
    }

    #[test]
    fn test_span_end_overrides_precision() {
        let fact = TemporalFact {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            precision: DatePrecision::Day,
            span_end: Some(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()),
        };
        assert!(fact.intersects(NaiveDate::from_ymd_opt(2024, 3, 5), None));
    }

    #[test]
    fn test_serde_roundtrip() {
        let fact = TemporalFact::new(
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            DatePrecision::Week,
        );
        let json = serde_json::to_string(&fact).unwrap();
        assert!(json.contains("2024-03-15"));
        assert!(json.contains("week"));
        let back: TemporalFact = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fact);
    }
}
