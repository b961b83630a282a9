//! Best-effort extraction of structured fields from search-provider strings.

use chrono::{Duration, NaiveDate};

/// Parses an annual salary range like "$180K - $220K", "150,000-190,000 a year"
/// or "$200k". Hourly rates return `None`.
pub fn parse_salary_range(raw: &str) -> (Option<i64>, Option<i64>) {
    let lower = raw.to_lowercase();
    if lower.contains("hour") || lower.contains("/hr") || lower.contains(" hr") {
        return (None, None);
    }

    let amounts: Vec<i64> = lower
        .split(|c: char| c == '-' || c == '–' || c == ' ' || c == '/')
        .filter_map(parse_amount)
        .collect();

    match amounts.as_slice() {
        [] => (None, None),
        [only] => (Some(*only), Some(*only)),
        [first, .., last] => {
            let (lo, hi) = if first <= last {
                (*first, *last)
            } else {
                (*last, *first)
            };
            (Some(lo), Some(hi))
        }
    }
}

fn parse_amount(token: &str) -> Option<i64> {
    let token = token.trim().trim_start_matches('$').replace(',', "");
    let (digits, multiplier) = match token.strip_suffix('k') {
        Some(d) => (d, 1_000.0),
        None => (token.as_str(), 1.0),
    };
    if digits.is_empty() || !digits.chars().next()?.is_ascii_digit() {
        return None;
    }
    let value: f64 = digits.parse().ok()?;
    let amount = (value * multiplier).round() as i64;
    // Anything under a thousand is not an annual figure.
    (amount >= 1_000).then_some(amount)
}

/// Parses ISO dates and relative phrases like "3 days ago" against `today`.
pub fn parse_posted_date(raw: &str, today: NaiveDate) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }

    let lower = raw.to_lowercase();
    if lower == "today" || lower == "just posted" || lower.contains("hour") || lower.contains("minute")
    {
        return Some(today);
    }
    if lower == "yesterday" {
        return today.checked_sub_signed(Duration::days(1));
    }

    let mut parts = lower.split_whitespace();
    let count: i64 = parts.next()?.trim_end_matches('+').parse().ok()?;
    let unit = parts.next()?;
    let days = if unit.starts_with("day") {
        count
    } else if unit.starts_with("week") {
        count.checked_mul(7)?
    } else if unit.starts_with("month") {
        count.checked_mul(30)?
    } else {
        return None;
    };
    today.checked_sub_signed(Duration::try_days(days)?)
}
