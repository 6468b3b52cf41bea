//! Currency, number and date formatting.
//!
//! Everything here is pure and allocation-light; the web templates and the
//! CLI both render through these functions so the two front ends agree.

use chrono::{DateTime, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};

/// Group an unsigned digit string the Indian way: the last three digits, then
/// pairs (`1234567` becomes `12,34,567`).
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut rest = head;
    while rest.len() > 2 {
        let (front, pair) = rest.split_at(rest.len() - 2);
        groups.push(pair);
        rest = front;
    }
    if !rest.is_empty() {
        groups.push(rest);
    }
    groups.reverse();

    format!("{},{tail}", groups.join(","))
}

/// Group an unsigned digit string in thousands (`1234567` becomes `1,234,567`).
fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Split a rounded amount into sign, integer digits and fraction digits.
fn split_parts(value: Decimal, dp: u32) -> (bool, String, String) {
    let rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = rounded.abs().to_string();
    match text.split_once('.') {
        Some((int, frac)) => (negative, int.to_string(), frac.to_string()),
        None => (negative, text, String::new()),
    }
}

/// Format an amount in rupees with no decimals, e.g. `₹12,34,567`.
#[must_use]
pub fn format_inr(amount: Decimal) -> String {
    let (negative, int, _) = split_parts(amount, 0);
    let sign = if negative { "-" } else { "" };
    format!("{sign}₹{}", group_indian(&int))
}

/// Format an amount in US dollars with two decimals, e.g. `$1,234.50`.
#[must_use]
pub fn format_usd(amount: Decimal) -> String {
    let (negative, int, frac) = split_parts(amount, 2);
    let sign = if negative { "-" } else { "" };
    format!("{sign}${}.{frac:0<2}", group_thousands(&int))
}

/// Format a plain number with Indian grouping and up to three decimals.
#[must_use]
pub fn format_indian_number(value: Decimal) -> String {
    let (negative, int, frac) = split_parts(value, 3);
    let sign = if negative { "-" } else { "" };
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        format!("{sign}{}", group_indian(&int))
    } else {
        format!("{sign}{}.{frac}", group_indian(&int))
    }
}

/// `value` as a percentage of `total`, rounded half-up to one decimal.
///
/// Returns zero when `total` is zero.
#[must_use]
pub fn calculate_percentage(value: Decimal, total: Decimal) -> Decimal {
    let Some(ratio) = value.checked_div(total) else {
        return Decimal::ZERO;
    };
    let Some(tenths) = ratio.checked_mul(Decimal::ONE_THOUSAND) else {
        return Decimal::ZERO;
    };
    (tenths + Decimal::new(5, 1)).floor() / Decimal::TEN
}

/// Format a percentage with one decimal, e.g. `33.3%`.
#[must_use]
pub fn format_percent(percent: Decimal) -> String {
    let (negative, int, frac) = split_parts(percent, 1);
    let sign = if negative { "-" } else { "" };
    format!("{sign}{int}.{frac:0<1}%")
}

/// Format a stored date as `02 Nov 2026`.
///
/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates. Anything else is
/// returned unchanged.
#[must_use]
pub fn format_date(raw: &str) -> String {
    let raw = raw.trim();
    let date = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"));

    match date {
        Ok(date) => date.format("%d %b %Y").to_string(),
        Err(_) => raw.to_string(),
    }
}
