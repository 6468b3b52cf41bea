//! Custom Askama template filters.
//!
//! Amounts reach templates as `Decimal`s; these filters render them through
//! the shared formatting functions.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

use ops_cost_core::format;
use ops_cost_core::parse_amount;

/// Rupees, no decimals: `{{ row.po_value|inr }}` renders `₹12,34,567`.
#[askama::filter_fn]
pub fn inr(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(format::format_inr(parse_amount(&value.to_string())))
}

/// Plain number with Indian grouping: `{{ order.total_sqm|indian_number }}`.
#[askama::filter_fn]
pub fn indian_number(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(format::format_indian_number(parse_amount(&value.to_string())))
}

/// One-decimal percentage: `{{ totals.margin_percent|percent }}` renders `33.3%`.
#[askama::filter_fn]
pub fn percent(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(format::format_percent(parse_amount(&value.to_string())))
}

/// Stored date as `02 Nov 2026`.
#[askama::filter_fn]
pub fn date(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(format::format_date(&value.to_string()))
}
