//! Wire-shape request types and their validated conversion to domain types.
//!
//! The HTTP layer (external) deserializes request bodies into these shapes
//! and hands them to the engine. Conversion never guesses: an unknown enum
//! value, a zero interval, or an unparsable amount is a
//! [`EngineError::Validation`], raised before any computation runs.
//!
//! Amounts arrive as JSON numbers or numeric strings; both parse to
//! [`Decimal`] so that `"123.45"` and `123.45` compare equal downstream.

use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::billing::BillingEdit;
use crate::error::{EngineError, Result};
use crate::recurrence::{
    EndCondition, Frequency, MonthlyPattern, RecurrenceSelection, WeekdayCode,
};

// ── Amounts ─────────────────────────────────────────────────────────────────

/// A money amount as it appears on the wire: a JSON number or numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Number(f64),
    Text(String),
}

impl Amount {
    /// Parse to a decimal; `field` names the offending field in the error.
    ///
    /// # Errors
    ///
    /// [`EngineError::Validation`] for non-finite numbers or non-numeric text.
    pub fn to_decimal(&self, field: &str) -> Result<Decimal> {
        match self {
            Amount::Number(n) => Decimal::try_from(*n)
                .map_err(|_| EngineError::Validation(format!("{field}: invalid number {n}"))),
            Amount::Text(s) => s.trim().parse::<Decimal>().map_err(|_| {
                EngineError::Validation(format!("{field}: not a numeric value: '{s}'"))
            }),
        }
    }
}

// ── Billing edit request ────────────────────────────────────────────────────

/// A billing edit as received from the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingEditRequest {
    pub fee: Amount,
    pub write_off: Amount,
    #[serde(default)]
    pub service_id: Option<String>,
}

impl BillingEditRequest {
    /// Parse the amounts and produce the edit for the pure adjuster.
    ///
    /// # Errors
    ///
    /// [`EngineError::Validation`] if either amount fails to parse. Nothing
    /// downstream runs on failure.
    pub fn to_edit(&self) -> Result<BillingEdit> {
        Ok(BillingEdit {
            fee: self.fee.to_decimal("fee")?,
            write_off: self.write_off.to_decimal("writeOff")?,
            service_id: self.service_id.clone(),
        })
    }
}

// ── Build-rule request ──────────────────────────────────────────────────────

/// The `endValue` field: an occurrence count or a date string, depending on
/// `endType`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EndValue {
    Number(f64),
    Text(String),
}

/// A recurrence selection as received from the scheduling UI.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRuleRequest {
    /// Frequency class: `"Daily"`, `"Weekly"`, `"Monthly"`, `"Yearly"`
    /// (case-insensitive).
    pub period: String,
    /// Stringified interval; `"1"` or absent means every period.
    #[serde(default)]
    pub frequency: Option<String>,
    /// Two-letter weekday codes in the user's selection order.
    #[serde(default)]
    pub selected_days: Vec<String>,
    /// `"onDateOfMonth"`, `"onWeekDayOfMonth"`, or `"onLastWeekDayOfMonth"`.
    #[serde(default)]
    pub monthly_pattern: Option<String>,
    /// `"After"`, `"On Date"`, or absent for a never-ending schedule.
    #[serde(default)]
    pub end_type: Option<String>,
    #[serde(default)]
    pub end_value: Option<EndValue>,
    /// Date of the first occurrence (ISO `YYYY-MM-DD`).
    pub start_date: NaiveDate,
}

impl BuildRuleRequest {
    /// Validate and convert to a [`RecurrenceSelection`].
    ///
    /// # Errors
    ///
    /// [`EngineError::Validation`] for an unknown period, monthly pattern,
    /// end type, or weekday code; a non-positive or non-numeric interval;
    /// or an `endValue` that does not fit its `endType`.
    pub fn to_selection(&self) -> Result<RecurrenceSelection> {
        Ok(RecurrenceSelection {
            frequency: parse_period(&self.period)?,
            interval: parse_interval(self.frequency.as_deref())?,
            weekdays: parse_weekdays(&self.selected_days)?,
            monthly_pattern: self
                .monthly_pattern
                .as_deref()
                .map(parse_monthly_pattern)
                .transpose()?,
            end: parse_end(self.end_type.as_deref(), self.end_value.as_ref())?,
            anchor_date: self.start_date,
        })
    }
}

// ── Parsing helpers ─────────────────────────────────────────────────────────

fn parse_period(s: &str) -> Result<Frequency> {
    match s.to_ascii_uppercase().as_str() {
        "DAILY" => Ok(Frequency::Daily),
        "WEEKLY" => Ok(Frequency::Weekly),
        "MONTHLY" => Ok(Frequency::Monthly),
        "YEARLY" => Ok(Frequency::Yearly),
        _ => Err(EngineError::Validation(format!("period: unknown value '{s}'"))),
    }
}

fn parse_interval(s: Option<&str>) -> Result<u32> {
    let Some(s) = s else { return Ok(1) };
    let n: u32 = s.trim().parse().map_err(|_| {
        EngineError::Validation(format!("frequency: not a positive integer: '{s}'"))
    })?;
    if n == 0 {
        return Err(EngineError::Validation(
            "frequency: must be at least 1".to_string(),
        ));
    }
    Ok(n)
}

fn parse_weekdays(codes: &[String]) -> Result<Vec<WeekdayCode>> {
    codes
        .iter()
        .map(|code| {
            WeekdayCode::from_code(code).ok_or_else(|| {
                EngineError::Validation(format!("selectedDays: unknown weekday code '{code}'"))
            })
        })
        .collect()
}

fn parse_monthly_pattern(s: &str) -> Result<MonthlyPattern> {
    match s {
        "onDateOfMonth" => Ok(MonthlyPattern::OnDateOfMonth),
        "onWeekDayOfMonth" => Ok(MonthlyPattern::OnWeekdayOfMonth),
        "onLastWeekDayOfMonth" => Ok(MonthlyPattern::OnLastWeekdayOfMonth),
        _ => Err(EngineError::Validation(format!(
            "monthlyPattern: unknown value '{s}'"
        ))),
    }
}

fn parse_end(end_type: Option<&str>, end_value: Option<&EndValue>) -> Result<EndCondition> {
    match end_type {
        None => Ok(EndCondition::Never),
        Some("After") => {
            let value = end_value.ok_or_else(|| {
                EngineError::Validation("endValue: required when endType is 'After'".to_string())
            })?;
            Ok(EndCondition::After(parse_count(value)?))
        }
        Some("On Date") => {
            let value = end_value.ok_or_else(|| {
                EngineError::Validation("endValue: required when endType is 'On Date'".to_string())
            })?;
            Ok(EndCondition::OnDate(parse_end_date(value)?))
        }
        Some(other) => Err(EngineError::Validation(format!(
            "endType: unknown value '{other}'"
        ))),
    }
}

fn parse_count(value: &EndValue) -> Result<u32> {
    let n = match value {
        EndValue::Number(n) => {
            if !n.is_finite() || n.fract() != 0.0 {
                return Err(EngineError::Validation(format!(
                    "endValue: not a whole occurrence count: {n}"
                )));
            }
            *n as i64
        }
        EndValue::Text(s) => s.trim().parse::<i64>().map_err(|_| {
            EngineError::Validation(format!("endValue: not an occurrence count: '{s}'"))
        })?,
    };
    u32::try_from(n)
        .ok()
        .filter(|n| *n >= 1)
        .ok_or_else(|| EngineError::Validation(format!("endValue: must be at least 1, got {n}")))
}

fn parse_end_date(value: &EndValue) -> Result<NaiveDate> {
    let EndValue::Text(s) = value else {
        return Err(EngineError::Validation(
            "endValue: expected a date string for endType 'On Date'".to_string(),
        ));
    };
    let s = s.trim();
    // Plain ISO date, or a full RFC 3339 timestamp whose date part we take.
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
        .ok_or_else(|| EngineError::Validation(format!("endValue: not a date: '{s}'")))
}

// ── Tests ───────────────────────────────────────────────────────────────────
