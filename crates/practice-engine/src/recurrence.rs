//! Recurrence rule construction for repeating appointments and availability.
//!
//! Converts a user's recurrence selection (frequency, interval, weekday
//! selection, monthly pattern, end condition) into the canonical
//! semicolon-joined `KEY=VALUE` rule string persisted with the appointment
//! record. Expansion of a rule into concrete occurrences happens downstream
//! in the calendar layer and is not handled here.
//!
//! # Design Principle
//!
//! [`build_rule`] is a pure function over explicit inputs — no clock access,
//! no failure modes. Invalid combinations (a monthly pattern without an
//! anchor date, a missing frequency) are unrepresentable: [`RecurrenceSelection`]
//! makes `anchor_date` and `frequency` mandatory at the type level.
//!
//! Rules are modeled as a typed [`Clause`] list and only serialized to text
//! at the edge, so clause ordering and formatting live in exactly one place.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;
use std::fmt;

// ── Selection types ─────────────────────────────────────────────────────────

/// How often the schedule repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// The FREQ clause token.
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        }
    }
}

/// Two-letter weekday code, Sunday-start numbering (0=SU .. 6=SA).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WeekdayCode {
    Su,
    Mo,
    Tu,
    We,
    Th,
    Fr,
    Sa,
}

impl WeekdayCode {
    /// The BYDAY clause token.
    pub fn as_str(&self) -> &'static str {
        match self {
            WeekdayCode::Su => "SU",
            WeekdayCode::Mo => "MO",
            WeekdayCode::Tu => "TU",
            WeekdayCode::We => "WE",
            WeekdayCode::Th => "TH",
            WeekdayCode::Fr => "FR",
            WeekdayCode::Sa => "SA",
        }
    }

    /// Parse a two-letter code (case-insensitive).
    pub fn from_code(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "SU" => Some(WeekdayCode::Su),
            "MO" => Some(WeekdayCode::Mo),
            "TU" => Some(WeekdayCode::Tu),
            "WE" => Some(WeekdayCode::We),
            "TH" => Some(WeekdayCode::Th),
            "FR" => Some(WeekdayCode::Fr),
            "SA" => Some(WeekdayCode::Sa),
            _ => None,
        }
    }

    /// The code for a chrono weekday.
    pub fn from_weekday(wd: Weekday) -> Self {
        match wd {
            Weekday::Sun => WeekdayCode::Su,
            Weekday::Mon => WeekdayCode::Mo,
            Weekday::Tue => WeekdayCode::Tu,
            Weekday::Wed => WeekdayCode::We,
            Weekday::Thu => WeekdayCode::Th,
            Weekday::Fri => WeekdayCode::Fr,
            Weekday::Sat => WeekdayCode::Sa,
        }
    }
}

/// Which day a monthly schedule repeats on, relative to the anchor date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MonthlyPattern {
    /// Same day-of-month as the anchor (e.g., "the 14th").
    OnDateOfMonth,
    /// Same weekday and week-of-month as the anchor (e.g., "the 3rd Tuesday").
    OnWeekdayOfMonth,
    /// Last occurrence of the anchor's weekday in the month, regardless of
    /// which week the anchor itself falls in (e.g., "the last Tuesday").
    OnLastWeekdayOfMonth,
}

/// When the schedule stops repeating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EndCondition {
    /// Repeats indefinitely; no termination clause is emitted.
    Never,
    /// Stops after this many occurrences (must be positive).
    After(u32),
    /// Stops at end-of-day on this date (inclusive).
    OnDate(NaiveDate),
}

/// A user's recurrence selection, ready for rule construction.
///
/// `anchor_date` is the date of the first occurrence and supplies the
/// day-of-month / weekday-of-month facts that monthly patterns need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecurrenceSelection {
    pub frequency: Frequency,
    /// Repeat every N periods; 1 emits no INTERVAL clause.
    pub interval: u32,
    /// Weekday selection for weekly schedules, in the order the user picked
    /// them. Ignored for other frequencies.
    pub weekdays: Vec<WeekdayCode>,
    /// Monthly repeat pattern. Ignored for other frequencies.
    pub monthly_pattern: Option<MonthlyPattern>,
    pub end: EndCondition,
    pub anchor_date: NaiveDate,
}

// ── Rule representation ─────────────────────────────────────────────────────

/// One `KEY=VALUE` clause of a recurrence rule.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Clause {
    Freq(Frequency),
    Interval(u32),
    ByDayList(Vec<WeekdayCode>),
    ByMonthDay(u32),
    /// Ordinal weekday-of-month: positive 1..=5 counts from the start of the
    /// month, -1 means the last occurrence.
    ByDayOrdinal { ordinal: i8, day: WeekdayCode },
    Count(u32),
    Until(NaiveDate),
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::Freq(freq) => write!(f, "FREQ={}", freq.as_str()),
            Clause::Interval(n) => write!(f, "INTERVAL={n}"),
            Clause::ByDayList(days) => {
                write!(f, "BYDAY=")?;
                for (i, day) in days.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", day.as_str())?;
                }
                Ok(())
            }
            Clause::ByMonthDay(day) => write!(f, "BYMONTHDAY={day}"),
            Clause::ByDayOrdinal { ordinal, day } => {
                write!(f, "BYDAY={}{}", ordinal, day.as_str())
            }
            Clause::Count(n) => write!(f, "COUNT={n}"),
            // Calendar fields verbatim, end-of-day, literal Z suffix — the
            // conventional inclusive UNTIL boundary. No timezone conversion.
            Clause::Until(date) => write!(f, "UNTIL={}T235959Z", date.format("%Y%m%d")),
        }
    }
}

/// A built recurrence rule: an ordered clause list with a canonical string
/// form (semicolon-joined, FREQ first, termination clause last).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    clauses: Vec<Clause>,
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                write!(f, ";")?;
            }
            write!(f, "{clause}")?;
        }
        Ok(())
    }
}

impl RecurrenceRule {
    /// The canonical string form, as persisted with the appointment record.
    pub fn to_rule_string(&self) -> String {
        self.to_string()
    }
}

// ── build_rule ──────────────────────────────────────────────────────────────

/// Build the canonical recurrence rule for a selection.
///
/// Pure and total: every well-typed selection produces a rule. Clause order
/// is fixed (FREQ, INTERVAL, BYDAY/BYMONTHDAY, COUNT/UNTIL) — significant
/// for human debugging, not for correctness, since each key is distinct.
///
/// Weekday selection order is preserved exactly as given; it reflects the
/// order the user picked days in and must not be sorted.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use practice_engine::recurrence::{
///     build_rule, EndCondition, Frequency, RecurrenceSelection, WeekdayCode,
/// };
///
/// let selection = RecurrenceSelection {
///     frequency: Frequency::Weekly,
///     interval: 1,
///     weekdays: vec![WeekdayCode::Mo, WeekdayCode::We, WeekdayCode::Fr],
///     monthly_pattern: None,
///     end: EndCondition::Never,
///     anchor_date: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
/// };
/// assert_eq!(build_rule(&selection).to_rule_string(), "FREQ=WEEKLY;BYDAY=MO,WE,FR");
/// ```
pub fn build_rule(selection: &RecurrenceSelection) -> RecurrenceRule {
    let mut clauses = vec![Clause::Freq(selection.frequency)];

    if selection.interval > 1 {
        clauses.push(Clause::Interval(selection.interval));
    }

    if selection.frequency == Frequency::Weekly && !selection.weekdays.is_empty() {
        clauses.push(Clause::ByDayList(selection.weekdays.clone()));
    }

    if selection.frequency == Frequency::Monthly {
        if let Some(pattern) = selection.monthly_pattern {
            clauses.push(monthly_clause(pattern, selection.anchor_date));
        }
    }

    match selection.end {
        EndCondition::Never => {}
        EndCondition::After(count) => clauses.push(Clause::Count(count)),
        EndCondition::OnDate(date) => clauses.push(Clause::Until(date)),
    }

    RecurrenceRule { clauses }
}

/// Derive the monthly-pattern clause from the anchor date.
fn monthly_clause(pattern: MonthlyPattern, anchor: NaiveDate) -> Clause {
    match pattern {
        MonthlyPattern::OnDateOfMonth => Clause::ByMonthDay(anchor.day()),
        MonthlyPattern::OnWeekdayOfMonth => Clause::ByDayOrdinal {
            // ceil(day / 7): 1st..5th occurrence of this weekday in the month
            ordinal: ordinal_in_month(anchor.day()),
            day: WeekdayCode::from_weekday(anchor.weekday()),
        },
        MonthlyPattern::OnLastWeekdayOfMonth => Clause::ByDayOrdinal {
            ordinal: -1,
            day: WeekdayCode::from_weekday(anchor.weekday()),
        },
    }
}

/// Which occurrence of its weekday a day-of-month is (1..=5).
fn ordinal_in_month(day_of_month: u32) -> i8 {
    (day_of_month.div_ceil(7)) as i8
}

// ── Tests ───────────────────────────────────────────────────────────────────
