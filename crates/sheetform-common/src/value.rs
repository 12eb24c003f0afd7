use chrono::{Duration as ChronoDur, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::{
    fmt::{self, Display},
    hash::{Hash, Hasher},
};

use crate::{ExcelError, SpreadsheetSelection};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/* ───────────────────── Excel date-serial utilities ───────────────────
Serial 1  = 1900-01-01
Serial 60 = 1900-02-29  (phantom – doesn't exist, kept for compatibility)
Serial 61 = 1900-03-01
Time is stored as fractional days (no timezone).
------------------------------------------------------------------- */

const EXCEL_EPOCH: NaiveDate = NaiveDate::from_ymd_opt(1899, 12, 31).unwrap();
const PHANTOM_LEAP_DAY_END: NaiveDate = NaiveDate::from_ymd_opt(1900, 3, 1).unwrap();
const MIDNIGHT: NaiveTime = NaiveTime::from_hms_opt(0, 0, 0).unwrap();

pub fn datetime_to_serial(dt: &NaiveDateTime) -> f64 {
    let days = (dt.date() - EXCEL_EPOCH).num_days();
    let serial_days = if dt.date() >= PHANTOM_LEAP_DAY_END {
        days + 1
    } else {
        days
    };
    let secs_in_day = dt.time().num_seconds_from_midnight() as f64
        + dt.time().nanosecond() as f64 / 1_000_000_000.0;
    serial_days as f64 + secs_in_day / 86_400.0
}

/// `None` for serials outside chrono's representable range.
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let days = serial.trunc() as i64;
    let frac_millis = (serial.fract() * 86_400_000.0).round() as i64;

    let date = if days == 60 {
        NaiveDate::from_ymd_opt(1900, 2, 28)?
    } else {
        let offset = if days < 60 { days } else { days - 1 };
        EXCEL_EPOCH.checked_add_signed(ChronoDur::try_days(offset)?)?
    };
    let carry_day = frac_millis / 86_400_000;
    let millis = frac_millis.rem_euclid(86_400_000);
    let time = NaiveTime::from_num_seconds_from_midnight_opt(
        (millis / 1000) as u32,
        ((millis % 1000) * 1_000_000) as u32,
    )?;
    let date = date.checked_add_signed(ChronoDur::try_days(carry_day)?)?;
    Some(date.and_time(time))
}

/// A value a cell can hold or a formula can evaluate to.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Int(i64),
    Number(f64),
    Text(String),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
    Selection(SpreadsheetSelection),
    Error(ExcelError),
    Empty,
}

impl Hash for LiteralValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            LiteralValue::Int(i) => i.hash(state),
            LiteralValue::Number(n) => n.to_bits().hash(state),
            LiteralValue::Text(s) => s.hash(state),
            LiteralValue::Boolean(b) => b.hash(state),
            LiteralValue::Date(d) => d.hash(state),
            LiteralValue::DateTime(dt) => dt.hash(state),
            LiteralValue::Time(t) => t.hash(state),
            LiteralValue::Selection(s) => s.hash(state),
            LiteralValue::Error(e) => e.hash(state),
            LiteralValue::Empty => {}
        }
    }
}

impl Eq for LiteralValue {}

impl Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Int(i) => write!(f, "{i}"),
            LiteralValue::Number(n) => write!(f, "{n}"),
            LiteralValue::Text(s) => write!(f, "{s}"),
            LiteralValue::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            LiteralValue::Date(d) => write!(f, "{d}"),
            LiteralValue::DateTime(dt) => write!(f, "{dt}"),
            LiteralValue::Time(t) => write!(f, "{t}"),
            LiteralValue::Selection(s) => write!(f, "{s}"),
            LiteralValue::Error(e) => write!(f, "{}", e.kind),
            LiteralValue::Empty => Ok(()),
        }
    }
}

impl LiteralValue {
    pub fn as_serial_number(&self) -> Option<f64> {
        match self {
            LiteralValue::Date(d) => Some(datetime_to_serial(&d.and_time(MIDNIGHT))),
            LiteralValue::DateTime(dt) => Some(datetime_to_serial(dt)),
            LiteralValue::Time(t) => Some(
                (t.num_seconds_from_midnight() as f64 + t.nanosecond() as f64 / 1e9) / 86_400.0,
            ),
            LiteralValue::Int(i) => Some(*i as f64),
            LiteralValue::Number(n) => Some(*n),
            LiteralValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Date when the serial has no time part, otherwise a date-time.
    pub fn from_serial_number(serial: f64) -> Option<Self> {
        let dt = serial_to_datetime(serial)?;
        Some(if dt.time() == MIDNIGHT {
            LiteralValue::Date(dt.date())
        } else {
            LiteralValue::DateTime(dt)
        })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, LiteralValue::Error(_))
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            LiteralValue::Boolean(b) => *b,
            LiteralValue::Int(i) => *i != 0,
            LiteralValue::Number(n) => *n != 0.0,
            LiteralValue::Text(s) => !s.is_empty(),
            LiteralValue::Date(_) | LiteralValue::DateTime(_) | LiteralValue::Time(_) => true,
            LiteralValue::Selection(_) => true,
            LiteralValue::Error(_) | LiteralValue::Empty => false,
        }
    }
}

impl From<f64> for LiteralValue {
    fn from(value: f64) -> Self {
        LiteralValue::Number(value)
    }
}

impl From<&str> for LiteralValue {
    fn from(value: &str) -> Self {
        LiteralValue::Text(value.to_string())
    }
}

impl From<bool> for LiteralValue {
    fn from(value: bool) -> Self {
        LiteralValue::Boolean(value)
    }
}
