//! Calendar and timing features derived from scheduled/operated timestamps.
//!
//! These are not part of the deployed top-10 column set; they are computed
//! for analysis and for building the delay label of historical flights.

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{DelayError, Result};
use crate::types::FlightField;

/// Timestamp format of `Fecha-I` / `Fecha-O`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Flights later than this many minutes count as delayed.
pub const DEFAULT_DELAY_THRESHOLD_MINUTES: f64 = 15.0;

/// Inclusive (month, day) ranges of high season.
const HIGH_SEASON: [((u32, u32), (u32, u32)); 4] = [
    ((12, 15), (12, 31)),
    ((1, 1), (3, 3)),
    ((7, 15), (7, 31)),
    ((9, 11), (9, 30)),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodDay {
    /// 05:00 - 11:59
    Morning,
    /// 12:00 - 18:59
    Afternoon,
    /// 19:00 - 04:59
    Night,
}

pub fn period_day(scheduled: &NaiveDateTime) -> PeriodDay {
    match scheduled.hour() {
        5..=11 => PeriodDay::Morning,
        12..=18 => PeriodDay::Afternoon,
        _ => PeriodDay::Night,
    }
}

pub fn is_high_season(scheduled: &NaiveDateTime) -> bool {
    let md = (scheduled.month(), scheduled.day());
    HIGH_SEASON
        .iter()
        .any(|(start, end)| *start <= md && md <= *end)
}

/// Minutes between operated and scheduled time. Negative for early operations.
pub fn min_diff(scheduled: &NaiveDateTime, operated: &NaiveDateTime) -> f64 {
    (*operated - *scheduled).num_seconds() as f64 / 60.0
}

pub fn is_delayed(min_diff: f64, threshold_minutes: f64) -> bool {
    min_diff > threshold_minutes
}

/// Scheduled (`Fecha-I`) and operated (`Fecha-O`) time of one flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledOperation {
    pub scheduled: NaiveDateTime,
    pub operated: NaiveDateTime,
}

impl ScheduledOperation {
    pub fn parse(index: usize, fecha_i: &str, fecha_o: &str) -> Result<Self> {
        let scheduled = parse_timestamp(index, FlightField::FechaI, fecha_i)?;
        let operated = parse_timestamp(index, FlightField::FechaO, fecha_o)?;
        Ok(Self {
            scheduled,
            operated,
        })
    }
}

fn parse_timestamp(index: usize, field: FlightField, raw: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).map_err(|e| {
        DelayError::validation(index, field, format!("invalid timestamp {:?}: {}", raw, e))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DerivedFeatures {
    pub period_day: PeriodDay,
    pub high_season: bool,
    pub min_diff: f64,
    pub delay: bool,
}

impl DerivedFeatures {
    pub fn compute(op: &ScheduledOperation, threshold_minutes: f64) -> Self {
        let diff = min_diff(&op.scheduled, &op.operated);
        Self {
            period_day: period_day(&op.scheduled),
            high_season: is_high_season(&op.scheduled),
            min_diff: diff,
            delay: is_delayed(diff, threshold_minutes),
        }
    }
}
