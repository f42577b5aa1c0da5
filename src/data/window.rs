//! Calendar-window aggregation of a selection into a [`StatsTable`].
//!
//! The selection is walked one calendar unit at a time (year, month, day,
//! hour or minute). Unit values accumulate until `step` of them are pending,
//! then every sample of the moving window whose unit value is pending forms
//! one bucket. The moving window is re-queried from the full selection each
//! time it advances, and carries a one-unit guard band on both sides so that
//! samples whose unit value wraps across the window edge are not lost.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, Timelike};

use super::model::Selection;
use super::stats::{Bucket, StatRecord, StatsTable};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Granularity
// ---------------------------------------------------------------------------

/// Time scale requested by an aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Year,
    Month,
    Day,
    /// Night sessions, stepped by day.
    Night,
    Hour,
    Minute,
}

impl Granularity {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "yr" => Some(Granularity::Year),
            "mn" => Some(Granularity::Month),
            "dy" => Some(Granularity::Day),
            "ng" => Some(Granularity::Night),
            "hr" => Some(Granularity::Hour),
            "mt" => Some(Granularity::Minute),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Granularity::Year => "yr",
            Granularity::Month => "mn",
            Granularity::Day => "dy",
            Granularity::Night => "ng",
            Granularity::Hour => "hr",
            Granularity::Minute => "mt",
        }
    }

    fn unit(self) -> Unit {
        match self {
            Granularity::Year => Unit::Year,
            Granularity::Month => Unit::Month,
            Granularity::Day | Granularity::Night => Unit::Day,
            Granularity::Hour => Unit::Hour,
            Granularity::Minute => Unit::Minute,
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-{}", self.code())
    }
}

// ---------------------------------------------------------------------------
// WindowSpec – parsed aggregation request
// ---------------------------------------------------------------------------

/// Granularity plus step, e.g. `-mn 1` or `-hr 6`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSpec {
    granularity: Granularity,
    step: u32,
    /// Step exactly as written; hour and minute widths are read from it.
    raw_step: String,
}

impl WindowSpec {
    pub fn new(granularity: Granularity, step: u32) -> Result<Self> {
        if step == 0 {
            return Err(Error::InvalidStep(step.to_string()));
        }
        Ok(Self {
            granularity,
            step,
            raw_step: step.to_string(),
        })
    }

    /// Parse `-<code> <step>`. Anything after the step is ignored.
    pub fn parse(text: &str) -> Result<Self> {
        let mut words = text.split_whitespace();
        let flag = words.next().unwrap_or("");
        let code = flag
            .strip_prefix('-')
            .ok_or_else(|| Error::UnsupportedGranularity(flag.to_string()))?;
        let granularity = Granularity::from_code(code)
            .ok_or_else(|| Error::UnsupportedGranularity(code.to_string()))?;

        let raw = words.next().unwrap_or("");
        let step = raw
            .parse::<u32>()
            .ok()
            .filter(|&step| step > 0)
            .ok_or_else(|| Error::InvalidStep(raw.to_string()))?;

        Ok(Self {
            granularity,
            step,
            raw_step: raw.to_string(),
        })
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    /// Calendar span covered by one bucket.
    ///
    /// Hours and minutes read the raw step as a zero-padded clock offset
    /// (`HH:00:00`, `00:MM:00`).
    fn width(&self) -> Result<Span> {
        let invalid = || Error::InvalidStep(self.raw_step.clone());
        match self.granularity.unit() {
            Unit::Year => self
                .step
                .checked_mul(12)
                .map(Span::Months)
                .ok_or_else(invalid),
            Unit::Month => Ok(Span::Months(self.step)),
            Unit::Day => Ok(Span::Exact(Duration::days(self.step.into()))),
            Unit::Hour => clock_offset(&format!("{:0>2}:00:00", self.raw_step))
                .map(Span::Exact)
                .ok_or_else(invalid),
            Unit::Minute => clock_offset(&format!("00:{:0>2}:00", self.raw_step))
                .map(Span::Exact)
                .ok_or_else(invalid),
        }
    }
}

impl fmt::Display for WindowSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.granularity, self.raw_step)
    }
}

fn clock_offset(text: &str) -> Option<Duration> {
    let mut parts = text.split(':').map(|p| p.parse::<i64>().ok());
    let (h, m, s) = (parts.next()??, parts.next()??, parts.next()??);
    if parts.next().is_some() {
        return None;
    }
    Some(Duration::hours(h) + Duration::minutes(m) + Duration::seconds(s))
}

// ---------------------------------------------------------------------------
// Calendar units
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Year,
    Month,
    Day,
    Hour,
    Minute,
}

/// Calendar offset: whole months, or an exact duration.
#[derive(Debug, Clone, Copy)]
enum Span {
    Months(u32),
    Exact(Duration),
}

impl Span {
    fn after(self, t: NaiveDateTime) -> NaiveDateTime {
        match self {
            Span::Months(n) => t.checked_add_months(Months::new(n)),
            Span::Exact(d) => t.checked_add_signed(d),
        }
        .unwrap_or(NaiveDateTime::MAX)
    }

    fn before(self, t: NaiveDateTime) -> NaiveDateTime {
        match self {
            Span::Months(n) => t.checked_sub_months(Months::new(n)),
            Span::Exact(d) => t.checked_sub_signed(d),
        }
        .unwrap_or(NaiveDateTime::MIN)
    }
}

impl Unit {
    fn value(self, t: NaiveDateTime) -> i64 {
        match self {
            Unit::Year => t.year().into(),
            Unit::Month => t.month().into(),
            Unit::Day => t.day().into(),
            Unit::Hour => t.hour().into(),
            Unit::Minute => t.minute().into(),
        }
    }

    fn one(self) -> Span {
        match self {
            Unit::Year => Span::Months(12),
            Unit::Month => Span::Months(1),
            Unit::Day => Span::Exact(Duration::days(1)),
            Unit::Hour => Span::Exact(Duration::hours(1)),
            Unit::Minute => Span::Exact(Duration::minutes(1)),
        }
    }

    /// Start of the unit containing `t`.
    fn floor(self, t: NaiveDateTime) -> NaiveDateTime {
        let date = t.date();
        let midnight = |d: NaiveDate| d.and_time(chrono::NaiveTime::MIN);
        match self {
            Unit::Year => midnight(date.with_ordinal(1).unwrap_or(date)),
            Unit::Month => midnight(date.with_day(1).unwrap_or(date)),
            Unit::Day => midnight(date),
            Unit::Hour => date.and_hms_opt(t.hour(), 0, 0).unwrap_or(t),
            Unit::Minute => date.and_hms_opt(t.hour(), t.minute(), 0).unwrap_or(t),
        }
    }

    /// Unit values from the unit of `first` to the unit of `last` inclusive,
    /// following the calendar (months wrap 12 -> 1, day-of-month follows the
    /// real month lengths, hours wrap 23 -> 0, minutes 59 -> 0).
    fn cycle(self, first: NaiveDateTime, last: NaiveDateTime) -> impl Iterator<Item = i64> {
        let end = self.floor(last);
        let one = self.one();
        std::iter::successors(Some(self.floor(first)), move |&t| {
            let next = one.after(t);
            (next > t).then_some(next)
        })
        .take_while(move |&t| t <= end)
        .map(move |t| self.value(t))
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Parse `request` (e.g. `-dy 1`) and aggregate `selection` with it.
pub fn aggregate_str(selection: &Selection<'_>, request: &str) -> Result<StatsTable> {
    let spec = WindowSpec::parse(request)?;
    aggregate(selection, &spec)
}

/// Group `selection` into calendar buckets and summarize each one.
///
/// Buckets are labelled with the nominal window start. A bucket whose
/// pending unit values match no sample is skipped with a warning.
pub fn aggregate(selection: &Selection<'_>, spec: &WindowSpec) -> Result<StatsTable> {
    let (Some(first), Some(last)) = (selection.first(), selection.last()) else {
        return Err(Error::EmptySelection);
    };

    let unit = spec.granularity.unit();
    let width = spec.width()?;
    let guard = unit.one();
    let step = spec.step as usize;
    let moving_window = |start: NaiveDateTime| {
        selection.between(guard.before(start), guard.after(width.after(start)))
    };

    let mut table = StatsTable::default();
    let mut window_start = first.timestamp;
    let mut window = moving_window(window_start);

    let mut pending = BTreeSet::new();
    let mut n_pending = 0;
    let mut triggered = false;

    let mut cycle = unit.cycle(first.timestamp, last.timestamp).peekable();
    while let Some(value) = cycle.next() {
        if !triggered {
            triggered = window.samples().any(|s| unit.value(s.timestamp) == value);
            if !triggered {
                continue;
            }
        }

        pending.insert(value);
        n_pending += 1;
        if n_pending < step && cycle.peek().is_some() {
            continue;
        }

        let taus: Vec<f64> = window
            .samples()
            .filter(|s| pending.contains(&unit.value(s.timestamp)))
            .map(|s| s.tau)
            .collect();
        match StatRecord::describe(&taus) {
            Some(stat) => {
                log::debug!("{spec} bucket at {window_start}: {stat:?}");
                table.push(Bucket {
                    start: window_start,
                    stat,
                });
            }
            None => log::warn!("empty span at {window_start}"),
        }

        pending.clear();
        n_pending = 0;
        window_start = width.after(window_start);
        window = moving_window(window_start);
    }

    log::debug!("{spec}: {} buckets", table.len());
    Ok(table)
}
