use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::{Error, LoadError, Result};

// ---------------------------------------------------------------------------
// Sample – one row of the opacity file
// ---------------------------------------------------------------------------

/// A single opacity measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub timestamp: NaiveDateTime,
    /// Atmospheric opacity. Expected non-negative, not bounded above.
    pub tau: f64,
}

impl Sample {
    pub fn new(timestamp: NaiveDateTime, tau: f64) -> Self {
        Self { timestamp, tau }
    }
}

// ---------------------------------------------------------------------------
// TimeSeries – the complete loaded series
// ---------------------------------------------------------------------------

/// The loaded, time-ordered series. Read-only once built.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    samples: Vec<Sample>,
    first_timestamp: NaiveDateTime,
    last_timestamp: NaiveDateTime,
}

/// Outcome of [`TimeSeries::clamp_to_range`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clamped {
    /// The instant was inside the covered span and is returned unchanged.
    Within(NaiveDateTime),
    /// The instant preceded the series; the first timestamp is returned.
    Low(NaiveDateTime),
    /// The instant followed the series; the last timestamp is returned.
    High(NaiveDateTime),
}

impl Clamped {
    pub fn value(self) -> NaiveDateTime {
        match self {
            Clamped::Within(t) | Clamped::Low(t) | Clamped::High(t) => t,
        }
    }
}

impl TimeSeries {
    /// Build a series from samples already in ascending time order.
    ///
    /// Ascending order is a precondition of the whole engine, so it is
    /// checked here rather than silently repaired. Equal timestamps are
    /// accepted.
    pub fn from_samples(samples: Vec<Sample>) -> std::result::Result<Self, LoadError> {
        let (first, last) = match (samples.first(), samples.last()) {
            (Some(first), Some(last)) => (first.timestamp, last.timestamp),
            _ => return Err(LoadError::Empty),
        };

        if let Some(pos) = samples
            .windows(2)
            .position(|pair| pair[1].timestamp < pair[0].timestamp)
        {
            return Err(LoadError::OutOfOrder {
                row: pos + 2,
                timestamp: samples[pos + 1].timestamp,
                previous: samples[pos].timestamp,
            });
        }

        Ok(Self {
            samples,
            first_timestamp: first,
            last_timestamp: last,
        })
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false for a constructed series; kept for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first_timestamp(&self) -> NaiveDateTime {
        self.first_timestamp
    }

    pub fn last_timestamp(&self) -> NaiveDateTime {
        self.last_timestamp
    }

    /// The whole series as a selection.
    pub fn all(&self) -> Selection<'_> {
        Selection {
            series: self,
            indices: (0..self.samples.len()).collect(),
        }
    }

    /// Pull `t` back inside `[first_timestamp, last_timestamp]`.
    pub fn clamp_to_range(&self, t: NaiveDateTime) -> Clamped {
        if t < self.first_timestamp {
            log::warn!("minimum available date: {}", self.first_timestamp);
            log::info!("date assigned: {}", self.first_timestamp);
            Clamped::Low(self.first_timestamp)
        } else if t > self.last_timestamp {
            log::warn!("maximum available date: {}", self.last_timestamp);
            log::info!("date assigned: {}", self.last_timestamp);
            Clamped::High(self.last_timestamp)
        } else {
            Clamped::Within(t)
        }
    }

    /// Samples strictly between `from` and `to` after clamping both bounds.
    ///
    /// The inversion check runs on the caller's bounds, before clamping.
    pub fn select_range(&self, from: NaiveDateTime, to: NaiveDateTime) -> Result<Selection<'_>> {
        if from > to {
            return Err(Error::InvalidRange { from, to });
        }
        let from = self.clamp_to_range(from).value();
        let to = self.clamp_to_range(to).value();

        let lo = self.samples.partition_point(|s| s.timestamp <= from);
        let hi = self.samples.partition_point(|s| s.timestamp < to);
        let selection = Selection {
            series: self,
            indices: (lo..hi.max(lo)).collect(),
        };
        selection.log_summary();
        Ok(selection)
    }
}

// ---------------------------------------------------------------------------
// Selection – a read-only view into a TimeSeries
// ---------------------------------------------------------------------------

/// A subsequence of a [`TimeSeries`], stored as ascending indices into it.
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    series: &'a TimeSeries,
    indices: Vec<usize>,
}

impl<'a> Selection<'a> {
    pub fn series(&self) -> &'a TimeSeries {
        self.series
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Selected samples in chronological order.
    pub fn samples(&self) -> impl Iterator<Item = &'a Sample> + '_ {
        let samples = self.series.samples();
        self.indices.iter().map(move |&i| &samples[i])
    }

    pub fn first(&self) -> Option<&'a Sample> {
        self.indices.first().map(|&i| &self.series.samples()[i])
    }

    pub fn last(&self) -> Option<&'a Sample> {
        self.indices.last().map(|&i| &self.series.samples()[i])
    }

    /// Keep only the samples for which `keep` holds.
    pub fn narrow<F>(&self, keep: F) -> Selection<'a>
    where
        F: Fn(&Sample) -> bool,
    {
        let samples = self.series.samples();
        Selection {
            series: self.series,
            indices: self
                .indices
                .iter()
                .copied()
                .filter(|&i| keep(&samples[i]))
                .collect(),
        }
    }

    /// Samples with `lo <= timestamp <= hi`.
    pub fn between(&self, lo: NaiveDateTime, hi: NaiveDateTime) -> Selection<'a> {
        let samples = self.series.samples();
        let start = self
            .indices
            .partition_point(|&i| samples[i].timestamp < lo);
        let end = self
            .indices
            .partition_point(|&i| samples[i].timestamp <= hi);
        Selection {
            series: self.series,
            indices: self.indices[start..end.max(start)].to_vec(),
        }
    }

    /// Chronological union of two selections over the same series.
    ///
    /// Returns `None` when the selections view different series.
    pub fn union(&self, other: &Selection<'a>) -> Option<Selection<'a>> {
        if !std::ptr::eq(self.series, other.series) {
            return None;
        }
        let mut indices: Vec<usize> = self
            .indices
            .iter()
            .chain(other.indices.iter())
            .copied()
            .collect();
        indices.sort_unstable();
        indices.dedup();
        Some(Selection {
            series: self.series,
            indices,
        })
    }

    pub(crate) fn log_summary(&self) {
        log::debug!("no. of sample points: {}", self.len());
        if let (Some(first), Some(last)) = (self.first(), self.last()) {
            log::debug!("data from: {} to: {}", first.timestamp, last.timestamp);
        }
    }
}
