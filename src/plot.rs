use chrono::NaiveDateTime;
use serde::Serialize;

use crate::data::stats::StatsTable;

/// Box width as a fraction of the smallest bucket spacing.
pub const BOX_WIDTH_FRACTION: f64 = 0.85;

/// Opacity levels matching 2 mm and 8 mm of precipitable water vapour.
pub const PWV_LIMITS: [ReferenceLine; 2] = [
    ReferenceLine {
        tau: 0.1,
        label: "2mm PWV",
    },
    ReferenceLine {
        tau: 0.4,
        label: "8mm PWV",
    },
];

/// Horizontal guide drawn across a quartile plot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReferenceLine {
    pub tau: f64,
    pub label: &'static str,
}

// ---------------------------------------------------------------------------
// Box plot feed
// ---------------------------------------------------------------------------

/// One box: quartiles with whiskers at the bucket extremes, no fliers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoxStats {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub whisker_low: f64,
    pub whisker_high: f64,
}

/// Everything an external plotter needs to draw one box per bucket, with
/// the bucket means overlaid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxPlotFeed {
    /// Bucket starts, used as tick labels.
    pub labels: Vec<NaiveDateTime>,
    /// Minutes since the first bucket.
    pub positions: Vec<f64>,
    pub width: f64,
    pub x_limits: (f64, f64),
    pub boxes: Vec<BoxStats>,
    pub means: Vec<f64>,
}

impl BoxPlotFeed {
    /// `None` when the table has no buckets.
    pub fn from_table(table: &StatsTable) -> Option<Self> {
        let (labels, positions) = axis(table)?;
        let spacing = min_spacing(&positions);

        let boxes = table
            .iter()
            .map(|b| BoxStats {
                q1: b.stat.q1,
                median: b.stat.median,
                q3: b.stat.q3,
                whisker_low: b.stat.min,
                whisker_high: b.stat.max,
            })
            .collect();
        let first = positions[0];
        let last = positions[positions.len() - 1];

        Some(Self {
            labels,
            width: BOX_WIDTH_FRACTION * spacing,
            x_limits: (first - spacing, last + spacing),
            positions,
            boxes,
            means: table.iter().map(|b| b.stat.mean).collect(),
        })
    }
}

// ---------------------------------------------------------------------------
// Quartile line feed
// ---------------------------------------------------------------------------

/// First quartile, median and third quartile as three line series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuartileLines {
    pub labels: Vec<NaiveDateTime>,
    pub positions: Vec<f64>,
    pub q1: Vec<f64>,
    pub median: Vec<f64>,
    pub q3: Vec<f64>,
    pub limits: Vec<ReferenceLine>,
}

impl QuartileLines {
    pub fn from_table(table: &StatsTable) -> Option<Self> {
        let (labels, positions) = axis(table)?;
        Some(Self {
            labels,
            positions,
            q1: table.iter().map(|b| b.stat.q1).collect(),
            median: table.iter().map(|b| b.stat.median).collect(),
            q3: table.iter().map(|b| b.stat.q3).collect(),
            limits: PWV_LIMITS.to_vec(),
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn axis(table: &StatsTable) -> Option<(Vec<NaiveDateTime>, Vec<f64>)> {
    let origin = table.buckets().first()?.start;
    let labels: Vec<NaiveDateTime> = table.iter().map(|b| b.start).collect();
    let positions = labels
        .iter()
        .map(|&t| (t - origin).num_seconds() as f64 / 60.0)
        .collect();
    Some((labels, positions))
}

/// Smallest gap between consecutive positions; 1.0 for a single bucket.
fn min_spacing(positions: &[f64]) -> f64 {
    let spacing = positions
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .fold(f64::INFINITY, f64::min);
    if spacing.is_finite() && spacing > 0.0 {
        spacing
    } else {
        1.0
    }
}
