use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;

use super::model::{Sample, TimeSeries};
use crate::error::{LoadError, Result};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// How the opacity source is laid out.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Field separator, `,` unless told otherwise.
    pub delimiter: u8,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a tau series from a headerless `date,time,tau` file.
pub fn load_file(path: &Path, options: &LoadOptions) -> Result<TimeSeries> {
    log::info!("loading tau file {}", path.display());
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let series = load_reader(file, options)?;
    log::info!("file loaded");
    Ok(series)
}

/// Load a tau series from any reader. One malformed row fails the load.
pub fn load_reader<R: Read>(reader: R, options: &LoadOptions) -> Result<TimeSeries> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .delimiter(options.delimiter)
        .from_reader(reader);

    let mut samples = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result.map_err(LoadError::from)?;
        samples.push(parse_record(&record, i + 1)?);
    }

    let series = TimeSeries::from_samples(samples)?;

    let negative = series.samples().iter().filter(|s| s.tau < 0.0).count();
    if negative > 0 {
        log::warn!("{negative} samples carry a negative tau value");
    }
    log::info!("no. of points: {}", series.len());
    log::info!(
        "data from: {} to: {}",
        series.first_timestamp(),
        series.last_timestamp()
    );

    Ok(series)
}

// ---------------------------------------------------------------------------
// Row parsing
// ---------------------------------------------------------------------------

fn parse_record(record: &csv::StringRecord, row: usize) -> std::result::Result<Sample, LoadError> {
    if record.len() != 3 {
        return Err(LoadError::FieldCount {
            row,
            found: record.len(),
        });
    }
    let (date, time, tau) = (&record[0], &record[1], &record[2]);

    let timestamp = parse_timestamp(date, time, row)?;
    let tau = tau
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| LoadError::Tau {
            row,
            value: tau.to_string(),
        })?;

    Ok(Sample::new(timestamp, tau))
}

fn parse_timestamp(
    date: &str,
    time: &str,
    row: usize,
) -> std::result::Result<NaiveDateTime, LoadError> {
    let date = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date, fmt).ok())
        .ok_or_else(|| LoadError::Date {
            row,
            value: date.to_string(),
        })?;
    let time = TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(time, fmt).ok())
        .ok_or_else(|| LoadError::Time {
            row,
            value: time.to_string(),
        })?;
    Ok(date.and_time(time))
}
