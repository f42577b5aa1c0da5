use std::f64::consts::PI;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Datelike, Duration, NaiveDate, Timelike};
use clap::Parser;

/// Write a deterministic synthetic `date,time,tau` series.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    #[arg(long, default_value = "sample_tau.csv")]
    output: PathBuf,

    /// First day of the series (`YYYY-MM-DD`).
    #[arg(long, default_value = "2019-01-01")]
    start: NaiveDate,

    #[arg(long, default_value_t = 60)]
    days: u32,

    /// Minutes between samples.
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..))]
    cadence: u32,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Seasonal baseline: drier winters, wet summer peak around day 200.
fn seasonal_tau(day_of_year: u32) -> f64 {
    let phase = 2.0 * PI * (day_of_year as f64 - 200.0) / 365.25;
    0.12 + 0.10 * (1.0 + phase.cos())
}

/// Afternoon convection bump, strongest around 15:00.
fn diurnal_factor(hour: f64) -> f64 {
    1.0 + 0.25 * (2.0 * PI * (hour - 15.0) / 24.0).cos()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
        mean + std_dev * z
    }
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run() {
        log::error!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    let mut rng = SimpleRng::new(args.seed);

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&args.output)
        .with_context(|| format!("failed to create {}", args.output.display()))?;

    let start = args
        .start
        .and_hms_opt(0, 0, 0)
        .context("invalid start date")?;
    let end = start + Duration::days(args.days.into());
    let cadence = Duration::minutes(args.cadence.into());

    let mut t = start;
    let mut rows = 0usize;
    while t < end {
        let hour = t.hour() as f64 + t.minute() as f64 / 60.0;
        let mean = seasonal_tau(t.ordinal()) * diurnal_factor(hour);
        // Multiplicative noise keeps tau positive and right-skewed.
        let tau = mean * rng.gauss(0.0, 0.3).exp();

        writer.write_record([
            t.format("%Y-%m-%d").to_string(),
            t.format("%H:%M:%S").to_string(),
            format!("{tau:.4}"),
        ])?;
        rows += 1;
        t += cadence;
    }
    writer.flush()?;

    log::info!(
        "wrote {rows} samples ({} days, every {} min) to {}",
        args.days,
        args.cadence,
        args.output.display()
    );
    Ok(())
}
