use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, ValueEnum};
use serde::Serialize;

use tau_stats::{
    aggregate, filter, load_file, BoxPlotFeed, LoadOptions, QuartileLines, StatsTable, WindowSpec,
};

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Headerless `date,time,tau` file.
    #[arg(long)]
    file: PathBuf,

    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// Keep samples after this instant (`YYYY-MM-DD[ HH:MM[:SS]]`).
    #[arg(long, value_parser = parse_datetime)]
    from: Option<NaiveDateTime>,

    /// Keep samples before this instant.
    #[arg(long, value_parser = parse_datetime)]
    to: Option<NaiveDateTime>,

    /// Predicate query, e.g. `-yr 2020 -mn 1 -hr 7,8,9`.
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    filter: String,

    /// Aggregation request, e.g. `-mn 1`.
    #[arg(long, default_value = "-mn 1", allow_hyphen_values = true)]
    group: String,

    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Serialize)]
struct Report<'a> {
    group: String,
    table: &'a StatsTable,
    boxplot: Option<BoxPlotFeed>,
    quartiles: Option<QuartileLines>,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = Cli::parse();
    log::debug!("{args:#?}");

    if !args.delimiter.is_ascii() {
        bail!("delimiter must be a single ASCII character, got {:?}", args.delimiter);
    }
    let options = LoadOptions {
        delimiter: args.delimiter as u8,
    };
    let spec = WindowSpec::parse(&args.group).context("invalid --group")?;

    let series = load_file(&args.file, &options)
        .with_context(|| format!("failed to load {}", args.file.display()))?;

    let range = match (args.from, args.to) {
        (None, None) => series.all(),
        (from, to) => series
            .select_range(
                from.unwrap_or(NaiveDateTime::MIN),
                to.unwrap_or(NaiveDateTime::MAX),
            )
            .context("invalid --from/--to")?,
    };
    let selection = filter(&range, &args.filter);
    log::info!("{} samples selected", selection.len());

    let table = aggregate(&selection, &spec).with_context(|| format!("failed to aggregate {spec}"))?;
    log::info!("{} buckets", table.len());

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match args.format {
        Format::Text => write_text(&mut out, &table)?,
        Format::Json => {
            let report = Report {
                group: spec.to_string(),
                table: &table,
                boxplot: BoxPlotFeed::from_table(&table),
                quartiles: QuartileLines::from_table(&table),
            };
            serde_json::to_writer_pretty(&mut out, &report).context("writing JSON report")?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn parse_datetime(text: &str) -> std::result::Result<NaiveDateTime, String> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| format!("cannot read {text:?} as a date or date-time"))
}

fn write_text<W: Write>(out: &mut W, table: &StatsTable) -> Result<()> {
    writeln!(
        out,
        "{:<19}  {:>6}  {:>8}  {:>8}  {:>8}  {:>8}  {:>8}  {:>8}  {:>8}",
        "start", "count", "mean", "std", "min", "q1", "median", "q3", "max"
    )?;
    for bucket in table {
        let s = &bucket.stat;
        writeln!(
            out,
            "{:<19}  {:>6}  {:>8.4}  {:>8.4}  {:>8.4}  {:>8.4}  {:>8.4}  {:>8.4}  {:>8.4}",
            bucket.start.format("%Y-%m-%d %H:%M:%S").to_string(),
            s.count,
            s.mean,
            s.std,
            s.min,
            s.q1,
            s.median,
            s.q3,
            s.max
        )?;
    }
    Ok(())
}
