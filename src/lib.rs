//! Filtering and calendar-window statistics for atmospheric opacity (tau)
//! series.
//!
//! ```text
//! load_file → TimeSeries → select_range / filter → aggregate → StatsTable → plot feed
//! ```

pub mod data;
pub mod error;
pub mod plot;

pub use data::filter::{filter, Flag, PredicateSet, Rejected};
pub use data::loader::{load_file, load_reader, LoadOptions};
pub use data::model::{Clamped, Sample, Selection, TimeSeries};
pub use data::stats::{Bucket, StatRecord, StatsTable};
pub use data::window::{aggregate, aggregate_str, Granularity, WindowSpec};
pub use error::{Error, LoadError, Result};
pub use plot::{BoxPlotFeed, BoxStats, QuartileLines};
