/// Data layer: opacity series, selection, filtering and windowed statistics.
///
/// Architecture:
/// ```text
///  date,time,tau CSV
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → TimeSeries
///   └──────────┘
///        │
///        ▼
///   ┌────────────┐
///   │ TimeSeries  │  Vec<Sample>, cached bounds → Selection
///   └────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  query predicates → narrowed Selection
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  window   │  calendar buckets → StatsTable (stats)
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod filter;
pub mod stats;
pub mod window;
