/// Data layer: core types, loading, and feature derivation.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Vec<RawRecord> (or Unavailable)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ features  │  family size, travelling alone, title
///   └──────────┘
///        │
///        ▼
///   ┌────────────────┐
///   │ EnrichedDataset │  read-only, shared by every plot request
///   └────────────────┘
/// ```

pub mod features;
pub mod loader;
pub mod model;
