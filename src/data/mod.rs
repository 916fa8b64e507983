/// Data layer: table model, loading, column filtering, and export.
///
/// Architecture:
/// ```text
///  .fits / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  first BINTABLE → Table (vector cells flattened)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  columns (i, j) by position, drop rows where y == 0
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  export   │  <stem>_filtered.txt + <stem>_filtered.fits
///   └──────────┘
/// ```

pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
