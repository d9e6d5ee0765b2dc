/// Data layer: core types, loading, and preprocessing.
///
/// Architecture:
/// ```text
///  .csv / .parquet / .json
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → MeasurementTable
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  wavelength range + z-score
///   └──────────┘
///        │
///        ▼
///   ┌──────────────────┐
///   │ SpectrumCurve /  │  validated curves handed to `analysis`
///   │ CurvePair        │
///   └──────────────────┘
/// ```
pub mod filter;
pub mod loader;
pub mod model;
