// src/analysis/mod.rs
pub mod impact;
pub mod prices;

pub use impact::{ImpactAnalyzer, PriceImpact};
pub use prices::{PriceHistory, YahooPriceHistory};
