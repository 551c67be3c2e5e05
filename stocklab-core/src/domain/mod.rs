//! Domain types: price bars and series.

pub mod bar;
pub mod series;

pub use bar::{EnrichedBar, PriceBar};
pub use series::{EnrichedSeries, PriceSeries};
