//! Price history and fund metadata sources.
//!
//! The analytics only need two things per ticker: an adjusted-close series and
//! a bag of descriptive fields. Anything that can hand those over implements
//! [`PriceSeriesProvider`]; [`PriceStore`] is the JSON-file backed one.

mod store;

pub use store::{PriceStore, StoreData, DEFAULT_CACHE_TTL_DAYS};

use crate::types::{PriceSeries, SummaryFields};
use crate::Result;

/// Source of price histories and summary fields.
pub trait PriceSeriesProvider {
    /// Tickers this provider has data for, in display order.
    fn tickers(&self) -> Vec<String>;

    /// Ascending, deduplicated adjusted-close history for `ticker`.
    fn price_series(&self, ticker: &str) -> Result<PriceSeries>;

    /// Pass-through descriptive fields for `ticker`.
    fn summary_fields(&self, ticker: &str) -> Result<SummaryFields>;
}
