//! ETF Metrics - comparative performance analytics for exchange-traded funds.
//!
//! This crate turns adjusted-close price histories into the figures a fund
//! comparison dashboard shows:
//!
//! - **Returns**: annualized and cumulative returns over trailing windows,
//!   since inception and since a fixed date, plus YTD/1Y/3Y
//! - **Risk**: annualized volatility, Sharpe ratio and return correlations
//! - **Drawdowns**: the deepest peak-to-trough declines, tagged with the
//!   market event they belong to
//! - **Growth**: growth-of-$10,000 trajectories aligned to a common start date
//! - **Portfolio**: an equal-weight blend of the leading funds
//!
//! # Example
//!
//! ```rust,no_run
//! use etf_metrics::provider::PriceStore;
//! use etf_metrics::summary::Dashboard;
//! use etf_metrics::MetricsConfig;
//!
//! // Opens ~/.etf-metrics/prices.json (or $ETF_METRICS_STORE_FILE)
//! let store = PriceStore::new()?;
//! let config = MetricsConfig::load();
//!
//! let dashboard = Dashboard::build(&store, &config)?;
//! for row in &dashboard.rows {
//!     println!("{}: 10Y {:?}", row.ticker, row.annualized(10));
//! }
//! # Ok::<(), etf_metrics::Error>(())
//! ```

pub mod analytics;
pub mod config;
pub mod growth;
pub mod provider;
pub mod summary;
pub mod types;

// Re-export commonly used types
pub use config::MetricsConfig;
pub use types::{ApiResponse, PricePoint, PriceSeries, SummaryFields};

// Re-export main functionality
pub use analytics::{
    compute_since_inception_return, compute_window_return, find_top_drawdowns, DrawdownResult,
    ReturnWindowResult,
};
pub use growth::{build_growth_trajectories, GrowthSpan, GrowthTrajectories};
pub use provider::{PriceSeriesProvider, PriceStore};
pub use summary::{compute_all, Dashboard, EtfMetrics, PortfolioSummary};

/// Error types for etf-metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Insufficient history for {ticker}: {points} price point(s), need at least 2")]
    InsufficientHistory { ticker: String, points: usize },

    #[error("No overlapping history between {}", tickers.join(", "))]
    NoOverlappingHistory { tickers: Vec<String> },

    #[error("Invalid price series: {0}")]
    InvalidSeries(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown ticker: {0}")]
    UnknownTicker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type for etf-metrics operations.
pub type Result<T> = std::result::Result<T, Error>;
