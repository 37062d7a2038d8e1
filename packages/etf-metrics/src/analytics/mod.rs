//! Numerical core: windowed returns, volatility, Sharpe and drawdowns.
//!
//! Everything in here is a pure function of a borrowed [`PriceSeries`](crate::PriceSeries)
//! and its parameters. Calling twice with the same inputs gives the same output.

mod drawdown;
mod returns;
mod risk;

pub use drawdown::{
    drawdown_label, find_top_drawdowns, find_top_drawdowns_filtered, DrawdownFilter,
    DrawdownResult,
};
pub use returns::{
    annualized_return, compute_since_date_return, compute_since_inception_return,
    compute_trailing_returns, compute_window_return, cumulative_from_annualized,
    ReturnWindowResult, TrailingReturns,
};
pub use risk::{
    annualized_std_dev, correlation, sharpe_ratio, CorrelationMatrix, Frequency,
    DEFAULT_CORRELATION, MIN_CORRELATION_OVERLAP,
};
