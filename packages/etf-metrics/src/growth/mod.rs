//! Growth-of-$10K charts.
//!
//! [`aligner`] turns price histories into comparable trajectories; [`blend`]
//! synthesizes the equal-weight portfolio so it can be charted next to real
//! funds.

mod aligner;
mod blend;

pub use aligner::{
    build_growth_trajectories, build_growth_trajectories_with, GrowthOptions, GrowthPoint,
    GrowthSpan, GrowthTrajectories, GrowthTrajectory, DEFAULT_BASE_VALUE,
};
pub use blend::{blend_equal_weight, parse_portfolio_ticker, portfolio_ticker};

use crate::provider::PriceSeriesProvider;
use crate::types::PriceSeries;
use crate::{Error, Result};

/// Most tickers a single growth chart accepts.
pub const MAX_GROWTH_TICKERS: usize = 5;

/// Build trajectories for `tickers`, fetched from `provider`, in request order.
///
/// A `PORT-<n>` ticker is blended from the first `n` entries of `portfolio`.
///
/// # Errors
///
/// - [`Error::InvalidInput`] for an empty or oversized request, a repeated
///   ticker, or a portfolio larger than `portfolio`
/// - [`Error::UnknownTicker`] from the provider
/// - any error of [`build_growth_trajectories_with`]
pub fn build_growth_for_tickers<P>(
    provider: &P,
    tickers: &[String],
    span: GrowthSpan,
    options: &GrowthOptions,
    portfolio: &[String],
) -> Result<GrowthTrajectories>
where
    P: PriceSeriesProvider + ?Sized,
{
    if tickers.is_empty() || tickers.len() > MAX_GROWTH_TICKERS {
        return Err(Error::InvalidInput(format!(
            "a growth chart takes 1 to {} tickers, got {}",
            MAX_GROWTH_TICKERS,
            tickers.len()
        )));
    }

    let mut series: Vec<PriceSeries> = Vec::with_capacity(tickers.len());
    for ticker in tickers {
        let ticker = ticker.trim().to_uppercase();
        if series.iter().any(|s| s.ticker() == ticker) {
            return Err(Error::InvalidInput(format!("{} requested twice", ticker)));
        }

        let s = match parse_portfolio_ticker(&ticker) {
            Some(n) => blend_from_provider(provider, n, portfolio)?,
            None => provider.price_series(&ticker)?,
        };
        series.push(s);
    }

    let refs: Vec<&PriceSeries> = series.iter().collect();
    build_growth_trajectories_with(&refs, span, options)
}

/// Blend the first `n` tickers of `portfolio` into a `PORT-<n>` series.
pub fn blend_from_provider<P>(provider: &P, n: usize, portfolio: &[String]) -> Result<PriceSeries>
where
    P: PriceSeriesProvider + ?Sized,
{
    if n > portfolio.len() {
        return Err(Error::InvalidInput(format!(
            "{} needs {} constituents but only {} are available",
            portfolio_ticker(n),
            n,
            portfolio.len()
        )));
    }

    let constituents = portfolio[..n]
        .iter()
        .map(|t| provider.price_series(t))
        .collect::<Result<Vec<_>>>()?;
    let refs: Vec<&PriceSeries> = constituents.iter().collect();
    blend_equal_weight(&portfolio_ticker(n), &refs)
}
