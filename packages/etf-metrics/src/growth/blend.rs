//! Equal-weight blended portfolio series.

use crate::types::{PricePoint, PriceSeries};
use crate::{Error, Result};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Ticker used for an equal-weight blend of `n` constituents.
pub fn portfolio_ticker(n: usize) -> String {
    format!("PORT-{}", n)
}

/// Constituent count encoded in a `PORT-<n>` ticker, if `ticker` is one.
pub fn parse_portfolio_ticker(ticker: &str) -> Option<usize> {
    let (prefix, n) = ticker.trim().split_at_checked(5)?;
    if !prefix.eq_ignore_ascii_case("PORT-") {
        return None;
    }
    n.parse::<usize>().ok().filter(|&n| n > 0)
}

/// Build an equal-weight portfolio index from several constituents.
///
/// Every constituent is normalized to 1.0 on the latest first date among
/// them, and the index value on each date is the mean of those ratios. Only
/// dates every constituent has a price for are kept, so the result is
/// rebalanced back to equal weights at every observation.
///
/// # Errors
///
/// - [`Error::InvalidInput`] when `constituents` is empty
/// - [`Error::InsufficientHistory`] when a constituent has fewer than 2 points
/// - [`Error::NoOverlappingHistory`] when fewer than 2 shared dates remain
pub fn blend_equal_weight(ticker: &str, constituents: &[&PriceSeries]) -> Result<PriceSeries> {
    if constituents.is_empty() {
        return Err(Error::InvalidInput(format!(
            "{}: a blended portfolio needs at least one constituent",
            ticker
        )));
    }

    if let Some(short) = constituents.iter().find(|s| s.len() < 2) {
        return Err(Error::InsufficientHistory {
            ticker: short.ticker().to_string(),
            points: short.len(),
        });
    }

    let start = constituents
        .iter()
        .filter_map(|s| s.first().map(|p| p.date))
        .max()
        .unwrap_or(NaiveDate::MIN);

    // date -> (sum of ratios, constituents seen)
    let mut by_date: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for series in constituents {
        let trimmed = series.since(start);
        let Some(base) = trimmed.first().map(|p| p.close) else {
            continue;
        };
        for point in trimmed.points() {
            let entry = by_date.entry(point.date).or_insert((0.0, 0));
            entry.0 += point.close / base;
            entry.1 += 1;
        }
    }

    let n = constituents.len();
    let points: Vec<PricePoint> = by_date
        .into_iter()
        .filter(|&(_, (_, seen))| seen == n)
        .map(|(date, (sum, _))| PricePoint::new(date, sum / n as f64))
        .collect();

    if points.len() < 2 {
        return Err(Error::NoOverlappingHistory {
            tickers: constituents.iter().map(|s| s.ticker().to_string()).collect(),
        });
    }

    tracing::debug!(
        ticker,
        constituents = n,
        points = points.len(),
        %start,
        "blended portfolio series"
    );

    PriceSeries::new(ticker, points)
}
