//! Windowed return calculations.
//!
//! Every lookback column (5Y, 10Y, ..., since inception, since 1990) is the same
//! computation anchored at a different start point.

use crate::types::{years_before, years_between, PricePoint, PriceSeries};
use crate::{Error, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Return over a lookback window ending at the series' last point.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReturnWindowResult {
    /// Lookback that was asked for
    pub requested_years: f64,
    /// Actual elapsed years between the located start point and the end point.
    /// When the window is unavailable this is the length of the available history.
    pub years: f64,
    /// Date of the located start point
    pub start_date: Option<NaiveDate>,
    /// Date of the series' last point
    pub end_date: NaiveDate,
    /// Constant yearly compounding rate reproducing the window's total return
    pub annualized_return_pct: Option<f64>,
    /// Total percentage change over the window
    pub cumulative_return_pct: Option<f64>,
}

impl ReturnWindowResult {
    /// Whether the series covered the requested window.
    pub fn is_available(&self) -> bool {
        self.annualized_return_pct.is_some()
    }

    fn absent(series: &PriceSeries, requested_years: f64, end_date: NaiveDate) -> Self {
        Self {
            requested_years,
            years: series.history_years(),
            start_date: None,
            end_date,
            annualized_return_pct: None,
            cumulative_return_pct: None,
        }
    }
}

/// Short-horizon returns shown next to the long windows.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TrailingReturns {
    /// Simple return since the last close of the prior calendar year
    pub ytd_pct: Option<f64>,
    /// Simple 1-year return
    pub one_year_pct: Option<f64>,
    /// Annualized 3-year return
    pub three_year_pct: Option<f64>,
}

/// Annualized return in percent for a move from `start_price` to `end_price` over `years`.
pub fn annualized_return(start_price: f64, end_price: f64, years: f64) -> f64 {
    ((end_price / start_price).powf(1.0 / years) - 1.0) * 100.0
}

/// Convert an annualized return (%) to the cumulative return (%) it compounds to over `years`.
///
/// 10% annualized over 10 years gives ((1.10)^10 - 1) * 100 ≈ 159.37%.
pub fn cumulative_from_annualized(annualized_pct: f64, years: f64) -> f64 {
    ((1.0 + annualized_pct / 100.0).powf(years) - 1.0) * 100.0
}

/// Compute the annualized and cumulative return over the trailing `years`.
///
/// The start point is the one dated at or nearest before `last_date - years`.
/// Annualization uses the actual elapsed time between the located start and
/// the last point, not the nominal `years`.
///
/// # Errors
///
/// - [`Error::InsufficientHistory`] if the series has fewer than 2 points
/// - [`Error::InvalidInput`] if `years` is not a positive finite number
///
/// A window longer than the available history is not an error: the result
/// comes back with both percentages set to `None`.
///
/// # Example
///
/// ```rust
/// use chrono::NaiveDate;
/// use etf_metrics::analytics::compute_window_return;
/// use etf_metrics::{PricePoint, PriceSeries};
///
/// let series = PriceSeries::new("AAA", vec![
///     PricePoint::new(NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(), 100.0),
///     PricePoint::new(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), 150.0),
/// ]).unwrap();
///
/// let result = compute_window_return(&series, 10.0).unwrap();
/// assert!((result.annualized_return_pct.unwrap() - 4.14).abs() < 0.01);
/// assert!((result.cumulative_return_pct.unwrap() - 50.0).abs() < 1e-9);
/// ```
pub fn compute_window_return(series: &PriceSeries, years: f64) -> Result<ReturnWindowResult> {
    if !years.is_finite() || years <= 0.0 {
        return Err(Error::InvalidInput(format!(
            "lookback must be a positive number of years, got {}",
            years
        )));
    }

    let last = require_history(series)?;
    let target = years_before(last.date, years);

    let result = match series.index_at_or_before(target) {
        Some(idx) => window_from(series, idx, years),
        None => ReturnWindowResult::absent(series, years, last.date),
    };

    tracing::debug!(
        ticker = series.ticker(),
        years,
        annualized = ?result.annualized_return_pct,
        "window return"
    );

    Ok(result)
}

/// Annualized return over the full available history.
pub fn compute_since_inception_return(series: &PriceSeries) -> Result<ReturnWindowResult> {
    require_history(series)?;
    Ok(window_from(series, 0, series.history_years()))
}

/// Annualized return from the point at or nearest before `since`.
///
/// Absent when the series starts after `since`.
pub fn compute_since_date_return(
    series: &PriceSeries,
    since: NaiveDate,
) -> Result<ReturnWindowResult> {
    let last = require_history(series)?;
    let requested = years_between(since, last.date);

    Ok(match series.index_at_or_before(since) {
        Some(idx) => window_from(series, idx, requested),
        None => ReturnWindowResult::absent(series, requested, last.date),
    })
}

/// YTD, 1-year and 3-year returns.
pub fn compute_trailing_returns(series: &PriceSeries) -> Result<TrailingReturns> {
    let last = *require_history(series)?;

    let ytd_pct = NaiveDate::from_ymd_opt(last.date.year() - 1, 12, 31)
        .and_then(|prior_year_end| series.index_at_or_before(prior_year_end))
        .map(|idx| (last.close / series.points()[idx].close - 1.0) * 100.0);

    Ok(TrailingReturns {
        ytd_pct,
        one_year_pct: compute_window_return(series, 1.0)?.cumulative_return_pct,
        three_year_pct: compute_window_return(series, 3.0)?.annualized_return_pct,
    })
}

fn require_history(series: &PriceSeries) -> Result<&PricePoint> {
    match series.last() {
        Some(last) if series.len() >= 2 => Ok(last),
        _ => Err(Error::InsufficientHistory {
            ticker: series.ticker().to_string(),
            points: series.len(),
        }),
    }
}

fn window_from(series: &PriceSeries, start_idx: usize, requested_years: f64) -> ReturnWindowResult {
    let points = series.points();
    let start = points[start_idx];
    let end = points[points.len() - 1];
    let years = years_between(start.date, end.date);

    // Start landed on the final point: no elapsed time to annualize over.
    if years <= 0.0 {
        return ReturnWindowResult::absent(series, requested_years, end.date);
    }

    ReturnWindowResult {
        requested_years,
        years,
        start_date: Some(start.date),
        end_date: end.date,
        annualized_return_pct: Some(annualized_return(start.close, end.close, years)),
        cumulative_return_pct: Some((end.close / start.close - 1.0) * 100.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ymd;
    use approx::assert_relative_eq;

    fn series(rows: &[(NaiveDate, f64)]) -> PriceSeries {
        let points = rows.iter().map(|&(d, c)| PricePoint::new(d, c)).collect();
        PriceSeries::new("TEST", points).unwrap()
    }

    // Weekly series with a gentle drift and some noise
    fn weekly_series(start: NaiveDate, weeks: usize) -> PriceSeries {
        let points = (0..weeks)
            .map(|i| {
                let t = i as f64;
                let close = 100.0 * (1.0 + 0.0015 * t) + 3.0 * (t / 5.0).sin();
                PricePoint::new(start + chrono::Duration::weeks(i as i64), close)
            })
            .collect();
        PriceSeries::new("WEEKLY", points).unwrap()
    }

    #[test]
    fn test_ten_year_example() {
        let aaa = series(&[(ymd(2015, 1, 1), 100.0), (ymd(2025, 1, 1), 150.0)]);
        let result = compute_window_return(&aaa, 10.0).unwrap();

        // 1.5^(1/10) - 1 ≈ 4.14%
        assert!((result.annualized_return_pct.unwrap() - 4.14).abs() < 0.01);
        assert_relative_eq!(result.cumulative_return_pct.unwrap(), 50.0, epsilon = 1e-9);
        assert_eq!(result.start_date, Some(ymd(2015, 1, 1)));
        assert_eq!(result.end_date, ymd(2025, 1, 1));
    }

    #[test]
    fn test_window_exceeds_history_is_absent() {
        let s = series(&[(ymd(2018, 1, 1), 100.0), (ymd(2025, 1, 1), 150.0)]);
        let result = compute_window_return(&s, 10.0).unwrap();

        assert!(!result.is_available());
        assert!(result.annualized_return_pct.is_none());
        assert!(result.cumulative_return_pct.is_none());
        assert!((result.years - 7.0).abs() < 0.01);
    }

    #[test]
    fn test_huge_window_is_absent() {
        let s = series(&[(ymd(2015, 1, 1), 100.0), (ymd(2025, 1, 1), 150.0)]);
        let result = compute_window_return(&s, 1e15).unwrap();

        assert!(!result.is_available());
        assert!(result.annualized_return_pct.is_none());
        assert!(result.cumulative_return_pct.is_none());
    }

    #[test]
    fn test_insufficient_history_is_error() {
        let s = series(&[(ymd(2025, 1, 1), 150.0)]);
        let result = compute_window_return(&s, 1.0);
        assert!(matches!(
            result,
            Err(Error::InsufficientHistory { points: 1, .. })
        ));
    }

    #[test]
    fn test_invalid_years() {
        let s = series(&[(ymd(2015, 1, 1), 100.0), (ymd(2025, 1, 1), 150.0)]);
        assert!(matches!(
            compute_window_return(&s, 0.0),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            compute_window_return(&s, f64::NAN),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_nearest_before_and_actual_years() {
        // 1Y target lands on 2024-01-02; the nearest earlier point is 2023-12-15
        let s = series(&[
            (ymd(2023, 6, 1), 80.0),
            (ymd(2023, 12, 15), 100.0),
            (ymd(2024, 1, 10), 101.0),
            (ymd(2025, 1, 1), 110.0),
        ]);
        let result = compute_window_return(&s, 1.0).unwrap();

        assert_eq!(result.start_date, Some(ymd(2023, 12, 15)));
        let expected_years = years_between(ymd(2023, 12, 15), ymd(2025, 1, 1));
        assert_relative_eq!(result.years, expected_years);
        assert_relative_eq!(
            result.annualized_return_pct.unwrap(),
            (1.1_f64.powf(1.0 / expected_years) - 1.0) * 100.0,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_compounding_identity() {
        let s = weekly_series(ymd(2000, 1, 7), 52 * 24);

        for years in [1.0, 3.0, 5.0, 10.0, 15.0, 20.0] {
            let result = compute_window_return(&s, years).unwrap();
            let annualized = result.annualized_return_pct.unwrap();
            let cumulative = result.cumulative_return_pct.unwrap();

            assert_relative_eq!(
                cumulative_from_annualized(annualized, result.years),
                cumulative,
                max_relative = 1e-6
            );
        }
    }

    #[test]
    fn test_flat_series_is_zero_not_absent() {
        let s = series(&[(ymd(2015, 1, 1), 100.0), (ymd(2025, 1, 1), 100.0)]);
        let result = compute_window_return(&s, 10.0).unwrap();

        assert_eq!(result.annualized_return_pct, Some(0.0));
        assert_eq!(result.cumulative_return_pct, Some(0.0));
    }

    #[test]
    fn test_since_inception() {
        let s = series(&[
            (ymd(2005, 1, 1), 50.0),
            (ymd(2015, 1, 1), 100.0),
            (ymd(2025, 1, 1), 200.0),
        ]);
        let result = compute_since_inception_return(&s).unwrap();

        assert_eq!(result.start_date, Some(ymd(2005, 1, 1)));
        assert_relative_eq!(result.cumulative_return_pct.unwrap(), 300.0, epsilon = 1e-9);
        // 4x over ~20 years ≈ 7.18%/yr
        assert!((result.annualized_return_pct.unwrap() - 7.18).abs() < 0.02);
    }

    #[test]
    fn test_since_date() {
        let s = series(&[
            (ymd(1989, 6, 1), 50.0),
            (ymd(1989, 12, 29), 55.0),
            (ymd(1990, 1, 5), 56.0),
            (ymd(2025, 1, 3), 550.0),
        ]);
        let result = compute_since_date_return(&s, ymd(1990, 1, 1)).unwrap();
        assert_eq!(result.start_date, Some(ymd(1989, 12, 29)));
        assert_relative_eq!(result.cumulative_return_pct.unwrap(), 900.0, epsilon = 1e-9);

        let late = series(&[(ymd(1993, 1, 29), 44.0), (ymd(2025, 1, 3), 590.0)]);
        let absent = compute_since_date_return(&late, ymd(1990, 1, 1)).unwrap();
        assert!(!absent.is_available());
    }

    #[test]
    fn test_trailing_returns() {
        let s = series(&[
            (ymd(2021, 12, 31), 80.0),
            (ymd(2023, 12, 29), 100.0),
            (ymd(2024, 1, 5), 102.0),
            (ymd(2024, 6, 28), 105.0),
            (ymd(2024, 12, 31), 108.0),
            (ymd(2025, 3, 31), 110.0),
        ]);
        let trailing = compute_trailing_returns(&s).unwrap();

        // YTD measured from the 2024-12-31 close
        assert_relative_eq!(trailing.ytd_pct.unwrap(), (110.0 / 108.0 - 1.0) * 100.0);
        // 1Y target 2024-03-31 -> nearest before is 2024-01-05
        assert_relative_eq!(trailing.one_year_pct.unwrap(), (110.0 / 102.0 - 1.0) * 100.0);
        // 3Y target 2022-03-31 -> 2021-12-31
        assert!(trailing.three_year_pct.is_some());
    }

    #[test]
    fn test_trailing_returns_short_history() {
        let s = series(&[(ymd(2025, 1, 3), 100.0), (ymd(2025, 3, 28), 104.0)]);
        let trailing = compute_trailing_returns(&s).unwrap();

        assert!(trailing.ytd_pct.is_none());
        assert!(trailing.one_year_pct.is_none());
        assert!(trailing.three_year_pct.is_none());
    }

    #[test]
    fn test_cumulative_from_annualized() {
        assert!((cumulative_from_annualized(10.0, 10.0) - 159.37).abs() < 0.01);
        assert_eq!(cumulative_from_annualized(0.0, 40.0), 0.0);
    }
}
