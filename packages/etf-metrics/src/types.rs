//! Core data types for the ETF metrics engine.

use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Average days per calendar year, used for all date <-> year conversions.
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Elapsed time between two dates in fractional years.
pub fn years_between(start: NaiveDate, end: NaiveDate) -> f64 {
    (end - start).num_days() as f64 / DAYS_PER_YEAR
}

/// The date `years` before `date`, rounded to the nearest whole day.
pub fn years_before(date: NaiveDate, years: f64) -> NaiveDate {
    let days = (years * DAYS_PER_YEAR).round() as i64;
    chrono::Duration::try_days(days)
        .and_then(|span| date.checked_sub_signed(span))
        .unwrap_or(NaiveDate::MIN)
}

/// A single adjusted-close observation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PricePoint {
    /// Trading date
    pub date: NaiveDate,
    /// Adjusted close (dividends and splits folded in)
    pub close: f64,
}

impl PricePoint {
    /// Create a new price point.
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Ordered adjusted-close history for one ticker.
///
/// Points are strictly ascending by date and every close is finite and
/// positive. Calculators only ever borrow a series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "RawSeries", into = "RawSeries")]
pub struct PriceSeries {
    ticker: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series from points that are already sorted and deduplicated.
    ///
    /// Rejects unsorted input, duplicate dates and non-positive closes with
    /// [`Error::InvalidSeries`].
    pub fn new(ticker: &str, points: Vec<PricePoint>) -> Result<Self> {
        let ticker = ticker.to_uppercase();

        if let Some(bad) = points
            .iter()
            .find(|p| !p.close.is_finite() || p.close <= 0.0)
        {
            return Err(Error::InvalidSeries(format!(
                "{}: non-positive close {} on {}",
                ticker, bad.close, bad.date
            )));
        }

        if let Some(pair) = points.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(Error::InvalidSeries(format!(
                "{}: dates not strictly ascending at {} -> {}",
                ticker, pair[0].date, pair[1].date
            )));
        }

        Ok(Self { ticker, points })
    }

    /// Build a series from raw provider rows.
    ///
    /// Sorts by date, drops non-positive or non-finite closes and keeps the
    /// last value seen for a duplicated date.
    pub fn from_unsorted(ticker: &str, mut points: Vec<PricePoint>) -> Self {
        points.retain(|p| p.close.is_finite() && p.close > 0.0);
        // Stable sort keeps insertion order within a date, so the last one wins below.
        points.sort_by_key(|p| p.date);

        let mut deduped: Vec<PricePoint> = Vec::with_capacity(points.len());
        for point in points {
            match deduped.last_mut() {
                Some(last) if last.date == point.date => *last = point,
                _ => deduped.push(point),
            }
        }

        Self {
            ticker: ticker.to_uppercase(),
            points: deduped,
        }
    }

    /// Ticker symbol (uppercase).
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// All points in ascending date order.
    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    /// Length of the available history in years (0 for fewer than 2 points).
    pub fn history_years(&self) -> f64 {
        match (self.first(), self.last()) {
            (Some(first), Some(last)) => years_between(first.date, last.date),
            _ => 0.0,
        }
    }

    /// Index of the last point dated on or before `date`.
    pub fn index_at_or_before(&self, date: NaiveDate) -> Option<usize> {
        // partition_point gives the count of points with date <= target
        let count = self.points.partition_point(|p| p.date <= date);
        count.checked_sub(1)
    }

    /// Close at `date`, linearly interpolated by calendar days between the
    /// surrounding points. `None` outside the covered range.
    pub fn price_at(&self, date: NaiveDate) -> Option<f64> {
        let idx = self.index_at_or_before(date)?;
        let before = self.points[idx];
        if before.date == date {
            return Some(before.close);
        }

        let after = self.points.get(idx + 1)?;
        let span = (after.date - before.date).num_days() as f64;
        let offset = (date - before.date).num_days() as f64;
        Some(before.close + (after.close - before.close) * offset / span)
    }

    /// Sub-series of points dated on or after `start`.
    pub fn since(&self, start: NaiveDate) -> Self {
        let from = self.points.partition_point(|p| p.date < start);
        Self {
            ticker: self.ticker.clone(),
            points: self.points[from..].to_vec(),
        }
    }

    /// Periodic simple returns between consecutive points, keyed by the later date.
    pub fn simple_returns(&self) -> Vec<(NaiveDate, f64)> {
        self.points
            .windows(2)
            .map(|w| (w[1].date, w[1].close / w[0].close - 1.0))
            .collect()
    }
}

/// Serialized form of a series: `{ "ticker": "SPY", "prices": [["2020-01-03", 321.5], ...] }`.
#[derive(Serialize, Deserialize)]
struct RawSeries {
    ticker: String,
    prices: Vec<(NaiveDate, f64)>,
}

impl TryFrom<RawSeries> for PriceSeries {
    type Error = Error;

    fn try_from(raw: RawSeries) -> Result<Self> {
        let points = raw
            .prices
            .into_iter()
            .map(|(date, close)| PricePoint::new(date, close))
            .collect();
        PriceSeries::new(&raw.ticker, points)
    }
}

impl From<PriceSeries> for RawSeries {
    fn from(series: PriceSeries) -> Self {
        Self {
            ticker: series.ticker,
            prices: series.points.into_iter().map(|p| (p.date, p.close)).collect(),
        }
    }
}

/// Point-in-time descriptive fields for a fund.
///
/// These are passed through to the presentation layer untouched.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SummaryFields {
    /// Display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Assets under management in billions of dollars
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,
    /// Expense ratio percentage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expense_ratio: Option<f64>,
    /// Trailing dividend yield percentage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dividend_yield: Option<f64>,
    /// Average daily volume in shares
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_volume: Option<u64>,
    /// Number of holdings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holdings: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inception_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Tracked index
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// API response wrapper for success cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response.
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Shorthand for building a date in tests and fixtures.
#[cfg(test)]
pub(crate) fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(rows: &[(NaiveDate, f64)]) -> PriceSeries {
        let points = rows.iter().map(|&(d, c)| PricePoint::new(d, c)).collect();
        PriceSeries::new("spy", points).unwrap()
    }

    #[test]
    fn test_series_new_uppercases_ticker() {
        let s = series(&[(ymd(2020, 1, 1), 100.0), (ymd(2020, 1, 8), 101.0)]);
        assert_eq!(s.ticker(), "SPY");
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn test_series_new_rejects_unsorted() {
        let points = vec![
            PricePoint::new(ymd(2020, 1, 8), 101.0),
            PricePoint::new(ymd(2020, 1, 1), 100.0),
        ];
        let result = PriceSeries::new("SPY", points);
        assert!(matches!(result, Err(Error::InvalidSeries(_))));
    }

    #[test]
    fn test_series_new_rejects_duplicates_and_non_positive() {
        let dup = vec![
            PricePoint::new(ymd(2020, 1, 1), 100.0),
            PricePoint::new(ymd(2020, 1, 1), 101.0),
        ];
        assert!(PriceSeries::new("SPY", dup).is_err());

        let zero = vec![PricePoint::new(ymd(2020, 1, 1), 0.0)];
        assert!(PriceSeries::new("SPY", zero).is_err());
    }

    #[test]
    fn test_from_unsorted_normalizes() {
        let points = vec![
            PricePoint::new(ymd(2020, 1, 15), 103.0),
            PricePoint::new(ymd(2020, 1, 1), 100.0),
            PricePoint::new(ymd(2020, 1, 8), -1.0),
            PricePoint::new(ymd(2020, 1, 1), 99.0),
        ];
        let s = PriceSeries::from_unsorted("qqq", points);

        assert_eq!(s.len(), 2);
        assert_eq!(s.points()[0].close, 99.0); // later duplicate wins
        assert_eq!(s.points()[1].date, ymd(2020, 1, 15));
    }

    #[test]
    fn test_index_at_or_before() {
        let s = series(&[
            (ymd(2020, 1, 1), 100.0),
            (ymd(2020, 2, 1), 110.0),
            (ymd(2020, 3, 1), 120.0),
        ]);

        assert_eq!(s.index_at_or_before(ymd(2019, 12, 31)), None);
        assert_eq!(s.index_at_or_before(ymd(2020, 1, 1)), Some(0));
        assert_eq!(s.index_at_or_before(ymd(2020, 2, 15)), Some(1));
        assert_eq!(s.index_at_or_before(ymd(2021, 1, 1)), Some(2));
    }

    #[test]
    fn test_price_at_interpolates() {
        let s = series(&[(ymd(2020, 1, 1), 100.0), (ymd(2020, 1, 11), 110.0)]);

        assert_eq!(s.price_at(ymd(2020, 1, 1)), Some(100.0));
        assert!((s.price_at(ymd(2020, 1, 6)).unwrap() - 105.0).abs() < 1e-9);
        assert_eq!(s.price_at(ymd(2020, 1, 11)), Some(110.0));
        assert_eq!(s.price_at(ymd(2020, 1, 12)), None);
        assert_eq!(s.price_at(ymd(2019, 12, 31)), None);
    }

    #[test]
    fn test_years_helpers() {
        assert!((years_between(ymd(2015, 1, 1), ymd(2025, 1, 1)) - 10.0).abs() < 0.01);
        assert_eq!(years_before(ymd(2025, 1, 1), 10.0), ymd(2015, 1, 1));
        assert_eq!(years_before(ymd(2025, 1, 1), 1e15), NaiveDate::MIN);
    }

    #[test]
    fn test_series_json_shape() {
        let s = series(&[(ymd(2020, 1, 1), 100.0), (ymd(2020, 1, 8), 101.5)]);
        let json = serde_json::to_value(&s).unwrap();

        assert_eq!(json["ticker"], "SPY");
        assert_eq!(json["prices"][1][0], "2020-01-08");
        assert_eq!(json["prices"][1][1], 101.5);

        let back: PriceSeries = serde_json::from_value(json).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn test_summary_fields_camel_case() {
        let fields = SummaryFields {
            market_cap: Some(512.3),
            expense_ratio: Some(0.0945),
            ..Default::default()
        };
        let json = serde_json::to_value(&fields).unwrap();
        assert_eq!(json["marketCap"], 512.3);
        assert!(json.get("issuer").is_none());
    }

    #[test]
    fn test_api_response() {
        let response: ApiResponse<String> = ApiResponse::ok("test".to_string());
        assert!(response.ok);
        assert_eq!(response.data, Some("test".to_string()));

        let err_response: ApiResponse<String> = ApiResponse::err("error");
        assert!(!err_response.ok);
        assert_eq!(err_response.error, Some("error".to_string()));
    }
}
