//! Dashboard rows: per-fund metrics and the equal-weight portfolio estimate.

use crate::analytics::{
    annualized_std_dev, compute_since_date_return, compute_since_inception_return,
    compute_trailing_returns, compute_window_return, cumulative_from_annualized,
    find_top_drawdowns_filtered, sharpe_ratio, CorrelationMatrix, DrawdownResult, Frequency,
    ReturnWindowResult, TrailingReturns, MIN_CORRELATION_OVERLAP,
};
use crate::config::MetricsConfig;
use crate::growth::portfolio_ticker;
use crate::provider::PriceSeriesProvider;
use crate::types::{years_before, PriceSeries, SummaryFields};
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Horizon of the long-run cumulative projection column.
pub const PROJECTION_YEARS: f64 = 40.0;

/// Drawdowns shown per fund.
pub const DRAWDOWNS_PER_ROW: usize = 2;

/// A drawdown with the market event it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LabeledDrawdown {
    #[serde(flatten)]
    pub drawdown: DrawdownResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl From<DrawdownResult> for LabeledDrawdown {
    fn from(drawdown: DrawdownResult) -> Self {
        Self {
            label: drawdown.label().map(str::to_string),
            drawdown,
        }
    }
}

/// Everything the dashboard shows for one fund.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EtfMetrics {
    pub ticker: String,
    pub data_start: NaiveDate,
    pub data_end: NaiveDate,
    /// One entry per configured lookback, in configuration order
    pub windows: Vec<ReturnWindowResult>,
    pub since_inception: ReturnWindowResult,
    pub since_date: ReturnWindowResult,
    pub trailing: TrailingReturns,
    /// Deepest declines, deepest first
    pub drawdowns: Vec<LabeledDrawdown>,
    pub annualized_std_dev_pct: Option<f64>,
    pub sharpe_ratio: Option<f64>,
    /// Annualized return of the longest available window
    pub best_annualized_return_pct: Option<f64>,
    /// The best annualized return compounded over [`PROJECTION_YEARS`]
    pub projected_cumulative_pct: Option<f64>,
    #[serde(flatten)]
    pub fields: SummaryFields,
}

impl EtfMetrics {
    /// Compute a dashboard row from a price history.
    ///
    /// # Errors
    ///
    /// [`Error::InsufficientHistory`] if `series` has fewer than 2 points.
    pub fn compute(
        series: &PriceSeries,
        fields: SummaryFields,
        config: &MetricsConfig,
    ) -> Result<Self> {
        let (Some(first), Some(last)) = (series.first(), series.last()) else {
            return Err(Error::InsufficientHistory {
                ticker: series.ticker().to_string(),
                points: series.len(),
            });
        };

        let windows = config
            .return_windows_years
            .iter()
            .map(|&years| compute_window_return(series, f64::from(years)))
            .collect::<Result<Vec<_>>>()?;

        let vol_series = match config.volatility_lookback_years {
            Some(years) => Cow::Owned(series.since(years_before(last.date, years))),
            None => Cow::Borrowed(series),
        };
        let std_dev = Frequency::infer(&vol_series)
            .and_then(|frequency| annualized_std_dev(&vol_series, frequency));

        let sharpe_return = compute_window_return(series, f64::from(config.sharpe_window_years))?
            .annualized_return_pct;

        let best = windows
            .iter()
            .filter(|w| w.is_available())
            .max_by(|a, b| a.requested_years.total_cmp(&b.requested_years))
            .and_then(|w| w.annualized_return_pct);

        let drawdowns = find_top_drawdowns_filtered(series, DRAWDOWNS_PER_ROW, &config.drawdown)
            .into_iter()
            .map(LabeledDrawdown::from)
            .collect();

        Ok(Self {
            ticker: series.ticker().to_string(),
            data_start: first.date,
            data_end: last.date,
            since_inception: compute_since_inception_return(series)?,
            since_date: compute_since_date_return(series, config.since_date)?,
            trailing: compute_trailing_returns(series)?,
            windows,
            drawdowns,
            annualized_std_dev_pct: std_dev,
            sharpe_ratio: sharpe_ratio(sharpe_return, std_dev, config.risk_free_rate_pct),
            best_annualized_return_pct: best,
            projected_cumulative_pct: best
                .map(|pct| cumulative_from_annualized(pct, PROJECTION_YEARS)),
            fields,
        })
    }

    /// Result for a configured lookback, if it was computed.
    pub fn window(&self, years: u32) -> Option<&ReturnWindowResult> {
        self.windows
            .iter()
            .find(|w| w.requested_years == f64::from(years))
    }

    /// Annualized return for a configured lookback, if available.
    pub fn annualized(&self, years: u32) -> Option<f64> {
        self.window(years).and_then(|w| w.annualized_return_pct)
    }

    /// Depth of the deepest selected drawdown.
    pub fn max_drawdown_pct(&self) -> Option<f64> {
        self.drawdowns.first().map(|d| d.drawdown.depth_pct)
    }
}

/// Compute a row for every ticker the provider knows.
///
/// Tickers with fewer than 2 price points are logged and skipped; any other
/// failure aborts.
pub fn compute_all<P>(provider: &P, config: &MetricsConfig) -> Result<Vec<EtfMetrics>>
where
    P: PriceSeriesProvider + ?Sized,
{
    Ok(load_rows(provider, config)?
        .into_iter()
        .map(|(row, _)| row)
        .collect())
}

fn load_rows<P>(provider: &P, config: &MetricsConfig) -> Result<Vec<(EtfMetrics, PriceSeries)>>
where
    P: PriceSeriesProvider + ?Sized,
{
    let mut rows = Vec::new();
    for ticker in provider.tickers() {
        let series = provider.price_series(&ticker)?;
        let fields = provider.summary_fields(&ticker)?;
        match EtfMetrics::compute(&series, fields, config) {
            Ok(row) => rows.push((row, series)),
            Err(Error::InsufficientHistory { ticker, points }) => {
                tracing::warn!(%ticker, points, "skipping ticker with insufficient history");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(rows)
}

/// Averaged figures for an equal-weight portfolio of dashboard rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    /// `PORT-<n>`
    pub ticker: String,
    pub constituents: Vec<String>,
    /// Mean constituent return per configured lookback
    pub windows: Vec<PortfolioWindow>,
    pub since_inception_pct: Option<f64>,
    pub since_inception_years: Option<f64>,
    pub since_date_pct: Option<f64>,
    pub since_date_years: Option<f64>,
    pub ytd_pct: Option<f64>,
    pub one_year_pct: Option<f64>,
    pub three_year_pct: Option<f64>,
    /// Mean of the constituents' deepest drawdowns; the blend itself would fall less
    pub max_drawdown_pct: Option<f64>,
    pub expense_ratio: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub annualized_std_dev_pct: Option<f64>,
    pub sharpe_ratio: Option<f64>,
    pub projected_cumulative_pct: Option<f64>,
}

/// Averaged return for one lookback.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioWindow {
    pub requested_years: f64,
    pub annualized_return_pct: Option<f64>,
    pub cumulative_return_pct: Option<f64>,
}

impl PortfolioSummary {
    /// Blend `rows` with equal weights.
    ///
    /// Every average ignores constituents where the value is absent. Volatility
    /// is `sqrt(sum_ij rho_ij * s_i * s_j) / n` with correlations from `matrix`;
    /// if any constituent lacks a volatility it falls back to `mean(s) / sqrt(n)`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] when `rows` is empty.
    pub fn equal_weight(
        rows: &[EtfMetrics],
        matrix: &CorrelationMatrix,
        config: &MetricsConfig,
    ) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::InvalidInput(
                "a portfolio needs at least one constituent".to_string(),
            ));
        }

        let windows: Vec<PortfolioWindow> = config
            .return_windows_years
            .iter()
            .map(|&years| {
                let annualized = mean(rows.iter().map(|r| r.annualized(years)));
                PortfolioWindow {
                    requested_years: f64::from(years),
                    annualized_return_pct: annualized,
                    cumulative_return_pct: annualized
                        .map(|pct| cumulative_from_annualized(pct, f64::from(years))),
                }
            })
            .collect();

        let best = windows
            .iter()
            .filter(|w| w.annualized_return_pct.is_some())
            .max_by(|a, b| a.requested_years.total_cmp(&b.requested_years))
            .and_then(|w| w.annualized_return_pct);

        let std_dev = blended_std_dev(rows, matrix);
        let sharpe_return = mean(rows.iter().map(|r| r.annualized(config.sharpe_window_years)));

        Ok(Self {
            ticker: portfolio_ticker(rows.len()),
            constituents: rows.iter().map(|r| r.ticker.clone()).collect(),
            windows,
            since_inception_pct: mean(rows.iter().map(|r| r.since_inception.annualized_return_pct)),
            since_inception_years: mean(rows.iter().map(|r| Some(r.since_inception.years))),
            since_date_pct: mean(rows.iter().map(|r| r.since_date.annualized_return_pct)),
            since_date_years: mean(
                rows.iter()
                    .filter(|r| r.since_date.is_available())
                    .map(|r| Some(r.since_date.years)),
            ),
            ytd_pct: mean(rows.iter().map(|r| r.trailing.ytd_pct)),
            one_year_pct: mean(rows.iter().map(|r| r.trailing.one_year_pct)),
            three_year_pct: mean(rows.iter().map(|r| r.trailing.three_year_pct)),
            max_drawdown_pct: mean(rows.iter().map(EtfMetrics::max_drawdown_pct)),
            expense_ratio: mean(rows.iter().map(|r| r.fields.expense_ratio)),
            dividend_yield: mean(rows.iter().map(|r| r.fields.dividend_yield)),
            annualized_std_dev_pct: std_dev,
            sharpe_ratio: sharpe_ratio(sharpe_return, std_dev, config.risk_free_rate_pct),
            projected_cumulative_pct: best
                .map(|pct| cumulative_from_annualized(pct, PROJECTION_YEARS)),
        })
    }
}

fn blended_std_dev(rows: &[EtfMetrics], matrix: &CorrelationMatrix) -> Option<f64> {
    let n = rows.len() as f64;
    let stds: Option<Vec<f64>> = rows.iter().map(|r| r.annualized_std_dev_pct).collect();

    match stds {
        Some(stds) => {
            let mut variance = 0.0;
            for (a, sa) in rows.iter().zip(&stds) {
                for (b, sb) in rows.iter().zip(&stds) {
                    variance += matrix.get(&a.ticker, &b.ticker) * sa * sb;
                }
            }
            Some(variance.max(0.0).sqrt() / n)
        }
        None => mean(rows.iter().map(|r| r.annualized_std_dev_pct)).map(|avg| avg / n.sqrt()),
    }
}

fn mean(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, count) = values
        .flatten()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// The full comparison table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    /// Rows in provider order
    pub rows: Vec<EtfMetrics>,
    /// Equal-weight blend of the first `portfolio_size` rows
    pub portfolio: Option<PortfolioSummary>,
    pub correlations: CorrelationMatrix,
}

impl Dashboard {
    /// Compute every row and add the portfolio row.
    pub fn build<P>(provider: &P, config: &MetricsConfig) -> Result<Self>
    where
        P: PriceSeriesProvider + ?Sized,
    {
        let loaded = load_rows(provider, config)?;
        let series: Vec<&PriceSeries> = loaded.iter().map(|(_, s)| s).collect();
        let correlations = CorrelationMatrix::from_series(&series, MIN_CORRELATION_OVERLAP);

        let rows: Vec<EtfMetrics> = loaded.iter().map(|(row, _)| row.clone()).collect();

        let size = config.portfolio_size.min(rows.len());
        let portfolio = if size == 0 {
            None
        } else {
            Some(PortfolioSummary::equal_weight(&rows[..size], &correlations, config)?)
        };

        tracing::debug!(
            rows = rows.len(),
            portfolio = size,
            "built dashboard"
        );

        Ok(Self {
            rows,
            portfolio,
            correlations,
        })
    }

    /// Tickers of the rows blended into the portfolio.
    pub fn portfolio_tickers(&self) -> Vec<String> {
        self.portfolio
            .as_ref()
            .map(|p| p.constituents.clone())
            .unwrap_or_default()
    }
}
