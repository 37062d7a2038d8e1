//! Volatility, Sharpe ratio and cross-asset correlation.

use crate::types::PriceSeries;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Correlation assumed for a pair with too little shared history.
pub const DEFAULT_CORRELATION: f64 = 0.5;

/// Minimum shared return observations before a correlation is trusted (~6 months of weeks).
pub const MIN_CORRELATION_OVERLAP: usize = 26;

/// Sampling frequency of a price series.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
}

impl Frequency {
    /// Observations per year used to annualize a periodic statistic.
    pub fn periods_per_year(self) -> f64 {
        match self {
            Frequency::Daily => 252.0,
            Frequency::Weekly => 52.0,
            Frequency::Monthly => 12.0,
            Frequency::Quarterly => 4.0,
        }
    }

    /// Guess the sampling frequency from the median gap between points.
    ///
    /// Returns `None` for series with fewer than 2 points.
    pub fn infer(series: &PriceSeries) -> Option<Self> {
        let mut gaps: Vec<i64> = series
            .points()
            .windows(2)
            .map(|w| (w[1].date - w[0].date).num_days())
            .collect();
        if gaps.is_empty() {
            return None;
        }

        gaps.sort_unstable();
        let median = gaps[gaps.len() / 2];

        Some(match median {
            ..=4 => Frequency::Daily,
            5..=10 => Frequency::Weekly,
            11..=45 => Frequency::Monthly,
            _ => Frequency::Quarterly,
        })
    }
}

/// Annualized standard deviation of periodic simple returns, in percent.
///
/// Uses the sample variance (n - 1) and scales by `sqrt(periods_per_year)`.
/// Returns `None` when the series yields fewer than 2 returns.
pub fn annualized_std_dev(series: &PriceSeries, frequency: Frequency) -> Option<f64> {
    let returns: Vec<f64> = series.simple_returns().into_iter().map(|(_, r)| r).collect();
    if returns.len() < 2 {
        return None;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);

    Some(variance.sqrt() * frequency.periods_per_year().sqrt() * 100.0)
}

/// Sharpe ratio from annualized figures, all in percent.
///
/// `(annualized_return_pct - risk_free_rate_pct) / std_dev_pct`.
/// Undefined (`None`) when either input is missing or the deviation is zero.
///
/// # Example
///
/// ```rust
/// use etf_metrics::analytics::sharpe_ratio;
///
/// let sharpe = sharpe_ratio(Some(8.0), Some(16.0), 4.0).unwrap();
/// assert!((sharpe - 0.25).abs() < 1e-12);
/// ```
pub fn sharpe_ratio(
    annualized_return_pct: Option<f64>,
    std_dev_pct: Option<f64>,
    risk_free_rate_pct: f64,
) -> Option<f64> {
    let ret = annualized_return_pct?;
    let std = std_dev_pct?;
    if std == 0.0 || !std.is_finite() {
        return None;
    }
    Some((ret - risk_free_rate_pct) / std)
}

/// Pearson correlation of two series' periodic returns over their shared dates.
///
/// `None` if fewer than `min_overlap` dates are shared or either side is flat.
pub fn correlation(a: &PriceSeries, b: &PriceSeries, min_overlap: usize) -> Option<f64> {
    let b_returns: HashMap<_, _> = b.simple_returns().into_iter().collect();
    let (r1, r2): (Vec<f64>, Vec<f64>) = a
        .simple_returns()
        .into_iter()
        .filter_map(|(date, ra)| b_returns.get(&date).map(|&rb| (ra, rb)))
        .unzip();

    if r1.len() < min_overlap.max(2) {
        return None;
    }

    let n = r1.len() as f64;
    let mean1 = r1.iter().sum::<f64>() / n;
    let mean2 = r2.iter().sum::<f64>() / n;

    let cov: f64 = r1
        .iter()
        .zip(&r2)
        .map(|(x, y)| (x - mean1) * (y - mean2))
        .sum();
    let std1 = r1.iter().map(|x| (x - mean1).powi(2)).sum::<f64>().sqrt();
    let std2 = r2.iter().map(|y| (y - mean2).powi(2)).sum::<f64>().sqrt();

    if std1 <= 0.0 || std2 <= 0.0 {
        return None;
    }
    Some(cov / (std1 * std2))
}

/// Pairwise return correlations keyed by ticker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    values: BTreeMap<String, BTreeMap<String, f64>>,
}

impl CorrelationMatrix {
    /// Create an empty matrix (every lookup falls back to the default).
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute correlations for every pair of series.
    ///
    /// Pairs without enough shared history are left unset.
    pub fn from_series(series: &[&PriceSeries], min_overlap: usize) -> Self {
        let mut matrix = Self::new();

        for (i, a) in series.iter().enumerate() {
            for b in &series[i + 1..] {
                match correlation(a, b, min_overlap) {
                    Some(rho) => matrix.set(a.ticker(), b.ticker(), rho),
                    None => tracing::debug!(
                        a = a.ticker(),
                        b = b.ticker(),
                        "not enough shared history for correlation"
                    ),
                }
            }
        }

        matrix
    }

    /// Record a correlation for a pair (stored symmetrically).
    pub fn set(&mut self, a: &str, b: &str, rho: f64) {
        let (a, b) = (a.to_uppercase(), b.to_uppercase());
        self.values
            .entry(a.clone())
            .or_default()
            .insert(b.clone(), rho);
        self.values.entry(b).or_default().insert(a, rho);
    }

    /// Correlation for a pair, if known.
    pub fn lookup(&self, a: &str, b: &str) -> Option<f64> {
        let (a, b) = (a.to_uppercase(), b.to_uppercase());
        if a == b {
            return Some(1.0);
        }
        self.values.get(&a).and_then(|row| row.get(&b)).copied()
    }

    /// Correlation for a pair, falling back to [`DEFAULT_CORRELATION`].
    pub fn get(&self, a: &str, b: &str) -> f64 {
        self.lookup(a, b).unwrap_or(DEFAULT_CORRELATION)
    }
}
