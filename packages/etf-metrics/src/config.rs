//! Dashboard configuration.
//!
//! Read from TOML; every key is optional and falls back to the defaults below.
//!
//! ```toml
//! risk_free_rate_pct = 4.5
//! return_windows_years = [5, 10, 20]
//! since_date = "1990-01-01"
//!
//! [drawdown]
//! min_depth_pct = 5.0
//! min_trough_separation_years = 2
//! ```

use crate::analytics::DrawdownFilter;
use crate::growth::GrowthOptions;
use crate::{Error, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the risk-free rate, in percent.
pub const RISK_FREE_RATE_ENV: &str = "ETF_METRICS_RISK_FREE_RATE";

/// Longest accepted cache ttl, in days.
pub const MAX_CACHE_TTL_DAYS: i64 = 36_500;

/// Settings for the metrics dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetricsConfig {
    /// Annual risk-free rate used by Sharpe ratios, in percent
    pub risk_free_rate_pct: f64,
    /// Lookback windows reported for every ticker
    pub return_windows_years: Vec<u32>,
    /// Anchor of the fixed-date return column
    pub since_date: NaiveDate,
    /// Window whose annualized return feeds the Sharpe ratio
    pub sharpe_window_years: u32,
    /// Only use this many trailing years for volatility; full history when unset
    pub volatility_lookback_years: Option<f64>,
    /// Which drawdowns make it onto the dashboard
    pub drawdown: DrawdownFilter,
    pub growth: GrowthOptions,
    /// Stored prices older than this are reported as stale
    pub cache_ttl_days: i64,
    /// Number of leading tickers blended into the equal-weight portfolio
    pub portfolio_size: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            risk_free_rate_pct: 4.0,
            return_windows_years: vec![5, 10, 15, 20, 25],
            since_date: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap_or_default(),
            sharpe_window_years: 10,
            volatility_lookback_years: None,
            drawdown: DrawdownFilter {
                min_depth_pct: 5.0,
                min_trough_separation_years: 2,
            },
            growth: GrowthOptions::default(),
            cache_ttl_days: crate::provider::DEFAULT_CACHE_TTL_DAYS,
            portfolio_size: 7,
        }
    }
}

impl MetricsConfig {
    /// Get the default config file path.
    ///
    /// `ETF_METRICS_CONFIG` if set, otherwise `<config dir>/etf-metrics/config.toml`.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = env::var("ETF_METRICS_CONFIG") {
            return PathBuf::from(path);
        }

        directories::BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("etf-metrics/config.toml"))
            .unwrap_or_else(|| PathBuf::from("etf-metrics.toml"))
    }

    /// Load from the default path and apply environment overrides.
    ///
    /// A file that cannot be read or parsed is logged and replaced by defaults.
    pub fn load() -> Self {
        let path = Self::default_path();
        let mut config = match Self::load_from_path(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unusable config file");
                Self::default()
            }
        };
        config.apply_risk_free_override(env::var(RISK_FREE_RATE_ENV).ok().as_deref());
        config
    }

    /// Load from a specific path. A missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the calculators cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !self.risk_free_rate_pct.is_finite() {
            return Err(Error::InvalidInput(
                "risk_free_rate_pct must be a finite number".to_string(),
            ));
        }
        if self.return_windows_years.is_empty() || self.return_windows_years.contains(&0) {
            return Err(Error::InvalidInput(
                "return_windows_years must list at least one positive window".to_string(),
            ));
        }
        if self.sharpe_window_years == 0 {
            return Err(Error::InvalidInput(
                "sharpe_window_years must be positive".to_string(),
            ));
        }
        if let Some(years) = self.volatility_lookback_years {
            if !(years.is_finite() && years > 0.0) {
                return Err(Error::InvalidInput(format!(
                    "volatility_lookback_years must be positive, got {}",
                    years
                )));
            }
        }
        if !(1..=MAX_CACHE_TTL_DAYS).contains(&self.cache_ttl_days) {
            return Err(Error::InvalidInput(format!(
                "cache_ttl_days must be between 1 and {}, got {}",
                MAX_CACHE_TTL_DAYS, self.cache_ttl_days
            )));
        }
        if self.portfolio_size == 0 {
            return Err(Error::InvalidInput(
                "portfolio_size must be at least 1".to_string(),
            ));
        }
        if !(self.growth.base_value.is_finite() && self.growth.base_value > 0.0) {
            return Err(Error::InvalidInput(
                "growth.base_value must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Cache freshness window.
    pub fn cache_ttl(&self) -> Duration {
        Duration::try_days(self.cache_ttl_days.clamp(1, MAX_CACHE_TTL_DAYS))
            .unwrap_or_else(|| Duration::days(crate::provider::DEFAULT_CACHE_TTL_DAYS))
    }

    fn apply_risk_free_override(&mut self, value: Option<&str>) {
        let Some(raw) = value else {
            return;
        };
        match raw.trim().parse::<f64>() {
            Ok(rate) if rate.is_finite() => self.risk_free_rate_pct = rate,
            _ => tracing::warn!(value = raw, "ignoring invalid {}", RISK_FREE_RATE_ENV),
        }
    }
}
