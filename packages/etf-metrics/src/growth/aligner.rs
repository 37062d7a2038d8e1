//! Growth-of-$10,000 trajectories aligned to a common start date.

use crate::types::{years_before, years_between, PriceSeries};
use crate::{Error, Result};
use chrono::{Datelike, NaiveDate};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Starting value of every trajectory unless configured otherwise.
pub const DEFAULT_BASE_VALUE: f64 = 10_000.0;

/// How far back a growth chart reaches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GrowthSpan {
    /// Trailing number of years, measured back from the common end date
    Years(f64),
    /// The widest window every ticker covers
    Max,
}

impl FromStr for GrowthSpan {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("max") {
            return Ok(GrowthSpan::Max);
        }
        match s.parse::<f64>() {
            Ok(years) if years.is_finite() && years > 0.0 => Ok(GrowthSpan::Years(years)),
            _ => Err(Error::InvalidInput(format!(
                "growth span must be a positive number of years or 'max', got '{}'",
                s
            ))),
        }
    }
}

impl fmt::Display for GrowthSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrowthSpan::Years(years) => write!(f, "{}", years),
            GrowthSpan::Max => write!(f, "max"),
        }
    }
}

/// Tuning for trajectory construction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GrowthOptions {
    /// Value every trajectory starts at
    pub base_value: f64,
    /// Trajectories spanning more years than this are thinned to month-end points
    pub monthly_sampling_after_years: Option<f64>,
}

impl Default for GrowthOptions {
    fn default() -> Self {
        Self {
            base_value: DEFAULT_BASE_VALUE,
            monthly_sampling_after_years: Some(20.0),
        }
    }
}

/// One `(date, value)` observation; serializes as a `[date, value]` pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GrowthPoint(pub NaiveDate, pub f64);

impl GrowthPoint {
    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn value(&self) -> f64 {
        self.1
    }
}

/// Value path of a hypothetical initial investment in one ticker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GrowthTrajectory {
    pub ticker: String,
    pub points: Vec<GrowthPoint>,
}

impl GrowthTrajectory {
    /// Value on the final date.
    pub fn final_value(&self) -> Option<f64> {
        self.points.last().map(GrowthPoint::value)
    }
}

/// Aligned trajectories plus the window they share.
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthTrajectories {
    /// One trajectory per requested ticker, in request order
    pub trajectories: Vec<GrowthTrajectory>,
    pub common_start: NaiveDate,
    pub common_end: NaiveDate,
}

impl GrowthTrajectories {
    /// Trajectory for `ticker` (case-insensitive).
    pub fn get(&self, ticker: &str) -> Option<&GrowthTrajectory> {
        self.trajectories
            .iter()
            .find(|t| t.ticker.eq_ignore_ascii_case(ticker))
    }

    /// Length of the shared window in years.
    pub fn span_years(&self) -> f64 {
        years_between(self.common_start, self.common_end)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GrowthMeta {
    common_start: NaiveDate,
    common_end: NaiveDate,
}

/// `{ "SPY": [["2015-01-02", 10000.0], ...], "_meta": { "commonStart": ..., "commonEnd": ... } }`
impl Serialize for GrowthTrajectories {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.trajectories.len() + 1))?;
        for trajectory in &self.trajectories {
            map.serialize_entry(&trajectory.ticker, &trajectory.points)?;
        }
        map.serialize_entry(
            "_meta",
            &GrowthMeta {
                common_start: self.common_start,
                common_end: self.common_end,
            },
        )?;
        map.end()
    }
}

/// Build growth-of-$10,000 trajectories for every series in `series`.
///
/// See [`build_growth_trajectories_with`] for the alignment rules.
pub fn build_growth_trajectories(
    series: &BTreeMap<String, PriceSeries>,
    span: GrowthSpan,
) -> Result<GrowthTrajectories> {
    let refs: Vec<&PriceSeries> = series.values().collect();
    build_growth_trajectories_with(&refs, span, &GrowthOptions::default())
}

/// Build trajectories aligned to the widest window every series supports.
///
/// - `common_end` is the earliest last date across the series.
/// - `common_start` is the latest, over all series, of the series' first date
///   or, for [`GrowthSpan::Years`], `years` before the series' own last date
///   when that is later.
/// - Each trajectory starts at `options.base_value` on `common_start` (the price
///   there is interpolated if the series has no point on that exact day) and
///   then follows every point up to `common_end`.
///
/// A shorter-history ticker is never extrapolated: it pulls the common start
/// forward for all of them.
///
/// # Errors
///
/// - [`Error::InvalidInput`] if `series` is empty
/// - [`Error::InsufficientHistory`] if any series has fewer than 2 points
/// - [`Error::NoOverlappingHistory`] if the shared window holds fewer than 2 points
pub fn build_growth_trajectories_with(
    series: &[&PriceSeries],
    span: GrowthSpan,
    options: &GrowthOptions,
) -> Result<GrowthTrajectories> {
    if series.is_empty() {
        return Err(Error::InvalidInput(
            "at least one ticker is required for a growth chart".to_string(),
        ));
    }

    let mut bounds = Vec::with_capacity(series.len());
    for s in series {
        match (s.first(), s.last()) {
            (Some(first), Some(last)) if s.len() >= 2 => bounds.push((first.date, last.date)),
            _ => {
                return Err(Error::InsufficientHistory {
                    ticker: s.ticker().to_string(),
                    points: s.len(),
                })
            }
        }
    }

    let no_overlap = || Error::NoOverlappingHistory {
        tickers: series.iter().map(|s| s.ticker().to_string()).collect(),
    };

    let common_end = bounds
        .iter()
        .map(|&(_, last)| last)
        .min()
        .ok_or_else(no_overlap)?;
    let latest_first = bounds
        .iter()
        .map(|&(first, _)| first)
        .max()
        .ok_or_else(no_overlap)?;
    let common_start = match span {
        GrowthSpan::Years(years) => bounds
            .iter()
            .map(|&(first, last)| first.max(years_before(last, years)))
            .max()
            .ok_or_else(no_overlap)?,
        GrowthSpan::Max => latest_first,
    };

    if common_start >= common_end {
        return Err(no_overlap());
    }

    let thin = options
        .monthly_sampling_after_years
        .is_some_and(|threshold| years_between(common_start, common_end) > threshold);

    let mut trajectories = Vec::with_capacity(series.len());
    for s in series {
        let base_price = s.price_at(common_start).ok_or_else(no_overlap)?;

        let mut points = vec![GrowthPoint(common_start, options.base_value)];
        points.extend(
            s.points()
                .iter()
                .filter(|p| p.date > common_start && p.date <= common_end)
                .map(|p| GrowthPoint(p.date, options.base_value * p.close / base_price)),
        );

        if points.len() < 2 {
            return Err(no_overlap());
        }
        if thin {
            points = thin_to_month_ends(points);
        }

        trajectories.push(GrowthTrajectory {
            ticker: s.ticker().to_string(),
            points,
        });
    }

    tracing::debug!(
        tickers = trajectories.len(),
        %span,
        %common_start,
        %common_end,
        "aligned growth trajectories"
    );

    Ok(GrowthTrajectories {
        trajectories,
        common_start,
        common_end,
    })
}

/// Keep the first point, the last point and the last point of every calendar month.
fn thin_to_month_ends(points: Vec<GrowthPoint>) -> Vec<GrowthPoint> {
    let n = points.len();
    points
        .iter()
        .enumerate()
        .filter(|&(i, p)| {
            i == 0 || i + 1 == n || {
                let next = points[i + 1].date();
                (next.year(), next.month()) != (p.date().year(), p.date().month())
            }
        })
        .map(|(_, p)| *p)
        .collect()
}
