//! Peak-to-trough drawdown analysis.

use crate::types::{PricePoint, PriceSeries};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A single peak-to-trough decline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DrawdownResult {
    /// `(trough / peak - 1) * 100`, always <= 0
    pub depth_pct: f64,
    pub peak_date: NaiveDate,
    pub trough_date: NaiveDate,
}

impl DrawdownResult {
    fn between(peak: PricePoint, trough: PricePoint) -> Self {
        Self {
            depth_pct: (trough.close / peak.close - 1.0) * 100.0,
            peak_date: peak.date,
            trough_date: trough.date,
        }
    }

    /// Market event this drawdown bottomed out in, if it is a well-known one.
    pub fn label(&self) -> Option<&'static str> {
        drawdown_label(self.trough_date)
    }
}

/// Extra selection rules applied on top of the raw ranking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct DrawdownFilter {
    /// Ignore declines shallower than this many percent
    pub min_depth_pct: f64,
    /// Each selected trough must be at least this many calendar years away
    /// from every trough already selected
    pub min_trough_separation_years: i32,
}

/// Known market events, keyed by inclusive trough-year range.
const EVENT_LABELS: &[(i32, i32, &str)] = &[
    (2001, 2003, "Dot-com bust"),
    (2008, 2009, "Global financial crisis"),
    (2011, 2012, "European debt crisis"),
    (2015, 2016, "China / commodity selloff"),
    (2018, 2019, "Fed tightening / trade war"),
    (2020, 2020, "COVID-19 crash"),
    (2022, 2024, "Rate hikes / inflation"),
];

/// Name of the market event a drawdown troughing on `trough_date` belongs to.
pub fn drawdown_label(trough_date: NaiveDate) -> Option<&'static str> {
    let year = trough_date.year();
    EVENT_LABELS
        .iter()
        .find(|(from, to, _)| (*from..=*to).contains(&year))
        .map(|(_, _, label)| *label)
}

/// Find the `max_count` deepest drawdowns, most severe first.
///
/// A forward scan tracks the running peak and the lowest point since that
/// peak. Each time the price sets a new peak the open candidate is closed, so
/// candidates never overlap. Equal depths are ordered by the earlier peak.
///
/// A series that never declines yields an empty vector.
///
/// # Example
///
/// ```rust
/// use chrono::NaiveDate;
/// use etf_metrics::analytics::find_top_drawdowns;
/// use etf_metrics::{PricePoint, PriceSeries};
///
/// let d = |y, m| NaiveDate::from_ymd_opt(y, m, 1).unwrap();
/// let series = PriceSeries::new("SPY", vec![
///     PricePoint::new(d(2020, 1), 100.0),
///     PricePoint::new(d(2020, 3), 70.0),
///     PricePoint::new(d(2020, 8), 105.0),
/// ]).unwrap();
///
/// let drawdowns = find_top_drawdowns(&series, 2);
/// assert_eq!(drawdowns.len(), 1);
/// assert!((drawdowns[0].depth_pct + 30.0).abs() < 1e-9);
/// ```
pub fn find_top_drawdowns(series: &PriceSeries, max_count: usize) -> Vec<DrawdownResult> {
    find_top_drawdowns_filtered(series, max_count, &DrawdownFilter::default())
}

/// [`find_top_drawdowns`] with a minimum depth and trough-separation rule.
pub fn find_top_drawdowns_filtered(
    series: &PriceSeries,
    max_count: usize,
    filter: &DrawdownFilter,
) -> Vec<DrawdownResult> {
    let mut candidates: Vec<DrawdownResult> = drawdown_candidates(series)
        .into_iter()
        .filter(|dd| filter.min_depth_pct <= 0.0 || dd.depth_pct < -filter.min_depth_pct)
        .collect();

    candidates.sort_by(|a, b| {
        a.depth_pct
            .partial_cmp(&b.depth_pct)
            .unwrap_or(Ordering::Equal)
            .then(a.peak_date.cmp(&b.peak_date))
    });

    let mut selected: Vec<DrawdownResult> = Vec::with_capacity(max_count);
    for candidate in candidates {
        if selected.len() >= max_count {
            break;
        }
        let far_enough = selected.iter().all(|chosen| {
            (candidate.trough_date.year() - chosen.trough_date.year()).abs()
                >= filter.min_trough_separation_years
        });
        if far_enough {
            selected.push(candidate);
        }
    }

    tracing::debug!(
        ticker = series.ticker(),
        found = selected.len(),
        "drawdown scan"
    );

    selected
}

/// Every peak-to-next-peak decline in chronological order.
fn drawdown_candidates(series: &PriceSeries) -> Vec<DrawdownResult> {
    let points = series.points();
    let Some(&first) = points.first() else {
        return Vec::new();
    };

    let mut candidates = Vec::new();
    let mut peak = first;
    let mut trough = first;

    for &point in &points[1..] {
        if point.close > peak.close {
            if trough.close < peak.close {
                candidates.push(DrawdownResult::between(peak, trough));
            }
            peak = point;
            trough = point;
        } else if point.close < trough.close {
            trough = point;
        }
    }

    // Still under water at the end of the series
    if trough.close < peak.close {
        candidates.push(DrawdownResult::between(peak, trough));
    }

    candidates
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

    #[test]
    fn test_strictly_increasing_has_no_drawdowns() {
        let s = series(&[
            (ymd(2020, 1, 1), 100.0),
            (ymd(2020, 2, 1), 101.0),
            (ymd(2020, 3, 1), 105.0),
            (ymd(2020, 4, 1), 110.0),
        ]);
        assert!(find_top_drawdowns(&s, 2).is_empty());
    }

    #[test]
    fn test_flat_series_has_no_drawdowns() {
        let s = series(&[
            (ymd(2020, 1, 1), 100.0),
            (ymd(2020, 2, 1), 100.0),
            (ymd(2020, 3, 1), 100.0),
        ]);
        assert!(find_top_drawdowns(&s, 2).is_empty());
    }

    #[test]
    fn test_two_disjoint_declines_ranked() {
        let s = series(&[
            (ymd(2000, 1, 1), 100.0),
            (ymd(2001, 1, 1), 120.0),
            (ymd(2001, 9, 1), 100.0),
            (ymd(2002, 6, 1), 84.0), // -30% from 120
            (ymd(2004, 1, 1), 130.0),
            (ymd(2005, 1, 1), 117.0), // -10% from 130
            (ymd(2006, 1, 1), 140.0),
        ]);
        let drawdowns = find_top_drawdowns(&s, 2);

        assert_eq!(drawdowns.len(), 2);

        assert_relative_eq!(drawdowns[0].depth_pct, -30.0, epsilon = 1e-9);
        assert_eq!(drawdowns[0].peak_date, ymd(2001, 1, 1));
        assert_eq!(drawdowns[0].trough_date, ymd(2002, 6, 1));

        assert_relative_eq!(drawdowns[1].depth_pct, -10.0, epsilon = 1e-9);
        assert_eq!(drawdowns[1].peak_date, ymd(2004, 1, 1));
        assert_eq!(drawdowns[1].trough_date, ymd(2005, 1, 1));
    }

    #[test]
    fn test_max_count_truncates() {
        let s = series(&[
            (ymd(2000, 1, 1), 100.0),
            (ymd(2000, 6, 1), 90.0),
            (ymd(2001, 1, 1), 110.0),
            (ymd(2001, 6, 1), 55.0),
            (ymd(2002, 1, 1), 120.0),
            (ymd(2002, 6, 1), 96.0),
            (ymd(2003, 1, 1), 125.0),
        ]);

        let top = find_top_drawdowns(&s, 1);
        assert_eq!(top.len(), 1);
        assert_relative_eq!(top[0].depth_pct, -50.0, epsilon = 1e-9);

        let all = find_top_drawdowns(&s, 10);
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].depth_pct <= w[1].depth_pct));

        assert!(find_top_drawdowns(&s, 0).is_empty());
    }

    #[test]
    fn test_equal_depth_earlier_peak_first() {
        let s = series(&[
            (ymd(2010, 1, 1), 100.0),
            (ymd(2010, 6, 1), 80.0),
            (ymd(2011, 1, 1), 200.0),
            (ymd(2011, 6, 1), 160.0),
            (ymd(2012, 1, 1), 250.0),
        ]);
        let drawdowns = find_top_drawdowns(&s, 2);

        assert_eq!(drawdowns.len(), 2);
        assert_eq!(drawdowns[0].peak_date, ymd(2010, 1, 1));
        assert_eq!(drawdowns[1].peak_date, ymd(2011, 1, 1));
    }

    #[test]
    fn test_unrecovered_drawdown_is_closed_at_end() {
        let s = series(&[
            (ymd(2021, 12, 31), 100.0),
            (ymd(2022, 6, 30), 75.0),
            (ymd(2022, 10, 14), 70.0),
            (ymd(2023, 3, 31), 85.0),
        ]);
        let drawdowns = find_top_drawdowns(&s, 2);

        assert_eq!(drawdowns.len(), 1);
        assert_relative_eq!(drawdowns[0].depth_pct, -30.0, epsilon = 1e-9);
        assert_eq!(drawdowns[0].trough_date, ymd(2022, 10, 14));
        assert_eq!(drawdowns[0].label(), Some("Rate hikes / inflation"));
    }

    #[test]
    fn test_filter_min_depth_and_separation() {
        let s = series(&[
            (ymd(2007, 10, 1), 100.0),
            (ymd(2008, 11, 1), 70.0), // -30%
            (ymd(2009, 6, 1), 101.0),
            (ymd(2009, 9, 1), 89.0), // ~-12%, same crisis window
            (ymd(2010, 1, 1), 110.0),
            (ymd(2010, 5, 1), 107.0), // ~-3%, too shallow
            (ymd(2019, 12, 1), 200.0),
            (ymd(2020, 3, 1), 160.0), // -20%
            (ymd(2020, 12, 1), 210.0),
        ]);

        let unfiltered = find_top_drawdowns(&s, 2);
        assert_eq!(unfiltered[1].trough_date, ymd(2020, 3, 1));

        let filter = DrawdownFilter {
            min_depth_pct: 5.0,
            min_trough_separation_years: 2,
        };
        let all = find_top_drawdowns_filtered(&s, 10, &filter);

        // 2009 trough is within two years of 2008, the shallow 2010 one is dropped
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].trough_date, ymd(2008, 11, 1));
        assert_eq!(all[1].trough_date, ymd(2020, 3, 1));
        assert_eq!(all[0].label(), Some("Global financial crisis"));
        assert_eq!(all[1].label(), Some("COVID-19 crash"));
    }

    #[test]
    fn test_labels() {
        assert_eq!(drawdown_label(ymd(2002, 10, 9)), Some("Dot-com bust"));
        assert_eq!(drawdown_label(ymd(1994, 6, 1)), None);
    }
}
