//! JSON-file price store with a time-bounded freshness check.

use super::PriceSeriesProvider;
use crate::types::{PricePoint, PriceSeries, SummaryFields};
use crate::{Error, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Data older than this is considered stale and due for a refresh.
pub const DEFAULT_CACHE_TTL_DAYS: i64 = 7;

/// On-disk contents of a [`PriceStore`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StoreData {
    /// Tickers in display order
    #[serde(default)]
    pub order: Vec<String>,
    /// Price history per ticker
    #[serde(default)]
    pub series: BTreeMap<String, PriceSeries>,
    /// Descriptive fields per ticker
    #[serde(default)]
    pub summaries: BTreeMap<String, SummaryFields>,
    /// When the prices were last pulled from the upstream provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
    /// When the file was last written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// One row of a `date,close` CSV import.
#[derive(Debug, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    close: f64,
}

/// Price store that persists to a JSON file.
#[derive(Debug)]
pub struct PriceStore {
    /// Path to the store JSON file
    path: PathBuf,
    /// In-memory contents
    data: StoreData,
}

impl PriceStore {
    /// Open the store at the default path.
    ///
    /// Default path: `~/.etf-metrics/prices.json`
    /// Can be overridden with the `ETF_METRICS_STORE_FILE` environment variable.
    pub fn new() -> Result<Self> {
        Self::with_path(Self::default_path())
    }

    /// Open a store at a custom path. A missing file yields an empty store.
    pub fn with_path(path: PathBuf) -> Result<Self> {
        let data = Self::load_from_path(&path)?;
        Ok(Self { path, data })
    }

    /// Create an in-memory store (no persistence).
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::new(),
            data: StoreData::default(),
        }
    }

    /// Get the default store file path.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = env::var("ETF_METRICS_STORE_FILE") {
            return PathBuf::from(path);
        }

        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".etf-metrics/prices.json"))
            .unwrap_or_else(|| PathBuf::from("prices.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_path(path: &Path) -> Result<StoreData> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no price store yet, starting empty");
            return Ok(StoreData::default());
        }

        let content = fs::read_to_string(path)?;
        let data: StoreData = serde_json::from_str(&content)?;
        tracing::debug!(
            path = %path.display(),
            tickers = data.series.len(),
            "loaded price store"
        );
        Ok(data)
    }

    /// Write the store to disk.
    pub fn save(&mut self) -> Result<()> {
        // Skip if in-memory only
        if self.path.as_os_str().is_empty() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        self.data.updated_at = Some(Utc::now());

        let content = serde_json::to_string_pretty(&self.data)?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    /// Reload the store from disk.
    pub fn reload(&mut self) -> Result<()> {
        self.data = Self::load_from_path(&self.path)?;
        Ok(())
    }

    pub fn data(&self) -> &StoreData {
        &self.data
    }

    /// Insert or replace a ticker's history and stamp the fetch time.
    pub fn upsert_series(&mut self, series: PriceSeries) {
        let ticker = series.ticker().to_string();
        if !self.data.order.contains(&ticker) {
            self.data.order.push(ticker.clone());
        }
        self.data.series.insert(ticker, series);
        self.data.fetched_at = Some(Utc::now());
    }

    /// Attach summary fields to a ticker.
    pub fn set_summary(&mut self, ticker: &str, fields: SummaryFields) {
        self.data.summaries.insert(ticker.to_uppercase(), fields);
    }

    /// Drop a ticker and everything stored for it.
    pub fn remove(&mut self, ticker: &str) -> Result<PriceSeries> {
        let ticker = ticker.to_uppercase();
        self.data.order.retain(|t| *t != ticker);
        self.data.summaries.remove(&ticker);
        self.data
            .series
            .remove(&ticker)
            .ok_or(Error::UnknownTicker(ticker))
    }

    /// Read `date,close` rows (with a header line) and store them as `ticker`'s history.
    ///
    /// Rows are sorted and deduplicated; non-positive closes are dropped.
    pub fn import_csv<R: Read>(&mut self, ticker: &str, reader: R) -> Result<&PriceSeries> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut points = Vec::new();
        for row in csv_reader.deserialize::<CsvRow>() {
            let row = row?;
            points.push(PricePoint::new(row.date, row.close));
        }

        let series = PriceSeries::from_unsorted(ticker, points);
        tracing::debug!(ticker = series.ticker(), points = series.len(), "imported csv");

        let key = series.ticker().to_string();
        self.upsert_series(series);
        self.data
            .series
            .get(&key)
            .ok_or(Error::UnknownTicker(key))
    }

    /// Whether the prices are older than `ttl` as of `now` (or were never fetched).
    pub fn is_stale(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match self.data.fetched_at {
            Some(fetched_at) => now - fetched_at > ttl,
            None => true,
        }
    }
}

impl PriceSeriesProvider for PriceStore {
    fn tickers(&self) -> Vec<String> {
        self.data
            .order
            .iter()
            .filter(|t| self.data.series.contains_key(*t))
            .cloned()
            .collect()
    }

    fn price_series(&self, ticker: &str) -> Result<PriceSeries> {
        let ticker = ticker.to_uppercase();
        self.data
            .series
            .get(&ticker)
            .cloned()
            .ok_or(Error::UnknownTicker(ticker))
    }

    fn summary_fields(&self, ticker: &str) -> Result<SummaryFields> {
        let ticker = ticker.to_uppercase();
        if !self.data.series.contains_key(&ticker) {
            return Err(Error::UnknownTicker(ticker));
        }
        Ok(self.data.summaries.get(&ticker).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ymd;
    use tempfile::tempdir;

    fn sample_series(ticker: &str) -> PriceSeries {
        PriceSeries::new(
            ticker,
            vec![
                PricePoint::new(ymd(2024, 1, 5), 470.0),
                PricePoint::new(ymd(2024, 1, 12), 476.5),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_upsert_and_lookup() {
        let mut store = PriceStore::in_memory();
        store.upsert_series(sample_series("SPY"));
        store.upsert_series(sample_series("QQQ"));

        assert_eq!(store.tickers(), vec!["SPY".to_string(), "QQQ".to_string()]);
        assert_eq!(store.price_series("spy").unwrap().len(), 2);
        assert_eq!(store.summary_fields("SPY").unwrap(), SummaryFields::default());
    }

    #[test]
    fn test_unknown_ticker() {
        let store = PriceStore::in_memory();
        assert!(matches!(
            store.price_series("GLD"),
            Err(Error::UnknownTicker(t)) if t == "GLD"
        ));
        assert!(matches!(
            store.summary_fields("GLD"),
            Err(Error::UnknownTicker(_))
        ));
    }

    #[test]
    fn test_remove() {
        let mut store = PriceStore::in_memory();
        store.upsert_series(sample_series("SPY"));
        store.set_summary("spy", SummaryFields::default());

        let removed = store.remove("SPY").unwrap();
        assert_eq!(removed.ticker(), "SPY");
        assert!(store.tickers().is_empty());
        assert!(store.remove("SPY").is_err());
    }

    #[test]
    fn test_import_csv() {
        let csv = "date,close\n2024-01-12, 476.5\n2024-01-05,470.0\n2024-01-19,0\n";
        let mut store = PriceStore::in_memory();

        let series = store.import_csv("tlt", csv.as_bytes()).unwrap();
        assert_eq!(series.ticker(), "TLT");
        assert_eq!(series.len(), 2);
        assert_eq!(series.first().unwrap().date, ymd(2024, 1, 5));
    }

    #[test]
    fn test_import_csv_rejects_bad_rows() {
        let csv = "date,close\nnot-a-date,1.0\n";
        let mut store = PriceStore::in_memory();
        assert!(matches!(
            store.import_csv("TLT", csv.as_bytes()),
            Err(Error::Csv(_))
        ));
    }

    #[test]
    fn test_staleness() {
        let mut store = PriceStore::in_memory();
        let ttl = Duration::days(DEFAULT_CACHE_TTL_DAYS);
        assert!(store.is_stale(Utc::now(), ttl));

        store.upsert_series(sample_series("SPY"));
        let fetched = store.data().fetched_at.unwrap();
        assert!(!store.is_stale(fetched + Duration::days(6), ttl));
        assert!(store.is_stale(fetched + Duration::days(8), ttl));
    }

    #[test]
    fn test_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/prices.json");

        // Create and save
        {
            let mut store = PriceStore::with_path(path.clone()).unwrap();
            store.upsert_series(sample_series("SPY"));
            store.set_summary(
                "SPY",
                SummaryFields {
                    issuer: Some("State Street".to_string()),
                    ..Default::default()
                },
            );
            store.save().unwrap();
        }

        // Reload and verify
        {
            let store = PriceStore::with_path(path).unwrap();
            assert_eq!(store.tickers(), vec!["SPY".to_string()]);
            assert_eq!(store.price_series("SPY").unwrap(), sample_series("SPY"));
            assert_eq!(
                store.summary_fields("SPY").unwrap().issuer.as_deref(),
                Some("State Street")
            );
            assert!(store.data().updated_at.is_some());
        }
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prices.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(PriceStore::with_path(path), Err(Error::Json(_))));
    }
}
