//! ETF Metrics CLI - fund comparison figures as JSON.
//!
//! Every command prints one `ApiResponse` document to stdout; logs go to stderr.

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use std::fs::File;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use etf_metrics::{
    analytics::{compute_window_return, find_top_drawdowns, find_top_drawdowns_filtered},
    growth::{build_growth_for_tickers, parse_portfolio_ticker, GrowthSpan},
    summary::{compute_all, Dashboard, EtfMetrics, LabeledDrawdown},
    ApiResponse, MetricsConfig, PriceSeriesProvider, PriceStore, Result,
};

#[derive(Parser)]
#[command(name = "etf-metrics")]
#[command(about = "ETF comparison CLI - returns, drawdowns and growth of $10K")]
#[command(version)]
struct Cli {
    /// Price store file (defaults to ~/.etf-metrics/prices.json)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Config file (defaults to <config dir>/etf-metrics/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Annualized and cumulative returns for one ticker
    Returns {
        /// Ticker symbol
        #[arg(short, long)]
        ticker: String,
        /// Single lookback in years (all configured windows when omitted)
        #[arg(short, long)]
        years: Option<f64>,
    },
    /// Deepest peak-to-trough declines for one ticker
    Drawdowns {
        /// Ticker symbol
        #[arg(short, long)]
        ticker: String,
        /// Maximum number of drawdowns
        #[arg(short = 'n', long, default_value = "2")]
        count: usize,
        /// Skip the configured depth and separation rules
        #[arg(long)]
        all: bool,
    },
    /// Growth-of-$10K trajectories aligned to a common start
    Growth {
        /// Tickers (comma-separated, at most 5; PORT-<n> for the blended portfolio)
        #[arg(short, long)]
        tickers: String,
        /// Trailing years, or "max" for the widest shared window
        #[arg(short, long, default_value = "10")]
        years: String,
    },
    /// Full comparison table with the equal-weight portfolio row
    Summary,
    /// Load `date,close` rows from a CSV file into the store
    Import {
        /// Ticker symbol
        #[arg(short, long)]
        ticker: String,
        /// CSV file with a `date,close` header
        #[arg(long)]
        csv: PathBuf,
    },
    /// Print the effective configuration
    Config,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let output = match run(cli) {
        Ok(output) => output,
        Err(e) => render(&ApiResponse::<()>::err(e.to_string())),
    };

    println!("{}", output);
}

fn run(cli: Cli) -> Result<String> {
    let config = match &cli.config {
        Some(path) => MetricsConfig::load_from_path(path)?,
        None => MetricsConfig::load(),
    };
    let store = match cli.store {
        Some(path) => PriceStore::with_path(path)?,
        None => PriceStore::new()?,
    };

    match cli.command {
        Commands::Returns { ticker, years } => handle_returns(&store, &config, &ticker, years),
        Commands::Drawdowns { ticker, count, all } => {
            handle_drawdowns(&store, &config, &ticker, count, all)
        }
        Commands::Growth { tickers, years } => handle_growth(&store, &config, &tickers, &years),
        Commands::Summary => handle_summary(&store, &config),
        Commands::Import { ticker, csv } => handle_import(store, &ticker, csv),
        Commands::Config => Ok(render(&ApiResponse::ok(&config))),
    }
}

fn render<T: Serialize>(response: &ApiResponse<T>) -> String {
    serde_json::to_string_pretty(response)
        .unwrap_or_else(|e| format!(r#"{{"ok":false,"error":"{}"}}"#, e))
}

fn handle_returns(
    store: &PriceStore,
    config: &MetricsConfig,
    ticker: &str,
    years: Option<f64>,
) -> Result<String> {
    let series = store.price_series(ticker)?;

    if let Some(years) = years {
        let result = compute_window_return(&series, years)?;
        return Ok(render(&ApiResponse::ok(json!({
            "ticker": series.ticker(),
            "window": result,
        }))));
    }

    let row = EtfMetrics::compute(&series, store.summary_fields(ticker)?, config)?;
    Ok(render(&ApiResponse::ok(json!({
        "ticker": row.ticker,
        "windows": row.windows,
        "sinceInception": row.since_inception,
        "sinceDate": row.since_date,
        "trailing": row.trailing,
        "annualizedStdDevPct": row.annualized_std_dev_pct,
        "sharpeRatio": row.sharpe_ratio,
    }))))
}

fn handle_drawdowns(
    store: &PriceStore,
    config: &MetricsConfig,
    ticker: &str,
    count: usize,
    all: bool,
) -> Result<String> {
    let series = store.price_series(ticker)?;
    let found = if all {
        find_top_drawdowns(&series, count)
    } else {
        find_top_drawdowns_filtered(&series, count, &config.drawdown)
    };
    let drawdowns: Vec<LabeledDrawdown> = found.into_iter().map(LabeledDrawdown::from).collect();

    Ok(render(&ApiResponse::ok(json!({
        "ticker": series.ticker(),
        "drawdowns": drawdowns,
    }))))
}

fn handle_growth(
    store: &PriceStore,
    config: &MetricsConfig,
    tickers: &str,
    years: &str,
) -> Result<String> {
    let span: GrowthSpan = years.parse()?;
    let tickers: Vec<String> = tickers
        .split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    // Same constituents as the summary's portfolio row
    let portfolio = if tickers.iter().any(|t| parse_portfolio_ticker(t).is_some()) {
        compute_all(store, config)?
            .into_iter()
            .map(|row| row.ticker)
            .collect()
    } else {
        Vec::new()
    };

    let growth = build_growth_for_tickers(store, &tickers, span, &config.growth, &portfolio)?;
    Ok(render(&ApiResponse::ok(growth)))
}

fn handle_summary(store: &PriceStore, config: &MetricsConfig) -> Result<String> {
    let dashboard = Dashboard::build(store, config)?;
    let stale = store.is_stale(chrono::Utc::now(), config.cache_ttl());
    if stale {
        tracing::warn!(
            fetched_at = ?store.data().fetched_at,
            "price store is older than the cache ttl"
        );
    }

    Ok(render(&ApiResponse::ok(json!({
        "rows": dashboard.rows,
        "portfolio": dashboard.portfolio,
        "correlations": dashboard.correlations,
        "fetchedAt": store.data().fetched_at,
        "stale": stale,
    }))))
}

fn handle_import(mut store: PriceStore, ticker: &str, csv: PathBuf) -> Result<String> {
    let file = File::open(&csv)?;
    let series = store.import_csv(ticker, file)?;
    let summary = json!({
        "ticker": series.ticker(),
        "points": series.len(),
        "first": series.first().map(|p| p.date),
        "last": series.last().map(|p| p.date),
    });
    store.save()?;

    Ok(render(&ApiResponse::ok(summary)))
}
