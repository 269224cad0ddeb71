//! CLI argument definitions for advisordeck.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `overview` | Fetch the market overview dashboard data |
//! | `stock` | Snapshot one stock |
//! | `predict` | Forecast prices for a symbol |
//! | `screen` | Screen stocks by cap, sector and P/E |
//! | `risk` | Score portfolio risk |
//! | `optimize` | Run portfolio optimization |
//! | `query` | Ask the advisor a free-form question |
//! | `health` | Probe backend health |
//! | `watch` | Follow the live market feed |

use clap::{Args, Parser, Subcommand};

/// Investment-dashboard data client with offline fallbacks.
///
/// Every command degrades gracefully: when the backend is unreachable or
/// returns an unusable payload, deterministic fallback data is printed
/// and flagged with a warning instead of failing the command.
#[derive(Debug, Parser)]
#[command(
    name = "advisordeck",
    author,
    version,
    about = "Investment-dashboard data client"
)]
pub struct Cli {
    /// Backend base URL. Overrides the ADVISORDECK_API_URL environment
    /// variable.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Treat fallback substitution warnings as failures (exit code 5).
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the market overview dashboard data.
    Overview,
    /// Snapshot one stock.
    Stock(StockArgs),
    /// Forecast prices for a symbol.
    Predict(PredictArgs),
    /// Screen stocks by cap, sector and P/E.
    Screen(ScreenArgs),
    /// Score portfolio risk over the demo holdings.
    Risk,
    /// Run portfolio optimization over the demo holdings.
    Optimize,
    /// Ask the advisor a free-form question.
    Query(QueryArgs),
    /// Probe backend health.
    Health,
    /// Follow the live market feed and print updates.
    Watch(WatchArgs),
}

#[derive(Debug, Args)]
pub struct StockArgs {
    /// Ticker symbol, e.g. TCS or M&M.
    pub symbol: String,
}

#[derive(Debug, Args)]
pub struct PredictArgs {
    /// Ticker symbol.
    pub symbol: String,

    /// Number of forecast steps.
    #[arg(long, default_value_t = 5)]
    pub horizon: usize,
}

#[derive(Debug, Args)]
pub struct ScreenArgs {
    /// Cap bucket: small, mid or large.
    #[arg(long)]
    pub cap: Option<String>,

    /// Sector name; "All" means unconstrained.
    #[arg(long)]
    pub sector: Option<String>,

    /// Inclusive lower bound on the price/earnings ratio.
    #[arg(long)]
    pub min_pe: Option<f64>,

    /// Inclusive upper bound on the price/earnings ratio.
    #[arg(long)]
    pub max_pe: Option<f64>,

    /// Minimum traded volume per row.
    #[arg(long)]
    pub min_volume: Option<u64>,

    /// Ask the backend to attach predicted prices to each row.
    #[arg(long, default_value_t = false)]
    pub predictions: bool,
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Question for the advisor.
    pub question: String,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Reconnect with backoff after a dropped connection.
    #[arg(long, default_value_t = false)]
    pub reconnect: bool,

    /// Stop after this many seconds; 0 runs until interrupted.
    #[arg(long, default_value_t = 0)]
    pub duration_secs: u64,
}
