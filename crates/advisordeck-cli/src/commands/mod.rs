mod health;
mod overview;
mod predict;
mod query;
mod risk;
mod screen;
mod stock;
mod watch;

use advisordeck_core::{BackendConfig, RequestCoordinator, Sourced};
use serde::Serialize;
use serde_json::Value;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub struct CommandResult {
    pub data: Value,
    pub origin: &'static str,
    pub warnings: Vec<String>,
}

impl CommandResult {
    /// Wrap a coordinator outcome. Fallback substitution is surfaced as
    /// a warning rather than a failure.
    pub fn from_sourced<T: Serialize>(sourced: Sourced<T>) -> Result<Self, CliError> {
        let origin = if sourced.is_live() { "live" } else { "fallback" };
        let mut warnings = Vec::new();
        if let Some(error) = &sourced.error {
            warnings.push(format!("backend unavailable, showing fallback data: {error}"));
        }
        Ok(Self {
            data: serde_json::to_value(&sourced.value)?,
            origin,
            warnings,
        })
    }

    pub fn live(data: Value) -> Self {
        Self {
            data,
            origin: "live",
            warnings: Vec::new(),
        }
    }
}

pub async fn run(cli: &Cli) -> Result<CommandResult, CliError> {
    let config = match &cli.api_url {
        Some(url) => BackendConfig::new(url)?,
        None => BackendConfig::from_env(),
    };
    let coordinator = RequestCoordinator::new(config);

    match &cli.command {
        Command::Overview => overview::run(&coordinator).await,
        Command::Stock(args) => stock::run(&coordinator, args).await,
        Command::Predict(args) => predict::run(&coordinator, args).await,
        Command::Screen(args) => screen::run(&coordinator, args).await,
        Command::Risk => risk::run_risk(&coordinator).await,
        Command::Optimize => risk::run_optimize(&coordinator).await,
        Command::Query(args) => query::run(&coordinator, args).await,
        Command::Health => health::run(&coordinator).await,
        Command::Watch(args) => watch::run(&coordinator, args).await,
    }
}
