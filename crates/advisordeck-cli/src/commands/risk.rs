use advisordeck_core::RequestCoordinator;

use crate::error::CliError;

use super::CommandResult;

pub async fn run_risk(coordinator: &RequestCoordinator) -> Result<CommandResult, CliError> {
    let sourced = coordinator.analyze_risk().await?;
    CommandResult::from_sourced(sourced)
}

pub async fn run_optimize(coordinator: &RequestCoordinator) -> Result<CommandResult, CliError> {
    let sourced = coordinator.optimize().await?;
    CommandResult::from_sourced(sourced)
}
