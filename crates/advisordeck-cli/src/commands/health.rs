use advisordeck_core::RequestCoordinator;

use crate::error::CliError;

use super::CommandResult;

pub async fn run(coordinator: &RequestCoordinator) -> Result<CommandResult, CliError> {
    let sourced = coordinator.health().await?;
    CommandResult::from_sourced(sourced)
}
