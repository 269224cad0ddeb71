use advisordeck_core::RequestCoordinator;

use crate::cli::QueryArgs;
use crate::error::CliError;

use super::CommandResult;

pub async fn run(
    coordinator: &RequestCoordinator,
    args: &QueryArgs,
) -> Result<CommandResult, CliError> {
    let sourced = coordinator.ask_advisor(&args.question).await?;
    CommandResult::from_sourced(sourced)
}
