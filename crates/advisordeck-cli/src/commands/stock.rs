use advisordeck_core::{RequestCoordinator, Symbol};

use crate::cli::StockArgs;
use crate::error::CliError;

use super::CommandResult;

pub async fn run(
    coordinator: &RequestCoordinator,
    args: &StockArgs,
) -> Result<CommandResult, CliError> {
    let symbol = Symbol::parse(&args.symbol)?;
    let sourced = coordinator.stock(&symbol).await?;
    CommandResult::from_sourced(sourced)
}
