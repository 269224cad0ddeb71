use advisordeck_core::{RequestCoordinator, Symbol};

use crate::cli::PredictArgs;
use crate::error::CliError;

use super::CommandResult;

pub async fn run(
    coordinator: &RequestCoordinator,
    args: &PredictArgs,
) -> Result<CommandResult, CliError> {
    let symbol = Symbol::parse(&args.symbol)?;
    let sourced = coordinator.predict(&symbol, args.horizon).await?;
    CommandResult::from_sourced(sourced)
}
