use advisordeck_core::{CapBucket, RequestCoordinator, ScreenerQuery};

use crate::cli::ScreenArgs;
use crate::error::CliError;

use super::CommandResult;

pub async fn run(
    coordinator: &RequestCoordinator,
    args: &ScreenArgs,
) -> Result<CommandResult, CliError> {
    let cap = args.cap.as_deref().map(CapBucket::parse).transpose()?;
    let query = ScreenerQuery {
        cap,
        sector: args.sector.clone(),
        min_pe: args.min_pe,
        max_pe: args.max_pe,
        min_volume: args.min_volume,
        include_predictions: args.predictions,
    };
    let sourced = coordinator.screen(&query).await?;
    CommandResult::from_sourced(sourced)
}
