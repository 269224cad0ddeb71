use std::time::Duration;

use advisordeck_core::{FeedConfig, FeedSubscriber, RequestCoordinator};
use serde_json::json;

use crate::cli::WatchArgs;
use crate::error::CliError;

use super::CommandResult;

/// Follow the live feed, printing one JSON line per merged update. An
/// initial overview fetch seeds the store so push updates have a record
/// to merge into.
pub async fn run(
    coordinator: &RequestCoordinator,
    args: &WatchArgs,
) -> Result<CommandResult, CliError> {
    let seeded = coordinator.refresh_overview().await?;
    let feed_config = FeedConfig {
        reconnect: args.reconnect,
        ..FeedConfig::default()
    };
    let subscriber = FeedSubscriber::new(
        coordinator.config(),
        feed_config,
        coordinator.store().clone(),
    );
    subscriber.connect();

    let deadline = (args.duration_secs > 0)
        .then(|| tokio::time::Instant::now() + Duration::from_secs(args.duration_secs));
    let mut ticker = tokio::time::interval(Duration::from_millis(500));
    let mut last_seen = None;
    let mut updates: u64 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(deadline) = deadline {
                    if tokio::time::Instant::now() >= deadline {
                        break;
                    }
                }
                let stamp = coordinator.store().last_update().await;
                if stamp.is_some() && stamp != last_seen {
                    last_seen = stamp;
                    updates += 1;
                    if let Some(overview) = coordinator.store().overview().await {
                        let line = json!({
                            "timestamp": last_seen,
                            "metrics": overview.metrics,
                        });
                        println!("{line}");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    subscriber.close();
    let mut result = CommandResult::live(json!({
        "updates": updates,
        "state": format!("{:?}", subscriber.state()),
    }));
    if !seeded.is_live() {
        result
            .warnings
            .push("initial overview came from fallback data".to_owned());
        result.origin = "fallback";
    }
    Ok(result)
}
