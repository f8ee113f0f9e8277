use anyhow::Context;
use futures::StreamExt;
use tracing::{error, info, warn};
use account_feed::config::AppConfig;
use account_feed::display::{format_snapshot, DisplayOptions};
use account_feed::feed::AccountFeed;
use account_feed::observability::metrics::register_metrics;
use account_feed::observability::tracing::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = std::env::var("ACCOUNT_FEED_ENV").unwrap_or_else(|_| "development".to_string());
    let config = AppConfig::load(&env).context("loading configuration")?;

    init_tracing(&config.logging).context("installing tracing subscriber")?;
    register_metrics().context("registering metrics")?;

    let feed = AccountFeed::new(&config);
    for outcome in feed.bootstrap(&config.accounts).await {
        match outcome.result {
            Ok(()) => info!(account = %outcome.name, "Account connected"),
            Err(err) => warn!(account = %outcome.name, "Account not connected: {}", err),
        }
    }

    feed.start().await?;

    let options = DisplayOptions::default();
    let mut updates = Box::pin(feed.updates());
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received, shutting down");
                break;
            }
            next = updates.next() => {
                let Some(snapshot) = next else { break };
                let view = format_snapshot(&snapshot, &options);
                if let Some(balance) = view.balance {
                    println!("{}", balance);
                }
                for line in view.positions {
                    println!("  {}", line.text);
                }
                if !view.stale_sources.is_empty() {
                    println!("  stale: {}", view.stale_sources.join(", "));
                }
            }
            fatal = feed.stopped() => {
                match fatal {
                    Some(err) => error!("Polling stopped: {}", err),
                    None => warn!("Polling stopped"),
                }
                break;
            }
        }
    }

    feed.shutdown().await?;
    Ok(())
}
