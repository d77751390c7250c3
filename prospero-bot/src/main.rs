//! Polls the Zagreb theater schedules and announces new performances on Telegram.

mod telegram;

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use prospero_core::{AggregationService, Config, ScheduleStore, plugin::VenueRegistry};
use prospero_venue_gavella as gavella;
use prospero_venue_kerempuh as kerempuh;
use prospero_venue_komedija as komedija;
use prospero_venue_luda_kuca as luda_kuca;
use prospero_venue_teatar_exit as teatar_exit;
use reqwest::Client;
use tokio::time::{self, MissedTickBehavior};
use tracing_subscriber::EnvFilter;

use crate::telegram::TelegramNotifier;

const DEFAULT_LOG_FILTER: &str = "info";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    if let Err(err) = dotenv {
        tracing::debug!(error = %err, "no .env file loaded");
    }

    let config = Config::from_env().context("invalid configuration")?;

    // HTTP + service setup
    let client = Client::builder()
        .user_agent(concat!("prospero/", env!("CARGO_PKG_VERSION")))
        .timeout(HTTP_TIMEOUT)
        .build()?;

    let plugins = vec![
        gavella::plugin(client.clone()),
        kerempuh::plugin(client.clone()),
        komedija::plugin(client.clone()),
        luda_kuca::plugin(client.clone()),
        teatar_exit::plugin(client.clone()),
    ];
    let registry = Arc::new(VenueRegistry::new(plugins));
    let notifier = Arc::new(TelegramNotifier::new(client, &config));
    let service = AggregationService::new(registry, notifier, &config);

    let mut store = ScheduleStore::open(&config.database_path).with_context(|| {
        format!("cannot open schedule store at {}", config.database_path.display())
    })?;

    tracing::info!(
        venues = service.venues().len(),
        chats = config.telegram_chat_ids.len(),
        interval_secs = config.check_interval.as_secs(),
        database = %config.database_path.display(),
        "prospero started"
    );

    run(&service, &mut store, config.check_interval).await;

    tracing::info!("prospero stopped");
    Ok(())
}

/// Poll once right away, then once per `every`, until Ctrl-C.
async fn run(service: &AggregationService, store: &mut ScheduleStore, every: Duration) {
    let mut ticker = time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                service.run_cycle(store).await;
            }
            signal = &mut shutdown => {
                if let Err(err) = signal {
                    tracing::error!(error = %err, "cannot listen for shutdown signal");
                }
                break;
            }
        }
    }
}
