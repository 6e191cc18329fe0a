use std::{future::Future, pin::Pin};

use log::*;
use tokio::sync::watch;
use tradehall_engine::{
    events::{EventHandlers, EventHooks, ListingsChangedEvent},
    InMemoryOrderRepository,
    MarketplaceDatabase,
    SchedulerApi,
    SqliteDatabase,
};

use crate::{config::BotConfig, errors::BotError, notifier::LogNotifier, worker::start_scheduler_worker};

const EVENT_BUFFER_SIZE: usize = 16;

/// Wires the engine together and runs until Ctrl-C.
pub async fn run(config: BotConfig) -> Result<(), BotError> {
    if config.database_url.is_empty() {
        return Err(BotError::ConfigurationError("TH_DATABASE_URL must be set".to_string()));
    }
    let mut db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| BotError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| BotError::InitializeError(e.to_string()))?;
    info!("🚀️ Database ready at {}", db.url());

    let mut hooks = EventHooks::default();
    hooks.on_listings_changed(|ev: ListingsChangedEvent| {
        Box::pin(async move {
            // The chat integration subscribes here to re-render its market boards.
            debug!("🪝️ Market view refresh requested for {}/{} ({})", ev.guild, ev.zone, ev.side);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    // The chat-platform integration shares this repository with its OrderFlowApi/RatingApi instances.
    let repo = InMemoryOrderRepository::new();
    let scheduler = SchedulerApi::new(db.clone(), repo, LogNotifier, producers, config.scheduler_config());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = start_scheduler_worker(scheduler, config.poll_interval, shutdown_rx);

    tokio::signal::ctrl_c().await?;
    info!("🚀️ Ctrl-C received; shutting down");
    let _ = shutdown_tx.send(true);
    if let Err(e) = worker.await {
        warn!("🚀️ Scheduler worker did not shut down cleanly: {e}");
    }
    db.close().await?;
    Ok(())
}
