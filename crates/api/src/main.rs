//! API server entry point.

use std::sync::Arc;

use api::config::Config;
use inventory::{InMemoryStore, ProductService, StockLedger};
use message_bus::signal::shutdown_signal;
use message_bus::{Channel, ChannelConfig, EventPublisher, Streamer};
use reconciliation::StockReconciliationHandler;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Build the bus and register the stock reconciliation handler
    let store = InMemoryStore::new();
    let channel = Channel::new(ChannelConfig::default());
    let streamer = Arc::new(Streamer::new(config.router_config(), config.retry_policy()));

    StockReconciliationHandler::new(
        ProductService::new(store.clone()),
        StockLedger::new(store.clone()),
    )
    .register(&streamer, &channel, &config.orders_topic)
    .expect("failed to register stock reconciliation handler");

    let bus = tokio::spawn({
        let streamer = Arc::clone(&streamer);
        async move { streamer.run(std::future::pending()).await }
    });
    streamer.running().await;

    // 4. Build the application
    let publisher = EventPublisher::new(Arc::new(channel.clone()));
    let state = api::create_default_state(store, publisher, &config.orders_topic);
    let app = api::create_app(state, Arc::clone(&streamer), metrics_handle, &config.base_path);

    // 5. Start server
    let addr = config.addr();
    tracing::info!(%addr, base_path = %config.base_path, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // 6. Drain the bus
    streamer.close();
    match bus.await {
        Ok(Ok(())) => tracing::info!("message bus drained"),
        Ok(Err(err)) => tracing::warn!(error = %err, "message bus did not drain cleanly"),
        Err(err) => tracing::error!(error = %err, "message bus task failed"),
    }
    channel.close();

    tracing::info!("server shut down gracefully");
}
