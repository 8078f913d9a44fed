use std::sync::Arc;
use std::time::Duration;

use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{error, info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use notification_cell::{NotificationWorker, SimulatedSender, WorkerConfig};
use shared_config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Cura booking API server");

    let config = AppConfig::from_env();
    let services = router::Services::from_config(&config);

    // Background work: notification delivery, reminder sweeps, outbox and idle session cleanup
    let worker = Arc::new(NotificationWorker::new(
        WorkerConfig::default(),
        services.outbox.clone(),
        Arc::new(SimulatedSender),
    ));
    let worker_handle = tokio::spawn({
        let worker = worker.clone();
        async move {
            if let Err(e) = worker.start().await {
                error!("Notification worker stopped with error: {}", e);
            }
        }
    });

    let reminder_period = Duration::from_secs(config.reminder_interval_hours.max(1) * 60 * 60);
    tokio::spawn(services.reminders.clone().run_periodically(reminder_period));
    let retention = chrono::Duration::hours(config.outbox_retention_hours as i64);
    tokio::spawn(
        services
            .outbox
            .clone()
            .run_cleanup(retention, Duration::from_secs(60 * 60)),
    );
    tokio::spawn(
        services
            .conversations
            .clone()
            .run_pruner(services.sessions.clone(), Duration::from_secs(60)),
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router::create_router(&services)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    info!("Shutting down notification worker");
    worker.shutdown().await;
    let drained = worker.drain().await;
    info!("Delivered {} pending notification(s) before exit", drained);
    worker_handle.await?;

    Ok(())
}
