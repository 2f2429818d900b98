use axum::{routing::get, Router};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio_cron_scheduler::{Job, JobScheduler};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use caja::api::{self, AppState};
use caja::config::Config;
use caja::db;
use caja::jobs::notification_scan;
use caja::services::mailer::{HttpMailer, Mailer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "caja=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting caja server...");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    let mailer: Arc<dyn Mailer> = Arc::new(HttpMailer::new(
        config.email_api_url.clone(),
        config.email_api_key.clone(),
        config.email_from.clone(),
        config.email_reply_to.clone(),
    ));

    // Build application state
    let state = AppState {
        pool: pool.clone(),
        config: config.clone(),
        mailer: mailer.clone(),
    };

    // One pass at startup, then on the recurring schedule
    {
        let pool = pool.clone();
        let mailer = mailer.clone();
        let config = config.clone();
        tokio::spawn(async move {
            notification_scan::run(&pool, mailer, &config).await;
        });
    }

    let scheduler = JobScheduler::new().await?;
    let interval = Duration::from_secs(config.scan_interval_minutes * 60);
    {
        let pool = pool.clone();
        let mailer = mailer.clone();
        let job_config = config.clone();
        scheduler.add(Job::new_repeated_async(interval, move |_uuid, _lock| {
            let pool = pool.clone();
            let mailer = mailer.clone();
            let config = job_config.clone();
            Box::pin(async move {
                notification_scan::run(&pool, mailer, &config).await;
            })
        })?)
        .await?;
    }
    scheduler.start().await?;
    tracing::info!(
        interval_minutes = config.scan_interval_minutes,
        "Notification scan scheduled"
    );

    // Build router
    let app = Router::new()
        .route("/health", get(|| async { "OK" }))
        .merge(api::payments::router())
        .merge(api::cuts::router())
        .merge(api::students::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    tracing::info!("Listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C signal handler");
    tracing::info!("Shutdown signal received, cleaning up...");
}
