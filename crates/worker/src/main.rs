//! Background worker for the notification and fallback engine.
//!
//! Wires a shared database pool and gateway clients into the services, then
//! runs the fallback sweeper and delivery-retention loops until ctrl-c.

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rvois_notify::{
    DisabledSmsGateway, FallbackSweeper, HttpReferenceCodes, HttpSmsGateway, LocalReferenceCodes,
    ReferenceCodes, SmsConfig, SmsGateway, VolunteerFallbackService,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rvois_worker=debug,rvois_notify=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = rvois_db::create_pool(&database_url)
        .await
        .context("failed to connect to database")?;
    rvois_db::health_check(&pool)
        .await
        .context("database health check failed")?;

    let sms: Arc<dyn SmsGateway> = match SmsConfig::from_env() {
        Some(config) => Arc::new(HttpSmsGateway::new(config)),
        None => {
            tracing::warn!("SMS_GATEWAY_URL not set; SMS escalations will fail soft");
            Arc::new(DisabledSmsGateway)
        }
    };

    let reference_codes: Arc<dyn ReferenceCodes> = match HttpReferenceCodes::from_env() {
        Some(client) => Arc::new(client),
        None => {
            tracing::info!("REFERENCE_SERVICE_URL not set; using derived reference codes");
            Arc::new(LocalReferenceCodes)
        }
    };

    let fallback = Arc::new(VolunteerFallbackService::new(
        pool.clone(),
        sms,
        reference_codes,
    ));
    let sweeper = FallbackSweeper::new(pool.clone(), fallback);

    let cancel = CancellationToken::new();

    let sweeper_handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { sweeper.run(cancel).await })
    };
    let retention_handle = {
        let pool = pool.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { rvois_notify::retention::run(pool, cancel).await })
    };

    tracing::info!("Notification worker started");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");
    cancel.cancel();

    let _ = sweeper_handle.await;
    let _ = retention_handle.await;

    tracing::info!("Notification worker stopped");
    Ok(())
}
