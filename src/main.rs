use anyhow::Context;
use api_shared::auth::{jwt_secret_from_env_value, jwt_ttl_from_env_value};
use api_shared::AuthConfig;
use api_rest::AppState;
use clinic_core::config::{
    appointment_minutes_from_env_value, clinic_hours_from_env_values, database_url_from_env_value,
};
use clinic_core::{db, Clinic, CoreConfig};
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the clinic back end
///
/// Resolves configuration, opens and migrates the database, then serves the REST API until
/// interrupted.
///
/// # Environment Variables
/// - `DATABASE_URL`: Database location (default: "sqlite://clinic.db")
/// - `CLINIC_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `CLINIC_OPENS_AT`, `CLINIC_CLOSES_AT`: Opening hours as HH:MM (default: 08:00-18:00)
/// - `CLINIC_WORKING_DAYS`: Comma separated weekdays (default: "mon,tue,wed,thu,fri")
/// - `APPOINTMENT_MINUTES`: Default appointment length (default: 30)
/// - `JWT_SECRET`: Token signing secret, at least 16 bytes (required)
/// - `JWT_TTL_MINUTES`: Token lifetime (default: 480)
///
/// # Returns
/// * `Ok(())` - If the server starts and shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration is invalid or server startup or runtime fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("clinic=info".parse()?)
                .add_directive("api_rest=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("CLINIC_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let database_url = database_url_from_env_value(std::env::var("DATABASE_URL").ok());

    let hours = clinic_hours_from_env_values(
        std::env::var("CLINIC_OPENS_AT").ok(),
        std::env::var("CLINIC_CLOSES_AT").ok(),
        std::env::var("CLINIC_WORKING_DAYS").ok(),
    )?;
    let minutes = appointment_minutes_from_env_value(std::env::var("APPOINTMENT_MINUTES").ok())?;
    let cfg = Arc::new(CoreConfig::new(database_url.clone(), hours, minutes)?);

    let auth = AuthConfig::new(
        jwt_secret_from_env_value(std::env::var("JWT_SECRET").ok())?,
        jwt_ttl_from_env_value(std::env::var("JWT_TTL_MINUTES").ok())?,
    )?;

    let pool = db::connect_and_migrate(&database_url)
        .await
        .context("failed to open the clinic database")?;
    let clinic = Clinic::new(pool, cfg);

    let app = api_rest::router(AppState::new(clinic, auth));

    tracing::info!("++ Starting clinic REST API on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("-- Clinic REST API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
