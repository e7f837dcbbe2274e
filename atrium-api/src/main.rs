use std::net::SocketAddr;

use atrium_api::{app, AppState};
use atrium_booking::expiration::{ExpirationScheduler, ExpirationSweeper};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atrium_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = atrium_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Atrium API on port {}", config.server.port);

    let state = AppState::from_config(&config).await;

    // Background sweep that expires bookings left unpaid past the deadline
    let sweeper = ExpirationSweeper::new(state.bookings.clone());
    let scheduler = ExpirationScheduler::start(
        sweeper,
        std::time::Duration::from_secs(config.booking_rules.sweep_interval_seconds),
        chrono::Duration::hours(config.booking_rules.payment_deadline_hours as i64),
    );

    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    scheduler.stop().await;
    tracing::info!("Shut down cleanly");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for shutdown signal");
}
