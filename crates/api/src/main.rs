//! API server entry point.

use std::sync::Arc;
use std::time::Duration;

use api::config::LogFormat;
use api::{AppState, Config, HttpInventoryClient};
use booking::{InMemoryReservationRepository, PostgresReservationRepository, ReservationRepository};
use common::{Clock, SystemClock};
use saga::{InventoryClient, LocalInventoryClient};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const STAY_PRUNE_INTERVAL: Duration = Duration::from_secs(3600);

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn reservation_store(config: &Config) -> Arc<dyn ReservationRepository> {
    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .expect("failed to connect to PostgreSQL");
            let repo = PostgresReservationRepository::new(pool);
            repo.run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL reservation store");
            Arc::new(repo)
        }
        None => {
            tracing::info!("using in-memory reservation store");
            Arc::new(InMemoryReservationRepository::new())
        }
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Inventory authority hosted by this process
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let engine = api::create_engine(&config, clock.clone());
    if config.seed_demo_data {
        api::seed_demo_rooms(&engine)
            .await
            .expect("failed to seed demo rooms");
    }

    api::spawn_stay_pruning(engine.clone(), clock.clone(), STAY_PRUNE_INTERVAL);

    // 4. Booking authority and its view of the inventory authority
    let reservations = reservation_store(&config).await;
    let inventory: Arc<dyn InventoryClient> = match &config.inventory_url {
        Some(url) => {
            tracing::info!(%url, "using remote inventory authority");
            let client =
                HttpInventoryClient::new(url.as_str()).expect("failed to build HTTP client");
            Arc::new(client)
        }
        None => Arc::new(LocalInventoryClient::new(engine.clone())),
    };
    let saga = api::create_saga(&config, reservations, inventory, clock);

    // 5. Build the application
    let state = Arc::new(AppState { saga, engine });
    let app = api::create_app(state, metrics_handle);

    // 6. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}
