//! HTTP API for the booking and inventory authorities.
//!
//! One process serves both sides: the booking routes drive the
//! [`BookingSaga`], the room routes expose the [`AvailabilityEngine`] the
//! saga talks to (in-process, or over HTTP via [`HttpInventoryClient`]).
//! Structured logging comes from `tracing`, metrics are exported in
//! Prometheus format.

pub mod config;
pub mod error;
pub mod http_client;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use booking::{InMemoryReservationRepository, ReservationRepository};
use common::Clock;
use inventory::{AvailabilityEngine, InMemoryIdempotencyLedger, InMemoryRoomRepository, NewRoom};
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{
    BookingSaga, CircuitBreaker, InventoryClient, LocalInventoryClient, ResiliencePolicy,
};
use tower_http::cors::{Any, CorsLayer};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use error::ApiError;
pub use http_client::HttpInventoryClient;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub saga: Arc<BookingSaga>,
    pub engine: Arc<AvailabilityEngine>,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::ops::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::ops::health))
        .route("/api/booking", post(routes::bookings::create))
        .route("/api/bookings", get(routes::bookings::list))
        .route(
            "/api/booking/{id}",
            get(routes::bookings::get).delete(routes::bookings::cancel),
        )
        .route(
            "/api/rooms",
            get(routes::rooms::list).post(routes::rooms::create),
        )
        .route("/api/rooms/available", get(routes::rooms::available))
        .route("/api/rooms/recommend", get(routes::rooms::recommend))
        .route(
            "/api/rooms/{id}/confirm-availability",
            post(routes::rooms::confirm_availability),
        )
        .route("/api/rooms/{id}/release", post(routes::rooms::release))
        .route(
            "/api/rooms/{id}/increment-bookings",
            post(routes::rooms::increment_bookings),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates an availability engine with in-memory rooms and ledger.
pub fn create_engine(config: &Config, clock: Arc<dyn Clock>) -> Arc<AvailabilityEngine> {
    let ledger = InMemoryIdempotencyLedger::new(config.ledger_ttl, clock);
    Arc::new(AvailabilityEngine::new(
        Arc::new(InMemoryRoomRepository::new()),
        Arc::new(ledger),
    ))
}

/// Creates the booking saga with the configured resilience policy.
pub fn create_saga(
    config: &Config,
    reservations: Arc<dyn ReservationRepository>,
    inventory: Arc<dyn InventoryClient>,
    clock: Arc<dyn Clock>,
) -> Arc<BookingSaga> {
    let breaker = CircuitBreaker::new(config.breaker_config(), clock.clone());
    let policy = ResiliencePolicy::new(config.retry_config(), breaker);
    Arc::new(BookingSaga::new(reservations, inventory, policy, clock))
}

/// Creates a fully in-memory application state: in-memory reservations and
/// an in-process inventory authority.
pub fn create_default_state(config: &Config, clock: Arc<dyn Clock>) -> Arc<AppState> {
    let engine = create_engine(config, clock.clone());
    let saga = create_saga(
        config,
        Arc::new(InMemoryReservationRepository::new()),
        Arc::new(LocalInventoryClient::new(engine.clone())),
        clock,
    );
    Arc::new(AppState { saga, engine })
}

/// Periodically drops stays that ended before the clock's current day.
pub fn spawn_stay_pruning(
    engine: Arc<AvailabilityEngine>,
    clock: Arc<dyn Clock>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticks = tokio::time::interval(every);
        loop {
            ticks.tick().await;
            engine.prune_past_stays(clock.today()).await;
        }
    })
}

/// Seeds the demo catalogue: three hotels and their rooms. Does nothing if
/// the engine already knows any room.
pub async fn seed_demo_rooms(engine: &AvailabilityEngine) -> inventory::Result<usize> {
    if !engine.list_rooms().await?.is_empty() {
        return Ok(0);
    }

    let catalogue: [(i64, &[(&str, &str)]); 3] = [
        (
            1,
            &[
                ("101", "STANDARD"),
                ("102", "STANDARD"),
                ("201", "DELUXE"),
                ("202", "DELUXE"),
                ("301", "SUITE"),
            ],
        ),
        (
            2,
            &[
                ("Suite-1", "SUITE"),
                ("Suite-2", "SUITE"),
                ("Standard-1", "STANDARD"),
            ],
        ),
        (
            3,
            &[
                ("Executive-101", "DELUXE"),
                ("Executive-102", "DELUXE"),
                ("Conference-201", "STANDARD"),
            ],
        ),
    ];

    let mut seeded = 0;
    for (hotel_id, rooms) in catalogue {
        for (number, room_type) in rooms {
            engine
                .add_room(NewRoom::new(hotel_id, *number).with_type(*room_type))
                .await?;
            seeded += 1;
        }
    }
    tracing::info!(rooms = seeded, "demo rooms seeded");
    Ok(seeded)
}
