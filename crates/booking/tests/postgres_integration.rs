//! PostgreSQL integration tests
//!
//! These tests share one PostgreSQL container and need Docker.
//! Run with:
//!
//! ```bash
//! cargo test -p booking --test postgres_integration -- --ignored --test-threads=1
//! ```

use std::sync::Arc;

use booking::{
    ACTIVE_STATUSES, PostgresReservationRepository, RepositoryError, Reservation,
    ReservationRepository, ReservationStatus,
};
use chrono::{Duration, NaiveDate, Utc};
use common::{DateRange, HolderId, ReservationId, RoomId};
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_reservations_table.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh repository with its own pool and an empty table
async fn get_test_repo() -> PostgresReservationRepository {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE reservations")
        .execute(&pool)
        .await
        .unwrap();

    PostgresReservationRepository::new(pool)
}

fn dates(start: &str, end: &str) -> DateRange {
    DateRange::new(
        start.parse::<NaiveDate>().unwrap(),
        end.parse::<NaiveDate>().unwrap(),
    )
    .unwrap()
}

fn pending(holder: &str, room: i64) -> Reservation {
    // Postgres stores microseconds; truncate so round-trips compare equal
    let now = Utc::now();
    let now = now - Duration::nanoseconds(i64::from(now.timestamp_subsec_nanos() % 1_000));
    Reservation::pending(
        HolderId::from(holder),
        RoomId::new(room),
        dates("2025-03-10", "2025-03-12"),
        now,
    )
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_insert_and_get_roundtrip() {
    let repo = get_test_repo().await;
    let r = pending("alice", 1);

    repo.insert(&r).await.unwrap();

    let loaded = repo.get(r.id()).await.unwrap().unwrap();
    assert_eq!(loaded, r);
    assert!(repo.get(ReservationId::new()).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_duplicate_insert_is_rejected() {
    let repo = get_test_repo().await;
    let r = pending("alice", 1);

    repo.insert(&r).await.unwrap();
    let result = repo.insert(&r).await;

    assert!(matches!(result, Err(RepositoryError::Duplicate(_))));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_update_is_compare_and_set() {
    let repo = get_test_repo().await;
    let r = pending("alice", 1);
    repo.insert(&r).await.unwrap();

    let mut confirmed = r.clone();
    confirmed.confirm().unwrap();
    let stored = repo.update(&confirmed).await.unwrap();
    assert_eq!(stored.version(), 2);

    let mut stale = r.clone();
    stale.cancel().unwrap();
    let result = repo.update(&stale).await;
    assert!(matches!(
        result,
        Err(RepositoryError::ConcurrencyConflict {
            expected: 1,
            actual: 2,
            ..
        })
    ));

    let loaded = repo.get(r.id()).await.unwrap().unwrap();
    assert_eq!(loaded.status(), ReservationStatus::Confirmed);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_update_of_missing_record_is_not_found() {
    let repo = get_test_repo().await;
    let result = repo.update(&pending("alice", 1)).await;
    assert!(matches!(result, Err(RepositoryError::NotFound(_))));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_find_by_room_and_holder() {
    let repo = get_test_repo().await;
    let active = pending("alice", 1);
    let mut cancelled = pending("alice", 1);
    cancelled.cancel().unwrap();
    let elsewhere = pending("bob", 2);

    for r in [&active, &cancelled, &elsewhere] {
        repo.insert(r).await.unwrap();
    }

    let by_room = repo
        .find_by_room(RoomId::new(1), &ACTIVE_STATUSES)
        .await
        .unwrap();
    assert_eq!(by_room.len(), 1);
    assert_eq!(by_room[0].id(), active.id());

    let by_holder = repo.find_by_holder(&HolderId::from("alice")).await.unwrap();
    assert_eq!(by_holder.len(), 2);
}
