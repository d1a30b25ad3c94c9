//! Inventory authority endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::RoomId;
use inventory::{NewRoom, Room};

use super::extract::{RequestId, StayQuery};
use crate::AppState;
use crate::error::ApiError;

/// `GET /api/rooms`
#[tracing::instrument(skip(state))]
pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Room>>, ApiError> {
    Ok(Json(state.engine.list_rooms().await?))
}

/// `POST /api/rooms`: add a room to the catalogue.
#[tracing::instrument(skip(state, room))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(room): Json<NewRoom>,
) -> Result<(StatusCode, Json<Room>), ApiError> {
    let room = state.engine.add_room(room).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

/// `GET /api/rooms/available?startDate&endDate`
#[tracing::instrument(skip(state))]
pub async fn available(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StayQuery>,
) -> Result<Json<Vec<Room>>, ApiError> {
    let dates = query.into_range()?;
    Ok(Json(state.engine.available_rooms(dates).await?))
}

/// `GET /api/rooms/recommend?startDate&endDate`: free room ids, least
/// booked first.
#[tracing::instrument(skip(state))]
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StayQuery>,
) -> Result<Json<Vec<RoomId>>, ApiError> {
    let dates = query.into_range()?;
    Ok(Json(state.engine.recommend_rooms(dates).await?))
}

/// `POST /api/rooms/{id}/confirm-availability?startDate&endDate`
#[tracing::instrument(skip(state, token))]
pub async fn confirm_availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    RequestId(token): RequestId,
    Query(query): Query<StayQuery>,
) -> Result<Json<bool>, ApiError> {
    let dates = query.into_range()?;
    let confirmed = state.engine.confirm(RoomId::new(id), dates, &token).await?;
    Ok(Json(confirmed))
}

/// `POST /api/rooms/{id}/release`
#[tracing::instrument(skip(state, token))]
pub async fn release(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    RequestId(token): RequestId,
) -> Result<StatusCode, ApiError> {
    state.engine.release(RoomId::new(id), &token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/rooms/{id}/increment-bookings`
#[tracing::instrument(skip(state))]
pub async fn increment_bookings(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Room>, ApiError> {
    Ok(Json(state.engine.increment_times_booked(RoomId::new(id)).await?))
}
