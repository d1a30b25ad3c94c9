//! Booking authority endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use booking::{BookingRequest, Reservation};
use chrono::{DateTime, NaiveDate, Utc};
use common::ReservationId;
use serde::Serialize;

use super::extract::Holder;
use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub id: String,
    pub user_name: String,
    pub room_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Reservation> for BookingResponse {
    fn from(r: &Reservation) -> Self {
        Self {
            id: r.id().to_string(),
            user_name: r.holder().to_string(),
            room_id: r.room_id().as_i64(),
            start_date: r.dates().start(),
            end_date: r.dates().end(),
            status: r.status().to_string(),
            created_at: r.created_at(),
        }
    }
}

fn parse_booking_id(id: &str) -> Result<ReservationId, ApiError> {
    uuid::Uuid::parse_str(id)
        .map(ReservationId::from_uuid)
        .map_err(|_| ApiError::BadRequest(format!("Invalid booking id: {id}")))
}

/// `POST /api/booking`: run the booking saga for the caller.
#[tracing::instrument(skip(state, req))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Holder(holder): Holder,
    Json(req): Json<BookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), ApiError> {
    let reservation = state.saga.create_booking(req, holder).await?;
    Ok((StatusCode::CREATED, Json(BookingResponse::from(&reservation))))
}

/// `GET /api/bookings`: the caller's bookings, oldest first.
#[tracing::instrument(skip(state))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    Holder(holder): Holder,
) -> Result<Json<Vec<BookingResponse>>, ApiError> {
    let bookings = state.saga.list_bookings(&holder).await?;
    Ok(Json(bookings.iter().map(BookingResponse::from).collect()))
}

/// `GET /api/booking/{id}`
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Holder(holder): Holder,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, ApiError> {
    let id = parse_booking_id(&id)?;
    let reservation = state.saga.get_booking(id, &holder).await?;
    Ok(Json(BookingResponse::from(&reservation)))
}

/// `DELETE /api/booking/{id}`: cancel a confirmed booking.
#[tracing::instrument(skip(state))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Holder(holder): Holder,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, ApiError> {
    let id = parse_booking_id(&id)?;
    let reservation = state.saga.cancel(id, &holder).await?;
    Ok(Json(BookingResponse::from(&reservation)))
}
