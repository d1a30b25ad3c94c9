//! Request extractors shared by the route handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::NaiveDate;
use common::{AttemptToken, DateRange, HolderId};
use serde::Deserialize;

use crate::error::ApiError;

/// Header carrying the authenticated caller, set by the gateway.
pub const USER_HEADER: &str = "x-user-name";

/// Header carrying the saga attempt token on inventory calls.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

fn header_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// The caller on whose behalf a booking route runs.
#[derive(Debug, Clone)]
pub struct Holder(pub HolderId);

impl<S> FromRequestParts<S> for Holder
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        header_value(parts, USER_HEADER)
            .map(|name| Holder(HolderId::new(name)))
            .ok_or(ApiError::Unauthorized)
    }
}

/// Attempt token sent by the booking side in `X-Request-Id`.
#[derive(Debug, Clone)]
pub struct RequestId(pub AttemptToken);

impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        header_value(parts, REQUEST_ID_HEADER)
            .map(|token| RequestId(AttemptToken::new(token)))
            .ok_or_else(|| ApiError::BadRequest("X-Request-Id header is required".to_string()))
    }
}

/// `?startDate=..&endDate=..` query parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StayQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl StayQuery {
    pub fn into_range(self) -> Result<DateRange, ApiError> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => {
                DateRange::new(start, end).map_err(|e| ApiError::BadRequest(e.to_string()))
            }
            _ => Err(ApiError::BadRequest(
                "startDate and endDate are required".to_string(),
            )),
        }
    }
}
