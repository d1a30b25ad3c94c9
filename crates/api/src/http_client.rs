//! [`InventoryClient`] over HTTP, for a remote inventory authority.

use std::time::Duration;

use async_trait::async_trait;
use common::{AttemptToken, DateRange, RoomId};
use reqwest::{Response, StatusCode};
use saga::{InventoryClient, RemoteError};
use serde::Deserialize;

use crate::routes::extract::REQUEST_ID_HEADER;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Calls the inventory routes of another instance of this service.
///
/// Per-call timeouts and retries are left to the saga's resilience policy;
/// only the connect phase is bounded here.
#[derive(Debug, Clone)]
pub struct HttpInventoryClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpInventoryClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self::with_client(base_url, http))
    }

    pub fn with_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, http }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn room_url(&self, room_id: RoomId, action: &str) -> String {
        format!("{}/api/rooms/{}/{}", self.base_url, room_id, action)
    }

    fn stay_query(dates: DateRange) -> [(&'static str, String); 2] {
        [
            ("startDate", dates.start().to_string()),
            ("endDate", dates.end().to_string()),
        ]
    }
}

fn unreachable(err: reqwest::Error) -> RemoteError {
    RemoteError::Unreachable(err.to_string())
}

/// Passes successful responses through and classifies the rest.
async fn check(response: Response, room_id: Option<RoomId>) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or(text);

    Err(match (status, room_id) {
        (StatusCode::NOT_FOUND, Some(room_id)) => RemoteError::RoomNotFound(room_id),
        (s, _) if s.is_server_error() => RemoteError::Server {
            status: s.as_u16(),
            message,
        },
        (s, _) => RemoteError::Rejected(format!("{}: {}", s.as_u16(), message)),
    })
}

#[async_trait]
impl InventoryClient for HttpInventoryClient {
    async fn recommend_rooms(&self, dates: DateRange) -> Result<Vec<RoomId>, RemoteError> {
        let response = self
            .http
            .get(format!("{}/api/rooms/recommend", self.base_url))
            .query(&Self::stay_query(dates))
            .send()
            .await
            .map_err(unreachable)?;
        check(response, None)
            .await?
            .json()
            .await
            .map_err(unreachable)
    }

    async fn confirm_availability(
        &self,
        room_id: RoomId,
        dates: DateRange,
        token: &AttemptToken,
    ) -> Result<bool, RemoteError> {
        let response = self
            .http
            .post(self.room_url(room_id, "confirm-availability"))
            .query(&Self::stay_query(dates))
            .header(REQUEST_ID_HEADER, token.as_str())
            .send()
            .await
            .map_err(unreachable)?;
        check(response, Some(room_id))
            .await?
            .json()
            .await
            .map_err(unreachable)
    }

    async fn release(&self, room_id: RoomId, token: &AttemptToken) -> Result<(), RemoteError> {
        let response = self
            .http
            .post(self.room_url(room_id, "release"))
            .header(REQUEST_ID_HEADER, token.as_str())
            .send()
            .await
            .map_err(unreachable)?;
        check(response, Some(room_id)).await?;
        Ok(())
    }

    async fn increment_times_booked(&self, room_id: RoomId) -> Result<(), RemoteError> {
        let response = self
            .http
            .post(self.room_url(room_id, "increment-bookings"))
            .send()
            .await
            .map_err(unreachable)?;
        check(response, Some(room_id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let client = HttpInventoryClient::new("http://inventory:8080/").unwrap();
        assert_eq!(client.base_url(), "http://inventory:8080");
        assert_eq!(
            client.room_url(RoomId::new(7), "release"),
            "http://inventory:8080/api/rooms/7/release"
        );
    }

    #[test]
    fn test_stay_query() {
        let dates = DateRange::new(
            "2025-03-10".parse().unwrap(),
            "2025-03-12".parse().unwrap(),
        )
        .unwrap();
        let query = HttpInventoryClient::stay_query(dates);
        assert_eq!(query[0], ("startDate", "2025-03-10".to_string()));
        assert_eq!(query[1], ("endDate", "2025-03-12".to_string()));
    }
}
