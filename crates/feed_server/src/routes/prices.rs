//! Price history and live price stream
//!
//! The live stream is a WebSocket at `/ws/prices`. Each price update is sent
//! as one JSON text frame:
//!
//! ```json
//! {"instrument":"FTSE","value":7512.3,"timestampMs":1709294400000}
//! ```
//!
//! `?instruments=FTSE,DAX` restricts the stream; without it every instrument
//! is streamed. The stream ends when the client closes the socket or the
//! server shuts down.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Duration, Utc};
use feed_engine::PriceUpdate;
use futures::{sink::SinkExt, stream::StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::AppState;
use crate::error::ApiError;

/// Window used when a history request gives no start.
pub const DEFAULT_HISTORY_WINDOW_SECS: i64 = 3_600;

/// History bounds, RFC 3339
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl HistoryQuery {
    /// Resolves missing bounds against `now`.
    fn resolve(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let end = self.end.unwrap_or(now);
        let start = self
            .start
            .unwrap_or(end - Duration::seconds(DEFAULT_HISTORY_WINDOW_SECS));
        (start, end)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub instrument: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub prices: Vec<PriceUpdate>,
}

/// Stream filter
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamQuery {
    /// Comma-separated instrument names
    pub instruments: Option<String>,
}

impl StreamQuery {
    fn instruments(&self) -> Vec<String> {
        self.instruments
            .as_deref()
            .map(|list| list.split(',').map(str::to_string).collect())
            .unwrap_or_default()
    }
}

/// Build the price routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/instruments/{name}/history", get(history_handler))
        .route("/ws/prices", get(stream_handler))
}

/// GET /api/v1/instruments/{name}/history?start=&end=
///
/// Defaults to the last hour up to now.
async fn history_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let (start, end) = query.resolve(Utc::now());
    let prices = state.service.get_historical_data(&name, start, end).await?;
    Ok(Json(HistoryResponse {
        instrument: name,
        start,
        end,
        prices,
    }))
}

/// GET /ws/prices?instruments=A,B
async fn stream_handler(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let instruments = query.instruments();
    ws.on_upgrade(move |socket| handle_socket(socket, state, instruments))
}

async fn handle_socket(socket: WebSocket, state: AppState, instruments: Vec<String>) {
    let (mut sender, mut receiver) = socket.split();
    let mut subscription = state.service.subscribe_to_prices(&instruments);
    let mut shutdown = state.shutdown.clone();
    let id = subscription.id();

    info!(subscriber = id, ?instruments, "Price stream opened");

    let mut send_task = tokio::spawn(async move {
        while let Some(update) = subscription.recv_until(&mut shutdown).await {
            let payload = match serde_json::to_string(&update) {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(subscriber = id, error = %err, "Failed to encode price update");
                    continue;
                }
            };
            if sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    });

    // Inbound frames carry nothing; read until the client goes away.
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            if let Message::Close(_) = message {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!(subscriber = id, "Price stream closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_history_defaults_to_last_hour() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let (start, end) = HistoryQuery::default().resolve(now);
        assert_eq!(end, now);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 1, 11, 0, 0).unwrap());
    }

    #[test]
    fn test_history_start_is_relative_to_given_end() {
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 0, 30, 0).unwrap();
        let query = HistoryQuery {
            start: None,
            end: Some(end),
        };
        let (start, resolved_end) = query.resolve(Utc::now());
        assert_eq!(resolved_end, end);
        assert_eq!(start, Utc.with_ymd_and_hms(2023, 12, 31, 23, 30, 0).unwrap());
    }

    #[test]
    fn test_stream_query_splits_names() {
        let query = StreamQuery {
            instruments: Some("FTSE, DAX,".to_string()),
        };
        assert_eq!(query.instruments(), vec!["FTSE", " DAX", ""]);
        assert!(StreamQuery::default().instruments().is_empty());
    }
}
