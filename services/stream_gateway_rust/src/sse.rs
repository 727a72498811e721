//! Server-Sent Events adapter around `DeliveryBridge`
//!
//! Each request gets its own bridge. The bridge lives inside the response
//! stream, so when the client disconnects and axum drops the stream, the hub
//! subscription is released. Streams also end when the gateway shuts down,
//! so graceful shutdown is not held open by long-lived clients.

use crate::routes::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::{self, Stream, StreamExt};
use linecast_core::{DeliveryBridge, League};
use std::convert::Infallible;
use tracing::{debug, warn};

pub async fn stream_league(
    Path(league): Path<String>,
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, String)> {
    let league: League = league.parse().map_err(|e| {
        warn!("Rejected stream request: {}", e);
        (StatusCode::NOT_FOUND, format!("{}", e))
    })?;

    let (bridge, rx) = DeliveryBridge::connect(state.registry.as_ref(), league, state.bridge_buffer);
    debug!("SSE client {} attached to {}", bridge.id(), league);

    let events = stream::unfold((bridge, rx), |(bridge, mut rx)| async move {
        let message = rx.recv().await?;
        let event = Event::default().event(message.event).data(message.data);
        Some((Ok(event), (bridge, rx)))
    });

    let mut shutdown = state.shutdown.clone();
    let stopped = async move {
        let closed = shutdown.wait_for(|stop| *stop).await.is_err();
        // A dropped sender means no shutdown will ever be signalled
        if closed {
            std::future::pending::<()>().await;
        }
    };
    let events = events.take_until(stopped);

    Ok(Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(state.sse_keepalive)
            .text("keep-alive"),
    ))
}
